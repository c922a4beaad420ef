// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound channel gateway trait (WhatsApp Cloud API and test doubles).

use async_trait::async_trait;

use crate::error::SwitchboardError;
use crate::traits::adapter::PluginAdapter;
use crate::types::OutboundDispatch;

/// Delivers agent replies to the external messaging channel.
///
/// Inbound traffic does not flow through this trait: the channel pushes
/// webhooks which are normalized into [`InboundEvent`](crate::InboundEvent)s.
#[async_trait]
pub trait ChannelGateway: PluginAdapter {
    /// Sends one message and returns the channel-assigned message id.
    ///
    /// Any non-success response from the channel is reported as
    /// [`SwitchboardError::Gateway`].
    async fn send(&self, dispatch: &OutboundDispatch) -> Result<String, SwitchboardError>;
}
