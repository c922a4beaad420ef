// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API integration for Switchboard.
//!
//! Outbound: [`WhatsAppClient`] implements [`ChannelGateway`](switchboard_core::ChannelGateway).
//! Inbound: webhook payloads are authenticated with [`webhook`] and turned into
//! [`InboundEvent`](switchboard_core::InboundEvent)s by [`normalize`].

pub mod client;
pub mod normalize;
pub mod types;
pub mod webhook;

pub use client::WhatsAppClient;
pub use normalize::{NormalizedBatch, Rejection, normalize_payload};
pub use types::{VerifyParams, WebhookPayload};
