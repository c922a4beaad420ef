// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Real-time fan-out for Switchboard.
//!
//! [`FanoutHub`] maps agent identity to that agent's live connections and
//! pushes [`FanoutEvent`]s to them. Delivery is best-effort and at most once
//! per connection: a full connection queue drops the event, a closed one is
//! pruned. Nothing is persisted or replayed; a reconnecting client re-fetches.

pub mod event;
pub mod hub;

pub use event::{FanoutEvent, Target};
pub use hub::{ConnectionId, FanoutHub, PublishReport, Subscription};
