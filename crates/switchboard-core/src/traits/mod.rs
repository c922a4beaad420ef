// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility; the
//! engine holds them as `Arc<dyn Trait>`.

pub mod adapter;
pub mod channel;
pub mod storage;

pub use adapter::PluginAdapter;
pub use channel::ChannelGateway;
pub use storage::{AgentDirectory, ConversationStore, StorageAdapter};
