// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Switchboard integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockGateway`] - Channel gateway double that records dispatches
//! - [`FlakyStore`] - Conversation store wrapper that fails writes on demand
//! - [`TestHarness`] - Temp SQLite storage, fan-out hub and engine wired together

pub mod flaky_store;
pub mod harness;
pub mod mock_gateway;

pub use flaky_store::FlakyStore;
pub use harness::{TestHarness, TestHarnessBuilder, audio_event, image_event, text_event};
pub use mock_gateway::MockGateway;
