// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for herald integration tests.
//!
//! Provides mock transports and in-memory stores for fast, deterministic,
//! CI-runnable tests without a live Bot API or on-disk database.
//!
//! # Components
//!
//! - [`MockTransport`] - Scripted transport with per-recipient failures and sent-message capture
//! - [`MemoryStore`] - In-memory notification and recipient store

pub mod memory_store;
pub mod mock_transport;

pub use memory_store::MemoryStore;
pub use mock_transport::MockTransport;
