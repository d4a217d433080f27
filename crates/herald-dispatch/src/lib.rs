// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bulk-delivery pipeline for herald.
//!
//! Four pieces make up the pipeline:
//!
//! - [`classifier`]: pure mapping from a transport error to a category,
//!   retry decision, and recipient status update
//! - [`engine`]: the dispatch run over all eligible recipients
//! - [`tracker`]: notification lifecycle transitions and retry resets
//! - [`queue`]: bounded-worker retry queue with exponential backoff

pub mod classifier;
pub mod engine;
pub mod queue;
pub mod tracker;

pub use classifier::{classify, Classification};
pub use engine::Dispatcher;
pub use queue::{DeliveryQueue, SendFn};
