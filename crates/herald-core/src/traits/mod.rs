// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits the dispatch core depends on.
//!
//! The engine is written against these seams so the messaging platform and
//! the relational store can be swapped for fakes in tests.

pub mod store;
pub mod transport;

pub use store::{NotificationStore, RecipientStore};
pub use transport::Transport;
