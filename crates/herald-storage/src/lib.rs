// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the herald broadcast service.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and typed query
//! operations for notifications and recipients.
//!
//! Every update is its own statement on the single background connection;
//! there is no cross-recipient transaction spanning a dispatch run. A crash
//! mid-dispatch can leave some recipients updated and others not
//! (at-least-once bookkeeping).

pub mod database;
pub mod migrations;
pub mod queries;
pub mod store;

pub use database::Database;
pub use store::SqliteStore;
