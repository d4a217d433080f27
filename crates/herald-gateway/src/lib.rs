// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP admin gateway for herald.
//!
//! Exposes the dispatch pipeline over a small REST API: trigger and retry
//! broadcast runs, inspect delivery status, and manage notification rows.
//! The admin surface carries no authentication; it is expected to sit
//! behind a private network boundary.

pub mod handlers;
pub mod server;

pub use server::{start_server, GatewayState, ServerConfig};
