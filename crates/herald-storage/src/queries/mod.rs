// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each function takes `&Database` and runs a single
//! statement (or one transaction) on the background connection thread.

pub mod notifications;
pub mod recipients;
