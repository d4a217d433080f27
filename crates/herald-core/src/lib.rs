// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the herald broadcast-notification service.
//!
//! This crate provides the domain types, error type, and collaborator
//! traits used throughout the herald workspace. The dispatch engine,
//! storage backend, and Telegram transport are all written against the
//! definitions here.

pub mod error;
pub mod traits;
pub mod types;

pub use error::HeraldError;
pub use traits::{NotificationStore, RecipientStore, Transport};
pub use types::{
    DeliveryFailure, DeliveryOutcome, DeliveryTask, DispatchReport, ErrorCategory, Notification,
    NotificationStatus, Recipient, RecipientStatus, TransportError,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_construct() {
        let _config = HeraldError::Config("test".into());
        let _storage = HeraldError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _transport = HeraldError::Transport {
            message: "test".into(),
            source: None,
        };
        let _notification = HeraldError::NotificationNotFound(1);
        let _recipient = HeraldError::RecipientNotFound(2);
        let _internal = HeraldError::Internal("test".into());
    }

    #[test]
    fn trait_objects_are_constructible() {
        // The gateway and engine hold these as Arc<dyn Trait>; verify the
        // traits stay object safe.
        fn _assert_transport(_: &dyn Transport) {}
        fn _assert_notifications(_: &dyn NotificationStore) {}
        fn _assert_recipients(_: &dyn RecipientStore) {}
    }
}
