//! Test utilities for Skyglow.
//!
//! - [`MockRelay`]: an in-memory [`RelayTransport`](crate::RelayTransport)
//!   that records every request and answers with canned bodies
//! - [`StaticTxtResolver`]: a [`TxtResolver`](crate::TxtResolver) backed by a map
//! - Fixtures: published demo tokens with their known derived keys
//!
//! ## Usage
//!
//! ```rust,ignore
//! use skyglow_lib::test_utils::{test_device_token, MockRelay, TestFixtures};
//!
//! let relay = MockRelay::new().with_send_response(r#"{"Status":"rate-limited"}"#);
//! let token = test_device_token("a.example.com", &TestFixtures::SEQUENTIAL_SECRET);
//! let err = send_notification(&relay, &token, &Notification::new("hi")).await.unwrap_err();
//! assert_eq!(err.relay_status(), Some("rate-limited"));
//! ```

mod fixtures;
mod mock_relay;

pub use fixtures::{random_device_token, test_device_token, TestFixtures};

pub use mock_relay::{MockRelay, StaticTxtResolver};
