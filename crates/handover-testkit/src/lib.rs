//! Handover Testing Infrastructure
//!
//! Scripted mock platform and a coordinator harness for integration tests.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! handover-testkit = { path = "../handover-testkit" }
//! ```
//!
//! ```rust,no_run
//! use handover_testkit::{CoordinatorHarness, ReplyBehavior};
//!
//! #[tokio::test]
//! async fn my_test() {
//!     let harness = CoordinatorHarness::builder()
//!         .build_hash("old")
//!         .waiting(ReplyBehavior::reply("new"))
//!         .build();
//!     harness.initialize().await;
//!     // ... test logic
//! }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod harness;
pub mod http;
pub mod platform;

pub use harness::{CoordinatorHarness, HarnessBuilder};
pub use http::MockHttp;
pub use platform::{MockPage, MockRegistrar, MockRegistration, MockWaitingWorker, ReplyBehavior};
