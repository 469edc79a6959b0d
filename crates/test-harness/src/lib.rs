//! # Test Harness
//!
//! - [`MockTransport`]: an in-memory [`Transport`](core_types::Transport) that
//!   records every write and lets the test inject controller output.
//! - [`FakeGrbl`]: a [`Responder`] that answers writes the way the firmware does
//!   (`ok`/`error:<n>`, `?` status reports, `$C` check-mode toggling, soft reset).

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod fake_grbl;
pub mod mock_transport;

pub use fake_grbl::{FakeGrbl, FAKE_BANNER};
pub use mock_transport::{MockHandle, MockTransport, Responder};
