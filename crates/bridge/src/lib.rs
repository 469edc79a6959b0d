//! # Bridge
//!
//! The serial protocol bridge between the console and a Grbl controller.
//!
//! The controller answers everything on one byte pipe: acknowledgements
//! (`ok` / `error:<n>`), status reports and free-form feedback all arrive
//! interleaved. The bridge splits that stream into two logical queues:
//!
//! - **default**: everything the operator should see
//! - **control**: replies to a transaction the bridge itself started
//!   (status poll, check-mode toggle, file playback)
//!
//! ## Components
//!
//! - [`ResponseRouter`]: the only reader of the transport, pushes each line
//!   onto whichever queue is active
//! - [`ReplyChannel`]: the two queues, the active-queue selector and the
//!   transaction lock
//! - [`ControlGuard::wait_for`]: ordered reply-sequence matching
//! - [`ControlSession`]: status query and check-mode transitions
//! - [`Bridge`]: connection lifecycle (wakeup, banner, reset, raw writes)
//!
//! ## Flow
//!
//! ```text
//! Transport → ResponseRouter → ReplyChannel ─┬─ default → display
//!                                            └─ control → ControlSession
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod bridge;
pub mod config;
pub mod constants;
pub mod errors;
pub mod logging;
pub mod mode;
pub mod reply_channel;
pub mod router;
pub mod wait;

pub use bridge::{encode_command, Bridge};
pub use config::BridgeConfig;
pub use errors::{BridgeError, Result};
pub use mode::{ControlSession, ModeChange};
pub use reply_channel::{ControlGuard, QueueId, ReplyChannel, TransactionGuard};
pub use router::ResponseRouter;
pub use wait::{Ack, CommandOutcome};

pub use core_types::{Line, LineKind, Mode, StatusReport, Transport, TransportError};
