//! # Console
//!
//! The operator-facing layer on top of the [`bridge`]: the `%` command
//! language, synchronous file playback and the output sink.
//!
//! ## Commands
//!
//! | Input | Effect |
//! |---|---|
//! | `%run [-c] <file>...` | play files, one acknowledged line at a time |
//! | `%check [-c] <file>...` | same, with the controller in check mode |
//! | `%status` | print the controller status |
//! | `%reset` | soft reset |
//! | `help`, `%help` | list commands |
//! | anything else | sent to the controller verbatim |

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod commands;
pub mod errors;
pub mod output;
pub mod playback;
pub mod session;

pub use commands::{help_text, parse_input, Command, CommandSpec, Input, PlaybackArgs, COMMANDS};
pub use errors::{CommandError, ConsoleError, Result};
pub use output::{BufferOutput, Output, StdoutOutput};
pub use playback::{load_programs, play, PlaybackSummary, Program};
pub use session::{format_status, Completion, Session};
