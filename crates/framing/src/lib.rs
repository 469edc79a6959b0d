//! Byte-stream framing.
//!
//! The controller speaks newline-terminated ASCII, so the only framer is
//! [`LineFramer`]. Decoding of the line content happens in the router.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod lines;

pub use lines::LineFramer;
