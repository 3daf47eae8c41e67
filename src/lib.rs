//! ptyterm - run a command behind a terminal and read its output as plain
//! lines.
//!
//! This crate bundles the workspace crates:
//! - `ptyterm-ansi`: streaming escape-sequence scanner and line buffer
//! - `ptyterm-core`: sessions, transports and keyboard encoding
//!
//! ```no_run
//! use std::time::Duration;
//! use ptyterm::{runtime, CommandSpec, SessionConfig, SessionController};
//!
//! runtime::initialize();
//! let session = SessionController::new(SessionConfig::new(CommandSpec::new("ls")));
//! if session.start() && session.wait_until_stopped(Duration::from_secs(5)) {
//!     for line in session.lines() {
//!         println!("{line}");
//!     }
//! }
//! ```

pub use ptyterm_core::*;
