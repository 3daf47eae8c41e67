// src/constants.rs

// Terminal size used until the host resizes
pub const DEFAULT_ROWS: u16 = 24;
pub const DEFAULT_COLS: u16 = 80;

pub use ptyterm_ansi::{DEFAULT_MAX_LINES, DEFAULT_TITLE};

pub const DEFAULT_TERM: &str = "xterm-256color";

// Reader thread
pub const READ_BUFFER_SIZE: usize = 4096;
pub const MAX_CONSECUTIVE_READ_ERRORS: u32 = 3;
pub const READ_RETRY_DELAY_MS: u64 = 100;

// Exit status collection after the output stream ends
pub const EXIT_POLL_ATTEMPTS: u32 = 50;
pub const EXIT_POLL_INTERVAL_MS: u64 = 10;

/// Prefix of diagnostic lines the session writes into its own buffer
pub const DIAGNOSTIC_PREFIX: &str = "[ptyterm]";

// Kitty keyboard flag stack depth, per screen
pub const KITTY_STACK_LIMIT: usize = 16;
