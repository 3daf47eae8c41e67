//! ptyterm core - run a child process behind a terminal and view its output
//! as plain lines.
//!
//! This crate provides the session controller, the transports it spawns
//! commands through, and the keyboard encoder that turns key events into
//! the bytes a terminal application expects.

pub mod config;
pub mod constants;
pub mod encoder;
pub mod error;
pub mod key;
pub mod modes;
pub mod notify;
pub mod pipe;
pub mod pty;
pub mod runtime;
pub mod security;
pub mod session;
pub mod transport;

// Re-export main types
pub use config::{CommandSpec, SessionConfig, TransportKind};
pub use encoder::{KeyEncoder, KeyEncoderConfig, KittyFlags, OptionAsAlt};
pub use error::{TerminalError, TerminalResult};
pub use key::{Key, KeyAction, KeyEvent, Mods};
pub use modes::ModeTracker;
pub use notify::{ChangeNotifier, ListenerId};
pub use pipe::PipeTransport;
pub use pty::PtyTransport;
pub use security::{bracket_paste, is_paste_safe, is_paste_safe_bytes, strip_paste_markers};
pub use session::{SessionController, SessionState};
pub use transport::{Transport, TransportFactory, TransportReader, TransportWriter};

pub use ptyterm_ansi as ansi;
