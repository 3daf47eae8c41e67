//! The transport port: a duplex byte channel to a child process.
//!
//! A session only needs byte-stream semantics from its transport. Adapters
//! are [`PtyTransport`](crate::pty::PtyTransport) for a real terminal and
//! [`PipeTransport`](crate::pipe::PipeTransport) for plain piped stdio;
//! [`open`] picks one by [`TransportKind`].

use std::io::{Read, Write};
use std::sync::Arc;

use crate::config::CommandSpec;
pub use crate::config::TransportKind;
use crate::error::{TerminalError, TerminalResult};
use crate::pipe::PipeTransport;
use crate::pty::PtyTransport;
use crate::runtime;

pub type TransportReader = Box<dyn Read + Send>;
pub type TransportWriter = Box<dyn Write + Send>;

/// Builds a transport for a session run.
pub type TransportFactory = Arc<dyn Fn(TransportKind) -> TerminalResult<Box<dyn Transport>> + Send + Sync>;

pub trait Transport: Send {
    fn kind(&self) -> TransportKind;

    /// Start `command` with the given terminal size.
    fn spawn(&mut self, command: &CommandSpec, rows: u16, cols: u16) -> TerminalResult<()>;

    /// The child's output stream. Yields `Some` once after a successful
    /// spawn.
    fn take_reader(&mut self) -> Option<TransportReader>;

    /// A separate error stream, for transports that have one.
    fn take_error_reader(&mut self) -> Option<TransportReader> {
        None
    }

    /// The child's input stream. Yields `Some` once after a successful
    /// spawn; writes through it may block while the child is not reading.
    fn take_writer(&mut self) -> Option<TransportWriter>;

    fn resize(&mut self, rows: u16, cols: u16) -> TerminalResult<()>;

    /// Current size as (rows, cols).
    fn size(&self) -> (u16, u16);

    fn kill(&mut self) -> TerminalResult<()>;

    /// Release every handle, killing and reaping the child if it still runs.
    /// Idempotent.
    fn close(&mut self);

    /// Exit code if the child has exited; never blocks.
    fn try_exit_code(&mut self) -> Option<i32>;

    fn child_pid(&self) -> Option<u32>;

    /// Foreground process group of the terminal, where the platform has one.
    fn process_group_leader(&self) -> Option<i32> {
        None
    }
}

/// Create an unspawned transport of the given kind. PTY transports need an
/// initialized [`runtime`].
pub fn open(kind: TransportKind) -> TerminalResult<Box<dyn Transport>> {
    match kind {
        TransportKind::Pty => Ok(Box::new(PtyTransport::new(runtime::require()?))),
        TransportKind::Pipe => Ok(Box::new(PipeTransport::new())),
    }
}

/// The default [`TransportFactory`], backed by [`open`].
pub fn default_factory() -> TransportFactory {
    Arc::new(open)
}

/// Convert integer byte values to bytes. Values outside 0–255 are an
/// error, never clamped.
pub fn bytes_from_values(values: &[i64]) -> TerminalResult<Vec<u8>> {
    values
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            u8::try_from(value).map_err(|_| TerminalError::ByteOutOfRange { index, value })
        })
        .collect()
}
