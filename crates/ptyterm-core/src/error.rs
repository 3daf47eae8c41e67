// src/error.rs
use thiserror::Error;

/// Error hierarchy for sessions, transports and key handling
#[derive(Error, Debug)]
pub enum TerminalError {
    // PTY and Process Management Errors
    #[error("PTY creation failed: {message}")]
    PtyCreationFailed { message: String },

    #[error("Failed to spawn process {program}: {message}")]
    ProcessSpawnFailed { program: String, message: String },

    #[error("Transport I/O error: {source}")]
    TransportIo {
        #[from]
        source: std::io::Error,
    },

    #[error("Transport is closed")]
    TransportClosed,

    #[error("No child process is running")]
    NotRunning,

    #[error("Resize to {rows}x{cols} failed: {message}")]
    ResizeFailed { rows: u16, cols: u16, message: String },

    #[error("Failed to kill child process: {message}")]
    KillFailed { message: String },

    #[error("Process runtime not initialized; call runtime::initialize() first")]
    RuntimeNotInitialized,

    // Input Errors
    #[error("Byte value {value} at index {index} is outside 0..=255")]
    ByteOutOfRange { index: usize, value: i64 },

    #[error("Invalid key chord '{chord}': {reason}")]
    InvalidKeyChord { chord: String, reason: String },

    // Configuration Errors
    #[error("Invalid configuration: {field} = {value}")]
    ConfigurationError { field: String, value: String },

    // Synchronization Errors
    #[error("Lock poisoned: {what}")]
    LockPoisoned { what: String },
}

pub type TerminalResult<T> = Result<T, TerminalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert() {
        let err: TerminalError = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(err, TerminalError::TransportIo { .. }));
        assert_eq!(err.to_string(), "Transport I/O error: gone");
    }

    #[test]
    fn range_error_message() {
        let err = TerminalError::ByteOutOfRange { index: 2, value: 300 };
        assert_eq!(err.to_string(), "Byte value 300 at index 2 is outside 0..=255");
    }
}
