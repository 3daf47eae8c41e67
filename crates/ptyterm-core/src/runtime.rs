//! Process-wide handle on the native PTY system.
//!
//! PTY transports need the platform PTY system. It is created once by
//! [`initialize`] and shared by every session until [`teardown`]; sessions
//! that already hold the runtime keep it alive after teardown.

use std::sync::{Arc, Mutex, PoisonError};

use portable_pty::{native_pty_system, PtyPair, PtySize, PtySystem};
use tracing::{debug, info};

use crate::error::{TerminalError, TerminalResult};

static RUNTIME: Mutex<Option<Arc<Runtime>>> = Mutex::new(None);

pub struct Runtime {
    pty_system: Mutex<Box<dyn PtySystem + Send>>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime").finish_non_exhaustive()
    }
}

impl Runtime {
    fn new() -> Self {
        Self {
            pty_system: Mutex::new(native_pty_system()),
        }
    }

    /// Open a new PTY pair of the given size.
    pub fn openpty(&self, rows: u16, cols: u16) -> TerminalResult<PtyPair> {
        debug!("Opening PTY with dimensions {}x{}", cols, rows);
        let system = self.pty_system.lock().unwrap_or_else(PoisonError::into_inner);
        system
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| TerminalError::PtyCreationFailed { message: e.to_string() })
    }
}

/// Create the runtime if needed and return it. Idempotent.
pub fn initialize() -> Arc<Runtime> {
    let mut slot = RUNTIME.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(runtime) = slot.as_ref() {
        return Arc::clone(runtime);
    }
    info!("Initializing PTY runtime");
    let runtime = Arc::new(Runtime::new());
    *slot = Some(Arc::clone(&runtime));
    runtime
}

pub fn current() -> Option<Arc<Runtime>> {
    RUNTIME.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Like [`current`], but an error when [`initialize`] was never called.
pub fn require() -> TerminalResult<Arc<Runtime>> {
    current().ok_or(TerminalError::RuntimeNotInitialized)
}

pub fn is_initialized() -> bool {
    RUNTIME.lock().unwrap_or_else(PoisonError::into_inner).is_some()
}

/// Release the global handle. Returns whether a runtime was installed.
pub fn teardown() -> bool {
    let previous = RUNTIME.lock().unwrap_or_else(PoisonError::into_inner).take();
    if previous.is_some() {
        info!("PTY runtime torn down");
    }
    previous.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    // single test: the runtime is process-global
    #[test]
    fn lifecycle() {
        let first = initialize();
        let second = initialize();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(is_initialized());
        assert!(require().is_ok());

        assert!(teardown());
        assert!(!teardown());
        assert!(current().is_none());
        assert!(matches!(require(), Err(TerminalError::RuntimeNotInitialized)));

        let third = initialize();
        assert!(!Arc::ptr_eq(&first, &third));
        teardown();
    }
}
