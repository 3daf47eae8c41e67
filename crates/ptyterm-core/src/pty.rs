//! Pseudo-terminal transport backed by portable-pty.

use std::sync::Arc;

use portable_pty::{Child, CommandBuilder, MasterPty, PtySize};
use tracing::{debug, error, info, warn};

use crate::config::{CommandSpec, TransportKind};
use crate::error::{TerminalError, TerminalResult};
use crate::runtime::Runtime;
use crate::transport::{Transport, TransportReader, TransportWriter};

pub struct PtyTransport {
    runtime: Arc<Runtime>,
    master: Option<Box<dyn MasterPty + Send>>,
    writer: Option<TransportWriter>,
    reader: Option<TransportReader>,
    child: Option<Box<dyn Child + Send + Sync>>,
    child_pid: Option<u32>,
    exit_code: Option<i32>,
    size: (u16, u16),
}

impl std::fmt::Debug for PtyTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyTransport")
            .field("child_pid", &self.child_pid)
            .field("exit_code", &self.exit_code)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

fn build_command(spec: &CommandSpec) -> CommandBuilder {
    let mut cmd = CommandBuilder::new(&spec.program);
    cmd.args(&spec.args);
    if spec.clear_env {
        cmd.env_clear();
    }
    for (key, value) in &spec.env {
        cmd.env(key, value);
    }
    if let Some(dir) = &spec.cwd {
        cmd.cwd(dir);
    }
    cmd
}

impl PtyTransport {
    pub fn new(runtime: Arc<Runtime>) -> Self {
        Self {
            runtime,
            master: None,
            writer: None,
            reader: None,
            child: None,
            child_pid: None,
            exit_code: None,
            size: (0, 0),
        }
    }

    fn record_exit(&mut self, status: portable_pty::ExitStatus) -> i32 {
        let code = i32::try_from(status.exit_code()).unwrap_or(i32::MAX);
        debug!("PTY child exited with code {} ({:?})", code, status);
        self.exit_code = Some(code);
        code
    }
}

impl Transport for PtyTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Pty
    }

    fn spawn(&mut self, command: &CommandSpec, rows: u16, cols: u16) -> TerminalResult<()> {
        if self.child.is_some() {
            return Err(TerminalError::ProcessSpawnFailed {
                program: command.program.clone(),
                message: "transport already has a child".to_string(),
            });
        }

        let pair = self.runtime.openpty(rows, cols)?;
        let child = pair.slave.spawn_command(build_command(command)).map_err(|e| {
            error!("Failed to spawn PTY child process: {}", e);
            TerminalError::ProcessSpawnFailed {
                program: command.program.clone(),
                message: e.to_string(),
            }
        })?;
        // the child holds its own slave handle; ours would keep EOF from arriving
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| TerminalError::PtyCreationFailed { message: format!("reader unavailable: {e}") })?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| TerminalError::PtyCreationFailed { message: format!("writer unavailable: {e}") })?;

        self.child_pid = child.process_id();
        info!("PTY child process spawned: {} (pid {:?})", command.display(), self.child_pid);

        self.master = Some(pair.master);
        self.writer = Some(writer);
        self.reader = Some(reader);
        self.child = Some(child);
        self.exit_code = None;
        self.size = (rows, cols);
        Ok(())
    }

    fn take_reader(&mut self) -> Option<TransportReader> {
        self.reader.take()
    }

    fn take_writer(&mut self) -> Option<TransportWriter> {
        self.writer.take()
    }

    fn resize(&mut self, rows: u16, cols: u16) -> TerminalResult<()> {
        let master = self.master.as_ref().ok_or(TerminalError::TransportClosed)?;
        master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| TerminalError::ResizeFailed { rows, cols, message: e.to_string() })?;
        self.size = (rows, cols);
        debug!("PTY resized to {}x{}", cols, rows);
        Ok(())
    }

    fn size(&self) -> (u16, u16) {
        match self.master.as_ref().and_then(|m| m.get_size().ok()) {
            Some(size) => (size.rows, size.cols),
            None => self.size,
        }
    }

    fn kill(&mut self) -> TerminalResult<()> {
        let child = self.child.as_mut().ok_or(TerminalError::NotRunning)?;
        child.kill().map_err(|e| TerminalError::KillFailed { message: e.to_string() })
    }

    fn close(&mut self) {
        // writer first: dropping it sends EOF on some platforms
        self.writer = None;
        self.reader = None;
        if let Some(mut child) = self.child.take() {
            match child.try_wait() {
                Ok(Some(status)) => {
                    self.record_exit(status);
                }
                _ => {
                    if let Err(e) = child.kill() {
                        debug!("PTY child kill on close: {}", e);
                    }
                    match child.wait() {
                        Ok(status) => {
                            self.record_exit(status);
                        }
                        Err(e) => warn!("Failed to reap PTY child: {}", e),
                    }
                }
            }
        }
        if self.master.take().is_some() {
            debug!("PTY master closed");
        }
    }

    fn try_exit_code(&mut self) -> Option<i32> {
        if self.exit_code.is_some() {
            return self.exit_code;
        }
        let status = match self.child.as_mut()?.try_wait() {
            Ok(status) => status?,
            Err(e) => {
                warn!("Failed to poll PTY child: {}", e);
                return None;
            }
        };
        Some(self.record_exit(status))
    }

    fn child_pid(&self) -> Option<u32> {
        self.child_pid
    }

    #[cfg(unix)]
    fn process_group_leader(&self) -> Option<i32> {
        self.master.as_ref()?.process_group_leader()
    }
}

impl Drop for PtyTransport {
    fn drop(&mut self) {
        self.close();
    }
}
