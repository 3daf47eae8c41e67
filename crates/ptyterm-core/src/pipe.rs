//! Piped-stdio transport: the child runs without a terminal.
//!
//! Useful for commands that never need a TTY, and on hosts where no PTY
//! system is available. Resizing is accepted and only recorded.

use std::process::{Child, ChildStdin, Command, Stdio};

use tracing::{debug, info, warn};

use crate::config::{CommandSpec, TransportKind};
use crate::constants::{DEFAULT_COLS, DEFAULT_ROWS};
use crate::error::{TerminalError, TerminalResult};
use crate::transport::{Transport, TransportReader, TransportWriter};

pub struct PipeTransport {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<TransportReader>,
    stderr: Option<TransportReader>,
    child_pid: Option<u32>,
    exit_code: Option<i32>,
    size: (u16, u16),
}

impl std::fmt::Debug for PipeTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeTransport")
            .field("child_pid", &self.child_pid)
            .field("exit_code", &self.exit_code)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl Default for PipeTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    // killed by a signal: report it the way shells do
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

impl PipeTransport {
    pub fn new() -> Self {
        Self {
            child: None,
            stdin: None,
            stdout: None,
            stderr: None,
            child_pid: None,
            exit_code: None,
            size: (DEFAULT_ROWS, DEFAULT_COLS),
        }
    }

    fn record_exit(&mut self, status: std::process::ExitStatus) -> i32 {
        let code = exit_code_of(status);
        debug!("Piped child exited with code {} ({})", code, status);
        self.exit_code = Some(code);
        code
    }
}

impl Transport for PipeTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Pipe
    }

    fn spawn(&mut self, command: &CommandSpec, rows: u16, cols: u16) -> TerminalResult<()> {
        if self.child.is_some() {
            return Err(TerminalError::ProcessSpawnFailed {
                program: command.program.clone(),
                message: "transport already has a child".to_string(),
            });
        }

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if command.clear_env {
            cmd.env_clear();
        }
        cmd.envs(&command.env);
        cmd.env("LINES", rows.to_string()).env("COLUMNS", cols.to_string());
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| TerminalError::ProcessSpawnFailed {
            program: command.program.clone(),
            message: e.to_string(),
        })?;

        self.stdin = child.stdin.take();
        self.stdout = child.stdout.take().map(|s| Box::new(s) as TransportReader);
        self.stderr = child.stderr.take().map(|s| Box::new(s) as TransportReader);
        self.child_pid = Some(child.id());
        self.child = Some(child);
        self.exit_code = None;
        self.size = (rows, cols);
        info!("Piped child process spawned: {} (pid {:?})", command.display(), self.child_pid);
        Ok(())
    }

    fn take_reader(&mut self) -> Option<TransportReader> {
        self.stdout.take()
    }

    fn take_error_reader(&mut self) -> Option<TransportReader> {
        self.stderr.take()
    }

    fn take_writer(&mut self) -> Option<TransportWriter> {
        self.stdin.take().map(|s| Box::new(s) as TransportWriter)
    }

    fn resize(&mut self, rows: u16, cols: u16) -> TerminalResult<()> {
        if self.child.is_none() {
            return Err(TerminalError::TransportClosed);
        }
        debug!("Pipe transport has no terminal; recording size {}x{}", cols, rows);
        self.size = (rows, cols);
        Ok(())
    }

    fn size(&self) -> (u16, u16) {
        self.size
    }

    fn kill(&mut self) -> TerminalResult<()> {
        let child = self.child.as_mut().ok_or(TerminalError::NotRunning)?;
        child.kill().map_err(|e| TerminalError::KillFailed { message: e.to_string() })
    }

    fn close(&mut self) {
        self.stdin = None;
        self.stdout = None;
        self.stderr = None;
        if let Some(mut child) = self.child.take() {
            let status = match child.try_wait() {
                Ok(Some(status)) => Ok(status),
                _ => {
                    if let Err(e) = child.kill() {
                        debug!("Piped child kill on close: {}", e);
                    }
                    child.wait()
                }
            };
            match status {
                Ok(status) => {
                    self.record_exit(status);
                }
                Err(e) => warn!("Failed to reap piped child: {}", e),
            }
        }
    }

    fn try_exit_code(&mut self) -> Option<i32> {
        if self.exit_code.is_some() {
            return self.exit_code;
        }
        let status = match self.child.as_mut()?.try_wait() {
            Ok(status) => status?,
            Err(e) => {
                warn!("Failed to poll piped child: {}", e);
                return None;
            }
        };
        Some(self.record_exit(status))
    }

    fn child_pid(&self) -> Option<u32> {
        self.child_pid
    }
}

impl Drop for PipeTransport {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::thread;
    use std::time::Duration;

    fn wait_exit(transport: &mut PipeTransport) -> i32 {
        for _ in 0..500 {
            if let Some(code) = transport.try_exit_code() {
                return code;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("child did not exit");
    }

    #[test]
    fn echoes_through_cat() {
        let mut transport = PipeTransport::new();
        transport.spawn(&CommandSpec::new("cat"), 24, 80).unwrap();
        let mut reader = transport.take_reader().unwrap();
        assert!(transport.take_reader().is_none());
        let mut writer = transport.take_writer().unwrap();
        assert!(transport.take_writer().is_none());

        writer.write_all(b"hello\n").unwrap();
        writer.flush().unwrap();
        let mut buf = [0u8; 6];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello\n");

        // closing stdin lets cat finish
        drop(writer);
        assert_eq!(wait_exit(&mut transport), 0);
        assert_eq!(transport.try_exit_code(), Some(0));
    }

    #[test]
    fn exit_code_and_stderr() {
        let mut transport = PipeTransport::new();
        let command = CommandSpec::new("sh").arg("-c").arg("echo oops >&2; exit 3");
        transport.spawn(&command, 24, 80).unwrap();
        let mut stderr = transport.take_error_reader().unwrap();
        let mut text = String::new();
        stderr.read_to_string(&mut text).unwrap();
        assert_eq!(text, "oops\n");
        assert_eq!(wait_exit(&mut transport), 3);
    }

    #[test]
    fn kill_reports_signal_exit() {
        let mut transport = PipeTransport::new();
        transport.spawn(&CommandSpec::new("sleep").arg("30"), 24, 80).unwrap();
        assert!(transport.child_pid().is_some());
        transport.kill().unwrap();
        assert_eq!(wait_exit(&mut transport), 128 + 9);
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let mut transport = PipeTransport::new();
        let err = transport
            .spawn(&CommandSpec::new("/definitely/not/a/program"), 24, 80)
            .unwrap_err();
        assert!(matches!(err, TerminalError::ProcessSpawnFailed { .. }));
    }

    #[test]
    fn closed_transport_rejects_io() {
        let mut transport = PipeTransport::new();
        assert!(transport.take_writer().is_none());
        assert!(matches!(transport.kill(), Err(TerminalError::NotRunning)));
        transport.close();
        transport.close();
    }
}
