// src/config.rs
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::constants::{DEFAULT_COLS, DEFAULT_MAX_LINES, DEFAULT_ROWS, DEFAULT_TERM, READ_BUFFER_SIZE};
use crate::encoder::KeyEncoderConfig;
use crate::error::{TerminalError, TerminalResult};

/// Which transport adapter a session spawns its command through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Pseudo-terminal via portable-pty
    #[default]
    Pty,
    /// Plain piped stdio; no terminal semantics
    Pipe,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Pty => f.write_str("pty"),
            TransportKind::Pipe => f.write_str("pipe"),
        }
    }
}

/// Program to run, with its arguments and environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub cwd: Option<PathBuf>,
    /// Start from an empty environment instead of inheriting ours
    pub clear_env: bool,
}

impl Default for CommandSpec {
    fn default() -> Self {
        Self::default_shell()
    }
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        let mut env = BTreeMap::new();
        env.insert("TERM".to_string(), DEFAULT_TERM.to_string());
        Self {
            program: program.into(),
            args: Vec::new(),
            env,
            cwd: None,
            clear_env: false,
        }
    }

    /// `$SHELL`, falling back to `/bin/sh` (`cmd.exe` on Windows).
    pub fn default_shell() -> Self {
        let program = if cfg!(windows) {
            std::env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string())
        } else {
            std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
        };
        Self::new(program)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn clear_env(mut self, clear: bool) -> Self {
        self.clear_env = clear;
        self
    }

    /// Program and arguments joined for diagnostics.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub command: CommandSpec,
    pub transport: TransportKind,
    pub rows: u16,
    pub cols: u16,
    pub max_lines: usize,
    /// Mirror keyboard modes the application sets into the encoder
    pub track_modes: bool,
    pub read_buffer_size: usize,
    pub encoder: KeyEncoderConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command: CommandSpec::default_shell(),
            transport: TransportKind::Pty,
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            max_lines: DEFAULT_MAX_LINES,
            track_modes: true,
            read_buffer_size: READ_BUFFER_SIZE,
            encoder: KeyEncoderConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn new(command: CommandSpec) -> Self {
        Self { command, ..Self::default() }
    }

    pub fn with_command(mut self, command: CommandSpec) -> Self {
        self.command = command;
        self
    }

    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_size(mut self, rows: u16, cols: u16) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines;
        self
    }

    pub fn with_mode_tracking(mut self, enabled: bool) -> Self {
        self.track_modes = enabled;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    pub fn with_encoder(mut self, encoder: KeyEncoderConfig) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn validate(&self) -> TerminalResult<()> {
        let invalid = |field: &str, value: String| TerminalError::ConfigurationError {
            field: field.to_string(),
            value,
        };

        if self.command.program.trim().is_empty() {
            return Err(invalid("command.program", format!("{:?}", self.command.program)));
        }
        if self.rows == 0 {
            return Err(invalid("rows", self.rows.to_string()));
        }
        if self.cols == 0 {
            return Err(invalid("cols", self.cols.to_string()));
        }
        if self.max_lines == 0 {
            return Err(invalid("max_lines", self.max_lines.to_string()));
        }
        if self.read_buffer_size == 0 {
            return Err(invalid("read_buffer_size", self.read_buffer_size.to_string()));
        }
        Ok(())
    }
}
