// src/cli.rs
use std::io::Read;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, warn};

use ptyterm::constants::{DEFAULT_COLS, DEFAULT_MAX_LINES, DEFAULT_ROWS, DEFAULT_TITLE};
use ptyterm::security::find_paste_marker;
use ptyterm::{
    runtime, CommandSpec, KeyAction, KeyEncoder, KeyEvent, KittyFlags, SessionConfig, SessionController,
    TransportKind,
};

/// Exit status reported when the command outlives `--timeout-ms`
const TIMEOUT_EXIT: u8 = 124;

#[derive(Parser, Debug)]
#[command(name = "ptyterm")]
#[command(about = "Run commands behind a terminal and read their output as plain lines")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command in a session and print the lines it produced
    Run(RunArgs),
    /// Show the bytes a key chord encodes to
    Encode(EncodeArgs),
    /// Check whether text is safe to paste (exit status 1 when not)
    PasteCheck(PasteCheckArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Use piped stdio instead of a pseudo-terminal
    #[arg(long)]
    pub pipe: bool,

    #[arg(long, default_value_t = DEFAULT_ROWS)]
    pub rows: u16,

    #[arg(long, default_value_t = DEFAULT_COLS)]
    pub cols: u16,

    /// Lines of output to keep
    #[arg(long, default_value_t = DEFAULT_MAX_LINES)]
    pub max_lines: usize,

    /// Text to write once started; \n, \r, \t, \e and \xHH are expanded
    #[arg(long = "send", value_name = "TEXT")]
    pub send: Vec<String>,

    /// Key chord to send after any --send text, e.g. ctrl+d or shift+tab
    #[arg(long = "key", value_name = "CHORD")]
    pub keys: Vec<String>,

    /// Stop the command if it has not exited after this long
    #[arg(long, default_value_t = 5000)]
    pub timeout_ms: u64,

    /// Command and its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Key chord such as ctrl+shift+up, alt+x, f5 or kp_enter
    pub chord: String,

    /// Kitty keyboard protocol flags (bit set, 0-31)
    #[arg(long, default_value_t = 0)]
    pub kitty: u8,

    /// Cursor keys in application mode (DECCKM)
    #[arg(long)]
    pub app_cursor: bool,

    /// Keypad in application mode (DECKPAM)
    #[arg(long)]
    pub app_keypad: bool,

    /// Prefix Alt combinations with ESC
    #[arg(long)]
    pub alt_esc: bool,

    /// xterm modifyOtherKeys level 2
    #[arg(long)]
    pub modify_other_keys: bool,

    #[arg(long, conflicts_with = "repeat")]
    pub release: bool,

    #[arg(long)]
    pub repeat: bool,

    /// Text the key produces, replacing the US-layout default
    #[arg(long)]
    pub text: Option<String>,
}

#[derive(Args, Debug)]
pub struct PasteCheckArgs {
    /// Text to check; read from stdin when omitted
    pub text: Option<String>,
}

pub fn execute(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Run(args) => run(args),
        Command::Encode(args) => encode(args),
        Command::PasteCheck(args) => paste_check(args),
    }
}

fn run(args: RunArgs) -> Result<ExitCode> {
    let transport = if args.pipe { TransportKind::Pipe } else { TransportKind::Pty };
    let (program, rest) = args.command.split_first().context("no command given")?;
    let config = SessionConfig::new(CommandSpec::new(program.as_str()).args(rest.iter().cloned()))
        .with_transport(transport)
        .with_size(args.rows, args.cols)
        .with_max_lines(args.max_lines);
    config.validate()?;

    let keys = args
        .keys
        .iter()
        .map(|chord| chord.parse::<KeyEvent>())
        .collect::<Result<Vec<_>, _>>()?;

    if transport == TransportKind::Pty {
        runtime::initialize();
    }

    let session = SessionController::new(config);
    if !session.start() {
        for line in session.lines() {
            eprintln!("{line}");
        }
        bail!("failed to start {}", args.command.join(" "));
    }

    for text in &args.send {
        if !session.write_bytes(&unescape(text)) {
            warn!("Could not send {:?}", text);
        }
    }
    for key in &keys {
        if !session.send_key(key) {
            warn!("Could not send key {}", key.key);
        }
    }

    let exited = session.wait_until_stopped(Duration::from_millis(args.timeout_ms));
    if !exited {
        warn!("Command still running after {}ms; stopping it", args.timeout_ms);
        session.stop();
    }

    let title = session.title();
    if title != DEFAULT_TITLE {
        eprintln!("title: {title}");
    }
    let mut lines = session.lines();
    // the line after a final newline is empty
    if lines.len() > 1 && lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    for line in &lines {
        println!("{line}");
    }

    let code = session.exit_code();
    debug!("Command finished with exit code {:?}", code);
    session.dispose();
    runtime::teardown();

    if !exited {
        return Ok(ExitCode::from(TIMEOUT_EXIT));
    }
    Ok(match code {
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        None => ExitCode::FAILURE,
    })
}

fn encode(args: EncodeArgs) -> Result<ExitCode> {
    let flags = KittyFlags::from_bits(args.kitty)
        .with_context(|| format!("invalid kitty flags {}", args.kitty))?;

    let mut event: KeyEvent = args.chord.parse()?;
    if args.release {
        event = event.with_action(KeyAction::Release);
    } else if args.repeat {
        event = event.with_action(KeyAction::Repeat);
    }
    if let Some(text) = args.text {
        event = event.with_text(text);
    }

    let mut encoder = KeyEncoder::new();
    encoder.set_kitty_flags(flags);
    encoder.set_cursor_key_application(args.app_cursor);
    encoder.set_keypad_key_application(args.app_keypad);
    encoder.set_alt_esc_prefix(args.alt_esc);
    encoder.set_modify_other_keys_state_2(args.modify_other_keys);

    let bytes = encoder.encode(&event);
    if bytes.is_empty() {
        println!("(no output)");
    } else {
        let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02x}")).collect();
        println!("hex:  {}", hex.join(" "));
        println!("text: {}", escape_bytes(&bytes));
    }
    Ok(ExitCode::SUCCESS)
}

fn paste_check(args: PasteCheckArgs) -> Result<ExitCode> {
    let bytes = match args.text {
        Some(text) => text.into_bytes(),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf).context("failed to read stdin")?;
            buf
        }
    };

    let reason = if let Some(pos) = bytes.iter().position(|&b| b == b'\n') {
        Some(format!("line feed at byte {pos}"))
    } else {
        find_paste_marker(&bytes).map(|range| format!("paste marker at byte {}", range.start))
    };

    Ok(match reason {
        None => {
            println!("safe");
            ExitCode::SUCCESS
        }
        Some(reason) => {
            println!("unsafe: {reason}");
            ExitCode::FAILURE
        }
    })
}

/// Expand `\n`, `\r`, `\t`, `\e`, `\0`, `\\` and `\xHH`; anything else is
/// kept as written.
pub fn unescape(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 1 == bytes.len() {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let expanded = match bytes[i + 1] {
            b'n' => Some(b'\n'),
            b'r' => Some(b'\r'),
            b't' => Some(b'\t'),
            b'e' => Some(0x1b),
            b'0' => Some(0),
            b'\\' => Some(b'\\'),
            _ => None,
        };
        if let Some(byte) = expanded {
            out.push(byte);
            i += 2;
            continue;
        }
        let hex = bytes
            .get(i + 2..i + 4)
            .filter(|_| bytes[i + 1] == b'x')
            .and_then(|h| std::str::from_utf8(h).ok())
            .and_then(|h| u8::from_str_radix(h, 16).ok());
        match hex {
            Some(byte) => {
                out.push(byte);
                i += 4;
            }
            None => {
                out.push(b'\\');
                i += 1;
            }
        }
    }
    out
}

/// Render bytes for display: printable ASCII as is, the rest escaped.
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::new();
    for &b in bytes {
        match b {
            0x1b => out.push_str("\\e"),
            b'\r' => out.push_str("\\r"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(char::from(b)),
            _ => out.push_str(&format!("\\x{b:02x}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_sequences() {
        assert_eq!(unescape("ls\\n"), b"ls\n");
        assert_eq!(unescape("\\e[A\\x03"), b"\x1b[A\x03");
        assert_eq!(unescape("a\\\\b"), b"a\\b");
        assert_eq!(unescape("\\q\\x4"), b"\\q\\x4");
        assert_eq!(unescape("end\\"), b"end\\");
    }

    #[test]
    fn escape_for_display() {
        assert_eq!(escape_bytes(b"\x1b[1;5A"), "\\e[1;5A");
        assert_eq!(escape_bytes(&[0x03, b'\r']), "\\x03\\r");
    }

    #[test]
    fn parses_run_command_line() {
        let cli = Cli::try_parse_from([
            "ptyterm", "run", "--pipe", "--send", "hi\\n", "--key", "ctrl+d", "--", "cat", "-n",
        ])
        .unwrap();
        match cli.command {
            Command::Run(args) => {
                assert!(args.pipe);
                assert_eq!(args.command, vec!["cat", "-n"]);
                assert_eq!(args.send, vec!["hi\\n"]);
                assert_eq!(args.keys, vec!["ctrl+d"]);
                assert_eq!(args.rows, DEFAULT_ROWS);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn release_and_repeat_conflict() {
        assert!(Cli::try_parse_from(["ptyterm", "encode", "a", "--release", "--repeat"]).is_err());
    }
}
