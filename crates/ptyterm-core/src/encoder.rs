//! Key event to byte encoding.
//!
//! [`KeyEncoder`] turns a [`KeyEvent`] into the bytes a terminal application
//! expects on stdin: Kitty keyboard protocol sequences when the application
//! enabled them, xterm modifyOtherKeys sequences, or the legacy VT encodings
//! (control codes, `ESC [` / `ESC O` cursor and function keys, keypad
//! application mode) otherwise.

use bitflags::bitflags;
use tracing::trace;

use crate::key::{Key, KeyAction, KeyEvent, Mods};

const ESC: u8 = 0x1b;

bitflags! {
    /// Kitty keyboard protocol progressive enhancement flags.
    /// Empty means the protocol is disabled.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct KittyFlags: u8 {
        const DISAMBIGUATE           = 1 << 0;
        const REPORT_EVENTS          = 1 << 1;
        const REPORT_ALTERNATES      = 1 << 2;
        const REPORT_ALL             = 1 << 3;
        const REPORT_ASSOCIATED_TEXT = 1 << 4;
    }
}

/// Whether the macOS Option key acts as Alt.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionAsAlt {
    False,
    #[default]
    True,
    Left,
    Right,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KeyEncoderConfig {
    /// DECCKM (DEC mode 1)
    pub cursor_key_application: bool,
    /// DECKPAM (DEC mode 66)
    pub keypad_key_application: bool,
    /// DEC mode 1035
    pub ignore_keypad_with_numlock: bool,
    /// DEC mode 1036
    pub alt_esc_prefix: bool,
    pub modify_other_keys_state_2: bool,
    pub kitty_flags: KittyFlags,
    pub macos_option_as_alt: OptionAsAlt,
}

// Event facts shared by the encoding rules
struct Ctx<'a> {
    event: &'a KeyEvent,
    action: KeyAction,
    /// Shift/Alt/Ctrl/Super; Alt removed when it does not count
    mods: Mods,
    alt_counts: bool,
}

#[derive(Debug, Default, Clone)]
pub struct KeyEncoder {
    config: KeyEncoderConfig,
}

impl KeyEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: KeyEncoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KeyEncoderConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: KeyEncoderConfig) {
        self.config = config;
    }

    pub fn set_cursor_key_application(&mut self, enabled: bool) {
        self.config.cursor_key_application = enabled;
    }

    pub fn set_keypad_key_application(&mut self, enabled: bool) {
        self.config.keypad_key_application = enabled;
    }

    pub fn set_ignore_keypad_with_numlock(&mut self, enabled: bool) {
        self.config.ignore_keypad_with_numlock = enabled;
    }

    pub fn set_alt_esc_prefix(&mut self, enabled: bool) {
        self.config.alt_esc_prefix = enabled;
    }

    pub fn set_modify_other_keys_state_2(&mut self, enabled: bool) {
        self.config.modify_other_keys_state_2 = enabled;
    }

    pub fn set_kitty_flags(&mut self, flags: KittyFlags) {
        self.config.kitty_flags = flags;
    }

    pub fn set_macos_option_as_alt(&mut self, option: OptionAsAlt) {
        self.config.macos_option_as_alt = option;
    }

    pub fn encode(&self, event: &KeyEvent) -> Vec<u8> {
        let mut out = Vec::with_capacity(8);
        self.encode_into(event, &mut out);
        out
    }

    /// Append the encoding of `event` to `out`. Nothing is appended for
    /// events that produce no input.
    pub fn encode_into(&self, event: &KeyEvent, out: &mut Vec<u8>) {
        if event.composing {
            return;
        }
        if event.action == KeyAction::Release && self.config.kitty_flags.is_empty() {
            trace!(key = %event.key, "release not reported");
            return;
        }

        let alt_counts = self.alt_counts(event.mods);
        let mut mods = event.mods.essential();
        if !alt_counts {
            mods.remove(Mods::ALT);
        }
        let ctx = Ctx {
            event,
            action: event.action,
            mods,
            alt_counts,
        };

        let start = out.len();
        if !self.encode_rules(&ctx, out) {
            return;
        }

        if self.config.alt_esc_prefix && ctx.alt_counts && out.len() > start {
            out.insert(start, ESC);
        }
    }

    fn encode_rules(&self, ctx: &Ctx<'_>, out: &mut Vec<u8>) -> bool {
        // Ctrl+letter stays a control code even under the Kitty protocol
        if ctx.action == KeyAction::Press && ctx.mods == Mods::CTRL {
            if let Some(idx) = ctx.event.key.letter_index() {
                out.push(idx + 1);
                return true;
            }
        }

        // plain presses keep their legacy bytes with Kitty enabled
        if !self.config.kitty_flags.is_empty() && (!ctx.mods.is_empty() || ctx.action != KeyAction::Press) {
            if self.encode_kitty(ctx, out) {
                return true;
            }
            if ctx.action == KeyAction::Release {
                return false;
            }
        }

        self.encode_legacy(ctx, out)
    }

    fn alt_counts(&self, mods: Mods) -> bool {
        if !mods.contains(Mods::ALT) {
            return false;
        }
        let sided = mods.intersects(Mods::ALT_LEFT | Mods::ALT_RIGHT);
        match self.config.macos_option_as_alt {
            OptionAsAlt::False => false,
            OptionAsAlt::True => true,
            OptionAsAlt::Left => !sided || mods.contains(Mods::ALT_LEFT),
            OptionAsAlt::Right => !sided || mods.contains(Mods::ALT_RIGHT),
        }
    }

    /// Kitty keyboard protocol encoding. Returns false when no key code can
    /// be derived, leaving `out` untouched.
    fn encode_kitty(&self, ctx: &Ctx<'_>, out: &mut Vec<u8>) -> bool {
        let flags = self.config.kitty_flags;
        let event = ctx.event;

        let mut mod_bits = ctx.mods.bits();
        if flags.contains(KittyFlags::REPORT_ALL) {
            mod_bits |= (event.mods & Mods::LOCKS).bits();
        }
        let mod_value = 1 + mod_bits;
        let event_type = match ctx.action {
            KeyAction::Press => None,
            KeyAction::Repeat => Some(2),
            KeyAction::Release => Some(3),
        };

        if let Some((number, final_byte)) = kitty_legacy_form(event.key) {
            let seq = if mod_value == 1 && event_type.is_none() {
                if final_byte == '~' {
                    format!("\x1b[{number}~")
                } else {
                    format!("\x1b[{final_byte}")
                }
            } else {
                let suffix = event_type.map(|e| format!(":{e}")).unwrap_or_default();
                format!("\x1b[{number};{mod_value}{suffix}{final_byte}")
            };
            out.extend_from_slice(seq.as_bytes());
            return true;
        }

        let code = match kitty_keycode(event.key, flags.contains(KittyFlags::REPORT_ALL))
            .or_else(|| (event.unshifted_codepoint != 0).then_some(event.unshifted_codepoint))
        {
            Some(code) => code,
            None => return false,
        };

        let mut seq = format!("\x1b[{code}");

        if flags.contains(KittyFlags::REPORT_ALTERNATES) && ctx.mods.contains(Mods::SHIFT) {
            let shifted = event
                .utf8_text
                .chars()
                .next()
                .or_else(|| event.key.shifted_char())
                .map(u32::from);
            if let Some(shifted) = shifted.filter(|&cp| cp != code) {
                seq.push_str(&format!(":{shifted}"));
            }
        }

        let text = if flags.contains(KittyFlags::REPORT_ASSOCIATED_TEXT)
            && ctx.action != KeyAction::Release
            && (ctx.mods - Mods::SHIFT).is_empty()
            && !event.utf8_text.is_empty()
            && !event.utf8_text.chars().any(char::is_control)
        {
            let codepoints: Vec<String> = event.utf8_text.chars().map(|c| u32::from(c).to_string()).collect();
            Some(codepoints.join(":"))
        } else {
            None
        };

        if mod_value != 1 || event_type.is_some() || text.is_some() {
            seq.push_str(&format!(";{mod_value}"));
            if let Some(e) = event_type {
                seq.push_str(&format!(":{e}"));
            }
        }
        if let Some(text) = text {
            seq.push(';');
            seq.push_str(&text);
        }
        seq.push('u');

        out.extend_from_slice(seq.as_bytes());
        true
    }

    fn encode_legacy(&self, ctx: &Ctx<'_>, out: &mut Vec<u8>) -> bool {
        let event = ctx.event;
        let key = event.key;
        let mods = ctx.mods;

        if mods.contains(Mods::CTRL) {
            if let Some(idx) = key.letter_index() {
                out.push(idx + 1);
                return true;
            }
        }

        if self.config.modify_other_keys_state_2
            && self.config.kitty_flags.is_empty()
            && mods.intersects(Mods::CTRL | Mods::SUPER)
        {
            if let Some(code) = modify_other_keys_code(key) {
                let seq = format!("\x1b[27;{};{code}~", mods.xterm_param());
                out.extend_from_slice(seq.as_bytes());
                return true;
            }
        }

        if mods.contains(Mods::CTRL) {
            if let Some(byte) = ctrl_symbol_byte(key) {
                out.push(byte);
                return true;
            }
        }

        if self.encode_special(ctx, out) {
            return true;
        }

        if ctx.alt_counts {
            if let Some(mut ch) = event.unshifted_char() {
                if mods.contains(Mods::SHIFT) && key.unshifted_char() == Some(ch) {
                    ch = key.shifted_char().unwrap_or(ch);
                }
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                return true;
            }
        }

        if !event.utf8_text.is_empty() {
            out.extend_from_slice(event.utf8_text.as_bytes());
            return true;
        }

        false
    }

    fn encode_special(&self, ctx: &Ctx<'_>, out: &mut Vec<u8>) -> bool {
        let key = ctx.event.key;
        // Alt travels through the ESC prefix, not the modifier parameter
        let nav_mods = ctx.mods - Mods::ALT;

        match key {
            Key::Enter => out.push(b'\r'),
            Key::Tab if ctx.mods.contains(Mods::SHIFT) => out.extend_from_slice(b"\x1b[Z"),
            Key::Tab => out.push(b'\t'),
            Key::Backspace => out.push(0x7f),
            Key::Escape => out.push(ESC),
            Key::ArrowUp => self.cursor_key(b'A', nav_mods, out),
            Key::ArrowDown => self.cursor_key(b'B', nav_mods, out),
            Key::ArrowRight => self.cursor_key(b'C', nav_mods, out),
            Key::ArrowLeft => self.cursor_key(b'D', nav_mods, out),
            Key::Home => self.cursor_key(b'H', nav_mods, out),
            Key::End => self.cursor_key(b'F', nav_mods, out),
            Key::Insert => csi_tilde_with_mod(2, nav_mods, out),
            Key::Delete => csi_tilde_with_mod(3, nav_mods, out),
            Key::PageUp => csi_tilde_with_mod(5, nav_mods, out),
            Key::PageDown => csi_tilde_with_mod(6, nav_mods, out),
            Key::F1 | Key::F2 | Key::F3 | Key::F4 => {
                let final_byte = match key {
                    Key::F1 => b'P',
                    Key::F2 => b'Q',
                    Key::F3 => b'R',
                    _ => b'S',
                };
                if nav_mods.is_empty() {
                    out.extend_from_slice(&[ESC, b'O', final_byte]);
                } else {
                    csi_with_mod(final_byte, nav_mods, out);
                }
            }
            _ => {
                if let Some(code) = key.function_number().and_then(function_key_code) {
                    csi_tilde_with_mod(code, nav_mods, out);
                } else if key.is_keypad() {
                    self.keypad_key(ctx, out);
                } else {
                    return false;
                }
            }
        }
        true
    }

    fn cursor_key(&self, final_byte: u8, mods: Mods, out: &mut Vec<u8>) {
        if !mods.is_empty() {
            csi_with_mod(final_byte, mods, out);
        } else if self.config.cursor_key_application {
            out.extend_from_slice(&[ESC, b'O', final_byte]);
        } else {
            out.extend_from_slice(&[ESC, b'[', final_byte]);
        }
    }

    fn keypad_key(&self, ctx: &Ctx<'_>, out: &mut Vec<u8>) {
        let key = ctx.event.key;
        let application = self.config.keypad_key_application
            && !(self.config.ignore_keypad_with_numlock && ctx.event.mods.contains(Mods::NUM_LOCK));

        if application {
            let final_byte = match key.numpad_digit() {
                Some(d) => b'p' + d,
                None => match key {
                    Key::NumpadDecimal => b'n',
                    Key::NumpadDivide => b'o',
                    Key::NumpadMultiply => b'j',
                    Key::NumpadSubtract => b'm',
                    Key::NumpadAdd => b'k',
                    Key::NumpadEnter => b'M',
                    _ => b'X',
                },
            };
            out.extend_from_slice(&[ESC, b'O', final_byte]);
        } else if let Some(ch) = key.keypad_char() {
            out.push(ch as u8);
        }
    }
}

fn csi_with_mod(final_byte: u8, mods: Mods, out: &mut Vec<u8>) {
    let seq = format!("\x1b[1;{}{}", mods.xterm_param(), final_byte as char);
    out.extend_from_slice(seq.as_bytes());
}

fn csi_tilde_with_mod(code: u16, mods: Mods, out: &mut Vec<u8>) {
    let seq = if mods.is_empty() {
        format!("\x1b[{code}~")
    } else {
        format!("\x1b[{code};{}~", mods.xterm_param())
    };
    out.extend_from_slice(seq.as_bytes());
}

/// `CSI n ~` code for F5–F12.
fn function_key_code(n: u8) -> Option<u16> {
    match n {
        5 => Some(15),
        6 => Some(17),
        7 => Some(18),
        8 => Some(19),
        9 => Some(20),
        10 => Some(21),
        11 => Some(23),
        12 => Some(24),
        _ => None,
    }
}

// xterm control codes for Ctrl with a symbol key
fn ctrl_symbol_byte(key: Key) -> Option<u8> {
    match key {
        Key::Space | Key::Digit2 => Some(0x00),
        Key::BracketLeft | Key::Digit3 => Some(0x1b),
        Key::Backslash | Key::Digit4 => Some(0x1c),
        Key::BracketRight | Key::Digit5 => Some(0x1d),
        Key::Digit6 => Some(0x1e),
        Key::Minus | Key::Slash | Key::Digit7 => Some(0x1f),
        Key::Digit8 => Some(0x7f),
        _ => None,
    }
}

fn modify_other_keys_code(key: Key) -> Option<u32> {
    match key {
        Key::Enter => Some(13),
        Key::Tab => Some(9),
        Key::Backspace => Some(127),
        Key::Escape => Some(27),
        _ if key.letter_index().is_some() => None,
        _ => key.unshifted_char().map(u32::from),
    }
}

/// Keys that keep their legacy CSI form under the Kitty protocol:
/// (number, final byte).
fn kitty_legacy_form(key: Key) -> Option<(u16, char)> {
    let form = match key {
        Key::ArrowUp => (1, 'A'),
        Key::ArrowDown => (1, 'B'),
        Key::ArrowRight => (1, 'C'),
        Key::ArrowLeft => (1, 'D'),
        Key::Home => (1, 'H'),
        Key::End => (1, 'F'),
        Key::F1 => (1, 'P'),
        Key::F2 => (1, 'Q'),
        Key::F3 => (13, '~'),
        Key::F4 => (1, 'S'),
        Key::Insert => (2, '~'),
        Key::Delete => (3, '~'),
        Key::PageUp => (5, '~'),
        Key::PageDown => (6, '~'),
        _ => return key.function_number().and_then(function_key_code).map(|code| (code, '~')),
    };
    Some(form)
}

fn kitty_keycode(key: Key, report_all: bool) -> Option<u32> {
    if let Some(ch) = key.unshifted_char() {
        return Some(u32::from(ch));
    }
    if let Some(d) = key.numpad_digit() {
        return Some(57399 + u32::from(d));
    }
    if let Some(n) = key.function_number().filter(|n| *n >= 13) {
        return Some(57376 + u32::from(n - 13));
    }

    let code = match key {
        Key::Enter => 13,
        Key::Tab => 9,
        Key::Backspace => 127,
        Key::Escape => 27,
        Key::NumpadDecimal => 57409,
        Key::NumpadDivide => 57410,
        Key::NumpadMultiply => 57411,
        Key::NumpadSubtract => 57412,
        Key::NumpadAdd => 57413,
        Key::NumpadEnter => 57414,
        Key::NumpadEqual => 57415,
        _ if !report_all => return None,
        Key::CapsLock => 57358,
        Key::NumLock => 57360,
        Key::ShiftLeft => 57441,
        Key::ControlLeft => 57442,
        Key::AltLeft => 57443,
        Key::SuperLeft => 57444,
        Key::ShiftRight => 57447,
        Key::ControlRight => 57448,
        Key::AltRight => 57449,
        Key::SuperRight => 57450,
        _ => return None,
    };
    Some(code)
}
