//! Key events: a cross-platform key identity, modifier bits and the event
//! snapshot handed to the [`KeyEncoder`](crate::encoder::KeyEncoder).

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use crate::error::TerminalError;

bitflags! {
    /// Modifier state of a key event.
    ///
    /// The low four bits match the Kitty keyboard protocol's modifier
    /// contribution, so `1 + (mods & 0xf)` is the CSI modifier parameter.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Mods: u16 {
        const SHIFT       = 1 << 0;
        const ALT         = 1 << 1;
        const CTRL        = 1 << 2;
        const SUPER       = 1 << 3;
        const CAPS_LOCK   = 1 << 6;
        const NUM_LOCK    = 1 << 7;

        const SHIFT_LEFT  = 1 << 8;
        const SHIFT_RIGHT = 1 << 9;
        const CTRL_LEFT   = 1 << 10;
        const CTRL_RIGHT  = 1 << 11;
        const ALT_LEFT    = 1 << 12;
        const ALT_RIGHT   = 1 << 13;
        const SUPER_LEFT  = 1 << 14;
        const SUPER_RIGHT = 1 << 15;
    }
}

impl Mods {
    /// Shift, Alt, Ctrl and Super, without lock or side bits.
    pub const ESSENTIAL: Mods = Mods::SHIFT.union(Mods::ALT).union(Mods::CTRL).union(Mods::SUPER);

    pub const LOCKS: Mods = Mods::CAPS_LOCK.union(Mods::NUM_LOCK);

    pub fn essential(self) -> Mods {
        self & Mods::ESSENTIAL
    }

    /// xterm-style modifier parameter: `1 + bits` over Shift/Alt/Ctrl/Super.
    pub fn xterm_param(self) -> u16 {
        1 + self.essential().bits()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    #[default]
    Press,
    Release,
    Repeat,
}

/// Physical key identity, independent of keyboard layout.
#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    Digit0, Digit1, Digit2, Digit3, Digit4,
    Digit5, Digit6, Digit7, Digit8, Digit9,
    Minus,
    Equal,
    BracketLeft,
    BracketRight,
    Backslash,
    Semicolon,
    Quote,
    Backquote,
    Comma,
    Period,
    Slash,
    Space,
    Enter,
    Tab,
    Backspace,
    Escape,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,
    F13, F14, F15, F16, F17, F18, F19, F20, F21, F22, F23, F24,
    Numpad0, Numpad1, Numpad2, Numpad3, Numpad4,
    Numpad5, Numpad6, Numpad7, Numpad8, Numpad9,
    NumpadDecimal,
    NumpadDivide,
    NumpadMultiply,
    NumpadSubtract,
    NumpadAdd,
    NumpadEnter,
    NumpadEqual,
    ShiftLeft,
    ShiftRight,
    ControlLeft,
    ControlRight,
    AltLeft,
    AltRight,
    SuperLeft,
    SuperRight,
    CapsLock,
    NumLock,
    Unidentified,
}

#[rustfmt::skip]
const LETTERS: [Key; 26] = [
    Key::A, Key::B, Key::C, Key::D, Key::E, Key::F, Key::G, Key::H, Key::I,
    Key::J, Key::K, Key::L, Key::M, Key::N, Key::O, Key::P, Key::Q, Key::R,
    Key::S, Key::T, Key::U, Key::V, Key::W, Key::X, Key::Y, Key::Z,
];

#[rustfmt::skip]
const DIGITS: [Key; 10] = [
    Key::Digit0, Key::Digit1, Key::Digit2, Key::Digit3, Key::Digit4,
    Key::Digit5, Key::Digit6, Key::Digit7, Key::Digit8, Key::Digit9,
];

#[rustfmt::skip]
const FUNCTION_KEYS: [Key; 24] = [
    Key::F1, Key::F2, Key::F3, Key::F4, Key::F5, Key::F6, Key::F7, Key::F8,
    Key::F9, Key::F10, Key::F11, Key::F12, Key::F13, Key::F14, Key::F15, Key::F16,
    Key::F17, Key::F18, Key::F19, Key::F20, Key::F21, Key::F22, Key::F23, Key::F24,
];

#[rustfmt::skip]
const NUMPAD_DIGITS: [Key; 10] = [
    Key::Numpad0, Key::Numpad1, Key::Numpad2, Key::Numpad3, Key::Numpad4,
    Key::Numpad5, Key::Numpad6, Key::Numpad7, Key::Numpad8, Key::Numpad9,
];

// (key, unshifted, shifted) on a US layout
const PUNCTUATION: [(Key, char, char); 12] = [
    (Key::Minus, '-', '_'),
    (Key::Equal, '=', '+'),
    (Key::BracketLeft, '[', '{'),
    (Key::BracketRight, ']', '}'),
    (Key::Backslash, '\\', '|'),
    (Key::Semicolon, ';', ':'),
    (Key::Quote, '\'', '"'),
    (Key::Backquote, '`', '~'),
    (Key::Comma, ',', '<'),
    (Key::Period, '.', '>'),
    (Key::Slash, '/', '?'),
    (Key::Space, ' ', ' '),
];

const SHIFTED_DIGITS: [char; 10] = [')', '!', '@', '#', '$', '%', '^', '&', '*', '('];

impl Key {
    /// Every key, in declaration order.
    #[rustfmt::skip]
    pub const ALL: &'static [Key] = &[
        Key::A, Key::B, Key::C, Key::D, Key::E, Key::F, Key::G, Key::H, Key::I,
        Key::J, Key::K, Key::L, Key::M, Key::N, Key::O, Key::P, Key::Q, Key::R,
        Key::S, Key::T, Key::U, Key::V, Key::W, Key::X, Key::Y, Key::Z,
        Key::Digit0, Key::Digit1, Key::Digit2, Key::Digit3, Key::Digit4,
        Key::Digit5, Key::Digit6, Key::Digit7, Key::Digit8, Key::Digit9,
        Key::Minus, Key::Equal, Key::BracketLeft, Key::BracketRight, Key::Backslash,
        Key::Semicolon, Key::Quote, Key::Backquote, Key::Comma, Key::Period,
        Key::Slash, Key::Space,
        Key::Enter, Key::Tab, Key::Backspace, Key::Escape,
        Key::ArrowUp, Key::ArrowDown, Key::ArrowLeft, Key::ArrowRight,
        Key::Home, Key::End, Key::PageUp, Key::PageDown, Key::Insert, Key::Delete,
        Key::F1, Key::F2, Key::F3, Key::F4, Key::F5, Key::F6, Key::F7, Key::F8,
        Key::F9, Key::F10, Key::F11, Key::F12, Key::F13, Key::F14, Key::F15, Key::F16,
        Key::F17, Key::F18, Key::F19, Key::F20, Key::F21, Key::F22, Key::F23, Key::F24,
        Key::Numpad0, Key::Numpad1, Key::Numpad2, Key::Numpad3, Key::Numpad4,
        Key::Numpad5, Key::Numpad6, Key::Numpad7, Key::Numpad8, Key::Numpad9,
        Key::NumpadDecimal, Key::NumpadDivide, Key::NumpadMultiply, Key::NumpadSubtract,
        Key::NumpadAdd, Key::NumpadEnter, Key::NumpadEqual,
        Key::ShiftLeft, Key::ShiftRight, Key::ControlLeft, Key::ControlRight,
        Key::AltLeft, Key::AltRight, Key::SuperLeft, Key::SuperRight,
        Key::CapsLock, Key::NumLock,
        Key::Unidentified,
    ];

    /// Zero-based alphabet position for A–Z.
    pub fn letter_index(self) -> Option<u8> {
        LETTERS.iter().position(|&k| k == self).map(|i| i as u8)
    }

    pub fn digit_value(self) -> Option<u8> {
        DIGITS.iter().position(|&k| k == self).map(|i| i as u8)
    }

    /// `n` for the function key Fn.
    pub fn function_number(self) -> Option<u8> {
        FUNCTION_KEYS.iter().position(|&k| k == self).map(|i| i as u8 + 1)
    }

    pub fn numpad_digit(self) -> Option<u8> {
        NUMPAD_DIGITS.iter().position(|&k| k == self).map(|i| i as u8)
    }

    pub fn letter(index: u8) -> Option<Key> {
        LETTERS.get(index as usize).copied()
    }

    pub fn digit(value: u8) -> Option<Key> {
        DIGITS.get(value as usize).copied()
    }

    pub fn function(n: u8) -> Option<Key> {
        n.checked_sub(1).and_then(|i| FUNCTION_KEYS.get(i as usize)).copied()
    }

    pub fn is_keypad(self) -> bool {
        matches!(
            self,
            Key::Numpad0 | Key::Numpad1 | Key::Numpad2 | Key::Numpad3 | Key::Numpad4
                | Key::Numpad5 | Key::Numpad6 | Key::Numpad7 | Key::Numpad8 | Key::Numpad9
                | Key::NumpadDecimal | Key::NumpadDivide | Key::NumpadMultiply
                | Key::NumpadSubtract | Key::NumpadAdd | Key::NumpadEnter | Key::NumpadEqual
        )
    }

    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            Key::ShiftLeft | Key::ShiftRight | Key::ControlLeft | Key::ControlRight
                | Key::AltLeft | Key::AltRight | Key::SuperLeft | Key::SuperRight
                | Key::CapsLock | Key::NumLock
        )
    }

    /// Character the key produces with no modifiers on a US layout.
    pub fn unshifted_char(self) -> Option<char> {
        if let Some(i) = self.letter_index() {
            return Some((b'a' + i) as char);
        }
        if let Some(d) = self.digit_value() {
            return Some((b'0' + d) as char);
        }
        PUNCTUATION.iter().find(|(k, _, _)| *k == self).map(|&(_, c, _)| c)
    }

    /// Character the key produces with Shift on a US layout.
    pub fn shifted_char(self) -> Option<char> {
        if let Some(i) = self.letter_index() {
            return Some((b'A' + i) as char);
        }
        if let Some(d) = self.digit_value() {
            return Some(SHIFTED_DIGITS[d as usize]);
        }
        PUNCTUATION.iter().find(|(k, _, _)| *k == self).map(|&(_, _, c)| c)
    }

    /// Literal character a keypad key stands for.
    pub fn keypad_char(self) -> Option<char> {
        if let Some(d) = self.numpad_digit() {
            return Some((b'0' + d) as char);
        }
        match self {
            Key::NumpadDecimal => Some('.'),
            Key::NumpadDivide => Some('/'),
            Key::NumpadMultiply => Some('*'),
            Key::NumpadSubtract => Some('-'),
            Key::NumpadAdd => Some('+'),
            Key::NumpadEnter => Some('\r'),
            Key::NumpadEqual => Some('='),
            _ => None,
        }
    }

    /// Key that types `ch` on a US layout, and whether Shift is needed.
    pub fn from_char(ch: char) -> Option<(Key, bool)> {
        match ch {
            'a'..='z' => Key::letter(ch as u8 - b'a').map(|k| (k, false)),
            'A'..='Z' => Key::letter(ch as u8 - b'A').map(|k| (k, true)),
            '0'..='9' => Key::digit(ch as u8 - b'0').map(|k| (k, false)),
            _ => {
                if let Some(pos) = SHIFTED_DIGITS.iter().position(|&c| c == ch) {
                    return Key::digit(pos as u8).map(|k| (k, true));
                }
                PUNCTUATION.iter().find_map(|&(k, plain, shifted)| {
                    if plain == ch {
                        Some((k, false))
                    } else if shifted == ch {
                        Some((k, true))
                    } else {
                        None
                    }
                })
            }
        }
    }

    /// Canonical lowercase name, accepted back by [`Key::from_str`].
    #[rustfmt::skip]
    pub fn name(self) -> &'static str {
        match self {
            Key::A => "a", Key::B => "b", Key::C => "c", Key::D => "d", Key::E => "e",
            Key::F => "f", Key::G => "g", Key::H => "h", Key::I => "i", Key::J => "j",
            Key::K => "k", Key::L => "l", Key::M => "m", Key::N => "n", Key::O => "o",
            Key::P => "p", Key::Q => "q", Key::R => "r", Key::S => "s", Key::T => "t",
            Key::U => "u", Key::V => "v", Key::W => "w", Key::X => "x", Key::Y => "y",
            Key::Z => "z",
            Key::Digit0 => "0", Key::Digit1 => "1", Key::Digit2 => "2", Key::Digit3 => "3",
            Key::Digit4 => "4", Key::Digit5 => "5", Key::Digit6 => "6", Key::Digit7 => "7",
            Key::Digit8 => "8", Key::Digit9 => "9",
            Key::Minus => "minus",
            Key::Equal => "equal",
            Key::BracketLeft => "bracket_left",
            Key::BracketRight => "bracket_right",
            Key::Backslash => "backslash",
            Key::Semicolon => "semicolon",
            Key::Quote => "quote",
            Key::Backquote => "backquote",
            Key::Comma => "comma",
            Key::Period => "period",
            Key::Slash => "slash",
            Key::Space => "space",
            Key::Enter => "enter",
            Key::Tab => "tab",
            Key::Backspace => "backspace",
            Key::Escape => "escape",
            Key::ArrowUp => "up",
            Key::ArrowDown => "down",
            Key::ArrowLeft => "left",
            Key::ArrowRight => "right",
            Key::Home => "home",
            Key::End => "end",
            Key::PageUp => "page_up",
            Key::PageDown => "page_down",
            Key::Insert => "insert",
            Key::Delete => "delete",
            Key::F1 => "f1", Key::F2 => "f2", Key::F3 => "f3", Key::F4 => "f4",
            Key::F5 => "f5", Key::F6 => "f6", Key::F7 => "f7", Key::F8 => "f8",
            Key::F9 => "f9", Key::F10 => "f10", Key::F11 => "f11", Key::F12 => "f12",
            Key::F13 => "f13", Key::F14 => "f14", Key::F15 => "f15", Key::F16 => "f16",
            Key::F17 => "f17", Key::F18 => "f18", Key::F19 => "f19", Key::F20 => "f20",
            Key::F21 => "f21", Key::F22 => "f22", Key::F23 => "f23", Key::F24 => "f24",
            Key::Numpad0 => "kp_0", Key::Numpad1 => "kp_1", Key::Numpad2 => "kp_2",
            Key::Numpad3 => "kp_3", Key::Numpad4 => "kp_4", Key::Numpad5 => "kp_5",
            Key::Numpad6 => "kp_6", Key::Numpad7 => "kp_7", Key::Numpad8 => "kp_8",
            Key::Numpad9 => "kp_9",
            Key::NumpadDecimal => "kp_decimal",
            Key::NumpadDivide => "kp_divide",
            Key::NumpadMultiply => "kp_multiply",
            Key::NumpadSubtract => "kp_subtract",
            Key::NumpadAdd => "kp_add",
            Key::NumpadEnter => "kp_enter",
            Key::NumpadEqual => "kp_equal",
            Key::ShiftLeft => "shift_left",
            Key::ShiftRight => "shift_right",
            Key::ControlLeft => "ctrl_left",
            Key::ControlRight => "ctrl_right",
            Key::AltLeft => "alt_left",
            Key::AltRight => "alt_right",
            Key::SuperLeft => "super_left",
            Key::SuperRight => "super_right",
            Key::CapsLock => "caps_lock",
            Key::NumLock => "num_lock",
            Key::Unidentified => "unidentified",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn key_alias(normalized: &str) -> Option<Key> {
    let key = match normalized {
        "esc" => Key::Escape,
        "return" | "cr" => Key::Enter,
        "bs" => Key::Backspace,
        "del" => Key::Delete,
        "ins" => Key::Insert,
        "pgup" | "prior" => Key::PageUp,
        "pgdn" | "pgdown" | "next" => Key::PageDown,
        "arrowup" => Key::ArrowUp,
        "arrowdown" => Key::ArrowDown,
        "arrowleft" => Key::ArrowLeft,
        "arrowright" => Key::ArrowRight,
        "plus" => Key::Equal,
        "dash" | "hyphen" => Key::Minus,
        "grave" | "backtick" => Key::Backquote,
        "dot" => Key::Period,
        "kpenter" | "numpadenter" => Key::NumpadEnter,
        "lshift" => Key::ShiftLeft,
        "rshift" => Key::ShiftRight,
        "lctrl" | "controlleft" => Key::ControlLeft,
        "rctrl" | "controlright" => Key::ControlRight,
        "lalt" => Key::AltLeft,
        "ralt" => Key::AltRight,
        "capslock" => Key::CapsLock,
        "numlock" => Key::NumLock,
        _ => return None,
    };
    Some(key)
}

impl FromStr for Key {
    type Err = TerminalError;

    /// Parse a key name (`up`, `page_down`, `f5`, `kp_enter`) or a single
    /// character (`a`, `[`). Names are case-insensitive; `_` and `-` inside
    /// names are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            if let Some((key, _)) = Key::from_char(ch.to_ascii_lowercase()) {
                return Ok(key);
            }
            if let Some((key, _)) = Key::from_char(ch) {
                return Ok(key);
            }
        }

        let normalized = normalize_name(s);
        Key::ALL
            .iter()
            .copied()
            .find(|k| normalize_name(k.name()) == normalized)
            .or_else(|| key_alias(&normalized))
            .ok_or_else(|| TerminalError::InvalidKeyChord {
                chord: s.to_string(),
                reason: "unknown key name".to_string(),
            })
    }
}

/// A single keyboard event, as reported by the host's input layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub action: KeyAction,
    pub key: Key,
    pub mods: Mods,
    /// Modifiers the platform already applied to produce `utf8_text`
    pub consumed_mods: Mods,
    /// An IME composition is in progress
    pub composing: bool,
    pub utf8_text: String,
    /// Codepoint the key produces with no modifiers; 0 when unknown
    pub unshifted_codepoint: u32,
}

impl KeyEvent {
    pub fn new(action: KeyAction, key: Key) -> Self {
        Self {
            action,
            key,
            mods: Mods::empty(),
            consumed_mods: Mods::empty(),
            composing: false,
            utf8_text: String::new(),
            unshifted_codepoint: 0,
        }
    }

    pub fn press(key: Key) -> Self {
        Self::new(KeyAction::Press, key)
    }

    pub fn release(key: Key) -> Self {
        Self::new(KeyAction::Release, key)
    }

    pub fn repeat(key: Key) -> Self {
        Self::new(KeyAction::Repeat, key)
    }

    /// Press of the US-layout key that types `ch`, with text and Shift
    /// filled in.
    pub fn from_char(ch: char) -> Self {
        match Key::from_char(ch) {
            Some((key, shifted)) => {
                let mut event = Self::press(key).with_text(ch.to_string());
                event.unshifted_codepoint = key.unshifted_char().map_or(0, u32::from);
                if shifted {
                    event.mods |= Mods::SHIFT;
                    event.consumed_mods |= Mods::SHIFT;
                }
                event
            }
            None => Self::press(Key::Unidentified).with_text(ch.to_string()),
        }
    }

    pub fn with_action(mut self, action: KeyAction) -> Self {
        self.action = action;
        self
    }

    pub fn with_mods(mut self, mods: Mods) -> Self {
        self.mods = mods;
        self
    }

    pub fn with_consumed_mods(mut self, mods: Mods) -> Self {
        self.consumed_mods = mods;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.utf8_text = text.into();
        self
    }

    pub fn with_unshifted_codepoint(mut self, codepoint: u32) -> Self {
        self.unshifted_codepoint = codepoint;
        self
    }

    pub fn with_composing(mut self, composing: bool) -> Self {
        self.composing = composing;
        self
    }

    pub fn unshifted_char(&self) -> Option<char> {
        match self.unshifted_codepoint {
            0 => None,
            cp => char::from_u32(cp),
        }
    }
}

fn modifier_from_name(name: &str) -> Option<Mods> {
    let mods = match normalize_name(name).as_str() {
        "ctrl" | "control" => Mods::CTRL,
        "alt" | "option" | "opt" | "meta" => Mods::ALT,
        "shift" => Mods::SHIFT,
        "super" | "cmd" | "command" | "win" | "logo" => Mods::SUPER,
        _ => return None,
    };
    Some(mods)
}

impl FromStr for KeyEvent {
    type Err = TerminalError;

    /// Parse a chord such as `ctrl+c`, `alt+enter`, `ctrl+shift+up` or `A`.
    ///
    /// The resulting press carries the text a US layout would produce (Shift
    /// marked consumed when it changed the character) and the key's
    /// unshifted codepoint. `+` on its own is written `plus` or as the
    /// trailing `++` of a chord.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TerminalError::InvalidKeyChord {
            chord: s.to_string(),
            reason: reason.to_string(),
        };

        if s.is_empty() {
            return Err(invalid("empty chord"));
        }

        let (prefix, key_part) = if s == "+" {
            ("", "+")
        } else if let Some(prefix) = s.strip_suffix("++") {
            (prefix, "+")
        } else {
            match s.rsplit_once('+') {
                Some((prefix, key)) => (prefix, key),
                None => ("", s),
            }
        };
        if key_part.is_empty() {
            return Err(invalid("missing key"));
        }

        let mut mods = Mods::empty();
        for part in prefix.split('+').filter(|p| !p.is_empty()) {
            mods |= modifier_from_name(part).ok_or_else(|| invalid("unknown modifier"))?;
        }

        let (key, implied_shift) = {
            let mut chars = key_part.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => match Key::from_char(ch) {
                    Some(found) => found,
                    None => (key_part.parse::<Key>()?, false),
                },
                _ => (key_part.parse::<Key>()?, false),
            }
        };
        if implied_shift {
            mods |= Mods::SHIFT;
        }

        let mut event = KeyEvent::press(key).with_mods(mods);
        if let Some(plain) = key.unshifted_char() {
            event.unshifted_codepoint = plain as u32;
            let produced = if mods.contains(Mods::SHIFT) {
                key.shifted_char().unwrap_or(plain)
            } else {
                plain
            };
            if produced != plain {
                event.consumed_mods = Mods::SHIFT;
            }
            event.utf8_text = produced.to_string();
        } else if let Some(ch) = key.keypad_char().filter(|c| !c.is_control()) {
            event.utf8_text = ch.to_string();
        }
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mods_low_bits_match_kitty_layout() {
        assert_eq!(Mods::SHIFT.bits(), 1);
        assert_eq!(Mods::ALT.bits(), 2);
        assert_eq!(Mods::CTRL.bits(), 4);
        assert_eq!(Mods::SUPER.bits(), 8);
        assert_eq!((Mods::CTRL | Mods::SHIFT | Mods::CTRL_LEFT).xterm_param(), 6);
    }

    #[test]
    fn key_names_round_trip() {
        for &key in Key::ALL {
            assert_eq!(key.name().parse::<Key>().unwrap(), key, "{key:?}");
        }
    }

    #[test]
    fn key_aliases_and_characters() {
        assert_eq!("Esc".parse::<Key>().unwrap(), Key::Escape);
        assert_eq!("PageDown".parse::<Key>().unwrap(), Key::PageDown);
        assert_eq!("[".parse::<Key>().unwrap(), Key::BracketLeft);
        assert_eq!("Q".parse::<Key>().unwrap(), Key::Q);
        assert!("hyperspace".parse::<Key>().is_err());
    }

    #[test]
    fn lookup_helpers() {
        assert_eq!(Key::C.letter_index(), Some(2));
        assert_eq!(Key::F11.function_number(), Some(11));
        assert_eq!(Key::function(13), Some(Key::F13));
        assert_eq!(Key::function(0), None);
        assert_eq!(Key::Numpad7.keypad_char(), Some('7'));
        assert_eq!(Key::Digit2.shifted_char(), Some('@'));
        assert!(Key::AltRight.is_modifier());
        assert!(!Key::Enter.is_keypad());
    }

    #[test]
    fn chord_with_modifiers() {
        let event: KeyEvent = "ctrl+shift+up".parse().unwrap();
        assert_eq!(event.key, Key::ArrowUp);
        assert_eq!(event.mods, Mods::CTRL | Mods::SHIFT);
        assert!(event.utf8_text.is_empty());
        assert_eq!(event.unshifted_codepoint, 0);
    }

    #[test]
    fn chord_fills_text_and_consumed_shift() {
        let event: KeyEvent = "shift+a".parse().unwrap();
        assert_eq!(event.utf8_text, "A");
        assert_eq!(event.consumed_mods, Mods::SHIFT);
        assert_eq!(event.unshifted_codepoint, 'a' as u32);

        let event: KeyEvent = "ctrl+c".parse().unwrap();
        assert_eq!(event.utf8_text, "c");
        assert!(event.consumed_mods.is_empty());
    }

    #[test]
    fn uppercase_and_symbol_chords_imply_shift() {
        let event: KeyEvent = "A".parse().unwrap();
        assert_eq!(event.key, Key::A);
        assert!(event.mods.contains(Mods::SHIFT));

        let event: KeyEvent = "alt+?".parse().unwrap();
        assert_eq!(event.key, Key::Slash);
        assert_eq!(event.utf8_text, "?");
        assert_eq!(event.mods, Mods::ALT | Mods::SHIFT);
    }

    #[test]
    fn plus_key_chords() {
        let event: KeyEvent = "ctrl++".parse().unwrap();
        assert_eq!(event.key, Key::Equal);
        assert_eq!(event.utf8_text, "+");
        assert!(event.mods.contains(Mods::CTRL));
        assert_eq!("+".parse::<KeyEvent>().unwrap().key, Key::Equal);
    }

    #[test]
    fn invalid_chords() {
        assert!("".parse::<KeyEvent>().is_err());
        assert!("ctrl+".parse::<KeyEvent>().is_err());
        assert!("hyper+a".parse::<KeyEvent>().is_err());
        let err = "ctrl+nope".parse::<KeyEvent>().unwrap_err();
        assert!(matches!(err, TerminalError::InvalidKeyChord { .. }));
    }

    #[test]
    fn event_from_char() {
        let event = KeyEvent::from_char('%');
        assert_eq!(event.key, Key::Digit5);
        assert_eq!(event.mods, Mods::SHIFT);
        assert_eq!(event.unshifted_char(), Some('5'));

        let event = KeyEvent::from_char('\u{e9}');
        assert_eq!(event.key, Key::Unidentified);
        assert_eq!(event.utf8_text, "\u{e9}");
    }
}
