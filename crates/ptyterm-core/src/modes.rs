//! Keyboard-relevant terminal modes, tracked from the output stream.
//!
//! Applications switch input modes by writing CSI sequences to their
//! terminal. [`ModeTracker`] watches those sequences and mirrors them into
//! the [`KeyEncoder`] configuration, the way a terminal would update its own
//! input encoding.

use ptyterm_ansi::CsiSequence;
use tracing::debug;

use crate::constants::KITTY_STACK_LIMIT;
use crate::encoder::{KeyEncoder, KeyEncoderConfig, KittyFlags};

/// Reply to a primary device attributes request: VT220 with ANSI colour
const DEVICE_ATTRIBUTES_REPLY: &[u8] = b"\x1b[?62;22c";

#[derive(Debug, Default, Clone)]
pub struct ModeTracker {
    bracketed_paste: bool,
    kitty_stack: Vec<KittyFlags>,
    // encoder configuration before the first tracked change of this run
    baseline: Option<KeyEncoderConfig>,
}

impl ModeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// DEC mode 2004
    pub fn bracketed_paste(&self) -> bool {
        self.bracketed_paste
    }

    pub fn kitty_stack_depth(&self) -> usize {
        self.kitty_stack.len()
    }

    /// Forget all tracked state and undo the encoder changes made since the
    /// last reset.
    pub fn reset(&mut self, encoder: &mut KeyEncoder) {
        if let Some(baseline) = self.baseline.take() {
            encoder.set_config(baseline);
        }
        self.bracketed_paste = false;
        self.kitty_stack.clear();
    }

    /// Apply one CSI sequence. Returns bytes to send back to the
    /// application when the sequence was a query.
    pub fn apply(&mut self, seq: &CsiSequence, encoder: &mut KeyEncoder) -> Option<Vec<u8>> {
        if !seq.intermediates().is_empty() {
            return None;
        }

        match (seq.marker(), seq.final_byte()) {
            (Some(b'?'), b'h') => self.set_dec_modes(seq, true, encoder),
            (Some(b'?'), b'l') => self.set_dec_modes(seq, false, encoder),
            (Some(b'>'), b'm') => self.set_modify_other_keys(seq, encoder),
            (Some(b'>'), b'u') => {
                let flags = kitty_flags_param(seq.param(0, 0));
                self.touch(encoder);
                if self.kitty_stack.len() >= KITTY_STACK_LIMIT {
                    self.kitty_stack.remove(0);
                }
                self.kitty_stack.push(encoder.config().kitty_flags);
                encoder.set_kitty_flags(flags);
                debug!(?flags, depth = self.kitty_stack.len(), "kitty keyboard flags pushed");
            }
            (Some(b'<'), b'u') => {
                let count = seq.param(0, 1);
                self.touch(encoder);
                let mut flags = encoder.config().kitty_flags;
                for _ in 0..count {
                    match self.kitty_stack.pop() {
                        Some(previous) => flags = previous,
                        None => {
                            flags = KittyFlags::empty();
                            break;
                        }
                    }
                }
                encoder.set_kitty_flags(flags);
                debug!(?flags, depth = self.kitty_stack.len(), "kitty keyboard flags popped");
            }
            (Some(b'='), b'u') => {
                let requested = kitty_flags_param(seq.param(0, 0));
                let current = encoder.config().kitty_flags;
                let flags = match seq.param(1, 1) {
                    2 => current | requested,
                    3 => current - requested,
                    _ => requested,
                };
                self.touch(encoder);
                encoder.set_kitty_flags(flags);
                debug!(?flags, "kitty keyboard flags set");
            }
            (Some(b'?'), b'u') => {
                let flags = encoder.config().kitty_flags.bits();
                return Some(format!("\x1b[?{flags}u").into_bytes());
            }
            (None, b'c') if seq.param(0, 0) == 0 => {
                return Some(DEVICE_ATTRIBUTES_REPLY.to_vec());
            }
            _ => {}
        }
        None
    }

    fn touch(&mut self, encoder: &KeyEncoder) {
        if self.baseline.is_none() {
            self.baseline = Some(encoder.config().clone());
        }
    }

    fn set_dec_modes(&mut self, seq: &CsiSequence, enabled: bool, encoder: &mut KeyEncoder) {
        for mode in seq.params() {
            match mode {
                1 => {
                    self.touch(encoder);
                    encoder.set_cursor_key_application(enabled);
                }
                66 => {
                    self.touch(encoder);
                    encoder.set_keypad_key_application(enabled);
                }
                1035 => {
                    self.touch(encoder);
                    encoder.set_ignore_keypad_with_numlock(enabled);
                }
                1036 => {
                    self.touch(encoder);
                    encoder.set_alt_esc_prefix(enabled);
                }
                2004 => self.bracketed_paste = enabled,
                _ => continue,
            }
            debug!(mode, enabled, "DEC private mode");
        }
    }

    fn set_modify_other_keys(&mut self, seq: &CsiSequence, encoder: &mut KeyEncoder) {
        // only resource 4 (modifyOtherKeys) is tracked
        if seq.param(0, 0) != 4 {
            return;
        }
        let enabled = seq.param(1, 0) == 2;
        self.touch(encoder);
        encoder.set_modify_other_keys_state_2(enabled);
        debug!(enabled, "modifyOtherKeys state 2");
    }
}

fn kitty_flags_param(value: u16) -> KittyFlags {
    KittyFlags::from_bits_truncate(value.min(u8::MAX as u16) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csi(text: &str) -> CsiSequence {
        let (body, final_byte) = text.split_at(text.len() - 1);
        CsiSequence::new(body, &[], final_byte.as_bytes()[0])
    }

    fn apply_all(tracker: &mut ModeTracker, encoder: &mut KeyEncoder, seqs: &[&str]) {
        for seq in seqs {
            tracker.apply(&csi(seq), encoder);
        }
    }

    #[test]
    fn dec_private_modes() {
        let mut tracker = ModeTracker::new();
        let mut encoder = KeyEncoder::new();
        apply_all(&mut tracker, &mut encoder, &["?1h", "?66h", "?1035h", "?1036h", "?2004h"]);
        let config = encoder.config();
        assert!(config.cursor_key_application);
        assert!(config.keypad_key_application);
        assert!(config.ignore_keypad_with_numlock);
        assert!(config.alt_esc_prefix);
        assert!(tracker.bracketed_paste());

        apply_all(&mut tracker, &mut encoder, &["?1;2004l"]);
        assert!(!encoder.config().cursor_key_application);
        assert!(!tracker.bracketed_paste());
        assert!(encoder.config().keypad_key_application);
    }

    #[test]
    fn modify_other_keys() {
        let mut tracker = ModeTracker::new();
        let mut encoder = KeyEncoder::new();
        apply_all(&mut tracker, &mut encoder, &[">4;2m"]);
        assert!(encoder.config().modify_other_keys_state_2);
        apply_all(&mut tracker, &mut encoder, &[">4;1m"]);
        assert!(!encoder.config().modify_other_keys_state_2);
        apply_all(&mut tracker, &mut encoder, &[">4;2m", ">4m"]);
        assert!(!encoder.config().modify_other_keys_state_2);
    }

    #[test]
    fn plain_sgr_is_ignored() {
        let mut tracker = ModeTracker::new();
        let mut encoder = KeyEncoder::new();
        apply_all(&mut tracker, &mut encoder, &["4;2m", "1h"]);
        assert_eq!(encoder.config(), &KeyEncoderConfig::default());
    }

    #[test]
    fn kitty_push_pop() {
        let mut tracker = ModeTracker::new();
        let mut encoder = KeyEncoder::new();
        apply_all(&mut tracker, &mut encoder, &[">1u", ">31u"]);
        assert_eq!(encoder.config().kitty_flags.bits(), 31);
        assert_eq!(tracker.kitty_stack_depth(), 2);

        apply_all(&mut tracker, &mut encoder, &["<u"]);
        assert_eq!(encoder.config().kitty_flags, KittyFlags::DISAMBIGUATE);
        apply_all(&mut tracker, &mut encoder, &["<5u"]);
        assert!(encoder.config().kitty_flags.is_empty());
        assert_eq!(tracker.kitty_stack_depth(), 0);
    }

    #[test]
    fn kitty_stack_is_bounded() {
        let mut tracker = ModeTracker::new();
        let mut encoder = KeyEncoder::new();
        for _ in 0..KITTY_STACK_LIMIT + 5 {
            tracker.apply(&csi(">1u"), &mut encoder);
        }
        assert_eq!(tracker.kitty_stack_depth(), KITTY_STACK_LIMIT);
    }

    #[test]
    fn kitty_set_modes() {
        let mut tracker = ModeTracker::new();
        let mut encoder = KeyEncoder::new();
        apply_all(&mut tracker, &mut encoder, &["=1u"]);
        assert_eq!(encoder.config().kitty_flags, KittyFlags::DISAMBIGUATE);
        apply_all(&mut tracker, &mut encoder, &["=10;2u"]);
        assert_eq!(encoder.config().kitty_flags.bits(), 11);
        apply_all(&mut tracker, &mut encoder, &["=1;3u"]);
        assert_eq!(encoder.config().kitty_flags.bits(), 10);
    }

    #[test]
    fn queries_produce_replies() {
        let mut tracker = ModeTracker::new();
        let mut encoder = KeyEncoder::new();
        apply_all(&mut tracker, &mut encoder, &["=3u"]);
        assert_eq!(tracker.apply(&csi("?u"), &mut encoder), Some(b"\x1b[?3u".to_vec()));
        assert_eq!(tracker.apply(&csi("c"), &mut encoder), Some(DEVICE_ATTRIBUTES_REPLY.to_vec()));
        assert_eq!(tracker.apply(&csi(">c"), &mut encoder), None);
    }

    #[test]
    fn reset_restores_encoder_baseline() {
        let mut tracker = ModeTracker::new();
        let mut encoder = KeyEncoder::new();
        encoder.set_alt_esc_prefix(true);
        apply_all(&mut tracker, &mut encoder, &["?1h", ">1u", "?2004h", "?1036l"]);
        tracker.reset(&mut encoder);

        assert!(!tracker.bracketed_paste());
        assert!(!encoder.config().cursor_key_application);
        assert!(encoder.config().kitty_flags.is_empty());
        assert!(encoder.config().alt_esc_prefix);
    }
}
