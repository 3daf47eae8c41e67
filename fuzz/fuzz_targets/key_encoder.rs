#![no_main]
use libfuzzer_sys::fuzz_target;

use ptyterm::{Key, KeyAction, KeyEncoder, KeyEncoderConfig, KeyEvent, KittyFlags, Mods, OptionAsAlt};

fuzz_target!(|data: &[u8]| {
    if data.len() < 6 {
        return;
    }

    let config = KeyEncoderConfig {
        cursor_key_application: data[0] & 1 != 0,
        keypad_key_application: data[0] & 2 != 0,
        ignore_keypad_with_numlock: data[0] & 4 != 0,
        alt_esc_prefix: data[0] & 8 != 0,
        modify_other_keys_state_2: data[0] & 16 != 0,
        kitty_flags: KittyFlags::from_bits_truncate(data[1]),
        macos_option_as_alt: match data[0] >> 6 {
            0 => OptionAsAlt::False,
            1 => OptionAsAlt::True,
            2 => OptionAsAlt::Left,
            _ => OptionAsAlt::Right,
        },
    };
    let encoder = KeyEncoder::with_config(config);

    let key = Key::ALL[usize::from(data[2]) % Key::ALL.len()];
    let action = match data[3] % 3 {
        0 => KeyAction::Press,
        1 => KeyAction::Release,
        _ => KeyAction::Repeat,
    };
    let mods = Mods::from_bits_truncate(u16::from_le_bytes([data[4], data[5]]));
    let text = String::from_utf8_lossy(&data[6..]);

    let event = KeyEvent::new(action, key).with_mods(mods).with_text(text.as_ref());
    let bytes = encoder.encode(&event);

    // encoding is a pure function of configuration and event
    assert_eq!(bytes, encoder.encode(&event));

    if mods.essential() == Mods::CTRL && action == KeyAction::Press {
        if let Some(index) = key.letter_index() {
            assert_eq!(bytes, [index + 1]);
        }
    }
});
