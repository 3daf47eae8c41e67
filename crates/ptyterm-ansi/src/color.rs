/// 8-bit RGB triple
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

// 16-color ANSI palette
pub const COLOR_PALETTE: [Rgb; 16] = [
    // Basic 8 colors
    Rgb::new(0x00, 0x00, 0x00), // Black
    Rgb::new(0xcd, 0x00, 0x00), // Red
    Rgb::new(0x00, 0xcd, 0x00), // Green
    Rgb::new(0xcd, 0xcd, 0x00), // Yellow
    Rgb::new(0x00, 0x00, 0xee), // Blue
    Rgb::new(0xcd, 0x00, 0xcd), // Magenta
    Rgb::new(0x00, 0xcd, 0xcd), // Cyan
    Rgb::new(0xe5, 0xe5, 0xe5), // White
    // Bright colors
    Rgb::new(0x7f, 0x7f, 0x7f), // Bright Black (Gray)
    Rgb::new(0xff, 0x00, 0x00), // Bright Red
    Rgb::new(0x00, 0xff, 0x00), // Bright Green
    Rgb::new(0xff, 0xff, 0x00), // Bright Yellow
    Rgb::new(0x5c, 0x5c, 0xff), // Bright Blue
    Rgb::new(0xff, 0x00, 0xff), // Bright Magenta
    Rgb::new(0x00, 0xff, 0xff), // Bright Cyan
    Rgb::new(0xff, 0xff, 0xff), // Bright White
];

/// Resolve an xterm 256-color palette index to RGB.
///
/// 0-15 come from [`COLOR_PALETTE`], 16-231 form the 6x6x6 cube and
/// 232-255 the grayscale ramp.
pub fn palette_rgb(index: u8) -> Rgb {
    match index {
        0..=15 => COLOR_PALETTE[index as usize],
        16..=231 => {
            let idx = index - 16;
            let level = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
            Rgb::new(level(idx / 36), level((idx / 6) % 6), level(idx % 6))
        }
        232..=255 => {
            let gray = 8 + (index - 232) * 10;
            Rgb::new(gray, gray, gray)
        }
    }
}
