//! SGR (Select Graphic Rendition) parameter decoding.
//!
//! The scanner strips SGR sequences from the plain-text view; hosts that
//! want styling can feed the parameters of a `CSI ... m` sequence through
//! [`SgrParser`] to obtain a list of attribute changes.

use crate::color::{palette_rgb, Rgb};

/// Colour reference carried by an SGR attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    /// Index into the 256-colour palette
    Palette(u8),
    /// Direct colour
    Rgb(Rgb),
}

impl Color {
    /// Resolve to RGB using the xterm palette.
    pub fn to_rgb(self) -> Rgb {
        match self {
            Color::Palette(idx) => palette_rgb(idx),
            Color::Rgb(rgb) => rgb,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnderlineStyle {
    Single,
    Double,
    Curly,
    Dotted,
    Dashed,
}

impl UnderlineStyle {
    fn from_param(value: u16) -> Option<Self> {
        match value {
            1 => Some(UnderlineStyle::Single),
            2 => Some(UnderlineStyle::Double),
            3 => Some(UnderlineStyle::Curly),
            4 => Some(UnderlineStyle::Dotted),
            5 => Some(UnderlineStyle::Dashed),
            _ => None,
        }
    }
}

/// One attribute change requested by an SGR sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SgrAttribute {
    Reset,
    Bold,
    Dim,
    Italic,
    Underline(UnderlineStyle),
    Blink,
    Inverse,
    Invisible,
    Strikethrough,
    Overline,
    /// SGR 22 clears both bold and dim
    NormalIntensity,
    NoItalic,
    NoUnderline,
    NoBlink,
    NoInverse,
    NoInvisible,
    NoStrikethrough,
    NoOverline,
    Foreground(Color),
    Background(Color),
    UnderlineColor(Color),
    DefaultForeground,
    DefaultBackground,
    DefaultUnderlineColor,
    /// Parameter this parser does not interpret
    Unknown(u16),
}

impl SgrAttribute {
    pub fn rgb(&self) -> Option<Rgb> {
        match self {
            SgrAttribute::Foreground(Color::Rgb(rgb))
            | SgrAttribute::Background(Color::Rgb(rgb))
            | SgrAttribute::UnderlineColor(Color::Rgb(rgb)) => Some(*rgb),
            _ => None,
        }
    }

    pub fn palette_index(&self) -> Option<u8> {
        match self {
            SgrAttribute::Foreground(Color::Palette(idx))
            | SgrAttribute::Background(Color::Palette(idx))
            | SgrAttribute::UnderlineColor(Color::Palette(idx)) => Some(*idx),
            _ => None,
        }
    }

    pub fn underline_style(&self) -> Option<UnderlineStyle> {
        match self {
            SgrAttribute::Underline(style) => Some(*style),
            _ => None,
        }
    }
}

/// Stateless SGR decoder.
#[derive(Debug, Default, Clone, Copy)]
pub struct SgrParser;

impl SgrParser {
    pub fn new() -> Self {
        Self
    }

    /// Decode semicolon-separated parameters. An empty list means reset.
    pub fn parse_params(&self, params: &[u16]) -> Vec<SgrAttribute> {
        let groups: Vec<Vec<u16>> = params.iter().map(|&p| vec![p]).collect();
        self.parse_groups(&groups)
    }

    /// Decode the raw parameter text of a `CSI ... m` sequence, honouring
    /// colon sub-parameters such as `4:3` and `38:2::r:g:b`.
    pub fn parse_str(&self, params: &str) -> Vec<SgrAttribute> {
        if params.is_empty() {
            return vec![SgrAttribute::Reset];
        }
        let groups: Vec<Vec<u16>> = params
            .split(';')
            .map(|group| group.split(':').map(parse_number).collect())
            .collect();
        self.parse_groups(&groups)
    }

    fn parse_groups(&self, groups: &[Vec<u16>]) -> Vec<SgrAttribute> {
        if groups.is_empty() {
            return vec![SgrAttribute::Reset];
        }

        let mut attrs = Vec::with_capacity(groups.len());
        let mut i = 0;
        while i < groups.len() {
            let group = &groups[i];
            let param = group.first().copied().unwrap_or(0);

            if group.len() > 1 {
                attrs.push(colon_form(param, &group[1..]));
                i += 1;
                continue;
            }

            let attr = match param {
                0 => SgrAttribute::Reset,
                1 => SgrAttribute::Bold,
                2 => SgrAttribute::Dim,
                3 => SgrAttribute::Italic,
                4 => SgrAttribute::Underline(UnderlineStyle::Single),
                5 | 6 => SgrAttribute::Blink,
                7 => SgrAttribute::Inverse,
                8 => SgrAttribute::Invisible,
                9 => SgrAttribute::Strikethrough,
                21 => SgrAttribute::Underline(UnderlineStyle::Double),
                22 => SgrAttribute::NormalIntensity,
                23 => SgrAttribute::NoItalic,
                24 => SgrAttribute::NoUnderline,
                25 => SgrAttribute::NoBlink,
                27 => SgrAttribute::NoInverse,
                28 => SgrAttribute::NoInvisible,
                29 => SgrAttribute::NoStrikethrough,
                30..=37 => SgrAttribute::Foreground(Color::Palette((param - 30) as u8)),
                38 | 48 | 58 => {
                    // legacy semicolon form: 38;5;n or 38;2;r;g;b
                    let rest: Vec<u16> = groups[i + 1..].iter().map(|g| g.first().copied().unwrap_or(0)).collect();
                    match extended_color(&rest) {
                        Some((color, consumed)) => {
                            i += consumed;
                            wrap_color(param, color)
                        }
                        None => {
                            // incomplete: ignore the rest of the sequence
                            break;
                        }
                    }
                }
                39 => SgrAttribute::DefaultForeground,
                40..=47 => SgrAttribute::Background(Color::Palette((param - 40) as u8)),
                49 => SgrAttribute::DefaultBackground,
                53 => SgrAttribute::Overline,
                55 => SgrAttribute::NoOverline,
                59 => SgrAttribute::DefaultUnderlineColor,
                90..=97 => SgrAttribute::Foreground(Color::Palette((param - 90 + 8) as u8)),
                100..=107 => SgrAttribute::Background(Color::Palette((param - 100 + 8) as u8)),
                other => SgrAttribute::Unknown(other),
            };
            attrs.push(attr);
            i += 1;
        }
        attrs
    }
}

fn parse_number(s: &str) -> u16 {
    s.bytes()
        .filter(u8::is_ascii_digit)
        .fold(0u16, |acc, b| acc.saturating_mul(10).saturating_add((b - b'0') as u16))
}

fn clamp_u8(v: u16) -> u8 {
    v.min(255) as u8
}

fn wrap_color(param: u16, color: Color) -> SgrAttribute {
    match param {
        38 => SgrAttribute::Foreground(color),
        48 => SgrAttribute::Background(color),
        _ => SgrAttribute::UnderlineColor(color),
    }
}

/// Decode `5;n` or `2;r;g;b`, returning the colour and how many parameters
/// were consumed.
fn extended_color(rest: &[u16]) -> Option<(Color, usize)> {
    match rest.first()? {
        5 => rest.get(1).map(|&idx| (Color::Palette(clamp_u8(idx)), 2)),
        2 if rest.len() >= 4 => Some((
            Color::Rgb(Rgb::new(clamp_u8(rest[1]), clamp_u8(rest[2]), clamp_u8(rest[3]))),
            4,
        )),
        _ => None,
    }
}

fn colon_form(param: u16, sub: &[u16]) -> SgrAttribute {
    match param {
        4 => match sub[0] {
            0 => SgrAttribute::NoUnderline,
            style => UnderlineStyle::from_param(style)
                .map(SgrAttribute::Underline)
                .unwrap_or(SgrAttribute::Unknown(param)),
        },
        38 | 48 | 58 => {
            let color = match sub {
                [5, idx, ..] => Some(Color::Palette(clamp_u8(*idx))),
                // 38:2:<colorspace>:r:g:b
                [2, _, r, g, b, ..] => Some(Color::Rgb(Rgb::new(clamp_u8(*r), clamp_u8(*g), clamp_u8(*b)))),
                [2, r, g, b] => Some(Color::Rgb(Rgb::new(clamp_u8(*r), clamp_u8(*g), clamp_u8(*b)))),
                _ => None,
            };
            color.map(|c| wrap_color(param, c)).unwrap_or(SgrAttribute::Unknown(param))
        }
        other => SgrAttribute::Unknown(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(params: &[u16]) -> Vec<SgrAttribute> {
        SgrParser::new().parse_params(params)
    }

    #[test]
    fn empty_resets() {
        assert_eq!(parse(&[]), vec![SgrAttribute::Reset]);
        assert_eq!(SgrParser::new().parse_str(""), vec![SgrAttribute::Reset]);
    }

    #[test]
    fn text_attributes() {
        assert_eq!(
            parse(&[1, 3, 4, 22]),
            vec![
                SgrAttribute::Bold,
                SgrAttribute::Italic,
                SgrAttribute::Underline(UnderlineStyle::Single),
                SgrAttribute::NormalIntensity,
            ]
        );
    }

    #[test]
    fn standard_and_bright_colors() {
        assert_eq!(parse(&[31]), vec![SgrAttribute::Foreground(Color::Palette(1))]);
        assert_eq!(parse(&[44]), vec![SgrAttribute::Background(Color::Palette(4))]);
        assert_eq!(parse(&[91]), vec![SgrAttribute::Foreground(Color::Palette(9))]);
        assert_eq!(parse(&[107]), vec![SgrAttribute::Background(Color::Palette(15))]);
    }

    #[test]
    fn color_256_semicolon_form() {
        let attrs = parse(&[38, 5, 196, 1]);
        assert_eq!(attrs[0].palette_index(), Some(196));
        assert_eq!(attrs[1], SgrAttribute::Bold);
    }

    #[test]
    fn rgb_semicolon_form_clamps() {
        let attrs = parse(&[48, 2, 10, 300, 30]);
        assert_eq!(attrs, vec![SgrAttribute::Background(Color::Rgb(Rgb::new(10, 255, 30)))]);
        assert_eq!(attrs[0].rgb(), Some(Rgb::new(10, 255, 30)));
    }

    #[test]
    fn incomplete_extended_color_is_ignored() {
        assert_eq!(parse(&[38, 5]), Vec::<SgrAttribute>::new());
        assert_eq!(parse(&[1, 38, 2, 100]), vec![SgrAttribute::Bold]);
    }

    #[test]
    fn colon_underline_styles() {
        let attrs = SgrParser::new().parse_str("4:3;4:0");
        assert_eq!(attrs[0].underline_style(), Some(UnderlineStyle::Curly));
        assert_eq!(attrs[1], SgrAttribute::NoUnderline);
    }

    #[test]
    fn colon_rgb_with_and_without_colorspace() {
        let parser = SgrParser::new();
        assert_eq!(
            parser.parse_str("38:2::1:2:3"),
            vec![SgrAttribute::Foreground(Color::Rgb(Rgb::new(1, 2, 3)))]
        );
        assert_eq!(
            parser.parse_str("58:2:4:5:6"),
            vec![SgrAttribute::UnderlineColor(Color::Rgb(Rgb::new(4, 5, 6)))]
        );
    }

    #[test]
    fn default_colors_and_unknown() {
        assert_eq!(
            parse(&[39, 49, 77]),
            vec![SgrAttribute::DefaultForeground, SgrAttribute::DefaultBackground, SgrAttribute::Unknown(77)]
        );
    }

    #[test]
    fn palette_resolves_to_rgb() {
        assert_eq!(Color::Palette(196).to_rgb(), Rgb::new(255, 0, 0));
    }
}
