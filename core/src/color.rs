//! 24-bit segment colors

/// Packed `0xRRGGBB` color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgb(pub u32);

impl Rgb {
    pub const WHITE: Rgb = Rgb(0xFF_FF_FF);

    /// Shown while nothing is scheduled
    pub const NEUTRAL: Rgb = Rgb(0x00_0F_FF);

    pub const fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn b(self) -> u8 {
        self.0 as u8
    }

    /// Parse an optional `#RRGGBB` string, falling back to white.
    ///
    /// Hex digits are case-insensitive. Anything that is not exactly `#`
    /// followed by six hex digits yields [`Rgb::WHITE`].
    pub fn from_wire(color: Option<&str>) -> Self {
        color.and_then(parse_hex_color).unwrap_or(Self::WHITE)
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Parse `#RRGGBB` into a big-endian packed value
pub fn parse_hex_color(s: &str) -> Option<Rgb> {
    let digits = s.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }

    let mut packed = 0u32;
    for byte in digits.bytes() {
        let nibble = (byte as char).to_digit(16)?;
        packed = (packed << 4) | nibble;
    }
    Some(Rgb(packed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_case() {
        assert_eq!(parse_hex_color("#1A2B3C"), Some(Rgb(0x1A2B3C)));
        assert_eq!(parse_hex_color("#1a2b3c"), Some(Rgb(0x1A2B3C)));
        assert_eq!(parse_hex_color("#ff0000"), Some(Rgb(0xFF0000)));
    }

    #[test]
    fn test_absent_color_is_white() {
        assert_eq!(Rgb::from_wire(None), Rgb(0xFFFFFF));
    }

    #[test]
    fn test_malformed_colors_fall_back_to_white() {
        for bad in ["000000", "#00000", "#0000000", "#G00000", "", "#", "#12345Ä"] {
            assert_eq!(Rgb::from_wire(Some(bad)), Rgb::WHITE, "input {:?}", bad);
        }
    }

    #[test]
    fn test_channels() {
        let c = Rgb(0x0A141E);
        assert_eq!((c.r(), c.g(), c.b()), (10, 20, 30));
    }
}
