use serde::Serialize;

/// A 24-bit color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl From<Rgb> for crossterm::style::Color {
    fn from(color: Rgb) -> Self {
        Self::Rgb { r: color.r, g: color.g, b: color.b }
    }
}

/// The yellow-green used for the user's wave.
pub const ACCENT: Rgb = Rgb::new(0xc8, 0xe4, 0x4c);
pub const GHOST: Rgb = Rgb::new(0x88, 0x88, 0x88);
pub const BACKGROUND: Rgb = Rgb::new(0x0a, 0x0a, 0x0f);

// ACCENT in HSL
const ACCENT_HUE: f64 = 71.0;
const ACCENT_SATURATION: f64 = 74.0;
const ACCENT_LIGHTNESS: f64 = 60.0;

/// How much lightness a full glow adds.
const GLOW_LIGHTNESS: f64 = 30.0;

/// Convert HSL to RGB color
/// H: hue (0-360), S: saturation (0-100), L: lightness (0-100)
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> Rgb {
    let h = h.rem_euclid(360.0);
    let s = s.clamp(0.0, 100.0) / 100.0;
    let l = l.clamp(0.0, 100.0) / 100.0;

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;

    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let channel = |value: f64| ((value + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb::new(channel(r), channel(g), channel(b))
}

/// The user's wave color, brightened by a glow intensity in `[0, 1]`.
pub fn glow_color(glow: f64) -> Rgb {
    let lightness = (ACCENT_LIGHTNESS + glow.clamp(0.0, 1.0) * GLOW_LIGHTNESS).min(100.0);
    hsl_to_rgb(ACCENT_HUE, ACCENT_SATURATION, lightness)
}

/// Mixes `foreground` over `background` with the given alpha.
pub fn blend(foreground: Rgb, background: Rgb, alpha: f64) -> Rgb {
    let alpha = alpha.clamp(0.0, 1.0);
    let mix = |fg: u8, bg: u8| (fg as f64 * alpha + bg as f64 * (1.0 - alpha)).round() as u8;
    Rgb::new(mix(foreground.r, background.r), mix(foreground.g, background.g), mix(foreground.b, background.b))
}

/// The ghost wave's color at the given opacity, as drawn on the lab background.
pub fn ghost_color(opacity: f64) -> Rgb {
    blend(GHOST, BACKGROUND, opacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, Rgb::new(255, 0, 0))]
    #[case(120.0, Rgb::new(0, 255, 0))]
    #[case(240.0, Rgb::new(0, 0, 255))]
    #[case(360.0, Rgb::new(255, 0, 0))]
    fn primary_hues(#[case] hue: f64, #[case] expected: Rgb) {
        assert_eq!(hsl_to_rgb(hue, 100.0, 50.0), expected);
    }

    #[test]
    fn glow_brightens() {
        let dim = glow_color(0.0);
        let bright = glow_color(1.0);
        let sum = |c: Rgb| c.r as u32 + c.g as u32 + c.b as u32;
        assert!(sum(bright) > sum(dim));
        assert_eq!(glow_color(5.0), bright);
    }

    #[test]
    fn blend_endpoints() {
        assert_eq!(blend(GHOST, BACKGROUND, 1.0), GHOST);
        assert_eq!(blend(GHOST, BACKGROUND, 0.0), BACKGROUND);
        assert_eq!(ghost_color(0.0), BACKGROUND);
    }
}
