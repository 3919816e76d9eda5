use std::fmt;

use palette::{Srgb, Srgba, WithAlpha};
use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// Fixed chart palette
// ---------------------------------------------------------------------------

/// blue, red, green, yellow, purple, cyan, orange, lime
const CHART_COLORS: [(u8, u8, u8); 8] = [
    (0x3B, 0x82, 0xF6),
    (0xEF, 0x44, 0x44),
    (0x10, 0xB9, 0x81),
    (0xF5, 0x9E, 0x0B),
    (0x8B, 0x5C, 0xF6),
    (0x06, 0xB6, 0xD4),
    (0xF9, 0x73, 0x16),
    (0x84, 0xCC, 0x16),
];

/// Alpha applied to translucent fills (0.8).
const FILL_ALPHA: u8 = 204;

pub fn palette_len() -> usize {
    CHART_COLORS.len()
}

/// Palette entry for `index`, cycling past the end.
pub fn palette_color(index: usize) -> ChartColor {
    let (r, g, b) = CHART_COLORS[index % CHART_COLORS.len()];
    ChartColor(Srgb::new(r, g, b).with_alpha(u8::MAX))
}

// ---------------------------------------------------------------------------
// ChartColor
// ---------------------------------------------------------------------------

/// A renderer color. Opaque colors print as `#RRGGBB`, translucent ones as
/// `rgba(r, g, b, a)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartColor(pub Srgba<u8>);

impl ChartColor {
    /// The same hue as a translucent fill.
    pub fn translucent(self) -> ChartColor {
        ChartColor(self.0.color.with_alpha(FILL_ALPHA))
    }

    pub fn is_opaque(self) -> bool {
        self.0.alpha == u8::MAX
    }
}

impl fmt::Display for ChartColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.0;
        if self.is_opaque() {
            write!(f, "#{:02X}{:02X}{:02X}", c.red, c.green, c.blue)
        } else {
            let alpha = c.alpha as f32 / 255.0;
            write!(f, "rgba({}, {}, {}, {alpha})", c.red, c.green, c.blue)
        }
    }
}

impl Serialize for ChartColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
