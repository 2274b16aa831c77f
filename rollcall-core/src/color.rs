use serde::{Deserialize, Serialize};

use crate::EntityId;

/// Opaque RGB colour of a body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Derives the colour of an entity from its id.
    ///
    /// Each channel is `100 + (id * k) mod 155` with `k` = 37, 73 and 19 for
    /// red, green and blue. Channels therefore stay in `100..=254`, which keeps
    /// every ball readable on a dark background. The product is taken in 64-bit
    /// arithmetic so large ids never overflow.
    pub fn from_id(id: EntityId) -> Self {
        let channel = |k: u64| (100 + (u64::from(id) * k) % 155) as u8;
        Self::new(channel(37), channel(73), channel(19))
    }

    pub const fn with_alpha(self, a: u8) -> Rgba {
        Rgba { r: self.r, g: self.g, b: self.b, a }
    }
}

/// RGB colour with an alpha channel, used for canvas strokes and fills.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<Rgb> for Rgba {
    fn from(rgb: Rgb) -> Self {
        rgb.with_alpha(255)
    }
}

/// Translucent white drawn around every ball.
pub const OUTLINE: Rgba = Rgb::new(255, 255, 255).with_alpha(60);

/// Panel background.
pub const BACKGROUND: Rgb = Rgb::new(18, 18, 18);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colour_matches_documented_formula() {
        assert_eq!(Rgb::from_id(0), Rgb::new(100, 100, 100));
        // 37 % 155, 73 % 155, 19 % 155
        assert_eq!(Rgb::from_id(1), Rgb::new(137, 173, 119));
        // 370 % 155 = 60, 730 % 155 = 110, 190 % 155 = 35
        assert_eq!(Rgb::from_id(10), Rgb::new(160, 210, 135));
    }

    #[test]
    fn colour_is_stable_per_id() {
        for id in [3, 42, 1_000, u32::MAX] {
            assert_eq!(Rgb::from_id(id), Rgb::from_id(id));
        }
    }

    #[test]
    fn large_ids_stay_in_range() {
        let c = Rgb::from_id(u32::MAX);
        assert!(c.r >= 100 && c.g >= 100 && c.b >= 100);
    }
}
