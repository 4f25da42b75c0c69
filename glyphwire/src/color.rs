// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::remote::RenderColor;

/// A straight-alpha color packed as `0xRRGGBBAA`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Color(pub u32);

impl Color {
    /// Opaque white. Pre-colored glyphs are always painted with this pen.
    pub const WHITE: Self = Self(0xffff_ffff);
    /// Opaque black.
    pub const BLACK: Self = Self(0x0000_00ff);
    /// Fully transparent.
    pub const TRANSPARENT: Self = Self(0);

    /// Creates a color from 8-bit channels.
    pub const fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(u32::from_be_bytes([r, g, b, a]))
    }

    /// Returns the 8-bit channels as `[r, g, b, a]`.
    pub const fn to_rgba8(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Returns the alpha channel.
    #[expect(clippy::cast_possible_truncation, reason = "the low byte is alpha")]
    pub const fn alpha(self) -> u8 {
        self.0 as u8
    }

    /// Converts to the 16-bit premultiplied representation used by Render requests.
    #[expect(clippy::cast_possible_truncation, reason = "0xff * 0x101 fits in u16")]
    pub fn to_render(self) -> RenderColor {
        let [r, g, b, a] = self.to_rgba8();
        let premul = |c: u8| {
            let v = u32::from(c) * u32::from(a) / 255;
            // Scale 0..=255 to 0..=65535.
            (v * 0x101) as u16
        };
        RenderColor {
            red: premul(r),
            green: premul(g),
            blue: premul(b),
            alpha: u16::from(a) * 0x101,
        }
    }
}

impl From<u32> for Color {
    fn from(value: u32) -> Self {
        Self(value)
    }
}
