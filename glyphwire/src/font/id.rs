// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bit layout of glyph variant ids.

use core::fmt;

/// Largest supported number of sub-pixel bits: 1/64 pixel, the 26.6 fixed-point grid.
pub const MAX_SUBPIXEL_BITS: u8 = 6;

/// A glyph index combined with a horizontal sub-pixel phase.
///
/// This is the id under which a glyph image is stored in a font's remote glyph set.
/// Decode it with the [`GlyphIdSpace`] that produced it.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GlyphVariantId(pub u32);

impl fmt::Debug for GlyphVariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GlyphVariantId({:#x})", self.0)
    }
}

/// Layout of [`GlyphVariantId`]s for one font: `(phase << glyph_bits) | index`.
///
/// `glyph_bits` is the smallest width whose range exceeds the glyph count, so every
/// glyph index of the face fits; `subpixel_bits` bits of phase sit above it.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct GlyphIdSpace {
    glyph_bits: u8,
    subpixel_bits: u8,
}

impl GlyphIdSpace {
    /// The id space of a scalable face with `glyph_count` glyphs.
    ///
    /// `subpixel_bits` is clamped to [`MAX_SUBPIXEL_BITS`].
    #[expect(clippy::cast_possible_truncation, reason = "at most 32 bits")]
    pub fn for_glyph_count(glyph_count: u32, subpixel_bits: u8) -> Self {
        Self {
            glyph_bits: (u32::BITS - glyph_count.leading_zeros()) as u8,
            subpixel_bits: subpixel_bits.min(MAX_SUBPIXEL_BITS),
        }
    }

    /// The id space of a fixed-size face: no phase, ids are raw glyph indices.
    pub fn fixed(glyph_count: u32) -> Self {
        Self::for_glyph_count(glyph_count, 0)
    }

    /// Bits used by the glyph index.
    pub fn glyph_bits(&self) -> u8 {
        self.glyph_bits
    }

    /// Bits used by the phase.
    pub fn subpixel_bits(&self) -> u8 {
        self.subpixel_bits
    }

    /// Number of distinct phases.
    pub fn phase_count(&self) -> u32 {
        1 << self.subpixel_bits
    }

    /// Number of distinct ids.
    pub fn capacity(&self) -> usize {
        1 << (self.glyph_bits + self.subpixel_bits)
    }

    #[expect(clippy::cast_possible_truncation, reason = "glyph_bits is at most 32")]
    fn index_mask(&self) -> u32 {
        ((1_u64 << self.glyph_bits) - 1) as u32
    }

    /// Packs a glyph index and a phase.
    pub fn encode(&self, index: u32, phase: u32) -> GlyphVariantId {
        debug_assert!(
            index <= self.index_mask(),
            "glyph {index} exceeds {} bits",
            self.glyph_bits
        );
        debug_assert!(phase < self.phase_count(), "phase {phase} out of range");
        GlyphVariantId((phase << self.glyph_bits) | index)
    }

    /// The glyph index of `id`.
    pub fn index(&self, id: GlyphVariantId) -> u32 {
        id.0 & self.index_mask()
    }

    /// The phase of `id`.
    pub fn phase(&self, id: GlyphVariantId) -> u32 {
        id.0.checked_shr(u32::from(self.glyph_bits)).unwrap_or(0)
    }

    /// Whether `id` lies inside the space.
    pub fn contains(&self, id: GlyphVariantId) -> bool {
        (id.0 as usize) < self.capacity()
    }

    /// Horizontal shift in pixels that a glyph of `phase` is rasterized with.
    pub fn phase_shift(&self, phase: u32) -> f32 {
        phase as f32 / self.phase_count() as f32
    }

    /// Splits a 26.6 fixed-point position into a whole pixel and the nearest phase.
    ///
    /// Rounding up past the last phase carries into the next pixel.
    pub fn quantize(&self, x: i32) -> (i32, u32) {
        let step = 64 >> self.subpixel_bits;
        let steps = (x + step / 2).div_euclid(step);
        let count = self.phase_count() as i32;
        (steps.div_euclid(count), steps.rem_euclid(count) as u32)
    }
}
