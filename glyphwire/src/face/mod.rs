// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rasterizer faces.
//!
//! A [`RasterFace`] is one face of one font file, able to map characters to glyphs,
//! report scaled metrics and rasterize individual glyphs. [`SwashFace`] implements it on
//! top of `swash`; tests substitute synthetic faces.

mod swash_face;

use std::path::Path;

pub use swash_face::{SwashFace, SwashLoader};

/// Scaled vertical and horizontal extents of a face, in pixels.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct FaceMetrics {
    /// Distance from the baseline to the top of the tallest glyph.
    pub ascent: f32,
    /// Distance from the baseline to the bottom of the lowest glyph, positive downwards.
    pub descent: f32,
    /// Recommended extra space between lines.
    pub line_gap: f32,
    /// Largest advance of any glyph.
    pub max_advance: f32,
}

/// What the pixels of a [`RasterGlyph`] mean.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum GlyphContent {
    /// One coverage byte per pixel.
    Mask,
    /// Four bytes per pixel, straight RGBA.
    Color,
}

impl GlyphContent {
    /// Bytes per pixel in [`RasterGlyph::data`].
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Mask => 1,
            Self::Color => 4,
        }
    }
}

/// A rasterized glyph image.
///
/// `left` and `top` place the image relative to the glyph origin: the top-left pixel is
/// at `(origin.x + left, origin.y - top)`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RasterGlyph {
    /// Horizontal offset of the left edge from the origin.
    pub left: i32,
    /// Vertical offset of the top edge above the baseline.
    pub top: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel layout of `data`.
    pub content: GlyphContent,
    /// Tightly packed rows.
    pub data: Vec<u8>,
}

impl RasterGlyph {
    /// An image without pixels.
    pub fn empty() -> Self {
        Self {
            left: 0,
            top: 0,
            width: 0,
            height: 0,
            content: GlyphContent::Mask,
            data: Vec::new(),
        }
    }

    /// Right edge of the ink relative to the origin.
    pub fn right(&self) -> i32 {
        self.left + self.width as i32
    }
}

/// Raw font bytes handed to a shaping engine.
#[derive(Copy, Clone, Debug)]
pub struct FontData<'a> {
    /// The complete font file.
    pub data: &'a [u8],
    /// Index of the face within a collection file.
    pub index: u32,
}

/// A font backend for one face.
pub trait RasterFace {
    /// Number of glyphs in the face.
    fn glyph_count(&self) -> u32;

    /// Whether the face has outlines that can be scaled to any size.
    fn is_scalable(&self) -> bool;

    /// Whether the face carries color glyphs.
    fn has_color(&self) -> bool;

    /// Pixel heights of the embedded bitmap strikes.
    fn fixed_sizes(&self) -> Vec<u16>;

    /// Face metrics at `pixel_size`.
    fn metrics(&self, pixel_size: f32) -> FaceMetrics;

    /// Glyph index for `ch`, 0 if the face does not cover it.
    fn glyph_index(&self, ch: char) -> u32;

    /// Horizontal advance of `glyph` at `pixel_size`.
    fn advance(&self, glyph: u32, pixel_size: f32) -> f32;

    /// Rasterizes `glyph` at `pixel_size`, shifted right by `x_shift` pixels (in `0..1`).
    fn render(&mut self, glyph: u32, pixel_size: f32, x_shift: f32, hint: bool)
    -> Option<RasterGlyph>;

    /// Font bytes for the shaper, if the face is backed by a font file.
    fn font_data(&self) -> Option<FontData<'_>>;

    /// Identifies the face in caches keyed by face.
    fn cache_key(&self) -> u64;
}

/// Opens faces found by a [`FontMatcher`](crate::FontMatcher).
pub trait FaceLoader {
    /// Loads face `index` of the font at `path`. Returns `None` if it cannot be read.
    fn open(&mut self, path: &Path, index: u32) -> Option<Box<dyn RasterFace>>;
}
