// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text shaping.
//!
//! A [`Shaper`] turns a string into positioned glyphs of one face. [`HarfrustShaper`] is
//! the real engine; [`SimpleShaper`] maps one character to one glyph and is used for
//! faces without font data.

mod harfrust_shaper;

use crate::face::RasterFace;

pub use harfrust_shaper::HarfrustShaper;

/// Main direction of a line of text.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum Direction {
    /// Along the x axis, left to right or right to left as the script demands.
    #[default]
    Horizontal,
    /// Top to bottom.
    Vertical,
}

/// Parameters of a shaping call.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ShapeParams<'a> {
    /// Size to scale positions to.
    pub pixel_size: f32,
    /// Line direction.
    pub direction: Direction,
    /// BCP 47 language hint.
    pub language: Option<&'a str>,
}

/// A glyph produced by shaping.
///
/// Positions are 26.6 fixed-point pixels with y growing upwards, as in OpenType.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct ShapedGlyph {
    /// Glyph index in the face.
    pub glyph: u32,
    /// Index of the first character of the cluster this glyph belongs to.
    pub cluster: usize,
    /// Horizontal pen advance.
    pub x_advance: i32,
    /// Vertical pen advance.
    pub y_advance: i32,
    /// Horizontal displacement from the pen position.
    pub x_offset: i32,
    /// Vertical displacement from the pen position.
    pub y_offset: i32,
}

/// A text-shaping engine.
pub trait Shaper {
    /// Shapes `text` with `face`. Glyphs come in visual order; clusters are char indices.
    fn shape(
        &mut self,
        face: &dyn RasterFace,
        text: &str,
        params: &ShapeParams<'_>,
    ) -> Vec<ShapedGlyph>;
}

/// Maps each character to the face's glyph for it, advancing by the glyph's advance.
#[derive(Copy, Clone, Debug, Default)]
pub struct SimpleShaper;

impl Shaper for SimpleShaper {
    fn shape(
        &mut self,
        face: &dyn RasterFace,
        text: &str,
        params: &ShapeParams<'_>,
    ) -> Vec<ShapedGlyph> {
        let line = match params.direction {
            Direction::Horizontal => 0,
            Direction::Vertical => {
                let metrics = face.metrics(params.pixel_size);
                to_26_6(metrics.ascent + metrics.descent)
            }
        };
        text.chars()
            .enumerate()
            .map(|(cluster, ch)| {
                let glyph = face.glyph_index(ch);
                let (x_advance, y_advance) = match params.direction {
                    Direction::Horizontal => (to_26_6(face.advance(glyph, params.pixel_size)), 0),
                    Direction::Vertical => (0, -line),
                };
                ShapedGlyph {
                    glyph,
                    cluster,
                    x_advance,
                    y_advance,
                    x_offset: 0,
                    y_offset: 0,
                }
            })
            .collect()
    }
}

/// Converts pixels to 26.6 fixed point.
#[expect(
    clippy::cast_possible_truncation,
    reason = "glyph positions are far below 2^25 pixels"
)]
pub fn to_26_6(pixels: f32) -> i32 {
    (pixels * 64.0).round() as i32
}

fn is_variation_selector(ch: char) -> bool {
    matches!(ch, '\u{FE00}'..='\u{FE0F}' | '\u{E0100}'..='\u{E01EF}')
}

/// Removes variation selectors from `text`.
///
/// Returns the remaining text and, for each remaining character, its char index in
/// `text`.
pub fn strip_variation_selectors(text: &str) -> (String, Vec<usize>) {
    text.chars()
        .enumerate()
        .filter(|(_, ch)| !is_variation_selector(*ch))
        .map(|(index, ch)| (ch, index))
        .unzip()
}

/// Whether a shaped run can be painted: it has glyphs and none of them is `.notdef`.
pub fn is_renderable(run: &[ShapedGlyph]) -> bool {
    !run.is_empty() && run.iter().all(|g| g.glyph != 0)
}
