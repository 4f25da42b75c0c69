// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use glyphwire::shape::to_26_6;
use glyphwire::{Direction, RasterFace, ShapeParams, ShapedGlyph, Shaper};

/// A [`Shaper`] that maps characters one to one, except for configured ligatures.
///
/// A ligature replaces a character sequence with the face's glyph for a single
/// presentation-form character, forming one cluster that starts at the sequence's first
/// character. Without ligatures it shapes like [`SimpleShaper`](glyphwire::SimpleShaper).
#[derive(Clone, Debug, Default)]
pub struct LigatureShaper {
    ligatures: Vec<(Vec<char>, char)>,
}

impl LigatureShaper {
    /// Creates a shaper without ligatures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shapes `sequence` as the glyph of `ligature`. Earlier ligatures win.
    pub fn with_ligature(mut self, sequence: &str, ligature: char) -> Self {
        let sequence: Vec<char> = sequence.chars().collect();
        if !sequence.is_empty() {
            self.ligatures.push((sequence, ligature));
        }
        self
    }
}

impl Shaper for LigatureShaper {
    fn shape(
        &mut self,
        face: &dyn RasterFace,
        text: &str,
        params: &ShapeParams<'_>,
    ) -> Vec<ShapedGlyph> {
        let line = {
            let metrics = face.metrics(params.pixel_size);
            to_26_6(metrics.ascent + metrics.descent)
        };
        let chars: Vec<char> = text.chars().collect();
        let mut glyphs = Vec::with_capacity(chars.len());
        let mut i = 0;
        while i < chars.len() {
            let (ch, len) = self
                .ligatures
                .iter()
                .find(|(sequence, _)| chars[i..].starts_with(sequence))
                .map_or((chars[i], 1), |(sequence, ligature)| {
                    (*ligature, sequence.len())
                });
            let glyph = face.glyph_index(ch);
            let (x_advance, y_advance) = match params.direction {
                Direction::Horizontal => (to_26_6(face.advance(glyph, params.pixel_size)), 0),
                Direction::Vertical => (0, -line),
            };
            glyphs.push(ShapedGlyph {
                glyph,
                cluster: i,
                x_advance,
                y_advance,
                x_offset: 0,
                y_offset: 0,
            });
            i += len;
        }
        glyphs
    }
}
