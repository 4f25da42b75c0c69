// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::ops::Range;

use crate::font::{GlyphIdSpace, GlyphVariantId};
use crate::shape::{Direction, ShapedGlyph};

/// A shaped glyph placed on the pixel grid.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) struct PlacedGlyph {
    /// Variant id, with the phase of the glyph's sub-pixel position.
    pub(crate) id: GlyphVariantId,
    /// Pixel position of the glyph origin, relative to the line origin, y down.
    pub(crate) x: i32,
    pub(crate) y: i32,
    /// First char of the cluster.
    pub(crate) cluster: usize,
    /// Pen position along the line before this glyph, 26.6.
    pub(crate) pen: i32,
}

/// Glyph positions of a shaped text plus the cluster structure for cursor mapping.
///
/// Glyphs are kept in visual order. Their clusters either rise along the line or, for
/// right-to-left text, fall.
#[derive(Clone, Debug, Default)]
pub(crate) struct GlyphLayout {
    pub(crate) glyphs: Vec<PlacedGlyph>,
    char_count: usize,
    /// Pen position along the line after the last glyph, 26.6.
    advance: i32,
    rtl: bool,
}

/// A cluster with its extent along the line, 26.6.
#[derive(Clone, Debug)]
struct ClusterSpan {
    chars: Range<usize>,
    start: i32,
    end: i32,
}

impl GlyphLayout {
    pub(crate) fn new(
        id_space: &GlyphIdSpace,
        shaped: &[ShapedGlyph],
        char_count: usize,
        direction: Direction,
    ) -> Self {
        let (mut pen_x, mut pen_y) = (0, 0);
        let glyphs: Vec<PlacedGlyph> = shaped
            .iter()
            .map(|g| {
                let (x, phase) = id_space.quantize(pen_x + g.x_offset);
                let y = -round_26_6(pen_y + g.y_offset);
                let pen = match direction {
                    Direction::Horizontal => pen_x,
                    Direction::Vertical => -pen_y,
                };
                pen_x += g.x_advance;
                pen_y += g.y_advance;
                PlacedGlyph {
                    id: id_space.encode(g.glyph, phase),
                    x,
                    y,
                    cluster: g.cluster.min(char_count),
                    pen,
                }
            })
            .collect();
        let advance = match direction {
            Direction::Horizontal => pen_x,
            Direction::Vertical => -pen_y,
        };
        let rtl = match (glyphs.first(), glyphs.last()) {
            (Some(first), Some(last)) => first.cluster > last.cluster,
            _ => false,
        };
        Self {
            glyphs,
            char_count,
            advance,
            rtl,
        }
    }

    /// Number of chars of the text.
    pub(crate) fn char_count(&self) -> usize {
        self.char_count
    }

    /// Total advance along the line, in whole pixels.
    pub(crate) fn advance(&self) -> i32 {
        round_26_6(self.advance)
    }

    /// The clusters in visual order.
    fn spans(&self) -> Vec<ClusterSpan> {
        let mut starts: Vec<(usize, i32)> =
            self.glyphs.iter().map(|g| (g.cluster, g.pen)).collect();
        starts.sort_unstable();
        starts.dedup_by_key(|&mut (cluster, _)| cluster);
        let ends: Vec<usize> = starts
            .iter()
            .skip(1)
            .map(|&(start, _)| start)
            .chain([self.char_count])
            .collect();
        let mut spans: Vec<ClusterSpan> = starts
            .into_iter()
            .zip(ends)
            .map(|((start, pen), end)| ClusterSpan {
                chars: start..end,
                start: pen,
                end: pen,
            })
            .collect();
        spans.sort_by_key(|span| span.start);
        let ends: Vec<i32> = spans
            .iter()
            .skip(1)
            .map(|span| span.start)
            .chain([self.advance])
            .collect();
        for (span, end) in spans.iter_mut().zip(ends) {
            span.end = end;
        }
        spans
    }

    /// Number of chars in the cluster containing `char_index`; 0 past the end.
    pub(crate) fn glyph_length(&self, char_index: usize) -> usize {
        if char_index >= self.char_count {
            return 0;
        }
        self.spans()
            .into_iter()
            .find(|span| span.chars.contains(&char_index))
            .map_or(1, |span| span.chars.len())
    }

    /// Pixel position along the line of the caret before `char_index`: the leading edge
    /// of its cluster, or the end of the line at or past the last char.
    pub(crate) fn pixel_offset(&self, char_index: usize) -> i32 {
        if char_index >= self.char_count {
            return if self.rtl { 0 } else { self.advance() };
        }
        self.spans()
            .into_iter()
            .find(|span| span.chars.contains(&char_index))
            .map_or(0, |span| {
                round_26_6(if self.rtl { span.end } else { span.start })
            })
    }

    /// The cluster boundary nearest to pixel position `x` along the line.
    pub(crate) fn char_index_at_pixel(&self, x: i32) -> usize {
        let (line_start, line_end) = if self.rtl {
            (self.char_count, 0)
        } else {
            (0, self.char_count)
        };
        if x <= 0 {
            return line_start;
        }
        let x = x * 64;
        for span in self.spans() {
            if x < span.end {
                let left_half = x - span.start < span.end - x;
                return match (left_half, self.rtl) {
                    (true, false) | (false, true) => span.chars.start,
                    (false, false) | (true, true) => span.chars.end,
                };
            }
        }
        line_end
    }

    /// Glyph index range covering the chars in `selection`.
    ///
    /// A cluster belongs to the selection when its first char does. An empty result
    /// sits where the selection would start.
    pub(crate) fn glyph_range(&self, selection: Range<usize>) -> Range<usize> {
        let end = selection.end.max(selection.start);
        let inside = |g: &PlacedGlyph| (selection.start..end).contains(&g.cluster);
        match (
            self.glyphs.iter().position(inside),
            self.glyphs.iter().rposition(inside),
        ) {
            (Some(first), Some(last)) => first..last + 1,
            _ => {
                let at = if self.rtl {
                    self.glyphs
                        .iter()
                        .position(|g| g.cluster < selection.start)
                } else {
                    self.glyphs
                        .iter()
                        .position(|g| g.cluster >= selection.start)
                }
                .unwrap_or(self.glyphs.len());
                at..at
            }
        }
    }
}

fn round_26_6(value: i32) -> i32 {
    (value + 32).div_euclid(64)
}
