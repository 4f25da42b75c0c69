// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A deterministic face for tests.

#![allow(
    clippy::cast_possible_truncation,
    reason = "synthetic glyphs are a few pixels in size"
)]

use core::cell::Cell;
use std::rc::Rc;

use glyphwire::{FaceMetrics, FontData, GlyphContent, RasterFace, RasterGlyph};
use hashbrown::HashMap;

const ASCENT: f32 = 0.8;
const DESCENT: f32 = 0.2;
const ADVANCE: f32 = 0.6;
/// Edge of an oversized glyph; its image alone exceeds the default request limit.
const OVERSIZED: u32 = 2048;

#[derive(Clone, Debug)]
enum Ink {
    /// A box of full coverage with a partially covered first column.
    Mask,
    /// A square of a straight-alpha `0xRRGGBBAA` color.
    Color(u32),
    /// No pixels at all.
    Blank,
    /// A mask far larger than any request.
    Oversized,
}

#[derive(Clone, Debug)]
struct SyntheticGlyph {
    advance: f32,
    ink: Ink,
    /// Pixels the image reaches left of the origin and above the ascent.
    overhang: (i32, i32),
}

/// A [`RasterFace`] with hand-assigned glyphs and generated images.
///
/// Glyph 0 is `.notdef`, drawn as a hollow box. Mapped characters get glyphs from 1
/// upwards in the order they were added; a space is always blank. Images depend only on
/// the glyph, the pixel size and the sub-pixel shift, so identical requests rasterize
/// identical bitmaps.
///
/// Metrics are proportional to the pixel size: ascent 0.8, descent 0.2, no line gap,
/// advance 0.6 unless set per glyph.
#[derive(Clone, Debug)]
pub struct SyntheticFace {
    glyphs: Vec<SyntheticGlyph>,
    cmap: HashMap<char, u32>,
    glyph_count: u32,
    fixed_sizes: Vec<u16>,
    outlines: bool,
    key: u64,
    renders: Rc<Cell<usize>>,
}

impl SyntheticFace {
    /// A scalable mask face covering `chars`.
    pub fn mask(chars: &str) -> Self {
        let mut face = Self::empty();
        for ch in chars.chars() {
            let ink = if ch.is_whitespace() { Ink::Blank } else { Ink::Mask };
            face.push(ch, ink);
        }
        face
    }

    /// A scalable color face mapping each char to a square of its `0xRRGGBBAA` color.
    pub fn color(glyphs: &[(char, u32)]) -> Self {
        let mut face = Self::empty();
        for &(ch, rgba) in glyphs {
            face.push(ch, Ink::Color(rgba));
        }
        face
    }

    fn empty() -> Self {
        Self {
            glyphs: vec![SyntheticGlyph {
                advance: ADVANCE,
                ink: Ink::Mask,
                overhang: (0, 0),
            }],
            cmap: HashMap::new(),
            glyph_count: 1,
            fixed_sizes: Vec::new(),
            outlines: true,
            key: 0xcbf2_9ce4_8422_2325,
            renders: Rc::new(Cell::new(0)),
        }
    }

    fn push(&mut self, ch: char, ink: Ink) {
        if self.cmap.contains_key(&ch) {
            return;
        }
        let glyph = self.glyphs.len() as u32;
        let ink = if ch == ' ' { Ink::Blank } else { ink };
        self.glyphs.push(SyntheticGlyph {
            advance: ADVANCE,
            ink,
            overhang: (0, 0),
        });
        self.cmap.insert(ch, glyph);
        self.glyph_count = self.glyph_count.max(glyph + 1);
        self.key = (self.key ^ u64::from(ch)).wrapping_mul(0x0100_0000_01b3);
    }

    /// Pads the face to `count` glyphs; the extra glyphs are unmapped and blank.
    pub fn with_glyph_count(mut self, count: u32) -> Self {
        self.glyph_count = self.glyph_count.max(count);
        self
    }

    /// Turns the face into a bitmap-only face with strikes of the given pixel heights.
    pub fn with_fixed_sizes(mut self, sizes: &[u16]) -> Self {
        self.fixed_sizes = sizes.to_vec();
        self.fixed_sizes.sort_unstable();
        self.outlines = false;
        self
    }

    /// Drops the outlines without adding strikes, leaving a face nothing can draw.
    pub fn without_outlines(mut self) -> Self {
        self.outlines = false;
        self
    }

    /// Sets the advance of `ch` in ems.
    pub fn with_advance(mut self, ch: char, em: f32) -> Self {
        if let Some(&glyph) = self.cmap.get(&ch) {
            self.glyphs[glyph as usize].advance = em;
        }
        self
    }

    /// Moves the image of `ch` `left` pixels left of its origin and `up` pixels above
    /// the ascent.
    pub fn with_overhang(mut self, ch: char, left: i32, up: i32) -> Self {
        if let Some(&glyph) = self.cmap.get(&ch) {
            self.glyphs[glyph as usize].overhang = (left, up);
        }
        self
    }

    /// Makes `ch` a glyph too large to upload in any request.
    pub fn with_oversized(mut self, ch: char) -> Self {
        self.push(ch, Ink::Oversized);
        if let Some(&glyph) = self.cmap.get(&ch) {
            self.glyphs[glyph as usize].ink = Ink::Oversized;
        }
        self
    }

    /// Distinguishes faces with the same characters in shaper caches.
    pub fn with_key(mut self, key: u64) -> Self {
        self.key = key;
        self
    }

    /// Counts [`RasterFace::render`] calls, shared by all clones of this face.
    pub fn render_counter(&self) -> Rc<Cell<usize>> {
        self.renders.clone()
    }

    fn size(&self, pixel_size: f32) -> f32 {
        if self.fixed_sizes.is_empty() {
            pixel_size
        } else {
            // Bitmap faces only ever draw their strike.
            let strike = self
                .fixed_sizes
                .iter()
                .copied()
                .min_by(|&a, &b| {
                    (f32::from(a) - pixel_size)
                        .abs()
                        .total_cmp(&(f32::from(b) - pixel_size).abs())
                        .then(b.cmp(&a))
                })
                .unwrap_or(1);
            f32::from(strike)
        }
    }
}

impl RasterFace for SyntheticFace {
    fn glyph_count(&self) -> u32 {
        self.glyph_count
    }

    fn is_scalable(&self) -> bool {
        self.outlines
    }

    fn has_color(&self) -> bool {
        self.glyphs.iter().any(|g| matches!(g.ink, Ink::Color(_)))
    }

    fn fixed_sizes(&self) -> Vec<u16> {
        self.fixed_sizes.clone()
    }

    fn metrics(&self, pixel_size: f32) -> FaceMetrics {
        let size = self.size(pixel_size);
        let widest = self.glyphs.iter().map(|g| g.advance).fold(ADVANCE, f32::max);
        FaceMetrics {
            ascent: ASCENT * size,
            descent: DESCENT * size,
            line_gap: 0.0,
            max_advance: widest * size,
        }
    }

    fn glyph_index(&self, ch: char) -> u32 {
        self.cmap.get(&ch).copied().unwrap_or(0)
    }

    fn advance(&self, glyph: u32, pixel_size: f32) -> f32 {
        let advance = self.glyphs.get(glyph as usize).map_or(0.0, |g| g.advance);
        advance * self.size(pixel_size)
    }

    fn render(
        &mut self,
        glyph: u32,
        pixel_size: f32,
        x_shift: f32,
        _hint: bool,
    ) -> Option<RasterGlyph> {
        if glyph >= self.glyph_count {
            return None;
        }
        self.renders.set(self.renders.get() + 1);
        let size = self.size(pixel_size);
        let shift = if self.is_scalable() { x_shift } else { 0.0 };
        let Some(synthetic) = self.glyphs.get(glyph as usize) else {
            return Some(RasterGlyph::empty());
        };
        let top = (ASCENT * size).round().max(1.0) as i32;
        let width = ((synthetic.advance * size).round() as u32).max(2) - 1;
        let height = top as u32;
        let mut image = match synthetic.ink {
            Ink::Blank => RasterGlyph::empty(),
            Ink::Mask if glyph == 0 => hollow_box(width, height, top),
            Ink::Mask => shifted_box(width, height, top, shift),
            Ink::Oversized => RasterGlyph {
                left: 0,
                top: OVERSIZED as i32,
                width: OVERSIZED,
                height: OVERSIZED,
                content: GlyphContent::Mask,
                data: vec![0xff; (OVERSIZED * OVERSIZED) as usize],
            },
            Ink::Color(rgba) => RasterGlyph {
                left: 0,
                top,
                width: height,
                height,
                content: GlyphContent::Color,
                data: rgba.to_be_bytes().repeat((height * height) as usize),
            },
        };
        if image.width > 0 {
            image.left -= synthetic.overhang.0;
            image.top += synthetic.overhang.1;
        }
        Some(image)
    }

    fn font_data(&self) -> Option<FontData<'_>> {
        None
    }

    fn cache_key(&self) -> u64 {
        self.key
    }
}

/// A full-coverage box whose first column is reduced by the sub-pixel shift and whose
/// coverage spills into an extra column on the right.
fn shifted_box(width: u32, height: u32, top: i32, shift: f32) -> RasterGlyph {
    let spill = (shift * 255.0).round() as u8;
    let extra = u32::from(spill > 0);
    let stride = (width + extra) as usize;
    let mut data = vec![0xff; stride * height as usize];
    for row in data.chunks_exact_mut(stride) {
        row[0] = 0xff - spill;
        if extra == 1 {
            row[stride - 1] = spill;
        }
    }
    RasterGlyph {
        left: 0,
        top,
        width: width + extra,
        height,
        content: GlyphContent::Mask,
        data,
    }
}

fn hollow_box(width: u32, height: u32, top: i32) -> RasterGlyph {
    let (w, h) = (width as usize, height as usize);
    let mut data = vec![0; w * h];
    for (i, px) in data.iter_mut().enumerate() {
        let (x, y) = (i % w, i / w);
        if x == 0 || y == 0 || x + 1 == w || y + 1 == h {
            *px = 0xff;
        }
    }
    RasterGlyph {
        left: 0,
        top,
        width,
        height,
        content: GlyphContent::Mask,
        data,
    }
}
