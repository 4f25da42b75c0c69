// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::path::Path;

use log::{trace, warn};
use swash::scale::image::Content;
use swash::scale::{Render, ScaleContext, Source, StrikeWith};
use swash::zeno::{Format, Vector};
use swash::{CacheKey, FontRef, tag_from_bytes};

use super::{FaceLoader, FaceMetrics, FontData, GlyphContent, RasterFace, RasterGlyph};

const OUTLINE_TABLES: [&[u8; 4]; 3] = [b"glyf", b"CFF ", b"CFF2"];
const COLOR_TABLES: [&[u8; 4]; 3] = [b"COLR", b"CBDT", b"sbix"];

/// A [`RasterFace`] owning its font bytes, rasterized with `swash`.
pub struct SwashFace {
    data: Vec<u8>,
    offset: u32,
    key: CacheKey,
    index: u32,
    glyph_count: u32,
    scalable: bool,
    color: bool,
    fixed_sizes: Vec<u16>,
    scale: ScaleContext,
}

impl SwashFace {
    /// Parses face `index` of `data`. Returns `None` if the data is not a font.
    pub fn from_data(data: Vec<u8>, index: u32) -> Option<Self> {
        let font = FontRef::from_index(&data, index as usize)?;
        let has_table = |tag: &[u8; 4]| font.table(tag_from_bytes(tag)).is_some();
        let scalable = OUTLINE_TABLES.into_iter().any(has_table);
        let color = COLOR_TABLES.into_iter().any(has_table);
        let mut fixed_sizes: Vec<u16> = font
            .color_strikes()
            .chain(font.alpha_strikes())
            .map(|strike| strike.ppem())
            .collect();
        fixed_sizes.sort_unstable();
        fixed_sizes.dedup();
        let glyph_count = u32::from(font.metrics(&[]).glyph_count);
        let (offset, key) = (font.offset, font.key);
        Some(Self {
            data,
            offset,
            key,
            index,
            glyph_count,
            scalable,
            color,
            fixed_sizes,
            scale: ScaleContext::new(),
        })
    }

    fn as_ref(&self) -> FontRef<'_> {
        FontRef {
            data: &self.data,
            offset: self.offset,
            key: self.key,
        }
    }
}

impl RasterFace for SwashFace {
    fn glyph_count(&self) -> u32 {
        self.glyph_count
    }

    fn is_scalable(&self) -> bool {
        self.scalable
    }

    fn has_color(&self) -> bool {
        self.color
    }

    fn fixed_sizes(&self) -> Vec<u16> {
        self.fixed_sizes.clone()
    }

    fn metrics(&self, pixel_size: f32) -> FaceMetrics {
        let metrics = self.as_ref().metrics(&[]).scale(pixel_size);
        FaceMetrics {
            ascent: metrics.ascent,
            descent: metrics.descent,
            line_gap: metrics.leading,
            max_advance: metrics.max_width,
        }
    }

    fn glyph_index(&self, ch: char) -> u32 {
        u32::from(self.as_ref().charmap().map(ch))
    }

    fn advance(&self, glyph: u32, pixel_size: f32) -> f32 {
        let Ok(glyph) = u16::try_from(glyph) else {
            return 0.0;
        };
        self.as_ref()
            .glyph_metrics(&[])
            .scale(pixel_size)
            .advance_width(glyph)
    }

    fn render(
        &mut self,
        glyph: u32,
        pixel_size: f32,
        x_shift: f32,
        hint: bool,
    ) -> Option<RasterGlyph> {
        let glyph = u16::try_from(glyph).ok()?;
        let font = FontRef {
            data: &self.data,
            offset: self.offset,
            key: self.key,
        };
        let mut scaler = self
            .scale
            .builder(font)
            .size(pixel_size)
            .hint(hint)
            .build();
        let image = Render::new(&[
            Source::ColorOutline(0),
            Source::ColorBitmap(StrikeWith::BestFit),
            Source::Outline,
            Source::Bitmap(StrikeWith::BestFit),
        ])
        .format(Format::Alpha)
        .offset(Vector::new(x_shift, 0.0))
        .render(&mut scaler, glyph)?;
        let content = match image.content {
            Content::Mask => GlyphContent::Mask,
            Content::Color => GlyphContent::Color,
            Content::SubpixelMask => {
                trace!("glyph {glyph}: unexpected subpixel mask");
                return None;
            }
        };
        Some(RasterGlyph {
            left: image.placement.left,
            top: image.placement.top,
            width: image.placement.width,
            height: image.placement.height,
            content,
            data: image.data,
        })
    }

    fn font_data(&self) -> Option<FontData<'_>> {
        Some(FontData {
            data: &self.data,
            index: self.index,
        })
    }

    fn cache_key(&self) -> u64 {
        self.key.value()
    }
}

impl core::fmt::Debug for SwashFace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SwashFace")
            .field("index", &self.index)
            .field("glyph_count", &self.glyph_count)
            .field("scalable", &self.scalable)
            .field("color", &self.color)
            .field("fixed_sizes", &self.fixed_sizes)
            .finish_non_exhaustive()
    }
}

/// Loads [`SwashFace`]s from font files on disk.
#[derive(Default, Debug)]
pub struct SwashLoader {
    _private: (),
}

impl SwashLoader {
    /// Creates a loader.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FaceLoader for SwashLoader {
    fn open(&mut self, path: &Path, index: u32) -> Option<Box<dyn RasterFace>> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(err) => {
                warn!("cannot read {}: {err}", path.display());
                return None;
            }
        };
        match SwashFace::from_data(data, index) {
            Some(face) => Some(Box::new(face)),
            None => {
                warn!("{} has no usable face {index}", path.display());
                None
            }
        }
    }
}
