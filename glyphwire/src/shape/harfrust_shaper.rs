// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;

use hashbrown::HashMap;
use log::trace;

use super::{Direction, ShapeParams, ShapedGlyph, Shaper, SimpleShaper};
use crate::face::RasterFace;

/// A [`Shaper`] backed by `harfrust`.
///
/// Shaper data is cached per face. Faces without font data are shaped with
/// [`SimpleShaper`].
pub struct HarfrustShaper {
    data_cache: HashMap<u64, harfrust::ShaperData>,
    buffer: Option<harfrust::UnicodeBuffer>,
}

impl HarfrustShaper {
    /// Creates a shaper with empty caches.
    pub fn new() -> Self {
        Self {
            data_cache: HashMap::new(),
            buffer: Some(harfrust::UnicodeBuffer::new()),
        }
    }
}

impl Default for HarfrustShaper {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HarfrustShaper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarfrustShaper")
            .field("cached_faces", &self.data_cache.len())
            .finish_non_exhaustive()
    }
}

impl Shaper for HarfrustShaper {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "cluster indices and scaled positions fit their targets"
    )]
    fn shape(
        &mut self,
        face: &dyn RasterFace,
        text: &str,
        params: &ShapeParams<'_>,
    ) -> Vec<ShapedGlyph> {
        let Some(data) = face.font_data() else {
            return SimpleShaper.shape(face, text, params);
        };
        let (Ok(font_ref), Some(metrics_ref)) = (
            harfrust::FontRef::from_index(data.data, data.index),
            swash::FontRef::from_index(data.data, data.index as usize),
        ) else {
            trace!("face {:#x} cannot be shaped", face.cache_key());
            return SimpleShaper.shape(face, text, params);
        };
        let units_per_em = f32::from(metrics_ref.metrics(&[]).units_per_em.max(1));
        let scale = params.pixel_size * 64.0 / units_per_em;

        let shaper_data = self
            .data_cache
            .entry(face.cache_key())
            .or_insert_with(|| harfrust::ShaperData::new(&font_ref));
        let shaper = shaper_data.shaper(&font_ref).build();

        let mut buffer = self
            .buffer
            .take()
            .unwrap_or_else(harfrust::UnicodeBuffer::new);
        buffer.clear();
        for (i, ch) in text.chars().enumerate() {
            buffer.add(ch, i as u32);
        }
        // Horizontal lines take their direction from the script.
        if params.direction == Direction::Vertical {
            buffer.set_direction(harfrust::Direction::TopToBottom);
        }
        if let Some(language) = params
            .language
            .and_then(|lang| lang.parse::<harfrust::Language>().ok())
        {
            buffer.set_language(language);
        }
        buffer.guess_segment_properties();

        let glyph_buffer = shaper.shape(buffer, &[]);
        let scaled = |units: i32| (units as f32 * scale).round() as i32;
        let glyphs = glyph_buffer
            .glyph_infos()
            .iter()
            .zip(glyph_buffer.glyph_positions())
            .map(|(info, pos)| ShapedGlyph {
                glyph: info.glyph_id,
                cluster: info.cluster as usize,
                x_advance: scaled(pos.x_advance),
                y_advance: scaled(pos.y_advance),
                x_offset: scaled(pos.x_offset),
                y_offset: scaled(pos.y_offset),
            })
            .collect();
        self.buffer = Some(glyph_buffer.clear());
        glyphs
    }
}
