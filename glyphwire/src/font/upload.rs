// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rasterizing glyph variants and sending them to the font's glyph set in bounded batches.

use hashbrown::HashSet;
use log::{debug, trace, warn};

use super::{Font, GlyphVariantId};
use crate::error::Error;
use crate::face::{GlyphContent, RasterGlyph};
use crate::remote::{GlyphInfo, PictFormat, add_glyphs_len, pad4};

/// Which glyph variant ids a font has already uploaded.
#[derive(Clone, Debug)]
pub(crate) enum Uploaded {
    /// A bit per id of a scalable font's id space.
    Dense(UploadedSet),
    /// Raw glyph indices of a fixed-size font.
    Sparse(HashSet<u32>),
}

impl Uploaded {
    pub(crate) fn contains(&self, id: GlyphVariantId) -> bool {
        match self {
            Self::Dense(set) => set.contains(id.0),
            Self::Sparse(set) => set.contains(&id.0),
        }
    }

    pub(crate) fn insert(&mut self, id: GlyphVariantId) {
        match self {
            Self::Dense(set) => set.insert(id.0),
            Self::Sparse(set) => {
                set.insert(id.0);
            }
        }
    }
}

/// A fixed-size bitmap over `0..capacity`, stored in 32-bit words.
#[derive(Clone, PartialEq, Eq, Debug)]
pub(crate) struct UploadedSet {
    words: Vec<u32>,
}

impl UploadedSet {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(32)],
        }
    }

    pub(crate) fn contains(&self, id: u32) -> bool {
        self.words
            .get(id as usize / 32)
            .is_some_and(|word| word & (1 << (id % 32)) != 0)
    }

    pub(crate) fn insert(&mut self, id: u32) {
        if let Some(word) = self.words.get_mut(id as usize / 32) {
            *word |= 1 << (id % 32);
        }
    }

    #[cfg(test)]
    fn word_count(&self) -> usize {
        self.words.len()
    }
}

/// Counters of the work a font's uploads have done.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct UploadStats {
    /// Glyph variants sent to the server.
    pub uploaded: usize,
    /// `AddGlyphs` requests issued.
    pub requests: usize,
    /// Encoded bytes of those requests.
    pub bytes: usize,
}

/// One pending `AddGlyphs` request.
#[derive(Default)]
struct Batch {
    ids: Vec<u32>,
    infos: Vec<GlyphInfo>,
    data: Vec<u8>,
}

impl Batch {
    fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn encoded_len(&self) -> usize {
        add_glyphs_len(self.ids.len(), self.data.len())
    }

    /// Encoded length after adding a glyph with `image_bytes` bytes of image data.
    fn encoded_len_with(&self, image_bytes: usize) -> usize {
        add_glyphs_len(self.ids.len() + 1, self.data.len() + image_bytes)
    }

    fn push(&mut self, id: GlyphVariantId, info: GlyphInfo, image: &[u8]) {
        self.ids.push(id.0);
        self.infos.push(info);
        self.data.extend_from_slice(image);
    }

    fn clear(&mut self) {
        self.ids.clear();
        self.infos.clear();
        self.data.clear();
    }
}

impl Font {
    /// Makes sure every glyph variant in `ids` is present in the glyph set.
    ///
    /// Variants not uploaded yet are rasterized at their phase and sent in as few
    /// `AddGlyphs` requests as the connection's request limit allows. Already uploaded
    /// variants cost nothing.
    ///
    /// Fails with [`ErrorKind::UnsupportedFace`](crate::ErrorKind::UnsupportedFace) for
    /// fixed-size fonts; use [`Font::upload_fixed`] for those.
    pub fn upload(&self, ids: &[GlyphVariantId]) -> Result<(), Error> {
        if !self.is_scalable() {
            return Err(Error::unsupported_face());
        }
        self.upload_missing(ids)
    }

    /// The fixed-size counterpart of [`Font::upload`]: ids are raw glyph indices.
    pub fn upload_fixed(&self, ids: &[GlyphVariantId]) -> Result<(), Error> {
        if self.is_scalable() {
            return Err(Error::unsupported_face());
        }
        self.upload_missing(ids)
    }

    /// Uploads `ids` through whichever of [`Font::upload`] and [`Font::upload_fixed`]
    /// applies to this font.
    pub fn ensure_uploaded(&self, ids: &[GlyphVariantId]) -> Result<(), Error> {
        self.upload_missing(ids)
    }

    fn upload_missing(&self, ids: &[GlyphVariantId]) -> Result<(), Error> {
        if self.is_failed() {
            return Err(Error::latched());
        }
        let max = self.conn.maximum_request_bytes();
        let format = self.glyph_format();
        let mut uploaded = self.uploaded.borrow_mut();
        let mut face = self.face.borrow_mut();
        let mut pending = HashSet::new();
        let mut batch = Batch::default();
        for &id in ids {
            debug_assert!(self.id_space.contains(id), "{id:?} outside the id space");
            if uploaded.contains(id) || !pending.insert(id) {
                continue;
            }
            let index = self.id_space.index(id);
            let shift = self.id_space.phase_shift(self.id_space.phase(id));
            let glyph = face
                .render(index, self.pixel_size, shift, self.hint)
                .unwrap_or_else(RasterGlyph::empty);
            let (mut info, mut image) = encode_glyph(&glyph, format);
            if add_glyphs_len(1, image.len()) > max {
                warn!(
                    "{}: glyph {index} ({}x{}) does not fit into one request, uploading it empty",
                    self.family, glyph.width, glyph.height
                );
                info = GlyphInfo::default();
                image.clear();
            }
            trace!("glyph {index} phase {shift}: {info:?}");
            if !batch.is_empty() && batch.encoded_len_with(image.len()) > max {
                self.flush(&mut batch, &mut uploaded)?;
            }
            batch.push(id, info, &image);
        }
        if !batch.is_empty() {
            self.flush(&mut batch, &mut uploaded)?;
        }
        Ok(())
    }

    fn flush(&self, batch: &mut Batch, uploaded: &mut Uploaded) -> Result<(), Error> {
        let bytes = batch.encoded_len();
        debug!(
            "{}: uploading {} glyphs in {bytes} bytes",
            self.family,
            batch.ids.len()
        );
        if let Err(err) = self
            .conn
            .add_glyphs(self.glyph_set, &batch.ids, &batch.infos, &batch.data)
        {
            self.latch.trip(&err);
            return Err(err.into());
        }
        for &id in &batch.ids {
            uploaded.insert(GlyphVariantId(id));
        }
        let mut stats = self.stats.get();
        stats.uploaded += batch.ids.len();
        stats.requests += 1;
        stats.bytes += bytes;
        self.stats.set(stats);
        batch.clear();
        Ok(())
    }
}

/// Converts a rasterized glyph into `AddGlyphs` metrics and image bytes for a glyph set
/// of `format`.
///
/// `A8` rows are padded to four bytes. `Argb32` images are premultiplied 32-bit words;
/// coverage masks become premultiplied white so a color glyph set can hold both kinds.
pub(crate) fn encode_glyph(glyph: &RasterGlyph, format: PictFormat) -> (GlyphInfo, Vec<u8>) {
    let (Ok(width), Ok(height), Ok(x), Ok(y)) = (
        u16::try_from(glyph.width),
        u16::try_from(glyph.height),
        i16::try_from(-glyph.left),
        i16::try_from(glyph.top),
    ) else {
        return (GlyphInfo::default(), Vec::new());
    };
    let info = GlyphInfo {
        width,
        height,
        x,
        y,
        x_off: 0,
        y_off: 0,
    };
    let (w, h) = (usize::from(width), usize::from(height));
    let src_stride = w * glyph.content.bytes_per_pixel();
    if glyph.data.len() < src_stride * h {
        return (GlyphInfo::default(), Vec::new());
    }
    let rows = glyph.data.chunks_exact(src_stride.max(1)).take(h);
    let image = match format {
        PictFormat::A8 => {
            let stride = pad4(w);
            let mut image = vec![0_u8; stride * h];
            for (dst, src) in image.chunks_exact_mut(stride.max(1)).zip(rows) {
                match glyph.content {
                    GlyphContent::Mask => dst[..w].copy_from_slice(src),
                    GlyphContent::Color => {
                        for (d, px) in dst.iter_mut().zip(src.chunks_exact(4)) {
                            *d = px[3];
                        }
                    }
                }
            }
            image
        }
        PictFormat::Argb32 | PictFormat::Rgb24 => {
            let mut words = Vec::with_capacity(w * h);
            for src in rows {
                match glyph.content {
                    GlyphContent::Mask => {
                        words.extend(src.iter().map(|&a| premultiplied_argb(255, 255, 255, a)));
                    }
                    GlyphContent::Color => words.extend(
                        src.chunks_exact(4)
                            .map(|px| premultiplied_argb(px[0], px[1], px[2], px[3])),
                    ),
                }
            }
            bytemuck::cast_slice::<u32, u8>(&words).to_vec()
        }
    };
    (info, image)
}

/// Packs straight RGBA into a premultiplied `0xAARRGGBB` word.
pub(crate) fn premultiplied_argb(r: u8, g: u8, b: u8, a: u8) -> u32 {
    let premul = |c: u8| (u32::from(c) * u32::from(a) + 127) / 255;
    (u32::from(a) << 24) | (premul(r) << 16) | (premul(g) << 8) | premul(b)
}

#[cfg(test)]
mod tests {
    use super::{UploadedSet, encode_glyph, premultiplied_argb};
    use crate::face::{GlyphContent, RasterGlyph};
    use crate::remote::{GlyphInfo, PictFormat};

    fn words(image: &[u8]) -> Vec<u32> {
        image
            .chunks_exact(4)
            .map(|b| u32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    #[test]
    fn uploaded_set_words() {
        let mut set = UploadedSet::new(1024);
        assert_eq!(set.word_count(), 32);
        assert!(!set.contains(37));
        set.insert(37);
        assert!(set.contains(37));
        assert!(!set.contains(36));
        assert!(!set.contains(5000), "ids past the capacity are never present");
        set.insert(5000);
        assert!(!set.contains(5000));
        assert_eq!(UploadedSet::new(33).word_count(), 2);
    }

    #[test]
    fn a8_rows_are_padded() {
        let glyph = RasterGlyph {
            left: -1,
            top: 2,
            width: 3,
            height: 2,
            content: GlyphContent::Mask,
            data: vec![1, 2, 3, 4, 5, 6],
        };
        let (info, image) = encode_glyph(&glyph, PictFormat::A8);
        assert_eq!(
            info,
            GlyphInfo {
                width: 3,
                height: 2,
                x: 1,
                y: 2,
                x_off: 0,
                y_off: 0
            }
        );
        assert_eq!(image, [1, 2, 3, 0, 4, 5, 6, 0]);
    }

    #[test]
    fn color_images_are_premultiplied_words() {
        let glyph = RasterGlyph {
            left: 0,
            top: 1,
            width: 2,
            height: 1,
            content: GlyphContent::Color,
            data: vec![255, 0, 0, 255, 0, 255, 0, 0],
        };
        let (_, image) = encode_glyph(&glyph, PictFormat::Argb32);
        let words = words(&image);
        assert_eq!(words, [0xffff_0000, 0]);
    }

    #[test]
    fn masks_in_color_sets_become_white() {
        let glyph = RasterGlyph {
            left: 0,
            top: 1,
            width: 1,
            height: 1,
            content: GlyphContent::Mask,
            data: vec![0x80],
        };
        let (_, image) = encode_glyph(&glyph, PictFormat::Argb32);
        let words = words(&image);
        assert_eq!(words, [0x8080_8080]);
    }

    #[test]
    fn truncated_data_uploads_nothing() {
        let glyph = RasterGlyph {
            data: vec![0; 3],
            width: 2,
            height: 2,
            ..RasterGlyph::empty()
        };
        assert_eq!(encode_glyph(&glyph, PictFormat::A8), (GlyphInfo::default(), vec![]));
    }

    #[test]
    fn premultiply() {
        assert_eq!(premultiplied_argb(255, 255, 255, 255), 0xffff_ffff);
        assert_eq!(premultiplied_argb(200, 100, 50, 0), 0);
        assert_eq!(premultiplied_argb(255, 0, 0, 0x80), 0x8080_0000);
    }
}
