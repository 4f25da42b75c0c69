// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resolved fonts and their remote glyph sets.

mod id;
mod upload;

use core::cell::{Cell, RefCell};
use core::fmt;
use std::rc::Rc;

use hashbrown::HashSet;
use log::{debug, warn};

use crate::context::TextContext;
use crate::error::{Error, ErrorKind};
use crate::face::{FaceMetrics, RasterFace};
use crate::matcher::{FontPattern, is_generic_family};
use crate::remote::{ErrorLatch, PictFormat, RenderConnection, ResourceId, Subscription};

pub use id::{GlyphIdSpace, GlyphVariantId, MAX_SUBPIXEL_BITS};
pub use upload::UploadStats;

use upload::{Uploaded, UploadedSet};

/// How the glyphs of a font are painted.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum GlyphType {
    /// Coverage masks, tinted with a pen.
    Mask,
    /// Glyphs carrying their own colors, such as emoji.
    PreColored,
}

/// A face opened at a pixel size, with a glyph set on the server.
///
/// Glyphs are addressed by [`GlyphVariantId`]s from the font's [`GlyphIdSpace`] and
/// uploaded on demand with [`Font::upload`]. An asynchronous error on the glyph set
/// latches the font: every later upload fails with
/// [`ErrorKind::Latched`](crate::ErrorKind::Latched) without sending anything.
///
/// Dropping the font frees the glyph set.
pub struct Font {
    conn: Rc<dyn RenderConnection>,
    face: RefCell<Box<dyn RasterFace>>,
    family: String,
    pixel_size: f32,
    hint: bool,
    metrics: FaceMetrics,
    scalable: bool,
    glyph_type: GlyphType,
    id_space: GlyphIdSpace,
    glyph_set: ResourceId,
    latch: ErrorLatch,
    _subscription: Subscription,
    uploaded: RefCell<Uploaded>,
    stats: Cell<UploadStats>,
}

impl Font {
    /// Resolves the first of `patterns`, then the context's default pattern, that a
    /// face of the requested family is found for.
    ///
    /// A match of a different family than requested is rejected unless the request
    /// names a generic family like `sans-serif`.
    pub fn resolve(ctx: &TextContext, patterns: &[FontPattern]) -> Result<Self, Error> {
        let default = FontPattern::parse(&ctx.options().default_pattern);
        for pattern in patterns.iter().chain(default.iter()) {
            if let Some(font) = Self::try_pattern(ctx, pattern)? {
                return Ok(font);
            }
        }
        let tried: Vec<String> = patterns
            .iter()
            .chain(default.iter())
            .map(ToString::to_string)
            .collect();
        Err(Error::no_matching_font(tried.join(", ")))
    }

    /// Parses a comma-separated pattern list and resolves it like [`Font::resolve`].
    pub fn resolve_str(ctx: &TextContext, patterns: &str) -> Result<Self, Error> {
        Self::resolve(ctx, &FontPattern::parse_list(patterns))
    }

    fn try_pattern(ctx: &TextContext, pattern: &FontPattern) -> Result<Option<Self>, Error> {
        let Some(found) = ctx.match_pattern(pattern) else {
            warn!("no font matches {pattern}");
            return Ok(None);
        };
        if !is_generic_family(&pattern.family) && !found.family.eq_ignore_ascii_case(&pattern.family)
        {
            warn!("{pattern}: matcher substituted {:?}, rejecting", found.family);
            return Ok(None);
        }
        let Some(face) = ctx.open_face(&found.path, found.index) else {
            return Ok(None);
        };
        match Self::from_face(ctx, face, found.family.clone(), found.pixel_size) {
            Ok(font) => {
                debug!(
                    "{pattern} resolved to {} ({} #{}) at {}px, {:?}{}",
                    font.family,
                    found.path.display(),
                    found.index,
                    font.pixel_size,
                    font.glyph_type,
                    if font.scalable { "" } else { ", fixed size" }
                );
                Ok(Some(font))
            }
            Err(err) if err.kind() == ErrorKind::UnsupportedFace => {
                warn!("{pattern}: {} has neither outlines nor strikes", found.family);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Creates a font from an already opened face and allocates its glyph set.
    ///
    /// Fixed-size faces snap `pixel_size` to the nearest strike.
    pub fn from_face(
        ctx: &TextContext,
        face: Box<dyn RasterFace>,
        family: String,
        pixel_size: f32,
    ) -> Result<Self, Error> {
        let scalable = face.is_scalable();
        let (pixel_size, id_space, uploaded) = if scalable {
            let id_space = GlyphIdSpace::for_glyph_count(
                face.glyph_count(),
                ctx.options().subpixel_bits,
            );
            let uploaded = Uploaded::Dense(UploadedSet::new(id_space.capacity()));
            (pixel_size, id_space, uploaded)
        } else {
            let strike = nearest_fixed_size(&face.fixed_sizes(), pixel_size)
                .ok_or_else(Error::unsupported_face)?;
            let id_space = GlyphIdSpace::fixed(face.glyph_count());
            (f32::from(strike), id_space, Uploaded::Sparse(HashSet::new()))
        };
        let glyph_type = if face.has_color() {
            GlyphType::PreColored
        } else {
            GlyphType::Mask
        };
        let conn = ctx.connection().clone();
        let glyph_set = conn.generate_id()?;
        let format = match glyph_type {
            GlyphType::Mask => PictFormat::A8,
            GlyphType::PreColored => PictFormat::Argb32,
        };
        conn.create_glyph_set(glyph_set, format)?;
        let latch = ErrorLatch::new("glyph set");
        let subscription = ctx.errors().subscribe(glyph_set, &latch);
        let metrics = face.metrics(pixel_size);
        Ok(Self {
            conn,
            face: RefCell::new(face),
            family,
            pixel_size,
            hint: ctx.options().hint,
            metrics,
            scalable,
            glyph_type,
            id_space,
            glyph_set,
            latch,
            _subscription: subscription,
            uploaded: RefCell::new(uploaded),
            stats: Cell::new(UploadStats::default()),
        })
    }

    /// Family name of the face.
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Pixel size the face is rendered at.
    pub fn pixel_size(&self) -> f32 {
        self.pixel_size
    }

    /// Distance between baselines of consecutive lines.
    pub fn line_height(&self) -> u32 {
        ceil_px(self.metrics.ascent + self.metrics.descent + self.metrics.line_gap)
    }

    /// Distance from the top of a line to its baseline.
    pub fn baseline(&self) -> u32 {
        ceil_px(self.metrics.ascent)
    }

    /// Largest advance of any glyph.
    pub fn max_width(&self) -> u32 {
        ceil_px(self.metrics.max_advance)
    }

    /// Height of the tallest glyph box.
    pub fn max_height(&self) -> u32 {
        ceil_px(self.metrics.ascent + self.metrics.descent)
    }

    /// Scaled face metrics.
    pub fn metrics(&self) -> FaceMetrics {
        self.metrics
    }

    /// How glyphs of this font are painted.
    pub fn glyph_type(&self) -> GlyphType {
        self.glyph_type
    }

    /// Layout of this font's glyph variant ids.
    pub fn id_space(&self) -> GlyphIdSpace {
        self.id_space
    }

    /// Whether the face has scalable outlines.
    pub fn is_scalable(&self) -> bool {
        self.scalable
    }

    /// The remote glyph set.
    pub fn glyph_set(&self) -> ResourceId {
        self.glyph_set
    }

    /// Whether the glyph set failed remotely.
    pub fn is_failed(&self) -> bool {
        self.latch.is_tripped()
    }

    /// Upload counters.
    pub fn stats(&self) -> UploadStats {
        self.stats.get()
    }

    /// Whether glyph variant `id` is already in the glyph set.
    pub fn is_uploaded(&self, id: GlyphVariantId) -> bool {
        self.uploaded.borrow().contains(id)
    }

    /// Runs `f` with the face.
    pub(crate) fn with_face<R>(&self, f: impl FnOnce(&dyn RasterFace) -> R) -> R {
        f(&**self.face.borrow())
    }

    /// Ink box `(left, top, right, bottom)` of glyph `index` rasterized with `x_shift`,
    /// relative to its origin with y down.
    pub(crate) fn ink_bounds(&self, index: u32, x_shift: f32) -> Option<(i32, i32, i32, i32)> {
        let glyph = self
            .face
            .borrow_mut()
            .render(index, self.pixel_size, x_shift, self.hint)?;
        Some((
            glyph.left,
            -glyph.top,
            glyph.right(),
            glyph.height as i32 - glyph.top,
        ))
    }

    fn glyph_format(&self) -> PictFormat {
        match self.glyph_type {
            GlyphType::Mask => PictFormat::A8,
            GlyphType::PreColored => PictFormat::Argb32,
        }
    }
}

impl Drop for Font {
    fn drop(&mut self) {
        if let Err(err) = self.conn.free_glyph_set(self.glyph_set) {
            debug!("{}: freeing glyph set failed: {err}", self.family);
        }
    }
}

impl fmt::Debug for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Font")
            .field("family", &self.family)
            .field("pixel_size", &self.pixel_size)
            .field("glyph_type", &self.glyph_type)
            .field("id_space", &self.id_space)
            .field("glyph_set", &self.glyph_set)
            .field("failed", &self.is_failed())
            .finish_non_exhaustive()
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "face metrics are far below u32::MAX pixels"
)]
fn ceil_px(value: f32) -> u32 {
    value.ceil().max(0.0) as u32
}

/// The strike closest to `requested`; on a tie the larger one.
fn nearest_fixed_size(sizes: &[u16], requested: f32) -> Option<u16> {
    sizes.iter().copied().min_by(|&a, &b| {
        let da = (f32::from(a) - requested).abs();
        let db = (f32::from(b) - requested).abs();
        da.total_cmp(&db).then(b.cmp(&a))
    })
}
