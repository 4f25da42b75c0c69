// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shaping and painting a line of text.

mod layout;

use core::fmt;
use core::ops::Range;
use std::rc::Rc;

use log::{trace, warn};
use smallvec::SmallVec;

use crate::color::Color;
use crate::context::TextContext;
use crate::error::Error;
use crate::font::{Font, GlyphType};
use crate::pen::Pen;
use crate::remote::{
    ErrorLatch, GlyphElement, PictFormat, PictOp, Rectangle, RemoteError, RenderConnection,
    Repeat, ResourceId, Subscription, max_composite_elements,
};
use crate::shape::{Direction, ShapeParams, ShapedGlyph, is_renderable, strip_variation_selectors};

use layout::{GlyphLayout, PlacedGlyph};

/// Per-renderer shaping options.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct TextOptions {
    /// Line direction.
    pub direction: Direction,
    /// BCP 47 language hint for the shaper.
    pub language: Option<String>,
}

/// A line of text shaped with one font, ready to be painted onto remote pictures.
///
/// Mask fonts are painted by compositing the glyphs through a pen of the requested
/// color. Pre-colored fonts ignore the color: their glyphs are painted once into an
/// intermediate picture owned by the renderer, which is then composited wherever the
/// text is drawn until the text changes.
///
/// A remote failure of the intermediate picture, or a failed request, latches the
/// renderer: later renders fail with [`ErrorKind::Latched`](crate::ErrorKind::Latched)
/// without sending anything.
pub struct TextRenderer {
    ctx: TextContext,
    font: Rc<Font>,
    options: TextOptions,
    text: String,
    /// The font the current text was shaped with: `font`, or the fallback font.
    shaped_font: Rc<Font>,
    layout: GlyphLayout,
    size: (u32, u32),
    pen: Option<Pen>,
    selection_pen: Option<Pen>,
    intermediate: Option<Intermediate>,
    latch: ErrorLatch,
}

impl TextRenderer {
    /// Creates a renderer for `font` with empty text.
    pub fn new(ctx: &TextContext, font: Rc<Font>, options: TextOptions) -> Self {
        let size = empty_size(&font, options.direction);
        Self {
            ctx: ctx.clone(),
            shaped_font: font.clone(),
            font,
            options,
            text: String::new(),
            layout: GlyphLayout::default(),
            size,
            pen: None,
            selection_pen: None,
            intermediate: None,
            latch: ErrorLatch::new("text renderer"),
        }
    }

    /// The font the renderer was created with.
    pub fn font(&self) -> &Rc<Font> {
        &self.font
    }

    /// The current text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Logical size of the current text: `(width, height)` in pixels.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Whether the renderer is latched after a remote failure.
    pub fn is_failed(&self) -> bool {
        self.latch.is_tripped()
    }

    /// Replaces the text, reshaping it and discarding the intermediate picture.
    ///
    /// Text the font cannot render is retried without variation selectors, and failing
    /// that drawn as U+FFFD in the context's fallback font.
    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_owned();
        self.intermediate = None;
        let char_count = text.chars().count();
        let (font, shaped) = self.shape_with_fallback(text, char_count);
        self.layout = GlyphLayout::new(
            &font.id_space(),
            &shaped,
            char_count,
            self.options.direction,
        );
        self.size = logical_size(&font, &self.layout, self.options.direction);
        self.shaped_font = font;
    }

    fn shape_params(&self, font: &Font) -> ShapeParams<'_> {
        ShapeParams {
            pixel_size: font.pixel_size(),
            direction: self.options.direction,
            language: self.options.language.as_deref(),
        }
    }

    fn shape_with_fallback(&self, text: &str, char_count: usize) -> (Rc<Font>, Vec<ShapedGlyph>) {
        let font = self.font.clone();
        let shaped = self.ctx.shape(&font, text, &self.shape_params(&font));
        if text.is_empty() || is_renderable(&shaped) {
            return (font, shaped);
        }

        let (stripped, original_index) = strip_variation_selectors(text);
        let mut retry = self.ctx.shape(&font, &stripped, &self.shape_params(&font));
        if is_renderable(&retry) {
            warn!("{:?}: rendering without variation selectors", text);
            for glyph in &mut retry {
                glyph.cluster = original_index
                    .get(glyph.cluster)
                    .copied()
                    .unwrap_or(char_count);
            }
            return (font, retry);
        }

        match self.ctx.fallback_font() {
            Ok(fallback) => {
                warn!(
                    "{:?}: no usable glyphs in {}, drawing U+FFFD in {}",
                    text,
                    font.family(),
                    fallback.family()
                );
                let mut replacement =
                    self.ctx
                        .shape(&fallback, "\u{FFFD}", &self.shape_params(&fallback));
                for glyph in &mut replacement {
                    glyph.cluster = 0;
                }
                (fallback, replacement)
            }
            Err(err) => {
                warn!("{:?}: no usable glyphs and no fallback font: {err}", text);
                (font, shaped)
            }
        }
    }

    /// Paints the text with its top-left corner at `position` of `dest`.
    ///
    /// `color` tints mask fonts and is ignored by pre-colored fonts.
    pub fn render(
        &mut self,
        dest: ResourceId,
        dest_format: PictFormat,
        color: Color,
        position: (i32, i32),
    ) -> Result<(), Error> {
        self.check()?;
        let all = 0..self.layout.glyphs.len();
        if all.is_empty() {
            return Ok(());
        }
        self.upload()?;
        match self.shaped_font.glyph_type() {
            GlyphType::PreColored => self.render_colored(dest, position),
            GlyphType::Mask => {
                let pen = self.configure_pen(false, dest_format, color)?;
                self.paint(pen, dest, position, all)
            }
        }
    }

    /// Paints the text like [`TextRenderer::render`], with the chars in `selection`
    /// painted in `selected_color`.
    ///
    /// The glyphs are painted as up to three consecutive ranges: before, inside and after
    /// the selection. Pre-colored fonts ignore both colors.
    pub fn render_selected(
        &mut self,
        dest: ResourceId,
        dest_format: PictFormat,
        color: Color,
        selected_color: Color,
        selection: Range<usize>,
        position: (i32, i32),
    ) -> Result<(), Error> {
        if self.shaped_font.glyph_type() == GlyphType::PreColored {
            return self.render(dest, dest_format, color, position);
        }
        self.check()?;
        let count = self.layout.glyphs.len();
        if count == 0 {
            return Ok(());
        }
        self.upload()?;
        let selected = self.layout.glyph_range(selection);
        for (range, in_selection) in [
            (0..selected.start, false),
            (selected.clone(), true),
            (selected.end..count, false),
        ] {
            if range.is_empty() {
                continue;
            }
            let pen_color = if in_selection { selected_color } else { color };
            let pen = self.configure_pen(in_selection, dest_format, pen_color)?;
            self.paint(pen, dest, position, range)?;
        }
        Ok(())
    }

    /// Number of chars in the cluster containing `char_index`, 0 past the end.
    pub fn glyph_length(&self, char_index: usize) -> usize {
        self.layout.glyph_length(char_index)
    }

    /// Offset along the line, in pixels, of the leading edge of the cluster containing
    /// `char_index`; the end of the line at or past the last char.
    ///
    /// The leading edge is the left one for left-to-right text and the right one for
    /// right-to-left text, whose end of line is at 0.
    pub fn pixel_offset(&self, char_index: usize) -> i32 {
        self.layout.pixel_offset(char_index)
    }

    /// The char index of the cluster boundary nearest to `x` pixels along the line.
    pub fn char_index_at_pixel(&self, x: i32) -> usize {
        self.layout.char_index_at_pixel(x)
    }

    /// Number of chars of the current text.
    pub fn char_count(&self) -> usize {
        self.layout.char_count()
    }

    fn check(&self) -> Result<(), Error> {
        if self.latch.is_tripped() || self.shaped_font.is_failed() {
            return Err(Error::latched());
        }
        Ok(())
    }

    /// Latches the renderer on a failed request.
    fn fail(&self, err: impl Into<Error>) -> Error {
        let err = err.into();
        self.latch.trip(&err);
        err
    }

    fn upload(&self) -> Result<(), Error> {
        let ids: Vec<_> = self.layout.glyphs.iter().map(|g| g.id).collect();
        self.shaped_font
            .ensure_uploaded(&ids)
            .map_err(|err| self.fail(err))
    }

    /// Points the base or selection pen at `color`, returning its picture.
    fn configure_pen(
        &mut self,
        selection: bool,
        format: PictFormat,
        color: Color,
    ) -> Result<ResourceId, Error> {
        let pens = self.ctx.pens().clone();
        let slot = if selection {
            &mut self.selection_pen
        } else {
            &mut self.pen
        };
        let reusable = slot
            .as_mut()
            .filter(|pen| pen.format() == format && !pen.is_failed());
        let result = match reusable {
            Some(pen) => pen.configure(color).map(|()| pen.picture()),
            None => pens.pen(format, color).map(|pen| slot.insert(pen).picture()),
        };
        result.map_err(|err| self.fail(err))
    }

    fn paint(
        &self,
        src: ResourceId,
        dest: ResourceId,
        position: (i32, i32),
        range: Range<usize>,
    ) -> Result<(), Error> {
        let origin = (position.0, position.1 + self.shaped_font.baseline() as i32);
        trace!("painting glyphs {range:?} at {origin:?}");
        composite_glyph_run(
            &**self.ctx.connection(),
            src,
            dest,
            self.shaped_font.glyph_set(),
            origin,
            &self.layout.glyphs[range],
        )
        .map_err(|err| self.fail(err))
    }

    fn render_colored(&mut self, dest: ResourceId, position: (i32, i32)) -> Result<(), Error> {
        if self.intermediate.is_none() {
            let (left, top, right, bottom) = self.ink_extent();
            let (Ok(width), Ok(height)) = (u16::try_from(right - left), u16::try_from(bottom - top))
            else {
                return Err(self.fail(RemoteError::Other(format!(
                    "text of {}x{} pixels exceeds the largest picture",
                    right - left,
                    bottom - top
                ))));
            };
            if width == 0 || height == 0 {
                return Ok(());
            }
            let intermediate =
                Intermediate::new(&self.ctx, (left, top), width, height, &self.latch)
                    .map_err(|err| self.fail(err))?;
            self.intermediate = Some(intermediate);
        }
        let built = self.intermediate.as_ref().is_some_and(|i| i.built);
        if !built {
            self.build_intermediate()?;
        }
        let Some(intermediate) = &self.intermediate else {
            return Ok(());
        };
        let (left, top) = intermediate.offset;
        self.ctx
            .connection()
            .composite(
                PictOp::Over,
                intermediate.picture,
                None,
                dest,
                (0, 0),
                (clamp_i16(position.0 + left), clamp_i16(position.1 + top)),
                intermediate.width,
                intermediate.height,
            )
            .map_err(|err| self.fail(err))
    }

    /// The line box grown to the ink of every glyph, as `(left, top, right, bottom)`
    /// relative to the top-left corner of the text.
    fn ink_extent(&self) -> (i32, i32, i32, i32) {
        let font = &self.shaped_font;
        let id_space = font.id_space();
        let baseline = font.baseline() as i32;
        let (width, height) = self.size;
        let mut extent = (0, 0, width as i32, height as i32);
        for glyph in &self.layout.glyphs {
            let shift = id_space.phase_shift(id_space.phase(glyph.id));
            let Some((left, top, right, bottom)) = font.ink_bounds(id_space.index(glyph.id), shift)
            else {
                continue;
            };
            if right <= left || bottom <= top {
                continue;
            }
            extent.0 = extent.0.min(glyph.x + left);
            extent.1 = extent.1.min(baseline + glyph.y + top);
            extent.2 = extent.2.max(glyph.x + right);
            extent.3 = extent.3.max(baseline + glyph.y + bottom);
        }
        extent
    }

    /// Paints the glyphs into the intermediate picture, shifted so its ink box starts at
    /// the picture's top-left corner.
    fn build_intermediate(&mut self) -> Result<(), Error> {
        let white = self.configure_pen(false, PictFormat::Argb32, Color::WHITE)?;
        let Some(intermediate) = &self.intermediate else {
            return Ok(());
        };
        let picture = intermediate.picture;
        let (left, top) = intermediate.offset;
        let full = Rectangle {
            x: 0,
            y: 0,
            width: intermediate.width,
            height: intermediate.height,
        };
        self.ctx
            .connection()
            .fill_rectangles(PictOp::Src, picture, Color::TRANSPARENT.to_render(), &[full])
            .map_err(|err| self.fail(err))?;
        self.paint(white, picture, (-left, -top), 0..self.layout.glyphs.len())?;
        if let Some(intermediate) = &mut self.intermediate {
            intermediate.built = true;
        }
        Ok(())
    }
}

impl fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextRenderer")
            .field("text", &self.text)
            .field("font", &self.font.family())
            .field("size", &self.size)
            .field("failed", &self.is_failed())
            .finish_non_exhaustive()
    }
}

/// The renderer's cached rendering of pre-colored text.
struct Intermediate {
    conn: Rc<dyn RenderConnection>,
    pixmap: ResourceId,
    picture: ResourceId,
    /// Top-left corner relative to the text's top-left corner.
    offset: (i32, i32),
    width: u16,
    height: u16,
    built: bool,
    _subscriptions: [Subscription; 2],
}

impl Intermediate {
    fn new(
        ctx: &TextContext,
        offset: (i32, i32),
        width: u16,
        height: u16,
        latch: &ErrorLatch,
    ) -> Result<Self, RemoteError> {
        let conn = ctx.connection().clone();
        let pixmap = conn.generate_id()?;
        conn.create_pixmap(PictFormat::Argb32.depth(), pixmap, conn.root(), width, height)?;
        let picture = match conn
            .generate_id()
            .and_then(|picture| {
                conn.create_picture(picture, pixmap, PictFormat::Argb32, Repeat::None)
                    .map(|()| picture)
            }) {
            Ok(picture) => picture,
            Err(err) => {
                let _ = conn.free_pixmap(pixmap);
                return Err(err);
            }
        };
        let subscriptions = [
            ctx.errors().subscribe(pixmap, latch),
            ctx.errors().subscribe(picture, latch),
        ];
        Ok(Self {
            conn,
            pixmap,
            picture,
            offset,
            width,
            height,
            built: false,
            _subscriptions: subscriptions,
        })
    }
}

impl Drop for Intermediate {
    fn drop(&mut self) {
        let _ = self.conn.free_picture(self.picture);
        let _ = self.conn.free_pixmap(self.pixmap);
    }
}

/// Composites `glyphs` positioned relative to `origin`, in as many requests as the
/// connection's request limit needs. The first element of each request carries the
/// absolute position of its glyph, later ones the delta to the previous glyph.
fn composite_glyph_run(
    conn: &dyn RenderConnection,
    src: ResourceId,
    dest: ResourceId,
    glyph_set: ResourceId,
    origin: (i32, i32),
    glyphs: &[PlacedGlyph],
) -> Result<(), RemoteError> {
    let per_request = max_composite_elements(conn.maximum_request_bytes()).max(1);
    let mut elements: SmallVec<[GlyphElement; 32]> = SmallVec::new();
    for chunk in glyphs.chunks(per_request) {
        elements.clear();
        let mut previous = (-origin.0, -origin.1);
        for glyph in chunk {
            elements.push(GlyphElement {
                dx: clamp_i16(glyph.x - previous.0),
                dy: clamp_i16(glyph.y - previous.1),
                glyph: glyph.id.0,
            });
            previous = (glyph.x, glyph.y);
        }
        conn.composite_glyphs(PictOp::Over, src, dest, glyph_set, 0, 0, &elements)?;
    }
    Ok(())
}

#[expect(clippy::cast_possible_truncation, reason = "clamped to the i16 range")]
fn clamp_i16(value: i32) -> i16 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

fn empty_size(font: &Font, direction: Direction) -> (u32, u32) {
    match direction {
        Direction::Horizontal => (0, font.line_height()),
        Direction::Vertical => (font.max_width(), 0),
    }
}

/// The logical size of a laid out line.
///
/// Along the line it reaches from the origin to the ink edge of the last glyph, so a
/// trailing advance is not counted. Across the line it is the font's line box.
fn logical_size(font: &Font, layout: &GlyphLayout, direction: Direction) -> (u32, u32) {
    let Some(last) = layout.glyphs.last() else {
        return empty_size(font, direction);
    };
    let id_space = font.id_space();
    let shift = id_space.phase_shift(id_space.phase(last.id));
    let (_, _, right, bottom) = font
        .ink_bounds(id_space.index(last.id), shift)
        .unwrap_or((0, 0, 0, 0));
    let extent = |value: i32| value.max(0) as u32;
    match direction {
        Direction::Horizontal => (extent(last.x + right), font.line_height()),
        Direction::Vertical => (
            font.max_width(),
            extent(font.baseline() as i32 + last.y + bottom),
        ),
    }
}
