// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory Render server.
//!
//! [`MockServer`] implements [`RenderConnection`] without a display. Every request is
//! recorded as a [`Request`] with its encoded length, and fills and composites are carried
//! out on premultiplied `0xAARRGGBB` pixel buffers so tests can read back what a real
//! server would have drawn.
//!
//! Requests naming unknown resources, or otherwise malformed ones, are recorded but not
//! executed. As on a real server they produce an [`ErrorEvent`], queued until the test
//! drains it with [`MockServer::take_errors`].

use core::cell::RefCell;
use core::fmt;
use std::rc::Rc;

use glyphwire::remote::{add_glyphs_len, composite_glyphs_len, pad4};
use glyphwire::{
    ErrorEvent, GlyphElement, GlyphInfo, PictFormat, PictOp, Rectangle, RemoteError,
    RenderColor, RenderConnection, Repeat, ResourceId,
};
use hashbrown::HashMap;
use log::{trace, warn};

/// The root window every pixmap is created against.
pub const ROOT: ResourceId = 0x0000_0100;

/// Largest request of a server without the BIG-REQUESTS extension.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 65535 * 4;

const FIRST_ID: ResourceId = 0x0040_0000;

/// Major opcode assigned to the Render extension.
pub const RENDER_MAJOR_OPCODE: u8 = 139;
const RENDER_ERROR_BASE: u8 = 142;

/// `BadValue`.
pub const BAD_VALUE: u8 = 2;
/// `BadPixmap`.
pub const BAD_PIXMAP: u8 = 4;
/// `BadMatch`.
pub const BAD_MATCH: u8 = 8;
/// `BadDrawable`.
pub const BAD_DRAWABLE: u8 = 9;
/// `BadIDChoice`.
pub const BAD_ID_CHOICE: u8 = 14;
/// `BadLength`.
pub const BAD_LENGTH: u8 = 16;
/// Render's `BadPicture`.
pub const BAD_PICTURE: u8 = RENDER_ERROR_BASE + 1;
/// Render's `BadGlyphSet`.
pub const BAD_GLYPH_SET: u8 = RENDER_ERROR_BASE + 3;
/// Render's `BadGlyph`.
pub const BAD_GLYPH: u8 = RENDER_ERROR_BASE + 4;

/// A request as it went over the wire.
#[derive(Clone, PartialEq, Debug)]
pub enum Request {
    /// `CreatePixmap`.
    CreatePixmap {
        /// New pixmap id.
        pixmap: ResourceId,
        /// Bits per pixel.
        depth: u8,
        /// Width in pixels.
        width: u16,
        /// Height in pixels.
        height: u16,
    },
    /// `FreePixmap`.
    FreePixmap(ResourceId),
    /// `RenderCreatePicture`.
    CreatePicture {
        /// New picture id.
        picture: ResourceId,
        /// Pixmap the picture draws to.
        drawable: ResourceId,
        /// Pixel format.
        format: PictFormat,
        /// Repeat mode.
        repeat: Repeat,
    },
    /// `RenderFreePicture`.
    FreePicture(ResourceId),
    /// `RenderFillRectangles`.
    FillRectangles {
        /// Operator.
        op: PictOp,
        /// Destination picture.
        dst: ResourceId,
        /// Fill color.
        color: RenderColor,
        /// Filled rectangles.
        rects: Vec<Rectangle>,
    },
    /// `RenderCreateGlyphSet`.
    CreateGlyphSet {
        /// New glyph set id.
        glyph_set: ResourceId,
        /// Format of the glyph images.
        format: PictFormat,
    },
    /// `RenderFreeGlyphSet`.
    FreeGlyphSet(ResourceId),
    /// `RenderAddGlyphs`.
    AddGlyphs {
        /// Target glyph set.
        glyph_set: ResourceId,
        /// Ids of the added glyphs.
        ids: Vec<u32>,
        /// Bytes of image data.
        data_len: usize,
    },
    /// `RenderCompositeGlyphs32`.
    CompositeGlyphs {
        /// Operator.
        op: PictOp,
        /// Source picture.
        src: ResourceId,
        /// Destination picture.
        dst: ResourceId,
        /// Glyph set the masks come from.
        glyph_set: ResourceId,
        /// Positioned glyphs.
        elements: Vec<GlyphElement>,
    },
    /// `RenderComposite`.
    Composite {
        /// Operator.
        op: PictOp,
        /// Source picture.
        src: ResourceId,
        /// Optional mask picture.
        mask: Option<ResourceId>,
        /// Destination picture.
        dst: ResourceId,
        /// Top-left corner in the destination.
        dst_pos: (i16, i16),
        /// Width of the composited area.
        width: u16,
        /// Height of the composited area.
        height: u16,
    },
}

impl Request {
    /// Length of the request on the wire, in bytes.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::CreatePixmap { .. } => 16,
            Self::FreePixmap(_) | Self::FreePicture(_) | Self::FreeGlyphSet(_) => 8,
            Self::CreatePicture { repeat, .. } => match repeat {
                Repeat::None => 20,
                Repeat::Normal => 24,
            },
            Self::FillRectangles { rects, .. } => 20 + 8 * rects.len(),
            Self::CreateGlyphSet { .. } => 12,
            Self::AddGlyphs { ids, data_len, .. } => add_glyphs_len(ids.len(), *data_len),
            Self::CompositeGlyphs { elements, .. } => composite_glyphs_len(elements.len()),
            Self::Composite { .. } => 36,
        }
    }

    /// Major and minor opcode of the request.
    pub fn opcode(&self) -> (u8, u16) {
        match self {
            Self::CreatePixmap { .. } => (53, 0),
            Self::FreePixmap(_) => (54, 0),
            Self::CreatePicture { .. } => (RENDER_MAJOR_OPCODE, 4),
            Self::FreePicture(_) => (RENDER_MAJOR_OPCODE, 7),
            Self::Composite { .. } => (RENDER_MAJOR_OPCODE, 8),
            Self::CreateGlyphSet { .. } => (RENDER_MAJOR_OPCODE, 17),
            Self::FreeGlyphSet(_) => (RENDER_MAJOR_OPCODE, 19),
            Self::AddGlyphs { .. } => (RENDER_MAJOR_OPCODE, 20),
            Self::CompositeGlyphs { .. } => (RENDER_MAJOR_OPCODE, 25),
            Self::FillRectangles { .. } => (RENDER_MAJOR_OPCODE, 26),
        }
    }
}

/// A request in the log, with its wire length.
#[derive(Clone, PartialEq, Debug)]
pub struct RecordedRequest {
    /// The request.
    pub request: Request,
    /// Encoded length in bytes.
    pub len: usize,
}

/// A glyph image held by a glyph set.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct StoredGlyph {
    /// Metrics sent with the image.
    pub info: GlyphInfo,
    /// Image rows, padded as received.
    pub image: Vec<u8>,
}

#[derive(Debug)]
struct Surface {
    width: u16,
    height: u16,
    depth: u8,
    pixels: Vec<u32>,
}

impl Surface {
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let (width, height) = (i32::from(self.width), i32::from(self.height));
        ((0..width).contains(&x) && (0..height).contains(&y)).then(|| (y * width + x) as usize)
    }
}

#[derive(Debug)]
struct Picture {
    surface: Rc<RefCell<Surface>>,
    format: PictFormat,
    repeat: Repeat,
}

#[derive(Debug)]
struct GlyphSet {
    format: PictFormat,
    glyphs: HashMap<u32, StoredGlyph>,
}

/// A snapshot of a picture's pixels for reading while another picture is written.
struct Sampler {
    width: i32,
    height: i32,
    format: PictFormat,
    repeat: Repeat,
    pixels: Vec<u32>,
}

impl Sampler {
    fn new(picture: &Picture) -> Self {
        let surface = picture.surface.borrow();
        Self {
            width: i32::from(surface.width),
            height: i32::from(surface.height),
            format: picture.format,
            repeat: picture.repeat,
            pixels: surface.pixels.clone(),
        }
    }

    fn sample(&self, x: i32, y: i32) -> u32 {
        let (x, y) = match self.repeat {
            Repeat::Normal => (x.rem_euclid(self.width), y.rem_euclid(self.height)),
            Repeat::None => (x, y),
        };
        if !(0..self.width).contains(&x) || !(0..self.height).contains(&y) {
            return 0;
        }
        load(self.format, self.pixels[(y * self.width + x) as usize])
    }
}

#[derive(Debug)]
struct State {
    next_id: ResourceId,
    id_limit: Option<ResourceId>,
    max_request_bytes: usize,
    closed: bool,
    log: Vec<RecordedRequest>,
    pixmaps: HashMap<ResourceId, Rc<RefCell<Surface>>>,
    pictures: HashMap<ResourceId, Picture>,
    glyph_sets: HashMap<ResourceId, GlyphSet>,
    errors: Vec<ErrorEvent>,
}

impl State {
    fn error(&mut self, request: &Request, resource: ResourceId, code: u8) {
        let (major_opcode, minor_opcode) = request.opcode();
        let event = ErrorEvent {
            resource,
            code,
            major_opcode,
            minor_opcode,
        };
        warn!("mock server: {event}");
        self.errors.push(event);
    }

    fn is_free(&self, id: ResourceId) -> bool {
        !self.pixmaps.contains_key(&id)
            && !self.pictures.contains_key(&id)
            && !self.glyph_sets.contains_key(&id)
    }

    fn sampler(&self, picture: ResourceId) -> Option<Sampler> {
        self.pictures.get(&picture).map(Sampler::new)
    }
}

/// A software Render server for tests.
///
/// Pixmaps are stored as premultiplied `0xAARRGGBB` words whatever their depth. Pictures
/// read and write them through their format: `Rgb24` pixels are opaque and `A8` pixels
/// carry only alpha.
pub struct MockServer {
    state: RefCell<State>,
}

impl MockServer {
    /// Creates a server accepting requests of up to [`DEFAULT_MAX_REQUEST_BYTES`].
    pub fn new() -> Self {
        Self::with_max_request_bytes(DEFAULT_MAX_REQUEST_BYTES)
    }

    /// Creates a server accepting requests of up to `max` bytes.
    pub fn with_max_request_bytes(max: usize) -> Self {
        Self {
            state: RefCell::new(State {
                next_id: FIRST_ID,
                id_limit: None,
                max_request_bytes: max,
                closed: false,
                log: Vec::new(),
                pixmaps: HashMap::new(),
                pictures: HashMap::new(),
                glyph_sets: HashMap::new(),
                errors: Vec::new(),
            }),
        }
    }

    /// Changes the request limit.
    pub fn set_max_request_bytes(&self, max: usize) {
        self.state.borrow_mut().max_request_bytes = max;
    }

    /// Allows only `count` more ids to be generated.
    pub fn limit_ids(&self, count: u32) {
        let mut state = self.state.borrow_mut();
        state.id_limit = Some(state.next_id.saturating_add(count));
    }

    /// Makes every later request fail with [`RemoteError::ConnectionClosed`].
    pub fn close(&self) {
        self.state.borrow_mut().closed = true;
    }

    /// Creates an unrecorded pixmap and picture of `format`, cleared to transparent.
    pub fn surface(&self, width: u16, height: u16, format: PictFormat) -> ResourceId {
        let mut state = self.state.borrow_mut();
        let pixmap = state.next_id;
        let picture = pixmap + 1;
        state.next_id += 2;
        let surface = Rc::new(RefCell::new(Surface {
            width,
            height,
            depth: format.depth(),
            pixels: vec![0; usize::from(width) * usize::from(height)],
        }));
        state.pixmaps.insert(pixmap, surface.clone());
        state.pictures.insert(
            picture,
            Picture {
                surface,
                format,
                repeat: Repeat::None,
            },
        );
        picture
    }

    /// The error event a failed request on `resource` produces.
    ///
    /// Nothing is queued: the caller delivers the event, usually to
    /// [`TextContext::dispatch_error`](glyphwire::TextContext::dispatch_error).
    pub fn inject_error(&self, resource: ResourceId) -> ErrorEvent {
        let state = self.state.borrow();
        let (code, (major_opcode, minor_opcode)) = if state.pictures.contains_key(&resource) {
            (BAD_PICTURE, (RENDER_MAJOR_OPCODE, 8))
        } else if state.glyph_sets.contains_key(&resource) {
            (BAD_GLYPH_SET, (RENDER_MAJOR_OPCODE, 20))
        } else if state.pixmaps.contains_key(&resource) {
            (BAD_PIXMAP, (53, 0))
        } else {
            (BAD_MATCH, (RENDER_MAJOR_OPCODE, 0))
        };
        ErrorEvent {
            resource,
            code,
            major_opcode,
            minor_opcode,
        }
    }

    /// Drains the errors produced by rejected requests.
    pub fn take_errors(&self) -> Vec<ErrorEvent> {
        core::mem::take(&mut self.state.borrow_mut().errors)
    }

    /// Every recorded request, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.borrow().log.clone()
    }

    /// Number of recorded requests matching `filter`.
    pub fn count(&self, filter: impl Fn(&Request) -> bool) -> usize {
        self.state
            .borrow()
            .log
            .iter()
            .filter(|r| filter(&r.request))
            .count()
    }

    /// Number of recorded `AddGlyphs` requests.
    pub fn add_glyphs_count(&self) -> usize {
        self.count(|r| matches!(r, Request::AddGlyphs { .. }))
    }

    /// Number of recorded `CompositeGlyphs` requests.
    pub fn composite_glyphs_count(&self) -> usize {
        self.count(|r| matches!(r, Request::CompositeGlyphs { .. }))
    }

    /// Number of recorded `Composite` requests.
    pub fn composite_count(&self) -> usize {
        self.count(|r| matches!(r, Request::Composite { .. }))
    }

    /// Number of recorded `CreatePicture` requests.
    pub fn create_picture_count(&self) -> usize {
        self.count(|r| matches!(r, Request::CreatePicture { .. }))
    }

    /// Length of the largest recorded request.
    pub fn largest_request(&self) -> usize {
        self.state
            .borrow()
            .log
            .iter()
            .map(|r| r.len)
            .max()
            .unwrap_or(0)
    }

    /// Forgets the recorded requests.
    pub fn clear_log(&self) {
        self.state.borrow_mut().log.clear();
    }

    /// Number of pixmaps not freed yet.
    pub fn live_pixmaps(&self) -> usize {
        self.state.borrow().pixmaps.len()
    }

    /// Number of pictures not freed yet.
    pub fn live_pictures(&self) -> usize {
        self.state.borrow().pictures.len()
    }

    /// Number of glyph sets not freed yet.
    pub fn live_glyph_sets(&self) -> usize {
        self.state.borrow().glyph_sets.len()
    }

    /// Number of glyphs in `glyph_set`.
    pub fn glyph_count(&self, glyph_set: ResourceId) -> usize {
        self.state
            .borrow()
            .glyph_sets
            .get(&glyph_set)
            .map_or(0, |set| set.glyphs.len())
    }

    /// Glyph `id` of `glyph_set`.
    pub fn glyph(&self, glyph_set: ResourceId, id: u32) -> Option<StoredGlyph> {
        self.state
            .borrow()
            .glyph_sets
            .get(&glyph_set)?
            .glyphs
            .get(&id)
            .cloned()
    }

    /// Pixel of `picture` at `(x, y)`, read through the picture's format.
    pub fn pixel(&self, picture: ResourceId, x: i32, y: i32) -> Option<u32> {
        let state = self.state.borrow();
        let picture = state.pictures.get(&picture)?;
        let surface = picture.surface.borrow();
        let index = surface.index(x, y)?;
        Some(load(picture.format, surface.pixels[index]))
    }

    /// A `width` by `height` block of `picture` at `(x, y)`, row by row. Pixels outside
    /// the picture read as transparent.
    pub fn read(&self, picture: ResourceId, x: i32, y: i32, width: u16, height: u16) -> Vec<u32> {
        let Some(sampler) = self.state.borrow().sampler(picture) else {
            return Vec::new();
        };
        let sampler = Sampler {
            repeat: Repeat::None,
            ..sampler
        };
        let mut out = Vec::with_capacity(usize::from(width) * usize::from(height));
        for row in 0..i32::from(height) {
            for col in 0..i32::from(width) {
                out.push(sampler.sample(x + col, y + row));
            }
        }
        out
    }

    /// Size of the pixmap behind `picture`.
    pub fn picture_size(&self, picture: ResourceId) -> Option<(u16, u16)> {
        let state = self.state.borrow();
        let surface = state.pictures.get(&picture)?.surface.borrow();
        Some((surface.width, surface.height))
    }

    /// Records `request` if the connection is open and the request fits.
    fn send(&self, request: Request) -> Result<core::cell::RefMut<'_, State>, RemoteError> {
        let mut state = self.state.borrow_mut();
        if state.closed {
            return Err(RemoteError::ConnectionClosed);
        }
        let len = request.encoded_len();
        if len > state.max_request_bytes {
            return Err(RemoteError::RequestTooLarge {
                len,
                max: state.max_request_bytes,
            });
        }
        trace!("mock server: {request:?} ({len} bytes)");
        state.log.push(RecordedRequest { request, len });
        Ok(state)
    }
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MockServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("MockServer")
            .field("requests", &state.log.len())
            .field("pixmaps", &state.pixmaps.len())
            .field("pictures", &state.pictures.len())
            .field("glyph_sets", &state.glyph_sets.len())
            .field("pending_errors", &state.errors.len())
            .finish_non_exhaustive()
    }
}

impl RenderConnection for MockServer {
    fn generate_id(&self) -> Result<ResourceId, RemoteError> {
        let mut state = self.state.borrow_mut();
        if state.closed {
            return Err(RemoteError::ConnectionClosed);
        }
        if state.id_limit.is_some_and(|limit| state.next_id >= limit) {
            return Err(RemoteError::IdsExhausted);
        }
        let id = state.next_id;
        state.next_id += 1;
        Ok(id)
    }

    fn maximum_request_bytes(&self) -> usize {
        self.state.borrow().max_request_bytes
    }

    fn root(&self) -> ResourceId {
        ROOT
    }

    fn create_pixmap(
        &self,
        depth: u8,
        pixmap: ResourceId,
        drawable: ResourceId,
        width: u16,
        height: u16,
    ) -> Result<(), RemoteError> {
        let request = Request::CreatePixmap {
            pixmap,
            depth,
            width,
            height,
        };
        let mut state = self.send(request.clone())?;
        if drawable != ROOT && !state.pixmaps.contains_key(&drawable) {
            state.error(&request, drawable, BAD_DRAWABLE);
        } else if !state.is_free(pixmap) {
            state.error(&request, pixmap, BAD_ID_CHOICE);
        } else if width == 0 || height == 0 || !matches!(depth, 1 | 8 | 24 | 32) {
            state.error(&request, pixmap, BAD_VALUE);
        } else {
            let surface = Surface {
                width,
                height,
                depth,
                pixels: vec![0; usize::from(width) * usize::from(height)],
            };
            state.pixmaps.insert(pixmap, Rc::new(RefCell::new(surface)));
        }
        Ok(())
    }

    fn free_pixmap(&self, pixmap: ResourceId) -> Result<(), RemoteError> {
        let request = Request::FreePixmap(pixmap);
        let mut state = self.send(request.clone())?;
        // Pictures keep their pixels alive.
        if state.pixmaps.remove(&pixmap).is_none() {
            state.error(&request, pixmap, BAD_PIXMAP);
        }
        Ok(())
    }

    fn create_picture(
        &self,
        picture: ResourceId,
        drawable: ResourceId,
        format: PictFormat,
        repeat: Repeat,
    ) -> Result<(), RemoteError> {
        let request = Request::CreatePicture {
            picture,
            drawable,
            format,
            repeat,
        };
        let mut state = self.send(request.clone())?;
        let Some(surface) = state.pixmaps.get(&drawable).cloned() else {
            state.error(&request, drawable, BAD_DRAWABLE);
            return Ok(());
        };
        if !state.is_free(picture) {
            state.error(&request, picture, BAD_ID_CHOICE);
        } else if surface.borrow().depth != format.depth() {
            state.error(&request, picture, BAD_MATCH);
        } else {
            state.pictures.insert(
                picture,
                Picture {
                    surface,
                    format,
                    repeat,
                },
            );
        }
        Ok(())
    }

    fn free_picture(&self, picture: ResourceId) -> Result<(), RemoteError> {
        let request = Request::FreePicture(picture);
        let mut state = self.send(request.clone())?;
        if state.pictures.remove(&picture).is_none() {
            state.error(&request, picture, BAD_PICTURE);
        }
        Ok(())
    }

    fn fill_rectangles(
        &self,
        op: PictOp,
        dst: ResourceId,
        color: RenderColor,
        rects: &[Rectangle],
    ) -> Result<(), RemoteError> {
        let request = Request::FillRectangles {
            op,
            dst,
            color,
            rects: rects.to_vec(),
        };
        let mut state = self.send(request.clone())?;
        let Some(picture) = state.pictures.get(&dst) else {
            state.error(&request, dst, BAD_PICTURE);
            return Ok(());
        };
        let src = pack(color);
        let mut surface = picture.surface.borrow_mut();
        for rect in rects {
            for y in i32::from(rect.y)..i32::from(rect.y) + i32::from(rect.height) {
                for x in i32::from(rect.x)..i32::from(rect.x) + i32::from(rect.width) {
                    blend_into(&mut surface, picture.format, x, y, op, src, u32::MAX);
                }
            }
        }
        Ok(())
    }

    fn create_glyph_set(
        &self,
        glyph_set: ResourceId,
        format: PictFormat,
    ) -> Result<(), RemoteError> {
        let request = Request::CreateGlyphSet { glyph_set, format };
        let mut state = self.send(request.clone())?;
        if !state.is_free(glyph_set) {
            state.error(&request, glyph_set, BAD_ID_CHOICE);
        } else if format == PictFormat::Rgb24 {
            state.error(&request, glyph_set, BAD_MATCH);
        } else {
            state.glyph_sets.insert(
                glyph_set,
                GlyphSet {
                    format,
                    glyphs: HashMap::new(),
                },
            );
        }
        Ok(())
    }

    fn free_glyph_set(&self, glyph_set: ResourceId) -> Result<(), RemoteError> {
        let request = Request::FreeGlyphSet(glyph_set);
        let mut state = self.send(request.clone())?;
        if state.glyph_sets.remove(&glyph_set).is_none() {
            state.error(&request, glyph_set, BAD_GLYPH_SET);
        }
        Ok(())
    }

    fn add_glyphs(
        &self,
        glyph_set: ResourceId,
        ids: &[u32],
        infos: &[GlyphInfo],
        data: &[u8],
    ) -> Result<(), RemoteError> {
        let request = Request::AddGlyphs {
            glyph_set,
            ids: ids.to_vec(),
            data_len: data.len(),
        };
        let mut state = self.send(request.clone())?;
        let Some(set) = state.glyph_sets.get(&glyph_set) else {
            state.error(&request, glyph_set, BAD_GLYPH_SET);
            return Ok(());
        };
        let image_len = |info: &GlyphInfo| {
            let (width, height) = (usize::from(info.width), usize::from(info.height));
            match set.format {
                PictFormat::A8 => pad4(width) * height,
                PictFormat::Rgb24 | PictFormat::Argb32 => 4 * width * height,
            }
        };
        let lens: Vec<usize> = infos.iter().map(image_len).collect();
        if ids.len() != infos.len() || lens.iter().sum::<usize>() != data.len() {
            state.error(&request, glyph_set, BAD_LENGTH);
            return Ok(());
        }
        let mut glyphs = Vec::with_capacity(ids.len());
        let mut offset = 0;
        for ((&id, info), len) in ids.iter().zip(infos).zip(lens) {
            let image = data[offset..offset + len].to_vec();
            offset += len;
            glyphs.push((id, StoredGlyph { info: *info, image }));
        }
        if let Some(set) = state.glyph_sets.get_mut(&glyph_set) {
            set.glyphs.extend(glyphs);
        }
        Ok(())
    }

    fn composite_glyphs(
        &self,
        op: PictOp,
        src: ResourceId,
        dst: ResourceId,
        glyph_set: ResourceId,
        src_x: i16,
        src_y: i16,
        elements: &[GlyphElement],
    ) -> Result<(), RemoteError> {
        let request = Request::CompositeGlyphs {
            op,
            src,
            dst,
            glyph_set,
            elements: elements.to_vec(),
        };
        let mut state = self.send(request.clone())?;
        let Some(sampler) = state.sampler(src) else {
            state.error(&request, src, BAD_PICTURE);
            return Ok(());
        };
        if !state.pictures.contains_key(&dst) {
            state.error(&request, dst, BAD_PICTURE);
            return Ok(());
        }
        let Some(set) = state.glyph_sets.get(&glyph_set) else {
            state.error(&request, glyph_set, BAD_GLYPH_SET);
            return Ok(());
        };
        if let Some(missing) = elements.iter().find(|e| !set.glyphs.contains_key(&e.glyph)) {
            let glyph = missing.glyph;
            state.error(&request, glyph, BAD_GLYPH);
            return Ok(());
        }
        let (Some(set), Some(picture)) = (state.glyph_sets.get(&glyph_set), state.pictures.get(&dst))
        else {
            return Ok(());
        };
        let mut surface = picture.surface.borrow_mut();
        let (mut pen_x, mut pen_y) = (0_i32, 0_i32);
        let mut first = None;
        for element in elements {
            pen_x += i32::from(element.dx);
            pen_y += i32::from(element.dy);
            let Some(glyph) = set.glyphs.get(&element.glyph) else {
                continue;
            };
            let (origin_x, origin_y) = *first.get_or_insert((pen_x, pen_y));
            let info = glyph.info;
            let left = pen_x - i32::from(info.x);
            let top = pen_y - i32::from(info.y);
            let width = usize::from(info.width);
            for (row, y) in (0..usize::from(info.height)).zip(top..) {
                for (col, x) in (0..width).zip(left..) {
                    let mask = match set.format {
                        PictFormat::A8 => {
                            let alpha = u32::from(glyph.image[row * pad4(width) + col]);
                            alpha * 0x0101_0101
                        }
                        PictFormat::Rgb24 | PictFormat::Argb32 => {
                            let at = 4 * (row * width + col);
                            let bytes = &glyph.image[at..at + 4];
                            u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
                        }
                    };
                    let src = sampler.sample(
                        i32::from(src_x) + x - origin_x,
                        i32::from(src_y) + y - origin_y,
                    );
                    blend_into(&mut surface, picture.format, x, y, op, src, mask);
                }
            }
            pen_x += i32::from(info.x_off);
            pen_y += i32::from(info.y_off);
        }
        Ok(())
    }

    fn composite(
        &self,
        op: PictOp,
        src: ResourceId,
        mask: Option<ResourceId>,
        dst: ResourceId,
        src_pos: (i16, i16),
        dst_pos: (i16, i16),
        width: u16,
        height: u16,
    ) -> Result<(), RemoteError> {
        let request = Request::Composite {
            op,
            src,
            mask,
            dst,
            dst_pos,
            width,
            height,
        };
        let mut state = self.send(request.clone())?;
        let Some(source) = state.sampler(src) else {
            state.error(&request, src, BAD_PICTURE);
            return Ok(());
        };
        let mask_sampler = match mask {
            Some(mask) => match state.sampler(mask) {
                Some(sampler) => Some(sampler),
                None => {
                    state.error(&request, mask, BAD_PICTURE);
                    return Ok(());
                }
            },
            None => None,
        };
        let Some(picture) = state.pictures.get(&dst) else {
            state.error(&request, dst, BAD_PICTURE);
            return Ok(());
        };
        let mut surface = picture.surface.borrow_mut();
        for row in 0..i32::from(height) {
            for col in 0..i32::from(width) {
                let s = source.sample(i32::from(src_pos.0) + col, i32::from(src_pos.1) + row);
                let m = mask_sampler.as_ref().map_or(u32::MAX, |mask| {
                    (mask.sample(i32::from(src_pos.0) + col, i32::from(src_pos.1) + row) >> 24)
                        * 0x0101_0101
                });
                let (x, y) = (i32::from(dst_pos.0) + col, i32::from(dst_pos.1) + row);
                blend_into(&mut surface, picture.format, x, y, op, s, m);
            }
        }
        Ok(())
    }
}

/// Reads a stored word through a picture format.
fn load(format: PictFormat, word: u32) -> u32 {
    match format {
        PictFormat::A8 => word & 0xff00_0000,
        PictFormat::Rgb24 => word | 0xff00_0000,
        PictFormat::Argb32 => word,
    }
}

/// Packs a 16-bit color into a premultiplied `0xAARRGGBB` word.
fn pack(color: RenderColor) -> u32 {
    let c = |v: u16| u32::from(v >> 8);
    (c(color.alpha) << 24) | (c(color.red) << 16) | (c(color.green) << 8) | c(color.blue)
}

fn mul(a: u32, b: u32) -> u32 {
    (a * b + 127) / 255
}

/// Applies `op` with `src` masked by the per-channel `mask` onto the pixel at `(x, y)`.
fn blend_into(
    surface: &mut Surface,
    format: PictFormat,
    x: i32,
    y: i32,
    op: PictOp,
    src: u32,
    mask: u32,
) {
    let Some(index) = surface.index(x, y) else {
        return;
    };
    let dst = load(format, surface.pixels[index]);
    let src_alpha = src >> 24;
    let dst_alpha = dst >> 24;
    let mut out = 0;
    for shift in [0, 8, 16, 24] {
        let m = (mask >> shift) & 0xff;
        let s = mul((src >> shift) & 0xff, m);
        let d = (dst >> shift) & 0xff;
        let value = match op {
            PictOp::Clear => 0,
            PictOp::Src => s,
            PictOp::Over => (s + mul(d, 255 - mul(src_alpha, m))).min(255),
            PictOp::In => mul(s, dst_alpha),
        };
        out |= value << shift;
    }
    surface.pixels[index] = load(format, out);
}
