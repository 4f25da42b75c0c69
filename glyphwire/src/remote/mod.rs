// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The remote rendering protocol as seen by the glyph engine.
//!
//! [`RenderConnection`] is modelled on the X Render extension. Requests are fire and
//! forget: a method returning `Ok(())` only means the request was queued. Failures
//! detected by the server arrive later as [`ErrorEvent`]s, which the event loop feeds into
//! an [`ErrorDispatch`].

mod errors;

pub use errors::{ErrorDispatch, ErrorEvent, ErrorLatch, Subscription};

/// Identifier of a server-side resource (pixmap, picture or glyph set).
pub type ResourceId = u32;

/// Pixel formats used for pictures and glyph sets.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum PictFormat {
    /// 8-bit alpha only.
    A8,
    /// 24-bit RGB without alpha.
    Rgb24,
    /// 32-bit premultiplied ARGB.
    Argb32,
}

impl PictFormat {
    /// Depth of a pixmap holding this format.
    pub const fn depth(self) -> u8 {
        match self {
            Self::A8 => 8,
            Self::Rgb24 => 24,
            Self::Argb32 => 32,
        }
    }

    /// Bytes per pixel of glyph images in this format.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::A8 => 1,
            Self::Rgb24 | Self::Argb32 => 4,
        }
    }
}

/// Porter-Duff operators used by the engine.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum PictOp {
    /// Clear the destination.
    Clear,
    /// Replace the destination with the source.
    Src,
    /// Source over destination.
    Over,
    /// Source in destination.
    In,
}

/// Repeat mode of a picture.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum Repeat {
    /// Pixels outside the picture are transparent.
    #[default]
    None,
    /// The picture tiles the plane.
    Normal,
}

/// A color with 16-bit premultiplied channels.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct RenderColor {
    /// Red, premultiplied.
    pub red: u16,
    /// Green, premultiplied.
    pub green: u16,
    /// Blue, premultiplied.
    pub blue: u16,
    /// Alpha.
    pub alpha: u16,
}

/// An axis-aligned rectangle in picture coordinates.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Rectangle {
    /// Left edge.
    pub x: i16,
    /// Top edge.
    pub y: i16,
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
}

/// Metrics of an uploaded glyph image.
///
/// `x` and `y` locate the glyph origin relative to the top-left corner of the image,
/// so `x` is the negated left bearing and `y` the distance from the top to the baseline.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct GlyphInfo {
    /// Image width.
    pub width: u16,
    /// Image height.
    pub height: u16,
    /// Origin x relative to the image.
    pub x: i16,
    /// Origin y relative to the image.
    pub y: i16,
    /// Horizontal pen advance after the glyph.
    pub x_off: i16,
    /// Vertical pen advance after the glyph.
    pub y_off: i16,
}

/// One glyph of a glyph composite request, positioned by a delta to the previous pen
/// position (or to the destination origin for the first element of a request).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct GlyphElement {
    /// Horizontal delta.
    pub dx: i16,
    /// Vertical delta.
    pub dy: i16,
    /// Glyph id in the glyph set.
    pub glyph: u32,
}

/// A failure reported synchronously by a [`RenderConnection`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteError {
    /// The connection to the server is gone.
    ConnectionClosed,
    /// The server ran out of resource ids.
    IdsExhausted,
    /// The request exceeds the maximum request length.
    RequestTooLarge {
        /// Encoded request length in bytes.
        len: usize,
        /// Maximum accepted length in bytes.
        max: usize,
    },
    /// Any other failure, described by the connection.
    Other(String),
}

impl core::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ConnectionClosed => write!(f, "connection closed"),
            Self::IdsExhausted => write!(f, "resource ids exhausted"),
            Self::RequestTooLarge { len, max } => {
                write!(f, "request of {len} bytes exceeds the maximum of {max}")
            }
            Self::Other(what) => write!(f, "{what}"),
        }
    }
}

impl core::error::Error for RemoteError {}

/// Connection to a server implementing the Render operations the engine uses.
///
/// All methods take `&self`: connections are shared by every font, pen and renderer,
/// and implementations are expected to use interior mutability for their output buffer.
pub trait RenderConnection {
    /// Allocates a fresh resource id.
    fn generate_id(&self) -> Result<ResourceId, RemoteError>;

    /// The largest request the transport accepts, in bytes.
    fn maximum_request_bytes(&self) -> usize;

    /// A drawable (the root window) pixmaps can be created against.
    fn root(&self) -> ResourceId;

    /// Creates a pixmap of the given depth and size.
    fn create_pixmap(
        &self,
        depth: u8,
        pixmap: ResourceId,
        drawable: ResourceId,
        width: u16,
        height: u16,
    ) -> Result<(), RemoteError>;

    /// Frees a pixmap.
    fn free_pixmap(&self, pixmap: ResourceId) -> Result<(), RemoteError>;

    /// Creates a picture for a drawable.
    fn create_picture(
        &self,
        picture: ResourceId,
        drawable: ResourceId,
        format: PictFormat,
        repeat: Repeat,
    ) -> Result<(), RemoteError>;

    /// Frees a picture.
    fn free_picture(&self, picture: ResourceId) -> Result<(), RemoteError>;

    /// Fills rectangles of a picture with a solid color.
    fn fill_rectangles(
        &self,
        op: PictOp,
        dst: ResourceId,
        color: RenderColor,
        rects: &[Rectangle],
    ) -> Result<(), RemoteError>;

    /// Creates a glyph set storing images of the given format.
    fn create_glyph_set(&self, glyph_set: ResourceId, format: PictFormat)
    -> Result<(), RemoteError>;

    /// Frees a glyph set.
    fn free_glyph_set(&self, glyph_set: ResourceId) -> Result<(), RemoteError>;

    /// Adds glyph images to a glyph set.
    ///
    /// `data` holds the images of all glyphs back to back, each with rows padded to four
    /// bytes.
    fn add_glyphs(
        &self,
        glyph_set: ResourceId,
        ids: &[u32],
        infos: &[GlyphInfo],
        data: &[u8],
    ) -> Result<(), RemoteError>;

    /// Composites glyphs onto `dst`, using each glyph image as the mask for `src`.
    fn composite_glyphs(
        &self,
        op: PictOp,
        src: ResourceId,
        dst: ResourceId,
        glyph_set: ResourceId,
        src_x: i16,
        src_y: i16,
        elements: &[GlyphElement],
    ) -> Result<(), RemoteError>;

    /// Composites a rectangle of `src` (optionally masked) onto `dst`.
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
    ) -> Result<(), RemoteError>;
}

/// Fixed part of an `AddGlyphs` request.
const ADD_GLYPHS_HEADER: usize = 12;
/// Per-glyph cost of an `AddGlyphs` request: the id plus a `GLYPHINFO`.
const ADD_GLYPHS_PER_GLYPH: usize = 4 + 12;
/// Fixed part of a `CompositeGlyphs32` request.
const COMPOSITE_GLYPHS_HEADER: usize = 28;
/// Cost of a single-glyph element: element header plus one 32-bit id.
const COMPOSITE_GLYPHS_PER_ELEMENT: usize = 8 + 4;

/// Encoded length of an `AddGlyphs` request carrying `glyphs` glyphs and `data_bytes`
/// bytes of (already padded) image data.
pub const fn add_glyphs_len(glyphs: usize, data_bytes: usize) -> usize {
    ADD_GLYPHS_HEADER + glyphs * ADD_GLYPHS_PER_GLYPH + pad4(data_bytes)
}

/// Encoded length of a `CompositeGlyphs32` request with `elements` single-glyph elements.
pub const fn composite_glyphs_len(elements: usize) -> usize {
    COMPOSITE_GLYPHS_HEADER + elements * COMPOSITE_GLYPHS_PER_ELEMENT
}

/// Largest number of single-glyph elements that fits into a request of `max_bytes`.
pub const fn max_composite_elements(max_bytes: usize) -> usize {
    if max_bytes <= COMPOSITE_GLYPHS_HEADER {
        0
    } else {
        (max_bytes - COMPOSITE_GLYPHS_HEADER) / COMPOSITE_GLYPHS_PER_ELEMENT
    }
}

/// Rounds up to a multiple of four.
pub const fn pad4(len: usize) -> usize {
    (len + 3) & !3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_glyphs_length() {
        assert_eq!(add_glyphs_len(0, 0), 12);
        assert_eq!(add_glyphs_len(1, 16), 12 + 16 + 16);
        assert_eq!(add_glyphs_len(2, 5), 12 + 32 + 8);
    }

    #[test]
    fn composite_glyphs_length() {
        assert_eq!(composite_glyphs_len(1), 40);
        assert_eq!(max_composite_elements(40), 1);
        assert_eq!(max_composite_elements(51), 1);
        assert_eq!(max_composite_elements(52), 2);
        assert_eq!(max_composite_elements(28), 0);
    }

    #[test]
    fn padding() {
        assert_eq!(pad4(0), 0);
        assert_eq!(pad4(1), 4);
        assert_eq!(pad4(4), 4);
        assert_eq!(pad4(13), 16);
    }
}
