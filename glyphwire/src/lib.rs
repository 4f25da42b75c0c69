// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Glyphwire turns text into cached glyph bitmaps on a remote rendering server and
//! composites them onto remote surfaces.
//!
//! The crate is the text engine of an X11 emoji picker, but nothing in it depends on a
//! particular window system connection. Everything remote goes through the
//! [`RenderConnection`] trait, which mirrors the subset of the X Render extension the
//! engine needs: pixmaps, pictures, solid fills, glyph sets and glyph compositing.
//!
//! The pieces, leaf first:
//!
//! - [`RasterFace`]: a font backend able to map characters, report metrics and rasterize
//!   glyphs. [`SwashFace`] is the real one.
//! - [`GlyphIdSpace`]: packs a glyph index and a horizontal sub-pixel phase into a
//!   [`GlyphVariantId`], the key of the remote glyph cache.
//! - [`Font`]: a resolved face at a pixel size, owning a remote glyph set and the record
//!   of which glyph variants were already uploaded.
//! - [`PenPool`]: shared solid-color source pictures.
//! - [`TextRenderer`]: shapes a string and paints it, either tinted by a pen (mask
//!   glyphs) or through a cached intermediate surface (pre-colored glyphs).
//!
//! All of them hang off a [`TextContext`], which bundles the connection, the error
//! dispatcher, the pen pool and the font/shaping collaborators.
//!
//! ## Features
//!
//! - `system` (enabled by default): Provides [`SystemMatcher`] backed by `fontique`, and
//!   [`TextContext::system`].

// LINEBENDER LINT SET - lib.rs - v3
// See https://linebender.org/wiki/canonical-lints/
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "system")]
pub use fontique;
pub use harfrust;
pub use swash;

mod color;
mod context;
mod error;

pub mod face;
pub mod font;
pub mod matcher;
pub mod pen;
pub mod remote;
pub mod shape;
pub mod text;

pub use color::Color;
pub use context::{FontOptions, TextContext};
pub use error::{Error, ErrorKind};
pub use face::{
    FaceLoader, FaceMetrics, FontData, GlyphContent, RasterFace, RasterGlyph, SwashFace,
    SwashLoader,
};
pub use font::{Font, GlyphIdSpace, GlyphType, GlyphVariantId, UploadStats};
#[cfg(feature = "system")]
pub use matcher::SystemMatcher;
pub use matcher::{FontMatch, FontMatcher, FontPattern, Slant};
pub use pen::{Pen, PenPool};
pub use remote::{
    ErrorDispatch, ErrorEvent, ErrorLatch, GlyphElement, GlyphInfo, PictFormat, PictOp, Rectangle,
    RemoteError, RenderColor, RenderConnection, Repeat, ResourceId, Subscription,
};
pub use shape::{Direction, HarfrustShaper, ShapeParams, ShapedGlyph, Shaper, SimpleShaper};
pub use text::{TextOptions, TextRenderer};
