// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::cell::{OnceCell, RefCell};
use core::fmt;
use std::path::Path;
use std::rc::Rc;

use crate::error::Error;
use crate::face::{FaceLoader, RasterFace};
use crate::font::{Font, MAX_SUBPIXEL_BITS};
use crate::matcher::{FontMatch, FontMatcher, FontPattern};
use crate::pen::PenPool;
use crate::remote::{ErrorDispatch, ErrorEvent, RenderConnection};
use crate::shape::{ShapeParams, ShapedGlyph, Shaper};

/// Options shared by every font of a [`TextContext`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FontOptions {
    /// Bits of horizontal sub-pixel phase per glyph, at most 6.
    pub subpixel_bits: u8,
    /// Whether outlines are hinted.
    pub hint: bool,
    /// Pattern tried after all requested ones.
    pub default_pattern: String,
    /// Pattern of the font used to draw the replacement character.
    pub fallback_pattern: String,
}

impl Default for FontOptions {
    fn default() -> Self {
        Self {
            subpixel_bits: 2,
            hint: true,
            default_pattern: "sans-serif:pixelsize=14".into(),
            fallback_pattern: "sans-serif".into(),
        }
    }
}

impl FontOptions {
    /// Sets the sub-pixel bits, clamped to 6.
    pub fn with_subpixel_bits(mut self, bits: u8) -> Self {
        self.subpixel_bits = bits.min(MAX_SUBPIXEL_BITS);
        self
    }

    /// Enables or disables hinting.
    pub fn with_hint(mut self, hint: bool) -> Self {
        self.hint = hint;
        self
    }

    /// Sets the default pattern.
    pub fn with_default_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.default_pattern = pattern.into();
        self
    }

    /// Sets the fallback pattern.
    pub fn with_fallback_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.fallback_pattern = pattern.into();
        self
    }
}

/// Shared state of the text engine: the connection, error routing, the pen pool and the
/// font and shaping services.
///
/// Cloning is cheap; clones share everything.
#[derive(Clone)]
pub struct TextContext {
    inner: Rc<Inner>,
}

struct Inner {
    conn: Rc<dyn RenderConnection>,
    errors: ErrorDispatch,
    pens: Rc<PenPool>,
    matcher: RefCell<Box<dyn FontMatcher>>,
    loader: RefCell<Box<dyn FaceLoader>>,
    shaper: RefCell<Box<dyn Shaper>>,
    options: FontOptions,
    fallback: OnceCell<Rc<Font>>,
}

impl TextContext {
    /// Creates a context from its collaborators.
    pub fn new(
        conn: Rc<dyn RenderConnection>,
        matcher: impl FontMatcher + 'static,
        loader: impl FaceLoader + 'static,
        shaper: impl Shaper + 'static,
        options: FontOptions,
    ) -> Self {
        let errors = ErrorDispatch::new();
        let pens = PenPool::new(conn.clone(), errors.clone());
        let options = FontOptions {
            subpixel_bits: options.subpixel_bits.min(MAX_SUBPIXEL_BITS),
            ..options
        };
        Self {
            inner: Rc::new(Inner {
                conn,
                errors,
                pens,
                matcher: RefCell::new(Box::new(matcher)),
                loader: RefCell::new(Box::new(loader)),
                shaper: RefCell::new(Box::new(shaper)),
                options,
                fallback: OnceCell::new(),
            }),
        }
    }

    /// Creates a context over the installed system fonts, shaped with `harfrust` and
    /// rasterized with `swash`.
    #[cfg(feature = "system")]
    pub fn system(conn: Rc<dyn RenderConnection>, options: FontOptions) -> Self {
        Self::new(
            conn,
            crate::matcher::SystemMatcher::new(),
            crate::face::SwashLoader::new(),
            crate::shape::HarfrustShaper::new(),
            options,
        )
    }

    /// The connection all requests go to.
    pub fn connection(&self) -> &Rc<dyn RenderConnection> {
        &self.inner.conn
    }

    /// The error dispatcher resources subscribe to.
    pub fn errors(&self) -> &ErrorDispatch {
        &self.inner.errors
    }

    /// The shared pen pool.
    pub fn pens(&self) -> &Rc<PenPool> {
        &self.inner.pens
    }

    /// The font options.
    pub fn options(&self) -> &FontOptions {
        &self.inner.options
    }

    /// Feeds an asynchronous error from the event loop to the resource it concerns.
    ///
    /// Returns `true` if a font, renderer or pen owned the resource.
    pub fn dispatch_error(&self, event: &ErrorEvent) -> bool {
        self.inner.errors.dispatch(event)
    }

    /// The font used for replacement characters, resolved on first use.
    pub fn fallback_font(&self) -> Result<Rc<Font>, Error> {
        if let Some(font) = self.inner.fallback.get() {
            return Ok(font.clone());
        }
        let font = Rc::new(Font::resolve_str(self, &self.inner.options.fallback_pattern)?);
        Ok(self.inner.fallback.get_or_init(|| font).clone())
    }

    pub(crate) fn match_pattern(&self, pattern: &FontPattern) -> Option<FontMatch> {
        self.inner.matcher.borrow_mut().match_pattern(pattern)
    }

    pub(crate) fn open_face(&self, path: &Path, index: u32) -> Option<Box<dyn RasterFace>> {
        self.inner.loader.borrow_mut().open(path, index)
    }

    pub(crate) fn shape(
        &self,
        font: &Font,
        text: &str,
        params: &ShapeParams<'_>,
    ) -> Vec<ShapedGlyph> {
        let mut shaper = self.inner.shaper.borrow_mut();
        font.with_face(|face| shaper.shape(face, text, params))
    }
}

impl fmt::Debug for TextContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextContext")
            .field("errors", &self.inner.errors)
            .field("pens", &self.inner.pens)
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::FontOptions;

    #[test]
    fn option_builders() {
        let options = FontOptions::default()
            .with_subpixel_bits(9)
            .with_hint(false)
            .with_fallback_pattern("DejaVu Sans");
        assert_eq!(options.subpixel_bits, 6);
        assert!(!options.hint);
        assert_eq!(options.default_pattern, "sans-serif:pixelsize=14");
        assert_eq!(options.fallback_pattern, "DejaVu Sans");
    }
}
