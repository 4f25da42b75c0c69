// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Utility functions and types shared across tests.

use std::rc::Rc;

use glyphwire::{
    Color, Font, FontOptions, RenderConnection, ResourceId, TextContext, TextOptions,
    TextRenderer,
};
use glyphwire_dev::{LigatureShaper, MockServer, Request, StaticFonts, SyntheticFace};

/// Characters of the mask test face, in glyph order starting at glyph 1.
pub(crate) const LATIN: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 .,\u{FB03}";

pub(crate) const RED_CIRCLE: char = '\u{1F534}';
pub(crate) const GREEN_CIRCLE: char = '\u{1F7E2}';

pub(crate) const RED: Color = Color(0xff00_00ff);
pub(crate) const GREEN: Color = Color(0x00ff_00ff);
pub(crate) const BLUE: Color = Color(0x0000_ffff);

/// Opaque red as stored by the server: premultiplied `0xAARRGGBB`.
pub(crate) const RED_PIXEL: u32 = 0xffff_0000;
pub(crate) const GREEN_PIXEL: u32 = 0xff00_ff00;
/// An untouched pixel of an `Rgb24` picture.
pub(crate) const BLACK_PIXEL: u32 = 0xff00_0000;

/// The fonts every test environment starts with.
///
/// - "Test Sans": mask glyphs for [`LATIN`], 200 glyphs, the "ffi" ligature 2 ems wide.
/// - "Test Emoji": a red and a green circle.
/// - "Test Bitmap Emoji": a red circle with 16 and 32 pixel strikes only.
/// - "Test Fallback": just U+FFFD.
///
/// `sans-serif` resolves to "Test Sans" and `emoji` to "Test Emoji".
pub(crate) fn test_fonts() -> StaticFonts {
    let circles = [(RED_CIRCLE, 0xff00_00ff), (GREEN_CIRCLE, 0x00ff_00ff)];
    StaticFonts::new()
        .with_family(
            "Test Sans",
            SyntheticFace::mask(LATIN)
                .with_advance('\u{FB03}', 2.0)
                .with_glyph_count(200),
        )
        .with_family("Test Emoji", SyntheticFace::color(&circles))
        .with_family(
            "Test Bitmap Emoji",
            SyntheticFace::color(&circles[..1]).with_fixed_sizes(&[16, 32]),
        )
        .with_family("Test Fallback", SyntheticFace::mask("\u{FFFD}"))
        .with_alias("sans-serif", "Test Sans")
        .with_alias("emoji", "Test Emoji")
}

/// A context over a fresh [`MockServer`].
pub(crate) struct TestEnv {
    pub(crate) server: Rc<MockServer>,
    pub(crate) fonts: StaticFonts,
    pub(crate) ctx: TextContext,
}

impl TestEnv {
    pub(crate) fn new() -> Self {
        Self::with_fonts(test_fonts())
    }

    pub(crate) fn with_fonts(fonts: StaticFonts) -> Self {
        let server = Rc::new(MockServer::new());
        let conn: Rc<dyn RenderConnection> = server.clone();
        let shaper = LigatureShaper::new().with_ligature("ffi", '\u{FB03}');
        let options = FontOptions::default().with_fallback_pattern("Test Fallback:pixelsize=20");
        let ctx = TextContext::new(conn, fonts.clone(), fonts.clone(), shaper, options);
        Self { server, fonts, ctx }
    }

    pub(crate) fn font(&self, patterns: &str) -> Rc<Font> {
        Rc::new(Font::resolve_str(&self.ctx, patterns).unwrap())
    }

    pub(crate) fn renderer(&self, patterns: &str, text: &str) -> TextRenderer {
        self.renderer_with(patterns, text, TextOptions::default())
    }

    pub(crate) fn renderer_with(
        &self,
        patterns: &str,
        text: &str,
        options: TextOptions,
    ) -> TextRenderer {
        let mut renderer = TextRenderer::new(&self.ctx, self.font(patterns), options);
        renderer.set_text(text);
        renderer
    }

    /// Reports a server-side failure of `resource` to the context.
    pub(crate) fn fail_resource(&self, resource: ResourceId) -> bool {
        self.ctx.dispatch_error(&self.server.inject_error(resource))
    }
}

/// Source pictures of the recorded `CompositeGlyphs` requests.
pub(crate) fn glyph_sources(server: &MockServer) -> Vec<ResourceId> {
    server
        .requests()
        .into_iter()
        .filter_map(|r| match r.request {
            Request::CompositeGlyphs { src, .. } => Some(src),
            _ => None,
        })
        .collect()
}

/// Source pictures of the recorded `Composite` requests.
pub(crate) fn composite_sources(server: &MockServer) -> Vec<ResourceId> {
    server
        .requests()
        .into_iter()
        .filter_map(|r| match r.request {
            Request::Composite { src, .. } => Some(src),
            _ => None,
        })
        .collect()
}
