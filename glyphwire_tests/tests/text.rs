// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shaping, measuring and painting mask text.

use glyphwire::{Direction, GlyphElement, PictFormat, TextOptions};
use glyphwire_dev::{Request, StaticFonts, SyntheticFace};

use crate::util::{BLACK_PIXEL, RED, RED_PIXEL, TestEnv, test_fonts};

const SANS: &str = "Test Sans:pixelsize=10";

fn vertical() -> TextOptions {
    TextOptions {
        direction: Direction::Vertical,
        ..TextOptions::default()
    }
}

#[test]
fn text_size_ends_at_last_ink() {
    let env = TestEnv::new();
    let renderer = env.renderer(SANS, "ab");
    assert_eq!(
        renderer.size(),
        (11, 10),
        "6 pixels of advance plus a glyph 5 pixels wide"
    );
    assert_eq!(renderer.char_count(), 2);
    assert_eq!(renderer.pixel_offset(2), 12);
}

#[test]
fn text_empty_is_one_line_high() {
    let env = TestEnv::new();
    let mut renderer = env.renderer(SANS, "");
    assert_eq!(renderer.size(), (0, 10));
    let dest = env.server.surface(8, 8, PictFormat::Rgb24);
    env.server.clear_log();
    renderer.render(dest, PictFormat::Rgb24, RED, (0, 0)).unwrap();
    assert!(env.server.requests().is_empty(), "nothing to paint");
}

#[test]
fn text_render_paints_at_position() {
    let env = TestEnv::new();
    let mut renderer = env.renderer(SANS, "a");
    let dest = env.server.surface(16, 16, PictFormat::Rgb24);
    renderer.render(dest, PictFormat::Rgb24, RED, (2, 3)).unwrap();

    // The 5x8 box of 'a' sits on the baseline, 8 pixels below the top.
    for y in 0..16 {
        for x in 0..16 {
            let inside = (2..7).contains(&x) && (3..11).contains(&y);
            let expected = if inside { RED_PIXEL } else { BLACK_PIXEL };
            assert_eq!(env.server.pixel(dest, x, y), Some(expected), "pixel ({x}, {y})");
        }
    }
    assert!(env.server.take_errors().is_empty(), "protocol errors");
}

#[test]
fn text_glyph_elements_are_relative() {
    let env = TestEnv::new();
    let mut renderer = env.renderer(SANS, "ab");
    let dest = env.server.surface(16, 16, PictFormat::Rgb24);
    renderer.render(dest, PictFormat::Rgb24, RED, (2, 3)).unwrap();

    let space = renderer.font().id_space();
    let elements: Vec<Vec<GlyphElement>> = env
        .server
        .requests()
        .into_iter()
        .filter_map(|r| match r.request {
            Request::CompositeGlyphs { elements, .. } => Some(elements),
            _ => None,
        })
        .collect();
    assert_eq!(
        elements,
        [[
            GlyphElement {
                dx: 2,
                dy: 11,
                glyph: space.encode(1, 0).0,
            },
            GlyphElement {
                dx: 6,
                dy: 0,
                glyph: space.encode(2, 0).0,
            },
        ]]
    );
}

#[test]
fn text_subpixel_positions_select_variants() {
    let fonts = StaticFonts::new().with_family(
        "Test Narrow",
        SyntheticFace::mask("ab").with_advance('a', 0.625),
    );
    let env = TestEnv::with_fonts(fonts);
    let mut renderer = env.renderer("Test Narrow:pixelsize=10", "aab");
    let dest = env.server.surface(32, 16, PictFormat::Rgb24);
    renderer.render(dest, PictFormat::Rgb24, RED, (0, 0)).unwrap();

    // Pens at 0, 6.25 and 12.5 pixels: phases 0, 1 and 2 of a two-bit index space.
    let uploaded: Vec<u32> = env
        .server
        .requests()
        .into_iter()
        .filter_map(|r| match r.request {
            Request::AddGlyphs { ids, .. } => Some(ids),
            _ => None,
        })
        .flatten()
        .collect();
    assert_eq!(uploaded, [1, (1 << 2) | 1, (2 << 2) | 2]);
}

#[test]
fn text_uploads_each_variant_once() {
    let env = TestEnv::new();
    let mut renderer = env.renderer(SANS, "aaa");
    let dest = env.server.surface(32, 16, PictFormat::Rgb24);
    renderer.render(dest, PictFormat::Rgb24, RED, (0, 0)).unwrap();
    renderer.render(dest, PictFormat::Rgb24, RED, (4, 4)).unwrap();
    assert_eq!(env.server.add_glyphs_count(), 1);
    assert_eq!(env.server.glyph_count(renderer.font().glyph_set()), 1);
    assert_eq!(env.server.composite_glyphs_count(), 2);
}

#[test]
fn text_long_runs_are_split() {
    let env = TestEnv::new();
    let mut renderer = env.renderer(SANS, "abcdefghij");
    let whole = env.server.surface(64, 16, PictFormat::Rgb24);
    renderer.render(whole, PictFormat::Rgb24, RED, (1, 2)).unwrap();

    // Room for 4 glyph elements per request.
    env.server.set_max_request_bytes(76);
    env.server.clear_log();
    let split = env.server.surface(64, 16, PictFormat::Rgb24);
    renderer.render(split, PictFormat::Rgb24, RED, (1, 2)).unwrap();

    let runs: Vec<usize> = env
        .server
        .requests()
        .into_iter()
        .filter_map(|r| match r.request {
            Request::CompositeGlyphs { elements, .. } => Some(elements.len()),
            _ => None,
        })
        .collect();
    assert_eq!(runs, [4, 4, 2]);
    assert_eq!(
        env.server.read(split, 0, 0, 64, 16),
        env.server.read(whole, 0, 0, 64, 16),
        "splitting does not move glyphs"
    );
}

#[test]
fn text_ligature_clusters() {
    let env = TestEnv::new();
    let renderer = env.renderer(SANS, "office");
    assert_eq!(renderer.char_count(), 6);
    assert_eq!(renderer.glyph_length(0), 1);
    assert_eq!(renderer.glyph_length(2), 3, "inside the ffi ligature");
    assert_eq!(renderer.glyph_length(6), 0);
    assert_eq!(renderer.pixel_offset(1), 6);
    assert_eq!(renderer.pixel_offset(3), 6);
    assert_eq!(renderer.pixel_offset(4), 26);
    assert_eq!(renderer.pixel_offset(6), 38);
    assert_eq!(renderer.char_index_at_pixel(15), 1);
    assert_eq!(renderer.char_index_at_pixel(17), 4);
    assert_eq!(renderer.char_index_at_pixel(-3), 0);
    assert_eq!(renderer.char_index_at_pixel(100), 6);
}

#[test]
fn text_vertical_runs_down() {
    let env = TestEnv::new();
    let mut renderer = env.renderer_with(SANS, "ab", vertical());
    assert_eq!(renderer.size(), (20, 18), "two lines of 10 minus the last descent");
    assert_eq!(renderer.pixel_offset(1), 10);
    assert_eq!(renderer.char_index_at_pixel(4), 0);
    assert_eq!(renderer.char_index_at_pixel(6), 1);

    let dest = env.server.surface(24, 24, PictFormat::Rgb24);
    renderer.render(dest, PictFormat::Rgb24, RED, (0, 0)).unwrap();
    assert_eq!(env.server.pixel(dest, 0, 0), Some(RED_PIXEL));
    assert_eq!(env.server.pixel(dest, 0, 9), Some(BLACK_PIXEL));
    assert_eq!(env.server.pixel(dest, 0, 10), Some(RED_PIXEL));
}

#[test]
fn text_empty_vertical_is_one_column_wide() {
    let env = TestEnv::new();
    let renderer = env.renderer_with(SANS, "", vertical());
    assert_eq!(renderer.size(), (20, 0));
}

#[test]
fn text_drops_variation_selectors() {
    let env = TestEnv::new();
    let renderer = env.renderer(SANS, "a\u{FE0F}b");
    assert_eq!(renderer.char_count(), 3);
    assert_eq!(renderer.glyph_length(0), 2, "the selector joins its base");
    assert_eq!(renderer.glyph_length(2), 1);
    assert_eq!(renderer.size(), (11, 10));
    assert_eq!(env.fonts.opened(), 1, "the fallback font is not needed");
}

#[test]
fn text_unrenderable_becomes_replacement_character() {
    let env = TestEnv::new();
    let mut renderer = env.renderer(SANS, "x\u{4E00}y");
    assert_eq!(renderer.glyph_length(0), 3);
    assert_eq!(renderer.glyph_length(1), 3);
    assert_eq!(renderer.size(), (11, 20), "sized by the fallback font");
    assert_eq!(env.fonts.opened(), 2);

    let dest = env.server.surface(24, 24, PictFormat::Rgb24);
    renderer.render(dest, PictFormat::Rgb24, RED, (0, 0)).unwrap();
    let fallback = env.ctx.fallback_font().unwrap();
    let glyph_sets: Vec<u32> = env
        .server
        .requests()
        .into_iter()
        .filter_map(|r| match r.request {
            Request::CompositeGlyphs { glyph_set, .. } => Some(glyph_set),
            _ => None,
        })
        .collect();
    assert_eq!(glyph_sets, [fallback.glyph_set()]);
    assert_eq!(env.server.glyph_count(renderer.font().glyph_set()), 0);
}

#[test]
fn text_set_text_reshapes() {
    let env = TestEnv::with_fonts(test_fonts());
    let mut renderer = env.renderer(SANS, "ab");
    renderer.set_text("abc");
    assert_eq!(renderer.text(), "abc");
    assert_eq!(renderer.size(), (17, 10));
    renderer.set_text("");
    assert_eq!(renderer.size(), (0, 10));
}
