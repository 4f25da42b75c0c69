// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pre-colored glyphs painted through the renderer's intermediate picture.

use glyphwire::{PictFormat, Repeat};
use glyphwire_dev::{Request, SyntheticFace};

use crate::util::{
    BLACK_PIXEL, GREEN, GREEN_CIRCLE, GREEN_PIXEL, RED, RED_CIRCLE, RED_PIXEL, TestEnv,
    composite_sources, glyph_sources, test_fonts,
};

const EMOJI: &str = "Test Emoji:pixelsize=20";

/// Pictures created for intermediates: `Argb32` and not repeating.
fn intermediates(env: &TestEnv) -> Vec<u32> {
    env.server
        .requests()
        .into_iter()
        .filter_map(|r| match r.request {
            Request::CreatePicture {
                picture,
                format: PictFormat::Argb32,
                repeat: Repeat::None,
                ..
            } => Some(picture),
            _ => None,
        })
        .collect()
}

fn red_circle() -> String {
    RED_CIRCLE.to_string()
}

#[test]
fn color_glyph_is_painted_in_its_own_colors() {
    let env = TestEnv::new();
    let mut renderer = env.renderer(EMOJI, &red_circle());
    assert_eq!(renderer.size(), (16, 20));
    let dest = env.server.surface(32, 32, PictFormat::Rgb24);
    renderer
        .render(dest, PictFormat::Rgb24, GREEN, (5, 5))
        .unwrap();

    // A 16 pixel square from the top of the line; the requested color is ignored.
    assert_eq!(env.server.pixel(dest, 5, 5), Some(RED_PIXEL));
    assert_eq!(env.server.pixel(dest, 20, 20), Some(RED_PIXEL));
    assert_eq!(env.server.pixel(dest, 21, 5), Some(BLACK_PIXEL));
    assert_eq!(env.server.pixel(dest, 5, 21), Some(BLACK_PIXEL));
    assert_eq!(env.server.pixel(dest, 4, 5), Some(BLACK_PIXEL));
    assert!(env.server.take_errors().is_empty(), "protocol errors");
}

#[test]
fn color_intermediate_matches_text_size() {
    let env = TestEnv::new();
    let mut renderer = env.renderer(EMOJI, &red_circle());
    let dest = env.server.surface(32, 32, PictFormat::Rgb24);
    renderer.render(dest, PictFormat::Rgb24, RED, (0, 0)).unwrap();

    let intermediate = intermediates(&env);
    assert_eq!(intermediate.len(), 1);
    assert_eq!(env.server.picture_size(intermediate[0]), Some((16, 20)));
    assert_eq!(composite_sources(&env.server), intermediate);
    assert_eq!(env.server.pixel(intermediate[0], 0, 0), Some(RED_PIXEL));
    assert_eq!(
        env.server.pixel(intermediate[0], 0, 17),
        Some(0),
        "below the glyph stays transparent"
    );
}

#[test]
fn color_ink_outside_the_line_box_is_kept() {
    let face = SyntheticFace::color(&[(RED_CIRCLE, 0xff00_00ff)]).with_overhang(RED_CIRCLE, 3, 2);
    let env = TestEnv::with_fonts(test_fonts().with_family("Test Overhang", face));
    let mut renderer = env.renderer("Test Overhang:pixelsize=20", &red_circle());
    assert_eq!(renderer.size(), (13, 20));
    let dest = env.server.surface(32, 32, PictFormat::Rgb24);
    renderer.render(dest, PictFormat::Rgb24, GREEN, (5, 5)).unwrap();

    let intermediate = intermediates(&env);
    assert_eq!(env.server.picture_size(intermediate[0]), Some((16, 22)));
    // The 16 pixel square starts 3 pixels left of and 2 pixels above the text.
    assert_eq!(env.server.pixel(dest, 2, 3), Some(RED_PIXEL));
    assert_eq!(env.server.pixel(dest, 17, 18), Some(RED_PIXEL));
    assert_eq!(env.server.pixel(dest, 1, 3), Some(BLACK_PIXEL));
    assert_eq!(env.server.pixel(dest, 2, 2), Some(BLACK_PIXEL));
    assert_eq!(env.server.pixel(dest, 18, 5), Some(BLACK_PIXEL));
    assert!(env.server.take_errors().is_empty(), "protocol errors");
}

#[test]
fn color_intermediate_is_reused_across_positions() {
    let env = TestEnv::new();
    let mut renderer = env.renderer(EMOJI, &red_circle());
    let dest = env.server.surface(64, 32, PictFormat::Rgb24);
    renderer.render(dest, PictFormat::Rgb24, RED, (0, 0)).unwrap();
    renderer.render(dest, PictFormat::Rgb24, RED, (30, 4)).unwrap();

    assert_eq!(env.server.composite_glyphs_count(), 1, "painted once");
    assert_eq!(env.server.composite_count(), 2);
    assert_eq!(
        env.server.read(dest, 0, 0, 16, 16),
        env.server.read(dest, 30, 4, 16, 16),
        "both copies are identical"
    );
}

#[test]
fn color_glyphs_keep_their_own_colors() {
    let env = TestEnv::new();
    let text: String = [RED_CIRCLE, GREEN_CIRCLE].iter().collect();
    let mut renderer = env.renderer(EMOJI, &text);
    assert_eq!(renderer.size(), (28, 20), "second circle at 12 pixels");
    let dest = env.server.surface(32, 32, PictFormat::Rgb24);
    renderer.render(dest, PictFormat::Rgb24, RED, (0, 0)).unwrap();

    assert_eq!(env.server.pixel(dest, 0, 0), Some(RED_PIXEL));
    assert_eq!(env.server.pixel(dest, 27, 0), Some(GREEN_PIXEL));
}

#[test]
fn color_layout_does_not_depend_on_color() {
    let env = TestEnv::new();
    let paint = |ch: char| {
        let mut renderer = env.renderer(EMOJI, &ch.to_string());
        let dest = env.server.surface(24, 24, PictFormat::Rgb24);
        renderer.render(dest, PictFormat::Rgb24, RED, (2, 2)).unwrap();
        env.server
            .read(dest, 0, 0, 24, 24)
            .into_iter()
            .map(|px| px != BLACK_PIXEL)
            .collect::<Vec<bool>>()
    };
    assert_eq!(paint(RED_CIRCLE), paint(GREEN_CIRCLE));
}

#[test]
fn color_set_text_rebuilds_intermediate() {
    let env = TestEnv::new();
    let mut renderer = env.renderer(EMOJI, &red_circle());
    let dest = env.server.surface(32, 32, PictFormat::Rgb24);
    renderer.render(dest, PictFormat::Rgb24, RED, (0, 0)).unwrap();
    let pictures = env.server.live_pictures();

    renderer.set_text(&GREEN_CIRCLE.to_string());
    renderer.render(dest, PictFormat::Rgb24, RED, (0, 0)).unwrap();

    assert_eq!(env.server.composite_glyphs_count(), 2);
    assert_eq!(intermediates(&env).len(), 2);
    assert_eq!(env.server.live_pictures(), pictures, "the old one is freed");
    assert_eq!(env.server.pixel(dest, 0, 0), Some(GREEN_PIXEL));
}

#[test]
fn color_glyphs_use_a_white_pen() {
    let env = TestEnv::new();
    let mut renderer = env.renderer(EMOJI, &red_circle());
    let dest = env.server.surface(32, 32, PictFormat::Rgb24);
    renderer.render(dest, PictFormat::Rgb24, RED, (0, 0)).unwrap();

    let pen = glyph_sources(&env.server)[0];
    assert_eq!(env.server.pixel(pen, 0, 0), Some(u32::MAX));
}

#[test]
fn color_fixed_size_uploads_raw_indices() {
    let env = TestEnv::new();
    let mut renderer = env.renderer("Test Bitmap Emoji:pixelsize=30", &red_circle());
    assert_eq!(renderer.font().pixel_size(), 32.0);
    let dest = env.server.surface(40, 40, PictFormat::Rgb24);
    renderer.render(dest, PictFormat::Rgb24, RED, (0, 0)).unwrap();

    let uploaded: Vec<Vec<u32>> = env
        .server
        .requests()
        .into_iter()
        .filter_map(|r| match r.request {
            Request::AddGlyphs { ids, .. } => Some(ids),
            _ => None,
        })
        .collect();
    assert_eq!(uploaded, [[1]]);
    assert_eq!(env.server.pixel(dest, 0, 0), Some(RED_PIXEL));
}
