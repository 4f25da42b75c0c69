// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Painting text with a selected range in a second color.

use glyphwire::PictFormat;

use crate::util::{
    BLUE, GREEN, GREEN_PIXEL, RED, RED_CIRCLE, RED_PIXEL, TestEnv, glyph_sources,
};

const SANS: &str = "Test Sans:pixelsize=10";

#[test]
fn selection_is_painted_in_its_own_color() {
    let env = TestEnv::new();
    let mut renderer = env.renderer(SANS, "HELLO");
    let dest = env.server.surface(40, 10, PictFormat::Rgb24);
    renderer
        .render_selected(dest, PictFormat::Rgb24, RED, GREEN, 1..3, (0, 0))
        .unwrap();

    assert_eq!(env.server.composite_glyphs_count(), 3, "before, inside and after");
    assert_eq!(env.ctx.pens().len(), 2);
    let colors: Vec<_> = [0, 6, 12, 18, 24]
        .into_iter()
        .map(|x| env.server.pixel(dest, x, 0))
        .collect();
    assert_eq!(
        colors,
        [
            Some(RED_PIXEL),
            Some(GREEN_PIXEL),
            Some(GREEN_PIXEL),
            Some(RED_PIXEL),
            Some(RED_PIXEL),
        ]
    );
}

#[test]
fn selection_at_the_edges_skips_empty_ranges() {
    let env = TestEnv::new();
    let mut renderer = env.renderer(SANS, "HELLO");
    let dest = env.server.surface(40, 10, PictFormat::Rgb24);
    renderer
        .render_selected(dest, PictFormat::Rgb24, RED, GREEN, 0..5, (0, 0))
        .unwrap();
    assert_eq!(env.server.composite_glyphs_count(), 1);
    assert_eq!(env.server.pixel(dest, 24, 0), Some(GREEN_PIXEL));

    env.server.clear_log();
    renderer
        .render_selected(dest, PictFormat::Rgb24, RED, GREEN, 3..9, (0, 0))
        .unwrap();
    assert_eq!(env.server.composite_glyphs_count(), 2);
}

#[test]
fn selection_recolors_its_pen() {
    let env = TestEnv::new();
    let mut renderer = env.renderer(SANS, "HELLO");
    let dest = env.server.surface(40, 10, PictFormat::Rgb24);
    renderer
        .render_selected(dest, PictFormat::Rgb24, RED, GREEN, 1..3, (0, 0))
        .unwrap();
    let pens = glyph_sources(&env.server);
    assert_eq!(pens[0], pens[2], "both unselected ranges share a pen");
    assert_ne!(pens[0], pens[1]);

    env.server.clear_log();
    renderer
        .render_selected(dest, PictFormat::Rgb24, RED, BLUE, 1..3, (0, 0))
        .unwrap();
    assert_eq!(
        env.server.create_picture_count(),
        0,
        "the unused green entry is repainted"
    );
    assert_eq!(glyph_sources(&env.server), pens);
    assert_eq!(env.server.pixel(dest, 6, 0), Some(0xff00_00ff));
}

#[test]
fn selection_inside_a_ligature_selects_nothing() {
    let env = TestEnv::new();
    let mut renderer = env.renderer(SANS, "office");
    let dest = env.server.surface(40, 10, PictFormat::Rgb24);
    renderer
        .render_selected(dest, PictFormat::Rgb24, RED, GREEN, 2..3, (0, 0))
        .unwrap();
    assert_eq!(env.server.composite_glyphs_count(), 2);
    assert_eq!(env.ctx.pens().len(), 1);
    assert_eq!(env.server.pixel(dest, 6, 0), Some(RED_PIXEL));
}

#[test]
fn selection_of_color_text_is_ignored() {
    let env = TestEnv::new();
    let mut renderer = env.renderer("Test Emoji:pixelsize=20", &RED_CIRCLE.to_string());
    let dest = env.server.surface(32, 32, PictFormat::Rgb24);
    renderer
        .render_selected(dest, PictFormat::Rgb24, GREEN, BLUE, 0..1, (0, 0))
        .unwrap();
    assert_eq!(env.server.composite_glyphs_count(), 1);
    assert_eq!(env.server.composite_count(), 1);
    assert_eq!(env.server.pixel(dest, 0, 0), Some(RED_PIXEL));
}
