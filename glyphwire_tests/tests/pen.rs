// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The shared pen pool.

use glyphwire::PictFormat;

use crate::util::{GREEN, GREEN_PIXEL, RED, TestEnv};

#[test]
fn pen_same_color_is_shared() {
    let env = TestEnv::new();
    let pens = env.ctx.pens();
    let first = pens.pen(PictFormat::Argb32, RED).unwrap();
    let second = pens.pen(PictFormat::Argb32, RED).unwrap();
    assert_eq!(first.picture(), second.picture());
    assert_eq!(pens.len(), 1);
    assert_eq!(pens.live(), 1);
    assert_eq!(env.server.create_picture_count(), 1);
}

#[test]
fn pen_picture_repeats_one_pixel() {
    let env = TestEnv::new();
    let pen = env.ctx.pens().pen(PictFormat::Argb32, RED).unwrap();
    assert_eq!(env.server.picture_size(pen.picture()), Some((1, 1)));
    assert_eq!(env.server.pixel(pen.picture(), 0, 0), Some(0xffff_0000));
    assert_eq!((pen.color(), pen.format()), (RED, PictFormat::Argb32));
}

#[test]
fn pen_unused_entry_is_recolored() {
    let env = TestEnv::new();
    let pens = env.ctx.pens();
    let red = pens.pen(PictFormat::Rgb24, RED).unwrap();
    let picture = red.picture();
    drop(red);
    assert_eq!(pens.live(), 0);

    let green = pens.pen(PictFormat::Rgb24, GREEN).unwrap();
    assert_eq!(green.picture(), picture);
    assert_eq!(pens.len(), 1);
    assert_eq!(env.server.pixel(picture, 0, 0), Some(GREEN_PIXEL));
    assert_eq!(env.server.create_picture_count(), 1);
}

#[test]
fn pen_configure_reuses_its_entry() {
    let env = TestEnv::new();
    let mut pen = env.ctx.pens().pen(PictFormat::Argb32, RED).unwrap();
    let picture = pen.picture();
    pen.configure(GREEN).unwrap();
    assert_eq!(pen.picture(), picture);
    assert_eq!(pen.color(), GREEN);
    assert_eq!(env.ctx.pens().len(), 1);

    env.server.clear_log();
    pen.configure(GREEN).unwrap();
    assert!(env.server.requests().is_empty(), "same color sends nothing");
}

#[test]
fn pen_configure_leaves_shared_entry_alone() {
    let env = TestEnv::new();
    let pens = env.ctx.pens();
    let red = pens.pen(PictFormat::Argb32, RED).unwrap();
    let mut other = pens.pen(PictFormat::Argb32, RED).unwrap();
    other.configure(GREEN).unwrap();
    assert_ne!(other.picture(), red.picture());
    assert_eq!(red.color(), RED);
    assert_eq!(env.server.pixel(red.picture(), 0, 0), Some(0xffff_0000));
    assert_eq!(pens.len(), 2);
}

#[test]
fn pen_formats_are_kept_apart() {
    let env = TestEnv::new();
    let pens = env.ctx.pens();
    let a8 = pens.pen(PictFormat::A8, RED).unwrap();
    let argb = pens.pen(PictFormat::Argb32, RED).unwrap();
    assert_ne!(a8.picture(), argb.picture());
    drop(a8);
    let rgb = pens.pen(PictFormat::Rgb24, GREEN).unwrap();
    assert_eq!(pens.len(), 3, "an unused A8 entry is not recolored for Rgb24");
    assert_eq!(rgb.format(), PictFormat::Rgb24);
    assert!(env.server.take_errors().is_empty(), "protocol errors");
}

#[test]
fn pen_failed_entry_is_not_reused() {
    let env = TestEnv::new();
    let pens = env.ctx.pens();
    let red = pens.pen(PictFormat::Argb32, RED).unwrap();
    let failed = red.picture();
    assert!(env.fail_resource(failed));
    assert!(red.is_failed());
    drop(red);

    let again = pens.pen(PictFormat::Argb32, RED).unwrap();
    assert_ne!(again.picture(), failed);
    let green = pens.pen(PictFormat::Argb32, GREEN).unwrap();
    assert_ne!(green.picture(), failed, "a failed entry is not recolored either");
    assert_eq!(pens.len(), 3);
}

#[test]
fn pen_pool_drop_frees_pictures() {
    let TestEnv { server, ctx, .. } = TestEnv::new();
    {
        let pens = ctx.pens();
        let _red = pens.pen(PictFormat::Argb32, RED).unwrap();
        let _green = pens.pen(PictFormat::Rgb24, GREEN).unwrap();
    }
    assert_eq!(server.live_pictures(), 2);
    assert_eq!(server.live_pixmaps(), 2);
    drop(ctx);
    assert_eq!(server.live_pictures(), 0);
    assert_eq!(server.live_pixmaps(), 0);
    assert!(server.take_errors().is_empty(), "protocol errors");
}
