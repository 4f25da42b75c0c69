// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Glyphwire Dev
//!
//! This crate provides utilities for developing and testing glyphwire without a display
//! or installed fonts:
//!
//! - [`MockServer`]: an in-memory Render server that records requests and draws pixels.
//! - [`SyntheticFace`]: a rasterizer face with generated glyph images.
//! - [`StaticFonts`]: a font matcher and face loader over a fixed set of synthetic faces.
//! - [`LigatureShaper`]: a deterministic shaper with configurable ligatures.
//! - [`AssetFonts`]: a font matcher over the real font files in [`font_dirs`].

mod assets;
mod face;
mod fonts;
pub mod server;
mod shaper;

pub use assets::{AssetFonts, FONT_FAMILIES, font_dirs};
pub use face::SyntheticFace;
pub use fonts::StaticFonts;
pub use server::{MockServer, RecordedRequest, Request, StoredGlyph};
pub use shaper::LigatureShaper;
