// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! This crate contains the integration test suite for `glyphwire`.
//!
//! - The `backends` module drives the real `swash`, `harfrust` and `fontique` backends with
//!   the font files shipped in `glyphwire_dev`.
//! - The `util` module sets up a [`TextContext`](glyphwire::TextContext) over
//!   `glyphwire_dev`'s mock server and synthetic fonts, and holds shared helpers.
//! - We do not use the default Rust test harness, but instead use this `mod.rs` file as the
//!   entry point to run all other tests, which makes shared helpers easy to reach.
//! - Put new tests into the module of their topic and start the test name with the topic,
//!   e.g. `pen_unused_entry_is_recolored` rather than `unused_pen_entry_is_recolored`.

#![allow(missing_docs, reason = "we don't need docs for testing")]
#![allow(clippy::cast_possible_truncation, reason = "not critical for testing")]

mod color;
mod pen;
mod selection;
mod text;
mod util;
