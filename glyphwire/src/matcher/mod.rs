// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Font requests and the matching service that turns them into font files.

mod pattern;
#[cfg(feature = "system")]
mod system;

use std::path::PathBuf;

pub use pattern::{FontPattern, Slant};
#[cfg(feature = "system")]
pub use system::SystemMatcher;

/// Pixel size used when a pattern does not request one.
pub const DEFAULT_PIXEL_SIZE: f32 = 14.0;

/// Generic family names. A match for one of these is a substitute by definition.
const GENERIC_FAMILIES: &[&str] = &[
    "serif",
    "sans-serif",
    "sans",
    "monospace",
    "mono",
    "cursive",
    "fantasy",
    "system-ui",
    "ui-serif",
    "ui-sans-serif",
    "ui-monospace",
    "ui-rounded",
    "emoji",
    "math",
    "fangsong",
];

/// Whether `family` names a generic family rather than a concrete one.
pub fn is_generic_family(family: &str) -> bool {
    GENERIC_FAMILIES
        .iter()
        .any(|generic| generic.eq_ignore_ascii_case(family.trim()))
}

/// The answer of a [`FontMatcher`].
#[derive(Clone, PartialEq, Debug)]
pub struct FontMatch {
    /// Family of the matched face, which may differ from the requested one.
    pub family: String,
    /// Font file holding the face.
    pub path: PathBuf,
    /// Face index within the file.
    pub index: u32,
    /// Pixel size to open the face at.
    pub pixel_size: f32,
}

/// A font-matching service.
pub trait FontMatcher {
    /// Finds the best available face for `pattern`.
    ///
    /// Matchers may substitute an unrelated family; callers verify
    /// [`FontMatch::family`] themselves.
    fn match_pattern(&mut self, pattern: &FontPattern) -> Option<FontMatch>;
}

#[cfg(test)]
mod tests {
    use super::is_generic_family;

    #[test]
    fn generic_families() {
        assert!(is_generic_family("sans-serif"));
        assert!(is_generic_family("Monospace"));
        assert!(is_generic_family(" emoji "));
        assert!(!is_generic_family("Noto Sans"));
    }
}
