// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Real font files shipped with this crate.

use std::path::{Path, PathBuf};

use glyphwire::matcher::DEFAULT_PIXEL_SIZE;
use glyphwire::{FontMatch, FontMatcher, FontPattern};
use log::debug;

/// The directories that contain the font files.
pub fn font_dirs() -> impl Iterator<Item = PathBuf> {
    [Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/fonts")].into_iter()
}

/// The font families that are available in the assets/fonts directory.
pub const FONT_FAMILIES: &[&str] = &["DejaVu Sans Mono"];

const FONT_FILES: &[(&str, &str)] = &[("DejaVu Sans Mono", "DejaVuSansMono.ttf")];

/// A [`FontMatcher`] over the files in [`font_dirs`].
///
/// Families in [`FONT_FAMILIES`] resolve by case-insensitive name and `monospace`
/// resolves to DejaVu Sans Mono. Pair it with [`SwashLoader`](glyphwire::SwashLoader)
/// to load the faces.
#[derive(Clone, Debug, Default)]
pub struct AssetFonts {
    _private: (),
}

impl AssetFonts {
    /// Creates the matcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the file holding `family`.
    pub fn path(family: &str) -> Option<PathBuf> {
        let (_, file) = FONT_FILES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(family))?;
        font_dirs().map(|dir| dir.join(file)).find(|path| path.is_file())
    }
}

impl FontMatcher for AssetFonts {
    fn match_pattern(&mut self, pattern: &FontPattern) -> Option<FontMatch> {
        let requested = pattern.family.trim();
        let family = if requested.eq_ignore_ascii_case("monospace") {
            FONT_FAMILIES[0]
        } else {
            FONT_FAMILIES
                .iter()
                .copied()
                .find(|name| name.eq_ignore_ascii_case(requested))?
        };
        let Some(path) = Self::path(family) else {
            debug!("{family}: font file is missing");
            return None;
        };
        Some(FontMatch {
            family: family.to_owned(),
            path,
            index: 0,
            pixel_size: pattern.pixel_size.unwrap_or(DEFAULT_PIXEL_SIZE),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AssetFonts, FONT_FAMILIES};
    use glyphwire::{FontMatcher, FontPattern};

    #[test]
    fn every_family_has_a_file() {
        for family in FONT_FAMILIES {
            assert!(AssetFonts::path(family).is_some(), "{family}");
        }
    }

    #[test]
    fn generic_monospace_and_unknown_names() {
        let mut fonts = AssetFonts::new();
        let found = fonts
            .match_pattern(&FontPattern::parse("monospace:pixelsize=16").unwrap())
            .unwrap();
        assert_eq!(found.family, "DejaVu Sans Mono");
        assert_eq!(found.pixel_size, 16.0);
        let unknown = FontPattern::parse("Nope").unwrap();
        assert!(fonts.match_pattern(&unknown).is_none());
    }
}
