// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A fixed set of synthetic fonts standing in for the system font service.

use core::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use glyphwire::matcher::DEFAULT_PIXEL_SIZE;
use glyphwire::{FaceLoader, FontMatch, FontMatcher, FontPattern, RasterFace};
use log::debug;

use crate::face::SyntheticFace;

#[derive(Clone, Debug)]
struct Entry {
    family: String,
    path: PathBuf,
    face: SyntheticFace,
}

#[derive(Clone, Debug, Default)]
struct Inner {
    entries: Vec<Entry>,
    aliases: Vec<(String, String)>,
    substitute: Option<String>,
    opened: Cell<usize>,
}

/// Synthetic families answering both as a [`FontMatcher`] and a [`FaceLoader`].
///
/// Families resolve by case-insensitive name, then through aliases (typically generic
/// names like `sans-serif`). Like fontconfig, an unknown family can be answered with a
/// substitute, which callers are expected to reject.
///
/// Cloning is cheap; hand one clone to the context as matcher and another as loader.
#[derive(Clone, Debug, Default)]
pub struct StaticFonts {
    inner: Rc<Inner>,
}

impl StaticFonts {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    fn inner_mut(&mut self) -> &mut Inner {
        Rc::make_mut(&mut self.inner)
    }

    /// Adds `face` as `family`.
    pub fn with_family(mut self, family: &str, face: SyntheticFace) -> Self {
        let path = PathBuf::from(format!("/synthetic/{}.ttf", family.replace(' ', "")));
        self.inner_mut().entries.push(Entry {
            family: family.to_owned(),
            path,
            face,
        });
        self
    }

    /// Resolves requests for `alias` to `family`.
    pub fn with_alias(mut self, alias: &str, family: &str) -> Self {
        self.inner_mut()
            .aliases
            .push((alias.to_owned(), family.to_owned()));
        self
    }

    /// Answers requests for unknown families with `family`.
    pub fn with_substitute(mut self, family: &str) -> Self {
        self.inner_mut().substitute = Some(family.to_owned());
        self
    }

    /// Number of faces opened through the loader so far.
    pub fn opened(&self) -> usize {
        self.inner.opened.get()
    }

    fn entry(&self, family: &str) -> Option<&Entry> {
        self.inner
            .entries
            .iter()
            .find(|e| e.family.eq_ignore_ascii_case(family))
    }
}

impl FontMatcher for StaticFonts {
    fn match_pattern(&mut self, pattern: &FontPattern) -> Option<FontMatch> {
        let requested = pattern.family.trim();
        let entry = self.entry(requested).or_else(|| {
            let (_, target) = self
                .inner
                .aliases
                .iter()
                .find(|(alias, _)| alias.eq_ignore_ascii_case(requested))?;
            self.entry(target)
        });
        let entry = match entry {
            Some(entry) => entry,
            None => {
                let substitute = self.inner.substitute.as_deref()?;
                debug!("{requested:?} is unknown, substituting {substitute:?}");
                self.entry(substitute)?
            }
        };
        Some(FontMatch {
            family: entry.family.clone(),
            path: entry.path.clone(),
            index: 0,
            pixel_size: pattern.pixel_size.unwrap_or(DEFAULT_PIXEL_SIZE),
        })
    }
}

impl FaceLoader for StaticFonts {
    fn open(&mut self, path: &Path, index: u32) -> Option<Box<dyn RasterFace>> {
        if index != 0 {
            return None;
        }
        let entry = self.inner.entries.iter().find(|e| e.path == path)?;
        self.inner.opened.set(self.inner.opened.get() + 1);
        Some(Box::new(entry.face.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::StaticFonts;
    use crate::SyntheticFace;
    use glyphwire::{FaceLoader, FontMatcher, FontPattern};

    fn fonts() -> StaticFonts {
        StaticFonts::new()
            .with_family("Test Sans", SyntheticFace::mask("abc"))
            .with_family("Test Emoji", SyntheticFace::color(&[('R', 0xff00_00ff)]))
            .with_alias("sans-serif", "Test Sans")
    }

    #[test]
    fn names_and_aliases() {
        let mut fonts = fonts();
        let found = fonts.match_pattern(&FontPattern::new("test emoji")).unwrap();
        assert_eq!(found.family, "Test Emoji");
        assert_eq!(found.pixel_size, 14.0);
        let sized = FontPattern::new("sans-serif").with_pixel_size(20.0);
        let found = fonts.match_pattern(&sized).unwrap();
        assert_eq!((found.family.as_str(), found.pixel_size), ("Test Sans", 20.0));
        assert!(fonts.match_pattern(&FontPattern::new("Nope")).is_none());
    }

    #[test]
    fn substitutes_unknown_families() {
        let mut fonts = fonts().with_substitute("Test Sans");
        let found = fonts.match_pattern(&FontPattern::new("Nope")).unwrap();
        assert_eq!(found.family, "Test Sans");
    }

    #[test]
    fn loads_by_path() {
        let mut fonts = fonts();
        let found = fonts.match_pattern(&FontPattern::new("Test Emoji")).unwrap();
        let face = fonts.open(&found.path, 0).unwrap();
        assert!(face.has_color());
        assert!(fonts.open(&found.path, 1).is_none());
        assert_eq!(fonts.opened(), 1);
    }
}
