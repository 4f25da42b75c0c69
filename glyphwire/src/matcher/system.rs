// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use fontique::{
    Collection, CollectionOptions, FamilyInfo, FontStyle, FontWeight, FontWidth, GenericFamily,
    SourceKind,
};
use log::{debug, trace};

use super::{DEFAULT_PIXEL_SIZE, FontMatch, FontMatcher, FontPattern, Slant};

/// A [`FontMatcher`] over the fonts installed on the system, backed by `fontique`.
///
/// Like fontconfig, it never answers "no such family" for a concrete name while any
/// font is installed: unknown families are substituted with the default sans-serif
/// family, and it is up to the caller to reject the substitute.
pub struct SystemMatcher {
    collection: Collection,
}

impl SystemMatcher {
    /// Creates a matcher and scans the system fonts.
    pub fn new() -> Self {
        Self {
            collection: Collection::new(CollectionOptions {
                shared: false,
                system_fonts: true,
            }),
        }
    }

    fn generic(&mut self, generic: GenericFamily) -> Option<FamilyInfo> {
        let id = self.collection.generic_families(generic).next()?;
        self.collection.family(id)
    }

    fn family(&mut self, name: &str) -> Option<FamilyInfo> {
        let generic = match name.trim().to_ascii_lowercase().as_str() {
            "sans" => Some(GenericFamily::SansSerif),
            "mono" => Some(GenericFamily::Monospace),
            lower => GenericFamily::parse(lower),
        };
        if let Some(generic) = generic {
            return self.generic(generic);
        }
        match self.collection.family_by_name(name) {
            Some(family) => Some(family),
            None => {
                trace!("no family named {name:?}, substituting sans-serif");
                self.generic(GenericFamily::SansSerif)
            }
        }
    }
}

impl Default for SystemMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for SystemMatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SystemMatcher").finish_non_exhaustive()
    }
}

impl FontMatcher for SystemMatcher {
    fn match_pattern(&mut self, pattern: &FontPattern) -> Option<FontMatch> {
        let family = self.family(&pattern.family)?;
        let style = match pattern.slant {
            Slant::Roman => FontStyle::Normal,
            Slant::Italic => FontStyle::Italic,
            Slant::Oblique => FontStyle::Oblique(None),
        };
        let weight = pattern.weight.map_or(FontWeight::NORMAL, FontWeight::new);
        let font = family
            .match_font(FontWidth::NORMAL, style, weight, false)
            .or_else(|| family.default_font())?;
        let SourceKind::Path(path) = &font.source().kind else {
            debug!("{}: in-memory fonts are not supported", family.name());
            return None;
        };
        Some(FontMatch {
            family: family.name().to_owned(),
            path: path.to_path_buf(),
            index: font.index(),
            pixel_size: pattern.pixel_size.unwrap_or(DEFAULT_PIXEL_SIZE),
        })
    }
}
