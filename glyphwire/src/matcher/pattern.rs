// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;

use log::debug;

/// Converts points to pixels at 96 dpi.
fn points_to_pixels(points: f32) -> f32 {
    points * 96.0 / 72.0
}

/// Slant of a face.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum Slant {
    /// Upright.
    #[default]
    Roman,
    /// Cursive italic.
    Italic,
    /// Mechanically slanted.
    Oblique,
}

impl Slant {
    /// Parses `roman`, `italic` or `oblique`.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.trim().to_ascii_lowercase().as_str() {
            "roman" | "normal" => Self::Roman,
            "italic" => Self::Italic,
            "oblique" => Self::Oblique,
            _ => return None,
        })
    }
}

/// A font request in fontconfig-like syntax: `family[-points][:key=value]*`.
///
/// Recognized keys are `pixelsize`, `size` (points at 96 dpi), `weight` (a name such as
/// `bold` or a number on the CSS scale) and `slant`. Unknown keys are ignored.
///
/// ```
/// use glyphwire::{FontPattern, Slant};
///
/// let pattern = FontPattern::parse("DejaVu Sans:pixelsize=16:slant=italic").unwrap();
/// assert_eq!(pattern.family, "DejaVu Sans");
/// assert_eq!(pattern.pixel_size, Some(16.0));
/// assert_eq!(pattern.slant, Slant::Italic);
/// ```
#[derive(Clone, PartialEq, Debug, Default)]
pub struct FontPattern {
    /// Requested family name, or a generic family such as `sans-serif`.
    pub family: String,
    /// Requested pixel size; the matcher's default when `None`.
    pub pixel_size: Option<f32>,
    /// Requested weight on the CSS scale (400 regular, 700 bold).
    pub weight: Option<f32>,
    /// Requested slant.
    pub slant: Slant,
}

impl FontPattern {
    /// A pattern naming only a family.
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            ..Self::default()
        }
    }

    /// Sets the pixel size.
    pub fn with_pixel_size(mut self, pixel_size: f32) -> Self {
        self.pixel_size = Some(pixel_size);
        self
    }

    /// Parses a single pattern. Returns `None` if it names no family.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split(':');
        let head = parts.next()?.trim();
        let mut pattern = match head.rsplit_once('-') {
            Some((family, points)) => match points.trim().parse::<f32>() {
                Ok(points) if points > 0.0 => Self {
                    pixel_size: Some(points_to_pixels(points)),
                    ..Self::new(family.trim())
                },
                _ => Self::new(head),
            },
            None => Self::new(head),
        };
        if pattern.family.is_empty() {
            return None;
        }
        for property in parts {
            let Some((key, value)) = property.split_once('=') else {
                debug!("ignoring font pattern property {property:?}");
                continue;
            };
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "pixelsize" => {
                    if let Some(px) = parse_positive(value) {
                        pattern.pixel_size = Some(px);
                    }
                }
                "size" => {
                    if let Some(pt) = parse_positive(value) {
                        pattern.pixel_size = Some(points_to_pixels(pt));
                    }
                }
                "weight" => pattern.weight = parse_weight(value).or(pattern.weight),
                "slant" => pattern.slant = Slant::parse(value).unwrap_or(pattern.slant),
                _ => debug!("ignoring font pattern key {key:?}"),
            }
        }
        Some(pattern)
    }

    /// Parses a comma-separated fallback chain, skipping empty entries.
    pub fn parse_list(s: &str) -> Vec<Self> {
        s.split(',').filter_map(Self::parse).collect()
    }
}

impl fmt::Display for FontPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.family)?;
        if let Some(px) = self.pixel_size {
            write!(f, ":pixelsize={px}")?;
        }
        if let Some(weight) = self.weight {
            write!(f, ":weight={weight}")?;
        }
        match self.slant {
            Slant::Roman => Ok(()),
            Slant::Italic => f.write_str(":slant=italic"),
            Slant::Oblique => f.write_str(":slant=oblique"),
        }
    }
}

fn parse_positive(value: &str) -> Option<f32> {
    value.parse::<f32>().ok().filter(|v| *v > 0.0)
}

fn parse_weight(value: &str) -> Option<f32> {
    Some(match value.to_ascii_lowercase().as_str() {
        "thin" => 100.0,
        "light" => 300.0,
        "regular" | "normal" | "book" => 400.0,
        "medium" => 500.0,
        "demibold" | "semibold" => 600.0,
        "bold" => 700.0,
        "black" | "heavy" => 900.0,
        other => return parse_positive(other),
    })
}
