// Copyright 2025 the Glyphwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::remote::RemoteError;

/// Error type for font resolution, glyph upload and rendering.
///
/// Carries a non-exhaustive [`ErrorKind`] plus, for remote failures, the
/// [`RemoteError`] reported by the connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    remote: Option<RemoteError>,
    detail: Option<String>,
}

impl Error {
    /// The machine-readable category for this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The connection error behind an [`ErrorKind::Remote`] error.
    pub fn remote(&self) -> Option<&RemoteError> {
        self.remote.as_ref()
    }

    pub(crate) fn no_matching_font(patterns: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::NoMatchingFont,
            remote: None,
            detail: Some(patterns.into()),
        }
    }

    pub(crate) fn unsupported_face() -> Self {
        Self {
            kind: ErrorKind::UnsupportedFace,
            remote: None,
            detail: None,
        }
    }

    pub(crate) fn latched() -> Self {
        Self {
            kind: ErrorKind::Latched,
            remote: None,
            detail: None,
        }
    }
}

impl From<RemoteError> for Error {
    fn from(err: RemoteError) -> Self {
        Self {
            kind: ErrorKind::Remote,
            remote: Some(err),
            detail: None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.kind {
            ErrorKind::NoMatchingFont => match &self.detail {
                Some(patterns) => write!(f, "no font matches any of: {patterns}"),
                None => write!(f, "no matching font"),
            },
            ErrorKind::UnsupportedFace => {
                write!(f, "operation not supported by this kind of face")
            }
            ErrorKind::Remote => match &self.remote {
                Some(err) => write!(f, "remote request failed: {err}"),
                None => write!(f, "remote request failed"),
            },
            ErrorKind::Latched => write!(f, "resource has a latched remote failure"),
        }
    }
}

impl core::error::Error for Error {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        self.remote
            .as_ref()
            .map(|err| err as &(dyn core::error::Error + 'static))
    }
}

/// The non-exhaustive category of an error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// No font pattern, including the default, produced a match of the requested family.
    NoMatchingFont,

    /// Sub-pixel glyph variants were requested from a fixed-size face, raw glyphs from a
    /// scalable one, or the face has neither outlines nor bitmap strikes.
    UnsupportedFace,

    /// The connection refused or failed to send a request.
    Remote,

    /// The resource already failed remotely; nothing was sent.
    Latched,
}
