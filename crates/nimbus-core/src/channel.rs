//! Canonical channel specifiers.
//!
//! A [`ChannelSpec`] is the normalized form of the channel argument every
//! event carries: names are trimmed, blanks dropped, and multiple names
//! joined with `,`. Construction fails rather than producing a blank
//! specifier, so an event holding a `ChannelSpec` is always addressable.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::EventError;
use crate::query::encode_component;

/// A canonicalized channel specifier (one name, or several joined by `,`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelSpec(String);

impl ChannelSpec {
    /// Normalize a single channel name.
    pub fn new(name: impl AsRef<str>) -> Result<Self, EventError> {
        Self::from_names([name])
    }

    /// Normalize a list of channel names into one specifier.
    ///
    /// Names are trimmed and blank entries dropped; an empty result is
    /// rejected with [`EventError::BlankChannel`].
    pub fn from_names<I, S>(names: I) -> Result<Self, EventError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = names
            .into_iter()
            .filter_map(|name| {
                let trimmed = name.as_ref().trim().to_owned();
                (!trimmed.is_empty()).then_some(trimmed)
            })
            .collect::<Vec<_>>()
            .join(",");

        if joined.is_empty() {
            return Err(EventError::BlankChannel);
        }
        Ok(Self(joined))
    }

    /// The canonical specifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Percent-encode each name for use as a path segment, keeping the
    /// `,` separators literal.
    #[must_use]
    pub fn encoded(&self) -> String {
        self.0
            .split(',')
            .map(encode_component)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for ChannelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
