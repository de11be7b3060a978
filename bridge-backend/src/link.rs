//! Playlist link parsing and validation.
//!
//! Links are URN-style `spotify:` addresses, not URLs. Two forms resolve to
//! a playlist:
//!
//! - `spotify:playlist:<id>`
//! - `spotify:user:<user>:playlist:<id>` (legacy per-user form)
//!
//! where `<id>` is a non-empty base62 token. Anything else is a parse error,
//! with link kinds other than `playlist` rejected explicitly so callers can
//! answer "not a playlist link" rather than "garbage".

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while parsing a playlist link.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkParseError {
    /// The string is not a backend link at all.
    #[error("not a spotify link: {0:?}")]
    NotALink(String),

    /// A valid link, but for some other kind of resource.
    #[error("not a playlist link (kind: {0})")]
    WrongKind(String),

    /// The playlist id segment is missing or contains invalid characters.
    #[error("invalid playlist id: {0:?}")]
    InvalidId(String),
}

/// A parsed, validated playlist address.
///
/// Immutable once parsed; `Display` and [`PlaylistLink::as_str`] render the
/// canonical string form, which is also what serializes into the JSON
/// document's `uri` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlaylistLink {
    uri: String,
}

impl PlaylistLink {
    /// Parse a playlist link from its string form.
    pub fn parse(input: &str) -> Result<Self, LinkParseError> {
        let segments: Vec<&str> = input.split(':').collect();

        let (kind, id) = match segments.as_slice() {
            ["spotify", kind, id] => (*kind, *id),
            ["spotify", "user", user, kind, id] => {
                if user.is_empty() {
                    return Err(LinkParseError::NotALink(input.to_string()));
                }
                (*kind, *id)
            }
            _ => return Err(LinkParseError::NotALink(input.to_string())),
        };

        if kind != "playlist" {
            if kind.is_empty() {
                return Err(LinkParseError::NotALink(input.to_string()));
            }
            return Err(LinkParseError::WrongKind(kind.to_string()));
        }

        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(LinkParseError::InvalidId(id.to_string()));
        }

        Ok(Self {
            uri: input.to_string(),
        })
    }

    /// The canonical string form of the link.
    pub fn as_str(&self) -> &str {
        &self.uri
    }
}

impl std::fmt::Display for PlaylistLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri)
    }
}

impl std::str::FromStr for PlaylistLink {
    type Err = LinkParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PlaylistLink {
    type Error = LinkParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PlaylistLink> for String {
    fn from(link: PlaylistLink) -> Self {
        link.uri
    }
}
