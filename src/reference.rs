//! Catalog reference parsing.
//!
//! Turns a share URL such as `https://open.spotify.com/playlist/37i9dQ?si=abc`
//! into a [`CatalogReference`].  No network access happens here.

use std::fmt;

use url::Url;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Track,
    Album,
    Playlist,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Track => write!(f, "track"),
            ReferenceKind::Album => write!(f, "album"),
            ReferenceKind::Playlist => write!(f, "playlist"),
        }
    }
}

/// A parsed (kind, id) pair pointing into the music catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogReference {
    pub kind: ReferenceKind,
    pub id: String,
}

/// Parse a catalog URL into its resource kind and id.
///
/// The path must have at least two segments: the first selects the kind
/// (`track`, `album` or `playlist`), the second is the id.  Anything after a
/// `?` in the id is dropped.
pub fn parse_reference(raw: &str) -> Result<CatalogReference> {
    let parsed =
        Url::parse(raw).map_err(|_| Error::InvalidReference(format!("invalid URL: {}", raw)))?;
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(Error::InvalidReference(format!("invalid URL: {}", raw)));
    }

    let segments: Vec<&str> = parsed
        .path()
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    if segments.len() < 2 {
        return Err(Error::InvalidReference("URL path is too short".to_string()));
    }

    let resource_type = segments[0];
    let id = segments[1];
    let id = id.split('?').next().unwrap_or(id).to_string();

    let kind = match resource_type {
        "track" => ReferenceKind::Track,
        "album" => ReferenceKind::Album,
        "playlist" => ReferenceKind::Playlist,
        other => return Err(Error::UnsupportedKind(other.to_string())),
    };

    Ok(CatalogReference { kind, id })
}
