//! Spotify Web API catalog client.
//!
//! Lists the tracks of albums and playlists and fetches single tracks.
//! Playlist listings are paginated; [`Catalog::next_page`] follows the
//! `next` link until the API reports no further page.
//!
//! Authentication: client-credentials token from [`crate::auth`].

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::auth::{self, AccessToken};
use crate::config::SpotifyCredentials;
use crate::error::{Error, Result};

const API_BASE: &str = "https://api.spotify.com/v1";
const PLAYLIST_PAGE_SIZE: u32 = 100;

// ── Public types ─────────────────────────────────────────────────────────────

/// Metadata for one catalog track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRecord {
    pub title: String,
    /// Credited artists, main artist first
    pub artists: Vec<String>,
    pub album_name: String,
    /// Release date as given by the catalog: `YYYY`, `YYYY-MM` or `YYYY-MM-DD`
    pub release_date: String,
    pub duration_ms: u64,
    /// Album cover URLs, largest first
    pub album_image_urls: Vec<String>,
}

impl TrackRecord {
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(String::as_str)
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_ms / 1000
    }
}

/// An album with its full track list.
#[derive(Debug, Clone)]
pub struct AlbumRecord {
    pub name: String,
    pub tracks: Vec<TrackRecord>,
    pub image_urls: Vec<String>,
}

/// One page of a playlist listing.
#[derive(Debug, Clone)]
pub struct TrackPage {
    pub tracks: Vec<TrackRecord>,
    /// URL of the following page, `None` on the last page
    pub next: Option<String>,
}

impl TrackPage {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

/// Read access to the music catalog.
pub trait Catalog {
    fn album(&self, id: &str) -> Result<AlbumRecord>;

    fn track(&self, id: &str) -> Result<TrackRecord>;

    /// First page of a playlist's tracks.
    fn playlist_tracks(&self, id: &str) -> Result<TrackPage>;

    /// Page following `page`, or `None` when `page` was the last one.
    fn next_page(&self, page: &TrackPage) -> Result<Option<TrackPage>>;

    /// Cover images of the playlist itself, largest first.
    fn playlist_image_urls(&self, id: &str) -> Result<Vec<String>>;
}

// ── API response types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiImage {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ApiArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiSimpleAlbum {
    name: String,
    #[serde(default)]
    release_date: String,
    #[serde(default)]
    images: Vec<ApiImage>,
}

#[derive(Debug, Deserialize)]
struct ApiSimpleTrack {
    name: String,
    #[serde(default)]
    artists: Vec<ApiArtist>,
    #[serde(default)]
    duration_ms: u64,
}

#[derive(Debug, Deserialize)]
struct ApiFullTrack {
    name: String,
    #[serde(default)]
    artists: Vec<ApiArtist>,
    #[serde(default)]
    duration_ms: u64,
    album: ApiSimpleAlbum,
}

#[derive(Debug, Deserialize)]
struct ApiPaging<T> {
    items: Vec<T>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiAlbum {
    name: String,
    #[serde(default)]
    release_date: String,
    #[serde(default)]
    images: Vec<ApiImage>,
    tracks: ApiPaging<ApiSimpleTrack>,
}

#[derive(Debug, Deserialize)]
struct ApiPlaylistItem {
    /// Null for removed or local-only tracks
    track: Option<ApiFullTrack>,
}

#[derive(Debug, Deserialize)]
struct ApiPlaylistImages {
    #[serde(default)]
    images: Option<Vec<ApiImage>>,
}

fn image_urls(images: Vec<ApiImage>) -> Vec<String> {
    images.into_iter().map(|i| i.url).collect()
}

impl From<ApiFullTrack> for TrackRecord {
    fn from(t: ApiFullTrack) -> Self {
        TrackRecord {
            title: t.name,
            artists: t.artists.into_iter().map(|a| a.name).collect(),
            album_name: t.album.name,
            release_date: t.album.release_date,
            duration_ms: t.duration_ms,
            album_image_urls: image_urls(t.album.images),
        }
    }
}

/// Album listings carry simplified tracks; fill in the album fields.
fn album_track(
    t: ApiSimpleTrack,
    album_name: &str,
    release_date: &str,
    images: &[String],
) -> TrackRecord {
    TrackRecord {
        title: t.name,
        artists: t.artists.into_iter().map(|a| a.name).collect(),
        album_name: album_name.to_string(),
        release_date: release_date.to_string(),
        duration_ms: t.duration_ms,
        album_image_urls: images.to_vec(),
    }
}

fn playlist_page(api: ApiPaging<ApiPlaylistItem>) -> TrackPage {
    TrackPage {
        tracks: api
            .items
            .into_iter()
            .filter_map(|item| item.track)
            .map(TrackRecord::from)
            .collect(),
        next: api.next,
    }
}

// ── Client ───────────────────────────────────────────────────────────────────

/// Catalog client backed by the Spotify Web API.
pub struct SpotifyCatalog {
    agent: ureq::Agent,
    token: AccessToken,
}

impl SpotifyCatalog {
    /// Authenticate with client credentials and build a client.
    pub fn connect(creds: &SpotifyCredentials) -> Result<Self> {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(20))
            .build();
        let token = auth::fetch_token(&agent, creds)?;
        Ok(Self { agent, token })
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        log::debug!("GET {}", url);
        let response = self
            .agent
            .get(url)
            .set("Authorization", &self.token.bearer())
            .call()
            .map_err(|e| Error::CatalogFetch(format!("{}: {}", url, e)))?;
        response
            .into_json()
            .map_err(|e| Error::CatalogFetch(format!("invalid response from {}: {}", url, e)))
    }
}

impl Catalog for SpotifyCatalog {
    fn album(&self, id: &str) -> Result<AlbumRecord> {
        let api: ApiAlbum = self.get_json(&format!("{}/albums/{}", API_BASE, id))?;
        let images = image_urls(api.images);

        let mut tracks: Vec<TrackRecord> = api
            .tracks
            .items
            .into_iter()
            .map(|t| album_track(t, &api.name, &api.release_date, &images))
            .collect();

        // Albums longer than one page
        let mut next = api.tracks.next;
        while let Some(url) = next {
            let page: ApiPaging<ApiSimpleTrack> = self.get_json(&url)?;
            tracks.extend(
                page.items
                    .into_iter()
                    .map(|t| album_track(t, &api.name, &api.release_date, &images)),
            );
            next = page.next;
        }

        Ok(AlbumRecord {
            name: api.name,
            tracks,
            image_urls: images,
        })
    }

    fn track(&self, id: &str) -> Result<TrackRecord> {
        let api: ApiFullTrack = self.get_json(&format!("{}/tracks/{}", API_BASE, id))?;
        Ok(api.into())
    }

    fn playlist_tracks(&self, id: &str) -> Result<TrackPage> {
        let url = format!(
            "{}/playlists/{}/tracks?limit={}",
            API_BASE, id, PLAYLIST_PAGE_SIZE
        );
        let api: ApiPaging<ApiPlaylistItem> = self.get_json(&url)?;
        Ok(playlist_page(api))
    }

    fn next_page(&self, page: &TrackPage) -> Result<Option<TrackPage>> {
        match &page.next {
            Some(url) => {
                let api: ApiPaging<ApiPlaylistItem> = self.get_json(url)?;
                Ok(Some(playlist_page(api)))
            }
            None => Ok(None),
        }
    }

    fn playlist_image_urls(&self, id: &str) -> Result<Vec<String>> {
        let url = format!("{}/playlists/{}?fields=images", API_BASE, id);
        let api: ApiPlaylistImages = self.get_json(&url)?;
        Ok(image_urls(api.images.unwrap_or_default()))
    }
}
