//! YouTube Data API v3 search client.
//!
//! Two calls per track: a video search for the query, then one batched
//! `videos` lookup for the durations of all results.  The API key comes from
//! [`YouTubeConfig`]; the search endpoint costs 100 quota units per call, so
//! exhausting the daily quota is reported as its own error.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::YouTubeConfig;
use crate::error::{Error, Result};
use crate::matcher::CandidateSource;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Video search and duration lookup.
pub trait SearchProvider: Sync {
    /// Search for videos, most relevant first, up to `limit` results.
    fn search(&self, query: &str, limit: u32) -> Result<Vec<CandidateSource>>;

    /// Durations in seconds for the given video ids.  Ids the provider does
    /// not know are left out of the map.
    fn fetch_durations(&self, ids: &[String]) -> Result<HashMap<String, u64>>;
}

// ── API response types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    kind: String,
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(rename = "channelTitle", default)]
    channel_title: String,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    #[serde(rename = "contentDetails")]
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    #[serde(default)]
    duration: String,
}

fn candidates_from(resp: SearchResponse) -> Vec<CandidateSource> {
    resp.items
        .into_iter()
        .filter(|item| item.id.kind == "youtube#video")
        .filter_map(|item| {
            let id = item.id.video_id?;
            let (title, uploader) = item
                .snippet
                .map(|s| (s.title, s.channel_title))
                .unwrap_or_default();
            Some(CandidateSource {
                id,
                title,
                uploader,
                duration_secs: 0,
            })
        })
        .collect()
}

fn durations_from(resp: VideosResponse) -> HashMap<String, u64> {
    resp.items
        .into_iter()
        .map(|item| {
            let secs = item
                .content_details
                .map(|d| parse_iso8601_duration(&d.duration))
                .unwrap_or(0);
            (item.id, secs)
        })
        .collect()
}

/// Convert an ISO-8601 duration such as `PT4M20S` into seconds.
/// Returns 0 for anything that does not parse.
pub fn parse_iso8601_duration(iso: &str) -> u64 {
    let rest = match iso.strip_prefix("PT") {
        Some(r) => r,
        None => return 0,
    };

    let mut total = 0u64;
    let mut number = String::new();
    for c in rest.chars() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }
        let value: u64 = match number.parse() {
            Ok(v) => v,
            Err(_) => return 0,
        };
        number.clear();
        total += match c {
            'H' => value * 3600,
            'M' => value * 60,
            'S' => value,
            _ => return 0,
        };
    }
    if !number.is_empty() {
        return 0;
    }
    total
}

// ── Client ───────────────────────────────────────────────────────────────────

/// [`SearchProvider`] backed by the YouTube Data API.
pub struct YouTubeSearch {
    agent: ureq::Agent,
    api_key: String,
}

impl YouTubeSearch {
    pub fn new(config: &YouTubeConfig) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(20))
                .build(),
            api_key: config.api_key.clone(),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, request: ureq::Request) -> Result<T> {
        match request.query("key", &self.api_key).call() {
            Ok(response) => response
                .into_json()
                .map_err(|e| Error::SearchFailed(format!("invalid response: {}", e))),
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(classify_status(code, &body))
            }
            Err(e) => Err(Error::SearchFailed(e.to_string())),
        }
    }
}

/// Map an HTTP error status from the API to an error.
fn classify_status(code: u16, body: &str) -> Error {
    if code == 403 && body.contains("quotaExceeded") {
        Error::QuotaExceeded(format!("YouTube API returned {}", code))
    } else {
        Error::SearchFailed(format!("YouTube API returned {}: {}", code, body.trim()))
    }
}

impl SearchProvider for YouTubeSearch {
    fn search(&self, query: &str, limit: u32) -> Result<Vec<CandidateSource>> {
        let request = self
            .agent
            .get(&format!("{}/search", API_BASE))
            .query("part", "id,snippet")
            .query("type", "video")
            .query("maxResults", &limit.to_string())
            .query("q", query);
        let resp: SearchResponse = self.get_json(request)?;
        Ok(candidates_from(resp))
    }

    fn fetch_durations(&self, ids: &[String]) -> Result<HashMap<String, u64>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let request = self
            .agent
            .get(&format!("{}/videos", API_BASE))
            .query("part", "contentDetails")
            .query("id", &ids.join(","));
        let resp: VideosResponse = self.get_json(request)?;
        Ok(durations_from(resp))
    }
}
