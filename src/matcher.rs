//! Pick the video that best matches a catalog track.
//!
//! Search results arrive ranked by relevance.  The first result whose known
//! duration lies within [`DURATION_TOLERANCE_SECS`] of the track wins; when no
//! result can be confirmed by duration, the most relevant one is used.

use std::collections::HashMap;

/// Accepted difference between the track and a candidate, in seconds.
pub const DURATION_TOLERANCE_SECS: u64 = 5;

/// A search result that could provide the audio for a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSource {
    pub id: String,
    pub title: String,
    pub uploader: String,
    /// Duration in seconds (0 when unknown)
    pub duration_secs: u64,
}

impl CandidateSource {
    /// Canonical watch URL for this candidate.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }
}

fn within_tolerance(duration: u64, target: u64) -> bool {
    duration > 0 && duration.abs_diff(target) <= DURATION_TOLERANCE_SECS
}

/// Select a candidate id for a track of `target_secs` seconds.
///
/// `durations` maps candidate ids to their durations; it may be missing
/// entries or be empty altogether.  A candidate's own `duration_secs` is used
/// when the map has no entry for it.  Returns `None` only for an empty
/// candidate list.
pub fn select_candidate<'a>(
    candidates: &'a [CandidateSource],
    target_secs: u64,
    durations: &HashMap<String, u64>,
) -> Option<&'a CandidateSource> {
    candidates
        .iter()
        .find(|c| {
            let dur = durations.get(&c.id).copied().unwrap_or(c.duration_secs);
            within_tolerance(dur, target_secs)
        })
        .or_else(|| candidates.first())
}
