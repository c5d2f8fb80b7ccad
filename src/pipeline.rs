//! Per-track processing: search, pick a match, download, tag.
//!
//! Every step can fail; the failure is returned for this track only and the
//! caller decides what to do with it.  A failed duration lookup is not a
//! failure: the most relevant search result is used instead.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::catalog::TrackRecord;
use crate::error::{Error, Result};
use crate::matcher::select_candidate;
use crate::retry::Retry;
use crate::tags::{TagWriter, TrackTags};
use crate::text::{build_search_query, sanitize_file_name};
use crate::youtube::SearchProvider;
use crate::ytdlp::{AudioFetcher, AudioFormat, AudioRequest, CookieSource};

/// Number of search results considered per track.
pub const SEARCH_LIMIT: u32 = 10;

/// Attempts and delay for the audio download.
pub const DOWNLOAD_ATTEMPTS: u32 = 3;
pub const DOWNLOAD_RETRY_DELAY_SECS: u64 = 2;

/// Turns one [`TrackRecord`] into a tagged audio file.
///
/// Holds shared references only, so a single pipeline can serve all workers
/// of a batch.
pub struct TrackPipeline<'a> {
    search: &'a dyn SearchProvider,
    fetcher: &'a dyn AudioFetcher,
    tagger: &'a dyn TagWriter,
    output_dir: PathBuf,
    format: AudioFormat,
    cookies: CookieSource,
    retry: Retry,
}

impl<'a> TrackPipeline<'a> {
    pub fn new(
        search: &'a dyn SearchProvider,
        fetcher: &'a dyn AudioFetcher,
        tagger: &'a dyn TagWriter,
        output_dir: &Path,
    ) -> Self {
        Self {
            search,
            fetcher,
            tagger,
            output_dir: output_dir.to_path_buf(),
            format: AudioFormat::Mp3,
            cookies: CookieSource::None,
            retry: Retry::from_secs("yt-dlp", DOWNLOAD_ATTEMPTS, DOWNLOAD_RETRY_DELAY_SECS),
        }
    }

    pub fn with_cookies(mut self, cookies: CookieSource) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_retry(mut self, retry: Retry) -> Self {
        self.retry = retry;
        self
    }

    /// Destination file for a track.
    pub fn output_path(&self, track: &TrackRecord) -> PathBuf {
        let name = format!("{}.{}", sanitize_file_name(&track.title), self.format.extension());
        self.output_dir.join(name)
    }

    /// Run all steps for one track and return the path of the tagged file.
    pub fn process(&self, track: &TrackRecord, cover_art: Option<&[u8]>) -> Result<PathBuf> {
        let query = build_search_query(track);
        log::info!("Searching for '{}'", query);

        let candidates = self.search.search(&query, SEARCH_LIMIT).map_err(|e| match e {
            Error::QuotaExceeded(_) | Error::SearchFailed(_) => e,
            other => Error::SearchFailed(other.to_string()),
        })?;
        if candidates.is_empty() {
            return Err(Error::NoCandidates(query));
        }

        let ids: Vec<String> = candidates.iter().map(|c| c.id.clone()).collect();
        let durations = match self.search.fetch_durations(&ids) {
            Ok(map) => map,
            Err(e) => {
                log::warn!(
                    "Duration lookup failed for '{}', using most relevant result: {}",
                    track.title,
                    e
                );
                HashMap::new()
            }
        };

        let chosen = select_candidate(&candidates, track.duration_secs(), &durations)
            .ok_or_else(|| Error::NoCandidates(query.clone()))?;
        log::debug!(
            "'{}' -> {} ({} by {})",
            track.title,
            chosen.id,
            chosen.title,
            chosen.uploader
        );

        let request = AudioRequest {
            url: chosen.watch_url(),
            destination: self.output_path(track),
            format: self.format,
            cookies: self.cookies,
        };
        self.retry
            .run(|| self.fetcher.fetch(&request))
            .map_err(|e| Error::AcquisitionFailed(Box::new(e)))?;

        let tags = TrackTags::from_record(track);
        self.tagger
            .apply_tags(&request.destination, &tags, cover_art)
            .map_err(|e| match e {
                Error::TaggingFailed(_) => e,
                other => Error::TaggingFailed(other.to_string()),
            })?;

        log::info!("Successfully downloaded and tagged '{}'", track.title);
        Ok(request.destination)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::matcher::CandidateSource;
    use std::sync::Mutex;
    use std::time::Duration;

    fn no_sleep(_: Duration) {}

    pub(crate) fn track(title: &str, artist: &str, duration_ms: u64) -> TrackRecord {
        TrackRecord {
            title: title.to_string(),
            artists: vec![artist.to_string()],
            album_name: "Album".to_string(),
            release_date: "2010-01-01".to_string(),
            duration_ms,
            album_image_urls: Vec::new(),
        }
    }

    /// Returns two candidates ("first", "match") for every query; "match"
    /// lasts 200 s.  Queries containing "nothing" return no results and
    /// queries containing "broken" fail.
    pub(crate) struct FakeSearch {
        pub durations_fail: bool,
        pub queries: Mutex<Vec<String>>,
    }

    impl FakeSearch {
        pub(crate) fn new() -> Self {
            Self { durations_fail: false, queries: Mutex::new(Vec::new()) }
        }
    }

    impl SearchProvider for FakeSearch {
        fn search(&self, query: &str, limit: u32) -> Result<Vec<CandidateSource>> {
            assert_eq!(limit, SEARCH_LIMIT);
            self.queries.lock().unwrap().push(query.to_string());
            if query.contains("nothing") {
                return Ok(Vec::new());
            }
            if query.contains("broken") {
                return Err(Error::External("connection reset".into()));
            }
            if query.contains("quota") {
                return Err(Error::QuotaExceeded("403".into()));
            }
            Ok(["first", "match"]
                .iter()
                .map(|id| CandidateSource {
                    id: id.to_string(),
                    title: id.to_string(),
                    uploader: "u".to_string(),
                    duration_secs: 0,
                })
                .collect())
        }

        fn fetch_durations(&self, ids: &[String]) -> Result<HashMap<String, u64>> {
            if self.durations_fail {
                return Err(Error::SearchFailed("videos endpoint down".into()));
            }
            Ok(ids
                .iter()
                .map(|id| (id.clone(), if id == "match" { 200 } else { 30 }))
                .collect())
        }
    }

    /// Records requested URLs; fails the first `failures` calls, and always
    /// fails for destinations containing "undownloadable".
    pub(crate) struct FakeFetcher {
        pub failures: Mutex<u32>,
        pub calls: Mutex<Vec<AudioRequest>>,
    }

    impl FakeFetcher {
        pub(crate) fn new(failures: u32) -> Self {
            Self { failures: Mutex::new(failures), calls: Mutex::new(Vec::new()) }
        }
    }

    impl AudioFetcher for FakeFetcher {
        fn fetch(&self, request: &AudioRequest) -> Result<()> {
            self.calls.lock().unwrap().push(request.clone());
            if request.destination.to_string_lossy().contains("undownloadable") {
                return Err(Error::External("exit status 1".into()));
            }
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(Error::External("HTTP Error 403".into()));
            }
            Ok(())
        }
    }

    pub(crate) struct FakeTagger {
        pub fail: bool,
        pub tagged: Mutex<Vec<(PathBuf, TrackTags, bool)>>,
    }

    impl FakeTagger {
        pub(crate) fn new() -> Self {
            Self { fail: false, tagged: Mutex::new(Vec::new()) }
        }
    }

    impl TagWriter for FakeTagger {
        fn apply_tags(
            &self,
            path: &Path,
            tags: &TrackTags,
            cover_art: Option<&[u8]>,
        ) -> Result<()> {
            if self.fail {
                return Err(Error::External("read-only file".into()));
            }
            self.tagged
                .lock()
                .unwrap()
                .push((path.to_path_buf(), tags.clone(), cover_art.is_some()));
            Ok(())
        }
    }

    pub(crate) fn quick_retry() -> Retry {
        Retry::from_secs("test", DOWNLOAD_ATTEMPTS, DOWNLOAD_RETRY_DELAY_SECS).with_sleep(no_sleep)
    }

    #[test]
    fn test_process_selects_duration_match_and_tags() {
        let search = FakeSearch::new();
        let fetcher = FakeFetcher::new(0);
        let tagger = FakeTagger::new();
        let pipeline = TrackPipeline::new(&search, &fetcher, &tagger, Path::new("/out"))
            .with_cookies(CookieSource::Firefox)
            .with_retry(quick_retry());

        let path = pipeline
            .process(&track("AC/DC: Song (feat. X)", "Band", 201_500), Some(&[1, 2, 3]))
            .unwrap();

        assert_eq!(path, PathBuf::from("/out/AC_DC_ Song (feat. X).mp3"));
        assert_eq!(search.queries.lock().unwrap()[0], "Band AC/DC: Song");

        let calls = fetcher.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, "https://www.youtube.com/watch?v=match");
        assert_eq!(calls[0].cookies, CookieSource::Firefox);

        let tagged = tagger.tagged.lock().unwrap();
        assert_eq!(tagged[0].0, path);
        assert_eq!(tagged[0].1.year, 2010);
        assert!(tagged[0].2);
    }

    #[test]
    fn test_duration_failure_falls_back_to_first_result() {
        let mut search = FakeSearch::new();
        search.durations_fail = true;
        let fetcher = FakeFetcher::new(0);
        let tagger = FakeTagger::new();
        let pipeline = TrackPipeline::new(&search, &fetcher, &tagger, Path::new("/out"))
            .with_retry(quick_retry());

        pipeline.process(&track("Song", "Band", 200_000), None).unwrap();
        assert_eq!(
            fetcher.calls.lock().unwrap()[0].url,
            "https://www.youtube.com/watch?v=first"
        );
    }

    #[test]
    fn test_no_candidates() {
        let search = FakeSearch::new();
        let fetcher = FakeFetcher::new(0);
        let tagger = FakeTagger::new();
        let pipeline = TrackPipeline::new(&search, &fetcher, &tagger, Path::new("/out"));

        let err = pipeline.process(&track("nothing here", "Band", 1000), None).unwrap_err();
        assert!(matches!(err, Error::NoCandidates(_)));
        assert!(fetcher.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_search_errors_are_classified() {
        let search = FakeSearch::new();
        let fetcher = FakeFetcher::new(0);
        let tagger = FakeTagger::new();
        let pipeline = TrackPipeline::new(&search, &fetcher, &tagger, Path::new("/out"));

        let err = pipeline.process(&track("broken", "Band", 1000), None).unwrap_err();
        assert!(matches!(err, Error::SearchFailed(_)));

        let err = pipeline.process(&track("quota", "Band", 1000), None).unwrap_err();
        assert!(err.is_quota_exceeded());
    }

    #[test]
    fn test_download_retried_then_succeeds() {
        let search = FakeSearch::new();
        let fetcher = FakeFetcher::new(2);
        let tagger = FakeTagger::new();
        let pipeline = TrackPipeline::new(&search, &fetcher, &tagger, Path::new("/out"))
            .with_retry(quick_retry());

        pipeline.process(&track("Song", "Band", 200_000), None).unwrap();
        assert_eq!(fetcher.calls.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_download_exhausted() {
        let search = FakeSearch::new();
        let fetcher = FakeFetcher::new(0);
        let tagger = FakeTagger::new();
        let pipeline = TrackPipeline::new(&search, &fetcher, &tagger, Path::new("/out"))
            .with_retry(quick_retry());

        let err = pipeline.process(&track("undownloadable", "Band", 200_000), None).unwrap_err();
        match err {
            Error::AcquisitionFailed(inner) => {
                assert!(matches!(*inner, Error::RetriesExhausted { attempts: 3, .. }))
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(fetcher.calls.lock().unwrap().len(), 3);
        assert!(tagger.tagged.lock().unwrap().is_empty());
    }

    #[test]
    fn test_tagging_failure() {
        let search = FakeSearch::new();
        let fetcher = FakeFetcher::new(0);
        let mut tagger = FakeTagger::new();
        tagger.fail = true;
        let pipeline = TrackPipeline::new(&search, &fetcher, &tagger, Path::new("/out"))
            .with_retry(quick_retry());

        let err = pipeline.process(&track("Song", "Band", 200_000), None).unwrap_err();
        assert!(matches!(err, Error::TaggingFailed(_)));
    }
}
