//! Batch expansion and the download worker pool.
//!
//! [`expand`] turns a catalog reference into the ordered list of tracks to
//! download plus at most one cover image shared by all of them.
//! [`run_batch`] feeds those tracks to a fixed number of worker threads and
//! collects exactly one [`DownloadOutcome`] per track, in completion order.

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc::sync_channel;
use std::sync::{Arc, Mutex};
use std::thread;

use crate::catalog::{Catalog, TrackRecord};
use crate::cover_art::CoverArtFetcher;
use crate::error::{Error, Result};
use crate::pipeline::TrackPipeline;
use crate::reference::{CatalogReference, ReferenceKind};

/// Cover image bytes, shared read-only between workers.
pub type CoverArt = Option<Arc<[u8]>>;

/// Everything needed to run a download batch.
#[derive(Debug, Clone)]
pub struct Batch {
    pub name: String,
    pub tracks: Vec<TrackRecord>,
    pub cover_art: CoverArt,
}

/// Result for one track.
#[derive(Debug)]
pub struct DownloadOutcome {
    pub track: TrackRecord,
    pub result: Result<PathBuf>,
}

impl DownloadOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&Error> {
        self.result.as_ref().err()
    }
}

/// All outcomes of a batch, in the order the workers finished them.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<DownloadOutcome>,
}

impl BatchReport {
    /// True when every track succeeded.
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(DownloadOutcome::succeeded)
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    /// Failed outcomes in arrival order.
    pub fn failures(&self) -> Vec<&DownloadOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded()).collect()
    }

    /// The last failure to arrive, used as the batch's summary error.
    pub fn last_error(&self) -> Option<&Error> {
        self.outcomes.iter().rev().find_map(DownloadOutcome::error)
    }

    /// True if any track failed because the search quota ran out.
    pub fn quota_exhausted(&self) -> bool {
        self.outcomes
            .iter()
            .filter_map(DownloadOutcome::error)
            .any(Error::is_quota_exceeded)
    }

    /// Collapse into a single result: `Ok` if every track succeeded,
    /// otherwise the last failure.
    pub fn into_result(self) -> Result<()> {
        match self.outcomes.into_iter().rev().find_map(|o| o.result.err()) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// ── Expansion ────────────────────────────────────────────────────────────────

/// Fetch the first image of `urls`, or `None` if there is none or the
/// download fails.
fn first_cover(covers: &dyn CoverArtFetcher, urls: &[String], context: &str) -> CoverArt {
    let url = urls.first()?;
    match covers.fetch(url) {
        Ok(bytes) if !bytes.is_empty() => Some(Arc::from(bytes)),
        Ok(_) => {
            log::warn!("Empty cover art for {}", context);
            None
        }
        Err(e) => {
            log::warn!("Error downloading cover art for {}: {}", context, e);
            None
        }
    }
}

/// Expand a catalog reference into its tracks and shared cover art.
///
/// Catalog errors are fatal; cover-art errors only drop the cover.
pub fn expand(
    catalog: &dyn Catalog,
    covers: &dyn CoverArtFetcher,
    reference: &CatalogReference,
) -> Result<Batch> {
    match reference.kind {
        ReferenceKind::Track => {
            let track = catalog.track(&reference.id)?;
            let cover_art = first_cover(covers, &track.album_image_urls, &track.title);
            Ok(Batch {
                name: track.title.clone(),
                tracks: vec![track],
                cover_art,
            })
        }
        ReferenceKind::Album => {
            let album = catalog.album(&reference.id)?;
            let cover_art = first_cover(covers, &album.image_urls, &album.name);
            Ok(Batch {
                name: album.name,
                tracks: album.tracks,
                cover_art,
            })
        }
        ReferenceKind::Playlist => {
            let mut page = catalog.playlist_tracks(&reference.id)?;
            let mut tracks = std::mem::take(&mut page.tracks);
            while let Some(mut next) = catalog.next_page(&page)? {
                tracks.append(&mut next.tracks);
                page = next;
            }

            let cover_art = match catalog.playlist_image_urls(&reference.id) {
                Ok(urls) => first_cover(covers, &urls, "playlist"),
                Err(e) => {
                    log::warn!("Cannot fetch playlist details: {}", e);
                    None
                }
            };

            Ok(Batch {
                name: format!("playlist {}", reference.id),
                tracks,
                cover_art,
            })
        }
    }
}

// ── Worker pool ──────────────────────────────────────────────────────────────

/// Run one pipeline call, turning a panic into a failed result so the
/// outcome count always matches the job count.
fn process_isolated(
    pipeline: &TrackPipeline<'_>,
    track: &TrackRecord,
    cover: Option<&[u8]>,
) -> Result<PathBuf> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| pipeline.process(track, cover)));
    outcome.unwrap_or_else(|payload| {
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(Error::External(format!("worker panicked: {}", msg)))
    })
}

/// Download every track with `workers` concurrent workers.
///
/// Job and result channels are sized to the track count, so submitting never
/// blocks.  Returns after all tracks have an outcome; failures never stop
/// the other workers.
pub fn run_batch(
    pipeline: &TrackPipeline<'_>,
    tracks: Vec<TrackRecord>,
    cover_art: CoverArt,
    workers: usize,
) -> BatchReport {
    let total = tracks.len();
    if total == 0 {
        return BatchReport::default();
    }
    let workers = workers.max(1);
    log::info!("Found {} tracks.", total);
    log::info!("Searching and downloading tracks with {} workers...", workers);

    let (job_tx, job_rx) = sync_channel::<TrackRecord>(total);
    let (result_tx, result_rx) = sync_channel::<DownloadOutcome>(total);
    let job_rx = Mutex::new(job_rx);
    let cover: Option<&[u8]> = cover_art.as_deref();

    let outcomes = thread::scope(|scope| {
        for worker_id in 0..workers {
            let job_rx = &job_rx;
            let result_tx = result_tx.clone();
            scope.spawn(move || loop {
                // Hold the lock only while taking a job
                let job = match job_rx.lock() {
                    Ok(rx) => rx.recv(),
                    Err(poisoned) => poisoned.into_inner().recv(),
                };
                let track = match job {
                    Ok(t) => t,
                    Err(_) => break,
                };

                log::debug!("worker {} took '{}'", worker_id, track.title);
                let result = process_isolated(pipeline, &track, cover);
                if let Err(e) = &result {
                    log::error!("Error processing '{}': {}", track.title, e);
                }
                if result_tx.send(DownloadOutcome { track, result }).is_err() {
                    break;
                }
            });
        }
        drop(result_tx);

        for track in tracks {
            // Capacity equals the track count, so this never blocks
            if job_tx.send(track).is_err() {
                break;
            }
        }
        drop(job_tx);

        let mut outcomes = Vec::with_capacity(total);
        for _ in 0..total {
            match result_rx.recv() {
                Ok(outcome) => {
                    log::info!("[{}/{}] {}", outcomes.len() + 1, total, outcome.track.title);
                    outcomes.push(outcome);
                }
                Err(_) => break,
            }
        }
        outcomes
    });

    log::info!("Download complete!");
    BatchReport { outcomes }
}
