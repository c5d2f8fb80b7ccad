//! Error taxonomy shared by the whole download pipeline.
//!
//! Errors raised before a batch is expanded (reference parsing, auth, the
//! initial catalog fetch) abort the run.  Everything raised while processing a
//! single track ends up in that track's [`DownloadOutcome`](crate::batch::DownloadOutcome)
//! and never crosses into another track.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("unsupported resource type: {0}")]
    UnsupportedKind(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("catalog fetch failed: {0}")]
    CatalogFetch(String),

    #[error("search failed: {0}")]
    SearchFailed(String),

    #[error("search quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("no candidates found for '{0}'")]
    NoCandidates(String),

    #[error("audio acquisition failed: {0}")]
    AcquisitionFailed(#[source] Box<Error>),

    #[error("tagging failed: {0}")]
    TaggingFailed(String),

    #[error("all retries failed after {attempts} attempts. Last error: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("invalid cookies source: '{0}' (valid: chrome, firefox, edge, brave, safari, opera, none)")]
    InvalidCookieSource(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// Failure of an external command or transfer that has no finer class.
    #[error("{0}")]
    External(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True if this error, or any error it wraps, reports an exhausted
    /// search quota.
    pub fn is_quota_exceeded(&self) -> bool {
        match self {
            Error::QuotaExceeded(_) => true,
            Error::AcquisitionFailed(inner) => inner.is_quota_exceeded(),
            Error::RetriesExhausted { source, .. } => source.is_quota_exceeded(),
            _ => false,
        }
    }
}
