//! Cover-art downloads.

use std::io::Read;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::retry::Retry;

/// Upper bound for a single image; catalog covers are well below this.
const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Fetches image bytes from a URL.
pub trait CoverArtFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP cover-art fetcher with fixed-delay retries (3 attempts, 2 s apart).
pub struct HttpCoverArt {
    agent: ureq::Agent,
    retry: Retry,
}

impl Default for HttpCoverArt {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpCoverArt {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(20))
                .build(),
            retry: Retry::from_secs("cover art", 3, 2),
        }
    }

    fn fetch_once(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| Error::External(format!("failed to download from {}: {}", url, e)))?;

        if response.status() != 200 {
            return Err(Error::External(format!("non-200 status code: {}", response.status())));
        }

        let mut data = Vec::new();
        response
            .into_reader()
            .take(MAX_IMAGE_BYTES)
            .read_to_end(&mut data)?;
        Ok(data)
    }
}

impl CoverArtFetcher for HttpCoverArt {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.retry.run(|| self.fetch_once(url))
    }
}
