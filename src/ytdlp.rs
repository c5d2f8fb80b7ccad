//! Audio acquisition through the external `yt-dlp` command.
//!
//! yt-dlp downloads the best available audio stream and converts it (via
//! ffmpeg) to the requested container at the requested path.  A non-zero exit
//! status is a failure; its combined output is kept in the error.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Browser whose cookies yt-dlp should use for age-restricted or
/// members-only videos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CookieSource {
    #[default]
    None,
    Chrome,
    Firefox,
    Edge,
    Brave,
    Safari,
    Opera,
}

impl CookieSource {
    /// Name passed to `--cookies-from-browser`, `None` when disabled.
    pub fn browser_name(&self) -> Option<&'static str> {
        match self {
            CookieSource::None => None,
            CookieSource::Chrome => Some("chrome"),
            CookieSource::Firefox => Some("firefox"),
            CookieSource::Edge => Some("edge"),
            CookieSource::Brave => Some("brave"),
            CookieSource::Safari => Some("safari"),
            CookieSource::Opera => Some("opera"),
        }
    }
}

impl FromStr for CookieSource {
    type Err = Error;

    /// Case-insensitive; the empty string means no cookies.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(CookieSource::None),
            "chrome" => Ok(CookieSource::Chrome),
            "firefox" => Ok(CookieSource::Firefox),
            "edge" => Ok(CookieSource::Edge),
            "brave" => Ok(CookieSource::Brave),
            "safari" => Ok(CookieSource::Safari),
            "opera" => Ok(CookieSource::Opera),
            other => Err(Error::InvalidCookieSource(other.to_string())),
        }
    }
}

impl fmt::Display for CookieSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.browser_name().unwrap_or("none"))
    }
}

/// Output container produced by the conversion step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioFormat {
    #[default]
    Mp3,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
        }
    }
}

/// What to download and where to put it.
#[derive(Debug, Clone)]
pub struct AudioRequest {
    pub url: String,
    pub destination: PathBuf,
    pub format: AudioFormat,
    pub cookies: CookieSource,
}

/// Downloads audio for a source URL into a local file.
pub trait AudioFetcher: Sync {
    /// Produce the file at `request.destination` or fail.
    fn fetch(&self, request: &AudioRequest) -> Result<()>;
}

/// [`AudioFetcher`] that shells out to yt-dlp.
pub struct YtDlp {
    program: PathBuf,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YtDlp {
    pub fn new<P: AsRef<Path>>(program: P) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
        }
    }

    /// Command-line arguments for one download.
    pub fn build_args(request: &AudioRequest) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-f".into(),
            "bestaudio".into(),
            "--extract-audio".into(),
            "--audio-format".into(),
            request.format.extension().into(),
            "--audio-quality".into(),
            "0".into(),
            "-o".into(),
            request.destination.to_string_lossy().into_owned(),
        ];
        if let Some(browser) = request.cookies.browser_name() {
            args.push("--cookies-from-browser".into());
            args.push(browser.into());
        }
        args.push(request.url.clone());
        args
    }
}

impl AudioFetcher for YtDlp {
    fn fetch(&self, request: &AudioRequest) -> Result<()> {
        let args = Self::build_args(request);
        log::debug!("Running {} {}", self.program.display(), args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| Error::External(format!("cannot run {}: {}", self.program.display(), e)))?;

        if output.status.success() {
            return Ok(());
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Err(Error::External(format!(
            "yt-dlp failed ({}): {}",
            output.status,
            combined.trim()
        )))
    }
}
