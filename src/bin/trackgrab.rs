//! Download a Spotify track, album or playlist as tagged MP3 files.
//!
//! Each track is searched on YouTube, the best match is downloaded with
//! yt-dlp, and title/artist/album/year/cover are written into the file.
//!
//! Usage:
//!     trackgrab [-o DIR] [-w N] [-c BROWSER] [--config FILE] [-v] <spotify_url>
//!
//! Examples:
//!     trackgrab -c Brave -o ./music -w 5 https://open.spotify.com/track/...
//!     trackgrab --output ./my_playlist --workers 2 https://open.spotify.com/playlist/...
//!     trackgrab https://open.spotify.com/album/...
//!
//! Credentials come from `SPOTIFY_CLIENT_ID`, `SPOTIFY_CLIENT_SECRET` and
//! `YOUTUBE_API_KEY`, or from the config file.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use trackgrab::config::{ensure_output_dir, Config};
use trackgrab::cover_art::HttpCoverArt;
use trackgrab::tags::LoftyTagWriter;
use trackgrab::youtube::YouTubeSearch;
use trackgrab::ytdlp::YtDlp;
use trackgrab::{
    expand, parse_reference, run_batch, CookieSource, Error, SpotifyCatalog, TrackPipeline,
};

#[derive(Parser)]
#[command(name = "trackgrab")]
#[command(version = "0.1")]
#[command(about = "Download Spotify tracks, albums and playlists as tagged MP3s")]
struct Cli {
    /// Spotify track, album or playlist URL
    url: String,

    /// Output directory (default: ./output)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of concurrent workers (default: 3)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Browser to take YouTube cookies from, for age-restricted content:
    /// chrome, firefox, edge, brave, safari, opera or none
    #[arg(short, long)]
    cookies: Option<String>,

    /// Path to a config TOML file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print debug output
    #[arg(short, long)]
    verbose: bool,
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    // Validated before any other work, including reading the config file
    let cli_cookies = cli.cookies.as_deref().map(str::parse::<CookieSource>).transpose()?;

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_env();

    let cookies = match cli_cookies {
        Some(cookies) => cookies,
        None => config.download.cookies.as_deref().unwrap_or("none").parse()?,
    };

    let output_dir = cli.output.clone().unwrap_or_else(|| config.output_dir());
    let output_dir = ensure_output_dir(&output_dir)
        .with_context(|| format!("error creating output directory {}", output_dir.display()))?;
    let workers = cli.workers.unwrap_or_else(|| config.workers()).max(1);

    let reference = parse_reference(&cli.url).context("error parsing URL")?;
    log::info!("Fetching {} {}", reference.kind, reference.id);

    let catalog = SpotifyCatalog::connect(&config.spotify_credentials()?)?;
    let search = YouTubeSearch::new(&config.youtube_config()?);
    let fetcher = YtDlp::new(config.ytdlp_path());
    let tagger = LoftyTagWriter;
    let covers = HttpCoverArt::new();

    let batch = expand(&catalog, &covers, &reference)?;
    log::info!("Downloading '{}' into {}", batch.name, output_dir.display());

    let pipeline =
        TrackPipeline::new(&search, &fetcher, &tagger, &output_dir).with_cookies(cookies);
    let report = run_batch(&pipeline, batch.tracks, batch.cover_art, workers);

    let failures = report.failures();
    println!(
        "{} of {} tracks downloaded",
        report.success_count(),
        report.outcomes.len()
    );
    for outcome in &failures {
        if let Some(e) = outcome.error() {
            println!("  FAILED  {}: {}", outcome.track.title, e);
        }
    }

    if report.quota_exhausted() {
        log::warn!("YouTube quota exceeded. Some tracks not downloaded.");
        return Ok(ExitCode::SUCCESS);
    }
    if failures.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_target(false)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            if e.downcast_ref::<Error>().is_some_and(Error::is_quota_exceeded) {
                log::warn!("YouTube quota exceeded. Some tracks not downloaded.");
                return ExitCode::SUCCESS;
            }
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_bad_cookie_source_reported_before_config() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        fs::write(&config_path, "[download\nworkers = ").unwrap();

        let cli = Cli::parse_from([
            "trackgrab",
            "-c",
            "bogus",
            "--config",
            config_path.to_str().unwrap(),
            "https://open.spotify.com/track/abc",
        ]);
        let err = run(cli).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidCookieSource(s)) if s == "bogus"
        ));
    }
}
