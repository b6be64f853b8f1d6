//! CLI command handlers

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::generate;
use colored::Colorize;
use indicatif::ProgressBar;
use std::io;
use std::time::Duration;
use tracing::{debug, warn};

use super::Cli;
use crate::config::{RunOptions, Settings};
use crate::download::{DownloadManifest, Downloader, OutputDir};
use crate::spotify::{extract_playlist_id, ResolvedPlaylist};
use crate::ytdlp::YtDlp;

/// Timeout for fetching the playlist page
const PAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Handle a playlist download run
pub async fn run(cli: Cli) -> Result<()> {
    let reference = cli
        .playlist
        .clone()
        .ok_or_else(|| anyhow::anyhow!("A playlist URL or ID is required"))?;

    let options = Settings::load()?.apply(cli.overrides());
    debug!("Run options: {:?}", options);

    grab(&reference, &options, cli.dry_run).await
}

/// Resolve a playlist and download its tracks
pub async fn grab(reference: &str, options: &RunOptions, dry_run: bool) -> Result<()> {
    // Fail on a malformed URL before any network traffic
    extract_playlist_id(reference)?;

    let ytdlp = YtDlp::new(&options.ytdlp_path);
    let resolver = options.strategy.build(ytdlp.clone(), PAGE_TIMEOUT)?;

    println!("{}", "Resolving playlist...".cyan());
    let playlist = resolver
        .resolve(reference)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to get the Spotify playlist without the official API: {}", e))?;

    if playlist.is_empty() {
        println!(
            "{}",
            "No tracks found. The playlist may be private or the page format changed.".yellow()
        );
        return Ok(());
    }

    println!("Playlist: {}", playlist.name.green().bold());
    println!("Tracks: {}", playlist.track_count());

    if dry_run {
        print_dry_run(&playlist);
        return Ok(());
    }

    match ytdlp.version().await {
        Ok(version) => debug!("Using {} {}", ytdlp.program(), version),
        Err(e) => warn!("{:#}; downloads will fail", e),
    }

    let output = OutputDir::for_playlist(&options.output_root, &playlist.id);
    let mut manifest = DownloadManifest::load_or_new(output.path(), &playlist.id, &playlist.name);

    let progress = ProgressBar::new(playlist.track_count() as u64);
    let summary = Downloader::new(ytdlp)
        .download_batch(&playlist.tracks, &output, &mut manifest, &progress)
        .await?;

    if options.write_m3u {
        match output.write_m3u(&playlist.name, &playlist.tracks).await {
            Ok(path) => debug!("Playlist file written to {}", path.display()),
            Err(e) => warn!("Failed to write playlist file: {:#}", e),
        }
    }

    println!();
    println!("{}", "Download complete!".green().bold());
    println!("  Downloaded: {}", summary.downloaded);
    println!("  Skipped (already present): {}", summary.skipped);
    if !summary.failed.is_empty() {
        println!("  {}", format!("Failed: {}", summary.failed.len()).red());
        for failed in &summary.failed {
            println!("    [{}] {}: {}", failed.index, failed.query, failed.error);
        }
    }
    println!("  Location: {}", output.path().display());

    Ok(())
}

fn print_dry_run(playlist: &ResolvedPlaylist) {
    println!();
    println!("{}", "[DRY RUN] Would download:".yellow());
    for (position, track) in playlist.tracks.iter().enumerate() {
        println!("  [{}] {}", position + 1, OutputDir::track_file_name(track));
    }
}

/// Handle `--completions`
pub fn completion(shell: clap_complete::Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "tunegrab", &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spotify::Strategy;
    use std::path::PathBuf;

    fn options(root: PathBuf, ytdlp_path: String) -> RunOptions {
        RunOptions {
            output_root: root,
            strategy: Strategy::Flat,
            ytdlp_path,
            write_m3u: true,
        }
    }

    #[tokio::test]
    async fn test_malformed_url_fails_before_resolving() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path().to_path_buf(), "/nonexistent/yt-dlp-for-tests".into());

        let result = grab("https://open.spotify.com/playlist/?si=x", &options, false).await;
        assert!(result.is_err());
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_resolution_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path().to_path_buf(), "/nonexistent/yt-dlp-for-tests".into());

        let err = grab("37i9dQZF1", &options, false).await.unwrap_err();
        assert!(err.to_string().contains("Failed to get the Spotify playlist"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_end_to_end_with_stub_ytdlp() {
        let dir = tempfile::tempdir().unwrap();
        let stub = crate::ytdlp::testing::install_stub(dir.path());
        let root = dir.path().join("downloads");
        let options = options(root.clone(), stub.to_string_lossy().into_owned());

        grab("https://open.spotify.com/playlist/37i9dQZF1?si=abc", &options, false)
            .await
            .unwrap();

        let playlist_dir = root.join("37i9dQZF1");
        assert!(playlist_dir.join("X - Song A.mp3").exists());
        assert!(playlist_dir.join("Y - Song B.mp3").exists());
        assert!(playlist_dir.join("playlist.m3u").exists());
        assert!(playlist_dir.join(".tunegrab-manifest.json").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dry_run_downloads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let stub = crate::ytdlp::testing::install_stub(dir.path());
        let root = dir.path().join("downloads");
        let options = options(root.clone(), stub.to_string_lossy().into_owned());

        grab("37i9dQZF1", &options, true).await.unwrap();
        assert!(!root.exists());
    }
}
