//! Sequential download of resolved tracks

use anyhow::Result;
use async_trait::async_trait;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::manifest::DownloadManifest;
use super::storage::OutputDir;
use crate::error::DownloadError;
use crate::spotify::Track;

/// Fetches and transcodes the audio for one track into a directory
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Returns the path of the created audio file
    async fn fetch(&self, track: &Track, output_dir: &Path) -> Result<PathBuf, DownloadError>;
}

/// A track that could not be downloaded
#[derive(Debug, Clone)]
pub struct FailedTrack {
    /// 1-based position in the playlist
    pub index: usize,
    pub query: String,
    pub error: String,
}

/// Outcome of a batch
#[derive(Debug, Default)]
pub struct DownloadSummary {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: Vec<FailedTrack>,
}

/// Downloads tracks one at a time, skipping files that already exist
pub struct Downloader<F> {
    fetcher: F,
}

impl<F: AudioFetcher> Downloader<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// Download every track in order
    ///
    /// Per-track failures are reported and collected; only failing to
    /// create the output directory aborts the batch.
    pub async fn download_batch(
        &self,
        tracks: &[Track],
        output: &OutputDir,
        manifest: &mut DownloadManifest,
        progress: &ProgressBar,
    ) -> Result<DownloadSummary> {
        output.init().await?;

        progress.set_length(tracks.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );

        let mut summary = DownloadSummary::default();

        for (position, track) in tracks.iter().enumerate() {
            let index = position + 1;
            let file_name = OutputDir::track_file_name(track);
            let query = track.query();
            progress.set_message(query.clone());

            if output.track_path(track).exists() {
                progress.println(format!("[{}] Already exists, skipping: {}", index, file_name));
                debug!("Skipping existing file {}", file_name);
                summary.skipped += 1;
                progress.inc(1);
                continue;
            }

            if let Some(previous) = manifest.previous_filename(track, &file_name) {
                if output.path().join(previous).exists() {
                    warn!(
                        "'{}' was previously saved as '{}'; the old file is left in place",
                        query, previous
                    );
                }
            }

            progress.println(format!("[{}] Downloading: {}", index, query));

            match self.fetcher.fetch(track, output.path()).await {
                Ok(path) => {
                    debug!("Downloaded {}", path.display());
                    summary.downloaded += 1;
                    manifest.record(track, &file_name);
                    if let Err(e) = manifest.save(output.path()) {
                        warn!("Failed to update manifest: {:#}", e);
                    }
                }
                Err(e) => {
                    progress.println(
                        format!("[{}] Failed to download '{}': {}", index, query, e)
                            .red()
                            .to_string(),
                    );
                    debug!("Download failed for '{}': {:?}", query, e);
                    summary.failed.push(FailedTrack {
                        index,
                        query,
                        error: e.to_string(),
                    });
                }
            }

            progress.inc(1);
        }

        progress.finish_with_message("Downloads complete");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Writes an empty file per track, failing titles listed in `fail`
    struct FakeFetcher {
        fail: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn new(fail: Vec<&'static str>) -> Self {
            Self {
                fail,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AudioFetcher for FakeFetcher {
        async fn fetch(&self, track: &Track, output_dir: &Path) -> Result<PathBuf, DownloadError> {
            self.calls.lock().unwrap().push(track.title().to_string());
            if self.fail.contains(&track.title()) {
                return Err(DownloadError::MissingOutput(track.filename()));
            }
            let path = output_dir.join(OutputDir::track_file_name(track));
            std::fs::write(&path, b"mp3").unwrap();
            Ok(path)
        }
    }

    fn track(title: &str, artists: &[&str]) -> Track {
        Track::new(title, artists.iter().copied()).unwrap()
    }

    #[tokio::test]
    async fn test_existing_file_is_not_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputDir::new(dir.path().join("37i9dQZF1"));
        output.init().await.unwrap();
        let tracks = vec![track("Song A", &["X"]), track("Song B", &["Y"])];
        std::fs::write(output.track_path(&tracks[0]), b"old").unwrap();

        let downloader = Downloader::new(FakeFetcher::new(vec![]));
        let mut manifest = DownloadManifest::new("37i9dQZF1", "Mix");
        let summary = downloader
            .download_batch(&tracks, &output, &mut manifest, &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.downloaded, 1);
        assert_eq!(downloader.fetcher.calls(), ["Song B"]);
        assert_eq!(std::fs::read(output.track_path(&tracks[0])).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_batch() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputDir::new(dir.path().join("nested").join("37i9dQZF1"));
        let tracks = vec![
            track("One", &["X"]),
            track("Two", &["X"]),
            track("Three", &["X"]),
        ];

        let downloader = Downloader::new(FakeFetcher::new(vec!["Two"]));
        let mut manifest = DownloadManifest::new("37i9dQZF1", "Mix");
        let summary = downloader
            .download_batch(&tracks, &output, &mut manifest, &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(downloader.fetcher.calls(), ["One", "Two", "Three"]);
        assert_eq!(summary.downloaded, 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].index, 2);
        assert_eq!(summary.failed[0].query, "X - Two");
        assert!(output.track_path(&tracks[0]).exists());
        assert!(!output.track_path(&tracks[1]).exists());
        assert!(output.track_path(&tracks[2]).exists());
    }

    #[tokio::test]
    async fn test_successful_downloads_are_recorded_in_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputDir::new(dir.path().to_path_buf());
        let tracks = vec![track("Song", &["X"]).with_uri("spotify:track:1")];

        let downloader = Downloader::new(FakeFetcher::new(vec![]));
        let mut manifest = DownloadManifest::new("id", "Mix");
        downloader
            .download_batch(&tracks, &output, &mut manifest, &ProgressBar::hidden())
            .await
            .unwrap();

        let saved = DownloadManifest::load(output.path()).unwrap().unwrap();
        assert_eq!(saved.tracks.len(), 1);
        assert_eq!(saved.tracks[0].filename, "X - Song.mp3");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_batch_with_stub_ytdlp() {
        use crate::ytdlp::{testing, YtDlp};

        let dir = tempfile::tempdir().unwrap();
        let ytdlp = YtDlp::new(testing::install_stub(dir.path()).to_string_lossy());
        let output = OutputDir::new(dir.path().join("out"));
        let tracks = vec![
            track("Song A", &["X"]),
            track("broken", &["Y"]),
            track("Song C", &["Z"]),
        ];

        let mut manifest = DownloadManifest::new("id", "Mix");
        let summary = Downloader::new(ytdlp)
            .download_batch(&tracks, &output, &mut manifest, &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(summary.downloaded, 2);
        assert_eq!(summary.failed.len(), 1);
        assert!(output.track_path(&tracks[0]).exists());
        assert!(output.track_path(&tracks[2]).exists());
    }
}
