//! Output directory layout

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::spotify::Track;
use crate::utils::{generate_m3u, sanitize_filename};
use crate::ytdlp::AUDIO_FORMAT;

const M3U_FILE: &str = "playlist.m3u";

/// The directory one playlist is downloaded into
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// `<base>/<playlist-id>`; the ID is sanitized since a pass-through
    /// reference may be a whole URL
    pub fn for_playlist(base: &Path, playlist_id: &str) -> Self {
        Self::new(base.join(sanitize_filename(playlist_id)))
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Create the directory (and parents); fine if it already exists
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create output directory {}", self.root.display()))?;

        debug!("Initialized output directory at {}", self.root.display());
        Ok(())
    }

    /// `<filename>.mp3`
    pub fn track_file_name(track: &Track) -> String {
        format!("{}.{}", track.filename(), AUDIO_FORMAT)
    }

    pub fn track_path(&self, track: &Track) -> PathBuf {
        self.root.join(Self::track_file_name(track))
    }

    /// Write `playlist.m3u` listing every track whose file is present, in
    /// playlist order
    pub async fn write_m3u(&self, playlist_name: &str, tracks: &[Track]) -> Result<PathBuf> {
        let m3u_path = self.root.join(M3U_FILE);

        let present: Vec<String> = tracks
            .iter()
            .filter(|track| self.track_path(track).exists())
            .map(Self::track_file_name)
            .collect();

        let content = generate_m3u(playlist_name, &present);

        fs::write(&m3u_path, content)
            .await
            .context("Failed to write M3U file")?;

        debug!("Wrote M3U: {} ({} tracks)", m3u_path.display(), present.len());
        Ok(m3u_path)
    }
}
