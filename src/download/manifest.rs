//! Download manifest kept alongside the files
//!
//! The manifest is a provenance record, not a resume index: whether a track
//! is skipped depends only on its file existing. It exists so that a track
//! whose metadata changed between runs can be traced back to the file it was
//! first saved as.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use crate::spotify::Track;

const MANIFEST_FILE: &str = ".tunegrab-manifest.json";

/// What has been downloaded into one playlist directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadManifest {
    /// Manifest format version
    pub version: u32,
    /// Playlist ID the directory belongs to
    pub playlist_id: String,
    /// Playlist name as of the last run
    pub playlist_name: String,
    /// Last run timestamp
    pub last_run: DateTime<Utc>,
    /// Tracks downloaded so far
    pub tracks: Vec<DownloadedTrack>,
}

/// Record of a downloaded track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadedTrack {
    /// File name inside the playlist directory
    pub filename: String,
    pub title: String,
    pub artists: Vec<String>,
    /// Platform track URI, when the resolver reported one
    #[serde(default)]
    pub uri: Option<String>,
    pub downloaded_at: DateTime<Utc>,
}

impl DownloadManifest {
    /// Create a new empty manifest
    pub fn new(playlist_id: &str, playlist_name: &str) -> Self {
        Self {
            version: 1,
            last_run: Utc::now(),
            playlist_id: playlist_id.to_string(),
            playlist_name: playlist_name.to_string(),
            tracks: Vec::new(),
        }
    }

    /// Load manifest from a playlist directory
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let manifest_path = dir.join(MANIFEST_FILE);

        if !manifest_path.exists() {
            debug!("No manifest found at {}", manifest_path.display());
            return Ok(None);
        }

        let content = std::fs::read_to_string(&manifest_path)
            .context("Failed to read manifest file")?;

        let manifest: Self = serde_json::from_str(&content)
            .context("Failed to parse manifest file")?;

        debug!("Loaded manifest: {} tracks", manifest.tracks.len());
        Ok(Some(manifest))
    }

    /// Load the existing manifest, or start a fresh one if it is missing or
    /// unreadable
    pub fn load_or_new(dir: &Path, playlist_id: &str, playlist_name: &str) -> Self {
        let mut manifest = match Self::load(dir) {
            Ok(Some(manifest)) => manifest,
            Ok(None) => Self::new(playlist_id, playlist_name),
            Err(e) => {
                warn!("Ignoring unreadable manifest in {}: {:#}", dir.display(), e);
                Self::new(playlist_id, playlist_name)
            }
        };
        manifest.playlist_name = playlist_name.to_string();
        manifest.last_run = Utc::now();
        manifest
    }

    /// Save manifest to a playlist directory
    pub fn save(&self, dir: &Path) -> Result<()> {
        let manifest_path = dir.join(MANIFEST_FILE);

        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize manifest")?;

        std::fs::write(&manifest_path, content)
            .context("Failed to write manifest file")?;

        debug!("Saved manifest to {}", manifest_path.display());
        Ok(())
    }

    /// Record a download, replacing any earlier entry for the same track
    ///
    /// Entries match on URI when both sides have one, otherwise on filename.
    pub fn record(&mut self, track: &Track, filename: &str) {
        self.tracks.retain(|entry| match (entry.uri.as_deref(), track.uri()) {
            (Some(old), Some(new)) => old != new,
            _ => entry.filename != filename,
        });
        self.tracks.push(DownloadedTrack {
            filename: filename.to_string(),
            title: track.title().to_string(),
            artists: track.artists().to_vec(),
            uri: track.uri().map(String::from),
            downloaded_at: Utc::now(),
        });
    }

    /// Earlier file for the same track URI saved under a different name
    pub fn previous_filename(&self, track: &Track, filename: &str) -> Option<&str> {
        let uri = track.uri()?;
        self.tracks
            .iter()
            .find(|entry| entry.uri.as_deref() == Some(uri) && entry.filename != filename)
            .map(|entry| entry.filename.as_str())
    }
}
