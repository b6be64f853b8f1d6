//! Track and playlist models

use crate::utils::sanitize_filename;

/// Placeholder used in filenames when a track has no known artist
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// A single playlist entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    title: String,
    artists: Vec<String>,
    /// Platform URI (`spotify:track:...`) when the resolver saw one
    uri: Option<String>,
}

impl Track {
    /// Build a track, returning `None` when the title is blank
    ///
    /// Title and artist names are trimmed; blank artist names are dropped.
    pub fn new<I, S>(title: &str, artists: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }

        let artists = artists
            .into_iter()
            .map(|a| a.as_ref().trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();

        Some(Self {
            title: title.to_string(),
            artists,
            uri: None,
        })
    }

    /// Attach the platform URI
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artists(&self) -> &[String] {
        &self.artists
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Search query: `"<artists space-joined> - <title>"`, or the bare title
    pub fn query(&self) -> String {
        if self.artists.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.artists.join(" "), self.title)
        }
    }

    /// Filesystem-safe stem: `"<artists comma-joined> - <title>"`
    pub fn filename(&self) -> String {
        let artists = if self.artists.is_empty() {
            UNKNOWN_ARTIST.to_string()
        } else {
            self.artists.join(", ")
        };
        sanitize_filename(&format!("{} - {}", artists, self.title))
    }

    /// Case-insensitive identity used to collapse duplicates
    pub fn dedup_key(&self) -> (String, Vec<String>) {
        (
            self.title.to_lowercase(),
            self.artists.iter().map(|a| a.to_lowercase()).collect(),
        )
    }
}

/// Output of a resolver
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlaylist {
    pub id: String,
    pub name: String,
    pub tracks: Vec<Track>,
}

impl ResolvedPlaylist {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }
}
