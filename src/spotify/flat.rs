//! Flat-extraction resolver
//!
//! Asks yt-dlp to enumerate the playlist without downloading anything and
//! maps its generic entry schema onto [`Track`].

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::info;

use super::models::{ResolvedPlaylist, Track};
use super::reference::{extract_playlist_id, normalize_playlist_url};
use super::resolver::PlaylistResolver;
use crate::error::ResolveError;
use crate::ytdlp::YtDlp;

/// Title fields in order of preference
const TITLE_FIELDS: [&str; 3] = ["track", "title", "alt_title"];

/// Resolver backed by `yt-dlp --flat-playlist`
pub struct FlatExtractionResolver {
    ytdlp: YtDlp,
}

impl FlatExtractionResolver {
    pub fn new(ytdlp: YtDlp) -> Self {
        Self { ytdlp }
    }
}

#[async_trait]
impl PlaylistResolver for FlatExtractionResolver {
    fn name(&self) -> &'static str {
        "flat"
    }

    async fn resolve(&self, reference: &str) -> Result<ResolvedPlaylist, ResolveError> {
        let playlist_id = extract_playlist_id(reference)?;
        let url = normalize_playlist_url(reference)?;

        let info = self.ytdlp.flat_playlist(&url).await?;
        let playlist = parse_flat_playlist(&info, &playlist_id);

        info!(
            "Extracted {} tracks from '{}' with {}",
            playlist.track_count(),
            playlist.name,
            self.ytdlp.program()
        );
        Ok(playlist)
    }
}

/// Map a flat-playlist info document onto a playlist
pub fn parse_flat_playlist(info: &Value, playlist_id: &str) -> ResolvedPlaylist {
    let name = non_blank(info.get("title"))
        .unwrap_or(playlist_id)
        .trim()
        .to_string();

    let tracks: Vec<Track> = info
        .get("entries")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_object)
                .filter_map(track_from_entry)
                .collect()
        })
        .unwrap_or_default();

    ResolvedPlaylist {
        id: playlist_id.to_string(),
        name,
        tracks,
    }
}

fn track_from_entry(entry: &Map<String, Value>) -> Option<Track> {
    let title = TITLE_FIELDS
        .iter()
        .find_map(|field| non_blank(entry.get(*field)))?;

    let mut artists: Vec<&str> = entry
        .get("artists")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|artist| match artist {
                    Value::Object(obj) => non_blank(obj.get("name")),
                    Value::String(name) => Some(name.as_str()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    if artists.is_empty() {
        if let Some(fallback) = non_blank(entry.get("artist")).or_else(|| non_blank(entry.get("uploader"))) {
            artists.push(fallback);
        }
    }

    Track::new(title, artists)
}

fn non_blank(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}
