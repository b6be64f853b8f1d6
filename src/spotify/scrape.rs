//! Page-scrape resolver
//!
//! Fetches the public playlist page and reads the JSON state that the web
//! player embeds in `<script id="__NEXT_DATA__">`. The document has no stable
//! schema, so every mapping in it is classified on its own: anything with a
//! title, at least one artist and (if present) a track URI counts as a track.

use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use reqwest::Client;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info};

use super::models::{ResolvedPlaylist, Track};
use super::reference::{extract_playlist_id, normalize_playlist_url};
use super::resolver::PlaylistResolver;
use crate::error::ResolveError;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// URI prefix every track node carries
pub const TRACK_URI_PREFIX: &str = "spotify:track:";

const PLAYLIST_TYPENAME: &str = "Playlist";

static NEXT_DATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<script\b[^>]*\bid="__NEXT_DATA__"[^>]*>(.*?)</script>"#)
        .expect("valid __NEXT_DATA__ pattern")
});

/// Resolver that scrapes the public playlist page
pub struct PageScrapeResolver {
    http_client: Client,
}

impl PageScrapeResolver {
    /// Create a resolver whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE),
        );

        let http_client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { http_client })
    }

    /// GET the page body, mapping transport and status failures
    async fn fetch_page(&self, url: &str) -> Result<String, ResolveError> {
        debug!("Fetching playlist page: {}", url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ResolveError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| ResolveError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl PlaylistResolver for PageScrapeResolver {
    fn name(&self) -> &'static str {
        "scrape"
    }

    async fn resolve(&self, reference: &str) -> Result<ResolvedPlaylist, ResolveError> {
        let playlist_id = extract_playlist_id(reference)?;
        let url = normalize_playlist_url(reference)?;

        let html = self.fetch_page(&url).await?;
        let playlist = parse_playlist_page(&html, &playlist_id)?;

        info!(
            "Scraped {} tracks from playlist page '{}'",
            playlist.track_count(),
            playlist.name
        );
        Ok(playlist)
    }
}

/// Extract tracks and the playlist name from raw page HTML
pub fn parse_playlist_page(html: &str, playlist_id: &str) -> Result<ResolvedPlaylist, ResolveError> {
    let raw = NEXT_DATA_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| {
            ResolveError::Parse(
                "page structure not recognized; the playlist is likely private or the page format changed"
                    .to_string(),
            )
        })?;

    let json = unescape_html(raw.as_str());
    let root: Value = serde_json::from_str(&json)
        .map_err(|e| ResolveError::Parse(format!("embedded page data is not valid JSON: {}", e)))?;

    Ok(collect_playlist(&root, playlist_id))
}

/// Walk a parsed page document and gather everything that looks like a track
pub fn collect_playlist(root: &Value, playlist_id: &str) -> ResolvedPlaylist {
    let mut tracks = TrackSet::default();
    let mut name: Option<String> = None;

    walk(root, &mut |node| match classify(node) {
        Candidate::Track(track) => tracks.insert(track),
        Candidate::Playlist(found) => {
            name.get_or_insert(found);
        }
        Candidate::Other => {}
    });

    let tracks = tracks.into_vec();
    debug!("Collected {} distinct tracks from page data", tracks.len());

    ResolvedPlaylist {
        id: playlist_id.to_string(),
        name: name.unwrap_or_else(|| playlist_id.to_string()),
        tracks,
    }
}

/// What a single mapping node in the page data looks like
#[derive(Debug, PartialEq)]
enum Candidate {
    Track(Track),
    Playlist(String),
    Other,
}

fn classify(node: &Map<String, Value>) -> Candidate {
    if node.get("__typename").and_then(Value::as_str) == Some(PLAYLIST_TYPENAME) {
        return match non_blank(node.get("name")) {
            Some(name) => Candidate::Playlist(name.trim().to_string()),
            None => Candidate::Other,
        };
    }

    let uri = node.get("uri").and_then(Value::as_str);
    if uri.is_some_and(|uri| !uri.starts_with(TRACK_URI_PREFIX)) {
        return Candidate::Other;
    }

    let Some(title) = non_blank(node.get("name")).or_else(|| non_blank(node.get("title"))) else {
        return Candidate::Other;
    };

    let artists = node.get("artists").map(artist_names).unwrap_or_default();
    if artists.is_empty() {
        return Candidate::Other;
    }

    match Track::new(title, artists) {
        Some(track) => match uri {
            Some(uri) => Candidate::Track(track.with_uri(uri)),
            None => Candidate::Track(track),
        },
        None => Candidate::Other,
    }
}

/// Artist names from either `{"items": [{"profile": {"name": ..}}]}` or a
/// list of strings / `{"name": ..}` objects
fn artist_names(value: &Value) -> Vec<String> {
    let names: Vec<&str> = match value {
        Value::Object(map) => map
            .get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("profile")?.get("name")?.as_str())
                    .collect()
            })
            .unwrap_or_default(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(name) => Some(name.as_str()),
                Value::Object(obj) => obj.get("name").and_then(Value::as_str),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    names
        .into_iter()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

fn non_blank(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Depth-first, pre-order: a mapping is visited before its children
fn walk<'a, F>(value: &'a Value, visit: &mut F)
where
    F: FnMut(&'a Map<String, Value>),
{
    match value {
        Value::Object(map) => {
            visit(map);
            for child in map.values() {
                walk(child, visit);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, visit);
            }
        }
        _ => {}
    }
}

/// Tracks keyed by case-insensitive (title, artists)
///
/// A repeated key replaces the stored track but keeps its original position.
#[derive(Default)]
struct TrackSet {
    positions: HashMap<(String, Vec<String>), usize>,
    tracks: Vec<Track>,
}

impl TrackSet {
    fn insert(&mut self, track: Track) {
        match self.positions.entry(track.dedup_key()) {
            Entry::Occupied(slot) => self.tracks[*slot.get()] = track,
            Entry::Vacant(slot) => {
                slot.insert(self.tracks.len());
                self.tracks.push(track);
            }
        }
    }

    fn into_vec(self) -> Vec<Track> {
        self.tracks
    }
}

/// Decode HTML character references, named (full HTML5 table) and numeric
fn unescape_html(text: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(text)
}
