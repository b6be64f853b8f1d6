//! Playlist reference parsing
//!
//! A reference is either a bare playlist ID or any URL of the shape
//! `https://open.spotify.com/playlist/<id>?si=...`.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::ResolveError;

/// Base URL for public playlist pages
pub const PLAYLIST_URL_BASE: &str = "https://open.spotify.com/playlist/";

const PLAYLIST_URL_MARKER: &str = "spotify.com/playlist/";

static PLAYLIST_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"playlist/([a-zA-Z0-9]+)").expect("valid playlist id pattern"));

/// Extract the playlist ID from a URL, or return a bare ID unchanged
pub fn extract_playlist_id(reference: &str) -> Result<String, ResolveError> {
    let reference = reference.trim();

    if reference.contains(PLAYLIST_URL_MARKER) {
        return PLAYLIST_ID_RE
            .captures(reference)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ResolveError::InvalidReference(reference.to_string()));
    }

    Ok(reference.to_string())
}

/// Turn a reference into a fetchable URL
///
/// Anything already starting with `http://` or `https://` is passed through.
pub fn normalize_playlist_url(reference: &str) -> Result<String, ResolveError> {
    let reference = reference.trim();

    if reference.starts_with("http://") || reference.starts_with("https://") {
        return Ok(reference.to_string());
    }

    Ok(format!("{}{}", PLAYLIST_URL_BASE, extract_playlist_id(reference)?))
}
