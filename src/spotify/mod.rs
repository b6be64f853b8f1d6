//! Spotify playlist resolution without the official API

pub mod flat;
pub mod models;
pub mod reference;
pub mod resolver;
pub mod scrape;

pub use models::{ResolvedPlaylist, Track};
pub use reference::extract_playlist_id;
pub use resolver::Strategy;
