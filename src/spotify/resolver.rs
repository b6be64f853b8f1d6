//! Resolver capability and strategy selection

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::flat::FlatExtractionResolver;
use super::models::ResolvedPlaylist;
use super::scrape::PageScrapeResolver;
use crate::error::ResolveError;
use crate::ytdlp::YtDlp;

/// Anything that can turn a playlist reference into a track list
#[async_trait]
pub trait PlaylistResolver: Send + Sync {
    /// Short label for logs
    fn name(&self) -> &'static str;

    async fn resolve(&self, reference: &str) -> Result<ResolvedPlaylist, ResolveError>;
}

/// Which resolution strategy to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Scrape the public page, fall back to yt-dlp flat extraction
    #[default]
    Auto,
    /// Scrape the embedded JSON of the public playlist page
    Scrape,
    /// Enumerate the playlist with yt-dlp --flat-playlist
    Flat,
}

impl Strategy {
    /// Build the resolver for this strategy
    pub fn build(self, ytdlp: YtDlp, timeout: Duration) -> anyhow::Result<Box<dyn PlaylistResolver>> {
        let resolver: Box<dyn PlaylistResolver> = match self {
            Strategy::Scrape => Box::new(PageScrapeResolver::new(timeout)?),
            Strategy::Flat => Box::new(FlatExtractionResolver::new(ytdlp)),
            Strategy::Auto => {
                let scrape: Box<dyn PlaylistResolver> = Box::new(PageScrapeResolver::new(timeout)?);
                let flat: Box<dyn PlaylistResolver> = Box::new(FlatExtractionResolver::new(ytdlp));
                Box::new(ChainResolver::new(vec![scrape, flat]))
            }
        };
        Ok(resolver)
    }
}

/// Tries resolvers in order until one yields tracks
///
/// An empty-but-successful result is kept and returned if nothing later does
/// better. If every resolver errors, the last error is returned.
pub struct ChainResolver {
    resolvers: Vec<Box<dyn PlaylistResolver>>,
}

impl ChainResolver {
    pub fn new(resolvers: Vec<Box<dyn PlaylistResolver>>) -> Self {
        Self { resolvers }
    }
}

#[async_trait]
impl PlaylistResolver for ChainResolver {
    fn name(&self) -> &'static str {
        "chain"
    }

    async fn resolve(&self, reference: &str) -> Result<ResolvedPlaylist, ResolveError> {
        let mut empty: Option<ResolvedPlaylist> = None;
        let mut last_error: Option<ResolveError> = None;

        for resolver in &self.resolvers {
            debug!("Resolving with {} strategy", resolver.name());
            match resolver.resolve(reference).await {
                Ok(playlist) if !playlist.is_empty() => return Ok(playlist),
                Ok(playlist) => {
                    warn!("{} strategy found no tracks", resolver.name());
                    empty.get_or_insert(playlist);
                }
                // A malformed reference fails the same way everywhere
                Err(e @ ResolveError::InvalidReference(_)) => return Err(e),
                Err(e) => {
                    warn!("{} strategy failed: {}", resolver.name(), e);
                    last_error = Some(e);
                }
            }
        }

        match (empty, last_error) {
            (Some(playlist), _) => Ok(playlist),
            (None, Some(e)) => Err(e),
            (None, None) => Err(ResolveError::Extractor("no resolvers configured".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spotify::Track;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Outcome {
        Tracks(usize),
        Fail,
        Invalid,
    }

    struct FakeResolver {
        label: &'static str,
        outcome: Outcome,
        calls: Arc<AtomicUsize>,
    }

    impl FakeResolver {
        fn boxed(label: &'static str, outcome: Outcome) -> Box<dyn PlaylistResolver> {
            Self::counted(label, outcome, Arc::default())
        }

        fn counted(
            label: &'static str,
            outcome: Outcome,
            calls: Arc<AtomicUsize>,
        ) -> Box<dyn PlaylistResolver> {
            Box::new(Self {
                label,
                outcome,
                calls,
            })
        }
    }

    #[async_trait]
    impl PlaylistResolver for FakeResolver {
        fn name(&self) -> &'static str {
            self.label
        }

        async fn resolve(&self, reference: &str) -> Result<ResolvedPlaylist, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                Outcome::Tracks(n) => Ok(ResolvedPlaylist {
                    id: reference.to_string(),
                    name: self.label.to_string(),
                    tracks: (0..n)
                        .map(|i| Track::new(&format!("Song {i}"), ["X"]).unwrap())
                        .collect(),
                }),
                Outcome::Fail => Err(ResolveError::Parse(format!("{} failed", self.label))),
                Outcome::Invalid => Err(ResolveError::InvalidReference(reference.to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_chain_returns_first_non_empty() {
        let chain = ChainResolver::new(vec![
            FakeResolver::boxed("first", Outcome::Fail),
            FakeResolver::boxed("second", Outcome::Tracks(2)),
            FakeResolver::boxed("third", Outcome::Tracks(5)),
        ]);

        let playlist = chain.resolve("abc").await.unwrap();
        assert_eq!(playlist.name, "second");
        assert_eq!(playlist.track_count(), 2);
    }

    #[tokio::test]
    async fn test_chain_falls_back_past_empty_result() {
        let chain = ChainResolver::new(vec![
            FakeResolver::boxed("scrape", Outcome::Tracks(0)),
            FakeResolver::boxed("flat", Outcome::Tracks(1)),
        ]);

        let playlist = chain.resolve("abc").await.unwrap();
        assert_eq!(playlist.name, "flat");
    }

    #[tokio::test]
    async fn test_chain_keeps_empty_result_over_later_error() {
        let chain = ChainResolver::new(vec![
            FakeResolver::boxed("scrape", Outcome::Tracks(0)),
            FakeResolver::boxed("flat", Outcome::Fail),
        ]);

        let playlist = chain.resolve("abc").await.unwrap();
        assert!(playlist.is_empty());
        assert_eq!(playlist.name, "scrape");
    }

    #[tokio::test]
    async fn test_chain_reports_last_error() {
        let chain = ChainResolver::new(vec![
            FakeResolver::boxed("scrape", Outcome::Fail),
            FakeResolver::boxed("flat", Outcome::Fail),
        ]);

        let err = chain.resolve("abc").await.unwrap_err();
        assert_eq!(err.to_string(), "flat failed");
    }

    #[tokio::test]
    async fn test_chain_stops_at_invalid_reference() {
        let later_calls = Arc::new(AtomicUsize::new(0));
        let chain = ChainResolver::new(vec![
            FakeResolver::boxed("scrape", Outcome::Invalid),
            FakeResolver::counted("flat", Outcome::Tracks(3), later_calls.clone()),
        ]);

        let err = chain.resolve("abc").await.unwrap_err();
        assert!(matches!(err, ResolveError::InvalidReference(_)));
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_strategy_deserializes_lowercase() {
        let strategy: Strategy = serde_json::from_str("\"flat\"").unwrap();
        assert_eq!(strategy, Strategy::Flat);
        assert_eq!(Strategy::default(), Strategy::Auto);
    }
}
