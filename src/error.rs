//! Domain error types
//!
//! Resolution errors abort the run; download errors are per track and only
//! ever logged.

use std::process::ExitStatus;
use thiserror::Error;

/// Failure to turn a playlist reference into a track list
#[derive(Debug, Error)]
pub enum ResolveError {
    /// URL looked like a playlist link but carried no usable ID
    #[error("could not extract a playlist ID from '{0}'")]
    InvalidReference(String),

    /// Transport-level failure (DNS, connect, timeout, body read)
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Server answered with a non-success status
    #[error("fetching {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// Page fetched but the embedded data could not be read
    #[error("{0}")]
    Parse(String),

    /// The flat-playlist extractor failed or produced unreadable output
    #[error("media extractor failed: {0}")]
    Extractor(String),
}

/// Failure to fetch and transcode a single track
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("could not start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("download tool exited with {status}: {detail}")]
    Failed { status: ExitStatus, detail: String },

    #[error("download finished but {0} was not created")]
    MissingOutput(String),
}
