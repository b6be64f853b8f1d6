//! Track download module

pub mod downloader;
pub mod manifest;
pub mod storage;

pub use downloader::{AudioFetcher, Downloader};
pub use manifest::DownloadManifest;
pub use storage::OutputDir;
