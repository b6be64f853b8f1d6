//! Utility functions

mod m3u;
mod sanitize;

pub use m3u::generate_m3u;
pub use sanitize::sanitize_filename;
