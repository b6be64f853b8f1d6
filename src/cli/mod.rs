//! CLI module for tunegrab

use clap::Parser;
use std::path::PathBuf;

pub mod commands;

use crate::config::Overrides;
use crate::spotify::Strategy;

#[derive(Parser, Debug)]
#[command(
    name = "tunegrab",
    about = "Download the tracks of a public Spotify playlist as MP3, no API credentials needed"
)]
#[command(version)]
pub struct Cli {
    /// Spotify playlist URL or ID
    #[arg(value_name = "PLAYLIST", required_unless_present = "completions")]
    pub playlist: Option<String>,

    /// Base output directory; files go to <OUTPUT>/<playlist-id> [default: downloads]
    #[arg(short, long, value_name = "DIR", env = "TUNEGRAB_OUTPUT")]
    pub output: Option<PathBuf>,

    /// How to read the playlist [default: auto]
    #[arg(short, long, env = "TUNEGRAB_STRATEGY")]
    pub strategy: Option<Strategy>,

    /// yt-dlp executable to use [default: yt-dlp]
    #[arg(long = "yt-dlp", value_name = "PATH", env = "TUNEGRAB_YTDLP")]
    pub ytdlp: Option<String>,

    /// Resolve and list tracks without downloading
    #[arg(long)]
    pub dry_run: bool,

    /// Don't write playlist.m3u
    #[arg(long)]
    pub no_m3u: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Print shell completions and exit
    #[arg(long, value_name = "SHELL")]
    pub completions: Option<clap_complete::Shell>,
}

impl Cli {
    /// Settings given on the command line (or via environment)
    pub fn overrides(&self) -> Overrides {
        Overrides {
            output_dir: self.output.clone(),
            strategy: self.strategy,
            ytdlp_path: self.ytdlp.clone(),
            no_m3u: self.no_m3u,
        }
    }
}
