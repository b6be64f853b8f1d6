//! yt-dlp process wrapper
//!
//! Used two ways: `--flat-playlist` enumeration for the flat resolver, and
//! search-and-transcode for the downloader.

use async_trait::async_trait;
use serde_json::Value;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::download::AudioFetcher;
use crate::error::{DownloadError, ResolveError};
use crate::spotify::Track;

/// Program name looked up on PATH when nothing else is configured
pub const DEFAULT_PROGRAM: &str = "yt-dlp";

/// Container the downloader transcodes to
pub const AUDIO_FORMAT: &str = "mp3";

/// Target bitrate passed to `--audio-quality`
pub const AUDIO_QUALITY: &str = "192K";

/// Handle on a yt-dlp executable
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: String,
}

impl YtDlp {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run `<program> --version`, returning the reported version
    pub async fn version(&self) -> anyhow::Result<String> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("{} is not available: {}", self.program, e))?;

        if !output.status.success() {
            anyhow::bail!("{} --version exited with {}", self.program, output.status);
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Enumerate a playlist without downloading, returning yt-dlp's info JSON
    pub async fn flat_playlist(&self, url: &str) -> Result<Value, ResolveError> {
        debug!("Running {} --flat-playlist for {}", self.program, url);

        let output = Command::new(&self.program)
            .arg("--flat-playlist")
            .arg("--dump-single-json")
            .arg("--skip-download")
            .arg("--no-warnings")
            .arg(url)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ResolveError::Extractor(format!("could not run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(ResolveError::Extractor(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                last_line(&output.stderr)
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ResolveError::Extractor(format!("unreadable playlist info: {}", e)))
    }
}

#[async_trait]
impl AudioFetcher for YtDlp {
    async fn fetch(&self, track: &Track, output_dir: &Path) -> Result<PathBuf, DownloadError> {
        let stem = track.filename();
        let template = output_dir.join(format!("{}.%(ext)s", stem));
        let target = output_dir.join(format!("{}.{}", stem, AUDIO_FORMAT));
        let search = search_directive(track);

        debug!("Running {} for '{}'", self.program, search);

        let output = Command::new(&self.program)
            .args(download_args(&search, &template))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| DownloadError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(DownloadError::Failed {
                status: output.status,
                detail: last_line(&output.stderr),
            });
        }

        if !target.exists() {
            return Err(DownloadError::MissingOutput(target.display().to_string()));
        }

        Ok(target)
    }
}

/// `ytsearch1:<query> audio`, the top search hit for the track
pub fn search_directive(track: &Track) -> String {
    format!("ytsearch1:{} audio", track.query())
}

/// Arguments for fetching best audio and transcoding to MP3
fn download_args(search: &str, output_template: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "--format",
        "bestaudio/best",
        "--no-playlist",
        "--no-warnings",
        "--no-progress",
        "--extract-audio",
        "--audio-format",
        AUDIO_FORMAT,
        "--audio-quality",
        AUDIO_QUALITY,
        "--output",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();

    args.push(output_template.as_os_str().to_owned());
    args.push(OsString::from(search));
    args
}

/// Last non-empty line of a process stream, which is where yt-dlp puts the
/// actual error
fn last_line(stream: &[u8]) -> String {
    String::from_utf8_lossy(stream)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .unwrap_or("no output")
        .to_string()
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shell stand-in for yt-dlp

    use std::fs;
    use std::path::{Path, PathBuf};

    /// Stub that answers `--flat-playlist` with a fixed playlist, creates the
    /// requested MP3 for searches, and fails any search mentioning "broken"
    const STUB_SCRIPT: &str = r#"#!/bin/sh
output=""
prev=""
last=""
for arg in "$@"; do
    if [ "$prev" = "--output" ]; then
        output="$arg"
    fi
    prev="$arg"
    last="$arg"
done
case " $* " in
    *" --version "*)
        echo "2024.01.01"
        exit 0
        ;;
    *" --flat-playlist "*)
        cat <<'JSON'
{"title": "Stub Mix", "entries": [
  {"track": "Song A", "artists": [{"name": "X"}]},
  {"title": "Song B", "uploader": "Y"},
  {}
]}
JSON
        exit 0
        ;;
esac
case "$last" in
    *broken*)
        echo "ERROR: no video found" >&2
        exit 1
        ;;
esac
target=$(printf '%s' "$output" | sed 's/%(ext)s$/mp3/')
: > "$target"
exit 0
"#;

    pub(crate) fn install_stub(dir: &Path) -> PathBuf {
        let script_path = dir.join("yt-dlp");
        fs::write(&script_path, STUB_SCRIPT).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&script_path).unwrap().permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&script_path, perms).unwrap();
        }
        script_path
    }
}
