//! M3U playlist generation

/// Generate an M3U playlist file content
///
/// Entries are relative paths (just filenames) so the playlist keeps working
/// when the output directory is moved or copied to a player.
pub fn generate_m3u(name: &str, tracks: &[String]) -> String {
    let mut content = String::from("#EXTM3U\n");
    let name = name.trim();
    if !name.is_empty() {
        content.push_str("#PLAYLIST:");
        content.push_str(name);
        content.push('\n');
    }
    for track in tracks {
        content.push_str(track);
        content.push('\n');
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_m3u_empty() {
        let result = generate_m3u("", &[]);
        assert_eq!(result, "#EXTM3U\n");
    }

    #[test]
    fn test_generate_m3u_tracks() {
        let tracks = vec![
            "X - Song A.mp3".to_string(),
            "Y - Song B.mp3".to_string(),
        ];
        let result = generate_m3u("Road Trip", &tracks);
        assert_eq!(
            result,
            "#EXTM3U\n#PLAYLIST:Road Trip\nX - Song A.mp3\nY - Song B.mp3\n"
        );
    }
}
