//! Filename sanitization utilities

/// Longest filename stem (in characters) produced by [`sanitize_filename`]
pub const MAX_FILENAME_CHARS: usize = 180;

/// Sanitize a filename stem for safe filesystem usage
///
/// Every character that is reserved on at least one major filesystem
/// (`\ / : * ? " < > |`, plus NUL) becomes `_`. The result is trimmed and
/// then capped at [`MAX_FILENAME_CHARS`] characters. The mapping is pure, so
/// the same input always lands on the same file, which is what the
/// skip-if-exists check relies on.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' => '_',
            _ => c,
        })
        .collect();

    cleaned.trim().chars().take(MAX_FILENAME_CHARS).collect()
}
