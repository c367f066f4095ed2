use crate::types::Result;
use std::fs;
use std::path::Path;
use tracing::info;

/// Loads the watched-url list: one url per line, each line trimmed,
/// blank lines skipped. Duplicates are kept as-is (wasteful but allowed)
/// and no url validation happens here; a bad line fails at fetch time.
pub fn load_watchlist(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    info!("Loaded {} watched urls from {}", urls.len(), path.display());
    Ok(urls)
}
