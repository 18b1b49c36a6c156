//! File utility functions

use std::path::PathBuf;

/// Expand a path string to an absolute path.
///
/// - `~` or `~/path` resolves against the home directory
/// - relative paths and bare names resolve against the current directory
/// - absolute paths pass through unchanged
///
/// Used for config file, database and pricing rule paths given on the
/// command line or in `requestlens.json`.
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }

    let expanded = if path == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(path))
    } else if let Some(rest) = path.strip_prefix("~/") {
        match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path),
        }
    } else {
        PathBuf::from(path)
    };

    if expanded.is_relative() {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    } else {
        expanded
    }
}
