// Finding the clips of a batch: the regular files directly inside the input
// directory whose names match a `prefix*suffix` pattern, in name order.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// True when `name` matches `pattern`. A single `*` stands for any run of
/// characters; without one the whole name must match.
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            name.len() >= prefix.len() + suffix.len()
                && name.starts_with(prefix)
                && name.ends_with(suffix)
        }
        None => name == pattern,
    }
}

pub fn find_clips(input_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let mut clips = Vec::new();
    for entry in WalkDir::new(input_dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("failed to list {}", input_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if matches_pattern(&entry.file_name().to_string_lossy(), pattern) {
            clips.push(entry.into_path());
        }
    }
    clips.sort();
    Ok(clips)
}
