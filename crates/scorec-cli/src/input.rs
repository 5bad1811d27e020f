//! Loading music models from TOML files

use crate::error::Result;
use scorec_core::Music;
use std::fs;
use std::path::Path;

/// Read and deserialize a music model
pub fn load_music(path: &Path) -> Result<Music> {
    let content = fs::read_to_string(path)?;
    let music: Music = toml::from_str(&content)?;
    log::debug!(
        "Loaded '{}' from {}: {} patterns, {} tracks",
        music.name,
        path.display(),
        music.patterns.len(),
        music.tracks.len()
    );
    Ok(music)
}
