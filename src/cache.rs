use std::path::{Path, PathBuf};

use eyre::Result;
use log::debug;

use crate::Transcript;

fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("momx")
        .join("transcripts")
}

fn cache_path_in(base: &Path, video_id: &str, lang: &str) -> PathBuf {
    base.join(format!("{video_id}-{lang}.json"))
}

/// Load a cached transcript, if available. Corrupt entries are misses.
pub fn load(video_id: &str, lang: &str) -> Option<Transcript> {
    load_from(&cache_dir(), video_id, lang)
}

fn load_from(base: &Path, video_id: &str, lang: &str) -> Option<Transcript> {
    let path = cache_path_in(base, video_id, lang);
    let data = std::fs::read_to_string(&path).ok()?;
    let transcript: Transcript = serde_json::from_str(&data).ok()?;
    debug!("Cache hit: {}", path.display());
    Some(transcript)
}

/// Save a transcript to the cache, keyed by the requested language.
pub fn save(transcript: &Transcript, lang: &str) -> Result<()> {
    save_in(&cache_dir(), transcript, lang)
}

fn save_in(base: &Path, transcript: &Transcript, lang: &str) -> Result<()> {
    let path = cache_path_in(base, &transcript.video_id, lang);
    std::fs::create_dir_all(path.parent().unwrap())?;
    let data = serde_json::to_string_pretty(transcript)?;
    std::fs::write(&path, data)?;
    debug!("Cached transcript: {}", path.display());
    Ok(())
}
