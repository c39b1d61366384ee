use std::path::{Path, PathBuf};
use std::process::Command;

use eyre::{Result, bail};
use log::debug;
use reqwest::multipart;

use crate::{Segment, Transcript, TranscriptSource};

/// Maximum file size for a single Whisper API upload (25 MB)
const MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

/// Whisper transcription model
#[derive(Debug, Clone, Default)]
pub enum WhisperModel {
    Gpt4oMiniTranscribe,
    Gpt4oTranscribe,
    #[default]
    Whisper1,
}

impl WhisperModel {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "gpt-4o-mini-transcribe" => Some(WhisperModel::Gpt4oMiniTranscribe),
            "gpt-4o-transcribe" => Some(WhisperModel::Gpt4oTranscribe),
            "whisper-1" => Some(WhisperModel::Whisper1),
            _ => None,
        }
    }

    fn api_name(&self) -> &str {
        match self {
            WhisperModel::Gpt4oMiniTranscribe => "gpt-4o-mini-transcribe",
            WhisperModel::Gpt4oTranscribe => "gpt-4o-transcribe",
            WhisperModel::Whisper1 => "whisper-1",
        }
    }

    fn response_format(&self) -> &str {
        match self {
            WhisperModel::Whisper1 => "verbose_json",
            // Newer transcribe models only support "json" or "text"
            _ => "json",
        }
    }

    fn supports_timestamp_granularities(&self) -> bool {
        matches!(self, WhisperModel::Whisper1)
    }
}

/// Transcribe an uploaded meeting recording via the Whisper API.
///
/// This is the manual fallback path for recordings that have no captions:
/// the file is already local, so there is no download step. Recordings
/// over the upload limit are chunked with ffmpeg and re-based afterwards.
pub async fn transcribe(
    client: &reqwest::Client,
    audio_path: &Path,
    lang: &str,
    model: &WhisperModel,
) -> Result<Transcript> {
    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| eyre::eyre!("OPENAI_API_KEY environment variable not set (required for audio transcription)"))?;

    if !audio_path.exists() {
        bail!("audio file not found: {}", audio_path.display());
    }

    let file_size = std::fs::metadata(audio_path)?.len();
    debug!("Audio file size: {file_size} bytes");

    let segments = if file_size > MAX_UPLOAD_BYTES {
        transcribe_chunked(client, &api_key, audio_path, model, lang).await?
    } else {
        transcribe_file(client, &api_key, audio_path, model, lang).await?
    };

    let recording_id = audio_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    Ok(Transcript::from_segments(
        &recording_id,
        lang,
        false,
        TranscriptSource::Whisper,
        segments,
    ))
}

fn audio_mime(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("wav") => "audio/wav",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("webm") => "audio/webm",
        _ => "audio/mpeg",
    }
}

async fn transcribe_file(
    client: &reqwest::Client,
    api_key: &str,
    audio_path: &Path,
    model: &WhisperModel,
    lang: &str,
) -> Result<Vec<Segment>> {
    debug!("Uploading {} to Whisper API", audio_path.display());

    let file_bytes = std::fs::read(audio_path)?;
    let file_name = audio_path.file_name().unwrap_or_default().to_string_lossy().to_string();

    let file_part = multipart::Part::bytes(file_bytes)
        .file_name(file_name)
        .mime_str(audio_mime(audio_path))?;

    let mut form = multipart::Form::new()
        .part("file", file_part)
        .text("model", model.api_name().to_string())
        .text("language", lang.to_string())
        .text("response_format", model.response_format().to_string());

    if model.supports_timestamp_granularities() {
        form = form.text("timestamp_granularities[]", "segment");
    }

    let resp = client
        .post("https://api.openai.com/v1/audio/transcriptions")
        .bearer_auth(api_key)
        .multipart(form)
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("Whisper API returned {status}: {body}");
    }

    let json: serde_json::Value = resp.json().await?;
    parse_whisper_response(&json)
}

fn parse_whisper_response(json: &serde_json::Value) -> Result<Vec<Segment>> {
    // verbose_json format has a "segments" array
    if let Some(segments) = json.get("segments").and_then(|s| s.as_array()) {
        return Ok(segments
            .iter()
            .filter_map(|seg| {
                let text = seg.get("text")?.as_str()?.trim().to_string();
                let start = seg.get("start")?.as_f64()?;
                let end = seg.get("end")?.as_f64()?;
                if text.is_empty() {
                    return None;
                }
                Some(Segment { start, end, text })
            })
            .collect());
    }

    // Fallback: plain text response
    if let Some(text) = json.get("text").and_then(|t| t.as_str()) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Ok(vec![]);
        }
        return Ok(vec![Segment {
            start: 0.0,
            end: 0.0,
            text,
        }]);
    }

    bail!("unexpected Whisper API response format");
}

/// Ask ffprobe for the recording's real duration in seconds.
fn probe_duration(audio_path: &Path) -> Option<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
            &audio_path.to_string_lossy(),
        ])
        .output()
        .ok()
        .filter(|o| o.status.success())?;

    parse_ffprobe_duration(&String::from_utf8_lossy(&output.stdout))
}

fn parse_ffprobe_duration(output: &str) -> Option<f64> {
    output.trim().parse::<f64>().ok().filter(|d| *d > 0.0)
}

async fn transcribe_chunked(
    client: &reqwest::Client,
    api_key: &str,
    audio_path: &Path,
    model: &WhisperModel,
    lang: &str,
) -> Result<Vec<Segment>> {
    // ~20 minute chunks stay under the upload limit at speech bitrates
    let chunk_duration_secs = 1200;
    let file_size = std::fs::metadata(audio_path)?.len();
    // Fall back to a 64kbps estimate when ffprobe is unavailable; the
    // estimate overshoots for higher bitrates, so the chunk loop also
    // stops on the first empty split
    let estimated_duration =
        probe_duration(audio_path).unwrap_or_else(|| file_size as f64 / (64_000.0 / 8.0));
    let num_chunks = (estimated_duration / chunk_duration_secs as f64).ceil() as usize;

    debug!("Splitting into {num_chunks} chunks of {chunk_duration_secs}s each");

    let ext = audio_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp3")
        .to_string();

    let mut all_segments = Vec::new();

    for i in 0..num_chunks {
        let offset = i as f64 * chunk_duration_secs as f64;
        let chunk_path = PathBuf::from(format!("/tmp/momx-chunk-{i}.{ext}"));

        let status = Command::new("ffmpeg")
            .args([
                "-y",
                "-i",
                &audio_path.to_string_lossy(),
                "-ss",
                &format!("{offset}"),
                "-t",
                &format!("{chunk_duration_secs}"),
                "-acodec",
                "copy",
                &chunk_path.to_string_lossy(),
            ])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status();

        match status {
            Ok(s) if s.success() => {}
            Ok(s) => bail!("ffmpeg failed to split audio at offset {offset}s (status {s})"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                bail!(
                    "ffmpeg not found. Install it to transcribe recordings over 25 MB:\n  \
                     apt install ffmpeg\n  \
                     or: brew install ffmpeg"
                );
            }
            Err(e) => bail!("failed to run ffmpeg: {e}"),
        }

        // A split past end-of-file comes back empty; stop instead of
        // uploading a zero-length chunk
        let chunk_size = std::fs::metadata(&chunk_path).map(|m| m.len()).unwrap_or(0);
        if chunk_size == 0 {
            let _ = std::fs::remove_file(&chunk_path);
            break;
        }

        let mut segments = transcribe_file(client, api_key, &chunk_path, model, lang).await?;

        // Re-base chunk timestamps onto the full recording
        for seg in &mut segments {
            seg.start += offset;
            seg.end += offset;
        }
        all_segments.extend(segments);

        let _ = std::fs::remove_file(&chunk_path);
    }

    Ok(all_segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whisper_response_verbose_json() {
        let json = serde_json::json!({
            "text": "Hello world. This is a test.",
            "segments": [
                {
                    "id": 0,
                    "start": 0.0,
                    "end": 1.5,
                    "text": " Hello world."
                },
                {
                    "id": 1,
                    "start": 1.5,
                    "end": 3.0,
                    "text": " This is a test."
                }
            ]
        });

        let segments = parse_whisper_response(&json).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Hello world.");
        assert!((segments[0].start - 0.0).abs() < f64::EPSILON);
        assert!((segments[0].end - 1.5).abs() < f64::EPSILON);
        assert_eq!(segments[1].text, "This is a test.");
    }

    #[test]
    fn test_parse_whisper_response_plain_text() {
        let json = serde_json::json!({
            "text": "Just plain text."
        });

        let segments = parse_whisper_response(&json).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "Just plain text.");
    }

    #[test]
    fn test_parse_whisper_response_empty_segments() {
        let json = serde_json::json!({
            "text": "",
            "segments": [
                {
                    "id": 0,
                    "start": 0.0,
                    "end": 1.0,
                    "text": ""
                }
            ]
        });

        let segments = parse_whisper_response(&json).unwrap();
        assert!(segments.is_empty());
    }

    #[test]
    fn test_parse_whisper_response_unexpected() {
        let json = serde_json::json!({"error": "nope"});
        assert!(parse_whisper_response(&json).is_err());
    }

    #[test]
    fn test_whisper_model_api_names() {
        assert_eq!(WhisperModel::Gpt4oMiniTranscribe.api_name(), "gpt-4o-mini-transcribe");
        assert_eq!(WhisperModel::Gpt4oTranscribe.api_name(), "gpt-4o-transcribe");
        assert_eq!(WhisperModel::Whisper1.api_name(), "whisper-1");
    }

    #[test]
    fn test_whisper_model_from_name_round_trip() {
        for name in ["gpt-4o-mini-transcribe", "gpt-4o-transcribe", "whisper-1"] {
            assert_eq!(WhisperModel::from_name(name).unwrap().api_name(), name);
        }
        assert!(WhisperModel::from_name("gpt-5").is_none());
    }

    #[test]
    fn test_parse_ffprobe_duration() {
        assert_eq!(parse_ffprobe_duration("4523.901000\n"), Some(4523.901));
        assert_eq!(parse_ffprobe_duration("1200"), Some(1200.0));
        assert_eq!(parse_ffprobe_duration("N/A\n"), None);
        assert_eq!(parse_ffprobe_duration(""), None);
        assert_eq!(parse_ffprobe_duration("0.0"), None);
    }

    #[test]
    fn test_audio_mime() {
        assert_eq!(audio_mime(Path::new("meeting.wav")), "audio/wav");
        assert_eq!(audio_mime(Path::new("meeting.m4a")), "audio/mp4");
        assert_eq!(audio_mime(Path::new("meeting.mp3")), "audio/mpeg");
        assert_eq!(audio_mime(Path::new("meeting")), "audio/mpeg");
    }
}
