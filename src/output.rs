use std::path::{Path, PathBuf};

use serde_json::json;

use crate::Transcript;
use crate::error::CaptionError;
use crate::mom::Mom;

/// Render transcript as plain text (one segment per line, no timestamps)
pub fn render_text(transcript: &Transcript) -> String {
    transcript
        .segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the flat JSON success shape consumed by downstream tooling.
pub fn render_json(transcript: &Transcript) -> String {
    let value = json!({
        "success": true,
        "text": transcript.text,
        "segments": transcript.segments,
        "duration": transcript.duration,
        "language": transcript.language,
        "auto_generated": transcript.auto_generated,
        "video_id": transcript.video_id,
    });
    serde_json::to_string_pretty(&value).unwrap_or_default()
}

/// Render the flat JSON failure shape for a caption pipeline error.
pub fn render_error_json(err: &CaptionError) -> String {
    let value = json!({
        "success": false,
        "error": err.kind(),
        "message": format!("{err}. {}", err.remediation()),
    });
    serde_json::to_string_pretty(&value).unwrap_or_default()
}

/// Render transcript as SubRip cues.
pub fn render_srt(transcript: &Transcript) -> String {
    let mut out = String::new();
    for (i, seg) in transcript.segments.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            srt_timestamp(seg.start),
            srt_timestamp(seg.end),
            seg.text
        ));
    }
    out
}

fn srt_timestamp(seconds: f64) -> String {
    let millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let h = millis / 3_600_000;
    let m = (millis % 3_600_000) / 60_000;
    let s = (millis % 60_000) / 1000;
    let ms = millis % 1000;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

/// Render a MOM document as Markdown; empty sections are omitted.
pub fn render_mom(mom: &Mom, title: &str) -> String {
    let mut out = format!("# Minutes of Meeting: {title}\n");

    if !mom.summary.is_empty() {
        out.push_str(&format!("\n## Summary\n\n{}\n", mom.summary));
    }
    push_section(&mut out, "Key Points", &mom.key_points);
    push_section(&mut out, "Decisions", &mom.decisions);
    push_section(&mut out, "Action Items", &mom.action_items);
    push_section(&mut out, "Open Questions", &mom.questions);
    push_section(&mut out, "Next Steps", &mom.next_steps);
    push_section(&mut out, "Attendees", &mom.attendees);

    out
}

/// Resolve the output file path for one transcript. With multiple inputs
/// the video ID is folded into the filename so later writes do not
/// clobber earlier ones.
pub fn per_video_path(base: &Path, video_id: &str, multi: bool) -> PathBuf {
    if !multi {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "transcript".to_string());
    match base.extension().and_then(|e| e.to_str()) {
        Some(ext) => base.with_file_name(format!("{stem}-{video_id}.{ext}")),
        None => base.with_file_name(format!("{stem}-{video_id}")),
    }
}

fn push_section(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("\n## {heading}\n\n"));
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Segment, TranscriptSource};

    fn sample_transcript() -> Transcript {
        Transcript::from_segments(
            "test1234567",
            "en",
            false,
            TranscriptSource::Caption,
            vec![
                Segment {
                    start: 0.0,
                    end: 1.5,
                    text: "Hello world".to_string(),
                },
                Segment {
                    start: 1.5,
                    end: 3.5,
                    text: "This is a test".to_string(),
                },
            ],
        )
    }

    #[test]
    fn test_render_text() {
        let t = sample_transcript();
        assert_eq!(render_text(&t), "Hello world\nThis is a test");
    }

    #[test]
    fn test_render_text_empty() {
        let t = Transcript::from_segments("empty123456", "en", false, TranscriptSource::Caption, vec![]);
        assert_eq!(render_text(&t), "");
    }

    #[test]
    fn test_render_json_shape() {
        let t = sample_transcript();
        let parsed: serde_json::Value = serde_json::from_str(&render_json(&t)).unwrap();
        assert_eq!(parsed["success"], true);
        assert_eq!(parsed["text"], "Hello world This is a test");
        assert_eq!(parsed["video_id"], "test1234567");
        assert_eq!(parsed["auto_generated"], false);
        assert_eq!(parsed["segments"].as_array().unwrap().len(), 2);
        assert!((parsed["duration"].as_f64().unwrap() - 3.5).abs() < f64::EPSILON);
        assert!((parsed["segments"][1]["end"].as_f64().unwrap() - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_render_error_json_shape() {
        let err = CaptionError::NoCaptions("abc12345678".to_string());
        let parsed: serde_json::Value = serde_json::from_str(&render_error_json(&err)).unwrap();
        assert_eq!(parsed["success"], false);
        assert_eq!(parsed["error"], "no_captions");
        assert!(parsed["message"].as_str().unwrap().contains("--audio"));
    }

    #[test]
    fn test_srt_timestamp() {
        assert_eq!(srt_timestamp(0.0), "00:00:00,000");
        assert_eq!(srt_timestamp(1.5), "00:00:01,500");
        assert_eq!(srt_timestamp(3661.042), "01:01:01,042");
    }

    #[test]
    fn test_render_srt() {
        let t = sample_transcript();
        let srt = render_srt(&t);
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:01,500\nHello world\n"));
        assert!(srt.contains("2\n00:00:01,500 --> 00:00:03,500\nThis is a test\n"));
    }

    #[test]
    fn test_per_video_path_single_input_unchanged() {
        let p = per_video_path(Path::new("out/meeting.json"), "abc12345678", false);
        assert_eq!(p, Path::new("out/meeting.json"));
    }

    #[test]
    fn test_per_video_path_multi_input_appends_video_id() {
        let p = per_video_path(Path::new("out/meeting.json"), "abc12345678", true);
        assert_eq!(p, Path::new("out/meeting-abc12345678.json"));

        let bare = per_video_path(Path::new("meeting"), "xyz98765432", true);
        assert_eq!(bare, Path::new("meeting-xyz98765432"));
    }

    #[test]
    fn test_render_mom_skips_empty_sections() {
        let mom = Mom {
            summary: "Quick sync.".to_string(),
            key_points: vec!["one".to_string(), "two".to_string()],
            ..Default::default()
        };
        let md = render_mom(&mom, "Standup");
        assert!(md.contains("# Minutes of Meeting: Standup"));
        assert!(md.contains("## Summary"));
        assert!(md.contains("- one"));
        assert!(!md.contains("## Decisions"));
        assert!(!md.contains("## Attendees"));
    }
}
