use std::time::Duration;

use log::debug;
use scraper::{Html, Selector};
use serde::Deserialize;

use crate::error::CaptionError;
use crate::{Segment, Transcript, TranscriptSource};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

// Caption availability in the embedded player config varies by locale
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

const CAPTION_TRACKS_MARKER: &str = "\"captionTracks\":";

/// Per-request bound for both YouTube fetches
const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Default caption language preference order
pub const DEFAULT_LANGUAGES: &[&str] = &["en", "en-US", "en-GB"];

/// One selectable caption stream for a video.
///
/// `fetch_url` values are time-limited; tracks are used within the
/// request that discovered them and never persisted.
#[derive(Debug, Clone)]
pub struct CaptionTrack {
    pub language_code: String,
    pub is_auto_generated: bool,
    pub fetch_url: String,
}

#[derive(Debug, Deserialize)]
struct RawCaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
    kind: Option<String>,
}

impl From<RawCaptionTrack> for CaptionTrack {
    fn from(raw: RawCaptionTrack) -> Self {
        CaptionTrack {
            is_auto_generated: raw.kind.as_deref() == Some("asr"),
            language_code: raw.language_code,
            fetch_url: raw.base_url,
        }
    }
}

pub fn default_languages() -> Vec<String> {
    DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect()
}

/// Fetch the caption transcript for one video.
///
/// Sequential pipeline: discover tracks on the watch page, pick one by
/// language preference, fetch and parse its timedtext document, then
/// aggregate. The first failing stage short-circuits.
pub async fn fetch_captions(
    client: &reqwest::Client,
    video_id: &str,
    languages: &[String],
) -> Result<Transcript, CaptionError> {
    let tracks = discover_tracks(client, video_id).await?;

    let track = select_track(&tracks, languages)
        .ok_or_else(|| CaptionError::NoMatchingLanguage(languages.join(", ")))?;
    debug!(
        "Using caption track: lang={} asr={}",
        track.language_code, track.is_auto_generated
    );

    let segments = fetch_timedtext(client, &track.fetch_url).await?;

    Ok(Transcript::from_segments(
        video_id,
        &track.language_code,
        track.is_auto_generated,
        TranscriptSource::Caption,
        segments,
    ))
}

/// Discover available caption tracks by scraping the public watch page.
///
/// The track list lives in an inline player-config script under the
/// "captionTracks" key. The page layout is unversioned; any shape we do
/// not recognize is reported as NoCaptions rather than a parse error.
pub async fn discover_tracks(
    client: &reqwest::Client,
    video_id: &str,
) -> Result<Vec<CaptionTrack>, CaptionError> {
    let watch_url = format!("https://www.youtube.com/watch?v={video_id}");
    debug!("Fetching watch page: {watch_url}");

    let page_html = client
        .get(&watch_url)
        .header("User-Agent", USER_AGENT)
        .header("Accept-Language", ACCEPT_LANGUAGE)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await
        .map_err(|e| CaptionError::FetchFailed(format!("watch page request: {e}")))?
        .error_for_status()
        .map_err(|e| CaptionError::FetchFailed(format!("watch page: {e}")))?
        .text()
        .await
        .map_err(|e| CaptionError::FetchFailed(format!("watch page body: {e}")))?;

    let tracks = tracks_from_page(&page_html, video_id)?;
    debug!("Found {} caption tracks", tracks.len());

    Ok(tracks)
}

/// Interpret a fetched watch-page body: the track list, or NoCaptions
/// when the marker is absent or unreadable.
fn tracks_from_page(page_html: &str, video_id: &str) -> Result<Vec<CaptionTrack>, CaptionError> {
    extract_caption_tracks(page_html).ok_or_else(|| CaptionError::NoCaptions(video_id.to_string()))
}

/// Locate and decode the "captionTracks" array inside the watch page.
///
/// Walks the document's script elements for the marker, then slices the
/// balanced JSON array out of the payload before handing it to serde.
fn extract_caption_tracks(html: &str) -> Option<Vec<CaptionTrack>> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script").ok()?;

    for script in document.select(&selector) {
        let payload: String = script.text().collect();
        let Some(idx) = payload.find(CAPTION_TRACKS_MARKER) else {
            continue;
        };
        let rest = &payload[idx + CAPTION_TRACKS_MARKER.len()..];
        let Some(json) = scan_json_array(rest) else {
            continue;
        };
        if let Ok(raw) = serde_json::from_str::<Vec<RawCaptionTrack>>(json) {
            return Some(raw.into_iter().map(CaptionTrack::from).collect());
        }
    }

    None
}

/// Slice the balanced JSON array starting at the first '[' in `input`.
///
/// Tracks string and escape state so brackets inside track names or URLs
/// do not terminate the scan early.
fn scan_json_array(input: &str) -> Option<&str> {
    let start = input.find('[')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in input.as_bytes().iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&input[start..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Pick one caption track by the two-pass language policy.
///
/// Pass 1 takes the first preferred language with a manual (non-ASR)
/// track; pass 2 takes the first preferred language with any track.
/// Within a language the first-listed track wins, so selection is
/// deterministic for a given track list.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    for lang in languages {
        if let Some(track) = tracks
            .iter()
            .find(|t| t.language_code == *lang && !t.is_auto_generated)
        {
            return Some(track);
        }
    }

    for lang in languages {
        if let Some(track) = tracks.iter().find(|t| t.language_code == *lang) {
            return Some(track);
        }
    }

    None
}

/// Fetch and parse one caption track's timedtext document.
pub async fn fetch_timedtext(client: &reqwest::Client, url: &str) -> Result<Vec<Segment>, CaptionError> {
    debug!("Fetching timedtext document");

    let xml = client
        .get(url)
        .header("User-Agent", USER_AGENT)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await
        .map_err(|e| CaptionError::FetchFailed(format!("timedtext request: {e}")))?
        .error_for_status()
        .map_err(|e| CaptionError::FetchFailed(format!("timedtext: {e}")))?
        .text()
        .await
        .map_err(|e| CaptionError::FetchFailed(format!("timedtext body: {e}")))?;

    parse_timedtext(&xml).map_err(|e| CaptionError::FetchFailed(format!("timedtext parse: {e}")))
}

/// Parse a timedtext XML document into ordered caption segments.
///
/// Each `<text start="S" dur="D">` element becomes one segment with
/// `end = start + dur` (`dur` defaults to 0 when absent). Text content
/// is entity-decoded and whitespace-normalized; segments that come out
/// empty are dropped. Document order is preserved.
fn parse_timedtext(xml: &str) -> eyre::Result<Vec<Segment>> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    // (start, dur) of the currently open <text> element
    let mut current: Option<(f64, f64)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                let mut start = None;
                let mut dur = 0.0_f64;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"start" => {
                            start = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                        }
                        b"dur" => {
                            dur = String::from_utf8_lossy(&attr.value).parse::<f64>().unwrap_or(0.0);
                        }
                        _ => {}
                    }
                }
                current = start.map(|s| (s, dur));
            }
            Ok(Event::Text(ref e)) => {
                if let Some((start, dur)) = current.take() {
                    let raw = e
                        .unescape()
                        .map(|s| s.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(e).into_owned());
                    let text = normalize_text(&raw);
                    if !text.is_empty() {
                        segments.push(Segment {
                            start,
                            end: start + dur,
                            text,
                        });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => eyre::bail!("error parsing timedtext XML: {e}"),
            _ => {}
        }
    }

    Ok(segments)
}

/// Decode HTML entities, collapse whitespace runs to single spaces, trim.
fn normalize_text(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
