use eyre::{Result, bail};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

const MOM_SYSTEM_PROMPT: &str = "You are a meeting assistant that writes minutes of meeting from transcripts. \
Respond with a single JSON object with these fields: summary (string), key_points, decisions, action_items, \
questions, next_steps, attendees (each an array of strings). Use an empty array when a section does not apply. \
Respond with JSON only, no prose and no code fences.";

const CLEANUP_SYSTEM_PROMPT: &str = "You are a transcript editor. Fix transcription errors, add proper \
punctuation, and break into paragraphs. Preserve all original meaning and content. Do not summarize or \
change words unless they are clearly transcription errors.";

/// Transcripts shorter than this are returned from cleanup unchanged
const MIN_CLEANUP_CHARS: usize = 100;

/// Structured minutes-of-meeting document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Mom {
    pub summary: String,
    pub key_points: Vec<String>,
    pub decisions: Vec<String>,
    pub action_items: Vec<String>,
    pub questions: Vec<String>,
    pub next_steps: Vec<String>,
    pub attendees: Vec<String>,
}

/// Generate a structured MOM document from a transcript via an LLM.
pub async fn generate_mom(
    client: &reqwest::Client,
    transcript_text: &str,
    title: &str,
    model: &str,
) -> Result<Mom> {
    let user_message = format!("Produce minutes of meeting for \"{title}\" from this transcript:\n\n{transcript_text}");

    let reply = if is_anthropic_model(model) {
        complete_anthropic(client, MOM_SYSTEM_PROMPT, &user_message, model).await?
    } else {
        complete_openai(client, MOM_SYSTEM_PROMPT, &user_message, model).await?
    };

    parse_mom_reply(&reply)
}

/// Clean up an auto-generated caption transcript via an LLM.
///
/// Manual captions never pass through here; they are assumed high
/// quality. A cleanup failure degrades to the original text.
pub async fn clean_transcript(client: &reqwest::Client, text: &str, model: &str) -> String {
    if text.len() < MIN_CLEANUP_CHARS {
        return text.to_string();
    }

    debug!("Cleaning auto-generated transcript with {model}");
    let user_message = format!("Fix this auto-generated transcript:\n\n{text}");

    let result = if is_anthropic_model(model) {
        complete_anthropic(client, CLEANUP_SYSTEM_PROMPT, &user_message, model).await
    } else {
        complete_openai(client, CLEANUP_SYSTEM_PROMPT, &user_message, model).await
    };

    match result {
        Ok(cleaned) => cleaned,
        Err(e) => {
            warn!("Transcript cleanup failed, using original text: {e}");
            text.to_string()
        }
    }
}

fn parse_mom_reply(reply: &str) -> Result<Mom> {
    let payload = strip_code_fences(reply);
    serde_json::from_str(payload).map_err(|e| eyre::eyre!("LLM returned malformed MOM JSON: {e}"))
}

fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

fn is_anthropic_model(model: &str) -> bool {
    model.starts_with("claude")
}

async fn complete_anthropic(
    client: &reqwest::Client,
    system: &str,
    user_message: &str,
    model: &str,
) -> Result<String> {
    let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
        eyre::eyre!("ANTHROPIC_API_KEY environment variable not set (required for Claude models)")
    })?;

    debug!("Calling Anthropic API with model {model}");

    let body = serde_json::json!({
        "model": model,
        "max_tokens": 4096,
        "system": system,
        "messages": [
            {
                "role": "user",
                "content": user_message
            }
        ]
    });

    let resp = client
        .post("https://api.anthropic.com/v1/messages")
        .header("x-api-key", &api_key)
        .header("anthropic-version", "2023-06-01")
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("Anthropic API returned {status}: {body}");
    }

    let json: serde_json::Value = resp.json().await?;
    extract_anthropic_text(&json)
}

fn extract_anthropic_text(json: &serde_json::Value) -> Result<String> {
    if let Some(content) = json.get("content").and_then(|c| c.as_array()) {
        let text: String = content
            .iter()
            .filter_map(|block| {
                if block.get("type")?.as_str()? == "text" {
                    block.get("text")?.as_str().map(|s| s.to_string())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");
        if !text.is_empty() {
            return Ok(text);
        }
    }
    bail!("unexpected Anthropic API response format");
}

async fn complete_openai(
    client: &reqwest::Client,
    system: &str,
    user_message: &str,
    model: &str,
) -> Result<String> {
    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| eyre::eyre!("OPENAI_API_KEY environment variable not set (required for OpenAI models)"))?;

    debug!("Calling OpenAI API with model {model}");

    let body = serde_json::json!({
        "model": model,
        "messages": [
            {
                "role": "system",
                "content": system
            },
            {
                "role": "user",
                "content": user_message
            }
        ]
    });

    let resp = client
        .post("https://api.openai.com/v1/chat/completions")
        .bearer_auth(&api_key)
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("OpenAI API returned {status}: {body}");
    }

    let json: serde_json::Value = resp.json().await?;
    extract_openai_text(&json)
}

fn extract_openai_text(json: &serde_json::Value) -> Result<String> {
    if let Some(text) = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
    {
        return Ok(text.to_string());
    }
    bail!("unexpected OpenAI API response format");
}
