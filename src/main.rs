use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use eyre::{Result, bail};
use log::{debug, info};

mod cli;

use cli::{Cli, OutputFormat};
use momx::Transcript;
use momx::error::CaptionError;
use momx::whisper::WhisperModel;

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("momx.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("momx")
        .join("logs")
}

fn tool_version(name: &str) -> Option<String> {
    Command::new(name)
        .arg("-version")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| {
            String::from_utf8_lossy(&o.stdout)
                .trim()
                .lines()
                .next()
                .unwrap_or("")
                .to_string()
        })
}

fn build_after_help() -> String {
    let ffmpeg = tool_version("ffmpeg");

    let ffmpeg_line = match &ffmpeg {
        Some(v) => format!("  \x1b[32m✅\x1b[0m ffmpeg     {v}"),
        None => "  \x1b[31m❌\x1b[0m ffmpeg     (not found; needed to chunk recordings over 25 MB)".to_string(),
    };

    let log_path = log_dir().join("momx.log");

    format!(
        "\nOPTIONAL TOOLS:\n{ffmpeg_line}\n\nLogs are written to: {}",
        log_path.display()
    )
}

/// Retry an async operation with exponential backoff.
///
/// Used for Whisper and LLM calls only; the caption pipeline reports a
/// single tagged failure instead of retrying.
async fn retry<F, Fut, T>(max_attempts: u32, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..max_attempts {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                if attempt + 1 < max_attempts {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    debug!("Attempt {} failed: {e}, retrying in {delay:?}", attempt + 1);
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap())
}

fn parse_format(name: &str) -> Option<OutputFormat> {
    match name {
        "text" => Some(OutputFormat::Text),
        "json" => Some(OutputFormat::Json),
        "srt" => Some(OutputFormat::Srt),
        _ => None,
    }
}

/// Caption pipeline for one URL: extract the video ID, check the cache,
/// run the sequential fetch. Failures come back as data.
async fn fetch_transcript(
    client: &reqwest::Client,
    url_input: &str,
    langs: &[String],
    no_cache: bool,
) -> Result<Transcript, CaptionError> {
    let video_id = momx::extract_video_id(url_input).ok_or(CaptionError::InvalidUrl)?;
    let cache_lang = langs.first().map(String::as_str).unwrap_or("en");

    if !no_cache {
        if let Some(t) = momx::cache::load(&video_id, cache_lang) {
            return Ok(t);
        }
    }

    let transcript = momx::youtube::fetch_captions(client, &video_id, langs).await?;

    if !no_cache {
        if let Err(e) = momx::cache::save(&transcript, cache_lang) {
            debug!("Failed to cache transcript: {e}");
        }
    }

    Ok(transcript)
}

fn report(cli: &Cli, transcript: &Transcript) {
    if cli.verbose {
        eprintln!(
            "Video: {}\nSource: {}\nLanguage: {}\nAuto-generated: {}\nSegments: {}\nDuration: {:.1}s",
            transcript.video_id,
            transcript.source,
            transcript.language,
            transcript.auto_generated,
            transcript.segments.len(),
            transcript.duration,
        );
    }
}

fn emit(cli: &Cli, format: OutputFormat, transcript: &Transcript, multi: bool) -> Result<()> {
    let rendered = match format {
        OutputFormat::Text => momx::output::render_text(transcript),
        OutputFormat::Json => momx::output::render_json(transcript),
        OutputFormat::Srt => momx::output::render_srt(transcript),
    };

    if let Some(ref path) = cli.output {
        let path = momx::output::per_video_path(path, &transcript.video_id, multi);
        std::fs::write(&path, &rendered)?;
        if cli.verbose {
            eprintln!("Output written to: {}", path.display());
        }
    } else {
        println!("{rendered}");
    }
    Ok(())
}

/// Generate and print minutes when requested. Auto-generated captions are
/// cleaned up first unless --no-clean; manual captions go in as-is.
async fn finish_mom(client: &reqwest::Client, cli: &Cli, transcript: &Transcript, model: &str) -> Result<()> {
    if !cli.mom {
        return Ok(());
    }

    let text = if transcript.auto_generated && !cli.no_clean {
        momx::mom::clean_transcript(client, &transcript.text, model).await
    } else {
        transcript.text.clone()
    };

    let minutes = retry(3, || {
        let text = &text;
        async move { momx::mom::generate_mom(client, text, &cli.title, model).await }
    })
    .await?;

    println!("\n{}", momx::output::render_mom(&minutes, &cli.title));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // Load config file (non-fatal if missing/invalid)
    let config = momx::config::Config::load().unwrap_or_default();

    // CLI flags take priority over config defaults
    let langs = cli
        .langs
        .clone()
        .or_else(|| config.default_langs.clone())
        .unwrap_or_else(momx::youtube::default_languages);
    let model = cli
        .model
        .clone()
        .or_else(|| config.default_model.clone())
        .unwrap_or_else(|| "claude-sonnet-4-6".to_string());
    let format = cli
        .format
        .or_else(|| config.default_format.as_deref().and_then(parse_format))
        .unwrap_or(OutputFormat::Text);
    let whisper_model = config
        .whisper_model
        .as_deref()
        .and_then(WhisperModel::from_name)
        .unwrap_or_default();

    if cli.verbose {
        let config_path = momx::config::config_path();
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
        debug!("Language preference: {langs:?}");
        debug!("Model: {model}");
    }

    let client = reqwest::Client::new();

    // Manual upload path: one local recording, no URL handling
    if let Some(ref audio_path) = cli.audio {
        let lang = langs.first().cloned().unwrap_or_else(|| "en".to_string());
        let transcript = retry(3, || {
            let client = &client;
            let lang = &lang;
            let whisper_model = &whisper_model;
            async move { momx::whisper::transcribe(client, audio_path, lang, whisper_model).await }
        })
        .await?;

        report(&cli, &transcript);
        emit(&cli, format, &transcript, false)?;
        finish_mom(&client, &cli, &transcript, &model).await?;
        return Ok(());
    }

    // Collect URLs: from arg or stdin
    let urls = if let Some(ref url) = cli.url {
        vec![url.clone()]
    } else {
        let stdin = io::stdin();
        stdin.lock().lines().collect::<Result<Vec<_>, _>>()?
    };

    if urls.is_empty() {
        bail!("no URL or video ID provided\n\nUsage: momx <URL>\n       echo <URL> | momx\n       momx --audio <recording>");
    }

    let multi = urls.iter().filter(|u| !u.trim().is_empty()).count() > 1;

    let mut failures = 0usize;
    for url_input in &urls {
        let url_input = url_input.trim();
        if url_input.is_empty() {
            continue;
        }

        let transcript = match fetch_transcript(&client, url_input, &langs, cli.no_cache).await {
            Ok(t) => t,
            Err(err) => {
                failures += 1;
                if format == OutputFormat::Json {
                    println!("{}", momx::output::render_error_json(&err));
                } else {
                    eprintln!("{err}");
                    eprintln!("{}", err.remediation());
                }
                continue;
            }
        };

        report(&cli, &transcript);
        emit(&cli, format, &transcript, multi)?;
        finish_mom(&client, &cli, &transcript, &model).await?;
    }

    if failures > 0 {
        bail!("{failures} input(s) failed");
    }

    Ok(())
}
