use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Srt,
}

#[derive(Parser)]
#[command(
    name = "momx",
    about = "Minutes of meeting from YouTube captions or uploaded audio",
    version,
)]
pub struct Cli {
    /// YouTube video URL or video ID (reads from stdin if omitted)
    pub url: Option<String>,

    /// Transcribe a local meeting recording instead of fetching captions
    #[arg(short, long)]
    pub audio: Option<PathBuf>,

    /// Generate a structured minutes-of-meeting document
    #[arg(short, long)]
    pub mom: bool,

    /// Meeting title used in the minutes document
    #[arg(short, long, default_value = "Untitled meeting")]
    pub title: String,

    /// Preferred caption languages in priority order (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub langs: Option<Vec<String>>,

    /// Output format: text (default), json, srt
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write transcript output to file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Skip LLM cleanup of auto-generated captions before minutes generation
    #[arg(long)]
    pub no_clean: bool,

    /// Bypass the transcript cache
    #[arg(long)]
    pub no_cache: bool,

    /// LLM model for transcript cleanup and minutes generation
    #[arg(long)]
    pub model: Option<String>,

    /// Show extraction method and metadata
    #[arg(short, long)]
    pub verbose: bool,
}
