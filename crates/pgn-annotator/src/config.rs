//! Annotator configuration: `.env`, environment variables, then command-line flags.

use std::path::PathBuf;
use std::time::Duration;

use chess_core::PlaceholderStyle;
use clap::{Parser, ValueEnum};
use tracing::warn;

use crate::engine_api::{effective_depth, DEFAULT_API_URL, MAX_DEPTH};
use crate::error::AnnotatorError;
use crate::source::{DirectorySource, GameSource, NumberedFilesSource, PgnFileSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON array holding every game
    JsonBatch,
    /// One JSON file per game inside the output directory
    JsonPerGame,
    /// One CSV row per move
    CsvMoves,
    /// One CSV row per game with a short written summary
    CsvSummary,
}

/// Annotate PGN games with per-move Stockfish evaluations.
#[derive(Parser, Debug, Clone)]
#[command(name = "pgn-annotator", version)]
pub struct Cli {
    /// PGN file (every game in it) or directory of PGN files
    #[arg(long, short, env = "PGN_INPUT")]
    pub input: PathBuf,

    /// First N of game{N}.pgn when reading a directory
    #[arg(long, env = "PGN_FIRST")]
    pub first: Option<u32>,

    /// Last N of game{N}.pgn when reading a directory
    #[arg(long, env = "PGN_LAST")]
    pub last: Option<u32>,

    /// Output file, or directory for json-per-game
    #[arg(long, short, env = "ANNOTATION_OUTPUT")]
    pub output: PathBuf,

    #[arg(long, value_enum, env = "OUTPUT_FORMAT", default_value_t = OutputFormat::JsonPerGame)]
    pub format: OutputFormat,

    #[arg(long, env = "STOCKFISH_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Search depth per position (the service caps it at 15)
    #[arg(long, env = "ANALYSIS_DEPTH", default_value_t = MAX_DEPTH)]
    pub depth: u32,

    /// Pause after every N completed games (0 disables pacing)
    #[arg(long, env = "PACE_EVERY_GAMES", default_value_t = 2)]
    pub pace_every: u64,

    /// Length of each pause in seconds
    #[arg(long, env = "PACE_INTERVAL_SECS", default_value_t = 60)]
    pub pace_secs: u64,

    /// Placeholder for missing headers: descriptive, question or na
    #[arg(long, env = "PLACEHOLDER_STYLE", default_value = "descriptive")]
    pub placeholders: PlaceholderStyle,

    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Extra attempts after a transport failure
    #[arg(long, env = "MAX_RETRIES", default_value_t = 0)]
    pub max_retries: u32,

    #[arg(long, env = "RETRY_BACKOFF_MS", default_value_t = 500)]
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Every game in one PGN file
    PgnFile(PathBuf),
    /// game{first}.pgn ..= game{last}.pgn
    NumberedFiles { dir: PathBuf, first: u32, last: u32 },
    /// Every *.pgn in a directory
    Directory(PathBuf),
}

#[derive(Debug, Clone)]
pub struct AnnotatorConfig {
    pub input: InputSource,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub api_url: String,
    /// Already clamped to the service maximum
    pub depth: u32,
    pub pace_every: u64,
    pub pace_interval: Duration,
    pub placeholders: PlaceholderStyle,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl AnnotatorConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, AnnotatorError> {
        let input = resolve_input(&cli)?;

        if cli.depth == 0 {
            return Err(AnnotatorError::Config("depth must be at least 1".into()));
        }
        let depth = effective_depth(cli.depth);
        if depth != cli.depth {
            warn!(requested = cli.depth, depth, "Requested depth above service maximum, clamping");
        }

        if cli.timeout_secs == 0 {
            return Err(AnnotatorError::Config("timeout must be at least 1 second".into()));
        }

        Ok(Self {
            input,
            output: cli.output,
            format: cli.format,
            api_url: cli.api_url,
            depth,
            pace_every: cli.pace_every,
            pace_interval: Duration::from_secs(cli.pace_secs),
            placeholders: cli.placeholders,
            request_timeout: Duration::from_secs(cli.timeout_secs),
            max_retries: cli.max_retries,
            retry_backoff: Duration::from_millis(cli.retry_backoff_ms),
        })
    }

    pub fn open_source(&self) -> Result<Box<dyn GameSource>, AnnotatorError> {
        Ok(match &self.input {
            InputSource::PgnFile(path) => Box::new(PgnFileSource::open(path)?),
            InputSource::NumberedFiles { dir, first, last } => {
                Box::new(NumberedFilesSource::new(dir, *first..=*last))
            }
            InputSource::Directory(dir) => Box::new(DirectorySource::scan(dir)?),
        })
    }
}

fn resolve_input(cli: &Cli) -> Result<InputSource, AnnotatorError> {
    if cli.input.is_file() {
        if cli.first.is_some() || cli.last.is_some() {
            return Err(AnnotatorError::Config(
                "--first/--last only apply to a directory input".into(),
            ));
        }
        return Ok(InputSource::PgnFile(cli.input.clone()));
    }

    if !cli.input.is_dir() {
        return Err(AnnotatorError::Config(format!(
            "input {} does not exist",
            cli.input.display()
        )));
    }

    match (cli.first, cli.last) {
        (None, None) => Ok(InputSource::Directory(cli.input.clone())),
        (_, None) => Err(AnnotatorError::Config("--first requires --last".into())),
        (first, Some(last)) => {
            let first = first.unwrap_or(1);
            if first > last {
                return Err(AnnotatorError::Config(format!(
                    "--first ({first}) is greater than --last ({last})"
                )));
            }
            Ok(InputSource::NumberedFiles {
                dir: cli.input.clone(),
                first,
                last,
            })
        }
    }
}
