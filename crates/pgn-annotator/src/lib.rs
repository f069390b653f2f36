//! Per-move engine annotation for PGN games.
//!
//! Games are replayed with [`chess_core`], every resulting position is sent to a
//! Stockfish HTTP service, and one record per game is written out.

pub mod annotator;
pub mod config;
pub mod engine_api;
pub mod error;
pub mod output;
pub mod pacing;
pub mod record;
pub mod shutdown;
pub mod source;

pub use annotator::{Annotator, GameFailure, GameState, RunSummary};
pub use config::{AnnotatorConfig, Cli, InputSource, OutputFormat};
pub use engine_api::{
    AnalysisResult, ErrorKind, ErrorPayload, PositionAnalyzer, RetryingAnalyzer,
    StockfishApiClient, MAX_DEPTH,
};
pub use error::AnnotatorError;
pub use output::{open_sink, RecordSink};
pub use pacing::{FixedIntervalPacer, Pacer};
pub use record::{GameRecord, MoveRecord};
pub use shutdown::Shutdown;
pub use source::{GameSource, SourcedGame};
