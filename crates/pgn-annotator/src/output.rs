//! Persistence of finished game records: JSON (batched or one file per game) and CSV.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chess_core::HeaderKey;
use serde::Serialize;
use tracing::info;

use crate::config::OutputFormat;
use crate::engine_api::ErrorKind;
use crate::error::AnnotatorError;
use crate::record::GameRecord;

/// Receives each completed game record, in input order.
pub trait RecordSink {
    fn accept(&mut self, record: &GameRecord) -> Result<(), AnnotatorError>;

    /// Flush anything buffered. Called once, also when the run was cancelled.
    fn finish(&mut self) -> Result<(), AnnotatorError> {
        Ok(())
    }
}

/// Open the sink for a configured format.
pub fn open_sink(format: OutputFormat, output: &Path) -> Result<Box<dyn RecordSink>, AnnotatorError> {
    Ok(match format {
        OutputFormat::JsonBatch => Box::new(JsonBatchSink::new(output)),
        OutputFormat::JsonPerGame => Box::new(JsonPerGameSink::new(output)?),
        OutputFormat::CsvMoves => Box::new(CsvMovesSink::create(output)?),
        OutputFormat::CsvSummary => Box::new(CsvSummarySink::create(output)?),
    })
}

/// Serialize with a four-space indent.
pub fn write_pretty_json<W: Write, T: Serialize + ?Sized>(
    writer: W,
    value: &T,
) -> Result<(), AnnotatorError> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(writer, formatter);
    value.serialize(&mut ser)?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<(), AnnotatorError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| AnnotatorError::file(parent, e))?;
    }
    Ok(())
}

fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), AnnotatorError> {
    ensure_parent(path)?;
    let file = File::create(path).map_err(|e| AnnotatorError::file(path, e))?;
    let mut writer = BufWriter::new(file);
    write_pretty_json(&mut writer, value)?;
    writer.flush().map_err(|e| AnnotatorError::file(path, e))?;
    Ok(())
}

/// All records in one JSON array, written on `finish`.
pub struct JsonBatchSink {
    path: PathBuf,
    records: Vec<GameRecord>,
}

impl JsonBatchSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
        }
    }
}

impl RecordSink for JsonBatchSink {
    fn accept(&mut self, record: &GameRecord) -> Result<(), AnnotatorError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), AnnotatorError> {
        write_json_file(&self.path, &self.records)?;
        info!(path = %self.path.display(), games = self.records.len(), "All games saved");
        Ok(())
    }
}

/// One `processed_game{id}.json` per record, written immediately.
pub struct JsonPerGameSink {
    dir: PathBuf,
}

impl JsonPerGameSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AnnotatorError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| AnnotatorError::file(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn file_name(id: &str) -> String {
        if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
            format!("processed_game{id}.json")
        } else {
            format!("processed_{id}.json")
        }
    }
}

impl RecordSink for JsonPerGameSink {
    fn accept(&mut self, record: &GameRecord) -> Result<(), AnnotatorError> {
        let path = self.dir.join(Self::file_name(&record.id));
        write_json_file(&path, record)?;
        info!(game = %record.id, path = %path.display(), "Game saved");
        Ok(())
    }
}

#[derive(Serialize)]
struct MoveRow<'a> {
    game: &'a str,
    white: &'a str,
    black: &'a str,
    result: &'a str,
    ply: u32,
    side: String,
    #[serde(rename = "move")]
    uci: &'a str,
    san: &'a str,
    fen: &'a str,
    status: &'static str,
    analysis: String,
}

/// One CSV row per analyzed move.
pub struct CsvMovesSink {
    writer: csv::Writer<File>,
}

impl CsvMovesSink {
    pub fn create(path: &Path) -> Result<Self, AnnotatorError> {
        ensure_parent(path)?;
        Ok(Self {
            writer: csv::Writer::from_path(path)?,
        })
    }
}

impl RecordSink for CsvMovesSink {
    fn accept(&mut self, record: &GameRecord) -> Result<(), AnnotatorError> {
        for mv in &record.moves {
            let status = match mv.analysis.error_kind() {
                None => "ok",
                Some(ErrorKind::EmptyResponse) => "empty_response",
                Some(ErrorKind::MalformedResponse) => "malformed_response",
                Some(ErrorKind::TransportFailure) => "transport_failure",
            };
            self.writer.serialize(MoveRow {
                game: &record.id,
                white: record.metadata.get(HeaderKey::White),
                black: record.metadata.get(HeaderKey::Black),
                result: record.metadata.get(HeaderKey::Result),
                ply: mv.ply,
                side: mv.side.to_string(),
                uci: &mv.uci,
                san: &mv.san,
                fen: &mv.fen,
                status,
                analysis: serde_json::to_string(&mv.analysis)?,
            })?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), AnnotatorError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct SummaryRow {
    #[serde(rename = "gameNumber")]
    game_number: String,
    #[serde(rename = "game heading")]
    heading: String,
    discussion: String,
    #[serde(rename = "link to game")]
    link: String,
}

impl SummaryRow {
    fn from_record(record: &GameRecord) -> Self {
        let m = &record.metadata;
        let heading = format!(
            "{} vs. {} ({})",
            m.get(HeaderKey::White),
            m.get(HeaderKey::Black),
            m.get(HeaderKey::Event)
        );
        let discussion = format!(
            "Result: {}. White's Elo: {} (Change: {}), Black's Elo: {} (Change: {}). ECO: {}, Opening: {}.",
            m.get(HeaderKey::Result),
            m.get(HeaderKey::WhiteElo),
            m.get(HeaderKey::WhiteRatingDiff),
            m.get(HeaderKey::BlackElo),
            m.get(HeaderKey::BlackRatingDiff),
            m.get(HeaderKey::Eco),
            m.get(HeaderKey::Opening),
        );
        Self {
            game_number: format!("game{}", record.id),
            heading,
            discussion,
            link: game_link(record.site.as_deref()),
        }
    }
}

/// The `Site` tag when it is already a URL, otherwise a map search for it.
fn game_link(site: Option<&str>) -> String {
    let site = site.map(str::trim).filter(|s| !s.is_empty()).unwrap_or("Unknown");
    if site.starts_with("http://") || site.starts_with("https://") {
        site.to_string()
    } else {
        format!("https://www.google.com/maps/search/{}", site.replace(' ', "+"))
    }
}

/// One CSV row per game: heading, rating discussion and link.
pub struct CsvSummarySink {
    writer: csv::Writer<File>,
}

impl CsvSummarySink {
    pub fn create(path: &Path) -> Result<Self, AnnotatorError> {
        ensure_parent(path)?;
        Ok(Self {
            writer: csv::Writer::from_path(path)?,
        })
    }
}

impl RecordSink for CsvSummarySink {
    fn accept(&mut self, record: &GameRecord) -> Result<(), AnnotatorError> {
        self.writer.serialize(SummaryRow::from_record(record))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), AnnotatorError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<GameRecord>,
    pub finished: bool,
}

impl RecordSink for MemorySink {
    fn accept(&mut self, record: &GameRecord) -> Result<(), AnnotatorError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), AnnotatorError> {
        self.finished = true;
        Ok(())
    }
}
