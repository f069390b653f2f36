use chess_core::{GameMetadata, ReplayedPly, Side};
use serde::Serialize;

use crate::engine_api::AnalysisResult;

/// Evaluation of the position after one ply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveRecord {
    #[serde(rename = "Move Number")]
    pub ply: u32,
    #[serde(rename = "Player")]
    pub side: Side,
    #[serde(rename = "Move")]
    pub uci: String,
    #[serde(rename = "SAN")]
    pub san: String,
    #[serde(rename = "FEN")]
    pub fen: String,
    #[serde(rename = "Stockfish Analysis")]
    pub analysis: AnalysisResult,
}

impl MoveRecord {
    pub fn new(ply: ReplayedPly, analysis: AnalysisResult) -> Self {
        Self {
            ply: ply.ply,
            side: ply.side,
            uci: ply.uci,
            san: ply.san,
            fen: ply.fen,
            analysis,
        }
    }
}

/// Metadata plus one [`MoveRecord`] per ply, in ply order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRecord {
    #[serde(rename = "Game")]
    pub id: String,
    #[serde(rename = "Metadata")]
    pub metadata: GameMetadata,
    /// `Site` tag, used for links in tabular summaries
    #[serde(skip)]
    pub site: Option<String>,
    #[serde(rename = "Moves")]
    pub moves: Vec<MoveRecord>,
}

impl GameRecord {
    pub fn failed_moves(&self) -> usize {
        self.moves.iter().filter(|m| !m.analysis.is_success()).count()
    }
}
