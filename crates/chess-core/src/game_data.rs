use std::fmt;
use std::str::FromStr;

use serde::ser::{Serialize, SerializeMap, Serializer};
use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::{CastlingMode, Chess};

use crate::error::ChessCoreError;

/// PGN header tags carried into every annotated game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderKey {
    Event,
    White,
    Black,
    Result,
    WhiteElo,
    BlackElo,
    WhiteRatingDiff,
    BlackRatingDiff,
    Eco,
    Opening,
    Termination,
    Round,
}

/// Output order of the recognized headers.
pub const HEADER_SCHEMA: [HeaderKey; 12] = [
    HeaderKey::Event,
    HeaderKey::White,
    HeaderKey::Black,
    HeaderKey::Result,
    HeaderKey::WhiteElo,
    HeaderKey::BlackElo,
    HeaderKey::WhiteRatingDiff,
    HeaderKey::BlackRatingDiff,
    HeaderKey::Eco,
    HeaderKey::Opening,
    HeaderKey::Termination,
    HeaderKey::Round,
];

impl HeaderKey {
    pub fn tag(self) -> &'static str {
        match self {
            HeaderKey::Event => "Event",
            HeaderKey::White => "White",
            HeaderKey::Black => "Black",
            HeaderKey::Result => "Result",
            HeaderKey::WhiteElo => "WhiteElo",
            HeaderKey::BlackElo => "BlackElo",
            HeaderKey::WhiteRatingDiff => "WhiteRatingDiff",
            HeaderKey::BlackRatingDiff => "BlackRatingDiff",
            HeaderKey::Eco => "ECO",
            HeaderKey::Opening => "Opening",
            HeaderKey::Termination => "Termination",
            HeaderKey::Round => "Round",
        }
    }

    fn descriptive_placeholder(self) -> &'static str {
        match self {
            HeaderKey::Event => "Unknown Event",
            HeaderKey::White | HeaderKey::Black => "Unknown Player",
            HeaderKey::Result => "Unknown Result",
            HeaderKey::WhiteElo | HeaderKey::BlackElo => "Unknown Elo",
            HeaderKey::WhiteRatingDiff | HeaderKey::BlackRatingDiff => "Unknown Diff",
            HeaderKey::Eco => "Unknown ECO",
            HeaderKey::Opening => "Unknown Opening",
            HeaderKey::Termination => "Unknown Termination",
            HeaderKey::Round => "Unknown Round",
        }
    }
}

/// How a missing header is filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// `"Unknown Player"`, `"Unknown Elo"`, ...
    #[default]
    Descriptive,
    /// `"?"` for every key
    QuestionMark,
    /// `"N/A"` for every key
    NotAvailable,
}

impl PlaceholderStyle {
    pub fn placeholder(self, key: HeaderKey) -> &'static str {
        match self {
            PlaceholderStyle::Descriptive => key.descriptive_placeholder(),
            PlaceholderStyle::QuestionMark => "?",
            PlaceholderStyle::NotAvailable => "N/A",
        }
    }
}

impl FromStr for PlaceholderStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "descriptive" | "unknown" => Ok(PlaceholderStyle::Descriptive),
            "question" | "?" => Ok(PlaceholderStyle::QuestionMark),
            "na" | "n/a" => Ok(PlaceholderStyle::NotAvailable),
            other => Err(format!("unknown placeholder style '{other}'")),
        }
    }
}

/// Resolved header values, one per [`HEADER_SCHEMA`] entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameMetadata {
    values: Vec<(HeaderKey, String)>,
}

impl GameMetadata {
    /// Apply the schema to raw tag pairs. Empty tag values count as missing.
    pub fn resolve(tags: &[(String, String)], style: PlaceholderStyle) -> Self {
        let values = HEADER_SCHEMA
            .iter()
            .map(|&key| {
                let value = tags
                    .iter()
                    .find(|(name, value)| name == key.tag() && !value.trim().is_empty())
                    .map(|(_, value)| value.clone())
                    .unwrap_or_else(|| style.placeholder(key).to_string());
                (key, value)
            })
            .collect();
        Self { values }
    }

    pub fn get(&self, key: HeaderKey) -> &str {
        self.values
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (HeaderKey, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

impl Serialize for GameMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (key, value) in &self.values {
            map.serialize_entry(key.tag(), value)?;
        }
        map.end()
    }
}

/// A game as read from a PGN source.
#[derive(Debug, Clone)]
pub struct Game {
    pub id: String,
    /// Tag pairs in file order
    pub tags: Vec<(String, String)>,
    /// Mainline moves in SAN
    pub moves: Vec<San>,
}

impl Game {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn metadata(&self, style: PlaceholderStyle) -> GameMetadata {
        GameMetadata::resolve(&self.tags, style)
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Board the movetext starts from: the `FEN` tag if present, else the standard start.
    pub fn initial_position(&self) -> Result<Chess, ChessCoreError> {
        let Some(fen) = self.tag("FEN").filter(|f| !f.trim().is_empty()) else {
            return Ok(Chess::default());
        };

        let parsed: Fen = fen
            .trim()
            .parse()
            .map_err(|e| ChessCoreError::InvalidStartPosition(format!("{fen}: {e}")))?;
        parsed
            .into_position::<Chess>(CastlingMode::Standard)
            .map_err(|e| ChessCoreError::InvalidStartPosition(format!("{fen}: {e}")))
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "game {} ({} vs. {}, {} plies)",
            self.id,
            self.tag("White").unwrap_or("?"),
            self.tag("Black").unwrap_or("?"),
            self.moves.len()
        )
    }
}
