//! PGN reading backed by `pgn-reader`: tags verbatim, mainline SAN only.

use std::io::{self, Read};
use std::ops::ControlFlow;

use pgn_reader::{RawTag, Reader, SanPlus, Skip, Visitor};
use shakmaty::san::San;

use crate::game_data::Game;

/// Tags and mainline of one game, before it has been given an identifier.
#[derive(Debug, Clone, Default)]
pub struct ParsedGame {
    pub tags: Vec<(String, String)>,
    pub moves: Vec<San>,
}

impl ParsedGame {
    pub fn into_game(self, id: impl Into<String>) -> Game {
        Game {
            id: id.into(),
            tags: self.tags,
            moves: self.moves,
        }
    }
}

/// Visitor that collects tags and mainline moves; variations are skipped.
struct GameCollector;

impl Visitor for GameCollector {
    type Tags = Vec<(String, String)>;
    type Movetext = ParsedGame;
    type Output = ParsedGame;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(Vec::new())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        name: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        tags.push((
            String::from_utf8_lossy(name).into_owned(),
            value.decode_utf8_lossy().into_owned(),
        ));
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(ParsedGame {
            tags,
            moves: Vec::new(),
        })
    }

    fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    // Tokens pgn-reader cannot parse as SAN never reach this callback, so a
    // malformed token shifts later plies and surfaces as an illegal move there.
    fn san(&mut self, movetext: &mut Self::Movetext, san_plus: SanPlus) -> ControlFlow<Self::Output> {
        movetext.moves.push(san_plus.san);
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        movetext
    }
}

/// Reads games one at a time from any PGN byte stream.
pub struct PgnReader<R: Read> {
    reader: Reader<R>,
    collector: GameCollector,
}

impl<R: Read> PgnReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: Reader::new(inner),
            collector: GameCollector,
        }
    }

    /// Next game in the stream, `Ok(None)` at end of input.
    pub fn next_game(&mut self) -> io::Result<Option<ParsedGame>> {
        self.reader.read_game(&mut self.collector)
    }
}

/// Parse the first game of a PGN string.
pub fn parse_first_game(pgn: &str) -> io::Result<Option<ParsedGame>> {
    PgnReader::new(pgn.as_bytes()).next_game()
}
