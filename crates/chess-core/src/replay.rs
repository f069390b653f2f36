//! Move replay: turns a SAN move list into the sequence of positions it produces.

use std::fmt;
use std::iter::{Enumerate, FusedIterator};
use std::slice::Iter;

use serde::Serialize;
use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Position};

use crate::error::{ChessCoreError, IllegalMove};
use crate::game_data::Game;

/// Side credited with a ply. Odd plies are White, even plies Black.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn for_ply(ply: u32) -> Self {
        if ply % 2 == 1 {
            Side::White
        } else {
            Side::Black
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::White => f.write_str("White"),
            Side::Black => f.write_str("Black"),
        }
    }
}

/// One applied move and the position after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayedPly {
    /// 1-based
    pub ply: u32,
    pub side: Side,
    pub san: String,
    pub uci: String,
    pub fen: String,
}

/// Lazy replay over a move list. Yields one item per move; stops after the first illegal move.
pub struct Replay<'a> {
    cursor: Option<Chess>,
    moves: Enumerate<Iter<'a, San>>,
}

/// Replay `moves` starting from `initial`.
pub fn replay(initial: Chess, moves: &[San]) -> Replay<'_> {
    Replay {
        cursor: Some(initial),
        moves: moves.iter().enumerate(),
    }
}

/// Resolve the game's start position and replay every move.
pub fn replay_game(game: &Game) -> Result<Vec<ReplayedPly>, ChessCoreError> {
    let initial = game.initial_position()?;
    let plies = replay(initial, &game.moves).collect::<Result<Vec<_>, _>>()?;
    Ok(plies)
}

fn fen_of(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

impl Iterator for Replay<'_> {
    type Item = Result<ReplayedPly, IllegalMove>;

    fn next(&mut self) -> Option<Self::Item> {
        let pos = self.cursor.take()?;
        let (index, san) = self.moves.next()?;
        let ply = index as u32 + 1;

        let illegal = |reason: String| IllegalMove {
            ply,
            san: san.to_string(),
            reason,
        };

        let mv = match san.to_move(&pos) {
            Ok(mv) => mv,
            Err(e) => return Some(Err(illegal(e.to_string()))),
        };
        let uci = mv.to_uci(CastlingMode::Standard).to_string();

        let next = match pos.play(mv) {
            Ok(next) => next,
            Err(e) => return Some(Err(illegal(e.to_string()))),
        };

        let replayed = ReplayedPly {
            ply,
            side: Side::for_ply(ply),
            san: san.to_string(),
            uci,
            fen: fen_of(&next),
        };
        self.cursor = Some(next);
        Some(Ok(replayed))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.cursor.is_none() {
            return (0, Some(0));
        }
        (0, self.moves.size_hint().1)
    }
}

impl FusedIterator for Replay<'_> {}
