//! Where games come from: one multi-game PGN file, numbered `game{i}.pgn` files, or a directory.

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chess_core::pgn::PgnReader;
use chess_core::Game;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::AnnotatorError;

static TRAILING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)$").expect("valid trailing-number pattern"));

/// One slot of input: either a game, or the reason there is none.
#[derive(Debug)]
pub enum SourcedGame {
    Present(Game),
    Missing { id: String, reason: String },
}

impl SourcedGame {
    pub fn id(&self) -> &str {
        match self {
            SourcedGame::Present(game) => &game.id,
            SourcedGame::Missing { id, .. } => id,
        }
    }
}

pub trait GameSource {
    /// Next game in input order, `None` at end of input.
    fn next_game(&mut self) -> Option<SourcedGame>;
}

/// Every game in one PGN file, numbered from 1 in file order.
pub struct PgnFileSource {
    reader: PgnReader<BufReader<File>>,
    path: PathBuf,
    next_id: u64,
    done: bool,
}

impl PgnFileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AnnotatorError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| AnnotatorError::file(&path, e))?;
        Ok(Self {
            reader: PgnReader::new(BufReader::new(file)),
            path,
            next_id: 1,
            done: false,
        })
    }
}

impl GameSource for PgnFileSource {
    fn next_game(&mut self) -> Option<SourcedGame> {
        if self.done {
            return None;
        }
        let id = self.next_id.to_string();

        match self.reader.next_game() {
            Ok(Some(parsed)) => {
                self.next_id += 1;
                Some(SourcedGame::Present(parsed.into_game(id)))
            }
            Ok(None) => {
                debug!(path = %self.path.display(), games = self.next_id - 1, "End of PGN file reached");
                self.done = true;
                None
            }
            Err(e) => {
                // The stream position is unknown after a read error.
                warn!(path = %self.path.display(), error = %e, "PGN read failed, stopping");
                self.done = true;
                Some(SourcedGame::Missing {
                    id,
                    reason: format!("read error: {e}"),
                })
            }
        }
    }
}

/// Read the first game of a single-game PGN file.
fn load_single(path: &Path, id: &str) -> SourcedGame {
    let missing = |reason: String| SourcedGame::Missing {
        id: id.to_string(),
        reason,
    };

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => return missing(format!("{}: {e}", path.display())),
    };

    match PgnReader::new(BufReader::new(file)).next_game() {
        Ok(Some(parsed)) => SourcedGame::Present(parsed.into_game(id)),
        Ok(None) => missing(format!("{}: no game in file", path.display())),
        Err(e) => missing(format!("{}: {e}", path.display())),
    }
}

/// `game{i}.pgn` for each `i` in a range, inside one directory.
pub struct NumberedFilesSource {
    dir: PathBuf,
    numbers: RangeInclusive<u32>,
}

impl NumberedFilesSource {
    pub fn new(dir: impl Into<PathBuf>, numbers: RangeInclusive<u32>) -> Self {
        Self {
            dir: dir.into(),
            numbers,
        }
    }

    pub fn file_name(number: u32) -> String {
        format!("game{number}.pgn")
    }
}

impl GameSource for NumberedFilesSource {
    fn next_game(&mut self) -> Option<SourcedGame> {
        let number = self.numbers.next()?;
        let path = self.dir.join(Self::file_name(number));
        Some(load_single(&path, &number.to_string()))
    }
}

/// Every `*.pgn` file in a directory, ordered by the number at the end of the file stem.
pub struct DirectorySource {
    files: VecDeque<(String, PathBuf)>,
}

impl DirectorySource {
    pub fn scan(dir: impl AsRef<Path>) -> Result<Self, AnnotatorError> {
        // Brackets or wildcards in the directory name are literal.
        let dir = glob::Pattern::escape(&dir.as_ref().to_string_lossy());
        let pattern = Path::new(&dir).join("*.pgn");
        let pattern = pattern.to_string_lossy();

        let mut files: Vec<(String, PathBuf)> = glob::glob(&pattern)?
            .filter_map(|p| p.ok())
            .map(|path| {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (game_id_from_stem(&stem), path)
            })
            .collect();

        files.sort_by(|(_, a), (_, b)| sort_key(a).cmp(&sort_key(b)));
        debug!(count = files.len(), "Discovered PGN files");

        Ok(Self {
            files: files.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// `game12` -> `12`, anything else keeps its stem.
fn game_id_from_stem(stem: &str) -> String {
    stem.strip_prefix("game")
        .filter(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(stem)
        .to_string()
}

fn sort_key(path: &Path) -> (u64, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let number = TRAILING_NUMBER
        .captures(&stem)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());
    // Unnumbered files sort after numbered ones
    (number.unwrap_or(u64::MAX), stem)
}

impl GameSource for DirectorySource {
    fn next_game(&mut self) -> Option<SourcedGame> {
        let (id, path) = self.files.pop_front()?;
        Some(load_single(&path, &id))
    }
}

/// In-memory source, mostly for tests and callers that already hold parsed games.
pub struct VecSource {
    games: VecDeque<SourcedGame>,
}

impl VecSource {
    pub fn new(games: impl IntoIterator<Item = SourcedGame>) -> Self {
        Self {
            games: games.into_iter().collect(),
        }
    }
}

impl GameSource for VecSource {
    fn next_game(&mut self) -> Option<SourcedGame> {
        self.games.pop_front()
    }
}
