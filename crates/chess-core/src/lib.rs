pub mod error;
pub mod game_data;
pub mod pgn;
pub mod replay;

pub use error::{ChessCoreError, IllegalMove};
pub use game_data::{Game, GameMetadata, HeaderKey, PlaceholderStyle, HEADER_SCHEMA};
pub use replay::{replay, replay_game, ReplayedPly, Side};
