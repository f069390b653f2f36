//! Game annotation pipeline: replay each game, evaluate every position, emit one record per game.
//!
//! Strictly sequential: one game at a time, one request at a time, in ply order.

use std::time::Duration;

use chess_core::{replay_game, ChessCoreError, Game, PlaceholderStyle};
use tracing::{debug, error, info, warn};

use crate::engine_api::{AnalysisResult, PositionAnalyzer, MAX_DEPTH};
use crate::error::AnnotatorError;
use crate::output::RecordSink;
use crate::pacing::Pacer;
use crate::record::{GameRecord, MoveRecord};
use crate::shutdown::Shutdown;
use crate::source::{GameSource, SourcedGame};

/// Lifecycle of one input game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Pending,
    Replaying,
    Analyzing,
    Complete,
    Skipped,
    Aborted,
    Incomplete,
}

/// Why a game produced no record.
#[derive(Debug)]
pub enum GameFailure {
    /// The move list could not be replayed
    Aborted(ChessCoreError),
    /// Shutdown arrived after `analyzed` plies had been evaluated
    Cancelled { analyzed: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub complete: u64,
    pub skipped: Vec<String>,
    pub aborted: Vec<String>,
    /// Game that was being analyzed when shutdown arrived
    pub incomplete: Option<String>,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn all_complete(&self) -> bool {
        !self.cancelled && self.skipped.is_empty() && self.aborted.is_empty()
    }

    /// 0 when every game completed, 2 when any was skipped or aborted, 130 when cancelled.
    pub fn exit_code(&self) -> u8 {
        if self.cancelled {
            130
        } else if !self.skipped.is_empty() || !self.aborted.is_empty() {
            2
        } else {
            0
        }
    }
}

pub struct Annotator<A, P> {
    analyzer: A,
    pacer: P,
    depth: u32,
    placeholders: PlaceholderStyle,
}

impl<A: PositionAnalyzer, P: Pacer> Annotator<A, P> {
    pub fn new(analyzer: A, pacer: P) -> Self {
        Self {
            analyzer,
            pacer,
            depth: MAX_DEPTH,
            placeholders: PlaceholderStyle::default(),
        }
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_placeholders(mut self, placeholders: PlaceholderStyle) -> Self {
        self.placeholders = placeholders;
        self
    }

    /// Replay `game`, then evaluate the position after every ply in order.
    ///
    /// Replay finishes before the first request, so a game with an illegal move
    /// costs no API calls. Per-move analysis failures are recorded, not returned.
    pub async fn annotate_game(
        &self,
        game: &Game,
        shutdown: &mut Shutdown,
    ) -> Result<GameRecord, GameFailure> {
        debug!(game = %game.id, state = ?GameState::Replaying);
        let plies = replay_game(game).map_err(GameFailure::Aborted)?;

        debug!(game = %game.id, state = ?GameState::Analyzing, plies = plies.len());
        let mut moves: Vec<MoveRecord> = Vec::with_capacity(plies.len());

        for ply in plies {
            if shutdown.is_triggered() {
                return Err(GameFailure::Cancelled {
                    analyzed: moves.len(),
                });
            }

            let analysis = tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    return Err(GameFailure::Cancelled { analyzed: moves.len() });
                }
                result = self.analyzer.analyze(&ply.fen, self.depth) => result,
            };

            if let AnalysisResult::Error(payload) = &analysis {
                warn!(game = %game.id, ply = ply.ply, kind = ?payload.kind, error = %payload.error, "Analysis failed for move");
            }
            moves.push(MoveRecord::new(ply, analysis));
        }

        Ok(GameRecord {
            id: game.id.clone(),
            metadata: game.metadata(self.placeholders),
            site: game.tag("Site").map(str::to_string),
            moves,
        })
    }

    /// Annotate every game from `source` in order, handing each finished record to `sink`.
    ///
    /// Only sink errors end the run early; a bad game or a failed request never does.
    pub async fn run(
        &mut self,
        source: &mut dyn GameSource,
        sink: &mut dyn RecordSink,
        mut shutdown: Shutdown,
    ) -> Result<RunSummary, AnnotatorError> {
        let mut summary = RunSummary::default();
        let mut pending_pause: Option<Duration> = None;

        loop {
            if shutdown.is_triggered() {
                summary.cancelled = true;
                break;
            }
            let Some(next) = source.next_game() else {
                break;
            };

            // Pace before starting the next game, never after the last one.
            if let Some(pause) = pending_pause.take() {
                info!(secs = pause.as_secs(), "Pausing to avoid overloading the API");
                let interrupted = tokio::select! {
                    biased;
                    _ = shutdown.recv() => true,
                    _ = tokio::time::sleep(pause) => false,
                };
                if interrupted {
                    info!(next = next.id(), "Shutdown during pause, game not started");
                    summary.cancelled = true;
                    break;
                }
            }

            let game = match next {
                SourcedGame::Missing { id, reason } => {
                    warn!(game = %id, state = ?GameState::Skipped, %reason, "Skipping game: missing or unreadable");
                    summary.skipped.push(id);
                    continue;
                }
                SourcedGame::Present(game) if game.is_empty() => {
                    warn!(game = %game.id, state = ?GameState::Skipped, "Skipping game: no moves");
                    summary.skipped.push(game.id);
                    continue;
                }
                SourcedGame::Present(game) => game,
            };

            info!(game = %game.id, plies = game.moves.len(), "Analyzing game");
            match self.annotate_game(&game, &mut shutdown).await {
                Ok(record) => {
                    sink.accept(&record)?;
                    summary.complete += 1;
                    info!(
                        game = %record.id,
                        state = ?GameState::Complete,
                        moves = record.moves.len(),
                        failed = record.failed_moves(),
                        "Game analyzed"
                    );
                    pending_pause = self.pacer.on_game_completed(summary.complete);
                }
                Err(GameFailure::Aborted(e)) => {
                    error!(game = %game.id, state = ?GameState::Aborted, error = %e, "Aborting game");
                    summary.aborted.push(game.id);
                }
                Err(GameFailure::Cancelled { analyzed }) => {
                    warn!(
                        game = %game.id,
                        state = ?GameState::Incomplete,
                        analyzed,
                        plies = game.moves.len(),
                        "Shutdown mid-game, game left incomplete"
                    );
                    summary.incomplete = Some(game.id);
                    summary.cancelled = true;
                    break;
                }
            }
        }

        sink.finish()?;
        info!(
            complete = summary.complete,
            skipped = summary.skipped.len(),
            aborted = summary.aborted.len(),
            incomplete = summary.incomplete.as_deref().unwrap_or("-"),
            "Run finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chess_core::pgn::parse_first_game;
    use chess_core::Side;
    use serde_json::json;

    use super::*;
    use crate::engine_api::{ErrorKind, ErrorPayload};
    use crate::output::MemorySink;
    use crate::pacing::FixedIntervalPacer;
    use crate::shutdown::{self, ShutdownTrigger};
    use crate::source::VecSource;

    fn game(id: &str, pgn: &str) -> Game {
        parse_first_game(pgn).unwrap().unwrap().into_game(id)
    }

    const RUY_LOPEZ: &str = "[White \"W\"]\n[Black \"B\"]\n[Result \"1-0\"]\n\n1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 1-0";
    const ILLEGAL: &str = "[White \"W\"]\n\n1. e4 e5 2. Ke3 Nc6 *";

    /// Echoes the FEN and depth back as the evaluation.
    #[derive(Default)]
    struct EchoAnalyzer {
        depths: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl PositionAnalyzer for EchoAnalyzer {
        async fn analyze(&self, fen: &str, requested_depth: u32) -> AnalysisResult {
            self.depths.lock().unwrap().push(requested_depth);
            AnalysisResult::Success(json!({ "success": true, "fen": fen, "depth": requested_depth }))
        }
    }

    struct DownAnalyzer;

    #[async_trait]
    impl PositionAnalyzer for DownAnalyzer {
        async fn analyze(&self, _fen: &str, _depth: u32) -> AnalysisResult {
            AnalysisResult::Error(ErrorPayload::transport("connection refused"))
        }
    }

    /// Fires shutdown on the nth request and never answers it.
    struct HangingAnalyzer {
        calls: AtomicUsize,
        fire_on: usize,
        trigger: ShutdownTrigger,
    }

    #[async_trait]
    impl PositionAnalyzer for HangingAnalyzer {
        async fn analyze(&self, _fen: &str, _depth: u32) -> AnalysisResult {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.fire_on {
                self.trigger.trigger();
                std::future::pending::<()>().await;
            }
            AnalysisResult::Success(json!({ "success": true }))
        }
    }

    struct CountingPacer {
        inner: FixedIntervalPacer,
        seen: Arc<Mutex<Vec<u64>>>,
    }

    impl Pacer for CountingPacer {
        fn on_game_completed(&mut self, completed: u64) -> Option<Duration> {
            self.seen.lock().unwrap().push(completed);
            self.inner.on_game_completed(completed)
        }
    }

    fn present(games: Vec<Game>) -> VecSource {
        VecSource::new(games.into_iter().map(SourcedGame::Present))
    }

    #[tokio::test]
    async fn test_one_record_per_ply_in_order() {
        let annotator = Annotator::new(EchoAnalyzer::default(), FixedIntervalPacer::disabled());
        let record = annotator
            .annotate_game(&game("1", RUY_LOPEZ), &mut Shutdown::never())
            .await
            .unwrap();

        assert_eq!(record.moves.len(), 6);
        let plies: Vec<u32> = record.moves.iter().map(|m| m.ply).collect();
        assert_eq!(plies, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(record.moves[0].side, Side::White);
        for pair in record.moves.windows(2) {
            assert_ne!(pair[0].side, pair[1].side);
        }
        assert_eq!(record.moves[4].uci, "f1b5");
        match &record.moves[0].analysis {
            AnalysisResult::Success(v) => assert_eq!(v["fen"], record.moves[0].fen.as_str()),
            other => panic!("unexpected {other:?}"),
        }
        assert!(annotator.analyzer.depths.lock().unwrap().iter().all(|&d| d == 15));
    }

    #[tokio::test]
    async fn test_transport_failures_still_complete_the_game() {
        let mut annotator = Annotator::new(DownAnalyzer, FixedIntervalPacer::disabled());
        let mut source = present(vec![game("1", RUY_LOPEZ)]);
        let mut sink = MemorySink::default();

        let summary = annotator
            .run(&mut source, &mut sink, Shutdown::never())
            .await
            .unwrap();

        assert_eq!(summary.complete, 1);
        assert_eq!(summary.exit_code(), 0);
        let record = &sink.records[0];
        assert_eq!(record.moves.len(), 6);
        assert!(record
            .moves
            .iter()
            .all(|m| m.analysis.error_kind() == Some(ErrorKind::TransportFailure)));
    }

    #[tokio::test]
    async fn test_illegal_move_aborts_only_that_game() {
        let mut annotator = Annotator::new(EchoAnalyzer::default(), FixedIntervalPacer::disabled());
        let mut source = VecSource::new(vec![
            SourcedGame::Present(game("1", ILLEGAL)),
            SourcedGame::Missing {
                id: "2".into(),
                reason: "no such file".into(),
            },
            SourcedGame::Present(game("3", RUY_LOPEZ)),
        ]);
        let mut sink = MemorySink::default();

        let summary = annotator
            .run(&mut source, &mut sink, Shutdown::never())
            .await
            .unwrap();

        assert_eq!(summary.aborted, vec!["1".to_string()]);
        assert_eq!(summary.skipped, vec!["2".to_string()]);
        assert_eq!(summary.complete, 1);
        assert_eq!(summary.exit_code(), 2);
        assert!(sink.finished);
        assert_eq!(sink.records.len(), 1);
        assert_eq!(sink.records[0].id, "3");
        // Replay fails before any request is made
        assert_eq!(annotator.analyzer.depths.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_game_without_moves_is_skipped() {
        let mut annotator = Annotator::new(EchoAnalyzer::default(), FixedIntervalPacer::disabled());
        let mut source = present(vec![game("1", "[Event \"Abandoned\"]\n\n*")]);
        let mut sink = MemorySink::default();

        let summary = annotator
            .run(&mut source, &mut sink, Shutdown::never())
            .await
            .unwrap();
        assert_eq!(summary.skipped, vec!["1".to_string()]);
        assert!(sink.records.is_empty());
    }

    #[tokio::test]
    async fn test_rerun_is_byte_identical() {
        let mut outputs = Vec::new();
        for _ in 0..2 {
            let mut annotator = Annotator::new(EchoAnalyzer::default(), FixedIntervalPacer::disabled());
            let mut source = present(vec![game("1", RUY_LOPEZ), game("2", RUY_LOPEZ)]);
            let mut sink = MemorySink::default();
            annotator
                .run(&mut source, &mut sink, Shutdown::never())
                .await
                .unwrap();
            outputs.push(serde_json::to_string(&sink.records).unwrap());
        }
        assert_eq!(outputs[0], outputs[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pauses_after_even_games_but_not_after_last() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pacer = CountingPacer {
            inner: FixedIntervalPacer::default(),
            seen: seen.clone(),
        };
        let mut annotator = Annotator::new(EchoAnalyzer::default(), pacer);
        let games = (1..=5).map(|i| game(&i.to_string(), RUY_LOPEZ)).collect();
        let mut source = present(games);
        let mut sink = MemorySink::default();

        let start = tokio::time::Instant::now();
        let summary = annotator
            .run(&mut source, &mut sink, Shutdown::never())
            .await
            .unwrap();

        assert_eq!(summary.complete, 5);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4, 5]);
        // After game 2 and game 4
        assert_eq!(start.elapsed(), Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_pause_after_final_game() {
        let mut annotator = Annotator::new(EchoAnalyzer::default(), FixedIntervalPacer::default());
        let games = (1..=4).map(|i| game(&i.to_string(), RUY_LOPEZ)).collect();
        let mut source = present(games);
        let mut sink = MemorySink::default();

        let start = tokio::time::Instant::now();
        annotator
            .run(&mut source, &mut sink, Shutdown::never())
            .await
            .unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_shutdown_mid_request_leaves_game_incomplete() {
        let (trigger, shutdown) = shutdown::channel();
        let analyzer = HangingAnalyzer {
            calls: AtomicUsize::new(0),
            fire_on: 9,
            trigger,
        };
        let mut annotator = Annotator::new(analyzer, FixedIntervalPacer::disabled());
        let mut source = present(vec![
            game("1", RUY_LOPEZ),
            game("2", RUY_LOPEZ),
            game("3", RUY_LOPEZ),
        ]);
        let mut sink = MemorySink::default();

        let summary = tokio::time::timeout(
            Duration::from_secs(5),
            annotator.run(&mut source, &mut sink, shutdown),
        )
        .await
        .expect("shutdown must interrupt the hanging request")
        .unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.complete, 1);
        assert_eq!(summary.incomplete.as_deref(), Some("2"));
        assert_eq!(summary.exit_code(), 130);
        assert!(sink.finished);
        assert_eq!(sink.records.len(), 1);
        assert_eq!(sink.records[0].id, "1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_pause() {
        let (trigger, shutdown) = shutdown::channel();
        let mut annotator = Annotator::new(EchoAnalyzer::default(), FixedIntervalPacer::default());
        let games = (1..=3).map(|i| game(&i.to_string(), RUY_LOPEZ)).collect();
        let mut source = present(games);
        let mut sink = MemorySink::default();

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            trigger.trigger();
        });

        let start = tokio::time::Instant::now();
        let summary = annotator
            .run(&mut source, &mut sink, shutdown)
            .await
            .unwrap();
        stopper.await.unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.complete, 2);
        assert_eq!(summary.incomplete, None);
        assert!(start.elapsed() < Duration::from_secs(60));
        assert_eq!(sink.records.len(), 2);
    }
}
