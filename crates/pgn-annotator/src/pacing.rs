//! Static backpressure between games.

use std::time::Duration;

/// Decides how long to hold off before the next game.
pub trait Pacer: Send {
    /// Called with the number of games completed so far.
    fn on_game_completed(&mut self, completed: u64) -> Option<Duration>;
}

/// Pause for a fixed interval after every `every`-th completed game.
#[derive(Debug, Clone)]
pub struct FixedIntervalPacer {
    every: u64,
    pause: Duration,
}

impl FixedIntervalPacer {
    pub const DEFAULT_EVERY: u64 = 2;
    pub const DEFAULT_PAUSE: Duration = Duration::from_secs(60);

    /// `every == 0` or a zero pause disables pacing.
    pub fn new(every: u64, pause: Duration) -> Self {
        Self { every, pause }
    }

    pub fn disabled() -> Self {
        Self::new(0, Duration::ZERO)
    }
}

impl Default for FixedIntervalPacer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_EVERY, Self::DEFAULT_PAUSE)
    }
}

impl Pacer for FixedIntervalPacer {
    fn on_game_completed(&mut self, completed: u64) -> Option<Duration> {
        if self.every == 0 || self.pause.is_zero() || completed == 0 {
            return None;
        }
        (completed % self.every == 0).then_some(self.pause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pauses_after_every_second_game() {
        let mut pacer = FixedIntervalPacer::default();
        let pauses: Vec<u64> = (1..=5)
            .filter(|&n| pacer.on_game_completed(n).is_some())
            .collect();
        assert_eq!(pauses, vec![2, 4]);
        assert_eq!(pacer.on_game_completed(2), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_zero_completed_never_pauses() {
        let mut pacer = FixedIntervalPacer::default();
        assert_eq!(pacer.on_game_completed(0), None);
    }

    #[test]
    fn test_disabled() {
        let mut pacer = FixedIntervalPacer::disabled();
        assert!((1..=10).all(|n| pacer.on_game_completed(n).is_none()));

        let mut pacer = FixedIntervalPacer::new(3, Duration::ZERO);
        assert_eq!(pacer.on_game_completed(3), None);
    }
}
