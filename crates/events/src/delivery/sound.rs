//! Sound channel with a global cooldown and fallback players.
//!
//! Players are tried in order; the first one that succeeds wins. A play
//! attempt starts the cooldown whether or not any player succeeded, so a
//! broken audio stack cannot be hammered by a burst of notifications.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use super::SoundPlayer;

/// Minimum spacing between two sound plays, across all jobs.
pub const DEFAULT_SOUND_COOLDOWN: Duration = Duration::from_millis(2000);

/// What happened when the channel was asked to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundOutcome {
    /// A player succeeded; `player_index` is 0 for the primary player.
    Played { player_index: usize },
    /// The previous play was less than one cooldown ago.
    CoolingDown,
    /// No players are configured.
    Unavailable,
    /// Every player failed.
    Failed,
}

pub struct SoundChannel {
    players: Vec<Arc<dyn SoundPlayer>>,
    cooldown: Duration,
    last_attempt: Mutex<Option<Instant>>,
}

impl SoundChannel {
    /// `players[0]` is the primary player, the rest are fallbacks.
    pub fn new(players: Vec<Arc<dyn SoundPlayer>>, cooldown: Duration) -> Self {
        Self {
            players,
            cooldown,
            last_attempt: Mutex::new(None),
        }
    }

    pub async fn play(&self) -> SoundOutcome {
        if self.players.is_empty() {
            return SoundOutcome::Unavailable;
        }
        if !self.claim_slot() {
            tracing::debug!(
                cooldown_ms = self.cooldown.as_millis() as u64,
                "Sound skipped, cooldown active"
            );
            return SoundOutcome::CoolingDown;
        }

        for (player_index, player) in self.players.iter().enumerate() {
            match player.play().await {
                Ok(()) => return SoundOutcome::Played { player_index },
                Err(e) => {
                    tracing::warn!(
                        player = player.name(),
                        error = %e,
                        "Sound player failed, trying next"
                    );
                }
            }
        }

        tracing::warn!("All sound players failed");
        SoundOutcome::Failed
    }

    /// Start a new cooldown window if the previous one has elapsed.
    fn claim_slot(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last_attempt.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = *last {
            if now.duration_since(previous) < self.cooldown {
                return false;
            }
        }
        *last = Some(now);
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::delivery::DeliveryError;

    struct CountingPlayer {
        plays: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl SoundPlayer for CountingPlayer {
        async fn play(&self) -> Result<(), DeliveryError> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(DeliveryError::Sound("device busy".into()))
            } else {
                Ok(())
            }
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn player(fail: bool) -> (Arc<dyn SoundPlayer>, Arc<AtomicUsize>) {
        let plays = Arc::new(AtomicUsize::new(0));
        let player = Arc::new(CountingPlayer {
            plays: plays.clone(),
            fail,
        });
        (player, plays)
    }

    #[tokio::test(start_paused = true)]
    async fn second_play_within_cooldown_is_skipped() {
        let (primary, plays) = player(false);
        let channel = SoundChannel::new(vec![primary], DEFAULT_SOUND_COOLDOWN);

        assert_eq!(channel.play().await, SoundOutcome::Played { player_index: 0 });
        tokio::time::advance(Duration::from_millis(1999)).await;
        assert_eq!(channel.play().await, SoundOutcome::CoolingDown);
        assert_eq!(plays.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(channel.play().await, SoundOutcome::Played { player_index: 0 });
        assert_eq!(plays.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_player_used_when_primary_fails() {
        let (primary, primary_plays) = player(true);
        let (fallback, fallback_plays) = player(false);
        let channel = SoundChannel::new(vec![primary, fallback], DEFAULT_SOUND_COOLDOWN);

        assert_eq!(channel.play().await, SoundOutcome::Played { player_index: 1 });
        assert_eq!(primary_plays.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_plays.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_attempt_still_starts_cooldown() {
        let (primary, plays) = player(true);
        let channel = SoundChannel::new(vec![primary], DEFAULT_SOUND_COOLDOWN);

        assert_eq!(channel.play().await, SoundOutcome::Failed);
        assert_eq!(channel.play().await, SoundOutcome::CoolingDown);
        assert_eq!(plays.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_players_is_unavailable() {
        let channel = SoundChannel::new(Vec::new(), DEFAULT_SOUND_COOLDOWN);
        assert_eq!(channel.play().await, SoundOutcome::Unavailable);
    }
}
