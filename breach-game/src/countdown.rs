//! Tokio-driven countdown that ends a session even when nobody is picking.
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::clock::Clock;
use crate::config::GameConfiguration;
use crate::error::BreachError;
use crate::session::{BreachSession, SessionOutcome};

/// Clock reading [`tokio::time::Instant`], so paused runtimes control it.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// The instant `offset` after this clock's origin.
    #[must_use]
    pub fn instant_at(&self, offset: Duration) -> Instant {
        self.origin + offset
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A session shared behind a mutex, with a background task that commits
/// the timeout at the deadline.
///
/// The task is aborted as soon as a pick ends the session, and when the
/// handle is dropped.
pub struct SharedSession {
    session: Arc<Mutex<BreachSession<TokioClock>>>,
    expiry: JoinHandle<()>,
}

impl SharedSession {
    /// Start a session and schedule its expiry. Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`BreachError::InvalidArgument`] if the matrix is not square.
    pub fn start(config: GameConfiguration) -> Result<Self, BreachError> {
        let clock = TokioClock::new();
        let session = BreachSession::with_clock(config, clock)?;
        let deadline = clock.instant_at(session.deadline());

        let session = Arc::new(Mutex::new(session));
        let handle = Arc::clone(&session);
        let expiry = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let outcome = handle.lock().await.poll();
            log::debug!("expiry task fired: {outcome}");
        });

        Ok(Self { session, expiry })
    }

    /// Pick a cell; see [`BreachSession::pick`].
    ///
    /// # Errors
    ///
    /// Same as [`BreachSession::pick`].
    pub async fn pick(&self, row: usize, column: usize) -> Result<SessionOutcome, BreachError> {
        let outcome = self.session.lock().await.pick(row, column)?;
        if outcome.is_terminal() {
            self.expiry.abort();
        }
        Ok(outcome)
    }

    pub async fn outcome(&self) -> SessionOutcome {
        self.session.lock().await.outcome()
    }

    pub async fn remaining_milliseconds(&self) -> u64 {
        self.session.lock().await.remaining_milliseconds()
    }

    /// Run `f` against the locked session.
    pub async fn with_session<R>(&self, f: impl FnOnce(&BreachSession<TokioClock>) -> R) -> R {
        f(&*self.session.lock().await)
    }

    /// Whether the expiry task is still waiting for the deadline.
    #[must_use]
    pub fn expiry_pending(&self) -> bool {
        !self.expiry.is_finished()
    }
}

impl Drop for SharedSession {
    fn drop(&mut self) {
        self.expiry.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IllegalMove;
    use crate::session::LossCause;

    fn config(timeout_milliseconds: u64) -> GameConfiguration {
        GameConfiguration::new(
            ["AA", "BB", "CC", "DD"].map(String::from).to_vec(),
            vec![vec!["AA".to_string()]],
            4,
            timeout_milliseconds,
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_commits_loss_without_picks() {
        let shared = SharedSession::start(config(1_000)).unwrap();
        assert!(shared.expiry_pending());
        assert_eq!(shared.remaining_milliseconds().await, 1_000);

        tokio::time::sleep(Duration::from_millis(1_001)).await;

        assert!(!shared.expiry_pending());
        assert_eq!(
            shared.outcome().await,
            SessionOutcome::Lost {
                cause: LossCause::TimedOut
            }
        );
        assert_eq!(shared.remaining_milliseconds().await, 0);
        assert_eq!(
            shared.pick(0, 0).await,
            Err(BreachError::IllegalMove(IllegalMove::SessionOver))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn win_cancels_expiry() {
        let shared = SharedSession::start(config(1_000)).unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(shared.pick(0, 0).await.unwrap(), SessionOutcome::Won);

        tokio::time::sleep(Duration::from_millis(5_000)).await;
        assert!(!shared.expiry_pending());
        assert_eq!(shared.outcome().await, SessionOutcome::Won);
        assert_eq!(shared.remaining_milliseconds().await, 600);
        assert_eq!(shared.with_session(|s| s.buffer().len()).await, 1);
    }
}
