//! Date sessions.
//!
//! Selecting a date starts a new session and ends the previous one. Work
//! started for a date (review fetches, the periodic likes reorder) carries a
//! [`SessionToken`]; once the session ends the token is cancelled and any
//! result that still arrives is dropped instead of touching the new view.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Token carried by work started for one date.
#[derive(Debug, Clone)]
pub struct SessionToken {
    date: String,
    generation: u64,
    cancel: CancellationToken,
}

impl SessionToken {
    /// Date the work belongs to.
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Generation of the session that issued the token.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the session has ended.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolve when the session ends.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Run `fut` unless the session ends first.
    pub async fn run_until_cancelled<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            output = fut => Some(output),
        }
    }
}

/// Lifecycle of the cards shown for one date.
#[derive(Debug)]
pub struct DateSession {
    date: String,
    generation: u64,
    cancel: CancellationToken,
    ticker: Option<JoinHandle<()>>,
}

impl DateSession {
    /// Start a session for `date`.
    pub fn new(date: impl Into<String>, generation: u64) -> Self {
        Self {
            date: date.into(),
            generation,
            cancel: CancellationToken::new(),
            ticker: None,
        }
    }

    /// Date of this session.
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Generation number, unique per selection.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Token for work started under this session.
    pub fn token(&self) -> SessionToken {
        SessionToken {
            date: self.date.clone(),
            generation: self.generation,
            cancel: self.cancel.child_token(),
        }
    }

    /// Run `tick` every `period` until the session ends.
    ///
    /// The first tick fires one period from now. Replaces any previous
    /// ticker of this session.
    pub fn start_ticker<F, Fut>(&mut self, period: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.token();
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => tick().await,
                }
            }
            debug!(date = token.date(), "Session ticker stopped");
        });

        if let Some(previous) = self.ticker.replace(handle) {
            previous.abort();
        }
    }

    /// End the session: cancel its work and stop its ticker.
    pub fn end(&mut self) {
        self.cancel.cancel();
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    /// Whether the session has ended.
    pub fn is_ended(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for DateSession {
    fn drop(&mut self) {
        self.end();
    }
}
