//! Global invocation-rate pacing.
//!
//! Worker invocations are a scarce externally-metered resource, so one
//! pacer bounds them pipeline-wide with fixed-window counting: at most
//! `ceiling` permits per window, callers suspended (never rejected,
//! unless a maximum wait is configured) until the window rolls over.

use std::time::Duration;
use tokio::time::Instant;

/// Pacer configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacerConfig {
    /// Maximum invocations per window; `None` means unbounded
    pub ceiling: Option<u32>,
    /// Window length
    pub window: Duration,
    /// Upper bound on a single `acquire` wait; `None` waits indefinitely
    pub max_wait: Option<Duration>,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            ceiling: Some(30),
            window: Duration::from_secs(60),
            max_wait: None,
        }
    }
}

impl PacerConfig {
    /// Configuration with no ceiling: `acquire` always returns at once
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            ceiling: None,
            window: Duration::from_secs(60),
            max_wait: None,
        }
    }

    /// Configuration with `ceiling` permits per `window`
    #[must_use]
    pub const fn per_window(ceiling: u32, window: Duration) -> Self {
        Self {
            ceiling: Some(ceiling),
            window,
            max_wait: None,
        }
    }

    /// Bound each `acquire` wait, turning long waits into errors
    #[must_use]
    pub const fn with_max_wait(mut self, bound: Duration) -> Self {
        self.max_wait = Some(bound);
        self
    }
}

/// Pacer error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacerError {
    /// The configured maximum wait would be exceeded
    #[error("Rate-limit wait of {needed:?} exceeds the configured bound of {bound:?}")]
    Timeout {
        /// Total wait the acquisition would need
        needed: Duration,
        /// Configured bound
        bound: Duration,
    },
}

/// Proof that one invocation slot was granted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Permit {
    /// How long the caller was suspended before the grant
    pub waited: Duration,
}

/// Fixed-window invocation pacer, global to one pipeline run
///
/// Owned and exclusively used by the executor on its single control
/// thread; fairness beyond arrival order is moot because only one stage
/// runs at a time.
#[derive(Debug)]
pub struct RatePacer {
    config: PacerConfig,
    window_start: Option<Instant>,
    count: u32,
}

impl RatePacer {
    /// Create a pacer
    #[must_use]
    pub fn new(config: PacerConfig) -> Self {
        Self {
            config,
            window_start: None,
            count: 0,
        }
    }

    /// Invocations granted in the current window
    #[must_use]
    pub const fn invocations_in_window(&self) -> u32 {
        self.count
    }

    /// Acquire one invocation slot
    ///
    /// Suspends until a slot is available under the ceiling within the
    /// current window; with no ceiling configured, returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`PacerError::Timeout`] only when a `max_wait` bound is
    /// configured and the needed wait would exceed it.
    pub async fn acquire(&mut self) -> Result<Permit, PacerError> {
        let Some(ceiling) = self.config.ceiling else {
            return Ok(Permit {
                waited: Duration::ZERO,
            });
        };
        // A zero ceiling would never grant; treat it as one per window
        let ceiling = ceiling.max(1);

        let begin = Instant::now();
        loop {
            let now = Instant::now();
            let window_start = *self.window_start.get_or_insert(now);
            if now.duration_since(window_start) >= self.config.window {
                self.window_start = Some(now);
                self.count = 0;
            }

            if self.count < ceiling {
                self.count += 1;
                return Ok(Permit {
                    waited: now.duration_since(begin),
                });
            }

            let elapsed_in_window = now.duration_since(
                self.window_start.expect("window start set above"),
            );
            let remaining = self.config.window.saturating_sub(elapsed_in_window);
            if let Some(bound) = self.config.max_wait {
                let needed = now.duration_since(begin) + remaining;
                if needed > bound {
                    return Err(PacerError::Timeout { needed, bound });
                }
            }

            tracing::debug!(?remaining, "invocation ceiling reached, waiting for window reset");
            tokio::time::sleep(remaining).await;
        }
    }
}
