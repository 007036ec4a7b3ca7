//! Fixed-window admission limiter.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use super::window::TimeWindow;
use crate::error::{DocgateError, Result};

/// Mutable window state. Only touched under `Shared::state`.
#[derive(Debug)]
struct WindowState {
    /// Admissions left in the current window, never above capacity
    available: u32,
    shut_down: bool,
}

/// Outcome of a single, non-blocking admission attempt.
enum Admission {
    Granted { remaining: u32 },
    Exhausted,
    Closed,
}

/// State shared between callers and the replenishment task.
struct Shared {
    capacity: u32,
    state: Mutex<WindowState>,
    /// Woken on every window reset and on shutdown
    replenished: Notify,
}

impl Shared {
    fn try_take(&self) -> Admission {
        let mut state = self.state.lock();
        if state.shut_down {
            return Admission::Closed;
        }
        if state.available == 0 {
            return Admission::Exhausted;
        }
        state.available -= 1;
        Admission::Granted {
            remaining: state.available,
        }
    }

    fn replenish(&self) {
        {
            let mut state = self.state.lock();
            if state.shut_down {
                return;
            }
            state.available = self.capacity;
        }
        debug!(capacity = self.capacity, "Window replenished");
        self.replenished.notify_waiters();
    }
}

/// A fixed-window rate limiter.
///
/// At most `capacity` admissions are granted per period. Capacity is reset
/// to full (not topped up) at every period boundary, so up to `2 * capacity`
/// admissions can land in a short span straddling a boundary.
///
/// Callers over capacity wait in [`RateLimiter::acquire`] until the next
/// reset. The waiting future holds no lock and consumes nothing until it is
/// admitted, so dropping it (or using [`RateLimiter::acquire_timeout`])
/// cancels cleanly.
pub struct RateLimiter {
    shared: Arc<Shared>,
    period: Duration,
    replenisher: Mutex<Option<JoinHandle<()>>>,
}

impl RateLimiter {
    /// Create a limiter admitting `capacity` requests per `window`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(capacity: u32, window: TimeWindow) -> Result<Self> {
        Self::with_period(capacity, window.duration())
    }

    /// Create a limiter with an arbitrary period.
    pub fn with_period(capacity: u32, period: Duration) -> Result<Self> {
        if capacity == 0 {
            return Err(DocgateError::InvalidCapacity);
        }
        if period.is_zero() {
            return Err(DocgateError::Config(
                "rate limit period must be greater than zero".to_string(),
            ));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| DocgateError::Runtime(e.to_string()))?;

        // The window is full at construction; the first reset is one period out.
        let shared = Arc::new(Shared {
            capacity,
            state: Mutex::new(WindowState {
                available: capacity,
                shut_down: false,
            }),
            replenished: Notify::new(),
        });

        let task_shared = Arc::clone(&shared);
        let first_reset = Instant::now() + period;
        let replenisher = runtime.spawn(async move {
            let mut ticker = interval_at(first_reset, period);
            // After a stall, resets stay at least one period apart
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                task_shared.replenish();
            }
        });

        info!(
            capacity,
            period_ms = period.as_millis() as u64,
            "Rate limiter started"
        );

        Ok(Self {
            shared,
            period,
            replenisher: Mutex::new(Some(replenisher)),
        })
    }

    /// Wait until one admission is available and take it.
    ///
    /// Returns [`DocgateError::Cancelled`] if the limiter is shut down
    /// before or while waiting.
    pub async fn acquire(&self) -> Result<()> {
        loop {
            // Register interest before checking so a reset between the
            // check and the await is not lost.
            let notified = self.shared.replenished.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.shared.try_take() {
                Admission::Granted { remaining } => {
                    debug!(remaining, "Admission granted");
                    return Ok(());
                }
                Admission::Closed => return Err(DocgateError::Cancelled),
                Admission::Exhausted => {
                    trace!("Window exhausted, waiting for replenishment");
                    notified.await;
                }
            }
        }
    }

    /// Like [`RateLimiter::acquire`], but gives up after `wait`.
    ///
    /// A timed-out wait consumes no capacity.
    pub async fn acquire_timeout(&self, wait: Duration) -> Result<()> {
        match tokio::time::timeout(wait, self.acquire()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    wait_ms = wait.as_millis() as u64,
                    "Timed out waiting for admission"
                );
                Err(DocgateError::Cancelled)
            }
        }
    }

    /// Take an admission only if one is available right now.
    pub fn try_acquire(&self) -> bool {
        matches!(self.shared.try_take(), Admission::Granted { .. })
    }

    /// Stop replenishment and release every blocked caller.
    ///
    /// Idempotent. Blocked and future `acquire` calls return
    /// [`DocgateError::Cancelled`].
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            state.available = 0;
        }

        if let Some(handle) = self.replenisher.lock().take() {
            handle.abort();
        }
        self.shared.replenished.notify_waiters();

        info!("Rate limiter shut down");
    }

    /// Whether [`RateLimiter::shutdown`] has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shared.state.lock().shut_down
    }

    /// Admissions left in the current window.
    pub fn available(&self) -> u32 {
        self.shared.state.lock().available
    }

    /// Maximum admissions per window.
    pub fn capacity(&self) -> u32 {
        self.shared.capacity
    }

    /// Length of one window.
    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        if let Some(handle) = self.replenisher.get_mut().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("capacity", &self.shared.capacity)
            .field("period", &self.period)
            .field("state", &*self.shared.state.lock())
            .finish()
    }
}
