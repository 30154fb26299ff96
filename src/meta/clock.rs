//! Coarse clocks used as recency stamps
//!
//! Slot tables stamp every registration with the current tick. Reading the
//! system clock on every call costs more than the rest of a cache hit, so
//! [`CoarseClock`] republishes the elapsed time from a background thread once
//! per interval and readers just load an atomic. [`ManualClock`] is the
//! deterministic stand-in for tests and for decoders replaying a stream.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default refresh interval of a [`CoarseClock`]
pub const DEFAULT_CLOCK_INTERVAL: Duration = Duration::from_millis(16);

/// Source of monotonically non-decreasing recency ticks
pub trait Clock: Send + Sync {
    /// Current tick
    fn tick(&self) -> u64;
}

struct TickerState {
    tick: AtomicU64,
    stopped: AtomicBool,
}

/// Clock whose tick is the elapsed milliseconds since construction,
/// refreshed once per interval
///
/// The reported value lags real time by at most one interval.
pub struct CoarseClock {
    state: Arc<TickerState>,
    interval: Duration,
    ticker: Option<JoinHandle<()>>,
}

impl CoarseClock {
    /// Start a clock refreshed every `interval`
    pub fn new(interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::InvalidConfiguration(
                "clock interval must be greater than zero".to_string(),
            ));
        }

        let state = Arc::new(TickerState {
            tick: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
        });

        let origin = Instant::now();
        let ticker_state = Arc::clone(&state);
        let ticker = thread::Builder::new()
            .name("canoe-coarse-clock".to_string())
            .spawn(move || {
                while !ticker_state.stopped.load(Ordering::Acquire) {
                    // Unparked early when the clock is dropped
                    thread::park_timeout(interval);
                    let elapsed = origin.elapsed().as_millis() as u64;
                    ticker_state.tick.fetch_max(elapsed, Ordering::Relaxed);
                }
            })
            .map_err(|e| Error::Io(format!("Failed to spawn clock ticker: {}", e)))?;

        info!(interval_ms = interval.as_millis() as u64, "Coarse clock started");

        Ok(Self {
            state,
            interval,
            ticker: Some(ticker),
        })
    }

    /// Start a clock with [`DEFAULT_CLOCK_INTERVAL`]
    pub fn with_default_interval() -> Result<Self> {
        Self::new(DEFAULT_CLOCK_INTERVAL)
    }

    /// Refresh interval
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Clock for CoarseClock {
    fn tick(&self) -> u64 {
        self.state.tick.load(Ordering::Relaxed)
    }
}

impl Drop for CoarseClock {
    fn drop(&mut self) {
        self.state.stopped.store(true, Ordering::Release);
        if let Some(ticker) = self.ticker.take() {
            ticker.thread().unpark();
            let _ = ticker.join();
            debug!("Coarse clock stopped");
        }
    }
}

/// Clock advanced only by explicit calls
///
/// Clones share the same tick.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    tick: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock at tick 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `delta` ticks and return the new tick
    pub fn advance(&self, delta: u64) -> u64 {
        self.tick.fetch_add(delta, Ordering::Relaxed) + delta
    }

    /// Move to `tick`; moving backwards is ignored
    pub fn set(&self, tick: u64) {
        self.tick.fetch_max(tick, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn tick(&self) -> u64 {
        self.tick.load(Ordering::Relaxed)
    }
}
