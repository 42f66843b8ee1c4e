//! Clock - Time source and sleep used by polling loops
//!
//! Production code runs on [`TokioClock`]. Tests use [`ManualClock`], where
//! sleeping advances virtual time immediately.

use std::sync::Mutex;
use std::time::Duration;

use crate::provider::BoxFuture;

pub trait Clock: Send + Sync {
    /// Time elapsed since the clock was created
    fn now(&self) -> Duration;

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()>;
}

/// Clock backed by the tokio timer
#[derive(Debug, Clone)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
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

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Virtual clock; every sleep returns at once and moves time forward
#[derive(Debug, Default)]
pub struct ManualClock {
    inner: Mutex<ManualClockInner>,
}

#[derive(Debug, Default)]
struct ManualClockInner {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.elapsed += duration;
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.sleeps.clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.elapsed
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.elapsed += duration;
            inner.sleeps.push(duration);
        }
        Box::pin(async {})
    }
}
