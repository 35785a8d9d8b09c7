//! Time sources for `/health`
//!
//! A probe reports two different notions of time: the wall-clock instant of
//! the request and how long the process has been up. Wall time can jump
//! backwards (NTP, manual changes), so uptime is measured on the monotonic
//! clock instead.

use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    /// Wall-clock time of the current request
    fn now(&self) -> DateTime<Utc>;

    /// Time elapsed since the process started; never decreases
    fn uptime(&self) -> Duration;
}

/// Clock anchored at the instant the process started
pub struct ProcessClock {
    started: Instant,
}

impl ProcessClock {
    pub fn started_at(started: Instant) -> Self {
        Self { started }
    }
}

impl Clock for ProcessClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Hand-driven clock: wall time and uptime only move through `advance`
#[cfg(test)]
#[allow(clippy::expect_used)]
pub struct ManualClock {
    inner: std::sync::Mutex<(DateTime<Utc>, Duration)>,
}

#[cfg(test)]
#[allow(clippy::expect_used)]
impl ManualClock {
    pub fn new(now: DateTime<Utc>, uptime: Duration) -> Self {
        Self {
            inner: std::sync::Mutex::new((now, uptime)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut inner = self.inner.lock().expect("ManualClock lock poisoned");
        inner.0 += chrono::Duration::from_std(by).expect("advance out of range");
        inner.1 += by;
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.inner.lock().expect("ManualClock lock poisoned").0
    }

    fn uptime(&self) -> Duration {
        self.inner.lock().expect("ManualClock lock poisoned").1
    }
}
