//! Controllable clock and sleeper doubles.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::Sleeper;

/// Clock frozen at a settable instant.
#[derive(Debug)]
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, delta: TimeDelta) {
        *self.lock_clock() += delta;
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.lock_clock() = now;
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Sleeper that returns immediately and records every requested delay.
#[derive(Debug, Default)]
pub struct RecordingSleeper(Mutex<Vec<Duration>>);

impl RecordingSleeper {
    /// Delays requested so far, in order.
    pub fn recorded(&self) -> Vec<Duration> {
        self.lock_entries().clone()
    }

    fn lock_entries(&self) -> MutexGuard<'_, Vec<Duration>> {
        match self.0.lock() {
            Ok(entries) => entries,
            Err(_) => panic!("sleeper mutex"),
        }
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.lock_entries().push(duration);
    }
}
