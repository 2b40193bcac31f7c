//! Issues the next ticket code of the local calendar day.
//!
//! The sequencer keeps no state of its own: every call reads the newest
//! ticket issued since local midnight and increments its trailing number.
//! Concurrent callers may compute the same code; the per-day unique index on
//! ticket codes and the caller's insert retry resolve that race.
//!
//! When the store cannot be read, or the day runs past 9999 tickets, the
//! sequence is derived from the wall clock instead.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use tracing::{error, warn};

use super::{TicketCode, TicketWidth, trailing_number};
use crate::domain::ports::{VisitRepository, VisitRepositoryError};
use crate::domain::{RetryPolicy, Sleeper, derive_initials};

const MAX_DAILY_SEQUENCE: u32 = 9999;
const DEGRADED_MODULUS: u32 = 10_000;
const OVERFLOW_MODULUS: u32 = 100_000;

/// How the sequence of an issued ticket was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketOrigin {
    /// Incremented from the newest ticket of the day.
    Daily,
    /// Clock-derived because the last ticket could not be read.
    Degraded,
    /// Clock-derived because the daily sequence passed 9999.
    Overflow,
}

/// A freshly issued ticket code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedTicket {
    pub code: TicketCode,
    pub origin: TicketOrigin,
    /// Local calendar day the sequence belongs to.
    pub day: NaiveDate,
}

/// Tuning for [`TicketSequencer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketSequencerConfig {
    /// Schedule for reading the newest ticket of the day.
    pub read_retry: RetryPolicy,
}

impl Default for TicketSequencerConfig {
    fn default() -> Self {
        Self {
            read_retry: RetryPolicy::exponential(5, Duration::from_millis(100)),
        }
    }
}

/// Computes ticket codes from the visit store and the clock.
pub struct TicketSequencer<R> {
    visits: Arc<R>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    config: TicketSequencerConfig,
}

impl<R> TicketSequencer<R> {
    pub fn new(visits: Arc<R>, clock: Arc<dyn Clock>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            visits,
            clock,
            sleeper,
            config: TicketSequencerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: TicketSequencerConfig) -> Self {
        self.config = config;
        self
    }
}

impl<R> TicketSequencer<R>
where
    R: VisitRepository,
{
    /// Issue the next ticket for a patient with the given display name.
    ///
    /// Never fails: store outages and sequence overflow fall back to
    /// clock-derived sequences reported through [`TicketOrigin`].
    pub async fn next_ticket(&self, display_name: &str) -> IssuedTicket {
        let initials = derive_initials(display_name);
        let now = self.clock.local();
        let day = now.date_naive();
        let since = local_midnight(now);

        let last = match self.read_last_ticket(since).await {
            Ok(last) => last,
            Err(_) => {
                let sequence = self.clock_sequence(DEGRADED_MODULUS);
                return IssuedTicket {
                    code: TicketCode::issued(&initials, sequence, TicketWidth::Four),
                    origin: TicketOrigin::Degraded,
                    day,
                };
            }
        };

        let next = last
            .as_deref()
            .and_then(trailing_number)
            .map_or(1, |value| value.saturating_add(1));

        match u32::try_from(next)
            .ok()
            .filter(|sequence| *sequence <= MAX_DAILY_SEQUENCE)
        {
            Some(sequence) => {
                let width = TicketWidth::for_sequence(sequence);
                if width == TicketWidth::Four {
                    warn!(sequence, "daily ticket sequence passed 999");
                }
                IssuedTicket {
                    code: TicketCode::issued(&initials, sequence, width),
                    origin: TicketOrigin::Daily,
                    day,
                }
            }
            None => {
                let sequence = self.clock_sequence(OVERFLOW_MODULUS);
                error!(
                    attempted = next,
                    fallback = sequence,
                    "daily ticket sequence overflowed; using clock-derived sequence",
                );
                IssuedTicket {
                    code: TicketCode::issued(&initials, sequence, TicketWidth::Five),
                    origin: TicketOrigin::Overflow,
                    day,
                }
            }
        }
    }

    async fn read_last_ticket(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Option<String>, VisitRepositoryError> {
        let policy = self.config.read_retry;
        let attempts = policy.attempts();
        let mut attempt = 1;
        loop {
            match self.visits.last_ticket_since(since).await {
                Ok(last) => return Ok(last),
                Err(err) if attempt < attempts => {
                    let delay = policy.delay_after(attempt);
                    warn!(
                        attempt,
                        max_attempts = attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "last ticket read failed; retrying",
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    error!(attempts, error = %err, "last ticket read failed");
                    return Err(err);
                }
            }
        }
    }

    fn clock_sequence(&self, modulus: u32) -> u32 {
        let millis = self.clock.utc().timestamp_millis();
        u32::try_from(millis.rem_euclid(i64::from(modulus))).unwrap_or_default()
    }
}

/// Start of the local calendar day containing `now`, expressed in UTC.
pub(crate) fn local_midnight(now: DateTime<Local>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&midnight).earliest() {
        Some(start) => start.with_timezone(&Utc),
        // Midnight skipped by a DST jump: keep the current offset.
        None => {
            let offset = TimeDelta::seconds(i64::from(now.offset().local_minus_utc()));
            (midnight - offset).and_utc()
        }
    }
}
