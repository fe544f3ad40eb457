//! Calendar-day windows for the once-per-day write gate.
//!
//! # Responsibility
//! - Resolve the calendar day containing an instant in a configured zone.
//! - Express that day as a UTC range usable by event store filters.
//!
//! # Invariants
//! - A window is half-open: `start <= t < end`.
//! - `end` is the start of the next local day, so DST transition days are
//!   23 or 25 hours long rather than a fixed 24.
//! - When local midnight does not exist (DST gap), the day starts at the
//!   first local instant that does.

use super::event::{EventFilter, EventKind};
use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const GAP_PROBE_STEP_MINUTES: i64 = 15;
const GAP_PROBE_MAX_STEPS: i64 = 12;

/// Time zone that defines where one calendar day ends and the next begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DayBoundaryZone {
    /// The evaluating process's local zone.
    #[default]
    Local,
    /// A fixed IANA zone, independent of the process locale.
    Named(Tz),
}

/// Error for unknown day-boundary zone names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownZoneError(pub String);

impl Display for UnknownZoneError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown day boundary zone `{}`; expected `local` or an IANA zone name",
            self.0
        )
    }
}

impl Error for UnknownZoneError {}

impl FromStr for DayBoundaryZone {
    type Err = UnknownZoneError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        if trimmed.eq_ignore_ascii_case("utc") {
            return Ok(Self::Named(Tz::UTC));
        }
        trimmed
            .parse::<Tz>()
            .map(Self::Named)
            .map_err(|_| UnknownZoneError(trimmed.to_string()))
    }
}

impl Display for DayBoundaryZone {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Named(tz) => f.write_str(tz.name()),
        }
    }
}

impl DayBoundaryZone {
    /// Returns the calendar day containing `instant`.
    ///
    /// Returns `None` only for instants at the edge of the representable
    /// calendar range.
    pub fn window_containing(&self, instant: DateTime<Utc>) -> Option<DayWindow> {
        match self {
            Self::Local => window_in(&Local, instant),
            Self::Named(tz) => window_in(tz, instant),
        }
    }

    /// Local calendar date of `instant` in this zone.
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Local => instant.with_timezone(&Local).date_naive(),
            Self::Named(tz) => instant.with_timezone(tz).date_naive(),
        }
    }
}

/// One local calendar day expressed in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    /// Inclusive.
    pub start: DateTime<Utc>,
    /// Exclusive.
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Last millisecond inside the window.
    pub fn last_instant(&self) -> DateTime<Utc> {
        self.end - Duration::milliseconds(1)
    }

    /// Store filter matching events of `kind` inside this day.
    pub fn filter(&self, kind: EventKind) -> EventFilter {
        EventFilter::of_kind(kind).between(self.start, self.last_instant())
    }
}

fn window_in<Z: TimeZone>(zone: &Z, instant: DateTime<Utc>) -> Option<DayWindow> {
    let date = instant.with_timezone(zone).date_naive();
    let start = start_of_day(zone, date)?;
    let end = start_of_day(zone, date.succ_opt()?)?;
    Some(DayWindow { date, start, end })
}

fn start_of_day<Z: TimeZone>(zone: &Z, date: NaiveDate) -> Option<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    (0..=GAP_PROBE_MAX_STEPS).find_map(|step| {
        let candidate = midnight + Duration::minutes(step * GAP_PROBE_STEP_MINUTES);
        zone.from_local_datetime(&candidate)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    })
}
