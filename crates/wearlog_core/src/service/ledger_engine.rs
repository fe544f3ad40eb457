//! Garment lifecycle ledger engine.
//!
//! # Responsibility
//! - Fold a garment's event log into `DerivedState`.
//! - Enforce at most one `wear` and one `wash` per garment per calendar day.
//!
//! # Invariants
//! - The engine caches nothing; every answer is recomputed from the store.
//! - A rejected write leaves the log untouched.
//! - Store errors are propagated unchanged in meaning and never retried.
//!
//! # Concurrency
//! - `record` writes through `EventStore::append_if_absent`. The SQLite and
//!   in-memory stores make check and append atomic; a store relying on the
//!   default implementation may let two concurrent same-day writes through.

use crate::model::day::{DayBoundaryZone, DayWindow};
use crate::model::event::{EventFilter, EventKind, GarmentEvent};
use crate::model::garment::GarmentId;
use crate::model::state::DerivedState;
use crate::repo::event_store::{EventStore, StoreError};
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger engine failure.
#[derive(Debug)]
pub enum LedgerError {
    /// Backing store unreachable; the caller owns retry policy.
    StoreUnavailable(StoreError),
    /// Referenced garment does not exist.
    NotFound(GarmentId),
    /// An event of this kind was already logged on this calendar day.
    RejectedDuplicate { kind: EventKind, date: NaiveDate },
    /// No calendar day could be resolved for the instant.
    UnresolvableDay(DateTime<Utc>),
    /// Any other store failure.
    Store(StoreError),
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StoreUnavailable(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "garment not found: {id}"),
            Self::RejectedDuplicate { kind, date } => {
                write!(f, "only one {kind} can be logged per day; already logged on {date}")
            }
            Self::UnresolvableDay(instant) => {
                write!(f, "cannot resolve calendar day for {}", instant.to_rfc3339())
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LedgerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StoreUnavailable(err) | Self::Store(err) => Some(err),
            Self::NotFound(_) | Self::RejectedDuplicate { .. } | Self::UnresolvableDay(_) => None,
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => Self::NotFound(id),
            other if other.is_unavailable() => Self::StoreUnavailable(other),
            other => Self::Store(other),
        }
    }
}

/// Whether each event kind may still be logged on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyEligibility {
    pub date: NaiveDate,
    pub can_wear: bool,
    pub can_wash: bool,
}

impl DailyEligibility {
    pub fn allows(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::Wear => self.can_wear,
            EventKind::Wash => self.can_wash,
        }
    }
}

/// Store-backed ledger engine.
pub struct LedgerEngine<S: EventStore> {
    store: S,
    zone: DayBoundaryZone,
}

impl<S: EventStore> LedgerEngine<S> {
    /// Creates an engine whose calendar days follow `zone`.
    pub fn new(store: S, zone: DayBoundaryZone) -> Self {
        Self { store, zone }
    }

    pub fn zone(&self) -> DayBoundaryZone {
        self.zone
    }

    /// Current wear/wash state of a garment.
    ///
    /// Pure read; repeated calls without writes return identical results.
    pub fn derive(&self, garment_id: GarmentId) -> LedgerResult<DerivedState> {
        let log = self
            .store
            .query(garment_id, &EventFilter::all())
            .map_err(|err| log_store_error("ledger_derive", garment_id, err))?;
        let state = DerivedState::fold(&log);
        debug!(
            "event=ledger_derive module=ledger status=ok garment_id={} events={} wears_since_last_wash={}",
            garment_id,
            log.len(),
            state.wears_since_last_wash
        );
        Ok(state)
    }

    /// Returns whether no `kind` event exists yet on the calendar day
    /// containing `as_of`. Read-only.
    pub fn can_log(
        &self,
        garment_id: GarmentId,
        kind: EventKind,
        as_of: DateTime<Utc>,
    ) -> LedgerResult<bool> {
        let window = self.window_for(as_of)?;
        self.is_open(garment_id, &window, kind)
    }

    /// Evaluates `can_log` for both event kinds on one resolved day.
    pub fn daily_eligibility(
        &self,
        garment_id: GarmentId,
        as_of: DateTime<Utc>,
    ) -> LedgerResult<DailyEligibility> {
        let window = self.window_for(as_of)?;
        Ok(DailyEligibility {
            date: window.date,
            can_wear: self.is_open(garment_id, &window, EventKind::Wear)?,
            can_wash: self.is_open(garment_id, &window, EventKind::Wash)?,
        })
    }

    /// Appends a `kind` event at `as_of` unless one already exists that
    /// calendar day, then returns the freshly derived state.
    ///
    /// # Errors
    /// - `RejectedDuplicate` when the day already has a `kind` event; nothing
    ///   is written.
    /// - `NotFound` / `StoreUnavailable` / `Store` from the event store.
    pub fn record(
        &self,
        garment_id: GarmentId,
        kind: EventKind,
        as_of: DateTime<Utc>,
    ) -> LedgerResult<DerivedState> {
        let window = self.window_for(as_of)?;
        let event = GarmentEvent::new(garment_id, kind, as_of);

        let appended = self
            .store
            .append_if_absent(&event, &window.filter(kind))
            .map_err(|err| log_store_error("ledger_record", garment_id, err))?;
        if !appended {
            info!(
                "event=ledger_record module=ledger status=rejected garment_id={} kind={} date={}",
                garment_id, kind, window.date
            );
            return Err(LedgerError::RejectedDuplicate {
                kind,
                date: window.date,
            });
        }

        info!(
            "event=ledger_record module=ledger status=ok garment_id={} kind={} date={}",
            garment_id, kind, window.date
        );
        self.derive(garment_id)
    }

    fn is_open(
        &self,
        garment_id: GarmentId,
        window: &DayWindow,
        kind: EventKind,
    ) -> LedgerResult<bool> {
        let same_day = self
            .store
            .query(garment_id, &window.filter(kind))
            .map_err(|err| log_store_error("ledger_can_log", garment_id, err))?;
        Ok(same_day.is_empty())
    }

    fn window_for(&self, as_of: DateTime<Utc>) -> LedgerResult<DayWindow> {
        self.zone
            .window_containing(as_of)
            .ok_or(LedgerError::UnresolvableDay(as_of))
    }
}

fn log_store_error(event: &str, garment_id: GarmentId, err: StoreError) -> LedgerError {
    match &err {
        StoreError::NotFound(_) => debug!(
            "event={event} module=ledger status=not_found garment_id={garment_id}"
        ),
        other => warn!(
            "event={event} module=ledger status=error garment_id={garment_id} error={other}"
        ),
    }
    err.into()
}
