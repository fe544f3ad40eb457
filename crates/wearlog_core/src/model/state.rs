//! Wear/wash state folded from a garment's event log.
//!
//! # Invariants
//! - `wears_since_last_wash` counts `wear` events after the latest `wash`,
//!   or all `wear` events when the garment was never washed.
//! - A `wash` resets the count to zero as of its own timestamp.

use super::event::{EventKind, GarmentEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current wear/wash facts for one garment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedState {
    pub last_wash_at: Option<DateTime<Utc>>,
    pub wears_since_last_wash: u32,
}

/// Lifecycle phase of a garment's ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerPhase {
    /// No events were ever logged.
    NoHistory,
    /// Worn `n` times, never washed.
    NeverWashed(u32),
    /// Worn `n` times since the latest wash.
    SinceWash(u32),
}

impl DerivedState {
    /// Folds an ordered event log left to right.
    ///
    /// Callers must pass events ascending by `occurred_at`.
    pub fn fold<'a>(events: impl IntoIterator<Item = &'a GarmentEvent>) -> Self {
        events
            .into_iter()
            .fold(Self::default(), |state, event| state.apply(event))
    }

    /// Returns the state after one more event.
    pub fn apply(self, event: &GarmentEvent) -> Self {
        match event.kind {
            EventKind::Wash => Self {
                last_wash_at: Some(event.occurred_at),
                wears_since_last_wash: 0,
            },
            EventKind::Wear => Self {
                last_wash_at: self.last_wash_at,
                wears_since_last_wash: self.wears_since_last_wash.saturating_add(1),
            },
        }
    }

    pub fn phase(&self) -> LedgerPhase {
        match (self.last_wash_at, self.wears_since_last_wash) {
            (Some(_), wears) => LedgerPhase::SinceWash(wears),
            (None, 0) => LedgerPhase::NoHistory,
            (None, wears) => LedgerPhase::NeverWashed(wears),
        }
    }
}
