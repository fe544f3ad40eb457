//! Ledger events and event-log filters.
//!
//! # Responsibility
//! - Define the immutable `wear`/`wash` record appended per garment.
//! - Define the filter shape shared by every event store adapter.
//!
//! # Invariants
//! - Events are never updated or deleted once appended.
//! - `occurred_at` is truncated to millisecond precision on construction.
//! - Filter bounds are inclusive on both ends.

use super::garment::GarmentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Kind of ledger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The garment was worn.
    Wear,
    /// The garment was washed; resets the wear count.
    Wash,
}

impl EventKind {
    /// Stable storage/wire label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wear => "wear",
            Self::Wash => "wash",
        }
    }

    /// Parses a storage/wire label. Case-insensitive, surrounding whitespace ignored.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "wear" => Some(Self::Wear),
            "wash" => Some(Self::Wash),
            _ => None,
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable entry of a garment's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarmentEvent {
    pub garment_id: GarmentId,
    /// Serialized as `type` to match external schema naming.
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub occurred_at: DateTime<Utc>,
}

impl GarmentEvent {
    pub fn new(garment_id: GarmentId, kind: EventKind, occurred_at: DateTime<Utc>) -> Self {
        Self {
            garment_id,
            kind,
            occurred_at: truncate_to_millis(occurred_at),
        }
    }
}

/// Query filter for event store reads.
///
/// The default filter matches the whole log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub kind: Option<EventKind>,
    /// Inclusive lower bound.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    pub to: Option<DateTime<Utc>>,
}

impl EventFilter {
    /// Filter matching every event of a garment.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn of_kind(kind: EventKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Restricts the filter to the inclusive range `[from, to]`.
    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn matches(&self, event: &GarmentEvent) -> bool {
        if self.kind.is_some_and(|kind| kind != event.kind) {
            return false;
        }
        if self.from.is_some_and(|from| event.occurred_at < from) {
            return false;
        }
        if self.to.is_some_and(|to| event.occurred_at > to) {
            return false;
        }
        true
    }
}

/// Drops sub-millisecond precision so instants survive storage unchanged.
pub(crate) fn truncate_to_millis(instant: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(instant.timestamp_millis()).unwrap_or(instant)
}
