//! Core domain logic for WearLog.
//! This crate is the single source of truth for the garment wear/wash ledger.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::day::{DayBoundaryZone, DayWindow, UnknownZoneError};
pub use model::event::{EventFilter, EventKind, GarmentEvent};
pub use model::garment::{Garment, GarmentId, GarmentValidationError, NewGarment};
pub use model::identity::{BlankUserIdError, Identity, UserId};
pub use model::state::{DerivedState, LedgerPhase};
pub use repo::event_store::{EventStore, SqliteEventStore, StoreError, StoreResult};
pub use repo::garment_repo::{GarmentRepository, RepoError, RepoResult, SqliteGarmentRepository};
pub use repo::memory_store::InMemoryEventStore;
pub use service::ledger_engine::{DailyEligibility, LedgerEngine, LedgerError, LedgerResult};
pub use service::wardrobe_service::{
    GarmentSummary, WardrobeError, WardrobeResult, WardrobeService,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
