//! Wardrobe use-case service.
//!
//! # Responsibility
//! - Register garments for an authenticated owner.
//! - List an owner's garments with their derived state and today's
//!   wear/wash eligibility.
//! - Route wear/wash logging through the ledger engine.
//!
//! # Invariants
//! - Anonymous callers are rejected before any storage access.
//! - Garments owned by someone else are reported as not found.

use crate::model::event::EventKind;
use crate::model::garment::{Garment, GarmentId, GarmentValidationError, NewGarment};
use crate::model::identity::{Identity, UserId};
use crate::model::state::DerivedState;
use crate::repo::event_store::EventStore;
use crate::repo::garment_repo::{GarmentRepository, RepoError};
use crate::service::ledger_engine::{DailyEligibility, LedgerEngine, LedgerError};
use chrono::{DateTime, NaiveDate, Utc};
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type WardrobeResult<T> = Result<T, WardrobeError>;

/// Wardrobe use-case failure.
#[derive(Debug)]
pub enum WardrobeError {
    /// No identity was supplied by the principal provider.
    Unauthenticated,
    /// Garment does not exist or is not owned by the caller.
    GarmentNotFound(GarmentId),
    Validation(GarmentValidationError),
    /// Same-day duplicate; present as a user-facing rejection.
    RejectedDuplicate { kind: EventKind, date: NaiveDate },
    Registry(RepoError),
    Ledger(LedgerError),
}

impl WardrobeError {
    /// Stable machine-readable code for UI layers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::GarmentNotFound(_) => "not_found",
            Self::Validation(_) => "invalid_input",
            Self::RejectedDuplicate { .. } => "duplicate_today",
            Self::Registry(RepoError::Unavailable(_))
            | Self::Ledger(LedgerError::StoreUnavailable(_)) => "store_unavailable",
            Self::Registry(_) | Self::Ledger(_) => "internal",
        }
    }
}

impl Display for WardrobeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "sign in required"),
            Self::GarmentNotFound(id) => write!(f, "garment not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::RejectedDuplicate { kind, date } => {
                write!(f, "you can only log one {kind} per day ({date})")
            }
            Self::Registry(err) => write!(f, "{err}"),
            Self::Ledger(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WardrobeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Registry(err) => Some(err),
            Self::Ledger(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GarmentValidationError> for WardrobeError {
    fn from(value: GarmentValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for WardrobeError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Registry(other),
        }
    }
}

impl From<LedgerError> for WardrobeError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::NotFound(id) => Self::GarmentNotFound(id),
            LedgerError::RejectedDuplicate { kind, date } => Self::RejectedDuplicate { kind, date },
            other => Self::Ledger(other),
        }
    }
}

/// One garment together with its ledger view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GarmentSummary {
    pub garment: Garment,
    pub state: DerivedState,
    pub today: DailyEligibility,
}

/// Owner-scoped facade over the garment registry and the ledger engine.
pub struct WardrobeService<R: GarmentRepository, S: EventStore> {
    garments: R,
    ledger: LedgerEngine<S>,
}

impl<R: GarmentRepository, S: EventStore> WardrobeService<R, S> {
    pub fn new(garments: R, ledger: LedgerEngine<S>) -> Self {
        Self { garments, ledger }
    }

    pub fn ledger(&self) -> &LedgerEngine<S> {
        &self.ledger
    }

    /// Registers a new garment for the calling owner.
    pub fn add_garment(
        &self,
        identity: &Identity,
        input: NewGarment,
        now: DateTime<Utc>,
    ) -> WardrobeResult<Garment> {
        let owner_id = require_user(identity)?;
        let garment = Garment::create(owner_id.clone(), input, now)?;
        self.garments.create_garment(&garment)?;
        info!(
            "event=garment_create module=wardrobe status=ok garment_id={}",
            garment.id
        );
        Ok(garment)
    }

    /// Lists the caller's garments in creation order with their state and
    /// eligibility for the calendar day containing `as_of`.
    pub fn list_wardrobe(
        &self,
        identity: &Identity,
        as_of: DateTime<Utc>,
    ) -> WardrobeResult<Vec<GarmentSummary>> {
        let owner_id = require_user(identity)?;
        self.garments
            .list_garments_for_owner(owner_id)?
            .into_iter()
            .map(|garment| self.summarize(garment, as_of))
            .collect()
    }

    /// Returns one owned garment with its state and eligibility.
    pub fn garment_status(
        &self,
        identity: &Identity,
        garment_id: GarmentId,
        as_of: DateTime<Utc>,
    ) -> WardrobeResult<GarmentSummary> {
        let garment = self.owned_garment(identity, garment_id)?;
        self.summarize(garment, as_of)
    }

    pub fn log_wear(
        &self,
        identity: &Identity,
        garment_id: GarmentId,
        as_of: DateTime<Utc>,
    ) -> WardrobeResult<DerivedState> {
        self.log_event(identity, garment_id, EventKind::Wear, as_of)
    }

    pub fn log_wash(
        &self,
        identity: &Identity,
        garment_id: GarmentId,
        as_of: DateTime<Utc>,
    ) -> WardrobeResult<DerivedState> {
        self.log_event(identity, garment_id, EventKind::Wash, as_of)
    }

    /// Records one event on an owned garment.
    pub fn log_event(
        &self,
        identity: &Identity,
        garment_id: GarmentId,
        kind: EventKind,
        as_of: DateTime<Utc>,
    ) -> WardrobeResult<DerivedState> {
        let garment = self.owned_garment(identity, garment_id)?;
        Ok(self.ledger.record(garment.id, kind, as_of)?)
    }

    fn owned_garment(&self, identity: &Identity, garment_id: GarmentId) -> WardrobeResult<Garment> {
        let owner_id = require_user(identity)?;
        match self.garments.get_garment(garment_id)? {
            Some(garment) if garment.is_owned_by(owner_id) => Ok(garment),
            _ => Err(WardrobeError::GarmentNotFound(garment_id)),
        }
    }

    fn summarize(&self, garment: Garment, as_of: DateTime<Utc>) -> WardrobeResult<GarmentSummary> {
        let state = self.ledger.derive(garment.id)?;
        let today = self.ledger.daily_eligibility(garment.id, as_of)?;
        Ok(GarmentSummary {
            garment,
            state,
            today,
        })
    }
}

fn require_user(identity: &Identity) -> WardrobeResult<&UserId> {
    identity.user_id().ok_or(WardrobeError::Unauthenticated)
}
