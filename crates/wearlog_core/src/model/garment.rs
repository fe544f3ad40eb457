//! Garment registry record.
//!
//! # Responsibility
//! - Describe a tracked clothing item owned by exactly one user.
//! - Validate registry input before persistence.
//!
//! # Invariants
//! - `id` is stable and never reused for another garment.
//! - Garments are never mutated by the ledger; events reference them by id.
//! - `image_ref` is an opaque handle owned by the external content store.

use super::event::truncate_to_millis;
use super::identity::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a garment.
pub type GarmentId = Uuid;

/// A clothing item tracked by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Garment {
    pub id: GarmentId,
    pub owner_id: UserId,
    pub name: String,
    /// Opaque content-store handle (for example a download URL).
    pub image_ref: String,
    /// Free-form size label, e.g. `32/34`.
    pub size: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Registry input for a garment that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGarment {
    pub name: String,
    pub image_ref: String,
    pub size: Option<String>,
}

/// Validation failures for garment registry input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GarmentValidationError {
    BlankName,
    BlankImageRef,
    BlankSize,
}

impl Display for GarmentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "garment name must not be blank"),
            Self::BlankImageRef => write!(f, "garment image_ref must not be blank"),
            Self::BlankSize => write!(f, "garment size must be omitted or non-blank"),
        }
    }
}

impl Error for GarmentValidationError {}

impl Garment {
    /// Creates a garment with a generated id, trimming text fields.
    pub fn create(
        owner_id: UserId,
        input: NewGarment,
        created_at: DateTime<Utc>,
    ) -> Result<Self, GarmentValidationError> {
        let garment = Self {
            id: Uuid::new_v4(),
            owner_id,
            name: input.name.trim().to_string(),
            image_ref: input.image_ref.trim().to_string(),
            size: input.size.map(|size| size.trim().to_string()),
            created_at: truncate_to_millis(created_at),
        };
        garment.validate()?;
        Ok(garment)
    }

    /// Checks registry invariants; called on every write and read-back.
    pub fn validate(&self) -> Result<(), GarmentValidationError> {
        if self.name.trim().is_empty() {
            return Err(GarmentValidationError::BlankName);
        }
        if self.image_ref.trim().is_empty() {
            return Err(GarmentValidationError::BlankImageRef);
        }
        if matches!(self.size.as_deref(), Some(size) if size.trim().is_empty()) {
            return Err(GarmentValidationError::BlankSize);
        }
        Ok(())
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.owner_id == user_id
    }
}
