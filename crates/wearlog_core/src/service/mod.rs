//! Core use-case services.
//!
//! # Responsibility
//! - `ledger_engine`: derive wear/wash state and gate same-day writes.
//! - `wardrobe_service`: owner-scoped garment use-cases on top of the ledger.
//! - Keep UI/FFI/CLI layers decoupled from storage details.

pub mod ledger_engine;
pub mod wardrobe_service;
