//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the event store contract the ledger engine depends on.
//! - Provide the garment registry used by wardrobe use-cases.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Adapters perform no business logic; same-day gating lives in services.
//! - Repository APIs return semantic errors (`NotFound`, `Unavailable`) in
//!   addition to raw DB errors.

pub mod event_store;
pub mod garment_repo;
pub mod memory_store;
mod schema;
