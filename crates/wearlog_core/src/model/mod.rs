//! Domain model for the garment wear/wash ledger.
//!
//! # Responsibility
//! - Define garments, ledger events and the state folded from them.
//! - Define the calendar-day window used to gate same-day writes.
//!
//! # Invariants
//! - Events are immutable once constructed; instants carry millisecond
//!   precision so stored and in-memory values compare equal.
//! - `DerivedState` is never persisted; it is recomputed from the log.

pub mod day;
pub mod event;
pub mod garment;
pub mod identity;
pub mod state;
