//! Flutter-facing bindings for WearLog core.

pub mod api;
