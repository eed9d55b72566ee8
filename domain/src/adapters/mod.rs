//! Test-only adapters that live inside the domain crate for convenience.
//!
//! These are intended for unit testing and local demos. Durable ledgers live
//! in separate adapter crates.

pub mod memory_ledger;
