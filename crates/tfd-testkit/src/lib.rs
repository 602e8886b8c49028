//! Test harness for the filing pipeline.
//!
//! Everything here is test support: an in-memory store honoring the same
//! contracts as `tfd-db`, canned transactions and submission payloads, a
//! settable clock, and a desk orchestrator wiring the real engine crates
//! end to end. The scenario tests under tests/ cover cross-crate
//! invariants; unit tests stay next to the engines they cover.
//!
//! Nothing in this crate may be depended on by a production build.

pub mod fixtures;
pub mod orchestrator;
pub mod store;

pub use fixtures::TestClock;
pub use orchestrator::{FileOutcome, Orchestrator};
pub use store::InMemoryStore;
