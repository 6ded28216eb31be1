//! Dispatch strategies over the provider chains.
//!
//! Two disciplines coexist by design: sequential fallback for scalar price
//! lookups (bounded outbound volume, priority order respected) and
//! race-to-first-success for bulk/time-series queries (minimal tail latency,
//! losers discarded).

pub(crate) mod movers;
pub(crate) mod price;
pub(crate) mod race;

pub use race::RacePolicy;
