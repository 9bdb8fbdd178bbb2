//! Data-fetching and view-state reconciliation core for the insights
//! dashboard.
//!
//! Pages turn their parameters into request descriptors, the query cache
//! deduplicates and schedules gateway reads, and view controllers classify
//! the cached state into loading, error, empty or populated decisions.

pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
