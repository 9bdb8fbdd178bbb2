//! Domain core of the dashboard.
//!
//! Purpose: turn page parameters into request descriptors, schedule and cache
//! gateway reads, and classify cached state into render decisions. Nothing in
//! here knows how the hosted API is reached.
//!
//! Public surface:
//! - `ports`: the `DataGateway` port and its error type.
//! - `request` / `query_key`: request descriptors and cache keys.
//! - `query_cache`: dedup, freshness, retries and retention per key.
//! - `views`: per-page queries, controllers and render decisions.
//! - `export`: Markdown rendering for drafts.

pub mod export;
pub mod ports;
pub mod query_cache;
pub mod query_key;
pub mod request;
pub mod rows;
pub mod views;
