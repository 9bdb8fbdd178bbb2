//! PostgREST outbound adapter.
//!
//! This module provides a thin HTTP implementation of the `DataGateway` port
//! for Supabase-style endpoints.

mod http_gateway;
mod query;

pub use http_gateway::PostgrestGateway;
