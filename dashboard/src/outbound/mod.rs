//! Outbound adapters implementing the `DataGateway` port.
//!
//! - **postgrest**: reqwest client for the hosted PostgREST / Supabase API
//! - **demo**: canned rows used when no live endpoint is configured
//!
//! Adapters are thin translators between request descriptors and the wire.
//! They contain no caching or view logic.

use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;
use tracing::{info, warn};

use crate::config::GatewayMode;
use crate::domain::ports::DataGateway;

pub mod demo;
pub mod postgrest;

pub use demo::DemoDataGateway;
pub use postgrest::PostgrestGateway;

/// Construct the gateway selected by `mode`. Called once at startup.
///
/// # Errors
///
/// Returns an error when the live HTTP client cannot be constructed.
pub fn connect_gateway(
    mode: GatewayMode,
    timeout: Duration,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn DataGateway>, reqwest::Error> {
    match mode {
        GatewayMode::Live { endpoint, api_key } => {
            info!(endpoint = %endpoint, ?timeout, "using live data gateway");
            Ok(Arc::new(PostgrestGateway::new(endpoint, api_key, timeout)?))
        }
        GatewayMode::Demo => {
            warn!(
                "missing or placeholder DASHBOARD_SUPABASE_URL / DASHBOARD_SUPABASE_ANON_KEY; \
                 serving demo data"
            );
            Ok(Arc::new(DemoDataGateway::new(clock)))
        }
    }
}
