//! Dashboard configuration loaded via OrthoConfig.
//!
//! Every value can be supplied through `DASHBOARD_*` environment variables.
//! Missing credentials are not an error: the dashboard falls back to demo
//! data instead.

use std::fmt;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::domain::query_cache::FetchOptions;

/// Template value shipped in example environment files for the endpoint.
pub const PLACEHOLDER_URL: &str = "your_supabase_url_here";
/// Template value shipped in example environment files for the key.
pub const PLACEHOLDER_ANON_KEY: &str = "your_supabase_anon_key_here";

/// Configuration values controlling the gateway and cache policy.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "DASHBOARD")]
pub struct DashboardSettings {
    /// Base URL of the hosted data API.
    pub supabase_url: Option<String>,
    /// Anonymous API key sent with every request.
    pub supabase_anon_key: Option<String>,
    /// Milliseconds a settled value counts as fresh.
    #[ortho_config(default = 60_000)]
    pub stale_time_ms: u64,
    /// Automatic retries after a retryable failure.
    #[ortho_config(default = 2)]
    pub retry_count: u32,
    /// Refetch stale entries when the application regains focus.
    #[ortho_config(default = false)]
    pub refetch_on_focus_regain: bool,
    /// Milliseconds an unsubscribed entry is kept for reuse.
    #[ortho_config(default = 300_000)]
    pub retention_ms: u64,
    /// Milliseconds before a gateway request times out.
    #[ortho_config(default = 10_000)]
    pub request_timeout_ms: u64,
}

/// Which gateway adapter to construct at startup.
#[derive(Clone, PartialEq, Eq)]
pub enum GatewayMode {
    /// Query the hosted API.
    Live {
        /// Base URL of the REST API.
        endpoint: Url,
        /// Anonymous key sent with every request.
        api_key: String,
    },
    /// Serve canned rows.
    Demo,
}

impl fmt::Debug for GatewayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live { endpoint, .. } => f
                .debug_struct("Live")
                .field("endpoint", &endpoint.as_str())
                .field("api_key", &"<redacted>")
                .finish(),
            Self::Demo => f.write_str("Demo"),
        }
    }
}

/// Errors raised while interpreting loaded settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// The configured endpoint is not a usable HTTP(S) URL.
    #[error("invalid DASHBOARD_SUPABASE_URL `{value}`: {reason}")]
    InvalidEndpoint {
        /// Configured text.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl DashboardSettings {
    /// Cache policy shared by every page.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            stale_time: Duration::from_millis(self.stale_time_ms),
            retry_count: self.retry_count,
            refetch_on_focus_regain: self.refetch_on_focus_regain,
            ..FetchOptions::default()
        }
    }

    /// How long unsubscribed cache entries are kept.
    pub const fn retention(&self) -> Duration {
        Duration::from_millis(self.retention_ms)
    }

    /// Timeout applied to each gateway request.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Select the gateway adapter.
    ///
    /// Live mode requires both credentials to be present and to differ from
    /// the template placeholders; anything else selects demo mode.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidEndpoint`] when credentials are
    /// present but the endpoint is not an absolute HTTP(S) URL.
    pub fn gateway_mode(&self) -> Result<GatewayMode, SettingsError> {
        let (Some(raw_url), Some(api_key)) = (
            configured(self.supabase_url.as_deref(), PLACEHOLDER_URL),
            configured(self.supabase_anon_key.as_deref(), PLACEHOLDER_ANON_KEY),
        ) else {
            return Ok(GatewayMode::Demo);
        };
        let endpoint = Url::parse(raw_url).map_err(|error| SettingsError::InvalidEndpoint {
            value: raw_url.to_owned(),
            reason: error.to_string(),
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") || endpoint.cannot_be_a_base() {
            return Err(SettingsError::InvalidEndpoint {
                value: raw_url.to_owned(),
                reason: "expected an http or https URL".to_owned(),
            });
        }
        Ok(GatewayMode::Live {
            endpoint,
            api_key: api_key.to_owned(),
        })
    }
}

fn configured<'a>(value: Option<&'a str>, placeholder: &str) -> Option<&'a str> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty() && *value != placeholder)
}
