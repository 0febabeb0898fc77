//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::warn;

use billbook_invoicing::GstRate;

use crate::saga::DEFAULT_STALE_AFTER;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Postgres instead of the in-memory store.
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    pub default_gst_rate: GstRate,
    /// In-progress sagas older than this are handed to repair.
    pub saga_stale_after: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            use_persistent_stores: false,
            database_url: None,
            default_gst_rate: GstRate::default(),
            saga_stale_after: DEFAULT_STALE_AFTER,
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, "unparseable setting; using default");
                default
            }
        },
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys take defaults; unparseable
    /// values take defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let bind_addr = parsed(&lookup, "BILLBOOK_BIND_ADDR", defaults.bind_addr);
        let use_persistent_stores = parsed(&lookup, "USE_PERSISTENT_STORES", false);
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let percent = parsed(&lookup, "BILLBOOK_DEFAULT_GST_RATE", defaults.default_gst_rate.value());
        let default_gst_rate = if percent < Decimal::ZERO {
            warn!(%percent, "negative default GST rate; using {}", defaults.default_gst_rate.value());
            defaults.default_gst_rate
        } else {
            GstRate::percent(percent)
        };

        let stale_secs = parsed(&lookup, "BILLBOOK_SAGA_STALE_SECS", defaults.saga_stale_after.as_secs());
        let saga_stale_after = Duration::from_secs(stale_secs);

        if use_persistent_stores && database_url.is_none() {
            warn!("USE_PERSISTENT_STORES=true but DATABASE_URL is not set");
        }

        Self {
            bind_addr,
            use_persistent_stores,
            database_url,
            default_gst_rate,
            saga_stale_after,
        }
    }
}
