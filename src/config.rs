//! Solver location and protocol constants.
//!
//! The adapter does not load configuration itself. It consults an injected
//! [`ConfigLookup`] on every request, so edits to the owning application's
//! settings take effect without rebuilding the fetcher.

use std::collections::{BTreeMap, HashMap};

/// Config key holding the solver host.
pub const PROXY_ADDRESS_KEY: &str = "flaresolverr_proxy_address";
/// Config key holding the solver port.
pub const PROXY_PORT_KEY: &str = "flaresolverr_proxy_port";

pub const DEFAULT_PROXY_ADDRESS: &str = "localhost";
pub const DEFAULT_PROXY_PORT: &str = "8191";

/// Hint passed to the solver; not a local timeout.
pub const MAX_TIMEOUT_MS: u64 = 60000;

/// Synthetic status used to carry solver failures to the caller.
pub const PROXY_FAILURE_STATUS: u16 = 428;

/// Key/default-value configuration capability.
pub trait ConfigLookup: Send + Sync {
    /// Returns the configured value for `key`, or `default` when unset.
    fn get_config(&self, key: &str, default: &str) -> String;
}

impl ConfigLookup for HashMap<String, String> {
    fn get_config(&self, key: &str, default: &str) -> String {
        self.get(key).cloned().unwrap_or_else(|| default.to_string())
    }
}

impl ConfigLookup for BTreeMap<String, String> {
    fn get_config(&self, key: &str, default: &str) -> String {
        self.get(key).cloned().unwrap_or_else(|| default.to_string())
    }
}

impl<F> ConfigLookup for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn get_config(&self, key: &str, default: &str) -> String {
        self(key).unwrap_or_else(|| default.to_string())
    }
}

/// Where the solver lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub address: String,
    pub port: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_PROXY_ADDRESS.to_string(),
            port: DEFAULT_PROXY_PORT.to_string(),
        }
    }
}

impl ProxyConfig {
    /// Resolve address and port through `lookup`, falling back to the defaults.
    pub fn from_lookup(lookup: &dyn ConfigLookup) -> Self {
        Self {
            address: lookup.get_config(PROXY_ADDRESS_KEY, DEFAULT_PROXY_ADDRESS),
            port: lookup.get_config(PROXY_PORT_KEY, DEFAULT_PROXY_PORT),
        }
    }

    /// Command endpoint, e.g. `http://localhost:8191/v1`.
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}/v1", self.address, self.port)
    }
}
