//! # flaresolverr-fetch
//!
//! A fetch adapter that sends every GET/POST through a
//! [FlareSolverr](https://github.com/FlareSolverr/FlareSolverr) instance instead
//! of hitting the target site directly.
//!
//! ## Features
//!
//! - **Protocol Translation**: Requests become `request.get` / `request.post`
//!   commands; base64 bodies come back as raw bytes, so images survive.
//! - **Cookie Round-Trip**: The shared jar is sent with each command, and the
//!   cookies the solver earns (e.g. `cf_clearance`) are stored back into it.
//! - **Single Error Path**: Every non-200 outcome is a
//!   [`FetchError::HttpStatus`]. Solver failures use status 428 so a real
//!   404/410 from the site still means "not found".
//! - **Async or Blocking**: [`FlareSolverrFetcher`] on Tokio, or
//!   [`BlockingFlareSolverrFetcher`] for synchronous callers.
//!
//! ## Quick Start
//!
//! ```ignore
//! use flaresolverr_fetch::{FlareSolverrFetcher, HttpFetcher, Params, ParamValue};
//! use std::collections::HashMap;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = HashMap::new();
//!     config.insert("flaresolverr_proxy_address".to_string(), "127.0.0.1".to_string());
//!
//!     let fetcher = FlareSolverrFetcher::new(HttpFetcher::new()?, config);
//!
//!     let page = fetcher.get("https://example.com/s/12345").await?;
//!     println!("{} bytes from {}", page.content.len(), page.redirect_url);
//!
//!     let login = Params::pairs([("user", ParamValue::from("me")), ("pass", "secret".into())]);
//!     fetcher.post("https://example.com/login", login).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! The solver location is looked up on every request through [`ConfigLookup`]:
//!
//! - `flaresolverr_proxy_address` (default `localhost`)
//! - `flaresolverr_proxy_port` (default `8191`)

pub mod blocking;
pub mod config;
pub mod cookies;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod params;
pub mod proxy;

// Re-exports for convenience
pub use blocking::BlockingFlareSolverrFetcher;
pub use config::{ConfigLookup, ProxyConfig};
pub use cookies::{Cookie, CookieJar, CookieJarHandle, MemoryCookieJar};
pub use error::{FetchError, Result};
pub use fetcher::{BaseFetcher, HttpFetcher, HttpFetcherBuilder};
pub use models::{FetcherResponse, Method};
pub use params::{encode_params, ParamKey, ParamValue, Params, PostData};
pub use proxy::FlareSolverrFetcher;
