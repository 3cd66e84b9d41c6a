//! Synchronous facade over [`FlareSolverrFetcher`].
//!
//! Owns a current-thread tokio runtime and drives one request to completion per
//! call, for callers that are not async themselves. Must not be used from
//! inside another tokio runtime.

use crate::config::ConfigLookup;
use crate::cookies::CookieJarHandle;
use crate::error::{FetchError, Result};
use crate::fetcher::{BaseFetcher, HttpFetcher};
use crate::models::FetcherResponse;
use crate::params::Params;
use crate::proxy::FlareSolverrFetcher;
use std::collections::HashMap;
use tokio::runtime::Runtime;

/// Blocking FlareSolverr fetcher.
pub struct BlockingFlareSolverrFetcher<F = HttpFetcher> {
    inner: FlareSolverrFetcher<F>,
    runtime: Runtime,
}

impl BlockingFlareSolverrFetcher<HttpFetcher> {
    /// Fetcher over a default [`HttpFetcher`].
    ///
    /// The client is built inside the runtime so its connector can register
    /// with the reactor.
    pub fn with_config(config: impl ConfigLookup + 'static) -> Result<Self> {
        let runtime = new_runtime()?;
        let base = runtime.block_on(async { HttpFetcher::new() })?;
        Ok(Self {
            inner: FlareSolverrFetcher::new(base, config),
            runtime,
        })
    }
}

impl<F: BaseFetcher> BlockingFlareSolverrFetcher<F> {
    pub fn new(base: F, config: impl ConfigLookup + 'static) -> Result<Self> {
        Ok(Self {
            inner: FlareSolverrFetcher::new(base, config),
            runtime: new_runtime()?,
        })
    }

    /// See [`FlareSolverrFetcher::request`].
    pub fn request(
        &self,
        method: &str,
        url: &str,
        headers: Option<&HashMap<String, String>>,
        params: Params,
    ) -> Result<FetcherResponse> {
        self.runtime
            .block_on(self.inner.request(method, url, headers, params))
    }

    pub fn get(&self, url: &str) -> Result<FetcherResponse> {
        self.runtime.block_on(self.inner.get(url))
    }

    pub fn post(&self, url: &str, params: Params) -> Result<FetcherResponse> {
        self.runtime.block_on(self.inner.post(url, params))
    }

    pub fn cookie_jar(&self) -> CookieJarHandle {
        self.inner.cookie_jar()
    }

    /// The async fetcher being driven.
    pub fn inner(&self) -> &FlareSolverrFetcher<F> {
        &self.inner
    }
}

fn new_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| FetchError::Runtime(format!("Failed to create runtime: {}", e)))
}
