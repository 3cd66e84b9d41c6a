//! Cookie jar shared between the wrapped fetcher and the solver adapter.
//!
//! The jar is an explicit capability: the fetcher that owns it hands out a
//! [`CookieJarHandle`], and the adapter reads it to seed each solver command and
//! writes the cookies the solver returns (clearance tokens and the like) back
//! into it so later requests reuse them.
//!
//! # Concurrency model
//! - [`CookieJarHandle`] is `Arc<RwLock<dyn CookieJar + Send + Sync>>`.
//! - Serialization takes a read lock; absorbing a solver response takes a single
//!   write lock for all of its cookies.
//! - [`MemoryCookieJar`] itself is not internally synchronized.

use crate::error::{FetchError, Result};
use crate::models::SolverCookie;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

/// Reference-counted, read/write-locked pointer to a type-erased [`CookieJar`].
pub type CookieJarHandle = Arc<RwLock<dyn CookieJar + Send + Sync>>;

/// A single cookie with the attributes a classic client-side jar tracks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cookie {
    pub version: u32,
    pub name: String,
    pub value: String,
    pub port: Option<String>,
    pub port_specified: bool,
    pub domain: String,
    pub domain_specified: bool,
    pub domain_initial_dot: bool,
    pub path: String,
    pub path_specified: bool,
    pub secure: bool,
    /// Seconds since the epoch, fractional as the solver reports them;
    /// `None` for session cookies.
    pub expires: Option<f64>,
    /// Drop at the end of the session.
    pub discard: bool,
    pub comment: Option<String>,
    pub comment_url: Option<String>,
    pub rest: HashMap<String, String>,
}

impl Cookie {
    /// Session cookie with explicit domain and path.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        let domain = domain.into();
        let path = path.into();
        Self {
            name: name.into(),
            value: value.into(),
            domain_specified: true,
            domain_initial_dot: domain.starts_with('.'),
            path_specified: !path.is_empty(),
            domain,
            path,
            ..Default::default()
        }
    }

    /// Set an absolute expiry.
    pub fn with_expires(mut self, expires: f64) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Whether the cookie's expiry is at or before `now` (seconds since the epoch).
    pub fn is_expired(&self, now: f64) -> bool {
        matches!(self.expires, Some(e) if e > 0.0 && e <= now)
    }
}

/// Storage for cookies that the adapter can enumerate and update.
pub trait CookieJar: Send + Sync {
    /// Snapshot of every cookie in the jar.
    fn cookies(&self) -> Vec<Cookie>;

    /// Insert `cookie`, replacing any cookie with the same domain, path and name.
    fn set_cookie(&mut self, cookie: Cookie);

    /// Removes all cookies from the jar.
    fn clear(&mut self);

    /// Number of cookies held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory cookie jar keyed by (domain, path, name).
///
/// Lookup precedence by path/domain specificity is left to whoever sends the
/// cookies; the solver receives all of them.
#[derive(Debug, Default, Clone)]
pub struct MemoryCookieJar {
    entries: BTreeMap<(String, String, String), Cookie>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a fresh jar in a shareable handle.
    pub fn handle() -> CookieJarHandle {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Look up a cookie by its identity.
    pub fn get(&self, domain: &str, path: &str, name: &str) -> Option<&Cookie> {
        self.entries
            .get(&(domain.to_string(), path.to_string(), name.to_string()))
    }

    /// Drop cookies marked for discard at session end.
    pub fn clear_session_cookies(&mut self) {
        self.entries
            .retain(|_, c| !c.discard && c.expires.is_some());
    }

    /// Drop cookies whose expiry has passed.
    pub fn clear_expired_cookies(&mut self) {
        let now = chrono::Utc::now().timestamp() as f64;
        let before = self.entries.len();
        self.entries.retain(|_, c| !c.is_expired(now));
        tracing::debug!("Cleared {} expired cookies", before - self.entries.len());
    }
}

impl CookieJar for MemoryCookieJar {
    fn cookies(&self) -> Vec<Cookie> {
        self.entries.values().cloned().collect()
    }

    fn set_cookie(&mut self, cookie: Cookie) {
        let key = (
            cookie.domain.clone(),
            cookie.path.clone(),
            cookie.name.clone(),
        );
        self.entries.insert(key, cookie);
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Serialize the jar into the records the solver expects.
///
/// `expires` is only sent when the cookie has a non-zero expiry.
pub fn cookiejar_to_jsonable(jar: &dyn CookieJar) -> Vec<SolverCookie> {
    jar.cookies()
        .into_iter()
        .map(|c| SolverCookie {
            name: c.name,
            value: c.value,
            domain: c.domain,
            path: Some(c.path),
            expires: c.expires.filter(|&e| e != 0.0),
            secure: None,
        })
        .collect()
}

/// Turn solver cookie records into jar cookies.
pub fn cookiejson_to_jarable(records: &[SolverCookie]) -> Vec<Cookie> {
    records
        .iter()
        .map(|c| {
            let path = c.path.clone().unwrap_or_default();
            Cookie {
                version: 0,
                name: c.name.clone(),
                value: c.value.clone(),
                port: None,
                port_specified: false,
                domain: c.domain.clone(),
                domain_specified: true,
                domain_initial_dot: c.domain.starts_with('.'),
                path_specified: !path.is_empty(),
                path,
                secure: c.secure.unwrap_or(false),
                expires: c.expires,
                discard: c.expires == Some(-1.0),
                comment: None,
                comment_url: None,
                rest: HashMap::new(),
            }
        })
        .collect()
}

/// Serialize the jar behind `handle` under a read lock.
pub(crate) fn snapshot(handle: &CookieJarHandle) -> Result<Vec<SolverCookie>> {
    let guard = handle
        .read()
        .map_err(|e| FetchError::CookieJar(e.to_string()))?;
    Ok(cookiejar_to_jsonable(&*guard))
}

/// Store solver cookies into the jar behind `handle` under one write lock.
pub(crate) fn absorb(handle: &CookieJarHandle, records: &[SolverCookie]) -> Result<usize> {
    let cookies = cookiejson_to_jarable(records);
    let count = cookies.len();
    let mut guard = handle
        .write()
        .map_err(|e| FetchError::CookieJar(e.to_string()))?;
    for cookie in cookies {
        guard.set_cookie(cookie);
    }
    Ok(count)
}
