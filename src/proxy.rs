//! Fetcher that replays every request through a FlareSolverr instance.

use crate::config::{ConfigLookup, ProxyConfig, MAX_TIMEOUT_MS, PROXY_FAILURE_STATUS};
use crate::cookies::{absorb, snapshot, CookieJarHandle};
use crate::error::{FetchError, Result};
use crate::fetcher::BaseFetcher;
use crate::models::{FetcherResponse, Method, SolverCommand, SolverReply};
use crate::params::{encode_params, Params};
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use std::collections::HashMap;
use std::sync::Arc;

const JSON_HEADERS: [(&str, &str); 1] = [("Content-Type", "application/json")];

/// Translates GET/POST requests into solver commands.
///
/// Each call is one stateless `request.*` command; no solver-side session is
/// created or destroyed.
///
/// # Example
/// ```ignore
/// use flaresolverr_fetch::{FlareSolverrFetcher, HttpFetcher};
/// use std::collections::HashMap;
///
/// let config: HashMap<String, String> = HashMap::new();
/// let fetcher = FlareSolverrFetcher::new(HttpFetcher::new()?, config);
/// let page = fetcher.get("https://example.com/story/1").await?;
/// println!("{}", page.text());
/// ```
pub struct FlareSolverrFetcher<F> {
    base: F,
    config: Arc<dyn ConfigLookup>,
}

impl<F: BaseFetcher> FlareSolverrFetcher<F> {
    pub fn new(base: F, config: impl ConfigLookup + 'static) -> Self {
        tracing::debug!("using FlareSolverrFetcher");
        Self {
            base,
            config: Arc::new(config),
        }
    }

    /// Fetcher sharing an existing config lookup.
    pub fn with_shared_config(base: F, config: Arc<dyn ConfigLookup>) -> Self {
        Self { base, config }
    }

    /// Cookie jar of the wrapped fetcher.
    pub fn cookie_jar(&self) -> CookieJarHandle {
        self.base.cookie_jar()
    }

    /// The wrapped fetcher.
    pub fn base(&self) -> &F {
        &self.base
    }

    /// Solver location as currently configured.
    pub fn proxy_config(&self) -> ProxyConfig {
        ProxyConfig::from_lookup(self.config.as_ref())
    }

    pub async fn get(&self, url: &str) -> Result<FetcherResponse> {
        self.request("GET", url, None, Params::None).await
    }

    pub async fn post(&self, url: &str, params: Params) -> Result<FetcherResponse> {
        self.request("POST", url, None, params).await
    }

    /// Fetch `url` through the solver.
    ///
    /// Fails with [`FetchError::UnsupportedMethod`] for anything but `GET` or
    /// `POST`, and with [`FetchError::Encoding`] for unencodable parameters, in
    /// both cases before contacting the solver. Any non-200 outcome becomes
    /// [`FetchError::HttpStatus`]; solver-side failures use status 428.
    pub async fn request(
        &self,
        method: &str,
        url: &str,
        headers: Option<&HashMap<String, String>>,
        params: Params,
    ) -> Result<FetcherResponse> {
        let method: Method = method.parse()?;
        tracing::debug!("FlareSolverrFetcher: REQ {} {}", method, url);

        if headers.is_some_and(|h| !h.is_empty()) {
            tracing::debug!("Request headers are not forwarded through the solver");
        }

        let command = SolverCommand {
            cmd: method.command(),
            url: url.to_string(),
            max_timeout: MAX_TIMEOUT_MS,
            download: true,
            cookies: snapshot(&self.base.cookie_jar())?,
            post_data: encode_params(params)?.into_command_field()?,
        };
        let body = serde_json::to_value(&command)?;

        let endpoint = self.proxy_config().endpoint();
        let reply = self.base.post_json(&endpoint, &JSON_HEADERS, &body).await?;

        let (status_code, data, final_url) = match SolverReply::from_value(&reply)? {
            SolverReply::Solved { status, solution } => {
                tracing::debug!("response code:{}", status);
                tracing::debug!("{}", pretty(&reply));

                let data = B64.decode(solution.response.as_deref().unwrap_or_default())?;
                let final_url = solution.url.unwrap_or_else(|| url.to_string());
                let absorbed = absorb(&self.base.cookie_jar(), &solution.cookies)?;
                tracing::debug!("Stored {} cookies from solver", absorbed);
                (status, data, final_url)
            }
            SolverReply::Failed { message } => {
                tracing::debug!("flaresolverr error resp:");
                tracing::debug!("{}", pretty(&reply));
                // 404/410 mean "does not exist" upstream; 428 keeps solver
                // failures distinguishable while still surfacing the message.
                (PROXY_FAILURE_STATUS, message.into_bytes(), url.to_string())
            }
        };

        if status_code != 200 {
            tracing::warn!("FlareSolverr fetch of {} failed with {}", final_url, status_code);
            return Err(FetchError::HttpStatus {
                url: final_url,
                status: status_code,
                body: data,
            });
        }

        Ok(FetcherResponse::new(data, final_url, false))
    }
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PROXY_ADDRESS_KEY, PROXY_PORT_KEY};
    use crate::cookies::{Cookie, MemoryCookieJar};
    use crate::params::ParamValue;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Fetcher that records commands and replays a canned reply.
    struct ScriptedFetcher {
        reply: Value,
        calls: Mutex<Vec<(String, Value)>>,
        jar: CookieJarHandle,
    }

    impl ScriptedFetcher {
        fn new(reply: Value) -> Self {
            Self {
                reply,
                calls: Mutex::new(Vec::new()),
                jar: MemoryCookieJar::handle(),
            }
        }

        fn calls(&self) -> Vec<(String, Value)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl BaseFetcher for ScriptedFetcher {
        async fn post_json(&self, url: &str, headers: &[(&str, &str)], body: &Value) -> Result<Value> {
            assert_eq!(headers, &[("Content-Type", "application/json")]);
            self.calls.lock().unwrap().push((url.to_string(), body.clone()));
            Ok(self.reply.clone())
        }

        fn cookie_jar(&self) -> CookieJarHandle {
            self.jar.clone()
        }
    }

    fn fetcher(reply: Value) -> FlareSolverrFetcher<ScriptedFetcher> {
        FlareSolverrFetcher::new(ScriptedFetcher::new(reply), HashMap::<String, String>::new())
    }

    fn success(status: u16, body_b64: &str) -> Value {
        json!({
            "status": "ok",
            "message": "Challenge not detected!",
            "solution": {
                "status": status,
                "response": body_b64,
                "url": "https://example.com/final",
                "cookies": [{
                    "name": "cf_clearance",
                    "value": "tok",
                    "domain": ".example.com",
                    "path": "/",
                    "expires": 1767225600.25,
                    "secure": true,
                    "httpOnly": true,
                    "sameSite": "None"
                }]
            }
        })
    }

    #[tokio::test]
    async fn test_unsupported_method_makes_no_call() {
        let f = fetcher(success(200, ""));
        for method in ["PUT", "DELETE", "PATCH", "get"] {
            let err = f
                .request(method, "https://example.com", None, Params::None)
                .await
                .unwrap_err();
            assert!(matches!(err, FetchError::UnsupportedMethod(_)));
        }
        assert!(f.base().calls().is_empty());
    }

    #[tokio::test]
    async fn test_encoding_error_makes_no_call() {
        let f = fetcher(success(200, ""));
        let err = Params::from_json(json!(42)).unwrap_err();
        assert!(matches!(err, FetchError::Encoding(_)));
        // pair-shaped input that fails deep inside is still caught before sending
        let bad = Params::from_json(json!([["a", "1"], "b"]));
        assert!(bad.is_err());
        assert!(f.base().calls().is_empty());
    }

    #[tokio::test]
    async fn test_success_decodes_body_and_stores_cookies() {
        let f = fetcher(success(200, "aGVsbG8="));
        let response = f.get("https://example.com/start").await.unwrap();

        assert_eq!(response.content, b"hello");
        assert_eq!(response.text(), "hello");
        assert_eq!(response.redirect_url, "https://example.com/final");
        assert!(!response.from_cache);

        let jar = f.cookie_jar();
        let cookies = jar.read().unwrap().cookies();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "cf_clearance");
        assert_eq!(cookies[0].value, "tok");
        assert_eq!(cookies[0].expires, Some(1767225600.25));
        assert!(cookies[0].domain_initial_dot);
        assert!(cookies[0].secure);
    }

    #[tokio::test]
    async fn test_command_body() {
        let f = fetcher(success(200, ""));
        f.cookie_jar()
            .write()
            .unwrap()
            .set_cookie(Cookie::new("sid", "abc", "example.com", "/"));

        let params = Params::pairs([("a", ParamValue::from("1")), ("b", vec!["2", "3"].into())]);
        f.post("https://example.com/login", params).await.unwrap();

        let calls = f.base().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "http://localhost:8191/v1");
        assert_eq!(
            calls[0].1,
            json!({
                "cmd": "request.post",
                "url": "https://example.com/login",
                "maxTimeout": 60000,
                "download": true,
                "cookies": [{"name": "sid", "value": "abc", "domain": "example.com", "path": "/"}],
                "postData": "a=1&b=2&b=3"
            })
        );
    }

    #[tokio::test]
    async fn test_cookies_reused_on_next_call() {
        let f = fetcher(success(200, ""));
        f.get("https://example.com/a").await.unwrap();
        f.get("https://example.com/b").await.unwrap();

        let calls = f.base().calls();
        assert_eq!(calls[0].1["cookies"], json!([]));
        assert_eq!(
            calls[1].1["cookies"],
            json!([{
                "name": "cf_clearance",
                "value": "tok",
                "domain": ".example.com",
                "path": "/",
                "expires": 1767225600.25
            }])
        );
    }

    #[tokio::test]
    async fn test_configured_endpoint() {
        let mut config = HashMap::new();
        config.insert(PROXY_ADDRESS_KEY.to_string(), "10.0.0.5".to_string());
        config.insert(PROXY_PORT_KEY.to_string(), "9191".to_string());
        let f = FlareSolverrFetcher::new(ScriptedFetcher::new(success(200, "")), config);

        f.get("https://example.com").await.unwrap();
        assert_eq!(f.base().calls()[0].0, "http://10.0.0.5:9191/v1");
    }

    #[tokio::test]
    async fn test_solver_failure_maps_to_428() {
        let f = fetcher(json!({"status": "error", "message": "blocked"}));
        let err = f.get("https://example.com/x").await.unwrap_err();

        match err {
            FetchError::HttpStatus { url, status, body } => {
                assert_eq!(url, "https://example.com/x");
                assert_eq!(status, 428);
                assert_eq!(body, b"blocked");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ok_without_solution_status_is_failure() {
        let f = fetcher(json!({
            "status": "ok",
            "message": "odd reply",
            "solution": {"status": null, "url": "https://example.com"}
        }));
        let err = f.get("https://example.com").await.unwrap_err();
        assert!(err.is_proxy_failure());
        assert_eq!(err.body(), Some(&b"odd reply"[..]));
        assert!(f.cookie_jar().read().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_failure_replies_map_to_428() {
        let replies = [
            json!({"status": 500, "message": "blocked"}),
            json!({"status": "error", "message": "blocked", "solution": {"status": "n/a"}}),
            json!({"status": "ok", "message": "blocked", "solution": {"status": 200.5}}),
        ];
        for reply in replies {
            let f = fetcher(reply.clone());
            let err = f.get("https://example.com").await.unwrap_err();
            assert_eq!(err.status(), Some(428), "reply: {}", reply);
            assert_eq!(err.body(), Some(&b"blocked"[..]), "reply: {}", reply);
        }
    }

    #[tokio::test]
    async fn test_null_cookie_list_on_success() {
        let f = fetcher(json!({
            "status": "ok",
            "solution": {"status": 200, "response": "aGVsbG8=", "url": "https://example.com/", "cookies": null}
        }));
        let response = f.get("https://example.com").await.unwrap();
        assert_eq!(response.content, b"hello");
        assert!(f.cookie_jar().read().unwrap().is_empty());
    }

    struct BrokenReader;

    impl std::io::Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "upload source closed"))
        }
    }

    #[tokio::test]
    async fn test_stream_read_failure_makes_no_call() {
        let f = fetcher(success(200, ""));
        let err = f
            .post("https://example.com/upload", Params::Stream(Box::new(BrokenReader)))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Io(ref e) if e.kind() == std::io::ErrorKind::BrokenPipe));
        assert!(f.base().calls().is_empty());
    }

    #[tokio::test]
    async fn test_poisoned_jar_makes_no_call() {
        let f = fetcher(success(200, ""));
        let jar = f.cookie_jar();
        let _ = std::thread::spawn(move || {
            let _guard = jar.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        let err = f.get("https://example.com").await.unwrap_err();
        assert!(matches!(err, FetchError::CookieJar(_)));
        assert!(f.base().calls().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_404_not_remapped() {
        // "Not Found" in base64
        let f = fetcher(success(404, "Tm90IEZvdW5k"));
        let err = f.get("https://example.com/missing").await.unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());
        assert_eq!(err.body(), Some(&b"Not Found"[..]));
        match err {
            FetchError::HttpStatus { url, .. } => assert_eq!(url, "https://example.com/final"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_base64() {
        let f = fetcher(success(200, "not base64!"));
        let err = f.get("https://example.com").await.unwrap_err();
        assert!(matches!(err, FetchError::Base64(_)));
    }

    #[test]
    fn test_blocking_poll_with_tokio_test() {
        let f = fetcher(success(200, "aGVsbG8="));
        let response = tokio_test::block_on(f.get("https://example.com")).unwrap();
        assert_eq!(response.content, b"hello");
    }
}
