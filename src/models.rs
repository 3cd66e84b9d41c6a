//! Data models for the FlareSolverr v1 command protocol.

use crate::error::{FetchError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Request methods the solver can replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// Returns the method name as callers pass it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }

    /// Solver command name: `request.get` / `request.post`.
    pub fn command(&self) -> String {
        format!("request.{}", self.as_str()).to_lowercase()
    }
}

impl FromStr for Method {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            other => Err(FetchError::UnsupportedMethod(other.to_string())),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cookie record as exchanged with the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default)]
    pub path: Option<String>,
    /// Seconds since the epoch; the solver reports `-1` for session cookies.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_expires"
    )]
    pub expires: Option<f64>,
    #[serde(default, skip_serializing)]
    pub secure: Option<bool>,
}

/// Whole-second expiries go out as integers; fractional ones are sent as received.
fn serialize_expires<S>(expires: &Option<f64>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match expires {
        Some(e) if e.fract() == 0.0 => serializer.serialize_some(&(*e as i64)),
        Some(e) => serializer.serialize_some(e),
        None => serializer.serialize_none(),
    }
}

/// Body posted to `/v1`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverCommand {
    pub cmd: String,
    pub url: String,
    pub max_timeout: u64,
    /// Makes the solver base64-encode the body so binary content survives.
    pub download: bool,
    pub cookies: Vec<SolverCookie>,
    pub post_data: Option<String>,
}

/// The replayed request's outcome.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Solution {
    #[serde(default)]
    pub status: Option<u16>,
    /// Base64 body (because `download` is set)
    #[serde(default)]
    pub response: Option<String>,
    /// Final URL after redirects
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_null_as_empty")]
    pub cookies: Vec<SolverCookie>,
}

/// Treat an explicit `null` list like a missing one.
fn deserialize_null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<SolverCookie>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<SolverCookie>>::deserialize(deserializer)?.unwrap_or_default())
}

/// How a solver reply is classified.
///
/// Only `status == "ok"` together with an integer `solution.status` counts as
/// solved. Every other shape is a solver failure, whatever its field types.
#[derive(Debug, Clone)]
pub enum SolverReply {
    Solved { status: u16, solution: Solution },
    Failed { message: String },
}

impl SolverReply {
    /// Classify a raw reply, decoding the solution strictly only when solved.
    pub fn from_value(reply: &Value) -> Result<Self> {
        let ok = reply.get("status").and_then(Value::as_str) == Some("ok");
        let status = reply
            .pointer("/solution/status")
            .and_then(Value::as_u64)
            .and_then(|s| u16::try_from(s).ok());

        match (ok, status) {
            (true, Some(status)) => {
                let solution = Solution::deserialize(&reply["solution"])?;
                Ok(SolverReply::Solved { status, solution })
            }
            _ => Ok(SolverReply::Failed {
                message: failure_message(reply),
            }),
        }
    }
}

/// Error body for a failed reply: `message`, else `status`, else a fixed text.
fn failure_message(reply: &Value) -> String {
    let text = |v: &Value| match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    };
    reply
        .get("message")
        .and_then(text)
        .or_else(|| reply.get("status").and_then(text))
        .unwrap_or_else(|| "Unknown FlareSolverr error".into())
}

/// Response handed back to the caller regardless of how it was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherResponse {
    pub content: Vec<u8>,
    /// URL the content was finally served from
    pub redirect_url: String,
    /// Always false here; this path never reads a cache.
    pub from_cache: bool,
}

impl FetcherResponse {
    pub fn new(content: Vec<u8>, redirect_url: impl Into<String>, from_cache: bool) -> Self {
        Self {
            content,
            redirect_url: redirect_url.into(),
            from_cache,
        }
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_command() {
        assert_eq!(Method::Get.command(), "request.get");
        assert_eq!(Method::Post.command(), "request.post");
        assert_eq!("POST".parse::<Method>().unwrap(), Method::Post);
    }

    #[test]
    fn test_unsupported_method() {
        for method in ["PUT", "DELETE", "HEAD", "get", ""] {
            let err = method.parse::<Method>().unwrap_err();
            assert!(matches!(err, FetchError::UnsupportedMethod(m) if m == method));
        }
    }

    #[test]
    fn test_command_serialization() {
        let cmd = SolverCommand {
            cmd: "request.get".into(),
            url: "https://example.com/".into(),
            max_timeout: 60000,
            download: true,
            cookies: vec![],
            post_data: None,
        };
        let value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "cmd": "request.get",
                "url": "https://example.com/",
                "maxTimeout": 60000,
                "download": true,
                "cookies": [],
                "postData": null,
            })
        );
    }

    #[test]
    fn test_reply_solved() {
        let reply = serde_json::json!({
            "status": "ok",
            "solution": {"status": 200, "response": "", "url": "https://x/", "cookies": null}
        });
        match SolverReply::from_value(&reply).unwrap() {
            SolverReply::Solved { status, solution } => {
                assert_eq!(status, 200);
                assert_eq!(solution.url.as_deref(), Some("https://x/"));
                assert!(solution.cookies.is_empty());
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    fn failed_message(reply: serde_json::Value) -> String {
        match SolverReply::from_value(&reply).unwrap() {
            SolverReply::Failed { message } => message,
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_reply_failure_shapes() {
        use serde_json::json;

        assert_eq!(
            failed_message(json!({"status": "error", "message": "Error solving the challenge."})),
            "Error solving the challenge."
        );
        assert_eq!(failed_message(json!({"status": 500, "message": "blocked"})), "blocked");
        assert_eq!(
            failed_message(json!({"status": "error", "message": "blocked", "solution": {"status": "n/a"}})),
            "blocked"
        );
        assert_eq!(
            failed_message(json!({"status": "ok", "message": "no status", "solution": {"url": "https://x/"}})),
            "no status"
        );
        assert_eq!(
            failed_message(json!({"status": "ok", "message": "too big", "solution": {"status": 70000}})),
            "too big"
        );
        assert_eq!(failed_message(json!({"status": "error"})), "error");
        assert_eq!(failed_message(json!({"message": 7})), "7");
        assert_eq!(failed_message(json!([1, 2])), "Unknown FlareSolverr error");
    }
}
