//! Form parameter encoding for the solver's `postData` field.
//!
//! Callers state the shape of their payload up front with [`Params`]; the only
//! runtime shape probing left is [`Params::from_json`], for callers that start
//! from loosely typed data.

use crate::error::{FetchError, Result};
use serde_json::Value;
use std::fmt;
use std::io::Read;

const NOT_PAIRS: &str = "cannot encode objects that are not 2-tuples";

/// Request parameters, tagged by shape.
pub enum Params {
    None,
    /// Already-encoded text body, sent unchanged.
    Text(String),
    /// Already-encoded binary body, sent unchanged.
    Bytes(Vec<u8>),
    /// Readable body, sent unchanged.
    Stream(Box<dyn Read + Send>),
    /// Ordered key/value pairs to form-encode.
    Pairs(Vec<(ParamKey, ParamValue)>),
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Params::None => write!(f, "None"),
            Params::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Params::Bytes(b) => f.debug_tuple("Bytes").field(b).finish(),
            Params::Stream(_) => write!(f, "Stream(..)"),
            Params::Pairs(p) => f.debug_tuple("Pairs").field(p).finish(),
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Params::None
    }
}

/// Form field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKey {
    Text(String),
    Bytes(Vec<u8>),
}

impl ParamKey {
    fn as_bytes(&self) -> &[u8] {
        match self {
            ParamKey::Text(s) => s.as_bytes(),
            ParamKey::Bytes(b) => b,
        }
    }
}

impl From<&str> for ParamKey {
    fn from(s: &str) -> Self {
        ParamKey::Text(s.to_string())
    }
}

impl From<String> for ParamKey {
    fn from(s: String) -> Self {
        ParamKey::Text(s)
    }
}

/// Form field value; a `List` becomes one pair per element, nested lists included.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Text(String),
    Bytes(Vec<u8>),
    Number(serde_json::Number),
    Bool(bool),
    List(Vec<ParamValue>),
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        ParamValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ParamValue::Null)
    }
}

impl ParamValue {
    /// Collect the scalars of this value in order, descending into lists.
    fn flatten<'a>(&'a self, out: &mut Vec<&'a ParamValue>) {
        match self {
            ParamValue::List(items) => items.iter().for_each(|item| item.flatten(out)),
            scalar => out.push(scalar),
        }
    }

    /// Scalar rendering, `None` for values that are dropped.
    fn scalar_bytes(&self) -> Option<Vec<u8>> {
        match self {
            ParamValue::Null => None,
            ParamValue::Text(s) => Some(s.as_bytes().to_vec()),
            ParamValue::Bytes(b) => Some(b.clone()),
            ParamValue::Number(n) => Some(n.to_string().into_bytes()),
            // Python-style capitalization, as form handlers on the far side expect
            ParamValue::Bool(b) => Some(if *b { b"True".to_vec() } else { b"False".to_vec() }),
            ParamValue::List(_) => None,
        }
    }

    fn from_json(value: Value) -> Self {
        match value {
            Value::Null => ParamValue::Null,
            Value::Bool(b) => ParamValue::Bool(b),
            Value::Number(n) => ParamValue::Number(n),
            Value::String(s) => ParamValue::Text(s),
            Value::Array(items) => {
                ParamValue::List(items.into_iter().map(ParamValue::from_json).collect())
            }
            // Nested objects are not form data; send their JSON text.
            other @ Value::Object(_) => ParamValue::Text(other.to_string()),
        }
    }
}

impl Params {
    /// Build pairs from anything yielding `(key, value)`.
    pub fn pairs<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<ParamKey>,
        V: Into<ParamValue>,
    {
        Params::Pairs(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Classify loosely typed data.
    ///
    /// `null` is no payload, a string is an already-encoded body, objects and
    /// arrays of 2-element arrays are pairs. Bare numbers and booleans are
    /// rejected.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Params::None),
            Value::String(s) => Ok(Params::Text(s)),
            other => Ok(Params::Pairs(to_key_val_list(other)?)),
        }
    }
}

/// Normalize a mapping or a sequence of 2-element sequences into ordered pairs.
pub fn to_key_val_list(value: Value) -> Result<Vec<(ParamKey, ParamValue)>> {
    match value {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(k, v)| (ParamKey::Text(k), ParamValue::from_json(v)))
            .collect()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Array(mut pair) if pair.len() == 2 => {
                    let v = pair.pop().unwrap_or(Value::Null);
                    match pair.pop() {
                        Some(Value::String(k)) => Ok((ParamKey::Text(k), ParamValue::from_json(v))),
                        Some(Value::Number(n)) => {
                            Ok((ParamKey::Text(n.to_string()), ParamValue::from_json(v)))
                        }
                        _ => Err(FetchError::Encoding(NOT_PAIRS.into())),
                    }
                }
                _ => Err(FetchError::Encoding(NOT_PAIRS.into())),
            })
            .collect(),
        _ => Err(FetchError::Encoding(NOT_PAIRS.into())),
    }
}

/// Encoded payload ready for the solver command.
pub enum PostData {
    None,
    Text(String),
    Bytes(Vec<u8>),
    Stream(Box<dyn Read + Send>),
}

impl fmt::Debug for PostData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostData::None => write!(f, "None"),
            PostData::Text(s) => f.debug_tuple("Text").field(s).finish(),
            PostData::Bytes(b) => f.debug_tuple("Bytes").field(b).finish(),
            PostData::Stream(_) => write!(f, "Stream(..)"),
        }
    }
}

impl PostData {
    /// Render into the command's `postData` string, draining a stream.
    pub fn into_command_field(self) -> Result<Option<String>> {
        match self {
            PostData::None => Ok(None),
            PostData::Text(s) => Ok(Some(s)),
            PostData::Bytes(b) => Ok(Some(String::from_utf8_lossy(&b).into_owned())),
            PostData::Stream(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
            }
        }
    }
}

/// Encode parameters as a form body.
///
/// Text, bytes and streams pass through. Pairs keep their order, list values
/// (at any depth) expand into repeated keys, and null values are dropped.
pub fn encode_params(params: Params) -> Result<PostData> {
    match params {
        Params::None => Ok(PostData::None),
        Params::Text(s) => Ok(PostData::Text(s)),
        Params::Bytes(b) => Ok(PostData::Bytes(b)),
        Params::Stream(r) => Ok(PostData::Stream(r)),
        Params::Pairs(pairs) => {
            let mut encoded = Vec::new();
            for (key, value) in &pairs {
                let mut values = Vec::new();
                value.flatten(&mut values);
                for v in values {
                    if let Some(bytes) = v.scalar_bytes() {
                        encoded.push(format!(
                            "{}={}",
                            quote_plus(key.as_bytes()),
                            quote_plus(&bytes)
                        ));
                    }
                }
            }
            Ok(PostData::Text(encoded.join("&")))
        }
    }
}

/// Percent-encode with `+` for spaces, as HTML forms do.
fn quote_plus(bytes: &[u8]) -> String {
    // A literal '%' is itself escaped, so "%20" can only come from a space.
    urlencoding::encode_binary(bytes).replace("%20", "+")
}
