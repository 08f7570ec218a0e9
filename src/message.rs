//! MCP payload envelopes.
//!
//! The wire schema of individual MCP methods is out of scope (see `spec.md`
//! §1) — these types carry only what the hook chain needs to route and
//! transform a message: a method name where relevant, a JSON payload, a
//! JSON-RPC id, and the optional `requestContext` / `_meta` side-channels
//! hooks are allowed to touch.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON-RPC request identifier.
///
/// Mirrors the shape used throughout the surrounding MCP ecosystem: either a
/// string or a 64-bit integer, never a float, never null (the JSON-RPC spec
/// allows string, number, or null for request ids; a null id never reaches
/// the hook chain since the passthrough context only invokes it for real
/// requests).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// String identifier.
    String(String),
    /// Numeric identifier.
    Number(i64),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

/// Context carried on a request payload for HTTP-layer details.
///
/// Consumed and stripped by the passthrough context before the payload is
/// transmitted to the target, and its `headers` map is merged into the
/// outgoing HTTP request headers. Hooks may freely mutate this.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContextPayload {
    /// Outgoing HTTP headers, keyed case-sensitively as provided.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    /// Target host, if overridden by a hook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Target path, if overridden by a hook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

const REQUEST_CONTEXT_KEY: &str = "requestContext";
const META_KEY: &str = "_meta";

/// An MCP request traversing the hook chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpRequest {
    /// The JSON-RPC method name.
    pub method: String,
    /// Request parameters. `Value::Null` if the method takes none.
    #[serde(default)]
    pub params: Value,
    /// The JSON-RPC request id.
    pub id: RequestId,
}

impl McpRequest {
    /// Construct a request with no parameters.
    pub fn new(method: impl Into<String>, id: impl Into<RequestId>) -> Self {
        Self {
            method: method.into(),
            params: Value::Null,
            id: id.into(),
        }
    }

    /// Construct a request carrying the given parameters.
    pub fn with_params(method: impl Into<String>, id: impl Into<RequestId>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
            id: id.into(),
        }
    }

    /// Read the `requestContext` side-channel from `params`, if present,
    /// without removing it.
    #[must_use]
    pub fn request_context(&self) -> Option<RequestContextPayload> {
        self.params
            .get(REQUEST_CONTEXT_KEY)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
    }

    /// Attach (or replace) the `requestContext` side-channel on `params`.
    pub fn set_request_context(&mut self, ctx: RequestContextPayload) {
        let obj = self.params_as_object_mut();
        obj.insert(
            REQUEST_CONTEXT_KEY.to_string(),
            serde_json::to_value(ctx).unwrap_or(Value::Null),
        );
    }

    /// Remove and return the `requestContext` side-channel.
    ///
    /// Called by the passthrough context right before the payload is
    /// transmitted to the target: the key is transport-layer only and must
    /// never reach the wire.
    pub fn take_request_context(&mut self) -> Option<RequestContextPayload> {
        let Value::Object(obj) = &mut self.params else {
            return None;
        };
        obj.remove(REQUEST_CONTEXT_KEY)
            .and_then(|v| serde_json::from_value(v).ok())
    }

    fn params_as_object_mut(&mut self) -> &mut Map<String, Value> {
        if !self.params.is_object() {
            self.params = Value::Object(Map::new());
        }
        self.params.as_object_mut().expect("just coerced to object")
    }
}

/// An MCP result (success response) traversing the hook chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResponse {
    /// The result payload.
    pub result: Value,
}

impl McpResponse {
    /// Wrap a raw result value.
    pub fn new(result: Value) -> Self {
        Self { result }
    }

    /// Merge keys into `result._meta`, preserving any keys already present.
    ///
    /// This is what makes metadata stamping idempotent: stamping twice (e.g.
    /// through chained contexts) never loses prior `_meta` keys, since later
    /// stamps only ever add missing keys on top of what's already there via
    /// [`Map::entry`]-style insertion order — existing keys are overwritten
    /// with the newer value only when explicitly re-stamped, never dropped.
    pub fn stamp_meta(&mut self, additions: Map<String, Value>) {
        let obj = if !self.result.is_object() {
            self.result = Value::Object(Map::new());
            self.result.as_object_mut().expect("just coerced")
        } else {
            self.result.as_object_mut().expect("checked is_object")
        };
        let meta = obj
            .entry(META_KEY.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(meta_obj) = meta {
            for (k, v) in additions {
                meta_obj.insert(k, v);
            }
        }
    }
}

/// An MCP notification traversing the hook chain. Notifications never carry
/// a response or an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpNotification {
    /// The JSON-RPC method name.
    pub method: String,
    /// Notification parameters. `Value::Null` if the method takes none.
    #[serde(default)]
    pub params: Value,
}

impl McpNotification {
    /// Construct a notification with no parameters.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_context_round_trips_through_params() {
        let mut req = McpRequest::new("tools/call", 1_i64);
        let mut ctx = RequestContextPayload::default();
        ctx.host = Some("example.com".into());
        ctx.headers.insert("x-api-key".into(), "secret".into());
        req.set_request_context(ctx);

        let read_back = req.request_context().expect("context present");
        assert_eq!(read_back.host.as_deref(), Some("example.com"));

        let taken = req.take_request_context().expect("context present");
        assert_eq!(taken.headers.get("x-api-key").map(String::as_str), Some("secret"));
        assert!(req.request_context().is_none());
    }

    #[test]
    fn stamp_meta_is_idempotent_and_preserves_prior_keys() {
        let mut res = McpResponse::new(serde_json::json!({"content": []}));
        let mut first = Map::new();
        first.insert("source".into(), Value::String("passthrough-server".into()));
        res.stamp_meta(first);

        let mut second = Map::new();
        second.insert("sessionId".into(), Value::String("abc".into()));
        res.stamp_meta(second);

        let meta = res.result.get("_meta").unwrap();
        assert_eq!(meta.get("source").unwrap(), "passthrough-server");
        assert_eq!(meta.get("sessionId").unwrap(), "abc");
    }
}
