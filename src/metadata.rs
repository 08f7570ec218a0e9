//! `_meta` stamping.
//!
//! `spec.md` §6 defines the metadata stamp the passthrough context attaches
//! to outgoing responses and notifications when enabled:
//! `_meta.source = "passthrough-server"`, `_meta.timestamp` (ISO-8601),
//! and `_meta.sourceSessionId` / `_meta.targetSessionId` (or
//! `_meta.sessionId` for notifications). Pre-existing `_meta` keys are
//! preserved — see [`crate::message::McpResponse::stamp_meta`].

use serde_json::{Map, Value};

/// The fixed `_meta.source` value the passthrough context stamps.
pub const META_SOURCE: &str = "passthrough-server";

/// Build the `_meta` additions for a response, per `spec.md` §4.E step 8.
#[must_use]
pub fn response_stamp(
    source_session_id: Option<&str>,
    target_session_id: Option<&str>,
    timestamp: chrono::DateTime<chrono::Utc>,
) -> Map<String, Value> {
    let mut stamp = Map::new();
    stamp.insert("source".into(), Value::String(META_SOURCE.into()));
    stamp.insert("timestamp".into(), Value::String(timestamp.to_rfc3339()));
    if let Some(id) = source_session_id {
        stamp.insert("sourceSessionId".into(), Value::String(id.into()));
    }
    if let Some(id) = target_session_id {
        stamp.insert("targetSessionId".into(), Value::String(id.into()));
    }
    stamp
}

/// Build the `_meta` additions for a notification, per `spec.md` §6.
#[must_use]
pub fn notification_stamp(
    session_id: Option<&str>,
    timestamp: chrono::DateTime<chrono::Utc>,
) -> Map<String, Value> {
    let mut stamp = Map::new();
    stamp.insert("source".into(), Value::String(META_SOURCE.into()));
    stamp.insert("timestamp".into(), Value::String(timestamp.to_rfc3339()));
    if let Some(id) = session_id {
        stamp.insert("sessionId".into(), Value::String(id.into()));
    }
    stamp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_stamp_includes_both_session_ids_when_present() {
        let stamp = response_stamp(Some("src"), Some("tgt"), chrono::Utc::now());
        assert_eq!(stamp.get("sourceSessionId").unwrap(), "src");
        assert_eq!(stamp.get("targetSessionId").unwrap(), "tgt");
        assert_eq!(stamp.get("source").unwrap(), META_SOURCE);
    }
}
