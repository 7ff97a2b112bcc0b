//! Core data model.
//!
//! A work item is one unit of queued work: identity, a duck-typed payload,
//! a retry count maintained by the queue owner, and the lifecycle state the
//! agent stamps on it before report-back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Work Item
// ---------------------------------------------------------------------------

/// A unit of work popped from the queue.
///
/// The wire shape is JSON with these exact field names. Unknown fields from
/// the queue owner are ignored on input and not echoed back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    /// Opaque identifier, stable for the lifetime of one item.
    pub id: String,

    /// Mutable display label. Processors may rewrite this.
    #[serde(default)]
    pub name: String,

    /// The item's payload — either a serialized JSON string or a native
    /// mapping, depending on what the producer sent.
    #[serde(default)]
    pub payload: Payload,

    /// Number of prior attempts. Maintained by the queue owner; read-only here.
    #[serde(default)]
    pub retries: u32,

    /// Lifecycle state. Set exactly once per processing attempt.
    #[serde(default)]
    pub state: State,

    /// Error classification, present only when `state == Retry`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errortype: Option<String>,

    /// Human-readable failure text, present only when `state == Retry`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errormessage: Option<String>,

    /// Where the failure came from, present only when `state == Retry`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errorsource: Option<String>,

    /// When the queue owner enqueued this item.
    #[serde(default = "Utc::now")]
    pub enqueued_at: DateTime<Utc>,
}

impl WorkItem {
    /// A fresh pending item with a raw string payload.
    pub fn new(id: impl Into<String>, payload: Payload) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            payload,
            retries: 0,
            state: State::Pending,
            errortype: None,
            errormessage: None,
            errorsource: None,
            enqueued_at: Utc::now(),
        }
    }

    /// Stamp the successful terminal state.
    ///
    /// Rejects items that already carry a terminal state: each popped item
    /// gets exactly one stamp per processing attempt.
    pub fn mark_successful(&mut self) -> Result<()> {
        self.transition_to(State::Successful)
    }

    /// Stamp the retry terminal state with the application classification.
    ///
    /// The agent only ever produces `"application"` — the signal to the queue
    /// owner that the failure is retry-eligible, not a permanent fault.
    pub fn mark_retry(&mut self, error: &str) -> Result<()> {
        self.transition_to(State::Retry)?;
        self.errortype = Some("application".to_string());
        self.errormessage = Some(error.to_string());
        self.errorsource = Some(error.to_string());
        Ok(())
    }

    fn transition_to(&mut self, to: State) -> Result<()> {
        if !self.state.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle state of a work item within one processing attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Popped, not yet processed.
    #[default]
    Pending,
    /// Processed without failure. Terminal.
    Successful,
    /// Processing failed; the queue owner may re-deliver. Terminal.
    Retry,
}

impl State {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: State) -> bool {
        use State::*;
        matches!((self, to), (Pending, Successful) | (Pending, Retry))
    }

    /// Is this a terminal state for the in-process attempt?
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Successful | State::Retry)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            State::Pending => "pending",
            State::Successful => "successful",
            State::Retry => "retry",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// The duck-typed payload a producer may attach to a work item.
///
/// Producers send either a serialized JSON string or a native mapping; the
/// agent accepts both and normalizes to a mapping before processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// Serialized wire form.
    Raw(String),
    /// Native mapping.
    Structured(Map<String, Value>),
    /// Anything else a producer managed to send (number, array, null).
    Other(Value),
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Structured(Map::new())
    }
}

impl Payload {
    /// Normalize to a mapping. Total — never fails.
    ///
    /// Raw strings are parsed as JSON objects; unparseable strings, non-object
    /// JSON, and non-string non-mapping payloads all collapse to `{}`.
    pub fn normalize(&self) -> Map<String, Value> {
        match self {
            Payload::Structured(map) => map.clone(),
            Payload::Raw(s) => match serde_json::from_str::<Value>(s) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            },
            Payload::Other(_) => Map::new(),
        }
    }

    /// Serialize a mapping back to the wire string form.
    pub fn to_wire(map: &Map<String, Value>) -> Payload {
        // Serializing a Map<String, Value> cannot fail.
        Payload::Raw(serde_json::to_string(&Value::Object(map.clone())).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_payload_normalizes_to_mapping() {
        let p = Payload::Raw(r#"{"a":1}"#.to_string());
        let map = p.normalize();
        assert_eq!(map.get("a"), Some(&json!(1)));
    }

    #[test]
    fn garbage_string_normalizes_to_empty() {
        let p = Payload::Raw("not json".to_string());
        assert!(p.normalize().is_empty());
    }

    #[test]
    fn non_object_payload_normalizes_to_empty() {
        let p = Payload::Other(json!(42));
        assert!(p.normalize().is_empty());

        let p = Payload::Raw("[1,2,3]".to_string());
        assert!(p.normalize().is_empty());
    }

    #[test]
    fn retry_stamp_sets_application_classification() {
        let mut item = WorkItem::new("wi-1", Payload::default());
        item.mark_retry("boom").unwrap();
        assert_eq!(item.state, State::Retry);
        assert_eq!(item.errortype.as_deref(), Some("application"));
        assert!(item.errormessage.as_deref().unwrap().contains("boom"));
    }

    #[test]
    fn terminal_item_rejects_a_second_stamp() {
        let mut item = WorkItem::new("wi-1", Payload::default());
        item.mark_successful().unwrap();

        let err = item.mark_retry("late failure").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                from: State::Successful,
                to: State::Retry,
            }
        ));
        // The rejected stamp left the item untouched.
        assert_eq!(item.state, State::Successful);
        assert!(item.errortype.is_none());
    }

    #[test]
    fn only_pending_transitions_are_legal() {
        assert!(State::Pending.can_transition_to(State::Successful));
        assert!(State::Pending.can_transition_to(State::Retry));
        assert!(!State::Successful.can_transition_to(State::Retry));
        assert!(!State::Retry.can_transition_to(State::Successful));
    }
}
