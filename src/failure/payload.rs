//! Opaque error payloads.
//!
//! Error bodies returned by the backend (or handed to the reporter by
//! application code) have no fixed shape. `Payload` models them as a JSON-like
//! tree whose objects are shared handles, so one object can appear in several
//! places of the tree or even contain itself. Every walk over a payload tracks
//! the objects it has already entered and emits [`CIRCULAR_MARKER`] instead of
//! descending twice.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Marker emitted in place of an object reference already seen on a walk.
pub const CIRCULAR_MARKER: &str = "[Circular Reference]";

/// A JSON-like value with shared object nodes.
#[derive(Debug, Clone, Default)]
pub enum Payload {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<Payload>),
    Object(PayloadObject),
}

/// Shared, mutable object node.
///
/// Cloning a `PayloadObject` clones the handle, not the fields.
#[derive(Clone, Default)]
pub struct PayloadObject {
    fields: Arc<RwLock<Vec<(String, Payload)>>>,
}

impl PayloadObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field. Insertion order is preserved.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Payload>) {
        let key = key.into();
        let value = value.into();
        let mut fields = self.fields.write().unwrap_or_else(|e| e.into_inner());
        match fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => fields.push((key, value)),
        }
    }

    /// Field value, cloned out of the node.
    pub fn get(&self, key: &str) -> Option<Payload> {
        let fields = self.fields.read().unwrap_or_else(|e| e.into_inner());
        fields.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    /// Snapshot of all fields, in insertion order.
    pub fn entries(&self) -> Vec<(String, Payload)> {
        self.fields.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.fields.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identity of the node, stable for the lifetime of the handle.
    fn identity(&self) -> usize {
        Arc::as_ptr(&self.fields) as *const () as usize
    }
}

// Fields may point back at this node; printing them would never terminate.
impl fmt::Debug for PayloadObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadObject")
            .field("id", &format_args!("{:#x}", self.identity()))
            .field("fields", &self.len())
            .finish()
    }
}

impl Payload {
    /// Build an object payload from key/value pairs.
    pub fn object<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Payload>,
    {
        let obj = PayloadObject::new();
        for (k, v) in pairs {
            obj.insert(k, v);
        }
        Payload::Object(obj)
    }

    /// Field lookup; `None` for non-objects.
    pub fn get(&self, key: &str) -> Option<Payload> {
        match self {
            Payload::Object(obj) => obj.get(key),
            _ => None,
        }
    }

    /// Truthiness as the backend's JSON consumers treat it.
    pub fn is_truthy(&self) -> bool {
        match self {
            Payload::Null => false,
            Payload::Bool(b) => *b,
            Payload::Number(n) => *n != 0.0 && !n.is_nan(),
            Payload::Text(s) => !s.is_empty(),
            Payload::List(_) | Payload::Object(_) => true,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Payload::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }

    /// A truthy field rendered as text.
    pub fn text_field(&self, key: &str) -> Option<String> {
        self.get(key)
            .filter(Payload::is_truthy)
            .map(|v| sanitize_object(&v))
    }

    /// Convert to a `serde_json::Value`, replacing repeated object references
    /// with [`CIRCULAR_MARKER`].
    pub fn to_json(&self) -> serde_json::Value {
        let mut seen = HashSet::new();
        to_json_inner(self, &mut seen)
    }
}

fn to_json_inner(payload: &Payload, seen: &mut HashSet<usize>) -> serde_json::Value {
    use serde_json::Value;

    match payload {
        Payload::Null => Value::Null,
        Payload::Bool(b) => Value::Bool(*b),
        Payload::Number(n) => number_to_json(*n),
        Payload::Text(s) => Value::String(s.clone()),
        Payload::List(items) => Value::Array(items.iter().map(|i| to_json_inner(i, seen)).collect()),
        Payload::Object(obj) => {
            if !seen.insert(obj.identity()) {
                return Value::String(CIRCULAR_MARKER.to_string());
            }
            let map = obj
                .entries()
                .into_iter()
                .map(|(k, v)| (k, to_json_inner(&v, seen)))
                .collect();
            Value::Object(map)
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        (n as i64).to_string()
    } else {
        n.to_string()
    }
}

/// Render any payload as displayable text.
///
/// Error-shaped objects collapse to their message (`"title: message"` when a
/// title is present), then to a nested `error`, then to `"status: statusText"`.
/// Anything else is pretty-printed JSON with repeated references replaced by
/// [`CIRCULAR_MARKER`]. Never panics and always terminates.
pub fn sanitize_object(payload: &Payload) -> String {
    let mut seen = HashSet::new();
    sanitize_inner(payload, &mut seen)
}

fn sanitize_inner(payload: &Payload, seen: &mut HashSet<usize>) -> String {
    match payload {
        Payload::Null => String::new(),
        Payload::Bool(b) => b.to_string(),
        Payload::Number(n) => format_number(*n),
        Payload::Text(s) => s.clone(),
        Payload::List(_) => stringify(payload),
        Payload::Object(obj) => {
            if !seen.insert(obj.identity()) {
                return CIRCULAR_MARKER.to_string();
            }

            let truthy = |key: &str| obj.get(key).filter(Payload::is_truthy);

            match (truthy("message"), truthy("title")) {
                (Some(message), Some(title)) => {
                    return format!(
                        "{}: {}",
                        sanitize_inner(&title, seen),
                        sanitize_inner(&message, seen)
                    );
                }
                (Some(message), None) => return sanitize_inner(&message, seen),
                _ => {}
            }
            if let Some(inner) = truthy("error") {
                return sanitize_inner(&inner, seen);
            }
            if let (Some(text), Some(status)) = (truthy("statusText"), truthy("status")) {
                return format!(
                    "{}: {}",
                    sanitize_inner(&status, seen),
                    sanitize_inner(&text, seen)
                );
            }
            stringify(payload)
        }
    }
}

fn stringify(payload: &Payload) -> String {
    serde_json::to_string_pretty(&payload.to_json())
        .unwrap_or_else(|_| "[Object - Cannot display]".to_string())
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Payload::Null,
            Value::Bool(b) => Payload::Bool(b),
            Value::Number(n) => n.as_f64().map(Payload::Number).unwrap_or(Payload::Null),
            Value::String(s) => Payload::Text(s),
            Value::Array(items) => Payload::List(items.into_iter().map(Payload::from).collect()),
            Value::Object(map) => Payload::object(map),
        }
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<bool> for Payload {
    fn from(b: bool) -> Self {
        Payload::Bool(b)
    }
}

impl From<f64> for Payload {
    fn from(n: f64) -> Self {
        Payload::Number(n)
    }
}

impl From<u16> for Payload {
    fn from(n: u16) -> Self {
        Payload::Number(f64::from(n))
    }
}

impl From<PayloadObject> for Payload {
    fn from(obj: PayloadObject) -> Self {
        Payload::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_and_message() {
        let p = Payload::object([("message", "X"), ("title", "Y")]);
        assert_eq!(sanitize_object(&p), "Y: X");
    }

    #[test]
    fn test_primitives() {
        assert_eq!(sanitize_object(&Payload::Null), "");
        assert_eq!(sanitize_object(&Payload::Number(500.0)), "500");
        assert_eq!(sanitize_object(&Payload::Number(1.5)), "1.5");
        assert_eq!(sanitize_object(&Payload::Bool(true)), "true");
        assert_eq!(sanitize_object(&"plain".into()), "plain");
    }

    #[test]
    fn test_nested_error_and_status_text() {
        let inner = Payload::object([("message", "card declined")]);
        let outer = Payload::object([("error", inner)]);
        assert_eq!(sanitize_object(&outer), "card declined");

        let status = Payload::object([
            ("status", Payload::from(503u16)),
            ("statusText", Payload::from("Service Unavailable")),
        ]);
        assert_eq!(sanitize_object(&status), "503: Service Unavailable");
    }

    #[test]
    fn test_self_reference_is_marked() {
        let obj = PayloadObject::new();
        obj.insert("name", "loop");
        obj.insert("me", obj.clone());

        let text = sanitize_object(&Payload::Object(obj));
        assert!(text.contains(CIRCULAR_MARKER));
        assert!(text.contains("loop"));
    }

    #[test]
    fn test_self_referencing_error_field_terminates() {
        let obj = PayloadObject::new();
        obj.insert("error", obj.clone());
        assert_eq!(sanitize_object(&Payload::Object(obj)), CIRCULAR_MARKER);
    }

    #[test]
    fn test_from_json() {
        let p = Payload::from(serde_json::json!({"message": "bad input", "code": 42}));
        assert_eq!(p.text_field("message").as_deref(), Some("bad input"));
        assert_eq!(p.get("code").and_then(|c| c.as_number()), Some(42.0));
        assert_eq!(p.to_json()["code"], serde_json::json!(42));
    }
}
