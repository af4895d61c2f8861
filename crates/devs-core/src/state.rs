//! Model state and event payloads
//!
//! Atomic models keep an open, string-keyed state next to their phase.
//! [`StateMap`] is that container; it journals writes so the simulator can
//! forward them to a trace sink after each behavior call.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
pub use serde_json::Value;

/// A `(port, body)` pair travelling on `IN`/`OUT` messages
///
/// A missing body means the model chose to emit nothing on that port; such
/// events are dropped by the coordinator that receives them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub port: String,
    pub body: Option<Value>,
}

impl Event {
    pub fn new(port: impl Into<String>, body: Option<Value>) -> Self {
        Event {
            port: port.into(),
            body,
        }
    }

    /// Event with a body
    pub fn with_body(port: impl Into<String>, body: Value) -> Self {
        Event::new(port, Some(body))
    }

    /// Look up a field of an object body
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.body.as_ref().and_then(|b| b.get(key))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            Some(body) => write!(f, "({}, {})", self.port, body),
            None => write!(f, "({}, None)", self.port),
        }
    }
}

/// Observed string-keyed state of an atomic model
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateMap {
    values: BTreeMap<String, Value>,
    writes: Vec<(String, Value)>,
    owner: String,
}

impl StateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the model owning this state, empty until the model is built
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn set_owner(&mut self, path: &str) {
        self.owner = path.to_string();
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Value::as_u64)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Store a value and journal the write
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        self.writes.push((key.clone(), value.clone()));
        self.values.insert(key, value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let old = self.values.remove(key);
        if old.is_some() {
            self.writes.push((key.to_string(), Value::Null));
        }
        old
    }

    /// Increment an integer counter, starting from zero
    pub fn increment(&mut self, key: &str) -> u64 {
        let next = self.get_u64(key).unwrap_or(0) + 1;
        self.insert(key, next);
        next
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Drain the write journal accumulated since the last call
    pub fn take_writes(&mut self) -> Vec<(String, Value)> {
        std::mem::take(&mut self.writes)
    }
}

impl FromIterator<(String, Value)> for StateMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        StateMap {
            values: iter.into_iter().collect(),
            writes: Vec::new(),
            owner: String::new(),
        }
    }
}
