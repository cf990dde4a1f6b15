//! Typed values stored in the capability-marker namespace.
//!
//! The host publishes markers as a tree: interior nodes group related
//! capabilities (`navigator.camera`), leaves carry whatever the platform
//! exposes (a flag, a version string, a connection type). Latch evaluation only
//! ever asks two questions of a marker: "is it truthy?" and "what child lives
//! under this segment?".

use crate::environment::path::MarkerPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// One value in the marker tree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Marker {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Node(BTreeMap<String, Marker>),
}

impl Marker {
    /// An empty interior node.
    pub fn node() -> Self {
        Marker::Node(BTreeMap::new())
    }

    /// Truthiness as seen by latch traversal.
    ///
    /// `Null`, `false`, `0`, `NaN` and `""` are falsy; every node is truthy,
    /// including an empty one.
    pub fn is_truthy(&self) -> bool {
        match self {
            Marker::Null => false,
            Marker::Bool(value) => *value,
            Marker::Number(value) => *value != 0.0 && !value.is_nan(),
            Marker::Text(value) => !value.is_empty(),
            Marker::Node(_) => true,
        }
    }

    /// Child stored under `segment`; only nodes have children.
    pub fn child(&self, segment: &str) -> Option<&Marker> {
        match self {
            Marker::Node(children) => children.get(segment),
            _ => None,
        }
    }

    /// Resolve a full path without any truthiness checks.
    pub fn get(&self, path: &MarkerPath) -> Option<&Marker> {
        path.segments()
            .try_fold(self, |current, segment| current.child(segment))
    }

    /// Text payload of a leaf, if it is one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Marker::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Store `value` at `path`, creating interior nodes on the way.
    ///
    /// Leaves that sit where a node is needed are replaced by an empty node.
    pub fn insert(&mut self, path: &MarkerPath, value: Marker) {
        self.insert_segments(path.segments(), value);
    }

    fn insert_segments<'a>(
        &mut self,
        mut segments: impl Iterator<Item = &'a str>,
        value: Marker,
    ) {
        let Some(segment) = segments.next() else {
            *self = value;
            return;
        };
        if !matches!(*self, Marker::Node(_)) {
            *self = Marker::node();
        }
        if let Marker::Node(children) = self {
            children
                .entry(segment.to_string())
                .or_default()
                .insert_segments(segments, value);
        }
    }

    /// Detach and return the value at `path`.
    pub fn remove(&mut self, path: &MarkerPath) -> Option<Marker> {
        let (last, parents) = path.split_last()?;
        let mut current = self;
        for segment in parents {
            current = match current {
                Marker::Node(children) => children.get_mut(segment)?,
                _ => return None,
            };
        }
        match current {
            Marker::Node(children) => children.remove(last),
            _ => None,
        }
    }

    /// Deep-merge `other` into `self`; nodes merge key by key, anything else
    /// overwrites.
    pub fn merge(&mut self, other: Marker) {
        match (self, other) {
            (Marker::Node(ours), Marker::Node(theirs)) => {
                for (key, value) in theirs {
                    ours.entry(key).or_default().merge(value);
                }
            }
            (slot, other) => *slot = other,
        }
    }
}

impl From<Value> for Marker {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Marker::Null,
            Value::Bool(flag) => Marker::Bool(flag),
            Value::Number(number) => Marker::Number(number.as_f64().unwrap_or(f64::NAN)),
            Value::String(text) => Marker::Text(text),
            // Arrays behave like objects keyed by index.
            Value::Array(items) => Marker::Node(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(idx, item)| (idx.to_string(), Marker::from(item)))
                    .collect(),
            ),
            Value::Object(entries) => Marker::Node(
                entries
                    .into_iter()
                    .map(|(key, item)| (key, Marker::from(item)))
                    .collect(),
            ),
        }
    }
}

impl From<Marker> for Value {
    fn from(marker: Marker) -> Self {
        match marker {
            Marker::Null => Value::Null,
            Marker::Bool(flag) => Value::Bool(flag),
            Marker::Number(number) => Number::from_f64(number)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Marker::Text(text) => Value::String(text),
            Marker::Node(children) => Value::Object(
                children
                    .into_iter()
                    .map(|(key, child)| (key, Value::from(child)))
                    .collect::<Map<_, _>>(),
            ),
        }
    }
}

impl From<bool> for Marker {
    fn from(value: bool) -> Self {
        Marker::Bool(value)
    }
}

impl From<f64> for Marker {
    fn from(value: f64) -> Self {
        Marker::Number(value)
    }
}

impl From<i64> for Marker {
    fn from(value: i64) -> Self {
        Marker::Number(value as f64)
    }
}

impl From<&str> for Marker {
    fn from(value: &str) -> Self {
        Marker::Text(value.to_string())
    }
}

impl From<String> for Marker {
    fn from(value: String) -> Self {
        Marker::Text(value)
    }
}
