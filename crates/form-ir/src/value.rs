//! Value tree held by a form session
#![allow(clippy::must_use_candidate)] // Accessors read clearly without #[must_use].

use crate::path::{FieldPath, PathSegment};
use crate::traversal::Cursor;
use crate::{Error, Result};
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Object members in declaration order
pub type ObjectMap = IndexMap<String, FormValue>;

/// Wire format for [`FormValue::Date`]
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A node of the form value tree
///
/// The tree mirrors the schema's shape but may hold values the schema would
/// reject (a string typed into a number field, a missing required value).
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FormValue {
    /// Absent value
    #[default]
    Null,

    /// Text value
    String(String),

    /// Numeric value
    Number(f64),

    /// Checkbox/boolean value
    Boolean(bool),

    /// Calendar date
    Date(NaiveDate),

    /// Nested object
    Object(ObjectMap),

    /// Ordered list of elements
    Array(Vec<FormValue>),
}

impl FormValue {
    /// Empty object
    pub fn object() -> Self {
        FormValue::Object(ObjectMap::new())
    }

    /// Object from `(key, value)` pairs, in order
    pub fn object_from<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<FormValue>,
    {
        FormValue::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Short type name used in messages (`"string"`, `"number"`, ...)
    pub fn kind_name(&self) -> &'static str {
        match self {
            FormValue::Null => "undefined",
            FormValue::String(_) => "string",
            FormValue::Number(_) => "number",
            FormValue::Boolean(_) => "boolean",
            FormValue::Date(_) => "date",
            FormValue::Object(_) => "object",
            FormValue::Array(_) => "array",
        }
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FormValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FormValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FormValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FormValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FormValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectMap> {
        match self {
            FormValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectMap> {
        match self {
            FormValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<FormValue>> {
        match self {
            FormValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<FormValue>> {
        match self {
            FormValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Value at `path`, if every step exists
    pub fn get(&self, path: &FieldPath) -> Option<&FormValue> {
        Cursor::new(self).navigate(path).ok().map(|c| c.node())
    }

    /// Mutable value at `path`, if every step exists
    pub fn get_mut(&mut self, path: &FieldPath) -> Option<&mut FormValue> {
        let mut current = self;
        for segment in path.segments() {
            current = match (segment, current) {
                (PathSegment::Key(k), FormValue::Object(map)) => map.get_mut(k)?,
                (PathSegment::Index(i), FormValue::Array(items)) => items.get_mut(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Replace the value at `path`.
    ///
    /// Missing object members along the way are created as empty objects (or
    /// as the value itself for the last step). Array indices must already
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] for an out-of-range index and
    /// [`Error::TypeMismatch`] when a step walks into a non-container.
    pub fn set(&mut self, path: &FieldPath, value: FormValue) -> Result<()> {
        let Some((last, parents)) = path.segments().split_last() else {
            *self = value;
            return Ok(());
        };

        let mut current = self;
        let mut walked = FieldPath::root();
        for segment in parents {
            if current.is_null() {
                if let PathSegment::Key(_) = segment {
                    *current = FormValue::object();
                }
            }
            current = match (segment, current) {
                (PathSegment::Key(k), FormValue::Object(map)) => {
                    map.entry(k.clone()).or_insert(FormValue::Null)
                }
                (PathSegment::Index(i), FormValue::Array(items)) => {
                    let len = items.len();
                    items
                        .get_mut(*i)
                        .ok_or_else(|| Error::node_not_found(format!("{walked}[{i}] (len {len})")))?
                }
                (PathSegment::Key(_), other) => {
                    return Err(Error::type_mismatch(&walked, "object", other.kind_name()));
                }
                (PathSegment::Index(_), other) => {
                    return Err(Error::type_mismatch(&walked, "array", other.kind_name()));
                }
            };
            walked.push(segment.clone());
        }

        if current.is_null() {
            if let PathSegment::Key(_) = last {
                *current = FormValue::object();
            }
        }
        match (last, current) {
            (PathSegment::Key(k), FormValue::Object(map)) => {
                map.insert(k.clone(), value);
                Ok(())
            }
            (PathSegment::Index(i), FormValue::Array(items)) => match items.get_mut(*i) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(Error::node_not_found(path)),
            },
            (PathSegment::Key(_), other) => {
                Err(Error::type_mismatch(&walked, "object", other.kind_name()))
            }
            (PathSegment::Index(_), other) => {
                Err(Error::type_mismatch(&walked, "array", other.kind_name()))
            }
        }
    }

    /// Deep-merge `overlay` into `self`.
    ///
    /// Objects merge member-wise; any other non-null overlay value replaces
    /// the target. Null overlay values leave the target untouched.
    pub fn merge(&mut self, overlay: &FormValue) {
        match (self, overlay) {
            (_, FormValue::Null) => {}
            (FormValue::Object(target), FormValue::Object(source)) => {
                for (key, value) in source {
                    match target.get_mut(key) {
                        Some(existing) => existing.merge(value),
                        None => {
                            target.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
            (target, value) => *target = value.clone(),
        }
    }

    /// Plain-text rendering used for input widgets
    pub fn display_string(&self) -> String {
        match self {
            FormValue::Null => String::new(),
            FormValue::String(s) => s.clone(),
            FormValue::Number(n) => n.to_string(),
            FormValue::Boolean(b) => b.to_string(),
            FormValue::Date(d) => d.format(DATE_FORMAT).to_string(),
            FormValue::Object(_) | FormValue::Array(_) => self.to_json().to_string(),
        }
    }

    /// Convert to JSON; dates become `YYYY-MM-DD` strings
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            FormValue::Null => Json::Null,
            FormValue::String(s) => Json::String(s.clone()),
            FormValue::Number(n) => number_to_json(*n),
            FormValue::Boolean(b) => Json::Bool(*b),
            FormValue::Date(d) => Json::String(d.format(DATE_FORMAT).to_string()),
            FormValue::Object(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            FormValue::Array(items) => Json::Array(items.iter().map(FormValue::to_json).collect()),
        }
    }

    /// Convert from JSON.
    ///
    /// Untyped: date strings stay strings until a schema coerces them.
    pub fn from_json(json: &serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => FormValue::Null,
            Json::Bool(b) => FormValue::Boolean(*b),
            Json::Number(n) => n.as_f64().map_or(FormValue::Null, FormValue::Number),
            Json::String(s) => FormValue::String(s.clone()),
            Json::Array(items) => FormValue::Array(items.iter().map(FormValue::from_json).collect()),
            Json::Object(map) => FormValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), FormValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

#[allow(clippy::cast_possible_truncation)] // Guarded by the fract/range check.
fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
    }
}

impl fmt::Display for FormValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_string())
    }
}

impl Serialize for FormValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FormValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(FormValue::from_json(&json))
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        FormValue::String(value.to_string())
    }
}

impl From<String> for FormValue {
    fn from(value: String) -> Self {
        FormValue::String(value)
    }
}

impl From<f64> for FormValue {
    fn from(value: f64) -> Self {
        FormValue::Number(value)
    }
}

impl From<i32> for FormValue {
    fn from(value: i32) -> Self {
        FormValue::Number(f64::from(value))
    }
}

impl From<bool> for FormValue {
    fn from(value: bool) -> Self {
        FormValue::Boolean(value)
    }
}

impl From<NaiveDate> for FormValue {
    fn from(value: NaiveDate) -> Self {
        FormValue::Date(value)
    }
}

impl From<Vec<FormValue>> for FormValue {
    fn from(value: Vec<FormValue>) -> Self {
        FormValue::Array(value)
    }
}

impl From<ObjectMap> for FormValue {
    fn from(value: ObjectMap) -> Self {
        FormValue::Object(value)
    }
}
