//! Schema model definitions
#![allow(clippy::must_use_candidate)] // Builder/constructor API intentionally omits pervasive #[must_use].
#![allow(clippy::return_self_not_must_use)] // Fluent builder methods return Self for ergonomics.

use crate::meta::FieldMeta;
use chrono::NaiveDate;
use form_ir::{FieldPath, FormValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Type tag of a schema node, used to pick a widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    String,
    Number,
    Boolean,
    Date,
    Enum,
    Object,
    Array,
}

impl TypeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Number => "number",
            TypeTag::Boolean => "boolean",
            TypeTag::Date => "date",
            TypeTag::Enum => "enum",
            TypeTag::Object => "object",
            TypeTag::Array => "array",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Well-known string formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringFormat {
    Email,
    Url,
}

/// Lower or upper bound of a date field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateBound {
    /// A fixed calendar date
    Fixed(NaiveDate),
    /// The current date at validation/render time
    Today,
}

impl DateBound {
    /// Concrete date given the current day
    pub fn resolve(self, today: NaiveDate) -> NaiveDate {
        match self {
            DateBound::Fixed(date) => date,
            DateBound::Today => today,
        }
    }
}

impl From<NaiveDate> for DateBound {
    fn from(date: NaiveDate) -> Self {
        DateBound::Fixed(date)
    }
}

/// A constraint value with an optional custom failure message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bound<T> {
    pub value: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Bound<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            message: None,
        }
    }

    pub fn with_message(value: T, message: impl Into<String>) -> Self {
        Self {
            value,
            message: Some(message.into()),
        }
    }

    /// Custom message or the supplied default
    pub fn message_or(&self, default: impl FnOnce() -> String) -> String {
        self.message.clone().unwrap_or_else(default)
    }
}

impl<T> From<T> for Bound<T> {
    fn from(value: T) -> Self {
        Bound::new(value)
    }
}

impl<T> From<(T, &str)> for Bound<T> {
    fn from((value, message): (T, &str)) -> Self {
        Bound::with_message(value, message)
    }
}

impl<T> From<(T, String)> for Bound<T> {
    fn from((value, message): (T, String)) -> Self {
        Bound::with_message(value, message)
    }
}

impl From<&str> for Bound<String> {
    fn from(value: &str) -> Self {
        Bound::new(value.to_string())
    }
}

impl From<NaiveDate> for Bound<DateBound> {
    fn from(date: NaiveDate) -> Self {
        Bound::new(DateBound::Fixed(date))
    }
}

impl From<(NaiveDate, &str)> for Bound<DateBound> {
    fn from((date, message): (NaiveDate, &str)) -> Self {
        Bound::with_message(DateBound::Fixed(date), message)
    }
}

impl From<(&str, &str)> for Bound<String> {
    fn from((value, message): (&str, &str)) -> Self {
        Bound::with_message(value.to_string(), message)
    }
}

/// Constraints attached to a schema node.
///
/// Which members are legal depends on the node's [`TypeTag`]; see
/// [`Constraints::illegal_for`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Whether an absent value is accepted
    pub optional: bool,

    // string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<Bound<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<Bound<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Bound<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Bound<StringFormat>>,

    // number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Bound<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Bound<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<Bound<f64>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub integer: bool,

    // date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_date: Option<Bound<DateBound>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_date: Option<Bound<DateBound>>,

    // array
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<Bound<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<Bound<usize>>,

    /// Message when a required value is absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_message: Option<String>,
    /// Message when a value has the wrong type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_type_message: Option<String>,
}

impl Constraints {
    /// First constraint that is set but not legal for `tag`
    pub fn illegal_for(&self, tag: TypeTag) -> Option<&'static str> {
        let string_only = [
            ("min_length", self.min_length.is_some()),
            ("max_length", self.max_length.is_some()),
            ("pattern", self.pattern.is_some()),
            ("format", self.format.is_some()),
        ];
        let number_only = [
            ("min", self.min.is_some()),
            ("max", self.max.is_some()),
            ("step", self.step.is_some()),
            ("integer", self.integer),
        ];
        let date_only = [
            ("min_date", self.min_date.is_some()),
            ("max_date", self.max_date.is_some()),
        ];
        let array_only = [
            ("min_items", self.min_items.is_some()),
            ("max_items", self.max_items.is_some()),
        ];

        let groups: [(&[(&'static str, bool)], TypeTag); 4] = [
            (&string_only, TypeTag::String),
            (&number_only, TypeTag::Number),
            (&date_only, TypeTag::Date),
            (&array_only, TypeTag::Array),
        ];

        groups
            .iter()
            .filter(|(_, owner)| *owner != tag)
            .flat_map(|(members, _)| members.iter())
            .find(|(_, set)| *set)
            .map(|(name, _)| *name)
    }
}

/// Predicate over a node's coerced value
pub type Predicate = Arc<dyn Fn(&FormValue) -> bool + Send + Sync>;

/// A custom check attached to a node.
///
/// Runs only after the node's own type and constraints pass. On an object
/// node the failure can be reported against a child path.
#[derive(Clone)]
pub struct Refinement {
    pub message: String,
    /// Path relative to the refined node that receives the error
    pub path: Option<FieldPath>,
    predicate: Predicate,
}

impl Refinement {
    pub fn new(
        predicate: impl Fn(&FormValue) -> bool + Send + Sync + 'static,
        message: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            path: None,
            predicate: Arc::new(predicate),
        }
    }

    /// Refinement that accepts exactly `expected`
    pub fn equals(expected: FormValue, message: impl Into<String>) -> Self {
        Self::new(move |value| *value == expected, message)
    }

    /// Report failures against `path` (relative to the refined node)
    pub fn at(mut self, path: FieldPath) -> Self {
        self.path = Some(path);
        self
    }

    pub fn check(&self, value: &FormValue) -> bool {
        (self.predicate)(value)
    }
}

impl fmt::Debug for Refinement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Refinement")
            .field("message", &self.message)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Shape of a schema node
#[derive(Debug, Clone)]
pub enum NodeKind {
    String,
    Number,
    Boolean,
    Date,
    Enum { options: Vec<String> },
    /// Members in declaration order
    Object { fields: Vec<(String, SchemaNode)> },
    Array { element: Box<SchemaNode> },
}

impl NodeKind {
    pub fn tag(&self) -> TypeTag {
        match self {
            NodeKind::String => TypeTag::String,
            NodeKind::Number => TypeTag::Number,
            NodeKind::Boolean => TypeTag::Boolean,
            NodeKind::Date => TypeTag::Date,
            NodeKind::Enum { .. } => TypeTag::Enum,
            NodeKind::Object { .. } => TypeTag::Object,
            NodeKind::Array { .. } => TypeTag::Array,
        }
    }
}

/// A node of a schema definition
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub kind: NodeKind,
    pub constraints: Constraints,
    pub default: Option<FormValue>,
    pub meta: FieldMeta,
    pub refinements: Vec<Refinement>,
}

impl SchemaNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            constraints: Constraints::default(),
            default: None,
            meta: FieldMeta::default(),
            refinements: Vec::new(),
        }
    }

    pub fn string() -> Self {
        Self::new(NodeKind::String)
    }

    pub fn number() -> Self {
        Self::new(NodeKind::Number)
    }

    pub fn boolean() -> Self {
        Self::new(NodeKind::Boolean)
    }

    pub fn date() -> Self {
        Self::new(NodeKind::Date)
    }

    pub fn enumeration<S: Into<String>>(options: impl IntoIterator<Item = S>) -> Self {
        Self::new(NodeKind::Enum {
            options: options.into_iter().map(Into::into).collect(),
        })
    }

    /// Object with members in the given order
    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, SchemaNode)>) -> Self {
        Self::new(NodeKind::Object {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        })
    }

    pub fn array(element: SchemaNode) -> Self {
        Self::new(NodeKind::Array {
            element: Box::new(element),
        })
    }

    pub fn tag(&self) -> TypeTag {
        self.kind.tag()
    }

    pub fn is_optional(&self) -> bool {
        self.constraints.optional
    }

    /// Child schema of an object member
    pub fn field(&self, name: &str) -> Option<&SchemaNode> {
        match &self.kind {
            NodeKind::Object { fields } => fields.iter().find(|(n, _)| n == name).map(|(_, n)| n),
            _ => None,
        }
    }

    /// Element schema of an array
    pub fn element(&self) -> Option<&SchemaNode> {
        match &self.kind {
            NodeKind::Array { element } => Some(element),
            _ => None,
        }
    }

    /// Enum options, empty for other kinds
    pub fn options(&self) -> &[String] {
        match &self.kind {
            NodeKind::Enum { options } => options,
            _ => &[],
        }
    }

    // Builder methods

    pub fn optional(mut self) -> Self {
        self.constraints.optional = true;
        self
    }

    pub fn min_length(mut self, bound: impl Into<Bound<usize>>) -> Self {
        self.constraints.min_length = Some(bound.into());
        self
    }

    pub fn max_length(mut self, bound: impl Into<Bound<usize>>) -> Self {
        self.constraints.max_length = Some(bound.into());
        self
    }

    pub fn pattern(mut self, bound: impl Into<Bound<String>>) -> Self {
        self.constraints.pattern = Some(bound.into());
        self
    }

    pub fn format(mut self, bound: impl Into<Bound<StringFormat>>) -> Self {
        self.constraints.format = Some(bound.into());
        self
    }

    pub fn email(self) -> Self {
        self.format(StringFormat::Email)
    }

    pub fn url(self) -> Self {
        self.format(StringFormat::Url)
    }

    pub fn min(mut self, bound: impl Into<Bound<f64>>) -> Self {
        self.constraints.min = Some(bound.into());
        self
    }

    pub fn max(mut self, bound: impl Into<Bound<f64>>) -> Self {
        self.constraints.max = Some(bound.into());
        self
    }

    pub fn step(mut self, bound: impl Into<Bound<f64>>) -> Self {
        self.constraints.step = Some(bound.into());
        self
    }

    pub fn int(mut self) -> Self {
        self.constraints.integer = true;
        self
    }

    pub fn min_date(mut self, bound: impl Into<Bound<DateBound>>) -> Self {
        self.constraints.min_date = Some(bound.into());
        self
    }

    pub fn max_date(mut self, bound: impl Into<Bound<DateBound>>) -> Self {
        self.constraints.max_date = Some(bound.into());
        self
    }

    pub fn min_items(mut self, bound: impl Into<Bound<usize>>) -> Self {
        self.constraints.min_items = Some(bound.into());
        self
    }

    pub fn max_items(mut self, bound: impl Into<Bound<usize>>) -> Self {
        self.constraints.max_items = Some(bound.into());
        self
    }

    pub fn required_message(mut self, message: impl Into<String>) -> Self {
        self.constraints.required_message = Some(message.into());
        self
    }

    pub fn invalid_type_message(mut self, message: impl Into<String>) -> Self {
        self.constraints.invalid_type_message = Some(message.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<FormValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Set label and help text from a `"Label // help text"` description
    pub fn describe(mut self, description: &str) -> Self {
        self.meta = FieldMeta::from_description(description);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.meta.label = Some(label.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.meta.help_text = Some(help.into());
        self
    }

    pub fn refine(
        self,
        predicate: impl Fn(&FormValue) -> bool + Send + Sync + 'static,
        message: impl Into<String>,
    ) -> Self {
        self.refinement(Refinement::new(predicate, message))
    }

    pub fn refinement(mut self, refinement: Refinement) -> Self {
        self.refinements.push(refinement);
        self
    }
}

/// A complete form schema
#[derive(Debug, Clone)]
pub struct Schema {
    pub title: Option<String>,
    pub root: SchemaNode,
}

impl Schema {
    pub fn new(root: SchemaNode) -> Self {
        Self { title: None, root }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

impl From<SchemaNode> for Schema {
    fn from(root: SchemaNode) -> Self {
        Schema::new(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_constraints() {
        let node = SchemaNode::string()
            .min_length((2, "Name must be at least 2 characters"))
            .max_length(50)
            .describe("Full Name // Enter your full name");

        assert_eq!(node.tag(), TypeTag::String);
        let min = node.constraints.min_length.as_ref().unwrap();
        assert_eq!(min.value, 2);
        assert_eq!(
            min.message.as_deref(),
            Some("Name must be at least 2 characters")
        );
        assert_eq!(node.constraints.max_length.as_ref().unwrap().value, 50);
        assert_eq!(node.meta.label.as_deref(), Some("Full Name"));
        assert_eq!(node.meta.help_text.as_deref(), Some("Enter your full name"));
    }

    #[test]
    fn test_object_keeps_declaration_order() {
        let node = SchemaNode::object([
            ("zeta", SchemaNode::string()),
            ("alpha", SchemaNode::number()),
            ("mid", SchemaNode::boolean()),
        ]);
        let NodeKind::Object { fields } = &node.kind else {
            panic!("expected object");
        };
        let names: Vec<&str> = fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(node.field("alpha").unwrap().tag(), TypeTag::Number);
        assert!(node.field("missing").is_none());
    }

    #[test]
    fn test_illegal_constraints() {
        let number = SchemaNode::number().step(1000.0);
        assert_eq!(number.constraints.illegal_for(TypeTag::Number), None);
        assert_eq!(number.constraints.illegal_for(TypeTag::String), Some("step"));

        let string = SchemaNode::string().min_length(1);
        assert_eq!(string.constraints.illegal_for(TypeTag::Number), Some("min_length"));
        assert_eq!(string.constraints.illegal_for(TypeTag::Enum), Some("min_length"));

        let plain = SchemaNode::boolean();
        assert_eq!(plain.constraints.illegal_for(TypeTag::Boolean), None);
    }

    #[test]
    fn test_refinement_check() {
        let refinement = Refinement::equals(FormValue::Boolean(true), "You must agree to the terms");
        assert!(refinement.check(&FormValue::Boolean(true)));
        assert!(!refinement.check(&FormValue::Boolean(false)));
        assert!(format!("{refinement:?}").contains("You must agree"));
    }

    #[test]
    fn test_date_bound_resolve() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let fixed = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        assert_eq!(DateBound::Today.resolve(today), today);
        assert_eq!(DateBound::Fixed(fixed).resolve(today), fixed);
    }
}
