//! Coercion of raw widget input and stored values to a node's declared type

use chrono::NaiveDate;
use form_ir::{DATE_FORMAT, FormValue};
use form_schema::{NodeKind, SchemaNode};

/// Raw input as produced by a widget change event
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    /// Text typed into an input or chosen from a select
    Text(String),
    /// Checkbox state
    Checked(bool),
    /// Numeric input delivered already parsed
    Number(f64),
    /// Date picker output
    Date(NaiveDate),
    /// Already-structured value (programmatic updates)
    Value(FormValue),
}

impl From<&str> for RawInput {
    fn from(text: &str) -> Self {
        RawInput::Text(text.to_string())
    }
}

impl From<String> for RawInput {
    fn from(text: String) -> Self {
        RawInput::Text(text)
    }
}

impl From<bool> for RawInput {
    fn from(checked: bool) -> Self {
        RawInput::Checked(checked)
    }
}

impl From<f64> for RawInput {
    fn from(n: f64) -> Self {
        RawInput::Number(n)
    }
}

impl From<NaiveDate> for RawInput {
    fn from(date: NaiveDate) -> Self {
        RawInput::Date(date)
    }
}

impl From<FormValue> for RawInput {
    fn from(value: FormValue) -> Self {
        RawInput::Value(value)
    }
}

/// Best-effort conversion of widget input to the node's type.
///
/// Blank text becomes `Null` for every kind. Text that does not parse as the
/// declared type is kept as a string so validation can report it.
#[must_use]
pub fn coerce_input(node: &SchemaNode, input: RawInput) -> FormValue {
    match input {
        RawInput::Text(text) => {
            if text.trim().is_empty() {
                return FormValue::Null;
            }
            match &node.kind {
                NodeKind::Number => parse_number(&text).map_or(FormValue::String(text), FormValue::Number),
                NodeKind::Boolean => parse_bool(&text).map_or(FormValue::String(text), FormValue::Boolean),
                NodeKind::Date => parse_date(&text).map_or(FormValue::String(text), FormValue::Date),
                _ => FormValue::String(text),
            }
        }
        RawInput::Checked(checked) => FormValue::Boolean(checked),
        RawInput::Number(n) => FormValue::Number(n),
        RawInput::Date(date) => FormValue::Date(date),
        RawInput::Value(value) => value,
    }
}

/// Convert a non-null stored value to the node's type for validation.
///
/// Numbers, booleans and dates are read from strings as well. The error is
/// the message to report for the field.
///
/// # Errors
///
/// Returns the invalid-type message (or the enum mismatch message) when the
/// value cannot represent the declared type.
pub fn coerce_value(node: &SchemaNode, value: &FormValue) -> Result<FormValue, String> {
    let coerced = match (&node.kind, value) {
        (NodeKind::String, FormValue::String(_))
        | (NodeKind::Boolean, FormValue::Boolean(_))
        | (NodeKind::Date, FormValue::Date(_)) => Some(value.clone()),
        (NodeKind::Number, FormValue::Number(n)) if n.is_finite() => Some(value.clone()),
        (NodeKind::Number, FormValue::String(s)) => parse_number(s).map(FormValue::Number),
        (NodeKind::Boolean, FormValue::String(s)) => parse_bool(s).map(FormValue::Boolean),
        (NodeKind::Date, FormValue::String(s)) => {
            return parse_date(s)
                .map(FormValue::Date)
                .ok_or_else(|| invalid_type(node, "Invalid date".to_string()));
        }
        (NodeKind::Enum { options }, FormValue::String(s)) => {
            if options.contains(s) {
                Some(value.clone())
            } else {
                return Err(format!(
                    "Invalid enum value. Expected {}, received '{s}'",
                    quoted_options(options)
                ));
            }
        }
        (NodeKind::Enum { options }, other) => {
            return Err(invalid_type(
                node,
                format!("Expected {}, received {}", quoted_options(options), other.kind_name()),
            ));
        }
        _ => None,
    };

    coerced.ok_or_else(|| {
        invalid_type(
            node,
            format!(
                "Expected {}, received {}",
                node.tag(),
                received_name(node, value)
            ),
        )
    })
}

fn invalid_type(node: &SchemaNode, default: String) -> String {
    node.constraints
        .invalid_type_message
        .clone()
        .unwrap_or(default)
}

/// Name of the received type; an unparseable number string counts as `nan`
fn received_name(node: &SchemaNode, value: &FormValue) -> &'static str {
    match (&node.kind, value) {
        (NodeKind::Number, FormValue::Number(_)) => "nan",
        _ => value.kind_name(),
    }
}

fn quoted_options(options: &[String]) -> String {
    options
        .iter()
        .map(|o| format!("'{o}'"))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()
}
