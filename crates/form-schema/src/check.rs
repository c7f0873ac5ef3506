//! Structural checks applied to each schema node

use crate::model::{NodeKind, SchemaNode};
use crate::{Result, SchemaError};
use form_ir::{FieldPath, FormValue};
use regex::Regex;
use std::collections::HashSet;

/// Check one node in isolation (children are checked by the caller's walk).
///
/// # Errors
///
/// Returns the first structural problem found on this node.
pub fn check_node(path: &FieldPath, node: &SchemaNode) -> Result<()> {
    let tag = node.tag();
    let c = &node.constraints;

    if let Some(constraint) = c.illegal_for(tag) {
        return Err(SchemaError::IllegalConstraint {
            path: path.to_string(),
            tag,
            constraint,
        });
    }

    if let (Some(min), Some(max)) = (&c.min_length, &c.max_length) {
        ordered(path, "min_length", min.value, "max_length", max.value)?;
    }
    if let (Some(min), Some(max)) = (&c.min_items, &c.max_items) {
        ordered(path, "min_items", min.value, "max_items", max.value)?;
    }
    if let (Some(min), Some(max)) = (&c.min, &c.max) {
        if !min.value.is_finite() || !max.value.is_finite() {
            return Err(invalid_bounds(path, "min/max must be finite"));
        }
        ordered(path, "min", min.value, "max", max.value)?;
    }
    if let Some(step) = &c.step {
        if !(step.value.is_finite() && step.value > 0.0) {
            return Err(invalid_bounds(path, format!("step must be positive, got {}", step.value)));
        }
    }
    if let (Some(min), Some(max)) = (&c.min_date, &c.max_date) {
        // `Today` bounds move, only fixed dates can be compared up front
        if let (crate::DateBound::Fixed(lo), crate::DateBound::Fixed(hi)) = (min.value, max.value) {
            ordered(path, "min_date", lo, "max_date", hi)?;
        }
    }
    if let Some(pattern) = &c.pattern {
        Regex::new(&pattern.value).map_err(|e| SchemaError::InvalidPattern {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
    }

    match &node.kind {
        NodeKind::Enum { options } if options.is_empty() => {
            return Err(SchemaError::EmptyEnum(path.to_string()));
        }
        NodeKind::Object { fields } => {
            let mut seen = HashSet::new();
            for (name, _) in fields {
                if name.is_empty() {
                    return Err(SchemaError::EmptyFieldName(path.to_string()));
                }
                if !seen.insert(name.as_str()) {
                    return Err(SchemaError::DuplicateField {
                        path: path.to_string(),
                        name: name.clone(),
                    });
                }
            }
        }
        _ => {}
    }

    if let Some(default) = &node.default {
        check_default(path, node, default)?;
    }

    Ok(())
}

fn ordered<T: PartialOrd + std::fmt::Display>(
    path: &FieldPath,
    lo_name: &str,
    lo: T,
    hi_name: &str,
    hi: T,
) -> Result<()> {
    if lo > hi {
        return Err(invalid_bounds(path, format!("{lo_name} {lo} exceeds {hi_name} {hi}")));
    }
    Ok(())
}

fn invalid_bounds(path: &FieldPath, reason: impl Into<String>) -> SchemaError {
    SchemaError::InvalidBounds {
        path: path.to_string(),
        reason: reason.into(),
    }
}

/// Defaults must already have the node's runtime type
fn check_default(path: &FieldPath, node: &SchemaNode, default: &FormValue) -> Result<()> {
    let tag = node.tag();
    let fits = match (&node.kind, default) {
        (_, FormValue::Null) => true,
        (NodeKind::String, FormValue::String(_))
        | (NodeKind::Number, FormValue::Number(_))
        | (NodeKind::Boolean, FormValue::Boolean(_))
        | (NodeKind::Date, FormValue::Date(_))
        | (NodeKind::Object { .. }, FormValue::Object(_))
        | (NodeKind::Array { .. }, FormValue::Array(_)) => true,
        (NodeKind::Enum { options }, FormValue::String(s)) => options.contains(s),
        _ => false,
    };
    if fits {
        Ok(())
    } else {
        Err(SchemaError::InvalidDefault {
            path: path.to_string(),
            expected: tag,
            found: describe_value(default),
        })
    }
}

fn describe_value(value: &FormValue) -> String {
    match value {
        FormValue::String(s) => format!("string '{s}'"),
        other => other.kind_name().to_string(),
    }
}
