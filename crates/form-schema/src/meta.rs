//! Display metadata for schema fields

use serde::{Deserialize, Serialize};

/// Separator of the legacy `"Label // help text"` description convention
pub const DESCRIPTION_SEPARATOR: &str = "//";

/// Label and help text shown next to a field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub label: Option<String>,
    pub help_text: Option<String>,
}

impl FieldMeta {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            help_text: None,
        }
    }

    /// Split a `"Label // help text"` description.
    ///
    /// Text before the first separator is the label, text after it the help
    /// text. A description without separator is a bare label. Blank parts are
    /// dropped.
    #[must_use]
    pub fn from_description(description: &str) -> Self {
        let (label, help) = match description.split_once(DESCRIPTION_SEPARATOR) {
            Some((label, help)) => (label, Some(help)),
            None => (description, None),
        };
        Self {
            label: non_blank(label),
            help_text: help.and_then(non_blank),
        }
    }

    /// Fill unset parts from `other`
    #[must_use]
    pub fn or(self, other: FieldMeta) -> Self {
        Self {
            label: self.label.or(other.label),
            help_text: self.help_text.or(other.help_text),
        }
    }

    /// Label to display for a field named `key`
    #[must_use]
    pub fn label_or(&self, key: &str) -> String {
        self.label.clone().unwrap_or_else(|| humanize(key))
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Turn a field key into a label: `fullName` / `full_name` → `Full Name`
#[must_use]
pub fn humanize(key: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in key.chars() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
