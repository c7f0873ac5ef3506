//! Error mapping and report formatting

use form_ir::FieldPath;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Field path → first human-readable message for that path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMap {
    errors: BTreeMap<FieldPath, String>,
}

impl ErrorMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message; an existing message for the path is kept.
    ///
    /// Returns whether the message was recorded.
    pub fn insert(&mut self, path: FieldPath, message: impl Into<String>) -> bool {
        if self.errors.contains_key(&path) {
            return false;
        }
        self.errors.insert(path, message.into());
        true
    }

    /// Record a message, replacing any existing one
    pub fn set(&mut self, path: FieldPath, message: impl Into<String>) {
        self.errors.insert(path, message.into());
    }

    #[must_use]
    pub fn get(&self, path: &FieldPath) -> Option<&str> {
        self.errors.get(path).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, path: &FieldPath) -> bool {
        self.errors.contains_key(path)
    }

    pub fn remove(&mut self, path: &FieldPath) -> Option<String> {
        self.errors.remove(path)
    }

    /// Drop every error at or below `prefix`
    pub fn remove_under(&mut self, prefix: &FieldPath) {
        self.errors.retain(|path, _| !path.starts_with(prefix));
    }

    /// Replace every error at or below `prefix` with those of `fresh`
    pub fn replace_under(&mut self, prefix: &FieldPath, fresh: ErrorMap) {
        self.remove_under(prefix);
        for (path, message) in fresh.errors {
            if path.starts_with(prefix) {
                self.errors.insert(path, message);
            }
        }
    }

    /// Re-key errors after element `removed` of `array` was deleted
    pub fn renumber_after_remove(&mut self, array: &FieldPath, removed: usize) {
        let errors = std::mem::take(&mut self.errors);
        self.errors = errors
            .into_iter()
            .filter_map(|(path, message)| {
                path.shift_after_remove(array, removed)
                    .map(|path| (path, message))
            })
            .collect();
    }

    /// Whether any error lies at or below `prefix`
    #[must_use]
    pub fn has_errors_under(&self, prefix: &FieldPath) -> bool {
        self.errors.keys().any(|path| path.starts_with(prefix))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    /// Errors in path order
    pub fn iter(&self) -> impl Iterator<Item = (&FieldPath, &str)> {
        self.errors.iter().map(|(path, message)| (path, message.as_str()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.errors.keys()
    }
}

impl fmt::Display for ErrorMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (path, message)) in self.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{path}: {message}")?;
        }
        Ok(())
    }
}

impl Serialize for ErrorMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.errors.len()))?;
        for (path, message) in &self.errors {
            map.serialize_entry(&path.to_string(), message)?;
        }
        map.end()
    }
}

impl FromIterator<(FieldPath, String)> for ErrorMap {
    fn from_iter<I: IntoIterator<Item = (FieldPath, String)>>(iter: I) -> Self {
        let mut map = ErrorMap::new();
        for (path, message) in iter {
            map.insert(path, message);
        }
        map
    }
}

/// Output format of a validation report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// One `path: message` line per error
    #[default]
    Text,
    /// Aligned columns with a summary line
    Table,
}

/// Formats error maps for people
#[derive(Debug, Default)]
pub struct ValidationReporter {
    format: ReportFormat,
}

impl ValidationReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_format(format: ReportFormat) -> Self {
        Self { format }
    }

    #[must_use]
    pub fn report(&self, errors: &ErrorMap) -> String {
        match self.format {
            ReportFormat::Text => errors.to_string(),
            ReportFormat::Table => Self::table(errors),
        }
    }

    fn table(errors: &ErrorMap) -> String {
        let rows: Vec<(String, &str)> = errors
            .iter()
            .map(|(path, message)| (path.to_string(), message))
            .collect();
        let width = rows.iter().map(|(p, _)| p.len()).max().unwrap_or(0);

        let mut out = String::new();
        for (path, message) in &rows {
            out.push_str(&format!("  {path:<width$}  {message}\n"));
        }
        let noun = if rows.len() == 1 { "error" } else { "errors" };
        out.push_str(&format!("{} {noun}", rows.len()));
        out
    }
}
