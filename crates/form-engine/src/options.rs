//! Form options, loadable from YAML or JSON

use crate::{EngineError, Result};
use chrono::NaiveDate;
use form_ir::FormValue;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Per-form settings supplied by the embedding application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormOptions {
    /// Append the built-in submit button
    pub with_submit: bool,
    pub submit_label: String,
    /// Initial values laid over the schema defaults
    pub default_values: Option<FormValue>,
    /// Date `Today` bounds resolve to; the local date when unset
    pub today: Option<NaiveDate>,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            with_submit: true,
            submit_label: "Submit".to_string(),
            default_values: None,
            today: None,
        }
    }
}

impl FormOptions {
    /// # Errors
    ///
    /// [`EngineError::InvalidOptions`] when the document does not parse.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| EngineError::InvalidOptions(format!("YAML parse error: {e}")))
    }

    /// # Errors
    ///
    /// [`EngineError::InvalidOptions`] when the document does not parse.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidOptions(format!("JSON parse error: {e}")))
    }

    /// Load from a file; `.json` is read as JSON, anything else as YAML
    ///
    /// # Errors
    ///
    /// [`EngineError::Io`] when the file cannot be read, otherwise as
    /// [`FormOptions::from_yaml_str`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        debug!("Loading form options from {}", path.display());
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// The date `Today` bounds resolve to
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}
