//! Validation engine

use crate::coerce::coerce_value;
use crate::reporter::ErrorMap;
use crate::rules::{
    RuleResult, validate_date_range, validate_format, validate_integer, validate_items,
    validate_length, validate_pattern, validate_range, validate_required, validate_step,
};
use crate::{Error, Result};
use chrono::{Local, NaiveDate};
use form_ir::{FieldPath, FormValue, ObjectMap, PathSegment};
use form_schema::{NodeKind, SchemaNode};
use tracing::{debug, trace};

/// Validation configuration
#[derive(Debug, Clone, Default)]
pub struct ValidationConfig {
    /// Maximum errors before stopping (0 = unlimited)
    pub max_errors: usize,
    /// Date used for `Today` bounds; the local date when unset
    pub today: Option<NaiveDate>,
}

impl ValidationConfig {
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}

/// Outcome of validating a whole value tree
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    /// Every constraint and refinement holds; carries the typed tree
    Valid(FormValue),
    /// One message per failing path
    Invalid(ErrorMap),
}

impl ValidationResult {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }

    #[must_use]
    pub fn errors(&self) -> Option<&ErrorMap> {
        match self {
            ValidationResult::Valid(_) => None,
            ValidationResult::Invalid(errors) => Some(errors),
        }
    }

    #[must_use]
    pub fn value(&self) -> Option<&FormValue> {
        match self {
            ValidationResult::Valid(value) => Some(value),
            ValidationResult::Invalid(_) => None,
        }
    }
}

/// Main validation engine
#[derive(Debug, Default)]
pub struct ValidationEngine {
    config: ValidationConfig,
}

impl ValidationEngine {
    /// Create a new validation engine
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ValidationConfig::default(),
        }
    }

    /// Create with specific configuration
    #[must_use]
    pub fn with_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate a complete value tree against `root`.
    ///
    /// Coerces every leaf, checks every constraint and runs refinements.
    /// Members not declared in the schema are dropped from the typed tree.
    #[must_use]
    pub fn validate(&self, root: &SchemaNode, value: &FormValue) -> ValidationResult {
        let mut walk = Walk::new(&self.config);
        let typed = walk.check(root, value, &FieldPath::root());

        debug!(errors = walk.errors.len(), "Validated value tree");

        match typed {
            Some(typed) if walk.errors.is_empty() => ValidationResult::Valid(typed),
            _ => ValidationResult::Invalid(walk.errors),
        }
    }

    /// Validate only the subtree at `path` of the tree `value`.
    ///
    /// Errors are keyed by absolute path. Refinements declared on ancestors
    /// of `path` are not run.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownPath`] when `path` does not address a schema node.
    pub fn validate_at(
        &self,
        root: &SchemaNode,
        path: &FieldPath,
        value: &FormValue,
    ) -> Result<ErrorMap> {
        let node = node_at(root, path).ok_or_else(|| Error::UnknownPath(path.to_string()))?;
        let subtree = value.get(path).unwrap_or(&FormValue::Null);

        let mut walk = Walk::new(&self.config);
        walk.check(node, subtree, path);

        trace!(path = %path, errors = walk.errors.len(), "Validated field");
        Ok(walk.errors)
    }

    /// Check only the item-count constraints of the array at `path`
    ///
    /// # Errors
    ///
    /// [`Error::UnknownPath`] when `path` does not address a schema node.
    pub fn validate_items_at(
        &self,
        root: &SchemaNode,
        path: &FieldPath,
        value: &FormValue,
    ) -> Result<Option<String>> {
        let node = node_at(root, path).ok_or_else(|| Error::UnknownPath(path.to_string()))?;
        let count = value.get(path).and_then(FormValue::as_array).map_or(0, Vec::len);
        Ok(validate_items(count, &node.constraints).message)
    }
}

/// Schema node addressed by `path`; any index selects the element schema
#[must_use]
pub fn node_at<'a>(root: &'a SchemaNode, path: &FieldPath) -> Option<&'a SchemaNode> {
    let mut current = root;
    for segment in path.segments() {
        current = match segment {
            PathSegment::Key(k) => current.field(k)?,
            PathSegment::Index(_) => current.element()?,
        };
    }
    Some(current)
}

struct Walk {
    today: NaiveDate,
    max_errors: usize,
    errors: ErrorMap,
}

impl Walk {
    fn new(config: &ValidationConfig) -> Self {
        Self {
            today: config.today(),
            max_errors: config.max_errors,
            errors: ErrorMap::new(),
        }
    }

    fn report(&mut self, path: FieldPath, message: impl Into<String>) {
        if self.max_errors > 0 && self.errors.len() >= self.max_errors {
            return;
        }
        self.errors.insert(path, message);
    }

    /// Typed value of `node`, or `None` when it or anything below it failed
    fn check(&mut self, node: &SchemaNode, value: &FormValue, path: &FieldPath) -> Option<FormValue> {
        let required = validate_required(value, &node.constraints);
        if !required.is_valid {
            self.report(path.clone(), required.message.unwrap_or_default());
            return None;
        }
        if value.is_null() {
            return Some(FormValue::Null);
        }

        let before = self.errors.len();
        let typed = match &node.kind {
            NodeKind::Object { fields } => self.check_object(node, fields, value, path),
            NodeKind::Array { element } => self.check_array(node, element, value, path),
            _ => self.check_leaf(node, value, path),
        }?;
        if self.errors.len() > before {
            return None;
        }

        // Refinements only see values that passed every other check
        let mut refined = true;
        for refinement in &node.refinements {
            if !refinement.check(&typed) {
                let target = match &refinement.path {
                    Some(relative) => path.join(relative),
                    None => path.clone(),
                };
                self.report(target, refinement.message.clone());
                refined = false;
            }
        }
        refined.then_some(typed)
    }

    fn check_object(
        &mut self,
        node: &SchemaNode,
        fields: &[(String, SchemaNode)],
        value: &FormValue,
        path: &FieldPath,
    ) -> Option<FormValue> {
        let Some(map) = value.as_object() else {
            self.type_error(node, value, path);
            return None;
        };

        let mut typed = ObjectMap::new();
        let mut ok = true;
        for (name, child) in fields {
            let child_value = map.get(name).unwrap_or(&FormValue::Null);
            match self.check(child, child_value, &path.key(name.clone())) {
                Some(v) => {
                    typed.insert(name.clone(), v);
                }
                None => ok = false,
            }
        }
        ok.then_some(FormValue::Object(typed))
    }

    fn check_array(
        &mut self,
        node: &SchemaNode,
        element: &SchemaNode,
        value: &FormValue,
        path: &FieldPath,
    ) -> Option<FormValue> {
        let Some(items) = value.as_array() else {
            self.type_error(node, value, path);
            return None;
        };

        let counted = validate_items(items.len(), &node.constraints);
        if let Some(message) = counted.message {
            self.report(path.clone(), message);
        }

        let mut typed = Vec::with_capacity(items.len());
        let mut ok = counted.is_valid;
        for (i, item) in items.iter().enumerate() {
            match self.check(element, item, &path.index(i)) {
                Some(v) => typed.push(v),
                None => ok = false,
            }
        }
        ok.then_some(FormValue::Array(typed))
    }

    fn check_leaf(&mut self, node: &SchemaNode, value: &FormValue, path: &FieldPath) -> Option<FormValue> {
        let typed = match coerce_value(node, value) {
            Ok(typed) => typed,
            Err(message) => {
                self.report(path.clone(), message);
                return None;
            }
        };

        let c = &node.constraints;
        let result = match &typed {
            FormValue::String(s) => validate_length(s, c)
                .and_then(|| c.pattern.as_ref().map_or_else(RuleResult::valid, |p| validate_pattern(s, p)))
                .and_then(|| c.format.as_ref().map_or_else(RuleResult::valid, |f| validate_format(s, f))),
            FormValue::Number(n) => validate_integer(*n, c)
                .and_then(|| validate_range(*n, c))
                .and_then(|| validate_step(*n, c)),
            FormValue::Date(d) => validate_date_range(*d, c, self.today),
            _ => RuleResult::valid(),
        };

        match result.message {
            Some(message) => {
                self.report(path.clone(), message);
                None
            }
            None => Some(typed),
        }
    }

    fn type_error(&mut self, node: &SchemaNode, value: &FormValue, path: &FieldPath) {
        let message = node.constraints.invalid_type_message.clone().unwrap_or_else(|| {
            format!("Expected {}, received {}", node.tag(), value.kind_name())
        });
        self.report(path.clone(), message);
    }
}
