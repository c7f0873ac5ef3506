//! Form session: value tree, errors, touched markers and submission
//!
//! ```text
//! Pristine ──edit──▶ Editing ──submit──▶ Submitting ──valid──▶ SubmitAccepted
//!    ▲                  ▲                     │                     │
//!    │                  └──────invalid────────┘                     │
//!    └─────────────────────────────reset────────────────────────────┘
//! ```

use crate::check::{CheckTicket, CheckTracker};
use crate::event::{ChangeBinding, FormEvent};
use crate::options::FormOptions;
use crate::registry::{FormView, WidgetContext, WidgetRegistry};
use crate::widget::{Widget, WidgetKind};
use crate::{EngineError, Result};
use form_ir::{FieldPath, FormValue, LeafCollector, walk};
use form_schema::{NodeKind, SchemaNode, SchemaProvider};
use form_validation::{
    ErrorMap, RawInput, ValidationConfig, ValidationEngine, ValidationResult, coerce_input,
};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Message put on fields whose asynchronous check blocked a submission
pub const PENDING_MESSAGE: &str = "Validation in progress";

/// Lifecycle of a form session.
///
/// A rejected submission is not a resting state: the engine records
/// [`SubmitOutcome::Rejected`] in [`FormEngine::last_outcome`] and returns to
/// [`FormState::Editing`]. No state is terminal. [`FormState::SubmitAccepted`]
/// refuses edits with [`EngineError::Closed`] so the callback sees the values
/// it was given, and [`FormEngine::reset`] leaves it for
/// [`FormState::Pristine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    /// Nothing edited since construction or reset
    Pristine,
    Editing,
    /// Whole-tree validation is running
    Submitting,
    /// The completion callback ran; the form no longer accepts edits
    SubmitAccepted,
}

impl FormState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FormState::Pristine => "pristine",
            FormState::Editing => "editing",
            FormState::Submitting => "submitting",
            FormState::SubmitAccepted => "submitted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    /// The error map holds every failing path
    Rejected,
}

/// Display status of one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldStatus {
    Untouched,
    Valid,
    Invalid,
    /// An asynchronous check is in flight
    Validating,
}

/// Receives the typed value tree of an accepted submission
pub trait SubmitHandler {
    fn on_submit(&mut self, values: FormValue);
}

impl<F> SubmitHandler for F
where
    F: FnMut(FormValue),
{
    fn on_submit(&mut self, values: FormValue) {
        self(values);
    }
}

/// One form session over a shared schema
pub struct FormEngine {
    provider: Arc<SchemaProvider>,
    options: FormOptions,
    validator: ValidationEngine,
    on_submit: Box<dyn SubmitHandler>,
    values: FormValue,
    errors: ErrorMap,
    touched: BTreeSet<FieldPath>,
    checks: CheckTracker,
    state: FormState,
    last_outcome: Option<SubmitOutcome>,
}

impl FormEngine {
    /// Start a session; values are the schema defaults overlaid with
    /// `options.default_values`
    pub fn new(
        provider: Arc<SchemaProvider>,
        options: FormOptions,
        on_submit: impl SubmitHandler + 'static,
    ) -> Self {
        let validator = ValidationEngine::with_config(ValidationConfig {
            today: options.today,
            ..ValidationConfig::default()
        });
        let values = initial_values(&provider, &options);

        debug!(
            fields = provider.descriptors().len(),
            with_submit = options.with_submit,
            "Form engine created"
        );

        Self {
            provider,
            options,
            validator,
            on_submit: Box::new(on_submit),
            values,
            errors: ErrorMap::new(),
            touched: BTreeSet::new(),
            checks: CheckTracker::new(),
            state: FormState::Pristine,
            last_outcome: None,
        }
    }

    /// Store user input at `path` and revalidate that field only.
    ///
    /// Input that does not parse as the declared type is stored raw and
    /// reported. Checks in flight at or below `path` are superseded.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownField`] for a path outside the schema,
    /// [`EngineError::Path`] for an array index that does not exist and
    /// [`EngineError::Closed`] after an accepted submission.
    pub fn set_field(&mut self, path: &FieldPath, input: RawInput) -> Result<()> {
        self.ensure_open()?;
        let value = coerce_input(self.field_node(path)?, input);
        self.values.set(path, value)?;

        self.checks.supersede(path);
        self.touched.insert(path.clone());
        self.revalidate(path)?;
        self.transition(FormState::Editing);

        trace!(path = %path, error = self.errors.get(path), "Field changed");
        Ok(())
    }

    /// Append the element default to the array at `path`; returns its index
    ///
    /// # Errors
    ///
    /// [`EngineError::NotAnArray`] when `path` is not an array field.
    pub fn append_item(&mut self, path: &FieldPath) -> Result<usize> {
        self.ensure_open()?;
        let item = SchemaProvider::default_for(self.array_element(path)?);

        if self.values.get(path).is_none_or(FormValue::is_null) {
            self.values.set(path, FormValue::Array(Vec::new()))?;
        }
        let items = self
            .values
            .get_mut(path)
            .and_then(FormValue::as_array_mut)
            .ok_or_else(|| EngineError::NotAnArray(path.to_string()))?;
        items.push(item);
        let index = items.len() - 1;

        self.touched.insert(path.clone());
        self.revalidate_items(path)?;
        self.transition(FormState::Editing);

        debug!(path = %path, index, "Appended array element");
        Ok(index)
    }

    /// Remove element `index` of the array at `path` and return it.
    ///
    /// Errors and touched markers of later elements move down one index;
    /// those of the removed element are dropped. Checks in flight for the
    /// removed or a later element are superseded.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotAnArray`] or [`EngineError::IndexOutOfRange`].
    pub fn remove_item(&mut self, path: &FieldPath, index: usize) -> Result<FormValue> {
        self.ensure_open()?;
        self.array_element(path)?;

        let items = self
            .values
            .get_mut(path)
            .and_then(FormValue::as_array_mut)
            .ok_or_else(|| EngineError::NotAnArray(path.to_string()))?;
        if index >= items.len() {
            return Err(EngineError::IndexOutOfRange {
                path: path.to_string(),
                index,
                len: items.len(),
            });
        }
        let removed = items.remove(index);

        self.errors.renumber_after_remove(path, index);
        self.touched = std::mem::take(&mut self.touched)
            .into_iter()
            .filter_map(|touched| touched.shift_after_remove(path, index))
            .collect();
        self.checks.renumber_after_remove(path, index);
        self.release_stale_pending(path)?;
        self.revalidate_items(path)?;
        self.transition(FormState::Editing);

        debug!(path = %path, index, "Removed array element");
        Ok(removed)
    }

    /// Validate the whole tree and, when it is valid, hand the typed tree to
    /// the completion callback.
    ///
    /// A pending asynchronous check rejects the submission; its path reports
    /// [`PENDING_MESSAGE`] next to the errors of every other invalid field.
    ///
    /// # Errors
    ///
    /// [`EngineError::Closed`] when the form was already accepted.
    pub fn submit(&mut self) -> Result<SubmitOutcome> {
        self.ensure_open()?;
        self.transition(FormState::Submitting);

        let mut leaves = LeafCollector::default();
        walk(&self.values, &mut leaves);
        self.touched.extend(leaves.leaves);

        let result = self.validator.validate(self.provider.root(), &self.values);
        let blocked = self.checks.has_pending() || self.checks.failures().next().is_some();
        match result {
            ValidationResult::Valid(typed) if !blocked => {
                self.errors.clear();
                self.transition(FormState::SubmitAccepted);
                self.last_outcome = Some(SubmitOutcome::Accepted);
                info!("Submission accepted");
                self.on_submit.on_submit(typed);
                Ok(SubmitOutcome::Accepted)
            }
            result => {
                let mut errors = match result {
                    ValidationResult::Invalid(errors) => errors,
                    ValidationResult::Valid(_) => ErrorMap::new(),
                };
                for (path, message) in self.checks.failures() {
                    errors.insert(path.clone(), message);
                }
                for path in self.checks.pending_paths() {
                    errors.set(path.clone(), PENDING_MESSAGE);
                }
                self.errors = errors;
                Ok(self.reject())
            }
        }
    }

    /// Start an asynchronous check of `path`; the field reports
    /// [`FieldStatus::Validating`] until the check completes or is superseded
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownField`] for a path outside the schema.
    pub fn begin_check(&mut self, path: &FieldPath) -> Result<CheckTicket> {
        self.ensure_open()?;
        self.field_node(path)?;
        let ticket = self.checks.begin(path.clone());
        trace!(path = %path, generation = ticket.generation(), "Check started");
        Ok(ticket)
    }

    /// Apply the result of a check. Returns `false`, changing nothing, when
    /// a newer check or an edit superseded `ticket`.
    pub fn complete_check(
        &mut self,
        ticket: &CheckTicket,
        outcome: std::result::Result<(), String>,
    ) -> bool {
        let path = ticket.path().clone();
        let previous = self.checks.failure(&path).map(str::to_string);
        let message = outcome.as_ref().err().cloned();

        if !self.checks.complete(ticket, outcome) {
            debug!(path = %path, generation = ticket.generation(), "Ignoring superseded check");
            return false;
        }

        match message {
            Some(message) => self.errors.set(path, message),
            None => {
                let stale = self
                    .errors
                    .get(&path)
                    .is_some_and(|m| m == PENDING_MESSAGE || previous.as_deref() == Some(m));
                if stale {
                    self.errors.remove(&path);
                }
            }
        }
        true
    }

    /// Apply a widget event
    ///
    /// # Errors
    ///
    /// As the operation the event maps to.
    pub fn handle(&mut self, event: FormEvent) -> Result<()> {
        match event {
            FormEvent::Change { path, input } => self.set_field(&path, input),
            FormEvent::Append(path) => self.append_item(&path).map(|_| ()),
            FormEvent::Remove { array, index } => self.remove_item(&array, index).map(|_| ()),
            FormEvent::Submit => self.submit().map(|_| ()),
        }
    }

    /// Render the widget subtree of one field
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownField`] for a path outside the schema.
    pub fn render_field(&self, registry: &WidgetRegistry, path: &FieldPath) -> Result<Widget> {
        let descriptor = self
            .provider
            .descriptor(path)
            .ok_or_else(|| EngineError::UnknownField(path.to_string()))?;
        let ctx = WidgetContext::new(registry, self.view(), descriptor, path.clone());
        Ok(registry.render(&ctx))
    }

    /// Render the whole form
    #[must_use]
    pub fn render(&self, registry: &WidgetRegistry) -> Widget {
        let view = self.view();
        let mut form = Widget::new(WidgetKind::Form, "").attr("data-state", self.state.as_str());
        if let Some(title) = &self.provider.schema().title {
            form.label.clone_from(title);
        }

        for descriptor in self.provider.descriptors() {
            let ctx = WidgetContext::new(registry, view, descriptor, descriptor.path.clone());
            form.children.push(registry.render(&ctx));
        }
        if self.options.with_submit {
            form.children.push(Widget::button(
                self.options.submit_label.clone(),
                ChangeBinding::Submit,
            ));
        }
        form
    }

    /// Discard all input and return to [`FormState::Pristine`]
    pub fn reset(&mut self) {
        self.values = initial_values(&self.provider, &self.options);
        self.errors.clear();
        self.touched.clear();
        self.checks.clear();
        self.last_outcome = None;
        self.transition(FormState::Pristine);
    }

    #[must_use]
    pub fn state(&self) -> FormState {
        self.state
    }

    #[must_use]
    pub fn last_outcome(&self) -> Option<SubmitOutcome> {
        self.last_outcome
    }

    #[must_use]
    pub fn values(&self) -> &FormValue {
        &self.values
    }

    #[must_use]
    pub fn value(&self, path: &FieldPath) -> Option<&FormValue> {
        self.values.get(path)
    }

    #[must_use]
    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    #[must_use]
    pub fn error(&self, path: &FieldPath) -> Option<&str> {
        self.errors.get(path)
    }

    #[must_use]
    pub fn is_touched(&self, path: &FieldPath) -> bool {
        self.touched.contains(path)
    }

    #[must_use]
    pub fn field_status(&self, path: &FieldPath) -> FieldStatus {
        if self.checks.is_pending(path) {
            FieldStatus::Validating
        } else if self.errors.contains(path) {
            FieldStatus::Invalid
        } else if self.touched.contains(path) {
            FieldStatus::Valid
        } else {
            FieldStatus::Untouched
        }
    }

    #[must_use]
    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    #[must_use]
    pub fn provider(&self) -> &SchemaProvider {
        &self.provider
    }

    fn view(&self) -> FormView<'_> {
        FormView {
            values: &self.values,
            errors: &self.errors,
            checks: &self.checks,
            today: self.options.today(),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == FormState::SubmitAccepted {
            return Err(EngineError::Closed);
        }
        Ok(())
    }

    /// Schema node of a field; the root is not a field
    fn field_node(&self, path: &FieldPath) -> Result<&SchemaNode> {
        if path.is_empty() {
            return Err(EngineError::UnknownField(String::new()));
        }
        self.provider
            .node_at(path)
            .ok_or_else(|| EngineError::UnknownField(path.to_string()))
    }

    fn array_element(&self, path: &FieldPath) -> Result<&SchemaNode> {
        match &self.field_node(path)?.kind {
            NodeKind::Array { element } => Ok(element),
            _ => Err(EngineError::NotAnArray(path.to_string())),
        }
    }

    fn revalidate(&mut self, path: &FieldPath) -> Result<()> {
        let fresh = self
            .validator
            .validate_at(self.provider.root(), path, &self.values)?;
        self.errors.replace_under(path, fresh);
        Ok(())
    }

    /// Revalidate fields under `prefix` still showing [`PENDING_MESSAGE`]
    /// for a check that no longer runs
    fn release_stale_pending(&mut self, prefix: &FieldPath) -> Result<()> {
        let stale: Vec<FieldPath> = self
            .errors
            .iter()
            .filter(|(path, message)| {
                path.starts_with(prefix)
                    && *message == PENDING_MESSAGE
                    && !self.checks.is_pending(path)
            })
            .map(|(path, _)| path.clone())
            .collect();
        for path in &stale {
            self.errors.remove(path);
            self.revalidate(path)?;
        }
        Ok(())
    }

    fn revalidate_items(&mut self, path: &FieldPath) -> Result<()> {
        match self
            .validator
            .validate_items_at(self.provider.root(), path, &self.values)?
        {
            Some(message) => self.errors.set(path.clone(), message),
            None => {
                self.errors.remove(path);
            }
        }
        Ok(())
    }

    fn reject(&mut self) -> SubmitOutcome {
        info!(errors = self.errors.len(), "Submission rejected");
        self.last_outcome = Some(SubmitOutcome::Rejected);
        self.transition(FormState::Editing);
        SubmitOutcome::Rejected
    }

    fn transition(&mut self, next: FormState) {
        if self.state != next {
            debug!(from = self.state.as_str(), to = next.as_str(), "Form state changed");
            self.state = next;
        }
    }
}

impl fmt::Debug for FormEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormEngine")
            .field("state", &self.state)
            .field("values", &self.values)
            .field("errors", &self.errors)
            .field("touched", &self.touched)
            .field("checks", &self.checks)
            .finish_non_exhaustive()
    }
}

fn initial_values(provider: &SchemaProvider, options: &FormOptions) -> FormValue {
    let mut values = provider.default_values();
    if let Some(defaults) = &options.default_values {
        values.merge(defaults);
    }
    values
}
