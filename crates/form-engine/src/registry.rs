//! Field renderer registry
//!
//! One [`WidgetFactory`] per [`TypeTag`]. Factories are pure: everything they
//! may read is handed to them in a [`WidgetContext`].

use crate::check::CheckTracker;
use crate::event::ChangeBinding;
use crate::widget::{Widget, WidgetKind};
use crate::widgets::{
    ArrayFactory, CheckboxFactory, DateFactory, FieldsetFactory, NumberFactory, SelectFactory,
    TextFactory,
};
use crate::UnsupportedFieldTypeError;
use chrono::NaiveDate;
use form_ir::{FieldPath, FormValue};
use form_schema::{FieldDescriptor, TypeTag};
use form_validation::ErrorMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

static NULL: FormValue = FormValue::Null;

/// Builds the widget for one field
pub trait WidgetFactory: Send + Sync {
    fn render(&self, ctx: &WidgetContext<'_>) -> Widget;
}

impl<F> WidgetFactory for F
where
    F: Fn(&WidgetContext<'_>) -> Widget + Send + Sync,
{
    fn render(&self, ctx: &WidgetContext<'_>) -> Widget {
        self(ctx)
    }
}

/// Session state visible to factories
#[derive(Debug, Clone, Copy)]
pub struct FormView<'a> {
    pub values: &'a FormValue,
    pub errors: &'a ErrorMap,
    pub checks: &'a CheckTracker,
    /// Date that `Today` bounds resolve to
    pub today: NaiveDate,
}

/// Input of a single [`WidgetFactory::render`] call
#[derive(Debug, Clone)]
pub struct WidgetContext<'a> {
    registry: &'a WidgetRegistry,
    view: FormView<'a>,
    descriptor: &'a FieldDescriptor,
    path: FieldPath,
}

impl<'a> WidgetContext<'a> {
    #[must_use]
    pub fn new(
        registry: &'a WidgetRegistry,
        view: FormView<'a>,
        descriptor: &'a FieldDescriptor,
        path: FieldPath,
    ) -> Self {
        Self {
            registry,
            view,
            descriptor,
            path,
        }
    }

    #[must_use]
    pub fn descriptor(&self) -> &'a FieldDescriptor {
        self.descriptor
    }

    /// Concrete path of the field (array indices included)
    #[must_use]
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Current value; `Null` when the path is absent from the tree
    #[must_use]
    pub fn value(&self) -> &'a FormValue {
        self.view.values.get(&self.path).unwrap_or(&NULL)
    }

    #[must_use]
    pub fn error(&self) -> Option<&'a str> {
        self.view.errors.get(&self.path)
    }

    #[must_use]
    pub fn is_validating(&self) -> bool {
        self.view.checks.is_pending(&self.path)
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.view.today
    }

    #[must_use]
    pub fn binding(&self) -> ChangeBinding {
        ChangeBinding::Set(self.path.clone())
    }

    /// Widget of `kind` pre-filled with the field's id, label, value and state
    #[must_use]
    pub fn base(&self, kind: WidgetKind) -> Widget {
        let mut widget = Widget::new(kind, self.path.to_string());
        widget.label.clone_from(&self.descriptor.label);
        widget.help_text.clone_from(&self.descriptor.help_text);
        widget.required = self.descriptor.required;
        widget.error = self.error().map(str::to_string);
        widget.validating = self.is_validating();
        if !matches!(self.descriptor.tag, TypeTag::Object | TypeTag::Array) {
            widget.value = self.value().clone();
            widget.binding = Some(self.binding());
        }
        widget
    }

    /// Render a nested field through the registry
    #[must_use]
    pub fn render_child(&self, descriptor: &'a FieldDescriptor, path: FieldPath) -> Widget {
        let ctx = WidgetContext::new(self.registry, self.view, descriptor, path);
        self.registry.render(&ctx)
    }
}

/// Maps type tags to widget factories
#[derive(Clone, Default)]
pub struct WidgetRegistry {
    factories: HashMap<TypeTag, Arc<dyn WidgetFactory>>,
}

impl WidgetRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a built-in factory for every type tag
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(TypeTag::String, TextFactory);
        registry.register(TypeTag::Number, NumberFactory);
        registry.register(TypeTag::Boolean, CheckboxFactory);
        registry.register(TypeTag::Date, DateFactory);
        registry.register(TypeTag::Enum, SelectFactory);
        registry.register(TypeTag::Object, FieldsetFactory);
        registry.register(TypeTag::Array, ArrayFactory);
        registry
    }

    /// Register the factory for `tag`, returning the one it replaces
    pub fn register(
        &mut self,
        tag: TypeTag,
        factory: impl WidgetFactory + 'static,
    ) -> Option<Arc<dyn WidgetFactory>> {
        self.factories.insert(tag, Arc::new(factory))
    }

    pub fn unregister(&mut self, tag: TypeTag) -> Option<Arc<dyn WidgetFactory>> {
        self.factories.remove(&tag)
    }

    /// Factory for `tag`
    ///
    /// # Errors
    ///
    /// [`UnsupportedFieldTypeError`] when nothing is registered for `tag`.
    pub fn lookup(&self, tag: TypeTag) -> Result<&dyn WidgetFactory, UnsupportedFieldTypeError> {
        self.factories
            .get(&tag)
            .map(Arc::as_ref)
            .ok_or(UnsupportedFieldTypeError { tag })
    }

    #[must_use]
    pub fn contains(&self, tag: TypeTag) -> bool {
        self.factories.contains_key(&tag)
    }

    /// Registered tags in tag order
    #[must_use]
    pub fn tags(&self) -> Vec<TypeTag> {
        let mut tags: Vec<TypeTag> = self.factories.keys().copied().collect();
        tags.sort();
        tags
    }

    /// Render the field in `ctx`; an unregistered tag yields an
    /// [`WidgetKind::Unsupported`] placeholder
    #[must_use]
    pub fn render(&self, ctx: &WidgetContext<'_>) -> Widget {
        match self.lookup(ctx.descriptor().tag) {
            Ok(factory) => factory.render(ctx),
            Err(err) => {
                warn!(path = %ctx.path(), "{}", err);
                let mut widget = Widget::new(WidgetKind::Unsupported, ctx.path().to_string());
                widget.label.clone_from(&ctx.descriptor().label);
                widget.error = Some(err.to_string());
                widget
            }
        }
    }
}

impl fmt::Debug for WidgetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_schema::{SchemaNode, SchemaProvider};

    struct Marker(&'static str);

    impl WidgetFactory for Marker {
        fn render(&self, ctx: &WidgetContext<'_>) -> Widget {
            ctx.base(WidgetKind::TextInput).attr("data-factory", self.0)
        }
    }

    fn provider() -> SchemaProvider {
        SchemaProvider::new(SchemaNode::object([
            ("name", SchemaNode::string()),
            ("born", SchemaNode::date()),
        ]))
        .unwrap()
    }

    #[test]
    fn test_lookup_unregistered_tag() {
        let registry = WidgetRegistry::new();
        let err = registry.lookup(TypeTag::Date).err().unwrap();
        assert_eq!(err, UnsupportedFieldTypeError { tag: TypeTag::Date });
    }

    #[test]
    fn test_defaults_cover_every_tag() {
        let registry = WidgetRegistry::with_defaults();
        for tag in [
            TypeTag::String,
            TypeTag::Number,
            TypeTag::Boolean,
            TypeTag::Date,
            TypeTag::Enum,
            TypeTag::Object,
            TypeTag::Array,
        ] {
            assert!(registry.lookup(tag).is_ok(), "missing {tag}");
        }
    }

    #[test]
    fn test_register_replaces_previous_factory() {
        let mut registry = WidgetRegistry::new();
        assert!(registry.register(TypeTag::String, Marker("first")).is_none());
        assert!(registry.register(TypeTag::String, Marker("second")).is_some());
        assert_eq!(registry.tags(), vec![TypeTag::String]);

        let provider = provider();
        let values = provider.default_values();
        let errors = ErrorMap::new();
        let checks = CheckTracker::new();
        let view = FormView {
            values: &values,
            errors: &errors,
            checks: &checks,
            today: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        };
        let descriptor = &provider.descriptors()[0];
        let ctx = WidgetContext::new(&registry, view, descriptor, descriptor.path.clone());

        let widget = registry.render(&ctx);
        assert_eq!(widget.attribute("data-factory"), Some("second"));
    }

    #[test]
    fn test_closure_factory_and_unsupported_fallback() {
        let mut registry = WidgetRegistry::new();
        registry.register(TypeTag::String, |ctx: &WidgetContext<'_>| {
            ctx.base(WidgetKind::TextArea)
        });

        let provider = provider();
        let values = provider.default_values();
        let errors = ErrorMap::new();
        let checks = CheckTracker::new();
        let view = FormView {
            values: &values,
            errors: &errors,
            checks: &checks,
            today: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        };

        let name = &provider.descriptors()[0];
        let ctx = WidgetContext::new(&registry, view, name, name.path.clone());
        assert_eq!(registry.render(&ctx).kind, WidgetKind::TextArea);

        let born = &provider.descriptors()[1];
        let ctx = WidgetContext::new(&registry, view, born, born.path.clone());
        let widget = registry.render(&ctx);
        assert_eq!(widget.kind, WidgetKind::Unsupported);
        assert_eq!(
            widget.error.as_deref(),
            Some("No widget registered for field type 'date'")
        );
    }
}
