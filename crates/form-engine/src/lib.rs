#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # form-engine
//!
//! Widget dispatch and form session state for schema-driven forms.
//!
//! A [`FormEngine`] owns one value tree, its error map and touched markers.
//! It renders through a [`WidgetRegistry`], which maps each field type tag to
//! exactly one [`WidgetFactory`].
//!
//! ```
//! use std::sync::Arc;
//! use form_engine::{FormEngine, FormOptions, WidgetRegistry};
//! use form_ir::{FieldPath, FormValue};
//! use form_schema::{SchemaNode, SchemaProvider};
//!
//! let provider = SchemaProvider::new(SchemaNode::object([
//!     ("name", SchemaNode::string().min_length(2)),
//! ]))
//! .unwrap();
//!
//! let mut engine = FormEngine::new(Arc::new(provider), FormOptions::default(), |_: FormValue| {});
//! engine.set_field(&FieldPath::parse("name").unwrap(), "Al".into()).unwrap();
//!
//! let form = engine.render(&WidgetRegistry::with_defaults());
//! assert!(form.to_markup().contains(r#"value="Al""#));
//! ```

pub mod check;
pub mod engine;
pub mod event;
pub mod options;
pub mod registry;
pub mod widget;
pub mod widgets;

pub use check::{CheckTicket, CheckTracker};
pub use engine::{FieldStatus, FormEngine, FormState, SubmitHandler, SubmitOutcome};
pub use event::{ChangeBinding, FormEvent};
pub use options::FormOptions;
pub use registry::{WidgetContext, WidgetFactory, WidgetRegistry};
pub use widget::{Widget, WidgetKind};

use form_schema::TypeTag;
use thiserror::Error;

/// No factory is registered for a field's type tag
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("No widget registered for field type '{tag}'")]
pub struct UnsupportedFieldTypeError {
    pub tag: TypeTag,
}

/// Errors that can occur while driving a form session
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Field '{0}' is not an array")]
    NotAnArray(String),

    #[error("Index {index} out of range for '{path}' (len {len})")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("Form was already submitted; reset it to edit again")]
    Closed,

    #[error("Invalid form options: {0}")]
    InvalidOptions(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Path(#[from] form_ir::Error),

    #[error(transparent)]
    Validation(#[from] form_validation::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
