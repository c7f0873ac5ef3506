//! # form-schema
//!
//! Schema model, loader, and field descriptor provider for schema-driven forms.
//!
//! A [`Schema`] is an immutable tree of [`SchemaNode`]s built either through
//! the fluent builder API or loaded from JSON/YAML by [`SchemaLoader`]. A
//! [`SchemaProvider`] checks the tree once and projects it into ordered
//! [`FieldDescriptor`]s for renderers.

pub mod check;
pub mod loader;
pub mod meta;
pub mod model;
pub mod provider;
pub mod refs;
pub mod registry;

pub use loader::{MAX_NODES, SchemaFormat, SchemaLoader};
pub use meta::{FieldMeta, humanize};
pub use model::{
    Bound, Constraints, DateBound, NodeKind, Refinement, Schema, SchemaNode, StringFormat,
    TypeTag,
};
pub use provider::{FieldDescriptor, MAX_DEPTH, SchemaProvider};
pub use registry::SchemaRegistry;

use thiserror::Error;

/// Errors raised while loading or checking a schema.
///
/// All of these are structural: they are reported when a provider or loader
/// is constructed, never while a form is being filled in.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Schema not found: {0}")]
    NotFound(String),

    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    #[error("Root of a form schema must be an object, found {0}")]
    RootNotObject(TypeTag),

    #[error("Constraint '{constraint}' is not allowed on {tag} field '{path}'")]
    IllegalConstraint {
        path: String,
        tag: TypeTag,
        constraint: &'static str,
    },

    #[error("Invalid bounds on '{path}': {reason}")]
    InvalidBounds { path: String, reason: String },

    #[error("Invalid pattern on '{path}': {reason}")]
    InvalidPattern { path: String, reason: String },

    #[error("Enum field '{0}' has no options")]
    EmptyEnum(String),

    #[error("Duplicate field '{name}' in object '{path}'")]
    DuplicateField { path: String, name: String },

    #[error("Empty field name in object '{0}'")]
    EmptyFieldName(String),

    #[error("Default for '{path}' does not match its type: expected {expected}, found {found}")]
    InvalidDefault {
        path: String,
        expected: TypeTag,
        found: String,
    },

    #[error("Schema nesting exceeds {max} levels at '{path}'")]
    TooDeep { path: String, max: usize },

    #[error("Schema expands to more than {max} nodes once references are inlined")]
    TooLarge { max: usize },

    #[error("Self-referential schema definition: {0}")]
    SelfReferential(String),

    #[error("Unknown schema reference '{0}'")]
    UnknownReference(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
