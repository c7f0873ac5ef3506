#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # form-validation
//!
//! Input coercion and constraint validation for form value trees.
//!
//! Field-level problems never surface as `Err`: they are collected into an
//! [`ErrorMap`] keyed by [`form_ir::FieldPath`], one message per path.
//!
//! ## Example Usage
//!
//! ```rust
//! use form_ir::FormValue;
//! use form_schema::{SchemaNode, SchemaProvider};
//! use form_validation::{ValidationEngine, ValidationResult};
//!
//! let provider = SchemaProvider::new(SchemaNode::object([
//!     ("name", SchemaNode::string().min_length(2)),
//!     ("age", SchemaNode::number()),
//! ]))
//! .unwrap();
//!
//! let engine = ValidationEngine::new();
//! let input = FormValue::object_from([("name", FormValue::from("Al")), ("age", FormValue::from(30))]);
//! match engine.validate(provider.root(), &input) {
//!     ValidationResult::Valid(typed) => assert_eq!(typed, input),
//!     ValidationResult::Invalid(errors) => panic!("unexpected errors: {errors}"),
//! }
//! ```

pub mod coerce;
pub mod engine;
pub mod reporter;
pub mod rules;

// Re-export main types
pub use coerce::{RawInput, coerce_input, coerce_value};
pub use engine::{ValidationConfig, ValidationEngine, ValidationResult};
pub use reporter::{ErrorMap, ReportFormat, ValidationReporter};
pub use rules::{
    RuleResult, validate_date_range, validate_format, validate_integer, validate_items,
    validate_length, validate_pattern, validate_range, validate_required, validate_step,
};

use thiserror::Error;

/// Errors that can occur while running validation
#[derive(Error, Debug)]
pub enum Error {
    #[error("No schema node at path '{0}'")]
    UnknownPath(String),

    #[error(transparent)]
    Value(#[from] form_ir::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Convenience function to validate a value tree with default settings
#[must_use]
pub fn validate(
    provider: &form_schema::SchemaProvider,
    value: &form_ir::FormValue,
) -> ValidationResult {
    ValidationEngine::new().validate(provider.root(), value)
}
