#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # form-ir
//!
//! Runtime value tree and field addressing for schema-driven forms.
//!
//! This crate provides a format-neutral tree ([`FormValue`]) that mirrors the
//! shape of a form schema, the [`FieldPath`] type used to address any node in
//! that tree, and cursor/visitor helpers for walking it.

/// Field paths (`personalInfo.fullName`, `tags[2]`).
pub mod path;
/// Cursor-based traversal helpers for navigating value trees.
pub mod traversal;
/// Core value tree held by a form session.
pub mod value;

/// Addressing primitives.
pub use path::{FieldPath, PathSegment};
/// Traversal entry points.
pub use traversal::{Cursor, LeafCollector, Traversal, walk};
/// Value tree primitives.
pub use value::{DATE_FORMAT, FormValue, ObjectMap};

use thiserror::Error;

/// Errors that can occur when working with value trees
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Node not found at path: {path}")]
    NodeNotFound { path: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Type mismatch at '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },
}

impl Error {
    /// Build a node-not-found error with path context.
    pub fn node_not_found(path: impl ToString) -> Self {
        Self::NodeNotFound {
            path: path.to_string(),
        }
    }

    /// Build an invalid-path error with input path and parsing reason.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Build a type-mismatch error for the node at `path`.
    pub fn type_mismatch(
        path: impl ToString,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            path: path.to_string(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Crate-local result type for value tree operations.
pub type Result<T> = std::result::Result<T, Error>;
