//! Traversal and cursor APIs for navigating a value tree

use crate::path::{FieldPath, PathSegment};
use crate::value::FormValue;
use crate::{Error, Result};

/// A cursor for navigating the value tree
pub struct Cursor<'a> {
    /// Current node
    node: &'a FormValue,

    /// Path to current node (for error reporting)
    path: FieldPath,
}

/// Trait for traversing the value tree
pub trait Traversal {
    /// Visit a node
    fn visit(&mut self, value: &FormValue, path: &FieldPath);

    /// Called when entering an object or array
    fn enter(&mut self, _value: &FormValue, _path: &FieldPath) {}

    /// Called when leaving an object or array
    fn leave(&mut self, _value: &FormValue, _path: &FieldPath) {}

    /// Returns true if traversal should continue
    fn should_continue(&self) -> bool {
        true
    }
}

impl<'a> Cursor<'a> {
    /// Create a new cursor at the given node
    #[must_use]
    pub fn new(node: &'a FormValue) -> Self {
        Self {
            node,
            path: FieldPath::root(),
        }
    }

    /// Get the current node
    #[must_use]
    pub fn node(&self) -> &'a FormValue {
        self.node
    }

    /// Get the current path
    #[must_use]
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Navigate to an object member by name
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] when the member is missing and
    /// [`Error::TypeMismatch`] when the current node is not an object.
    pub fn child(&self, name: &str) -> Result<Cursor<'a>> {
        let Some(map) = self.node.as_object() else {
            return Err(Error::type_mismatch(&self.path, "object", self.node.kind_name()));
        };
        match map.get(name) {
            Some(child) => Ok(Cursor {
                node: child,
                path: self.path.key(name),
            }),
            None => Err(Error::node_not_found(self.path.key(name))),
        }
    }

    /// Navigate to an array element by index
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] when the index is out of range and
    /// [`Error::TypeMismatch`] when the current node is not an array.
    pub fn child_at(&self, index: usize) -> Result<Cursor<'a>> {
        let Some(items) = self.node.as_array() else {
            return Err(Error::type_mismatch(&self.path, "array", self.node.kind_name()));
        };
        match items.get(index) {
            Some(child) => Ok(Cursor {
                node: child,
                path: self.path.index(index),
            }),
            None => Err(Error::node_not_found(self.path.index(index))),
        }
    }

    /// Navigate along a relative path
    ///
    /// # Errors
    ///
    /// Propagates the first failing step.
    pub fn navigate(&self, path: &FieldPath) -> Result<Cursor<'a>> {
        let mut cursor = Cursor {
            node: self.node,
            path: self.path.clone(),
        };
        for segment in path.segments() {
            cursor = match segment {
                PathSegment::Key(k) => cursor.child(k)?,
                PathSegment::Index(i) => cursor.child_at(*i)?,
            };
        }
        Ok(cursor)
    }
}

/// Walk the tree using a visitor
pub fn walk<T: Traversal>(value: &FormValue, visitor: &mut T) {
    walk_recursive(value, visitor, &FieldPath::root());
}

fn walk_recursive<T: Traversal>(value: &FormValue, visitor: &mut T, path: &FieldPath) {
    if !visitor.should_continue() {
        return;
    }

    visitor.visit(value, path);

    match value {
        FormValue::Object(map) => {
            visitor.enter(value, path);
            for (key, child) in map {
                walk_recursive(child, visitor, &path.key(key.clone()));
            }
            visitor.leave(value, path);
        }
        FormValue::Array(items) => {
            visitor.enter(value, path);
            for (idx, child) in items.iter().enumerate() {
                walk_recursive(child, visitor, &path.index(idx));
            }
            visitor.leave(value, path);
        }
        _ => {}
    }
}

/// Collects the paths of all non-container nodes
#[derive(Debug, Default)]
pub struct LeafCollector {
    pub leaves: Vec<FieldPath>,
}

impl Traversal for LeafCollector {
    fn visit(&mut self, value: &FormValue, path: &FieldPath) {
        if !matches!(value, FormValue::Object(_) | FormValue::Array(_)) {
            self.leaves.push(path.clone());
        }
    }
}
