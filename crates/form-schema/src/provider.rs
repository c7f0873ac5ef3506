//! Schema provider: checks a schema once and projects it into field descriptors

use crate::check::check_node;
use crate::model::{Constraints, NodeKind, Schema, SchemaNode, TypeTag};
use crate::{Result, SchemaError};
use form_ir::{FieldPath, FormValue, PathSegment};
use serde::{Serialize, Serializer};
use tracing::{debug, trace};

/// Deepest nesting accepted in a schema
pub const MAX_DEPTH: usize = 64;

/// Name given to the element template of an array
pub const ELEMENT_NAME: &str = "item";

/// Read-only, renderer-facing projection of one schema node
#[derive(Debug, Clone, Serialize)]
pub struct FieldDescriptor {
    /// Path from the root; array elements are addressed at index 0
    #[serde(serialize_with = "serialize_path")]
    pub path: FieldPath,
    pub name: String,
    #[serde(rename = "type")]
    pub tag: TypeTag,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    pub required: bool,
    pub constraints: Constraints,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<FormValue>,
    /// Enum options
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Object members, or the single element template of an array
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FieldDescriptor>,
}

fn serialize_path<S: Serializer>(path: &FieldPath, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(path)
}

impl FieldDescriptor {
    /// Member descriptor of an object field
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&FieldDescriptor> {
        if self.tag != TypeTag::Object {
            return None;
        }
        self.children.iter().find(|c| c.name == name)
    }

    /// Element template of an array field
    #[must_use]
    pub fn element(&self) -> Option<&FieldDescriptor> {
        if self.tag != TypeTag::Array {
            return None;
        }
        self.children.first()
    }
}

/// Wraps a [`Schema`] and exposes its ordered field descriptors
#[derive(Debug, Clone)]
pub struct SchemaProvider {
    schema: Schema,
    descriptors: Vec<FieldDescriptor>,
}

impl SchemaProvider {
    /// Check `schema` and compute its descriptors.
    ///
    /// # Errors
    ///
    /// Any structural problem in the schema is reported here, never later.
    pub fn new(schema: impl Into<Schema>) -> Result<Self> {
        let schema = schema.into();
        let NodeKind::Object { fields } = &schema.root.kind else {
            return Err(SchemaError::RootNotObject(schema.root.tag()));
        };

        check_tree(&schema.root)?;

        let root = FieldPath::root();
        let descriptors: Vec<FieldDescriptor> = fields
            .iter()
            .map(|(name, node)| describe(root.key(name.clone()), name, node))
            .collect();

        debug!(
            title = schema.title.as_deref().unwrap_or("<untitled>"),
            fields = descriptors.len(),
            "Schema provider ready"
        );

        Ok(Self {
            schema,
            descriptors,
        })
    }

    /// Top-level descriptors in declaration order
    #[must_use]
    pub fn descriptors(&self) -> &[FieldDescriptor] {
        &self.descriptors
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub fn root(&self) -> &SchemaNode {
        &self.schema.root
    }

    /// Descriptor for `path`; any array index resolves to the element template
    #[must_use]
    pub fn descriptor(&self, path: &FieldPath) -> Option<&FieldDescriptor> {
        let mut segments = path.segments().iter();
        let PathSegment::Key(first) = segments.next()? else {
            return None;
        };
        let mut current = self.descriptors.iter().find(|d| &d.name == first)?;
        for segment in segments {
            current = match segment {
                PathSegment::Key(k) => current.child(k)?,
                PathSegment::Index(_) => current.element()?,
            };
        }
        Some(current)
    }

    /// Schema node at `path`; the empty path is the root
    #[must_use]
    pub fn node_at(&self, path: &FieldPath) -> Option<&SchemaNode> {
        let mut current = &self.schema.root;
        for segment in path.segments() {
            current = match segment {
                PathSegment::Key(k) => current.field(k)?,
                PathSegment::Index(_) => current.element()?,
            };
        }
        Some(current)
    }

    /// Initial value tree built from schema defaults
    #[must_use]
    pub fn default_values(&self) -> FormValue {
        Self::default_for(&self.schema.root)
    }

    /// Initial value for a node.
    ///
    /// Objects are always materialized (an explicit object default is merged
    /// over member defaults), arrays start empty, other nodes start at their
    /// default or `Null`.
    #[must_use]
    pub fn default_for(node: &SchemaNode) -> FormValue {
        match &node.kind {
            NodeKind::Object { fields } => {
                let mut value = FormValue::Object(
                    fields
                        .iter()
                        .map(|(name, child)| (name.clone(), Self::default_for(child)))
                        .collect(),
                );
                if let Some(default) = &node.default {
                    value.merge(default);
                }
                value
            }
            NodeKind::Array { .. } => node
                .default
                .clone()
                .unwrap_or_else(|| FormValue::Array(Vec::new())),
            _ => node.default.clone().unwrap_or(FormValue::Null),
        }
    }

    /// All descriptors in pre-order (parents before their children)
    #[must_use]
    pub fn flatten(&self) -> Vec<&FieldDescriptor> {
        let mut out = Vec::new();
        let mut stack: Vec<&FieldDescriptor> = self.descriptors.iter().rev().collect();
        while let Some(descriptor) = stack.pop() {
            out.push(descriptor);
            stack.extend(descriptor.children.iter().rev());
        }
        out
    }
}

/// Check every node, walking with an explicit stack
fn check_tree(root: &SchemaNode) -> Result<()> {
    let mut stack: Vec<(FieldPath, &SchemaNode, usize)> = vec![(FieldPath::root(), root, 0)];
    let mut visited = 0usize;

    while let Some((path, node, depth)) = stack.pop() {
        if depth > MAX_DEPTH {
            return Err(SchemaError::TooDeep {
                path: path.to_string(),
                max: MAX_DEPTH,
            });
        }
        check_node(&path, node)?;
        visited += 1;

        match &node.kind {
            NodeKind::Object { fields } => {
                // Reversed so siblings are checked in declaration order
                for (name, child) in fields.iter().rev() {
                    stack.push((path.key(name.clone()), child, depth + 1));
                }
            }
            NodeKind::Array { element } => {
                stack.push((path.index(0), element, depth + 1));
            }
            _ => {}
        }
    }

    trace!(nodes = visited, "Schema structure checked");
    Ok(())
}

// Recursion depth is bounded by MAX_DEPTH, enforced by check_tree first.
fn describe(path: FieldPath, name: &str, node: &SchemaNode) -> FieldDescriptor {
    let children = match &node.kind {
        NodeKind::Object { fields } => fields
            .iter()
            .map(|(child_name, child)| describe(path.key(child_name.clone()), child_name, child))
            .collect(),
        NodeKind::Array { element } => vec![describe(path.index(0), ELEMENT_NAME, element)],
        _ => Vec::new(),
    };

    FieldDescriptor {
        name: name.to_string(),
        tag: node.tag(),
        label: node.meta.label_or(name),
        help_text: node.meta.help_text.clone(),
        required: !node.is_optional(),
        constraints: node.constraints.clone(),
        default: node.default.clone(),
        options: node.options().to_vec(),
        children,
        path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> SchemaNode {
        SchemaNode::object([
            ("name", SchemaNode::string().min_length(2)),
            ("age", SchemaNode::number()),
            (
                "address",
                SchemaNode::object([
                    ("street", SchemaNode::string().describe("Street // House and street")),
                    ("zip", SchemaNode::string().optional()),
                ])
                .describe("Address"),
            ),
            (
                "tags",
                SchemaNode::array(SchemaNode::string()).default_value(FormValue::Array(vec![
                    FormValue::from("new"),
                ])),
            ),
            ("priority", SchemaNode::enumeration(["low", "medium", "high"]).default_value("low")),
        ])
    }

    #[test]
    fn test_descriptors_preserve_order() {
        let provider = SchemaProvider::new(sample_schema()).unwrap();
        let names: Vec<&str> = provider.descriptors().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["name", "age", "address", "tags", "priority"]);
    }

    #[test]
    fn test_every_field_exactly_once() {
        let provider = SchemaProvider::new(sample_schema()).unwrap();
        let paths: Vec<String> = provider.flatten().iter().map(|d| d.path.to_string()).collect();
        assert_eq!(
            paths,
            vec![
                "name",
                "age",
                "address",
                "address.street",
                "address.zip",
                "tags",
                "tags[0]",
                "priority"
            ]
        );
    }

    #[test]
    fn test_descriptor_metadata() {
        let provider = SchemaProvider::new(sample_schema()).unwrap();
        let street = provider
            .descriptor(&FieldPath::parse("address.street").unwrap())
            .unwrap();
        assert_eq!(street.label, "Street");
        assert_eq!(street.help_text.as_deref(), Some("House and street"));
        assert!(street.required);

        let zip = provider.descriptor(&FieldPath::parse("address.zip").unwrap()).unwrap();
        assert_eq!(zip.label, "Zip");
        assert!(!zip.required);

        let priority = provider.descriptor(&FieldPath::parse("priority").unwrap()).unwrap();
        assert_eq!(priority.tag, TypeTag::Enum);
        assert_eq!(priority.options, vec!["low", "medium", "high"]);
    }

    #[test]
    fn test_descriptor_lookup_through_arrays() {
        let provider = SchemaProvider::new(sample_schema()).unwrap();
        let element = provider.descriptor(&FieldPath::parse("tags[7]").unwrap()).unwrap();
        assert_eq!(element.tag, TypeTag::String);
        assert_eq!(element.path.to_string(), "tags[0]");
        assert!(provider.descriptor(&FieldPath::parse("missing").unwrap()).is_none());
        assert!(provider.descriptor(&FieldPath::parse("name.inner").unwrap()).is_none());
    }

    #[test]
    fn test_node_at() {
        let provider = SchemaProvider::new(sample_schema()).unwrap();
        assert_eq!(provider.node_at(&FieldPath::root()).unwrap().tag(), TypeTag::Object);
        assert_eq!(
            provider.node_at(&FieldPath::parse("tags[3]").unwrap()).unwrap().tag(),
            TypeTag::String
        );
    }

    #[test]
    fn test_default_values() {
        let provider = SchemaProvider::new(sample_schema()).unwrap();
        let defaults = provider.default_values();
        assert_eq!(
            defaults.to_json(),
            serde_json::json!({
                "name": null,
                "age": null,
                "address": {"street": null, "zip": null},
                "tags": ["new"],
                "priority": "low"
            })
        );
    }

    #[test]
    fn test_root_must_be_object() {
        let err = SchemaProvider::new(SchemaNode::string()).unwrap_err();
        assert!(matches!(err, SchemaError::RootNotObject(TypeTag::String)));
    }

    #[test]
    fn test_nested_errors_reported_at_construction() {
        let schema = SchemaNode::object([(
            "outer",
            SchemaNode::object([("count", SchemaNode::string().step(1.0))]),
        )]);
        match SchemaProvider::new(schema).unwrap_err() {
            SchemaError::IllegalConstraint { path, .. } => assert_eq!(path, "outer.count"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_too_deep() {
        let mut node = SchemaNode::string();
        for _ in 0..=MAX_DEPTH {
            node = SchemaNode::object([("inner", node)]);
        }
        let err = SchemaProvider::new(node).unwrap_err();
        assert!(matches!(err, SchemaError::TooDeep { .. }));
    }

    #[test]
    fn test_descriptor_serializes_path_as_string() {
        let provider = SchemaProvider::new(sample_schema()).unwrap();
        let json = serde_json::to_value(&provider.descriptors()[0]).unwrap();
        assert_eq!(json["path"], "name");
        assert_eq!(json["type"], "string");
        assert_eq!(json["constraints"]["min_length"]["value"], 2);
    }
}
