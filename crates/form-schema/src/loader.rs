//! Schema loader with named definitions and references

use crate::meta::FieldMeta;
use crate::model::{
    Bound, Constraints, DateBound, NodeKind, Refinement, Schema, SchemaNode, StringFormat,
};
use crate::provider::MAX_DEPTH;
use crate::refs::ReferenceGraph;
use crate::registry::SchemaRegistry;
use crate::{Result, SchemaError};
use chrono::NaiveDate;
use form_ir::{DATE_FORMAT, FieldPath, FormValue, ObjectMap};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Message of a refinement declared without one
const DEFAULT_REFINE_MESSAGE: &str = "Invalid input";

/// Most nodes a schema may hold once every reference is inlined
pub const MAX_NODES: usize = 10_000;

/// Serializable schema format for loading from files
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaFile {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    definitions: IndexMap<String, NodeFile>,
    root: NodeFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeFile {
    #[serde(rename = "ref")]
    reference: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    fields: IndexMap<String, NodeFile>,
    element: Option<Box<NodeFile>>,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    optional: bool,

    description: Option<String>,
    label: Option<String>,
    help: Option<String>,
    default: Option<serde_json::Value>,

    min_length: Option<BoundFile<usize>>,
    max_length: Option<BoundFile<usize>>,
    pattern: Option<BoundFile<String>>,
    format: Option<BoundFile<StringFormat>>,
    min: Option<BoundFile<f64>>,
    max: Option<BoundFile<f64>>,
    step: Option<BoundFile<f64>>,
    #[serde(default)]
    int: bool,
    min_date: Option<BoundFile<String>>,
    max_date: Option<BoundFile<String>>,
    min_items: Option<BoundFile<usize>>,
    max_items: Option<BoundFile<usize>>,
    required_message: Option<String>,
    invalid_type_message: Option<String>,

    #[serde(default)]
    refine: Vec<RefineFile>,
}

impl NodeFile {
    /// Whether the node declares its own shape next to a `ref`
    fn has_shape(&self) -> bool {
        self.kind.is_some()
            || !self.fields.is_empty()
            || self.element.is_some()
            || !self.options.is_empty()
    }
}

/// A bound written either as a plain value or as `{ value, message }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BoundFile<T> {
    Detailed {
        value: T,
        #[serde(default)]
        message: Option<String>,
    },
    Plain(T),
}

/// Refinement accepting exactly one value
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RefineFile {
    equals: serde_json::Value,
    #[serde(default)]
    message: Option<String>,
    /// Relative path that receives the error
    #[serde(default)]
    path: Option<String>,
}

/// On-disk format of a schema file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    Json,
    Yaml,
}

impl SchemaFormat {
    /// Format implied by a file extension; anything but `.yaml`/`.yml` is JSON
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        if path
            .extension()
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            SchemaFormat::Yaml
        } else {
            SchemaFormat::Json
        }
    }
}

/// Loads schemas from JSON/YAML, resolving named definitions
pub struct SchemaLoader {
    registry: Arc<SchemaRegistry>,
    schema_paths: Vec<PathBuf>,
}

impl SchemaLoader {
    /// Create a new schema loader with the given search paths
    #[must_use]
    pub fn new(schema_paths: Vec<PathBuf>) -> Self {
        Self {
            registry: Arc::new(SchemaRegistry::new()),
            schema_paths,
        }
    }

    /// Create a loader sharing an existing cache
    #[must_use]
    pub fn with_registry(registry: Arc<SchemaRegistry>, schema_paths: Vec<PathBuf>) -> Self {
        Self {
            registry,
            schema_paths,
        }
    }

    /// Load a schema by name, from the cache or the search paths.
    ///
    /// # Errors
    ///
    /// [`SchemaError::NotFound`] when no `<name>.json`, `<name>.yaml` or
    /// `<name>.yml` exists in the search paths, or any parse/reference error.
    pub fn load(&self, name: &str) -> Result<Schema> {
        if let Some(cached) = self.registry.get(name) {
            debug!("Cache hit for schema: {}", name);
            return Ok(cached);
        }

        trace!("Cache miss for schema: {}", name);

        let mut schema = self.load_from_disk(name)?;
        if schema.title.is_none() {
            schema.title = Some(name.to_string());
        }

        self.registry.register(name, schema.clone());
        Ok(schema)
    }

    /// Load a schema from a specific file path
    ///
    /// # Errors
    ///
    /// IO, parse, or reference resolution errors.
    pub fn load_from_file(&self, path: &Path) -> Result<Schema> {
        trace!("Loading schema from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        self.load_from_str(&content, SchemaFormat::from_path(path))
    }

    /// Load a schema from a string in the given format
    ///
    /// # Errors
    ///
    /// Parse or reference resolution errors.
    pub fn load_from_str(&self, content: &str, format: SchemaFormat) -> Result<Schema> {
        match format {
            SchemaFormat::Json => self.load_from_json(content),
            SchemaFormat::Yaml => self.load_from_yaml(content),
        }
    }

    /// Load a schema from JSON string
    ///
    /// # Errors
    ///
    /// [`SchemaError::InvalidFormat`] on malformed input, or a reference error.
    pub fn load_from_json(&self, json: &str) -> Result<Schema> {
        let schema_file: SchemaFile = serde_json::from_str(json)
            .map_err(|e| SchemaError::InvalidFormat(format!("JSON parse error: {e}")))?;

        convert_schema_file(schema_file)
    }

    /// Load a schema from YAML string
    ///
    /// # Errors
    ///
    /// [`SchemaError::InvalidFormat`] on malformed input, or a reference error.
    pub fn load_from_yaml(&self, yaml: &str) -> Result<Schema> {
        let schema_file: SchemaFile = serde_yaml::from_str(yaml)
            .map_err(|e| SchemaError::InvalidFormat(format!("YAML parse error: {e}")))?;

        convert_schema_file(schema_file)
    }

    fn load_from_disk(&self, name: &str) -> Result<Schema> {
        let variations = [
            format!("{name}.json"),
            format!("{name}.yaml"),
            format!("{name}.yml"),
        ];

        for path in &self.schema_paths {
            for variation in &variations {
                let file_path = path.join(variation);
                if file_path.exists() {
                    trace!("Found schema file: {:?}", file_path);
                    return self.load_from_file(&file_path);
                }
            }
        }

        Err(SchemaError::NotFound(format!(
            "Schema {} not found in search paths: {:?}",
            name, self.schema_paths
        )))
    }

    /// Add a search path for schema files
    pub fn add_path(&mut self, path: PathBuf) {
        self.schema_paths.push(path);
    }

    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }
}

impl Default for SchemaLoader {
    fn default() -> Self {
        Self::new(vec![PathBuf::from(".")])
    }
}

fn convert_schema_file(file: SchemaFile) -> Result<Schema> {
    check_references(&file)?;
    check_expanded_size(&file)?;

    let resolver = Resolver {
        definitions: &file.definitions,
    };
    let root = resolver.resolve(&file.root, &FieldPath::root(), 0)?;

    info!(
        title = file.title.as_deref().unwrap_or("<untitled>"),
        definitions = file.definitions.len(),
        "Loaded schema"
    );

    Ok(Schema {
        title: file.title,
        root,
    })
}

/// Reject unknown and cyclic references before anything is resolved
fn check_references(file: &SchemaFile) -> Result<()> {
    let mut graph = ReferenceGraph::new();

    for (name, definition) in &file.definitions {
        for target in references_in(definition) {
            if !file.definitions.contains_key(target) {
                return Err(SchemaError::UnknownReference(target.to_string()));
            }
            graph.add_edge(name.as_str(), target);
        }
    }
    for target in references_in(&file.root) {
        if !file.definitions.contains_key(target) {
            return Err(SchemaError::UnknownReference(target.to_string()));
        }
    }

    for name in file.definitions.keys() {
        if let Some(cycle) = graph.find_cycle(name) {
            return Err(SchemaError::SelfReferential(cycle.join(" -> ")));
        }
    }

    Ok(())
}

/// Reject schemas whose references fan out past [`MAX_NODES`].
///
/// Each reachable definition is sized once, dependencies first, so the
/// check stays linear in the file size however the references multiply.
fn check_expanded_size(file: &SchemaFile) -> Result<()> {
    let mut sizes: HashMap<&str, usize> = HashMap::new();
    let mut stack: Vec<(&str, bool)> = references_in(&file.root)
        .into_iter()
        .map(|name| (name, false))
        .collect();

    while let Some((name, ready)) = stack.pop() {
        if sizes.contains_key(name) {
            continue;
        }
        let Some(definition) = file.definitions.get(name) else {
            return Err(SchemaError::UnknownReference(name.to_string()));
        };
        if ready {
            let size = expanded_size(definition, &sizes);
            sizes.insert(name, size);
            continue;
        }
        stack.push((name, true));
        for target in references_in(definition) {
            if !sizes.contains_key(target) {
                stack.push((target, false));
            }
        }
    }

    let total = expanded_size(&file.root, &sizes);
    if total > MAX_NODES {
        return Err(SchemaError::TooLarge { max: MAX_NODES });
    }
    trace!(nodes = total, "Schema size checked");
    Ok(())
}

/// Node count of `node` with references replaced by their sized definitions
fn expanded_size(node: &NodeFile, sizes: &HashMap<&str, usize>) -> usize {
    let mut total: usize = 0;
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        let own = match &current.reference {
            Some(target) => sizes.get(target.as_str()).copied().unwrap_or(0),
            None => 1,
        };
        total = total.saturating_add(own);
        stack.extend(current.fields.values());
        if let Some(element) = &current.element {
            stack.push(element);
        }
    }
    total
}

/// Names referenced anywhere inside `node`
fn references_in(node: &NodeFile) -> Vec<&str> {
    let mut found = Vec::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if let Some(target) = &current.reference {
            found.push(target.as_str());
        }
        stack.extend(current.fields.values());
        if let Some(element) = &current.element {
            stack.push(element);
        }
    }
    found
}

struct Resolver<'a> {
    definitions: &'a IndexMap<String, NodeFile>,
}

impl Resolver<'_> {
    // References are acyclic here and every hop counts toward the depth cap.
    fn resolve(&self, file: &NodeFile, path: &FieldPath, depth: usize) -> Result<SchemaNode> {
        if depth > MAX_DEPTH {
            return Err(SchemaError::TooDeep {
                path: path.to_string(),
                max: MAX_DEPTH,
            });
        }

        if let Some(name) = &file.reference {
            if file.has_shape() {
                return Err(SchemaError::InvalidFormat(format!(
                    "'{path}' has both a ref and its own type"
                )));
            }
            let definition = self
                .definitions
                .get(name)
                .ok_or_else(|| SchemaError::UnknownReference(name.clone()))?;
            trace!(reference = %name, path = %path, "Resolving schema reference");

            let mut node = self.resolve(definition, path, depth + 1)?;
            // The referring site may adjust presentation and optionality
            if file.optional {
                node.constraints.optional = true;
            }
            node.meta = site_meta(file).or(node.meta);
            if let Some(default) = &file.default {
                node.default = Some(typed_default(&node, default, path)?);
            }
            node.refinements.extend(refinements(file, path)?);
            return Ok(node);
        }

        let kind = match file.kind.as_deref() {
            Some("string") => NodeKind::String,
            Some("number") => NodeKind::Number,
            Some("boolean") => NodeKind::Boolean,
            Some("date") => NodeKind::Date,
            Some("enum") => NodeKind::Enum {
                options: file.options.clone(),
            },
            Some("object") => {
                let mut fields = Vec::with_capacity(file.fields.len());
                for (name, child) in &file.fields {
                    let child_path = path.key(name.clone());
                    fields.push((name.clone(), self.resolve(child, &child_path, depth + 1)?));
                }
                NodeKind::Object { fields }
            }
            Some("array") => {
                let element = file.element.as_deref().ok_or_else(|| {
                    SchemaError::InvalidFormat(format!("Array '{path}' has no element"))
                })?;
                NodeKind::Array {
                    element: Box::new(self.resolve(element, &path.index(0), depth + 1)?),
                }
            }
            Some(other) => {
                return Err(SchemaError::InvalidFormat(format!(
                    "Unknown type '{other}' at '{path}'"
                )));
            }
            None => {
                return Err(SchemaError::InvalidFormat(format!(
                    "Missing 'type' at '{path}'"
                )));
            }
        };

        let mut node = SchemaNode::new(kind);
        node.constraints = constraints(file, path)?;
        node.meta = site_meta(file);
        node.refinements = refinements(file, path)?;
        if let Some(default) = &file.default {
            node.default = Some(typed_default(&node, default, path)?);
        }
        Ok(node)
    }
}

/// Explicit `label`/`help` win over the parts of `description`
fn site_meta(file: &NodeFile) -> FieldMeta {
    let explicit = FieldMeta {
        label: file.label.clone(),
        help_text: file.help.clone(),
    };
    match &file.description {
        Some(description) => explicit.or(FieldMeta::from_description(description)),
        None => explicit,
    }
}

fn constraints(file: &NodeFile, path: &FieldPath) -> Result<Constraints> {
    fn bound<T: Clone>(b: Option<&BoundFile<T>>) -> Option<Bound<T>> {
        b.map(|b| match b {
            BoundFile::Detailed { value, message } => Bound {
                value: value.clone(),
                message: message.clone(),
            },
            BoundFile::Plain(value) => Bound::new(value.clone()),
        })
    }

    Ok(Constraints {
        optional: file.optional,
        min_length: bound(file.min_length.as_ref()),
        max_length: bound(file.max_length.as_ref()),
        pattern: bound(file.pattern.as_ref()),
        format: bound(file.format.as_ref()),
        min: bound(file.min.as_ref()),
        max: bound(file.max.as_ref()),
        step: bound(file.step.as_ref()),
        integer: file.int,
        min_date: date_bound(file.min_date.as_ref(), path)?,
        max_date: date_bound(file.max_date.as_ref(), path)?,
        min_items: bound(file.min_items.as_ref()),
        max_items: bound(file.max_items.as_ref()),
        required_message: file.required_message.clone(),
        invalid_type_message: file.invalid_type_message.clone(),
    })
}

/// `"today"` or a `YYYY-MM-DD` date
fn date_bound(b: Option<&BoundFile<String>>, path: &FieldPath) -> Result<Option<Bound<DateBound>>> {
    let Some(b) = b else {
        return Ok(None);
    };
    let Bound { value, message } = match b {
        BoundFile::Detailed { value, message } => Bound {
            value: value.as_str(),
            message: message.clone(),
        },
        BoundFile::Plain(value) => Bound::new(value.as_str()),
    };
    let bound = if value.eq_ignore_ascii_case("today") {
        DateBound::Today
    } else {
        DateBound::Fixed(parse_date(value, path)?)
    };
    Ok(Some(Bound {
        value: bound,
        message,
    }))
}

fn parse_date(value: &str, path: &FieldPath) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| {
        SchemaError::InvalidFormat(format!("Invalid date '{value}' at '{path}': {e}"))
    })
}

fn refinements(file: &NodeFile, path: &FieldPath) -> Result<Vec<Refinement>> {
    file.refine
        .iter()
        .map(|r| {
            let message = r.message.as_deref().unwrap_or(DEFAULT_REFINE_MESSAGE);
            let refinement = Refinement::equals(FormValue::from_json(&r.equals), message);
            match &r.path {
                Some(target) => {
                    let target = FieldPath::parse(target).map_err(|e| {
                        SchemaError::InvalidFormat(format!("Refinement at '{path}': {e}"))
                    })?;
                    Ok(refinement.at(target))
                }
                None => Ok(refinement),
            }
        })
        .collect()
}

/// Convert a JSON default using the node's type, so date strings become dates
fn typed_default(node: &SchemaNode, json: &serde_json::Value, path: &FieldPath) -> Result<FormValue> {
    use serde_json::Value as Json;
    match (&node.kind, json) {
        (NodeKind::Date, Json::String(s)) => parse_date(s, path).map(FormValue::Date),
        (NodeKind::Object { .. }, Json::Object(map)) => {
            let mut out = ObjectMap::new();
            for (key, value) in map {
                let converted = match node.field(key) {
                    Some(child) => typed_default(child, value, &path.key(key.clone()))?,
                    None => FormValue::from_json(value),
                };
                out.insert(key.clone(), converted);
            }
            Ok(FormValue::Object(out))
        }
        (NodeKind::Array { element }, Json::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| typed_default(element, item, &path.index(i)))
            .collect::<Result<Vec<_>>>()
            .map(FormValue::Array),
        _ => Ok(FormValue::from_json(json)),
    }
}
