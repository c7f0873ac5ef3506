//! Schema loading integration tests
//!
//! Loads the schemas under `testdata/schemas` and checks the descriptors a
//! renderer would see.

use std::path::PathBuf;
use std::sync::Arc;

use form_ir::FieldPath;
use form_schema::{
    DateBound, SchemaError, SchemaLoader, SchemaProvider, SchemaRegistry, StringFormat, TypeTag,
};

/// Go up from crates/form-schema to the workspace root
fn project_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf()
}

fn schema_dir() -> PathBuf {
    project_root().join("testdata").join("schemas")
}

fn project_provider() -> SchemaProvider {
    let loader = SchemaLoader::new(vec![schema_dir()]);
    let schema = loader
        .load("project")
        .unwrap_or_else(|err| panic!("Failed to load project schema: {err}"));
    SchemaProvider::new(schema).unwrap_or_else(|err| panic!("Invalid project schema: {err}"))
}

fn path(p: &str) -> FieldPath {
    FieldPath::parse(p).unwrap()
}

#[test]
fn test_project_schema_sections_in_order() {
    let provider = project_provider();
    let sections: Vec<(&str, &str)> = provider
        .descriptors()
        .iter()
        .map(|d| (d.name.as_str(), d.label.as_str()))
        .collect();
    assert_eq!(
        sections,
        vec![
            ("personalInfo", "Personal Information"),
            ("projectDetails", "Project Details"),
        ]
    );

    let personal = &provider.descriptors()[0];
    let names: Vec<&str> = personal.children.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["fullName", "email", "website", "experienceYears", "expectedSalary"]
    );
}

#[test]
fn test_project_schema_field_metadata() {
    let provider = project_provider();

    let full_name = provider.descriptor(&path("personalInfo.fullName")).unwrap();
    assert_eq!(full_name.label, "Full Name");
    assert_eq!(full_name.help_text.as_deref(), Some("Enter your full name"));
    assert!(full_name.required);

    let website = provider.descriptor(&path("personalInfo.website")).unwrap();
    assert!(!website.required);
    assert_eq!(
        website.constraints.format.as_ref().map(|f| f.value),
        Some(StringFormat::Url)
    );

    let salary = provider.descriptor(&path("personalInfo.expectedSalary")).unwrap();
    assert_eq!(salary.tag, TypeTag::Number);
    let step = salary.constraints.step.as_ref().unwrap().value;
    assert!((step - 1000.0).abs() < f64::EPSILON);

    let start = provider.descriptor(&path("projectDetails.startDate")).unwrap();
    assert_eq!(start.tag, TypeTag::Date);
    assert_eq!(
        start.constraints.max_date.as_ref().map(|b| b.value),
        Some(DateBound::Today)
    );
}

#[test]
fn test_referenced_definitions_keep_site_labels() {
    let provider = project_provider();
    let features = provider.descriptor(&path("projectDetails.features")).unwrap();
    assert_eq!(features.label, "Project Features");
    let labels: Vec<&str> = features.children.iter().map(|d| d.label.as_str()).collect();
    assert_eq!(
        labels,
        vec!["Responsive Design", "Accessibility", "Dark Mode", "Multilingual", "Analytics"]
    );
    assert!(features.children.iter().all(|d| d.tag == TypeTag::Boolean));
}

#[test]
fn test_yaml_schema_with_array() {
    let loader = SchemaLoader::new(vec![schema_dir()]);
    let provider = SchemaProvider::new(loader.load("contact").unwrap()).unwrap();

    let flat: Vec<String> = provider.flatten().iter().map(|d| d.path.to_string()).collect();
    assert_eq!(flat, vec!["name", "age", "isHuman", "tags", "tags[0]"]);

    let is_human = provider.descriptor(&path("isHuman")).unwrap();
    assert_eq!(is_human.help_text.as_deref(), Some("Tick if you are not a robot"));
    assert_eq!(provider.schema().title.as_deref(), Some("Contact"));
}

#[test]
fn test_loader_cache_is_shared() {
    let registry = Arc::new(SchemaRegistry::new());
    let first = SchemaLoader::with_registry(Arc::clone(&registry), vec![schema_dir()]);
    first.load("project").unwrap();
    assert!(registry.contains("project"));

    // A second loader without search paths is served from the shared cache
    let second = SchemaLoader::with_registry(Arc::clone(&registry), vec![]);
    let schema = second.load("project").unwrap();
    assert_eq!(schema.title.as_deref(), Some("Project Intake"));
}

#[test]
fn test_load_from_file_by_extension() {
    let loader = SchemaLoader::default();
    let json = loader.load_from_file(&schema_dir().join("project.json")).unwrap();
    assert_eq!(json.root.tag(), TypeTag::Object);
    let yaml = loader.load_from_file(&schema_dir().join("contact.yaml")).unwrap();
    assert!(yaml.root.field("tags").is_some());
}

#[test]
fn test_missing_file_is_io_error() {
    let loader = SchemaLoader::default();
    let err = loader
        .load_from_file(&schema_dir().join("absent.json"))
        .unwrap_err();
    assert!(matches!(err, SchemaError::Io(_)));
}
