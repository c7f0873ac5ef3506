//! Integration tests for form-validation
//!
//! Validates the project intake form from `testdata/` end to end.

use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use form_ir::{FieldPath, FormValue};
use form_schema::{SchemaLoader, SchemaNode, SchemaProvider};
use form_validation::{
    ReportFormat, ValidationConfig, ValidationEngine, ValidationReporter, ValidationResult,
};

fn project_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf()
}

fn testdata_path() -> PathBuf {
    project_root().join("testdata")
}

fn load_provider(name: &str) -> SchemaProvider {
    let loader = SchemaLoader::new(vec![testdata_path().join("schemas")]);
    let schema = loader
        .load(name)
        .unwrap_or_else(|err| panic!("Failed to load schema {name}: {err}"));
    SchemaProvider::new(schema).unwrap()
}

fn load_values(file: &str) -> FormValue {
    let path = testdata_path().join("values").join(file);
    let content =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to read {}", path.display()));
    let json: serde_json::Value = serde_json::from_str(&content).unwrap();
    FormValue::from_json(&json)
}

fn engine() -> ValidationEngine {
    ValidationEngine::with_config(ValidationConfig {
        today: NaiveDate::from_ymd_opt(2024, 6, 1),
        ..ValidationConfig::default()
    })
}

fn p(s: &str) -> FieldPath {
    FieldPath::parse(s).unwrap()
}

#[test]
fn test_name_age_submission() {
    let provider = SchemaProvider::new(SchemaNode::object([
        ("name", SchemaNode::string().min_length(2)),
        ("age", SchemaNode::number()),
    ]))
    .unwrap();

    let rejected = engine().validate(
        provider.root(),
        &FormValue::object_from([("name", FormValue::from("A")), ("age", FormValue::from(30))]),
    );
    let errors = rejected.errors().unwrap();
    assert_eq!(errors.paths().collect::<Vec<_>>(), vec![&p("name")]);

    let accepted = engine().validate(
        provider.root(),
        &FormValue::object_from([("name", FormValue::from("Al")), ("age", FormValue::from(30))]),
    );
    assert_eq!(
        accepted.value().unwrap().to_json(),
        serde_json::json!({"name": "Al", "age": 30})
    );
}

#[test]
fn test_valid_project_values() {
    let provider = load_provider("project");
    let result = engine().validate(provider.root(), &load_values("project_valid.json"));

    let ValidationResult::Valid(typed) = result else {
        panic!("expected valid result, got {result:?}");
    };
    assert_eq!(
        typed.get(&p("projectDetails.startDate")),
        Some(&FormValue::Date(NaiveDate::from_ymd_opt(2015, 6, 1).unwrap()))
    );
    // Optional website is absent but still part of the typed shape
    assert_eq!(typed.get(&p("personalInfo.website")), Some(&FormValue::Null));
}

#[test]
fn test_invalid_project_values_report_every_field() {
    let provider = load_provider("project");
    let result = engine().validate(provider.root(), &load_values("project_invalid.json"));
    let errors = result.errors().unwrap();

    let expected = [
        ("personalInfo.fullName", "Name must be at least 2 characters"),
        ("personalInfo.email", "Invalid email address"),
        ("personalInfo.website", "Must be a valid URL"),
        ("personalInfo.experienceYears", "Must be less than 50 years"),
        ("personalInfo.expectedSalary", "Number must be a multiple of 1000"),
        ("projectDetails.description", "Description must be at least 20 characters"),
        ("projectDetails.projectType", "Please select project type"),
        ("projectDetails.startDate", "Date must be after 2000"),
        ("projectDetails.agreeToTerms", "You must agree to the terms"),
    ];
    for (path, message) in expected {
        assert_eq!(errors.get(&p(path)), Some(message), "at {path}");
    }
    assert_eq!(errors.len(), expected.len());
    assert!(errors.get(&p("projectDetails.priority")).is_none());
}

#[test]
fn test_future_start_date_rejected() {
    let provider = load_provider("project");
    let mut values = load_values("project_valid.json");
    values
        .set(&p("projectDetails.startDate"), FormValue::from("2024-06-02"))
        .unwrap();

    let result = engine().validate(provider.root(), &values);
    assert_eq!(
        result.errors().unwrap().get(&p("projectDetails.startDate")),
        Some("Date cannot be in the future")
    );
}

#[test]
fn test_wrong_type_uses_custom_message() {
    let provider = load_provider("project");
    let mut values = load_values("project_valid.json");
    values
        .set(&p("projectDetails.priority"), FormValue::Number(3.0))
        .unwrap();

    let result = engine().validate(provider.root(), &values);
    assert_eq!(
        result.errors().unwrap().get(&p("projectDetails.priority")),
        Some("Priority must be a string")
    );
}

#[test]
fn test_report_lists_errors_in_path_order() {
    let provider = load_provider("contact");
    let values = FormValue::object_from([
        ("name", FormValue::Null),
        ("age", FormValue::from("old")),
        ("isHuman", FormValue::Boolean(true)),
    ]);
    let result = engine().validate(provider.root(), &values);
    let report = ValidationReporter::with_format(ReportFormat::Text).report(result.errors().unwrap());
    assert_eq!(report, "age: Expected number, received string\nname: Required");
}
