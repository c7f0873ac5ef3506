//! Integration tests for form-engine
//!
//! Drives whole form sessions over the schemas in `testdata/`.

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use chrono::NaiveDate;
use form_engine::{
    ChangeBinding, FieldStatus, FormEngine, FormOptions, FormState, SubmitOutcome, WidgetKind,
    WidgetRegistry,
};
use form_ir::{FieldPath, FormValue};
use form_schema::{SchemaLoader, SchemaNode, SchemaProvider, TypeTag};
use form_validation::RawInput;

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

fn load_provider(name: &str) -> Arc<SchemaProvider> {
    let loader = SchemaLoader::new(vec![testdata_path().join("schemas")]);
    let schema = loader
        .load(name)
        .unwrap_or_else(|err| panic!("Failed to load schema {name}: {err}"));
    Arc::new(SchemaProvider::new(schema).unwrap())
}

fn load_values(file: &str) -> FormValue {
    let path = testdata_path().join("values").join(file);
    let content =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to read {}", path.display()));
    let json: serde_json::Value = serde_json::from_str(&content).unwrap();
    FormValue::from_json(&json)
}

fn options_with(values: Option<FormValue>) -> FormOptions {
    FormOptions {
        default_values: values,
        today: NaiveDate::from_ymd_opt(2024, 6, 1),
        ..FormOptions::default()
    }
}

type Calls = Rc<RefCell<Vec<FormValue>>>;

fn session(provider: Arc<SchemaProvider>, options: FormOptions) -> (FormEngine, Calls) {
    let calls: Calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    let engine = FormEngine::new(provider, options, move |values: FormValue| {
        sink.borrow_mut().push(values);
    });
    (engine, calls)
}

fn p(s: &str) -> FieldPath {
    FieldPath::parse(s).unwrap()
}

#[test]
fn test_valid_submission_invokes_callback_once() {
    let provider = load_provider("project");
    let (mut engine, calls) = session(
        Arc::clone(&provider),
        options_with(Some(load_values("project_valid.json"))),
    );

    assert_eq!(engine.submit().unwrap(), SubmitOutcome::Accepted);
    assert_eq!(engine.state(), FormState::SubmitAccepted);
    assert!(engine.errors().is_empty());

    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    let typed = &calls[0];
    for descriptor in provider.flatten() {
        assert!(
            typed.get(&descriptor.path).is_some(),
            "typed tree lacks {}",
            descriptor.path
        );
    }
    assert_eq!(
        typed.get(&p("projectDetails.startDate")),
        Some(&FormValue::Date(NaiveDate::from_ymd_opt(2015, 6, 1).unwrap()))
    );
}

#[test]
fn test_invalid_submission_reports_every_field() {
    let (mut engine, calls) = session(
        load_provider("project"),
        options_with(Some(load_values("project_invalid.json"))),
    );

    assert_eq!(engine.submit().unwrap(), SubmitOutcome::Rejected);
    assert!(calls.borrow().is_empty());
    assert_eq!(engine.state(), FormState::Editing);

    let errors = engine.errors();
    assert_eq!(errors.len(), 9);
    assert_eq!(
        errors.get(&p("projectDetails.agreeToTerms")),
        Some("You must agree to the terms")
    );
    assert_eq!(
        errors.get(&p("projectDetails.projectType")),
        Some("Please select project type")
    );
    assert!(engine.is_touched(&p("personalInfo.fullName")));
}

#[test]
fn test_name_age_session() {
    let provider = Arc::new(
        SchemaProvider::new(SchemaNode::object([
            ("name", SchemaNode::string().min_length(2)),
            ("age", SchemaNode::number()),
        ]))
        .unwrap(),
    );
    let (mut engine, calls) = session(provider, FormOptions::default());

    engine.set_field(&p("name"), "A".into()).unwrap();
    engine.set_field(&p("age"), RawInput::Number(30.0)).unwrap();
    assert_eq!(engine.submit().unwrap(), SubmitOutcome::Rejected);
    assert_eq!(engine.errors().paths().collect::<Vec<_>>(), vec![&p("name")]);
    assert!(calls.borrow().is_empty());

    engine.set_field(&p("name"), "Al".into()).unwrap();
    assert_eq!(engine.submit().unwrap(), SubmitOutcome::Accepted);
    assert_eq!(
        calls.borrow()[0].to_json(),
        serde_json::json!({"name": "Al", "age": 30})
    );
}

#[test]
fn test_array_append_and_remove_renumbers() {
    let (mut engine, _) = session(load_provider("contact"), FormOptions::default());
    let tags = p("tags");
    let registry = WidgetRegistry::with_defaults();

    // Append through the rendered control
    let list = engine.render_field(&registry, &tags).unwrap();
    let add = list.children.last().and_then(|w| w.binding.clone()).unwrap();
    assert_eq!(add, ChangeBinding::Append(tags.clone()));
    engine.handle(add.event(RawInput::Checked(true))).unwrap();
    assert_eq!(engine.append_item(&tags).unwrap(), 1);
    assert_eq!(engine.append_item(&tags).unwrap(), 2);

    engine.set_field(&p("tags[0]"), "first".into()).unwrap();
    engine.set_field(&p("tags[1]"), "".into()).unwrap();
    engine.set_field(&p("tags[2]"), "third".into()).unwrap();
    assert_eq!(engine.error(&p("tags[1]")), Some("Required"));

    let removed = engine.remove_item(&tags, 0).unwrap();
    assert_eq!(removed, FormValue::from("first"));

    assert_eq!(
        engine.value(&tags),
        Some(&FormValue::Array(vec![FormValue::Null, FormValue::from("third")]))
    );
    assert_eq!(engine.error(&p("tags[0]")), Some("Required"));
    assert_eq!(engine.error(&p("tags[1]")), None);
    assert!(engine.is_touched(&p("tags[1]")));
    assert!(!engine.is_touched(&p("tags[2]")));

    let list = engine.render_field(&registry, &tags).unwrap();
    let ids: Vec<&str> = list
        .children
        .iter()
        .filter(|w| w.kind == WidgetKind::ArrayItem)
        .map(|w| w.id.as_str())
        .collect();
    assert_eq!(ids, vec!["tags[0]", "tags[1]"]);
}

#[test]
fn test_item_count_error_follows_length() {
    let (mut engine, _) = session(load_provider("contact"), FormOptions::default());
    let tags = p("tags");
    for _ in 0..4 {
        engine.append_item(&tags).unwrap();
    }
    assert_eq!(
        engine.error(&tags),
        Some("Array must contain at most 3 element(s)")
    );

    engine.remove_item(&tags, 3).unwrap();
    assert_eq!(engine.error(&tags), None);
    assert!(engine.remove_item(&tags, 3).is_err());
}

#[test]
fn test_superseded_check_is_ignored() {
    let provider = Arc::new(
        SchemaProvider::new(SchemaNode::object([("username", SchemaNode::string())])).unwrap(),
    );
    let (mut engine, _) = session(provider, FormOptions::default());
    let username = p("username");

    engine.set_field(&username, "ada".into()).unwrap();
    let stale = engine.begin_check(&username).unwrap();
    engine.set_field(&username, "ada99".into()).unwrap();
    let latest = engine.begin_check(&username).unwrap();

    assert!(!engine.complete_check(&stale, Err("Username is taken".to_string())));
    assert_eq!(engine.error(&username), None);

    assert!(engine.complete_check(&latest, Ok(())));
    assert_eq!(engine.submit().unwrap(), SubmitOutcome::Accepted);
}

#[test]
fn test_remove_supersedes_checks_of_shifted_items() {
    let (mut engine, calls) = session(
        load_provider("contact"),
        options_with(Some(load_values("contact_valid.json"))),
    );
    let tags = p("tags");
    engine.append_item(&tags).unwrap();
    engine.append_item(&tags).unwrap();
    engine.set_field(&p("tags[0]"), "a".into()).unwrap();
    engine.set_field(&p("tags[1]"), "b".into()).unwrap();

    let ticket = engine.begin_check(&p("tags[1]")).unwrap();
    engine.remove_item(&tags, 0).unwrap();

    assert!(!engine.complete_check(&ticket, Ok(())));
    assert_eq!(engine.field_status(&p("tags[0]")), FieldStatus::Valid);
    assert_eq!(engine.submit().unwrap(), SubmitOutcome::Accepted);
    assert_eq!(calls.borrow()[0].get(&tags), Some(&FormValue::Array(vec![FormValue::from("b")])));
}

#[test]
fn test_remove_clears_stale_pending_message() {
    let (mut engine, _) = session(
        load_provider("contact"),
        options_with(Some(load_values("contact_valid.json"))),
    );
    let tags = p("tags");
    engine.append_item(&tags).unwrap();
    engine.append_item(&tags).unwrap();
    engine.set_field(&p("tags[0]"), "a".into()).unwrap();
    engine.set_field(&p("tags[1]"), "b".into()).unwrap();

    let _ticket = engine.begin_check(&p("tags[1]")).unwrap();
    assert_eq!(engine.submit().unwrap(), SubmitOutcome::Rejected);
    assert_eq!(engine.error(&p("tags[1]")), Some("Validation in progress"));

    engine.remove_item(&tags, 0).unwrap();
    assert_eq!(engine.error(&p("tags[0]")), None);
    assert_eq!(engine.submit().unwrap(), SubmitOutcome::Accepted);
}

#[test]
fn test_unsupported_tag_renders_inline() {
    let (engine, _) = session(load_provider("project"), options_with(None));
    let mut registry = WidgetRegistry::with_defaults();
    registry.unregister(TypeTag::Date);

    let form = engine.render(&registry);
    let start = form.find("projectDetails.startDate").unwrap();
    assert_eq!(start.kind, WidgetKind::Unsupported);
    assert_eq!(
        start.error.as_deref(),
        Some("No widget registered for field type 'date'")
    );

    let name = form.find("personalInfo.fullName").unwrap();
    assert_eq!(name.kind, WidgetKind::TextInput);
    assert_eq!(
        form.find("projectDetails.agreeToTerms").map(|w| w.kind),
        Some(WidgetKind::Checkbox)
    );

    let markup = form.to_markup();
    assert!(markup.contains("class=\"unsupported\""));
    assert!(markup.contains("<h2>Project Intake</h2>"));
}

#[test]
fn test_render_field_after_change() {
    let (mut engine, _) = session(load_provider("project"), options_with(None));
    let registry = WidgetRegistry::with_defaults();
    let full_name = p("personalInfo.fullName");

    engine.set_field(&full_name, "A".into()).unwrap();
    let widget = engine.render_field(&registry, &full_name).unwrap();
    assert_eq!(widget.count(), 1);
    assert_eq!(widget.label, "Full Name");
    assert_eq!(widget.help_text.as_deref(), Some("Enter your full name"));
    assert_eq!(
        widget.error.as_deref(),
        Some("Name must be at least 2 characters")
    );

    let fieldset = engine
        .render_field(&registry, &p("personalInfo"))
        .unwrap();
    assert_eq!(fieldset.kind, WidgetKind::Fieldset);
    assert_eq!(fieldset.children.len(), 5);
    assert!(engine.render_field(&registry, &p("nope")).is_err());
}

#[test]
fn test_options_file_drives_render() {
    let options = FormOptions::from_file(&testdata_path().join("options/project.yaml")).unwrap();
    let (engine, _) = session(load_provider("project"), options);

    assert_eq!(
        engine.value(&p("projectDetails.priority")),
        Some(&FormValue::from("medium"))
    );

    let form = engine.render(&WidgetRegistry::with_defaults());
    let submit = form.children.last().unwrap();
    assert_eq!(submit.kind, WidgetKind::Button);
    assert_eq!(submit.label, "Send application");
    assert_eq!(
        form.find("projectDetails.startDate")
            .and_then(|w| w.attribute("max")),
        Some("2024-06-01")
    );

    let options = FormOptions::from_file(&testdata_path().join("options/no_submit.json")).unwrap();
    let (engine, _) = session(load_provider("project"), options);
    let form = engine.render(&WidgetRegistry::with_defaults());
    assert!(form.children.iter().all(|w| w.kind != WidgetKind::Button));
}
