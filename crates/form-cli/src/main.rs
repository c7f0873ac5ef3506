//! # form-cli
//!
//! `autoform`: describe a form schema, render it as markup, or validate a
//! values file against it the way a form submission would.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use form_engine::{FormEngine, FormOptions, SubmitOutcome, WidgetRegistry};
use form_ir::FormValue;
use form_schema::{FieldDescriptor, SchemaFormat, SchemaLoader, SchemaProvider};
use form_validation::{ReportFormat, ValidationReporter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "autoform")]
#[command(about = "Schema-driven form engine CLI")]
#[command(version)]
struct Cli {
    /// Form options file (YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the fields of a schema
    Describe {
        /// Schema file (.json, .yaml or .yml)
        schema: PathBuf,

        /// Print descriptors as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render a schema as form markup
    Render {
        schema: PathBuf,

        /// Values to pre-fill the form with
        #[arg(long)]
        values: Option<PathBuf>,

        /// Leave out the submit button
        #[arg(long)]
        no_submit: bool,

        /// Validate the values first so errors show next to their fields
        #[arg(long)]
        show_errors: bool,
    },

    /// Submit a values file; prints the typed values or the errors
    Validate {
        schema: PathBuf,

        values: PathBuf,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Table,
}

impl From<Format> for ReportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => ReportFormat::Text,
            Format::Table => ReportFormat::Table,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = load_options(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Describe { schema, json } => {
            let provider = load_provider(&schema).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(provider.descriptors())?);
            } else {
                for descriptor in provider.flatten() {
                    println!("{}", describe_line(descriptor));
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Render {
            schema,
            values,
            no_submit,
            show_errors,
        } => {
            let provider = load_provider(&schema).await?;
            let mut options = options;
            if no_submit {
                options.with_submit = false;
            }
            if let Some(path) = values {
                overlay_values(&mut options, load_values(&path).await?);
            }

            let mut engine = FormEngine::new(provider, options, |_: FormValue| {});
            if show_errors {
                let outcome = engine.submit()?;
                tracing::info!("Pre-render validation: {:?}", outcome);
            }
            print!("{}", engine.render(&WidgetRegistry::with_defaults()).to_markup());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate {
            schema,
            values,
            format,
        } => {
            let provider = load_provider(&schema).await?;
            let values = load_values(&values).await?;
            tracing::info!("Validating {} against {}", values_label(&values), schema.display());

            let mut options = options;
            overlay_values(&mut options, values);

            let accepted: Rc<RefCell<Option<FormValue>>> = Rc::new(RefCell::new(None));
            let sink = Rc::clone(&accepted);
            let mut engine = FormEngine::new(provider, options, move |typed: FormValue| {
                *sink.borrow_mut() = Some(typed);
            });

            match engine.submit()? {
                SubmitOutcome::Accepted => {
                    let Some(typed) = accepted.borrow_mut().take() else {
                        bail!("submission accepted without a value");
                    };
                    println!("{}", serde_json::to_string_pretty(&typed)?);
                    Ok(ExitCode::SUCCESS)
                }
                SubmitOutcome::Rejected => {
                    let reporter = ValidationReporter::with_format(format.into());
                    println!("{}", reporter.report(engine.errors()));
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn load_options(path: Option<&Path>) -> anyhow::Result<FormOptions> {
    let Some(path) = path else {
        return Ok(FormOptions::default());
    };
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading config {}", path.display()))?;
    let options = match SchemaFormat::from_path(path) {
        SchemaFormat::Json => FormOptions::from_json_str(&content)?,
        SchemaFormat::Yaml => FormOptions::from_yaml_str(&content)?,
    };
    Ok(options)
}

async fn load_provider(path: &Path) -> anyhow::Result<Arc<SchemaProvider>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading schema {}", path.display()))?;
    let loader = SchemaLoader::default();
    let schema = loader
        .load_from_str(&content, SchemaFormat::from_path(path))
        .with_context(|| format!("loading schema {}", path.display()))?;
    let provider = SchemaProvider::new(schema)
        .with_context(|| format!("checking schema {}", path.display()))?;
    Ok(Arc::new(provider))
}

async fn load_values(path: &Path) -> anyhow::Result<FormValue> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading values {}", path.display()))?;
    let values = match SchemaFormat::from_path(path) {
        SchemaFormat::Json => serde_json::from_str(&content)?,
        SchemaFormat::Yaml => serde_yaml::from_str(&content)?,
    };
    Ok(values)
}

/// Lay `values` over any defaults the options already carry
fn overlay_values(options: &mut FormOptions, values: FormValue) {
    match options.default_values.as_mut() {
        Some(defaults) => defaults.merge(&values),
        None => options.default_values = Some(values),
    }
}

fn values_label(values: &FormValue) -> String {
    match values.as_object() {
        Some(map) => format!("{} top-level values", map.len()),
        None => values.kind_name().to_string(),
    }
}

/// `path  type  label[ *]  constraint=value ...`
fn describe_line(descriptor: &FieldDescriptor) -> String {
    let marker = if descriptor.required { " *" } else { "" };
    let mut line = format!(
        "{:<32}  {:<7}  {}{marker}",
        descriptor.path.to_string(),
        descriptor.tag.as_str(),
        descriptor.label
    );
    let constraints = constraint_summary(descriptor);
    if !constraints.is_empty() {
        line.push_str("  ");
        line.push_str(&constraints);
    }
    line.trim_end().to_string()
}

fn constraint_summary(descriptor: &FieldDescriptor) -> String {
    let Ok(serde_json::Value::Object(map)) = serde_json::to_value(&descriptor.constraints) else {
        return String::new();
    };
    let mut parts: Vec<String> = map
        .iter()
        .filter(|(key, _)| key.as_str() != "optional" && !key.ends_with("_message"))
        .filter_map(|(key, value)| {
            let value = value.get("value").unwrap_or(value);
            // Fixed date bounds serialize as {"fixed": "YYYY-MM-DD"}
            let value = value.get("fixed").unwrap_or(value);
            match value {
                serde_json::Value::Bool(false) | serde_json::Value::Null => None,
                serde_json::Value::Bool(true) => Some(key.clone()),
                serde_json::Value::String(s) => Some(format!("{key}={s}")),
                serde_json::Value::Number(n) => Some(format!("{key}={}", number_text(n))),
                other => Some(format!("{key}={other}")),
            }
        })
        .collect();
    if !descriptor.options.is_empty() {
        parts.push(format!("options={}", descriptor.options.join("|")));
    }
    parts.join(" ")
}

#[allow(clippy::cast_possible_truncation)] // Only whole numbers are narrowed.
fn number_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => (f as i64).to_string(),
        _ => n.to_string(),
    }
}
