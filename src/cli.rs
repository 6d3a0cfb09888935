//! CLI: validate | eval | render | form
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;

use uispec::diagnostic::{Counts, Diagnostic};
use uispec::expr::{EvalContext, try_evaluate};
use uispec::form::{FormValidator, extract_validation_spec};
use uispec::path_de::from_str_with_path;
use uispec::pipeline::{PipelineOptions, RelationalStage, ValidationPipeline};
use uispec::registry::StaticRegistry;
use uispec::report::render_report;
use uispec::spec::{Node, unwrap_page};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// validate declarative UI specifications, evaluate conditions, and run form rules
#[derive(Parser, Debug)]
#[command(name = "uispec", version)]
pub struct CommandLineInterface {
    /// disable ANSI colour in reports
    #[arg(long, global = true, default_value_t = false)]
    no_color: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// run the validation pipeline over one or more specification documents
    Validate(ValidateOut),
    /// evaluate a condition expression against a state document
    Eval(EvalOut),
    /// project a specification for a state: drop hidden nodes, apply conditional props
    Render(RenderOut),
    /// extract a form's rules and validate a set of field values
    Form(FormOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /pages/0/root)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Parser, Debug)]
struct ValidateOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// component registry (JSON: `{"commonProps": [...], "components": {...}}`)
    #[arg(long, short)]
    registry: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// exit non-zero on warnings too
    #[arg(long)]
    deny_warnings: bool,

    /// also run the relational stage (nesting depth, heading nesting)
    #[arg(long)]
    relational: bool,

    /// omit fix-it hints from diagnostics
    #[arg(long)]
    no_suggestions: bool,

    /// nesting depth the relational stage warns beyond
    #[arg(long, default_value_t = 10)]
    max_depth: usize,
}

#[derive(clap::Parser, Debug)]
struct EvalOut {
    /// expression, e.g. `state.user.role === 'admin'`
    #[arg(long, short)]
    expr: String,

    /// state document (`{}` if omitted)
    #[arg(long)]
    state: Option<PathBuf>,

    /// document bound to the `props` root
    #[arg(long)]
    props: Option<PathBuf>,

    /// print the truthiness instead of the value
    #[arg(long)]
    condition: bool,
}

#[derive(clap::Parser, Debug)]
struct RenderOut {
    /// specification document (a page envelope is unwrapped)
    #[arg(long, short)]
    input: PathBuf,

    /// state document (`{}` if omitted)
    #[arg(long)]
    state: Option<PathBuf>,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct FormOut {
    /// specification document containing the form
    #[arg(long, short)]
    input: PathBuf,

    /// field values, e.g. `{"email": "ada@example.com"}`
    #[arg(long)]
    values: PathBuf,

    /// JSON Pointer to the form node inside the document
    #[arg(long)]
    json_pointer: Option<String>,
}

/// One document handed to a command, labelled for reports.
#[derive(Debug)]
struct Document {
    source: String,
    value: Value,
}

#[derive(Debug, Serialize)]
struct DocumentReport {
    source: String,
    counts: Counts,
    diagnostics: Vec<Diagnostic>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_documents(&self) -> anyhow::Result<Vec<Document>> {
        let mut documents = Vec::new();
        for source in resolve_file_path_patterns(&self.input)? {
            let label = source.display().to_string();
            let text = read_source(&source)?;
            let parsed = if self.ndjson {
                parse_ndjson(&text).with_context(|| format!("failed to parse NDJSON source ({label})"))?
            } else {
                let value = from_str_with_path::<Value>(&text)
                    .with_context(|| format!("failed to parse JSON source ({label})"))?;
                vec![value]
            };

            let multiple = parsed.len() > 1;
            for (line, value) in parsed.into_iter().enumerate() {
                let label = if multiple { format!("{label}:{}", line + 1) } else { label.clone() };
                let value = self.select(value, &label)?;
                self.preprocess(value, &label, &mut documents)?;
            }
        }
        Ok(documents)
    }

    fn select(&self, value: Value, label: &str) -> anyhow::Result<Value> {
        match self.json_pointer.as_deref() {
            None => Ok(value),
            Some(pointer) => match value.pointer(pointer) {
                Some(selected) => Ok(selected.clone()),
                None => bail!("json pointer {pointer} does not resolve in {label}"),
            },
        }
    }

    fn preprocess(&self, value: Value, label: &str, documents: &mut Vec<Document>) -> anyhow::Result<()> {
        match self.jq_expr.as_ref() {
            None => documents.push(Document { source: label.to_string(), value }),
            Some(jq_expr) => {
                let outputs = crate::jq_exec::apply_filter(jq_expr, &value)
                    .with_context(|| format!("failed to apply jq expression to {label}"))?;
                let multiple = outputs.len() > 1;
                for (index, value) in outputs.into_iter().enumerate() {
                    let source = if multiple { format!("{label}#{index}") } else { label.to_string() };
                    documents.push(Document { source, value });
                }
            }
        }
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<ExitCode> {
        if self.no_color {
            colored::control::set_override(false);
        }
        match &self.cmd {
            Command::Validate(target) => target.run(),
            Command::Eval(target) => target.run(),
            Command::Render(target) => target.run(),
            Command::Form(target) => target.run(),
        }
    }
}

impl ValidateOut {
    fn run(&self) -> anyhow::Result<ExitCode> {
        let registry = StaticRegistry::from_path(&self.registry)
            .with_context(|| format!("failed to load registry {}", self.registry.display()))?;
        let documents = self.input_settings.load_documents()?;
        tracing::debug!(documents = documents.len(), components = registry.len(), "validating");

        let options = PipelineOptions {
            include_suggestions: !self.no_suggestions,
            max_nesting_depth: self.max_depth,
            ..PipelineOptions::default()
        };
        let mut pipeline = ValidationPipeline::standard().with_options(options);
        if self.relational {
            pipeline.add_stage(Box::new(RelationalStage))?;
        }

        let reports: Vec<DocumentReport> = documents
            .par_iter()
            .map(|document| {
                let output = pipeline.run(&document.value, &registry);
                DocumentReport {
                    source: document.source.clone(),
                    counts: output.counts(),
                    diagnostics: output.diagnostics,
                }
            })
            .collect();

        let rendered = match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&reports)?,
            OutputFormat::Text => {
                let mut text = String::new();
                for report in &reports {
                    text.push_str(&format!("==> {} <==\n", report.source));
                    text.push_str(&render_report(&report.diagnostics));
                    text.push('\n');
                }
                text
            }
        };
        write_output(self.out.as_deref(), &rendered)?;

        let failed = reports
            .iter()
            .any(|r| r.counts.errors > 0 || (self.deny_warnings && r.counts.warnings > 0));
        Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
    }
}

impl EvalOut {
    fn run(&self) -> anyhow::Result<ExitCode> {
        let state = read_optional_json(self.state.as_deref())?;
        let props = self.props.as_deref().map(read_json_file).transpose()?;
        let mut ctx = EvalContext::new(&state);
        if let Some(props) = props.as_ref() {
            ctx = ctx.with_props(props);
        }
        let value = try_evaluate(&self.expr, &ctx).with_context(|| format!("invalid expression `{}`", self.expr))?;
        if self.condition {
            println!("{}", value.is_truthy());
        } else {
            println!("{value}");
        }
        Ok(ExitCode::SUCCESS)
    }
}

impl RenderOut {
    fn run(&self) -> anyhow::Result<ExitCode> {
        let document = read_json_file(&self.input)?;
        let state = read_optional_json(self.state.as_deref())?;
        let (root, _) = unwrap_page(&document);
        let node = Node::from_value(root).with_context(|| format!("invalid specification {}", self.input.display()))?;
        let projected = uispec::conditional::project(&node, &state);
        write_output(self.out.as_deref(), &serde_json::to_string_pretty(&projected)?)?;
        Ok(ExitCode::SUCCESS)
    }
}

impl FormOut {
    fn run(&self) -> anyhow::Result<ExitCode> {
        let document = read_json_file(&self.input)?;
        let form = match self.json_pointer.as_deref() {
            None => unwrap_page(&document).0,
            Some(pointer) => document
                .pointer(pointer)
                .with_context(|| format!("json pointer {pointer} does not resolve"))?,
        };
        let values = read_json_file(&self.values)?;

        let rules = extract_validation_spec(form)?;
        let validator = FormValidator::new(rules)?;
        let result = validator.validate_form(&values);
        println!("{}", serde_json::to_string_pretty(&result)?);
        Ok(if result.is_valid { ExitCode::SUCCESS } else { ExitCode::FAILURE })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            // literal path, or `-` for stdin
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text).context("failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read source file {}", path.display()))
}

fn parse_ndjson(text: &str) -> anyhow::Result<Vec<Value>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| from_str_with_path::<Value>(line).with_context(|| format!("line {}", i + 1)))
        .collect()
}

fn read_json_file(path: &Path) -> anyhow::Result<Value> {
    let text = read_source(path)?;
    from_str_with_path::<Value>(&text).with_context(|| format!("failed to parse JSON source ({})", path.display()))
}

fn read_optional_json(path: Option<&Path>) -> anyhow::Result<Value> {
    match path {
        Some(path) => read_json_file(path),
        None => Ok(Value::Object(Default::default())),
    }
}

fn write_output(out: Option<&Path>, contents: &str) -> anyhow::Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, contents).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            print!("{contents}");
            if !contents.ends_with('\n') {
                println!();
            }
            Ok(())
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
