//! Fixture runner: validates every `fixtures/cases/*.json` document against
//! `fixtures/registry.json` and compares the diagnostics with the case's
//! expectations.
//!
//! ```text
//! cargo run -p dev-test-runner [-- <case-name-regex>]
//! ```
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use uispec::diagnostic::{Severity, StageKind};
use uispec::pipeline::{RelationalStage, ValidationPipeline};
use uispec::registry::StaticRegistry;

static FIXTURES: Lazy<PathBuf> = Lazy::new(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures"));

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Case {
    #[serde(default)]
    description: Option<String>,
    spec: Value,
    #[serde(default)]
    relational: bool,
    expect: Vec<Expected>,
}

#[derive(Debug, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
struct Expected {
    severity: Severity,
    stage: StageKind,
    /// Dotted path, `(root)` for the root node.
    path: String,
}

fn main() -> ExitCode {
    let filter = match std::env::args().nth(1).map(|src| Regex::new(&src)).transpose() {
        Ok(filter) => filter,
        Err(error) => {
            eprintln!("invalid case filter: {error}");
            return ExitCode::from(2);
        }
    };

    let registry = match StaticRegistry::from_path(FIXTURES.join("registry.json")) {
        Ok(registry) => registry,
        Err(error) => {
            eprintln!("failed to load fixture registry: {error}");
            return ExitCode::from(2);
        }
    };

    let mut cases = match case_paths() {
        Ok(paths) => paths,
        Err(error) => {
            eprintln!("failed to list fixture cases: {error}");
            return ExitCode::from(2);
        }
    };
    cases.sort();

    let (mut passed, mut failed) = (0usize, 0usize);
    for path in cases {
        let name = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        if filter.as_ref().is_some_and(|re| !re.is_match(&name)) {
            continue;
        }
        match run_case(&path, &registry) {
            Ok(()) => {
                passed += 1;
                eprintln!("✅ {name}");
            }
            Err(report) => {
                failed += 1;
                eprintln!("❌ {name}\n{report}");
            }
        }
    }

    eprintln!("—— {passed} passed, {failed} failed ——");
    if failed > 0 { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

fn case_paths() -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(FIXTURES.join("cases"))? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path);
        }
    }
    Ok(out)
}

fn run_case(path: &Path, registry: &StaticRegistry) -> Result<(), String> {
    let source = std::fs::read_to_string(path).map_err(|e| format!("   read error: {e}"))?;
    let de = &mut serde_json::Deserializer::from_str(&source);
    let case: Case =
        serde_path_to_error::deserialize(de).map_err(|e| format!("   malformed case at {}: {}", e.path(), e.inner()))?;

    let mut pipeline = ValidationPipeline::standard();
    if case.relational {
        pipeline.add_stage(Box::new(RelationalStage)).map_err(|e| format!("   {e}"))?;
    }
    let output = pipeline.run(&case.spec, registry);

    let actual: BTreeSet<(Severity, StageKind, String)> = output
        .diagnostics
        .iter()
        .map(|d| (d.severity, d.stage, d.path.to_string()))
        .collect();
    let expected: BTreeSet<(Severity, StageKind, String)> =
        case.expect.into_iter().map(|e| (e.severity, e.stage, e.path)).collect();

    if actual == expected {
        return Ok(());
    }

    let mut report = String::new();
    if let Some(description) = case.description {
        report.push_str(&format!("   {description}\n"));
    }
    for (severity, stage, at) in expected.difference(&actual) {
        report.push_str(&format!("   missing:    {} {} at {at}\n", stage.label(), severity.label()));
    }
    for (severity, stage, at) in actual.difference(&expected) {
        let message = output
            .diagnostics
            .iter()
            .find(|d| d.severity == *severity && d.stage == *stage && d.path.to_string() == *at)
            .map(|d| d.message.as_str())
            .unwrap_or_default();
        report.push_str(&format!("   unexpected: {} {} at {at}: {message}\n", stage.label(), severity.label()));
    }
    Err(report)
}
