//! Integration tests for template rendering.
//!
//! Covers the dotenv hand-off into `env()`, the `now()` helper, and custom
//! evaluators plugged into the fixed-point loop. Environment variables only
//! enter the process through dotenv files, with names unique per test since
//! tests share one process.

use anyhow::Result;
use datalab_metadata::metadata::{
    Evaluator, LoadOptions, MetadataLoader, render, render_with, render_with_dotenv,
};
use datalab_metadata::{DiagnosticKind, ErrorCode};
use serde_json::{Value, json};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_dotenv_values_visible_to_env_helper() {
    let temp = TempDir::new().unwrap();
    let dotenv = temp.path().join(".env");
    fs::write(&dotenv, "DATALAB_IT_DOTENV_SECRET=s3cr3t\n").unwrap();

    let doc = json!({
        "password": "{{ env(key=\"DATALAB_IT_DOTENV_SECRET\") }}"
    });
    let rendered = render(&doc, Some(dotenv.as_path()), 5).unwrap();
    assert_eq!(rendered["password"], "s3cr3t");
}

#[test]
fn test_dotenv_does_not_override_existing_variables() {
    let temp = TempDir::new().unwrap();
    let first = temp.path().join("first.env");
    let second = temp.path().join("second.env");
    fs::write(&first, "DATALAB_IT_DOTENV_EXISTING=from-first\n").unwrap();
    fs::write(&second, "DATALAB_IT_DOTENV_EXISTING=from-second\n").unwrap();

    let doc = json!({"value": "{{ env('DATALAB_IT_DOTENV_EXISTING') }}"});
    let rendered = render(&doc, Some(first.as_path()), 5).unwrap();
    assert_eq!(rendered["value"], "from-first");

    // The variable is now set in the process, so the second file loses.
    let rendered = render(&doc, Some(second.as_path()), 5).unwrap();
    assert_eq!(rendered["value"], "from-first");
}

#[test]
fn test_missing_dotenv_is_ignored() {
    let temp = TempDir::new().unwrap();
    let doc = json!({"a": "plain"});
    let outcome = render_with_dotenv(&doc, Some(temp.path().join("nope.env").as_path()), 5).unwrap();
    assert_eq!(outcome.metadata, doc);
    assert!(outcome.diagnostics.is_empty());
}

#[test]
fn test_malformed_dotenv_is_diagnostic() {
    let temp = TempDir::new().unwrap();
    let dotenv = temp.path().join(".env");
    fs::write(&dotenv, "NOT A VALID LINE\n").unwrap();

    let outcome = render_with_dotenv(&json!({"a": 1}), Some(dotenv.as_path()), 5).unwrap();
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::DotenvFailed);
}

#[test]
fn test_env_helper_in_loaded_metadata() {
    let temp = TempDir::new().unwrap();
    let dotenv = temp.path().join(".env");
    fs::write(&dotenv, "DATALAB_IT_WAREHOUSE=/warehouse\n").unwrap();
    let metadata = temp.path().join("metadata.yml");
    fs::write(
        &metadata,
        r#"
providers:
  warehouse:
    service: file
    path: '{{ env("DATALAB_IT_WAREHOUSE", "/tmp") }}'
    scratch: '{{ env(key="DATALAB_IT_SCRATCH_UNSET", default="/tmp") }}'
"#,
    )
    .unwrap();

    let options = LoadOptions::default()
        .with_files([metadata])
        .with_dotenv(dotenv);
    let loader = MetadataLoader::load_with_options(options).unwrap();
    assert_eq!(loader.metadata()["providers"]["warehouse"]["path"], "/warehouse");
    assert_eq!(loader.metadata()["providers"]["warehouse"]["scratch"], "/tmp");
}

#[test]
fn test_undefined_reference_renders_empty_in_loaded_metadata() {
    let temp = TempDir::new().unwrap();
    let metadata = temp.path().join("metadata.yml");
    fs::write(
        &metadata,
        "engine:\n  master: '{{ variables.spark_master }}'\n  jobname: 'job-{{ variables.missing }}-x'\n",
    )
    .unwrap();

    let loader = MetadataLoader::load_with_options(LoadOptions::default().with_files([metadata]))
        .unwrap();
    assert_eq!(loader.metadata()["engine"]["master"], "");
    assert_eq!(loader.metadata()["engine"]["jobname"], "job--x");
    assert!(loader.converged());
}

#[test]
fn test_template_syntax_error_fails_render() {
    let doc = json!({"engine": {"master": "{{ variables.spark_master "}});
    let err = render(&doc, None, 5).unwrap_err();
    assert_eq!(err.code, ErrorCode::RenderFailed);
    assert_eq!(err.path.as_deref(), Some("/engine/master"));
}

#[test]
fn test_now_helper_with_timezone_and_format() {
    let doc = json!({
        "named": "{{ now(tz=\"Asia/Tokyo\", format=\"%z\") }}",
        "positional": "{{ now('Asia/Tokyo', '%z') }}"
    });
    let rendered = render(&doc, None, 5).unwrap();
    assert_eq!(rendered["named"], "+0900");
    assert_eq!(rendered["positional"], "+0900");
}

#[test]
fn test_unknown_timezone_fails_render() {
    let doc = json!({"stamp": "{{ now('Nowhere/Special') }}"});
    let err = render(&doc, None, 5).unwrap_err();
    assert_eq!(err.code, ErrorCode::RenderFailed);
    assert_eq!(err.path.as_deref(), Some("/stamp"));
}

#[test]
fn test_conditional_blocks_render() {
    let doc = json!({
        "debug": true,
        "severity": "{% if debug %}debug{% else %}info{% endif %}"
    });
    let rendered = render(&doc, None, 5).unwrap();
    assert_eq!(rendered["severity"], "debug");
}

/// Evaluator that upper-cases whatever sits between `{{` and `}}`.
struct Upper;

impl Evaluator for Upper {
    type Context = ();

    fn context(&self, _document: &Value) -> Result<()> {
        Ok(())
    }

    fn evaluate(&self, template: &str, _context: &()) -> Result<String> {
        Ok(template
            .trim_start_matches("{{")
            .trim_end_matches("}}")
            .trim()
            .to_uppercase())
    }
}

#[test]
fn test_custom_evaluator_is_swappable() {
    let doc = json!({"a": "{{ shout }}", "b": ["{{ x }}", "quiet"]});
    let outcome = render_with(&doc, &Upper, 5).unwrap();
    assert_eq!(outcome.metadata, json!({"a": "SHOUT", "b": ["X", "quiet"]}));
    assert_eq!(outcome.passes, 2);
    assert!(outcome.converged);
}
