//! Template rendering of metadata documents.
//!
//! A document is its own variable namespace: `{{ engine.master }}` anywhere in
//! the document resolves against the document itself. Because a referenced value
//! may itself contain an expression, rendering repeats until a pass changes
//! nothing (a fixed point) or the pass budget runs out.
//!
//! The expression language is pluggable through [`Evaluator`]. The default,
//! [`JinjaEvaluator`], speaks Jinja2. Undefined names render as an empty
//! string, and two helpers are available as globals:
//!
//! - `env(key, default=none)` - an environment variable, or `default` when unset
//! - `now(tz=none, format="%Y-%m-%d %H:%M:%S")` - the current time in IANA zone
//!   `tz` (UTC when omitted), formatted with strftime `format`
//!
//! Arguments may be positional or named: `{{ env('HOME') }}`,
//! `{{ now(tz='Europe/Amsterdam', format='%Y%m%d') }}`.

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::{MetadataError, MetadataResult};
use anyhow::{Context as _, Result, anyhow};
use chrono::Utc;
use chrono_tz::Tz;
use minijinja::value::Kwargs;
use minijinja::{AutoEscape, Environment, ErrorKind, UndefinedBehavior};
use serde_json::{Map, Value};
use std::fmt::Write as _;
use std::path::Path;
use tracing::{debug, warn};

/// Default number of rendering passes.
pub const DEFAULT_MAX_PASSES: usize = 5;

/// Default format of the `now()` helper.
pub const DEFAULT_NOW_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// An expression language that can evaluate template strings.
pub trait Evaluator {
    /// Prepared variable namespace, built once per pass.
    type Context;

    /// Build the namespace expressions are evaluated against.
    fn context(&self, document: &Value) -> Result<Self::Context>;

    /// Evaluate every expression embedded in `template`.
    fn evaluate(&self, template: &str, context: &Self::Context) -> Result<String>;
}

/// Jinja2 evaluator with the `env` and `now` helpers registered.
#[derive(Clone)]
pub struct JinjaEvaluator {
    env: Environment<'static>,
}

impl JinjaEvaluator {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Lenient);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_function("env", env_function);
        env.add_function("now", now_function);
        Self { env }
    }

    /// Access the underlying environment, e.g. to register extra filters.
    pub fn environment_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }
}

impl Default for JinjaEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator for JinjaEvaluator {
    type Context = minijinja::Value;

    fn context(&self, document: &Value) -> Result<minijinja::Value> {
        Ok(minijinja::Value::from_serialize(document))
    }

    fn evaluate(&self, template: &str, context: &minijinja::Value) -> Result<String> {
        self.env
            .render_str(template, context)
            .map_err(|e| anyhow!("{}", e))
    }
}

/// `env(key, default=none)`
fn env_function(
    key: Option<String>,
    default: Option<minijinja::Value>,
    kwargs: Kwargs,
) -> Result<minijinja::Value, minijinja::Error> {
    let key = match key {
        Some(key) => key,
        None => kwargs
            .get::<Option<String>>("key")?
            .ok_or_else(|| {
                minijinja::Error::new(ErrorKind::MissingArgument, "env() requires a `key` argument")
            })?,
    };
    let default = match default {
        Some(default) => Some(default),
        None => kwargs.get::<Option<minijinja::Value>>("default")?,
    };
    kwargs.assert_all_used()?;

    match std::env::var(&key) {
        Ok(value) => Ok(minijinja::Value::from(value)),
        Err(_) => Ok(default.unwrap_or(minijinja::Value::UNDEFINED)),
    }
}

/// `now(tz=none, format="%Y-%m-%d %H:%M:%S")`
fn now_function(
    tz: Option<String>,
    format: Option<String>,
    kwargs: Kwargs,
) -> Result<String, minijinja::Error> {
    let tz = match tz {
        Some(tz) => Some(tz),
        None => kwargs.get::<Option<String>>("tz")?,
    };
    let format = match format {
        Some(format) => Some(format),
        None => kwargs.get::<Option<String>>("format")?,
    };
    kwargs.assert_all_used()?;

    format_now(tz.as_deref(), format.as_deref().unwrap_or(DEFAULT_NOW_FORMAT))
        .map_err(|e| minijinja::Error::new(ErrorKind::InvalidOperation, e.to_string()))
}

/// Current time in the given IANA timezone (UTC when `None`).
pub fn format_now(tz: Option<&str>, format: &str) -> Result<String> {
    let tz: Tz = match tz {
        Some(name) => name
            .parse()
            .map_err(|e| anyhow!("unknown timezone '{}': {}", name, e))?,
        None => Tz::UTC,
    };

    let mut out = String::new();
    write!(out, "{}", Utc::now().with_timezone(&tz).format(format))
        .map_err(|_| anyhow!("invalid time format '{}'", format))?;
    Ok(out)
}

/// Whether a string contains template syntax worth evaluating.
pub fn has_expression(text: &str) -> bool {
    text.contains("{{") || text.contains("{%") || text.contains("{#")
}

/// Result of rendering a document.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub metadata: Value,
    /// Evaluation passes performed, never more than the budget.
    pub passes: usize,
    /// False when the pass budget ran out before a fixed point.
    pub converged: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Render a document with the default evaluator.
///
/// Variables from `dotenv_path` are loaded into the process environment first
/// if the file exists; variables already set are not overridden.
pub fn render(
    metadata: &Value,
    dotenv_path: Option<&Path>,
    max_passes: usize,
) -> MetadataResult<Value> {
    render_with_dotenv(metadata, dotenv_path, max_passes).map(|outcome| outcome.metadata)
}

/// Like [`render`], returning the full outcome.
pub fn render_with_dotenv(
    metadata: &Value,
    dotenv_path: Option<&Path>,
    max_passes: usize,
) -> MetadataResult<RenderOutcome> {
    let dotenv_diagnostic = dotenv_path.and_then(load_dotenv);

    let mut outcome = render_with(metadata, &JinjaEvaluator::new(), max_passes)?;
    if let Some(diagnostic) = dotenv_diagnostic {
        outcome.diagnostics.insert(0, diagnostic);
    }
    Ok(outcome)
}

/// Load a dotenv file into the process environment.
///
/// A missing file is ignored; a file that fails to load yields a diagnostic.
pub fn load_dotenv(path: &Path) -> Option<Diagnostic> {
    if !path.is_file() {
        debug!(path = %path.display(), "No dotenv file, skipping");
        return None;
    }

    match dotenvy::from_path(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Loaded dotenv file");
            None
        }
        Err(e) => Some(
            Diagnostic::warning(
                DiagnosticKind::DotenvFailed,
                format!("Failed to load dotenv file: {}", e),
            )
            .with_source(path.display().to_string())
            .emitted(),
        ),
    }
}

/// Render a document to a fixed point with a given evaluator.
///
/// Each pass evaluates every string against the document as it stood at the
/// start of the pass. Rendering stops at the first pass that changes nothing,
/// or after `max_passes` passes. Running out of passes is not an error: the
/// last state is returned with `converged == false`.
pub fn render_with<E: Evaluator>(
    metadata: &Value,
    evaluator: &E,
    max_passes: usize,
) -> MetadataResult<RenderOutcome> {
    let mut current = metadata.clone();
    let mut passes = 0;
    let mut converged = false;

    while passes < max_passes {
        passes += 1;
        let context = evaluator
            .context(&current)
            .map_err(|e| MetadataError::render_failed("", &e))?;
        let rendered = render_value(&current, evaluator, &context, &mut String::new())?;

        if rendered == current {
            converged = true;
            break;
        }
        current = rendered;
    }

    let mut diagnostics = Vec::new();
    if converged {
        debug!(passes, "Rendering reached a fixed point");
    } else {
        warn!(passes, "Rendering did not reach a fixed point");
        diagnostics.push(Diagnostic::warning(
            DiagnosticKind::NotConverged,
            format!(
                "metadata still changing after {} rendering passes; \
                 returning the last rendered state (cyclic template reference?)",
                passes
            ),
        ));
    }

    Ok(RenderOutcome {
        metadata: current,
        passes,
        converged,
        diagnostics,
    })
}

fn render_value<E: Evaluator>(
    value: &Value,
    evaluator: &E,
    context: &E::Context,
    path: &mut String,
) -> MetadataResult<Value> {
    match value {
        Value::String(text) => {
            render_string(text, evaluator, context, path).map(Value::String)
        }
        Value::Array(items) => {
            let mut rendered = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let len = push_segment(path, &index.to_string());
                rendered.push(render_value(item, evaluator, context, path)?);
                path.truncate(len);
            }
            Ok(Value::Array(rendered))
        }
        Value::Object(map) => {
            let mut rendered = Map::with_capacity(map.len());
            for (key, item) in map {
                let len = push_segment(path, key);
                let key = render_string(key, evaluator, context, path)?;
                let item = render_value(item, evaluator, context, path)?;
                path.truncate(len);
                rendered.insert(key, item);
            }
            Ok(Value::Object(rendered))
        }
        other => Ok(other.clone()),
    }
}

fn render_string<E: Evaluator>(
    text: &str,
    evaluator: &E,
    context: &E::Context,
    path: &str,
) -> MetadataResult<String> {
    if !has_expression(text) {
        return Ok(text.to_string());
    }
    evaluator
        .evaluate(text, context)
        .with_context(|| format!("template `{}`", text))
        .map_err(|e| MetadataError::render_failed(path, &e))
}

/// Append a JSON-pointer segment, returning the length to truncate back to.
fn push_segment(path: &mut String, segment: &str) -> usize {
    let len = path.len();
    path.push('/');
    path.push_str(&segment.replace('~', "~0").replace('/', "~1"));
    len
}
