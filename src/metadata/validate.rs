//! Validation of rendered metadata.
//!
//! Two tiers: a structural check against a JSON schema (fatal on violation),
//! then semantic cross-reference checks that only produce diagnostics.

use super::bundled::{self, TOP_SCHEMA};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::{MetadataError, MetadataResult};
use serde_json::Value;
use tracing::debug;

/// Validate rendered metadata against the bundled top-level schema, then run
/// the semantic checks.
///
/// Returns the semantic diagnostics; a schema violation is an error.
pub fn validate(metadata: &Value) -> MetadataResult<Vec<Diagnostic>> {
    validate_bundled(metadata, TOP_SCHEMA)?;
    Ok(check_semantics(metadata))
}

/// Validate against one of the bundled schemas, by file name.
pub fn validate_bundled(metadata: &Value, schema_name: &str) -> MetadataResult<()> {
    let schema = bundled::schema(schema_name)?;
    validate_against(metadata, &schema)
}

/// Validate against an arbitrary JSON schema.
///
/// On failure the error message carries the violation, the offending instance
/// path, the schema path of the violated rule, and the enclosing sub-schema
/// rendered as YAML.
pub fn validate_against(metadata: &Value, schema: &Value) -> MetadataResult<()> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| MetadataError::invalid_schema("definition", e))?;

    let mut errors = validator.iter_errors(metadata);
    let Some(error) = errors.next() else {
        debug!("Metadata satisfies schema");
        return Ok(());
    };

    let instance_path = error.instance_path.to_string();
    let schema_path = error.schema_path.to_string();
    let mut message = format!(
        "{} \n\n## instance path:\n'{}'\n\n## schema path:\n'{}'\n\n",
        error, instance_path, schema_path
    );

    if let Some(definition) = enclosing_schema(schema, &schema_path) {
        let parent = if instance_path.is_empty() {
            String::new()
        } else {
            format!("for {} ", instance_path)
        };
        message.push_str(&format!("## metadata schema definition {}:\n", parent));
        message.push_str(&serde_yaml::to_string(definition).unwrap_or_else(|_| definition.to_string()));
    }

    let others = errors.count();
    if others > 0 {
        message.push_str(&format!("\n({} more violation(s) not shown)\n", others));
    }

    Err(MetadataError::schema_violation(message).with_path(schema_path))
}

/// The sub-schema holding the keyword at `schema_path`.
fn enclosing_schema<'a>(schema: &'a Value, schema_path: &str) -> Option<&'a Value> {
    let parent = schema_path
        .rsplit_once('/')
        .map(|(parent, _)| parent)
        .unwrap_or("");
    schema.pointer(parent)
}

/// Cross-reference checks that a schema cannot express.
///
/// Every resource naming a `provider` must name a key of `providers`. A
/// mismatch is reported, never raised.
pub fn check_semantics(metadata: &Value) -> Vec<Diagnostic> {
    let providers = metadata.get("providers").and_then(Value::as_object);
    let Some(resources) = metadata.get("resources").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut diagnostics = Vec::new();
    for (alias, resource) in resources {
        let Some(provider) = resource.get("provider").and_then(Value::as_str) else {
            continue;
        };
        let known = providers.is_some_and(|p| p.contains_key(provider));
        if !known {
            diagnostics.push(
                Diagnostic::warning(
                    DiagnosticKind::UnknownProvider,
                    format!(
                        "resource {}: given provider \"{}\" does not match any metadata provider",
                        alias, provider
                    ),
                )
                .emitted(),
            );
        }
    }
    diagnostics
}
