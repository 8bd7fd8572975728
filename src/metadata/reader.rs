//! Reading multi-document YAML sources into a profile set.
//!
//! Documents are grouped by their `profile` field and deep-merged within a
//! profile in source order: later files override earlier ones, and within a
//! file later documents override earlier ones.

use super::bundled::{DEFAULT_METADATA, FACTORY_DEFAULTS_LABEL};
use super::merge::deep_merge;
use super::{DEFAULT_PROFILE, PROFILE_KEY};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a layer of metadata comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataSource {
    /// A file on disk; skipped silently if it does not exist.
    File(PathBuf),
    /// Text embedded in the binary.
    Embedded {
        label: &'static str,
        content: &'static str,
    },
}

impl MetadataSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        MetadataSource::File(path.into())
    }

    /// The bundled factory-default metadata.
    pub fn factory_defaults() -> Self {
        MetadataSource::Embedded {
            label: FACTORY_DEFAULTS_LABEL,
            content: DEFAULT_METADATA,
        }
    }

    /// Human-readable label used in diagnostics and error listings.
    pub fn label(&self) -> String {
        match self {
            MetadataSource::File(path) => path.display().to_string(),
            MetadataSource::Embedded { label, .. } => label.to_string(),
        }
    }

    /// Whether the source can contribute documents at all.
    pub fn exists(&self) -> bool {
        match self {
            MetadataSource::File(path) => path.is_file(),
            MetadataSource::Embedded { .. } => true,
        }
    }
}

impl std::fmt::Display for MetadataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Profile name to merged document, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileSet {
    profiles: IndexMap<String, Value>,
}

impl ProfileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.profiles.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.profiles.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// Profile names in first-seen order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.profiles.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Value)> {
        self.profiles.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Replace a profile outright.
    pub fn insert(&mut self, name: impl Into<String>, document: Value) -> Option<Value> {
        self.profiles.insert(name.into(), document)
    }

    /// Fold a document into a profile, the document overriding what is there.
    pub fn merge_document(&mut self, name: impl Into<String>, document: Value) {
        let name = name.into();
        match self.profiles.get_mut(&name) {
            Some(existing) => {
                let base = std::mem::take(existing);
                *existing = deep_merge(base, document);
            }
            None => {
                self.profiles.insert(name, document);
            }
        }
    }

    /// Consume the set and take one profile.
    pub fn into_profile(mut self, name: &str) -> Option<Value> {
        self.profiles.swap_remove(name)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ProfileSet {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            profiles: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl IntoIterator for ProfileSet {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.profiles.into_iter()
    }
}

/// Result of reading a list of sources.
#[derive(Debug, Clone, Default)]
pub struct ReadOutcome {
    pub profiles: ProfileSet,
    /// Non-fatal problems found while reading, in encounter order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Read metadata files into a profile set.
///
/// Missing paths are skipped silently. Files that fail to read or parse
/// contribute nothing and are reported in [`ReadOutcome::diagnostics`].
pub fn read<P: AsRef<Path>>(file_paths: &[P]) -> ReadOutcome {
    let sources: Vec<MetadataSource> = file_paths
        .iter()
        .map(|p| MetadataSource::file(p.as_ref()))
        .collect();
    read_sources(&sources)
}

/// Read arbitrary sources (files or embedded text) into a profile set.
pub fn read_sources(sources: &[MetadataSource]) -> ReadOutcome {
    let mut outcome = ReadOutcome::default();

    for source in sources {
        let label = source.label();

        let text = match source {
            MetadataSource::File(path) => {
                if !path.is_file() {
                    debug!(source = %label, "Metadata file not found, skipping");
                    continue;
                }
                match std::fs::read_to_string(path) {
                    Ok(text) => text,
                    Err(e) => {
                        outcome.diagnostics.push(
                            Diagnostic::error(
                                DiagnosticKind::UnreadableFile,
                                format!("Error reading yml file: {}: skipping file", e),
                            )
                            .with_source(&label)
                            .emitted(),
                        );
                        continue;
                    }
                }
            }
            MetadataSource::Embedded { content, .. } => content.to_string(),
        };

        let documents = match parse_documents(&text) {
            Ok(documents) => documents,
            Err(e) => {
                let mut diagnostic = Diagnostic::error(
                    DiagnosticKind::ParseFailure,
                    format!("Error loading yml file: {}: skipping file", e),
                )
                .with_source(&label);
                if let Some(location) = e.location() {
                    diagnostic = diagnostic.with_position(location.line(), location.column());
                }
                outcome.diagnostics.push(diagnostic.emitted());
                continue;
            }
        };

        debug!(source = %label, documents = documents.len(), "Read metadata source");

        for (index, document) in documents.into_iter().enumerate() {
            fold_document(&mut outcome, document, &label, index);
        }
    }

    outcome
}

/// Parse a YAML stream into its documents.
///
/// Anchors are resolved and `<<` merge keys applied. All-or-nothing: a
/// syntax error anywhere discards the whole stream.
pub fn parse_documents(text: &str) -> Result<Vec<Value>, serde_yaml::Error> {
    serde_yaml::Deserializer::from_str(text)
        .map(|document| {
            let mut yaml = serde_yaml::Value::deserialize(document)?;
            yaml.apply_merge()?;
            yaml_to_json(yaml)
        })
        .collect()
}

fn yaml_to_json(yaml: serde_yaml::Value) -> Result<Value, serde_yaml::Error> {
    use serde_yaml::Value as Yaml;

    Ok(match yaml {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut map = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                map.insert(mapping_key(key)?, yaml_to_json(value)?);
            }
            Value::Object(map)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

/// Non-string keys (`1:`, `true:`) keep their YAML spelling.
fn mapping_key(key: serde_yaml::Value) -> Result<String, serde_yaml::Error> {
    match key {
        serde_yaml::Value::String(s) => Ok(s),
        other => Ok(serde_yaml::to_string(&other)?.trim_end().to_string()),
    }
}

fn fold_document(outcome: &mut ReadOutcome, document: Value, label: &str, index: usize) {
    let mut map = match document {
        Value::Object(map) => map,
        Value::Null => return,
        other => {
            outcome.diagnostics.push(
                Diagnostic::warning(
                    DiagnosticKind::InvalidDocument,
                    format!(
                        "document {} is a {}, not a mapping: skipping document",
                        index + 1,
                        type_name(&other)
                    ),
                )
                .with_source(label)
                .emitted(),
            );
            return;
        }
    };

    let profile = match map.get(PROFILE_KEY) {
        None | Some(Value::Null) => DEFAULT_PROFILE.to_string(),
        Some(Value::String(name)) => name.clone(),
        Some(other) => {
            outcome.diagnostics.push(
                Diagnostic::warning(
                    DiagnosticKind::InvalidDocument,
                    format!(
                        "document {} has a {} `{}` field, expected a string: skipping document",
                        index + 1,
                        type_name(other),
                        PROFILE_KEY
                    ),
                )
                .with_source(label)
                .emitted(),
            );
            return;
        }
    };

    map.insert(PROFILE_KEY.to_string(), Value::String(profile.clone()));
    outcome.profiles.merge_document(profile, Value::Object(map));
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_same_profile_documents_merge_in_order() {
        let temp = TempDir::new().unwrap();
        let path = write(
            &temp,
            "md.yml",
            "---\nprofile: x\na: 1\n---\nprofile: x\nb: 2\n",
        );

        let outcome = read(&[path]);
        assert!(outcome.diagnostics.is_empty());
        assert_eq!(
            outcome.profiles.get("x"),
            Some(&json!({"profile": "x", "a": 1, "b": 2}))
        );
    }

    #[test]
    fn test_missing_profile_is_default() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "md.yml", "a: 1\n");

        let outcome = read(&[path]);
        assert_eq!(
            outcome.profiles.get(DEFAULT_PROFILE),
            Some(&json!({"a": 1, "profile": "default"}))
        );
    }

    #[test]
    fn test_later_files_override_earlier() {
        let temp = TempDir::new().unwrap();
        let first = write(&temp, "a.yml", "engine:\n  type: spark\n  master: local\n");
        let second = write(&temp, "b.yml", "engine:\n  master: yarn\n");

        let outcome = read(&[first, second]);
        let default = outcome.profiles.get(DEFAULT_PROFILE).unwrap();
        assert_eq!(default["engine"], json!({"type": "spark", "master": "yarn"}));
    }

    #[test]
    fn test_nonexistent_paths_skipped_silently() {
        let temp = TempDir::new().unwrap();
        let present = write(&temp, "a.yml", "a: 1\n");
        let missing = temp.path().join("missing.yml");

        let outcome = read(&[missing, present, temp.path().to_path_buf()]);
        assert!(outcome.diagnostics.is_empty());
        assert_eq!(outcome.profiles.len(), 1);
    }

    #[test]
    fn test_parse_failure_skips_file_and_reports_position() {
        let temp = TempDir::new().unwrap();
        let good = write(&temp, "good.yml", "a: 1\n");
        let bad = write(&temp, "bad.yml", "---\nb: 2\n---\nc: [unclosed\nd: 4\n");

        let outcome = read(&[bad.clone(), good]);
        assert_eq!(outcome.profiles.get(DEFAULT_PROFILE).unwrap()["a"], 1);
        // Documents before the syntax error are discarded too.
        assert!(outcome.profiles.get(DEFAULT_PROFILE).unwrap().get("b").is_none());

        assert_eq!(outcome.diagnostics.len(), 1);
        let diag = &outcome.diagnostics[0];
        assert_eq!(diag.kind, DiagnosticKind::ParseFailure);
        assert_eq!(diag.source.as_deref(), Some(bad.display().to_string().as_str()));
        assert!(diag.line.is_some());
    }

    #[test]
    fn test_non_mapping_document_skipped() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "md.yml", "---\n- 1\n- 2\n---\na: 1\n");

        let outcome = read(&[path]);
        assert_eq!(outcome.profiles.len(), 1);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::InvalidDocument);
    }

    #[test]
    fn test_non_string_profile_skipped() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "md.yml", "profile: [a, b]\nx: 1\n");

        let outcome = read(&[path]);
        assert!(outcome.profiles.is_empty());
        assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::InvalidDocument);
    }

    #[test]
    fn test_anchors_and_merge_keys_are_applied() {
        let docs = parse_documents(
            "base: &b\n  service: file\n  path: /data\nproviders:\n  local:\n    <<: *b\n    path: /mnt\n  copy: *b\n",
        )
        .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(
            docs[0]["providers"],
            json!({
                "local": {"service": "file", "path": "/mnt"},
                "copy": {"service": "file", "path": "/data"}
            })
        );
    }

    #[test]
    fn test_non_string_keys_keep_yaml_spelling() {
        let docs = parse_documents("ports:\n  8080: web\n  true: yes\n").unwrap();
        assert_eq!(docs[0]["ports"], json!({"8080": "web", "true": "yes"}));
    }

    #[test]
    fn test_empty_input_yields_empty_set() {
        let outcome = read::<PathBuf>(&[]);
        assert!(outcome.profiles.is_empty());
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_profiles_keep_first_seen_order() {
        let temp = TempDir::new().unwrap();
        let path = write(
            &temp,
            "md.yml",
            "---\nprofile: zeta\n---\nprofile: alpha\n---\nprofile: zeta\nk: v\n",
        );

        let outcome = read(&[path]);
        let names: Vec<&str> = outcome.profiles.names().collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_embedded_factory_defaults() {
        let outcome = read_sources(&[MetadataSource::factory_defaults()]);
        let default = outcome.profiles.get(DEFAULT_PROFILE).unwrap();
        assert_eq!(default["engine"]["type"], "spark");
    }
}
