//! Resources shipped inside the binary.
//!
//! The factory-default metadata and the structural schemas are embedded at build
//! time from `./resources/`, so they are always available regardless of where
//! the binary is installed.

use crate::error::{MetadataError, MetadataResult};
use serde_json::Value;

/// Label under which the factory defaults appear in source listings.
pub const FACTORY_DEFAULTS_LABEL: &str = "<bundled>/default.yml";

/// Factory-default metadata, the lowest-priority layer of every load.
pub const DEFAULT_METADATA: &str = include_str!("../../resources/default.yml");

/// Name of the schema every resolved profile is checked against.
pub const TOP_SCHEMA: &str = "top.yml";

/// Bundled schemas by file name.
const SCHEMAS: &[(&str, &str)] = &[(
    TOP_SCHEMA,
    include_str!("../../resources/schemas/top.yml"),
)];

/// Names of all bundled schemas.
pub fn schema_names() -> impl Iterator<Item = &'static str> {
    SCHEMAS.iter().map(|(name, _)| *name)
}

/// Raw text of a bundled schema.
pub fn schema_source(name: &str) -> Option<&'static str> {
    SCHEMAS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, content)| *content)
}

/// Parse a bundled schema into a value.
pub fn schema(name: &str) -> MetadataResult<Value> {
    let source = schema_source(name).ok_or_else(|| {
        MetadataError::invalid_schema(
            name,
            format!(
                "no bundled schema with that name (available: {})",
                schema_names().collect::<Vec<_>>().join(", ")
            ),
        )
    })?;
    serde_yaml::from_str(source).map_err(|e| MetadataError::invalid_schema(name, e))
}
