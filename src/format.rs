//! Output formatting for resolved metadata and diagnostics.

use crate::diagnostics::Diagnostic;
use crate::metadata::MetadataSource;
use anyhow::Result;
use clap::ValueEnum;
use serde_json::Value;

/// Output format for resolved metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    #[value(alias = "yml")]
    Yaml,
    Json,
}

/// Serialize metadata in the requested format.
pub fn format_metadata(metadata: &Value, format: OutputFormat) -> Result<String> {
    let mut out = match format {
        OutputFormat::Yaml => serde_yaml::to_string(metadata)?,
        OutputFormat::Json => serde_json::to_string_pretty(metadata)?,
    };
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

/// One line per diagnostic, prefixed with its severity.
pub fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    let mut out = String::new();
    for diagnostic in diagnostics {
        out.push_str(&format!(
            "{}: [{}] {}\n",
            diagnostic.severity, diagnostic.kind, diagnostic
        ));
    }
    out
}

/// Sources and the profiles found in them.
pub fn format_profiles<'a>(
    sources: &[MetadataSource],
    profiles: impl IntoIterator<Item = &'a str>,
) -> String {
    let mut out = String::from("Sources:\n");
    for source in sources {
        if source.exists() {
            out.push_str(&format!("  - {}\n", source));
        } else {
            out.push_str(&format!("  - {} (not found)\n", source));
        }
    }

    out.push_str("\nProfiles:\n");
    for profile in profiles {
        out.push_str(&format!("  - {}\n", profile));
    }
    out
}
