//! Structured error types for metadata loading.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The requested profile does not exist in the merged profile set
    ProfileNotFound,

    /// Rendered metadata does not satisfy the structural schema
    SchemaViolation,
    /// A schema could not be found, parsed or compiled
    InvalidSchema,

    /// A template expression failed to evaluate
    RenderFailed,

    InternalError,
}

/// Structured error for metadata operations.
#[derive(Debug, Serialize)]
pub struct MetadataError {
    pub code: ErrorCode,
    pub message: String,
    /// JSON-pointer-like location the error refers to, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl MetadataError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
            details: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    /// Profile lookup failure, listing what was loaded and what was found.
    pub fn profile_not_found(profile: &str, sources: &[String], profiles: &[String]) -> Self {
        let mut details = String::from("\nList of loaded metadata files:\n");
        for source in sources {
            details.push_str(&format!("  - {}\n", source));
        }
        details.push_str("\nList of available profiles:\n");
        for name in profiles {
            details.push_str(&format!("  - {}\n", name));
        }

        Self::new(
            ErrorCode::ProfileNotFound,
            format!("Profile \"{}\" not found.", profile),
        )
        .with_details(details)
    }

    pub fn schema_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SchemaViolation, message)
    }

    pub fn invalid_schema(name: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidSchema,
            format!("Invalid schema {}: {}", name, reason),
        )
    }

    pub fn render_failed(path: &str, err: &anyhow::Error) -> Self {
        Self::new(
            ErrorCode::RenderFailed,
            format!("Failed to render template at '{}': {:#}", path, err),
        )
        .with_path(path)
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref details) = self.details {
            write!(f, "\n{}", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for MetadataError {}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for MetadataError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<MetadataError>() {
            Ok(metadata_err) => metadata_err,
            Err(err) => MetadataError::internal(format!("{:#}", err)),
        }
    }
}

/// Result type for metadata operations.
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;
