//! Layered Metadata Library
//!
//! Loads profile-tagged YAML metadata, merges and inherits profiles, renders
//! template expressions to a fixed point and validates the result.

pub mod cli;
pub mod diagnostics;
pub mod error;
pub mod format;
pub mod metadata;

pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use error::{ErrorCode, MetadataError, MetadataResult};
pub use metadata::{inherit, load, read, render, validate};
