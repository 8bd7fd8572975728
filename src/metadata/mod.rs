//! Layered metadata loading.
//!
//! Resolves one profile from a list of multi-document YAML files:
//! 1. **Read** - documents grouped by `profile` and deep-merged in file order
//! 2. **Inherit** - every profile picks up the keys of the `default` profile it lacks
//! 3. **Render** - template expressions resolved against the document itself
//!    and the environment, repeated to a fixed point
//! 4. **Validate** - structural schema check, then semantic cross-references
//!
//! ## Merge Strategy
//! - Mappings: deep merge key by key, later layers win
//! - Sequences and scalars: replaced entirely by the later layer
//! - Null: "not specified", keeps the earlier value
//!
//! ## Environment Variables
//! - `DATALAB_PROFILE` - Profile to resolve (default: `default`)
//! - `DATALAB_METADATA_FILES` - Metadata files, separated like `PATH`
//! - `DATALAB_DOTENV` - Dotenv file loaded before rendering
//! - `DATALAB_MAX_PASSES` - Rendering pass budget (default: 5)
//! - `DATALAB_FACTORY_DEFAULTS` - `0`/`false` skips the bundled defaults

pub mod bundled;
mod inherit;
mod loader;
mod merge;
mod reader;
mod render;
mod validate;

pub use inherit::{inherit, inherit_from};
pub use loader::{LoadOptions, MetadataLoader, load};
pub use merge::{deep_merge, deep_merge_all};
pub use reader::{MetadataSource, ProfileSet, ReadOutcome, parse_documents, read, read_sources};
pub use render::{
    DEFAULT_MAX_PASSES, DEFAULT_NOW_FORMAT, Evaluator, JinjaEvaluator, RenderOutcome, format_now,
    has_expression, load_dotenv, render, render_with, render_with_dotenv,
};
pub use validate::{check_semantics, validate, validate_against, validate_bundled};

/// Name of the profile every other profile inherits from.
pub const DEFAULT_PROFILE: &str = "default";

/// Document field naming the profile a document belongs to.
pub const PROFILE_KEY: &str = "profile";
