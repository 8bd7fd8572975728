//! Load orchestration: defaults, read, inherit, select, render, validate.

use super::DEFAULT_PROFILE;
use super::inherit::inherit_from;
use super::reader::{MetadataSource, read_sources};
use super::render::{DEFAULT_MAX_PASSES, render_with_dotenv};
use super::validate::validate;
use crate::diagnostics::Diagnostic;
use crate::error::{MetadataError, MetadataResult};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Inputs of a metadata load.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Profile to resolve
    pub profile: String,
    /// Metadata files, lowest priority first
    pub files: Vec<PathBuf>,
    /// Optional dotenv file loaded before rendering
    pub dotenv_path: Option<PathBuf>,
    /// Prepend the bundled factory defaults as the lowest-priority layer
    pub factory_defaults: bool,
    /// Rendering pass budget
    pub max_passes: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            profile: DEFAULT_PROFILE.to_string(),
            files: Vec::new(),
            dotenv_path: None,
            factory_defaults: true,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl LoadOptions {
    /// Defaults with environment variable overrides applied.
    pub fn discover() -> Self {
        let mut options = Self::default();
        options.apply_env_overrides();
        options
    }

    /// Apply `DATALAB_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(profile) = std::env::var("DATALAB_PROFILE")
            && !profile.is_empty()
        {
            self.profile = profile;
        }

        if let Some(files) = std::env::var_os("DATALAB_METADATA_FILES") {
            self.files = std::env::split_paths(&files)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }

        if let Ok(dotenv) = std::env::var("DATALAB_DOTENV") {
            self.dotenv_path = Some(PathBuf::from(dotenv));
        }

        if let Ok(passes) = std::env::var("DATALAB_MAX_PASSES") {
            match passes.parse() {
                Ok(passes) => self.max_passes = passes,
                Err(_) => warn!(value = %passes, "Ignoring invalid DATALAB_MAX_PASSES"),
            }
        }

        if let Ok(flag) = std::env::var("DATALAB_FACTORY_DEFAULTS") {
            self.factory_defaults = !matches!(
                flag.to_ascii_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            );
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    pub fn with_files<P: Into<PathBuf>>(mut self, files: impl IntoIterator<Item = P>) -> Self {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_dotenv(mut self, path: impl Into<PathBuf>) -> Self {
        self.dotenv_path = Some(path.into());
        self
    }

    pub fn with_factory_defaults(mut self, enabled: bool) -> Self {
        self.factory_defaults = enabled;
        self
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Sources in read order, factory defaults first when enabled.
    pub fn sources(&self) -> Vec<MetadataSource> {
        let mut sources = Vec::with_capacity(self.files.len() + 1);
        if self.factory_defaults {
            sources.push(MetadataSource::factory_defaults());
        }
        sources.extend(self.files.iter().cloned().map(MetadataSource::File));
        sources
    }
}

/// Resolved metadata for one profile, with everything learned on the way.
#[derive(Debug, Clone)]
pub struct MetadataLoader {
    options: LoadOptions,
    metadata: Value,
    sources: Vec<MetadataSource>,
    profiles: Vec<String>,
    render_passes: usize,
    converged: bool,
    diagnostics: Vec<Diagnostic>,
}

impl MetadataLoader {
    /// Load with options discovered from the environment.
    pub fn load() -> MetadataResult<Self> {
        Self::load_with_options(LoadOptions::discover())
    }

    /// Run the full pipeline for the given options.
    pub fn load_with_options(options: LoadOptions) -> MetadataResult<Self> {
        let sources = options.sources();
        let read = read_sources(&sources);
        let mut diagnostics = read.diagnostics;
        let profiles: Vec<String> = read.profiles.names().map(str::to_string).collect();

        if !read.profiles.contains(&options.profile) {
            let listed: Vec<String> = sources
                .iter()
                .map(|source| {
                    if source.exists() {
                        source.label()
                    } else {
                        format!("{} (not found)", source.label())
                    }
                })
                .collect();
            return Err(MetadataError::profile_not_found(
                &options.profile,
                &listed,
                &profiles,
            ));
        }

        debug!(
            profile = %options.profile,
            sources = sources.len(),
            profiles = profiles.len(),
            "Read metadata profiles"
        );

        let metadata = inherit_from(read.profiles, DEFAULT_PROFILE)
            .into_profile(&options.profile)
            .ok_or_else(|| MetadataError::internal("selected profile vanished during inheritance"))?;

        let rendered = render_with_dotenv(
            &metadata,
            options.dotenv_path.as_deref(),
            options.max_passes,
        )?;
        diagnostics.extend(rendered.diagnostics);

        diagnostics.extend(validate(&rendered.metadata)?);

        info!(
            profile = %options.profile,
            passes = rendered.passes,
            diagnostics = diagnostics.len(),
            "Loaded metadata"
        );

        Ok(Self {
            options,
            metadata: rendered.metadata,
            sources,
            profiles,
            render_passes: rendered.passes,
            converged: rendered.converged,
            diagnostics,
        })
    }

    /// Get the resolved metadata.
    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    /// Consume the loader and return the metadata.
    pub fn into_metadata(self) -> Value {
        self.metadata
    }

    /// The profile that was resolved.
    pub fn profile(&self) -> &str {
        &self.options.profile
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Every source that was considered, in read order.
    pub fn sources(&self) -> &[MetadataSource] {
        &self.sources
    }

    /// Every profile found across the sources, in first-seen order.
    pub fn profiles(&self) -> &[String] {
        &self.profiles
    }

    pub fn render_passes(&self) -> usize {
        self.render_passes
    }

    /// Whether rendering reached a fixed point within the budget.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Non-fatal problems from reading, rendering and validation.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Load the resolved, validated metadata of one profile.
///
/// `profile` defaults to `default`. With `factory_defaults` the bundled
/// default metadata is read before `file_paths`.
pub fn load<P: AsRef<Path>>(
    profile: Option<&str>,
    file_paths: &[P],
    dotenv_path: Option<&Path>,
    factory_defaults: bool,
) -> MetadataResult<Value> {
    let mut options = LoadOptions::default()
        .with_profile(profile.unwrap_or(DEFAULT_PROFILE))
        .with_files(file_paths.iter().map(|p| p.as_ref().to_path_buf()))
        .with_factory_defaults(factory_defaults);
    options.dotenv_path = dotenv_path.map(Path::to_path_buf);

    MetadataLoader::load_with_options(options).map(MetadataLoader::into_metadata)
}
