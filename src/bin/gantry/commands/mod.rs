//! Command implementations

pub mod completions;
pub mod explain;
pub mod schema;
pub mod select;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use gantry::attributes::{
    AttributeMatcher, AttributeSelectionSchema, AttributesFactory, CachingAttributeSelectionSchema,
    DefaultAttributeMatcher, ImmutableAttributes, Variant,
};
use gantry::util::{Config, MatchingFile};

/// Settings shared by every command.
pub struct Session {
    pub config: Config,
    pub color: bool,
}

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum CommandError {
    #[error("no request named `{name}` in {file}")]
    #[diagnostic(
        code(gantry::cli::unknown_request),
        help("declared requests: {available}")
    )]
    UnknownRequest {
        name: String,
        file: String,
        available: String,
    },
}

/// A loaded matching file, ready to answer requests.
pub struct Workspace {
    pub path: PathBuf,
    pub file: MatchingFile,
    pub factory: AttributesFactory,
    pub candidates: Vec<Variant>,
    pub matcher: DefaultAttributeMatcher,
}

impl Workspace {
    pub fn load(path: &Path, config: &Config) -> Result<Self> {
        let file = MatchingFile::load(path)?;
        let declared: Arc<dyn AttributeSelectionSchema> = Arc::new(file.schema()?);

        let matcher = if config.cache_enabled() {
            DefaultAttributeMatcher::new(Arc::new(CachingAttributeSelectionSchema::new(declared)))
        } else {
            DefaultAttributeMatcher::uncached(declared)
        };

        let factory = AttributesFactory::new();
        let candidates = file.candidates(&factory);
        tracing::debug!(
            candidates = candidates.len(),
            requests = file.requests.len(),
            cache = config.cache_enabled(),
            "loaded {}",
            path.display()
        );

        Ok(Workspace {
            path: path.to_path_buf(),
            file,
            factory,
            candidates,
            matcher,
        })
    }

    /// The attributes of the request named `name`.
    pub fn request(&self, name: &str) -> Result<ImmutableAttributes> {
        match self
            .file
            .request(name, self.matcher.schema(), &self.factory)?
        {
            Some(requested) => Ok(requested),
            None => {
                let available: Vec<&str> = self.file.request_names().collect();
                Err(CommandError::UnknownRequest {
                    name: name.to_string(),
                    file: self.path.display().to_string(),
                    available: if available.is_empty() {
                        "none".to_string()
                    } else {
                        available.join(", ")
                    },
                }
                .into())
            }
        }
    }
}
