//! Configuration file support for Gantry.
//!
//! Gantry supports two configuration file locations:
//! - Global: `config.toml` in the platform config directory - User-wide defaults
//! - Project: `.gantry/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.
//!
//! Matching files, the input of the `gantry` commands, are described by
//! [`MatchingFile`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::attributes::{
    Attribute, AttributeError, AttributeSelectionSchema, AttributeType, AttributeValue,
    AttributesFactory, DefaultAttributeSelectionSchema, ImmutableAttributes, Variant,
};

/// Gantry configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Matching settings
    pub matching: MatchingConfig,

    /// Output settings
    pub output: OutputConfig,
}

/// Matching-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Cache schema and matcher results (default: true)
    pub cache: Option<bool>,
}

/// Output-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Colored diagnostics (default: true)
    pub color: Option<bool>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.matching.cache.is_some() {
            self.matching.cache = other.matching.cache;
        }
        if other.output.color.is_some() {
            self.output.color = other.output.color;
        }
    }

    /// Whether matching results should be cached.
    pub fn cache_enabled(&self) -> bool {
        self.matching.cache.unwrap_or(true)
    }

    /// Whether diagnostics should be colored.
    pub fn color(&self) -> bool {
        self.output.color.unwrap_or(true)
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.gantry/config.toml)
/// 2. Global config
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    // Load global config first
    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    // Project config overrides global
    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global gantry config directory.
pub fn global_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "gantry").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the global config path.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.gantry/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".gantry").join("config.toml")
}

/// A value as written in a matching file. Values are desugared to strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    String(String),
    Integer(i64),
    Boolean(bool),
}

impl RawValue {
    fn desugar(&self) -> String {
        match self {
            RawValue::String(s) => s.clone(),
            RawValue::Integer(i) => i.to_string(),
            RawValue::Boolean(b) => b.to_string(),
        }
    }
}

/// An attribute declaration with its matching rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeDeclaration {
    pub name: String,

    /// string, bool or int
    #[serde(rename = "type", default = "default_type")]
    pub ty: String,

    /// (requested, candidate) pairs that are compatible
    #[serde(default)]
    pub compatible: Vec<(RawValue, RawValue)>,

    /// Preferred values when candidates tie, first listed first
    #[serde(default)]
    pub prefer: Vec<RawValue>,

    /// Ascending value order
    #[serde(default)]
    pub ordered: Vec<RawValue>,
}

fn default_type() -> String {
    "string".to_string()
}

/// A candidate declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CandidateDeclaration {
    pub name: String,

    #[serde(default)]
    pub attributes: IndexMap<String, RawValue>,
}

/// A matching file: an attribute schema, candidates, and named requests.
///
/// ```toml
/// precedence = ["usage"]
///
/// [[attributes]]
/// name = "usage"
/// compatible = [["java-api", "java-runtime"]]
///
/// [[candidates]]
/// name = "apiElements"
/// attributes = { usage = "java-api" }
///
/// [requests]
/// compile = { usage = "java-api" }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchingFile {
    #[serde(default)]
    pub precedence: Vec<String>,

    #[serde(default)]
    pub attributes: Vec<AttributeDeclaration>,

    #[serde(default)]
    pub candidates: Vec<CandidateDeclaration>,

    #[serde(default)]
    pub requests: IndexMap<String, IndexMap<String, RawValue>>,
}

impl MatchingFile {
    /// Load a matching file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read matching file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("failed to parse matching file: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Build the attribute schema the file declares.
    pub fn schema(&self) -> Result<DefaultAttributeSelectionSchema, AttributeError> {
        let mut schema = DefaultAttributeSelectionSchema::new();
        for declaration in &self.attributes {
            let attribute = Attribute::new(
                declaration.name.as_str(),
                AttributeType::parse(&declaration.name, &declaration.ty)?,
            );
            if schema.attribute(&declaration.name).is_some() {
                return Err(AttributeError::DuplicateAttribute {
                    name: declaration.name.clone(),
                });
            }

            let parse = |raw: &RawValue| attribute.parse_value(&raw.desugar());
            let compatible = declaration
                .compatible
                .iter()
                .map(|(requested, candidate)| Ok((parse(requested)?, parse(candidate)?)))
                .collect::<Result<Vec<_>, AttributeError>>()?;
            let ordered = declaration
                .ordered
                .iter()
                .map(parse)
                .collect::<Result<Vec<_>, _>>()?;
            let prefer = declaration
                .prefer
                .iter()
                .map(parse)
                .collect::<Result<Vec<_>, _>>()?;

            let strategy = schema.attribute_strategy(attribute)?;
            if !compatible.is_empty() {
                strategy.compatible(compatible);
            }
            if !ordered.is_empty() {
                strategy.ordered(ordered);
            }
            if !prefer.is_empty() {
                strategy.prefer(prefer);
            }
        }
        schema.set_precedence(self.precedence.iter().map(String::as_str))?;

        tracing::debug!(
            attributes = self.attributes.len(),
            precedence = self.precedence.len(),
            "built attribute schema"
        );
        Ok(schema)
    }

    /// The candidates, with their values desugared to strings.
    pub fn candidates(&self, factory: &AttributesFactory) -> Vec<Variant> {
        self.candidates
            .iter()
            .map(|candidate| {
                let attributes = factory.of(
                    candidate
                        .attributes
                        .iter()
                        .map(|(name, raw)| (Attribute::string(name.as_str()), raw.desugar())),
                );
                Variant::new(candidate.name.as_str(), attributes)
            })
            .collect()
    }

    pub fn request_names(&self) -> impl Iterator<Item = &str> {
        self.requests.keys().map(String::as_str)
    }

    /// The request named `name`, rehydrated through `schema`. Attributes the
    /// schema does not declare stay strings.
    pub fn request(
        &self,
        name: &str,
        schema: &dyn AttributeSelectionSchema,
        factory: &AttributesFactory,
    ) -> Result<Option<ImmutableAttributes>, AttributeError> {
        let Some(entries) = self.requests.get(name) else {
            return Ok(None);
        };
        let attributes = entries
            .iter()
            .map(|(attribute, raw)| {
                let attribute = schema.rehydrate(&Attribute::string(attribute.as_str()));
                let value: AttributeValue = attribute.parse_value(&raw.desugar())?;
                Ok((attribute, value))
            })
            .collect::<Result<Vec<_>, AttributeError>>()?;
        Ok(Some(factory.of(attributes)))
    }
}
