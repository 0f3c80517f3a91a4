//! Gantry - project feature bindings and attribute-based variant matching
//!
//! This crate provides the core of a build model: plugins bind project types
//! and features to definition objects, build scripts configure them through
//! dynamic dispatch, and variants are selected by attribute matching.

pub mod attributes;
pub mod features;
pub mod model;
pub mod util;

/// Test fixtures for Gantry unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides sample model types, plugins and attribute
/// schemas.
#[cfg(test)]
pub mod test_support;

pub use attributes::{
    AttributeMatcher, AttributeSelectionSchema, DefaultAttributeMatcher, ImmutableAttributes,
};
pub use features::{Project, ProjectFeatureApplicator, ProjectFeatureSupport};
pub use util::config::{Config, MatchingFile};
