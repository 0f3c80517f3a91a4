//! Attribute-based variant matching.
//!
//! Candidates (such as the published variants of a component) describe
//! themselves with [`ImmutableAttributes`]. A consumer requests a set of
//! attributes, and an [`AttributeMatcher`] selects the compatible candidates,
//! narrowing ties with the rules of an [`AttributeSelectionSchema`].

pub mod caching;
pub mod container;
pub mod errors;
pub mod explanation;
pub mod matcher;
mod multiple;
pub mod rules;
pub mod schema;
pub mod value;

pub use caching::CachingAttributeSelectionSchema;
pub use container::{AttributesFactory, ImmutableAttributes};
pub use errors::AttributeError;
pub use explanation::{
    AttributeMatchingExplanationBuilder, MatchingEvent, NoopExplanationBuilder,
    RecordingExplanationBuilder,
};
pub use matcher::{
    AttributeMatcher, AttributeMatchingCandidate, DefaultAttributeMatcher, MatchingDescription,
    Variant,
};
pub use rules::{
    AttributeCompatibilityRule, AttributeDisambiguationRule, ClosestOrderedRule,
    CompatibilityCheckDetails, CompatiblePairsRule, MultipleCandidatesDetails,
    OrderedCompatibilityRule, PreferredValueRule,
};
pub use schema::{
    AttributeMatchingStrategy, AttributeSelectionSchema, DefaultAttributeSelectionSchema,
    PrecedenceResult,
};
pub use value::{Attribute, AttributeType, AttributeValue};
