//! Project features: bindings plugins declare, and their application to
//! definitions.
//!
//! A plugin declares bindings with the builders in [`builder`]. Registered
//! bindings become [`ProjectFeatureImplementation`]s. When a build script
//! calls a feature-named method on a definition, the
//! [`ProjectFeaturesDynamicObject`] finds the matching feature and the
//! [`ProjectFeatureApplicator`] instantiates it. [`ProjectFeatureSupport`]
//! keeps the per-definition state and walks the resulting graph.

pub mod action;
pub mod applicator;
pub mod builder;
pub mod context;
pub mod declaration;
pub mod dynamic_object;
pub mod errors;
pub mod implementation;
pub mod model_defaults;
pub mod plugins;
pub mod project;
pub mod registry;
pub mod support;

pub use action::{
    ApplyActionFactory, ApplyActionServices, ProjectFeatureApplicationContext,
    ProjectFeatureApplyAction, ProjectTypeApplyAction, ProjectTypeApplyActionAdapter,
};
pub use applicator::ProjectFeatureApplicator;
pub use builder::{
    BindingTypeInformation, DeclaredProjectFeatureBindingBuilder, ProjectFeatureBindingBuilder,
    ProjectTypeBindingBuilder,
};
pub use context::{
    ChildDefinitionAdditionResult, FeatureApplication, ProjectFeatureDefinitionContext,
};
pub use declaration::{ProjectFeatureBindingDeclaration, Safety, TargetTypeInformation};
pub use dynamic_object::ProjectFeaturesDynamicObject;
pub use errors::FeatureError;
pub use implementation::{
    ActionDefault, FeatureId, ModelDefault, ModelDefaults, ProjectFeatureImplementation,
    PropertyDefault,
};
pub use model_defaults::ModelDefaultsApplicator;
pub use plugins::{Plugin, PluginContext, PluginId, PluginManager};
pub use project::Project;
pub use registry::ProjectFeatureRegistry;
pub use support::ProjectFeatureSupport;
