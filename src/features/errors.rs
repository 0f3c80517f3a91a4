//! Feature binding and application errors.

use miette::Diagnostic;
use thiserror::Error;

use crate::model::ModelError;
use crate::util::diagnostic::Diagnostic as GantryDiagnostic;

/// Error raised while declaring, registering or applying project features.
#[derive(Debug, Error, Diagnostic)]
pub enum FeatureError {
    /// An implementation type is not a subtype of the public type it implements.
    #[error("{role} implementation type `{implementation}` for feature `{feature}` does not implement `{public}`")]
    #[diagnostic(
        code(gantry::features::invalid_implementation_type),
        help("Use an implementation type that extends `{public}`")
    )]
    InvalidImplementationType {
        feature: String,
        role: &'static str,
        implementation: String,
        public: String,
    },

    /// A declared type is outside the hierarchy it has to belong to.
    #[error("{role} type `{actual}` for feature `{feature}` must extend `{required}`")]
    #[diagnostic(code(gantry::features::invalid_binding_type))]
    InvalidBindingType {
        feature: String,
        role: &'static str,
        actual: String,
        required: String,
    },

    /// A definition was used before its context was attached.
    #[error("no feature context is attached to `{definition}`")]
    #[diagnostic(
        code(gantry::features::missing_context),
        help("The apply action that created `{definition}` must register a build model for it before it is configured")
    )]
    MissingDefinitionContext { definition: String },

    /// More than one feature bound the same name to a type the receiver has.
    #[error("multiple features named `{name}` apply to `{target}`: {}", .plugins.join(", "))]
    #[diagnostic(
        code(gantry::features::ambiguous_feature),
        help("Bind `{name}` to disjoint target types in the registering plugins")
    )]
    AmbiguousFeature {
        name: String,
        target: String,
        plugins: Vec<String>,
    },

    #[error("The project has already applied the '{existing}' project type and is also attempting to apply the '{attempted}' project type.  Only one project type can be applied to a project.")]
    #[diagnostic(code(gantry::features::multiple_project_types))]
    MultipleProjectTypes { existing: String, attempted: String },

    #[error("plugin `{plugin}` is not known to this project")]
    #[diagnostic(code(gantry::features::unknown_plugin))]
    UnknownPlugin { plugin: String },

    #[error("plugin `{plugin}` failed to apply")]
    #[diagnostic(code(gantry::features::plugin_failed))]
    PluginFailed {
        plugin: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Project feature '{feature}' has a safe apply action that attempts to inject an unsafe service with type '{service}'.")]
    #[diagnostic(
        code(gantry::features::unsafe_service),
        help("Mark the apply action as unsafe, or remove the '{service}' injection from the apply action")
    )]
    UnsafeService { feature: String, service: String },

    #[error("Project feature '{feature}' has an apply action that attempts to inject an unknown service with type '{service}'.")]
    #[diagnostic(
        code(gantry::features::unknown_service),
        help("Remove the '{service}' injection from the apply action")
    )]
    UnknownService { feature: String, service: String },

    #[error("apply action for feature `{feature}` failed")]
    #[diagnostic(code(gantry::features::apply_failed))]
    ApplyActionFailed {
        feature: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("model default contributed by `{plugin}` failed for feature `{feature}`")]
    #[diagnostic(code(gantry::features::model_default_failed))]
    ModelDefaultFailed {
        feature: String,
        plugin: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("could not bind the nested definitions of `{definition}`")]
    #[diagnostic(code(gantry::features::nested_binding_failed))]
    NestedBindingFailed {
        definition: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("the parent of feature `{feature}` was dropped before the feature was applied")]
    #[diagnostic(code(gantry::features::parent_dropped))]
    ParentDropped { feature: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),
}

impl FeatureError {
    /// Whether the error is a configuration (invalid argument) error.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            FeatureError::InvalidImplementationType { .. } | FeatureError::InvalidBindingType { .. }
        )
    }

    /// Whether the error reports an internal invariant violation (illegal state).
    pub fn is_illegal_state(&self) -> bool {
        matches!(
            self,
            FeatureError::MissingDefinitionContext { .. }
                | FeatureError::AmbiguousFeature { .. }
                | FeatureError::MultipleProjectTypes { .. }
                | FeatureError::ParentDropped { .. }
        )
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> GantryDiagnostic {
        GantryDiagnostic::from_report(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_feature_lists_plugins() {
        let err = FeatureError::AmbiguousFeature {
            name: "native".to_string(),
            target: "Library".to_string(),
            plugins: vec!["cpp".to_string(), "swift".to_string()],
        };
        assert!(err.is_illegal_state());
        assert_eq!(
            err.to_string(),
            "multiple features named `native` apply to `Library`: cpp, swift"
        );

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("disjoint target types"));
    }

    #[test]
    fn test_error_classification() {
        let err = FeatureError::InvalidImplementationType {
            feature: "jvm".to_string(),
            role: "definition",
            implementation: "Other".to_string(),
            public: "JvmDefinition".to_string(),
        };
        assert!(err.is_invalid_argument());
        assert!(!err.is_illegal_state());
    }
}
