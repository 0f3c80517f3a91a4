//! Builders plugins use to declare feature bindings.
//!
//! ```ignore
//! let mut builder = ProjectFeatureBindingBuilder::new();
//! builder
//!     .bind_project_feature(
//!         "native",
//!         BindingTypeInformation::new(&native, TargetTypeInformation::Definition(library)),
//!         ApplyActionFactory::of(action),
//!     )
//!     .with_unsafe_apply_action();
//! let declarations = builder.build()?;
//! ```

use std::sync::Arc;

use crate::features::action::{ApplyActionFactory, ProjectTypeApplyAction};
use crate::features::declaration::{ProjectFeatureBindingDeclaration, Safety, TargetTypeInformation};
use crate::features::errors::FeatureError;
use crate::model::ModelType;
use crate::util::InternedString;

/// The types a project feature binds together.
#[derive(Debug, Clone)]
pub struct BindingTypeInformation {
    definition_type: ModelType,
    build_model_type: ModelType,
    target: TargetTypeInformation,
}

impl BindingTypeInformation {
    /// Bind `definition_type` to `target`. The build model type is the one the
    /// definition type declares, or `BuildModel.None`.
    pub fn new(definition_type: &ModelType, target: TargetTypeInformation) -> Self {
        BindingTypeInformation {
            definition_type: definition_type.clone(),
            build_model_type: build_model_type_of(definition_type),
            target,
        }
    }

    /// Use `build_model_type` instead of the one the definition declares.
    pub fn with_build_model(mut self, build_model_type: &ModelType) -> Self {
        self.build_model_type = build_model_type.clone();
        self
    }

    pub fn definition_type(&self) -> &ModelType {
        &self.definition_type
    }

    pub fn build_model_type(&self) -> &ModelType {
        &self.build_model_type
    }

    pub fn target(&self) -> &TargetTypeInformation {
        &self.target
    }
}

fn build_model_type_of(definition_type: &ModelType) -> ModelType {
    definition_type
        .build_model_type()
        .unwrap_or_else(|| ModelType::build_model_none().clone())
}

/// Accumulates the configuration of a single binding.
#[derive(Clone)]
pub struct DeclaredProjectFeatureBindingBuilder {
    name: InternedString,
    binding: BindingTypeInformation,
    apply_action_factory: ApplyActionFactory,
    definition_implementation_type: Option<ModelType>,
    build_model_implementation_type: Option<ModelType>,
    definition_safety: Safety,
    apply_action_safety: Safety,
}

impl DeclaredProjectFeatureBindingBuilder {
    fn new(
        name: InternedString,
        binding: BindingTypeInformation,
        apply_action_factory: ApplyActionFactory,
    ) -> Self {
        DeclaredProjectFeatureBindingBuilder {
            name,
            binding,
            apply_action_factory,
            definition_implementation_type: None,
            build_model_implementation_type: None,
            definition_safety: Safety::Safe,
            apply_action_safety: Safety::Safe,
        }
    }

    pub fn with_unsafe_definition(&mut self) -> &mut Self {
        self.definition_safety = Safety::Unsafe;
        self
    }

    pub fn with_unsafe_apply_action(&mut self) -> &mut Self {
        self.apply_action_safety = Safety::Unsafe;
        self
    }

    /// Instantiate `implementation` wherever the definition is created.
    pub fn with_definition_implementation_type(&mut self, implementation: &ModelType) -> &mut Self {
        self.definition_implementation_type = Some(implementation.clone());
        self
    }

    /// Instantiate `implementation` wherever the build model is created.
    pub fn with_build_model_implementation_type(
        &mut self,
        implementation: &ModelType,
    ) -> &mut Self {
        self.build_model_implementation_type = Some(implementation.clone());
        self
    }

    /// Validate and produce the declaration.
    pub fn build(&self) -> Result<ProjectFeatureBindingDeclaration, FeatureError> {
        let feature = self.name.to_string();
        let definition_type = &self.binding.definition_type;
        let build_model_type = &self.binding.build_model_type;

        if !definition_type.is_definition() {
            return Err(FeatureError::InvalidBindingType {
                feature,
                role: "definition",
                actual: definition_type.to_string(),
                required: ModelType::definition().to_string(),
            });
        }
        if !build_model_type.is_build_model() {
            return Err(FeatureError::InvalidBindingType {
                feature,
                role: "build model",
                actual: build_model_type.to_string(),
                required: ModelType::build_model().to_string(),
            });
        }
        check_implementation(
            &feature,
            "definition",
            definition_type,
            &self.definition_implementation_type,
        )?;
        check_implementation(
            &feature,
            "build model",
            build_model_type,
            &self.build_model_implementation_type,
        )?;

        Ok(ProjectFeatureBindingDeclaration {
            name: self.name,
            definition_type: definition_type.clone(),
            definition_implementation_type: self.definition_implementation_type.clone(),
            definition_safety: self.definition_safety,
            apply_action_safety: self.apply_action_safety,
            target_definition_type: self.binding.target.clone(),
            build_model_type: build_model_type.clone(),
            build_model_implementation_type: self.build_model_implementation_type.clone(),
            apply_action_factory: self.apply_action_factory.clone(),
        })
    }
}

fn check_implementation(
    feature: &str,
    role: &'static str,
    public: &ModelType,
    implementation: &Option<ModelType>,
) -> Result<(), FeatureError> {
    match implementation {
        Some(implementation) if !public.is_assignable_from(implementation) => {
            Err(FeatureError::InvalidImplementationType {
                feature: feature.to_string(),
                role,
                implementation: implementation.to_string(),
                public: public.to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Collects the project feature bindings of one plugin.
#[derive(Default)]
pub struct ProjectFeatureBindingBuilder {
    bindings: Vec<DeclaredProjectFeatureBindingBuilder>,
}

impl ProjectFeatureBindingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a feature named `name` that can be applied to the targets
    /// described by `binding`.
    pub fn bind_project_feature(
        &mut self,
        name: impl Into<InternedString>,
        binding: BindingTypeInformation,
        apply_action: ApplyActionFactory,
    ) -> &mut DeclaredProjectFeatureBindingBuilder {
        self.bindings.push(DeclaredProjectFeatureBindingBuilder::new(
            name.into(),
            binding,
            apply_action,
        ));
        let last = self.bindings.len() - 1;
        &mut self.bindings[last]
    }

    /// Validate every binding, failing on the first invalid one.
    pub fn build(&self) -> Result<Vec<ProjectFeatureBindingDeclaration>, FeatureError> {
        self.bindings.iter().map(|binding| binding.build()).collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Collects the project type bindings of one plugin.
///
/// A project type is a feature that targets exactly `Project`; its apply
/// action does not see a parent definition.
#[derive(Default)]
pub struct ProjectTypeBindingBuilder {
    bindings: Vec<DeclaredProjectFeatureBindingBuilder>,
}

impl ProjectTypeBindingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a project type named `name` with the given definition type.
    pub fn bind_project_type(
        &mut self,
        name: impl Into<InternedString>,
        definition_type: &ModelType,
        apply_action: Arc<dyn ProjectTypeApplyAction>,
    ) -> &mut DeclaredProjectFeatureBindingBuilder {
        let binding = BindingTypeInformation::new(
            definition_type,
            TargetTypeInformation::Exact(ModelType::project().clone()),
        );
        let factory = ApplyActionFactory::project_type(move |_| Ok(Arc::clone(&apply_action)));
        self.bindings
            .push(DeclaredProjectFeatureBindingBuilder::new(name.into(), binding, factory));
        let last = self.bindings.len() - 1;
        &mut self.bindings[last]
    }

    /// Bind a project type whose apply action is built from the scoped services.
    pub fn bind_project_type_with(
        &mut self,
        name: impl Into<InternedString>,
        definition_type: &ModelType,
        apply_action: ApplyActionFactory,
    ) -> &mut DeclaredProjectFeatureBindingBuilder {
        let binding = BindingTypeInformation::new(
            definition_type,
            TargetTypeInformation::Exact(ModelType::project().clone()),
        );
        self.bindings
            .push(DeclaredProjectFeatureBindingBuilder::new(name.into(), binding, apply_action));
        let last = self.bindings.len() - 1;
        &mut self.bindings[last]
    }

    pub fn build(&self) -> Result<Vec<ProjectFeatureBindingDeclaration>, FeatureError> {
        self.bindings.iter().map(|binding| binding.build()).collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures;

    #[test]
    fn test_build_rejects_definition_implementation_outside_public_type() {
        let types = fixtures::ModelTypes::new();
        let mut builder = ProjectFeatureBindingBuilder::new();
        builder
            .bind_project_feature(
                "native",
                BindingTypeInformation::new(
                    &types.native,
                    TargetTypeInformation::Definition(types.library.clone()),
                ),
                fixtures::noop_action(),
            )
            .with_definition_implementation_type(&types.jvm);

        let err = builder.build().unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(err.to_string().contains("definition implementation type `Jvm`"));
    }

    #[test]
    fn test_build_rejects_build_model_implementation_independently() {
        let types = fixtures::ModelTypes::new();
        let mut builder = ProjectFeatureBindingBuilder::new();
        builder
            .bind_project_feature(
                "native",
                BindingTypeInformation::new(
                    &types.native,
                    TargetTypeInformation::Definition(types.library.clone()),
                ),
                fixtures::noop_action(),
            )
            .with_definition_implementation_type(&types.native_impl)
            .with_build_model_implementation_type(&types.jvm_model);

        let err = builder.build().unwrap_err();
        assert!(matches!(
            err,
            FeatureError::InvalidImplementationType { role: "build model", .. }
        ));
    }

    #[test]
    fn test_build_accepts_valid_implementations() {
        let types = fixtures::ModelTypes::new();
        let mut builder = ProjectFeatureBindingBuilder::new();
        builder
            .bind_project_feature(
                "native",
                BindingTypeInformation::new(
                    &types.native,
                    TargetTypeInformation::Definition(types.library.clone()),
                ),
                fixtures::noop_action(),
            )
            .with_definition_implementation_type(&types.native_impl)
            .with_build_model_implementation_type(&types.native_model_impl)
            .with_unsafe_definition();

        let declarations = builder.build().unwrap();
        assert_eq!(declarations.len(), 1);
        let declaration = &declarations[0];
        assert_eq!(declaration.definition_implementation_type(), &types.native_impl);
        assert_eq!(declaration.build_model_type(), &types.native_model);
        assert_eq!(declaration.build_model_implementation_type(), &types.native_model_impl);
        assert_eq!(declaration.definition_safety(), Safety::Unsafe);
        assert_eq!(declaration.apply_action_safety(), Safety::Safe);
    }

    #[test]
    fn test_build_rejects_non_definition_type() {
        let types = fixtures::ModelTypes::new();
        let mut builder = ProjectFeatureBindingBuilder::new();
        builder.bind_project_feature(
            "model",
            BindingTypeInformation::new(
                &types.native_model,
                TargetTypeInformation::Definition(types.library.clone()),
            ),
            fixtures::noop_action(),
        );
        assert!(matches!(
            builder.build(),
            Err(FeatureError::InvalidBindingType { role: "definition", .. })
        ));
    }

    #[test]
    fn test_project_type_targets_project() {
        let types = fixtures::ModelTypes::new();
        let mut builder = ProjectTypeBindingBuilder::new();
        builder.bind_project_type("library", &types.library, fixtures::noop_project_type_action());

        let declarations = builder.build().unwrap();
        assert_eq!(
            declarations[0].target_definition_type(),
            &TargetTypeInformation::Exact(ModelType::project().clone())
        );
        assert!(declarations[0].has_no_build_model());
    }
}
