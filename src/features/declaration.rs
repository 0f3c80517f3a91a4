//! Feature binding declarations.

use std::fmt;

use crate::features::action::ApplyActionFactory;
use crate::model::ModelType;
use crate::util::InternedString;

/// Whether a definition or apply action keeps the strict isolation guarantees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Safety {
    #[default]
    Safe,
    Unsafe,
}

impl fmt::Display for Safety {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Safety::Safe => write!(f, "safe"),
            Safety::Unsafe => write!(f, "unsafe"),
        }
    }
}

/// Which objects a feature can be applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetTypeInformation {
    /// Any definition assignable to the given base type.
    Definition(ModelType),
    /// Any definition whose build model is assignable to the given type.
    BuildModel(ModelType),
    /// Exactly the given type.
    Exact(ModelType),
}

impl TargetTypeInformation {
    /// Whether a target of `target_type`, exposing a build model of
    /// `target_build_model` (if any), satisfies this constraint.
    pub fn accepts(&self, target_type: &ModelType, target_build_model: Option<&ModelType>) -> bool {
        match self {
            TargetTypeInformation::Definition(base) => base.is_assignable_from(target_type),
            TargetTypeInformation::BuildModel(model) => {
                target_build_model.is_some_and(|actual| model.is_assignable_from(actual))
            }
            TargetTypeInformation::Exact(ty) => ty == target_type,
        }
    }
}

impl fmt::Display for TargetTypeInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetTypeInformation::Definition(ty) => write!(f, "definitions of {}", ty),
            TargetTypeInformation::BuildModel(ty) => write!(f, "definitions building {}", ty),
            TargetTypeInformation::Exact(ty) => write!(f, "{}", ty),
        }
    }
}

/// An immutable, validated feature binding.
///
/// Created through the binding builders; never mutated afterwards.
#[derive(Clone)]
pub struct ProjectFeatureBindingDeclaration {
    pub(crate) name: InternedString,
    pub(crate) definition_type: ModelType,
    pub(crate) definition_implementation_type: Option<ModelType>,
    pub(crate) definition_safety: Safety,
    pub(crate) apply_action_safety: Safety,
    pub(crate) target_definition_type: TargetTypeInformation,
    pub(crate) build_model_type: ModelType,
    pub(crate) build_model_implementation_type: Option<ModelType>,
    pub(crate) apply_action_factory: ApplyActionFactory,
}

impl ProjectFeatureBindingDeclaration {
    pub fn name(&self) -> InternedString {
        self.name
    }

    /// The public configuration-surface type.
    pub fn definition_type(&self) -> &ModelType {
        &self.definition_type
    }

    /// The type actually instantiated for the definition.
    pub fn definition_implementation_type(&self) -> &ModelType {
        self.definition_implementation_type
            .as_ref()
            .unwrap_or(&self.definition_type)
    }

    pub fn has_definition_implementation_type(&self) -> bool {
        self.definition_implementation_type.is_some()
    }

    pub fn definition_safety(&self) -> Safety {
        self.definition_safety
    }

    pub fn apply_action_safety(&self) -> Safety {
        self.apply_action_safety
    }

    pub fn target_definition_type(&self) -> &TargetTypeInformation {
        &self.target_definition_type
    }

    pub fn build_model_type(&self) -> &ModelType {
        &self.build_model_type
    }

    /// The type actually instantiated for the build model.
    pub fn build_model_implementation_type(&self) -> &ModelType {
        self.build_model_implementation_type
            .as_ref()
            .unwrap_or(&self.build_model_type)
    }

    /// Whether the feature exposes no build model.
    pub fn has_no_build_model(&self) -> bool {
        &self.build_model_type == ModelType::build_model_none()
    }

    pub fn apply_action_factory(&self) -> &ApplyActionFactory {
        &self.apply_action_factory
    }
}

impl fmt::Debug for ProjectFeatureBindingDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectFeatureBindingDeclaration")
            .field("name", &self.name)
            .field("definition_type", &self.definition_type)
            .field(
                "definition_implementation_type",
                &self.definition_implementation_type,
            )
            .field("definition_safety", &self.definition_safety)
            .field("apply_action_safety", &self.apply_action_safety)
            .field("target_definition_type", &self.target_definition_type)
            .field("build_model_type", &self.build_model_type)
            .field(
                "build_model_implementation_type",
                &self.build_model_implementation_type,
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_accepts_subtypes() {
        let component = ModelType::builder("Component")
            .definition_of(ModelType::build_model_none())
            .build();
        let library = ModelType::builder("Library").extends(&component).build();
        let target = TargetTypeInformation::Definition(component.clone());

        assert!(target.accepts(&library, None));
        assert!(target.accepts(&component, None));
        assert!(!TargetTypeInformation::Exact(component).accepts(&library, None));
    }

    #[test]
    fn test_build_model_target_needs_model() {
        let jvm_model = ModelType::builder("JvmModel")
            .extends(ModelType::build_model())
            .build();
        let target = TargetTypeInformation::BuildModel(jvm_model.clone());
        let library = ModelType::builder("Library").build();

        assert!(!target.accepts(&library, None));
        assert!(target.accepts(&library, Some(&jvm_model)));
        assert!(!target.accepts(&library, Some(ModelType::build_model_none())));
    }
}
