//! Applying plugin-contributed defaults to new definitions.

use crate::features::errors::FeatureError;
use crate::features::implementation::{ActionDefault, ProjectFeatureImplementation, PropertyDefault};
use crate::model::ObjectRef;

/// Applies the model defaults registered on a feature to a definition.
///
/// Property conventions are set first, then configure actions run, each kind
/// in the order the defaults were added.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModelDefaultsApplicator;

impl ModelDefaultsApplicator {
    pub fn apply_defaults_to(
        &self,
        definition: &ObjectRef,
        feature: &ProjectFeatureImplementation,
    ) -> Result<(), FeatureError> {
        let feature_name = feature.feature_name();

        for default in feature.model_defaults::<PropertyDefault>() {
            definition
                .set_convention(&default.property, default.value.clone())
                .map_err(|err| FeatureError::ModelDefaultFailed {
                    feature: feature_name.to_string(),
                    plugin: default.contributed_by.to_string(),
                    source: err.into(),
                })?;
        }

        for default in feature.model_defaults::<ActionDefault>() {
            (default.action)(definition).map_err(|source| FeatureError::ModelDefaultFailed {
                feature: feature_name.to_string(),
                plugin: default.contributed_by.to_string(),
                source,
            })?;
        }

        tracing::trace!(
            feature = %feature_name,
            definition = ?definition,
            "applied model defaults"
        );
        Ok(())
    }
}
