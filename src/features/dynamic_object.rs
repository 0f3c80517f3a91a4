//! Feature methods on the dynamic configuration surface.
//!
//! A call like `native { ... }` against a definition resolves to the feature
//! named `native` that can be applied to that definition. The feature is
//! applied (once) and its build model is configured with the block.

use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::features::applicator::ProjectFeatureApplicator;
use crate::features::errors::FeatureError;
use crate::features::implementation::ProjectFeatureImplementation;
use crate::features::registry::ProjectFeatureRegistry;
use crate::model::dynamic::single_block;
use crate::model::{Argument, DynamicInvokeResult, DynamicObject, ObjectRef, PropertyValue};

/// Resolves feature-named block calls against one receiver.
pub struct ProjectFeaturesDynamicObject {
    receiver: ObjectRef,
    registry: Arc<ProjectFeatureRegistry>,
    applicator: Arc<ProjectFeatureApplicator>,
}

impl ProjectFeaturesDynamicObject {
    pub fn new(
        receiver: ObjectRef,
        registry: Arc<ProjectFeatureRegistry>,
        applicator: Arc<ProjectFeatureApplicator>,
    ) -> Self {
        ProjectFeaturesDynamicObject {
            receiver,
            registry,
            applicator,
        }
    }

    /// Features named `name` whose target accepts the receiver.
    fn candidates(&self, name: &str) -> Vec<Arc<ProjectFeatureImplementation>> {
        let build_model = self
            .applicator
            .support()
            .try_get_context(&self.receiver)
            .map(|context| context.build_model().model_type().clone());
        self.registry
            .features_applicable_to(name, self.receiver.model_type(), build_model.as_ref())
    }
}

impl DynamicObject for ProjectFeaturesDynamicObject {
    fn display_name(&self) -> String {
        format!("{:?}", self.receiver)
    }

    fn has_method(&self, name: &str, args: &[Argument]) -> bool {
        single_block(args).is_some() && !self.candidates(name).is_empty()
    }

    fn try_invoke_method(&self, name: &str, args: &[Argument]) -> Result<DynamicInvokeResult> {
        let Some(block) = single_block(args) else {
            return Ok(DynamicInvokeResult::NotFound);
        };

        let feature = match self.candidates(name).as_slice() {
            [] => return Ok(DynamicInvokeResult::NotFound),
            [feature] => Arc::clone(feature),
            ambiguous => {
                return Err(FeatureError::AmbiguousFeature {
                    name: name.to_string(),
                    target: self.receiver.model_type().to_string(),
                    plugins: ambiguous
                        .iter()
                        .map(|feature| feature.plugin().to_string())
                        .collect(),
                }
                .into())
            }
        };

        let application = self
            .applicator
            .create_feature_application_for(&self.receiver, &feature)?;
        let build_model = Arc::clone(application.build_model());
        block(&build_model).with_context(|| format!("failed to configure feature `{}`", name))?;
        Ok(DynamicInvokeResult::Found(Some(PropertyValue::Object(build_model))))
    }
}
