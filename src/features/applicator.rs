//! Instantiating features against their targets.

use std::sync::Arc;

use crate::features::action::{ApplyActionServices, ProjectFeatureApplicationContext};
use crate::features::context::{FeatureApplication, ProjectFeatureDefinitionContext};
use crate::features::errors::FeatureError;
use crate::features::implementation::ProjectFeatureImplementation;
use crate::features::model_defaults::ModelDefaultsApplicator;
use crate::features::plugins::PluginManager;
use crate::features::support::ProjectFeatureSupport;
use crate::model::{ModelType, ObjectFactory, ObjectRef, PropertyKind, ServiceRegistry};

/// Creates feature applications, at most one per (feature, target).
///
/// Creating an application instantiates the definition and build model and
/// attaches a context to the definition; nothing is applied until
/// [`FeatureApplication::apply`] is called.
pub struct ProjectFeatureApplicator {
    support: Arc<ProjectFeatureSupport>,
    plugins: Arc<PluginManager>,
    object_factory: Arc<dyn ObjectFactory>,
    services: Arc<ServiceRegistry>,
    defaults: ModelDefaultsApplicator,
}

impl ProjectFeatureApplicator {
    pub fn new(
        support: Arc<ProjectFeatureSupport>,
        plugins: Arc<PluginManager>,
        object_factory: Arc<dyn ObjectFactory>,
        services: Arc<ServiceRegistry>,
    ) -> Self {
        ProjectFeatureApplicator {
            support,
            plugins,
            object_factory,
            services,
            defaults: ModelDefaultsApplicator,
        }
    }

    pub fn support(&self) -> &Arc<ProjectFeatureSupport> {
        &self.support
    }

    pub fn plugins(&self) -> &Arc<PluginManager> {
        &self.plugins
    }

    /// The application of `feature` to `parent`, created on first use.
    ///
    /// `parent` must already carry a definition context. A new application
    /// gets the feature's model defaults applied to its definition before it
    /// is recorded on `parent`, so a failing default leaves nothing behind.
    pub fn create_feature_application_for(
        &self,
        parent: &ObjectRef,
        feature: &Arc<ProjectFeatureImplementation>,
    ) -> Result<Arc<FeatureApplication>, FeatureError> {
        let parent_context = self.support.get_context(parent)?;

        let result = parent_context.get_or_add_child_definition(feature, || {
            if parent.is_instance_of(ModelType::project()) {
                check_single_project_type(&parent_context, feature)?;
            }
            self.plugins.apply(feature.plugin())?;
            let application = self.instantiate_bound_feature_objects(parent, feature)?;
            self.defaults
                .apply_defaults_to(application.definition(), feature)?;
            Ok(application)
        })?;

        if result.is_new {
            tracing::debug!(
                feature = %feature.feature_name(),
                parent = ?parent,
                definition = ?result.application.definition(),
                "created feature application"
            );
        }
        Ok(result.application)
    }

    fn instantiate_bound_feature_objects(
        &self,
        parent: &ObjectRef,
        feature: &Arc<ProjectFeatureImplementation>,
    ) -> Result<FeatureApplication, FeatureError> {
        let definition = self
            .object_factory
            .new_instance(feature.definition_implementation_type())?;
        let build_model =
            ProjectFeatureSupport::create_build_model_instance(&self.object_factory, feature)?;
        self.support.attach_definition_context(
            &definition,
            Arc::clone(&build_model),
            Arc::clone(&self.object_factory),
        );

        let services = ApplyActionServices::new(
            feature.feature_name(),
            feature.apply_action_safety(),
            Arc::clone(&self.services),
        );
        let context = ProjectFeatureApplicationContext::new(
            Arc::clone(&self.object_factory),
            services,
            Arc::downgrade(&self.support),
        );
        let action = feature.apply_action_factory().create(context.services())?;

        let root_context = self.support.get_context(&definition)?;
        bind_nested_definitions(
            feature.definition_public_type(),
            &definition,
            &root_context,
            &context,
        )?;

        Ok(FeatureApplication::new(
            Arc::clone(feature),
            definition,
            build_model,
            Arc::downgrade(parent),
            context,
            action,
        ))
    }
}

fn check_single_project_type(
    context: &ProjectFeatureDefinitionContext,
    feature: &ProjectFeatureImplementation,
) -> Result<(), FeatureError> {
    match context.child_features().first() {
        Some(existing) => Err(FeatureError::MultipleProjectTypes {
            existing: existing.feature_name().to_string(),
            attempted: feature.feature_name().to_string(),
        }),
        None => Ok(()),
    }
}

/// Give every definition reachable through `object`'s public properties a
/// context, and record it on `root_context`. Container elements are bound as
/// they are created.
fn bind_nested_definitions(
    public_type: &ModelType,
    object: &ObjectRef,
    root_context: &Arc<ProjectFeatureDefinitionContext>,
    context: &ProjectFeatureApplicationContext,
) -> Result<(), FeatureError> {
    for property in public_type.properties() {
        match &property.kind {
            PropertyKind::Nested(nested_type) => {
                let nested = object.nested(&property.name)?;
                if nested_type.is_definition() {
                    bind_nested_definition(&nested, root_context, context)?;
                }
                bind_nested_definitions(nested_type, &nested, root_context, context)?;
            }
            PropertyKind::Container(element_type) if element_type.is_definition() => {
                let container = object.container(&property.name)?;
                let root = Arc::downgrade(root_context);
                let context = context.clone();
                container
                    .configure_each(Arc::new(move |element: &ObjectRef| {
                        // The root definition is gone; nothing left to record on.
                        let Some(root) = root.upgrade() else {
                            return Ok(());
                        };
                        bind_nested_definition(element, &root, &context)?;
                        Ok(())
                    }))
                    .map_err(|source| FeatureError::NestedBindingFailed {
                        definition: format!("{:?}", object),
                        source,
                    })?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn bind_nested_definition(
    nested: &ObjectRef,
    root_context: &ProjectFeatureDefinitionContext,
    context: &ProjectFeatureApplicationContext,
) -> Result<(), FeatureError> {
    let model_type = nested
        .model_type()
        .build_model_type()
        .unwrap_or_else(|| ModelType::build_model_none().clone());
    context.register_build_model(nested, &model_type)?;
    root_context.add_nested_definition(Arc::clone(nested));
    Ok(())
}
