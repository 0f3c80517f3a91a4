//! A project and the services that extend it with features.

use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::features::applicator::ProjectFeatureApplicator;
use crate::features::context::FeatureApplication;
use crate::features::dynamic_object::ProjectFeaturesDynamicObject;
use crate::features::errors::FeatureError;
use crate::features::plugins::{Plugin, PluginId, PluginManager};
use crate::features::registry::ProjectFeatureRegistry;
use crate::features::support::ProjectFeatureSupport;
use crate::model::{
    Argument, BeanDynamicObject, CompositeDynamicObject, DefaultObjectFactory, DynamicObject,
    ModelType, ObjectFactory, ObjectRef, ServiceRegistry,
};

/// The root of a definition graph.
///
/// Owns the feature registry, the plugin manager, the context side table and
/// the applicator. The project object itself carries a context whose build
/// model is `BuildModel.None`, so project types can be applied to it.
pub struct Project {
    name: String,
    object: ObjectRef,
    object_factory: Arc<dyn ObjectFactory>,
    registry: Arc<ProjectFeatureRegistry>,
    plugins: Arc<PluginManager>,
    support: Arc<ProjectFeatureSupport>,
    applicator: Arc<ProjectFeatureApplicator>,
}

impl Project {
    /// A project using the default object factory.
    pub fn new(name: impl Into<String>, services: ServiceRegistry) -> Result<Self, FeatureError> {
        Self::with_object_factory(name, services, DefaultObjectFactory::shared())
    }

    pub fn with_object_factory(
        name: impl Into<String>,
        services: ServiceRegistry,
        object_factory: Arc<dyn ObjectFactory>,
    ) -> Result<Self, FeatureError> {
        let name = name.into();
        let registry = Arc::new(ProjectFeatureRegistry::new());
        let plugins = Arc::new(PluginManager::new(Arc::clone(&registry)));
        let support = ProjectFeatureSupport::new();
        let applicator = Arc::new(ProjectFeatureApplicator::new(
            Arc::clone(&support),
            Arc::clone(&plugins),
            Arc::clone(&object_factory),
            Arc::new(services),
        ));

        let object = object_factory.new_instance(ModelType::project())?;
        support.attach_definition_context(
            &object,
            ProjectFeatureSupport::build_model_none(),
            Arc::clone(&object_factory),
        );
        tracing::debug!(project = %name, "created project");

        Ok(Project {
            name,
            object,
            object_factory,
            registry,
            plugins,
            support,
            applicator,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The project object.
    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    pub fn object_factory(&self) -> &Arc<dyn ObjectFactory> {
        &self.object_factory
    }

    pub fn registry(&self) -> &Arc<ProjectFeatureRegistry> {
        &self.registry
    }

    pub fn plugins(&self) -> &Arc<PluginManager> {
        &self.plugins
    }

    pub fn support(&self) -> &Arc<ProjectFeatureSupport> {
        &self.support
    }

    pub fn applicator(&self) -> &Arc<ProjectFeatureApplicator> {
        &self.applicator
    }

    /// Make `plugin` available to the project.
    pub fn add_plugin(&self, plugin: Arc<dyn Plugin>) {
        self.plugins.add_plugin(plugin);
    }

    pub fn apply_plugin(&self, id: impl Into<PluginId>) -> Result<(), FeatureError> {
        self.plugins.apply(id.into())
    }

    /// The project type applied to this project, if any.
    pub fn project_type(&self) -> Option<Arc<FeatureApplication>> {
        self.support
            .try_get_context(&self.object)
            .and_then(|context| context.child_at(0))
    }

    /// Feature methods available on `definition`.
    pub fn features_dynamic_object(&self, definition: &ObjectRef) -> ProjectFeaturesDynamicObject {
        ProjectFeaturesDynamicObject::new(
            Arc::clone(definition),
            Arc::clone(&self.registry),
            Arc::clone(&self.applicator),
        )
    }

    /// The full configuration surface of `definition`: its own properties,
    /// then the features that apply to it.
    pub fn dynamic_object(&self, definition: &ObjectRef) -> CompositeDynamicObject {
        CompositeDynamicObject::new(format!("{:?}", definition))
            .with(BeanDynamicObject::new(Arc::clone(definition)))
            .with(self.features_dynamic_object(definition))
    }

    /// Call `name { block }` on the project and return the configured object.
    pub fn configure<F>(&self, name: &str, block: F) -> Result<ObjectRef>
    where
        F: Fn(&ObjectRef) -> Result<()> + Send + Sync + 'static,
    {
        self.configure_definition(&self.object, name, block)
    }

    /// Call `name { block }` on `definition` and return the configured object.
    pub fn configure_definition<F>(
        &self,
        definition: &ObjectRef,
        name: &str,
        block: F,
    ) -> Result<ObjectRef>
    where
        F: Fn(&ObjectRef) -> Result<()> + Send + Sync + 'static,
    {
        self.dynamic_object(definition)
            .invoke_method(name, &[Argument::block(block)])?
            .and_then(|value| value.as_object().cloned())
            .ok_or_else(|| anyhow!("`{}` does not configure an object", name))
    }

    /// Apply every feature declared anywhere in the project.
    pub fn walk_and_apply_features(&self) -> Result<(), FeatureError> {
        self.support.walk_and_apply_features(&self.object)
    }
}
