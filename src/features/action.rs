//! Apply actions and the context they run in.
//!
//! An apply action is the transform that wires a feature into its target once
//! the feature is applied. Project features receive the parent definition;
//! project types do not, and are adapted to the wider signature with
//! [`ProjectTypeApplyActionAdapter`].

use std::any::{type_name, Any, TypeId};
use std::sync::{Arc, Weak};

use anyhow::Result;

use crate::features::declaration::Safety;
use crate::features::errors::FeatureError;
use crate::features::support::ProjectFeatureSupport;
use crate::model::services::{
    LookupFailure, SafeServices, ServiceInstance, ServiceLookup, ServiceLookupExt,
};
use crate::model::{ModelType, ObjectFactory, ObjectRef, ServiceRegistry};
use crate::util::InternedString;

/// Transform applied when a project feature is applied to a parent definition.
pub trait ProjectFeatureApplyAction: Send + Sync {
    fn apply(
        &self,
        context: &ProjectFeatureApplicationContext,
        definition: &ObjectRef,
        build_model: &ObjectRef,
        parent: &ObjectRef,
    ) -> Result<()>;
}

impl<F> ProjectFeatureApplyAction for F
where
    F: Fn(&ProjectFeatureApplicationContext, &ObjectRef, &ObjectRef, &ObjectRef) -> Result<()>
        + Send
        + Sync,
{
    fn apply(
        &self,
        context: &ProjectFeatureApplicationContext,
        definition: &ObjectRef,
        build_model: &ObjectRef,
        parent: &ObjectRef,
    ) -> Result<()> {
        self(context, definition, build_model, parent)
    }
}

/// Transform applied when a project type is applied to a project.
pub trait ProjectTypeApplyAction: Send + Sync {
    fn apply(
        &self,
        context: &ProjectFeatureApplicationContext,
        definition: &ObjectRef,
        build_model: &ObjectRef,
    ) -> Result<()>;
}

impl<F> ProjectTypeApplyAction for F
where
    F: Fn(&ProjectFeatureApplicationContext, &ObjectRef, &ObjectRef) -> Result<()> + Send + Sync,
{
    fn apply(
        &self,
        context: &ProjectFeatureApplicationContext,
        definition: &ObjectRef,
        build_model: &ObjectRef,
    ) -> Result<()> {
        self(context, definition, build_model)
    }
}

/// Runs a project type action where a project feature action is expected,
/// discarding the parent argument.
pub struct ProjectTypeApplyActionAdapter {
    action: Arc<dyn ProjectTypeApplyAction>,
}

impl ProjectTypeApplyActionAdapter {
    pub fn new(action: Arc<dyn ProjectTypeApplyAction>) -> Self {
        ProjectTypeApplyActionAdapter { action }
    }
}

impl ProjectFeatureApplyAction for ProjectTypeApplyActionAdapter {
    fn apply(
        &self,
        context: &ProjectFeatureApplicationContext,
        definition: &ObjectRef,
        build_model: &ObjectRef,
        _parent: &ObjectRef,
    ) -> Result<()> {
        self.action.apply(context, definition, build_model)
    }
}

type CreateAction =
    dyn Fn(&ApplyActionServices) -> Result<Arc<dyn ProjectFeatureApplyAction>, FeatureError>
    + Send
    + Sync;

/// Produces the apply action for one feature application.
///
/// The factory receives the services the action is allowed to use, scoped by
/// the binding's apply action safety.
#[derive(Clone)]
pub struct ApplyActionFactory {
    create: Arc<CreateAction>,
}

impl ApplyActionFactory {
    /// A factory that builds the action from services.
    pub fn new<F>(create: F) -> Self
    where
        F: Fn(&ApplyActionServices) -> Result<Arc<dyn ProjectFeatureApplyAction>, FeatureError>
            + Send
            + Sync
            + 'static,
    {
        ApplyActionFactory {
            create: Arc::new(create),
        }
    }

    /// A factory that always returns `action`.
    pub fn of(action: Arc<dyn ProjectFeatureApplyAction>) -> Self {
        Self::new(move |_| Ok(Arc::clone(&action)))
    }

    /// A factory for a project type action built from services.
    pub fn project_type<F>(create: F) -> Self
    where
        F: Fn(&ApplyActionServices) -> Result<Arc<dyn ProjectTypeApplyAction>, FeatureError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(move |services| {
            let action = create(services)?;
            let action: Arc<dyn ProjectFeatureApplyAction> =
                Arc::new(ProjectTypeApplyActionAdapter::new(action));
            Ok(action)
        })
    }

    pub fn create(
        &self,
        services: &ApplyActionServices,
    ) -> Result<Arc<dyn ProjectFeatureApplyAction>, FeatureError> {
        (self.create)(services)
    }
}

/// Services visible to one feature's apply action.
#[derive(Clone)]
pub struct ApplyActionServices {
    feature: InternedString,
    safety: Safety,
    registry: Arc<ServiceRegistry>,
}

impl ApplyActionServices {
    pub fn new(feature: InternedString, safety: Safety, registry: Arc<ServiceRegistry>) -> Self {
        ApplyActionServices {
            feature,
            safety,
            registry,
        }
    }

    pub fn safety(&self) -> Safety {
        self.safety
    }

    /// Get a service, enforcing the apply action's safety.
    pub fn get<T: Any + Send + Sync>(&self) -> Result<Arc<T>, FeatureError> {
        let found = match self.safety {
            Safety::Safe => SafeServices::new(Arc::clone(&self.registry)).service::<T>(),
            Safety::Unsafe => self.registry.service::<T>(),
        };
        found.map_err(|failure| {
            let feature = self.feature.to_string();
            let service = type_name::<T>().to_string();
            match failure {
                LookupFailure::Restricted => FeatureError::UnsafeService { feature, service },
                LookupFailure::Unknown => FeatureError::UnknownService { feature, service },
            }
        })
    }

    /// Names of the services a safe action may use.
    pub fn safe_service_names(&self) -> Vec<&'static str> {
        self.registry.safe_service_names()
    }
}

impl ServiceLookup for ApplyActionServices {
    fn find(&self, service: TypeId) -> Result<ServiceInstance, LookupFailure> {
        match self.safety {
            Safety::Safe => SafeServices::new(Arc::clone(&self.registry)).find(service),
            Safety::Unsafe => self.registry.find(service),
        }
    }
}

/// Context handed to apply actions.
#[derive(Clone)]
pub struct ProjectFeatureApplicationContext {
    object_factory: Arc<dyn ObjectFactory>,
    services: ApplyActionServices,
    support: Weak<ProjectFeatureSupport>,
}

impl ProjectFeatureApplicationContext {
    pub(crate) fn new(
        object_factory: Arc<dyn ObjectFactory>,
        services: ApplyActionServices,
        support: Weak<ProjectFeatureSupport>,
    ) -> Self {
        ProjectFeatureApplicationContext {
            object_factory,
            services,
            support,
        }
    }

    /// Factory for objects created by the apply action.
    pub fn object_factory(&self) -> &Arc<dyn ObjectFactory> {
        &self.object_factory
    }

    pub fn services(&self) -> &ApplyActionServices {
        &self.services
    }

    /// Attach a build model of `model_type` to `definition`, so that features
    /// can be applied to it. Returns the existing model if one is attached.
    pub fn register_build_model(
        &self,
        definition: &ObjectRef,
        model_type: &ModelType,
    ) -> Result<ObjectRef, FeatureError> {
        let support = self.support()?;
        if let Some(context) = support.try_get_context(definition) {
            return Ok(Arc::clone(context.build_model()));
        }
        let build_model = if model_type == ModelType::build_model_none() {
            ProjectFeatureSupport::build_model_none()
        } else {
            self.object_factory.new_instance(model_type)?
        };
        support.attach_definition_context(
            definition,
            Arc::clone(&build_model),
            Arc::clone(&self.object_factory),
        );
        Ok(build_model)
    }

    /// The build model attached to `definition`.
    pub fn build_model(&self, definition: &ObjectRef) -> Result<ObjectRef, FeatureError> {
        let context = self.support()?.get_context(definition)?;
        Ok(Arc::clone(context.build_model()))
    }

    fn support(&self) -> Result<Arc<ProjectFeatureSupport>, FeatureError> {
        self.support.upgrade().ok_or_else(|| FeatureError::MissingDefinitionContext {
            definition: "<dropped project>".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DefaultObjectFactory;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Layout;
    struct Toolchains;

    fn services(safety: Safety) -> ApplyActionServices {
        let mut registry = ServiceRegistry::new();
        registry.add_safe(Layout).add(Toolchains);
        ApplyActionServices::new("jvm".into(), safety, Arc::new(registry))
    }

    #[test]
    fn test_safe_action_cannot_use_unsafe_service() {
        let safe = services(Safety::Safe);
        assert!(safe.get::<Layout>().is_ok());
        assert!(matches!(
            safe.get::<Toolchains>(),
            Err(FeatureError::UnsafeService { .. })
        ));
        assert!(matches!(
            safe.get::<String>(),
            Err(FeatureError::UnknownService { .. })
        ));
    }

    #[test]
    fn test_unsafe_action_sees_all_services() {
        let unsafe_services = services(Safety::Unsafe);
        assert!(unsafe_services.get::<Layout>().is_ok());
        assert!(unsafe_services.get::<Toolchains>().is_ok());
    }

    #[test]
    fn test_project_type_adapter_ignores_parent() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        let factory = ApplyActionFactory::project_type(move |_| {
            let flag = Arc::clone(&flag);
            let action = move |_: &ProjectFeatureApplicationContext,
                               _: &ObjectRef,
                               _: &ObjectRef|
                  -> Result<()> {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            };
            Ok(Arc::new(action) as Arc<dyn ProjectTypeApplyAction>)
        });

        let action = factory.create(&services(Safety::Safe)).unwrap();
        let objects = DefaultObjectFactory::shared();
        let object = objects.new_instance(ModelType::project()).unwrap();
        let context = ProjectFeatureApplicationContext::new(
            Arc::clone(&objects),
            services(Safety::Safe),
            Weak::new(),
        );
        action.apply(&context, &object, &object, &object).unwrap();
        assert!(called.load(Ordering::SeqCst));
    }
}
