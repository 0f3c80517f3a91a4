//! Object instantiation.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use crate::model::errors::ModelError;
use crate::model::model_type::ModelType;
use crate::model::object::{ModelObject, ObjectRef};

/// Creates configuration objects.
///
/// Definitions and build models are always created through a factory so that
/// nested objects and containers are set up consistently.
pub trait ObjectFactory: Send + Sync {
    /// Create a new instance of `ty`.
    fn new_instance(&self, ty: &ModelType) -> Result<ObjectRef, ModelError>;
}

/// The standard factory.
///
/// Abstract types can be instantiated only if a concrete implementation type
/// has been registered for them.
pub struct DefaultObjectFactory {
    this: Weak<DefaultObjectFactory>,
    implementations: HashMap<ModelType, ModelType>,
}

impl DefaultObjectFactory {
    /// A factory with no registered implementation types.
    pub fn shared() -> Arc<dyn ObjectFactory> {
        Self::with_implementations(HashMap::new())
    }

    /// A factory that instantiates each key type using the mapped concrete type.
    pub fn with_implementations(
        implementations: HashMap<ModelType, ModelType>,
    ) -> Arc<dyn ObjectFactory> {
        Arc::new_cyclic(|this| DefaultObjectFactory {
            this: this.clone(),
            implementations,
        })
    }

    fn resolve<'a>(&'a self, ty: &'a ModelType) -> &'a ModelType {
        self.implementations.get(ty).unwrap_or(ty)
    }
}

impl ObjectFactory for DefaultObjectFactory {
    fn new_instance(&self, ty: &ModelType) -> Result<ObjectRef, ModelError> {
        let concrete = self.resolve(ty);
        if concrete.is_abstract() {
            return Err(ModelError::AbstractType {
                type_name: ty.name().to_string(),
            });
        }

        let this: Arc<dyn ObjectFactory> = match self.this.upgrade() {
            Some(this) => this,
            None => DefaultObjectFactory::with_implementations(self.implementations.clone()),
        };
        let object = ModelObject::instantiate(concrete, &this)?;
        tracing::trace!(ty = %concrete, id = %object.id(), "instantiated object");
        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abstract_type_rejected() {
        let ty = ModelType::builder("Component").abstract_type().build();
        let factory = DefaultObjectFactory::shared();
        assert!(matches!(
            factory.new_instance(&ty),
            Err(ModelError::AbstractType { .. })
        ));
    }

    #[test]
    fn test_registered_implementation_used() {
        let public = ModelType::builder("Component").abstract_type().build();
        let concrete = ModelType::builder("DefaultComponent")
            .extends(&public)
            .value("name")
            .build();
        let holder = ModelType::builder("Holder").nested("component", &public).build();

        let mut implementations = HashMap::new();
        implementations.insert(public.clone(), concrete.clone());
        let factory = DefaultObjectFactory::with_implementations(implementations);

        let holder = factory.new_instance(&holder).unwrap();
        let component = holder.nested("component").unwrap();
        assert_eq!(component.model_type(), &concrete);
        assert!(component.is_instance_of(&public));
    }
}
