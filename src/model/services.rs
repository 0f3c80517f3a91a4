//! Service lookup.
//!
//! Services are registered by type in a [`ServiceRegistry`]. Code running on
//! behalf of a plugin reaches them through a [`ServiceLookup`], which may
//! expose only part of the registry.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::model::errors::ModelError;

/// A type-erased service instance.
pub type ServiceInstance = Arc<dyn Any + Send + Sync>;

/// Why a lookup did not produce a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupFailure {
    /// No such service is registered.
    Unknown,
    /// The service exists but is not visible through this lookup.
    Restricted,
}

/// Resolves services by type.
pub trait ServiceLookup: Send + Sync {
    /// Find the service registered for `service`.
    fn find(&self, service: TypeId) -> Result<ServiceInstance, LookupFailure>;
}

/// Typed access on top of [`ServiceLookup`].
pub trait ServiceLookupExt {
    /// Find a service by its concrete type.
    fn service<T: Any + Send + Sync>(&self) -> Result<Arc<T>, LookupFailure>;
}

impl<L: ServiceLookup + ?Sized> ServiceLookupExt for L {
    fn service<T: Any + Send + Sync>(&self) -> Result<Arc<T>, LookupFailure> {
        let instance = self.find(TypeId::of::<T>())?;
        // Registration is keyed by the concrete TypeId, so the downcast cannot miss.
        instance.downcast::<T>().map_err(|_| LookupFailure::Unknown)
    }
}

struct ServiceEntry {
    name: &'static str,
    instance: ServiceInstance,
    safe: bool,
}

/// All services known to a project.
#[derive(Default)]
pub struct ServiceRegistry {
    services: HashMap<TypeId, ServiceEntry>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service that safe apply actions may use.
    pub fn add_safe<T: Any + Send + Sync>(&mut self, service: T) -> &mut Self {
        self.insert(service, true)
    }

    /// Register a service that only unsafe apply actions may use.
    pub fn add<T: Any + Send + Sync>(&mut self, service: T) -> &mut Self {
        self.insert(service, false)
    }

    fn insert<T: Any + Send + Sync>(&mut self, service: T, safe: bool) -> &mut Self {
        self.services.insert(
            TypeId::of::<T>(),
            ServiceEntry {
                name: type_name::<T>(),
                instance: Arc::new(service),
                safe,
            },
        );
        self
    }

    /// Get a registered service.
    pub fn get<T: Any + Send + Sync>(&self) -> Result<Arc<T>, ModelError> {
        self.service::<T>().map_err(|_| ModelError::UnknownService {
            service: type_name::<T>(),
        })
    }

    /// Whether the service type is registered as safe.
    pub fn is_safe(&self, service: TypeId) -> bool {
        self.services.get(&service).map(|e| e.safe).unwrap_or(false)
    }

    /// Names of the safe services, sorted.
    pub fn safe_service_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .services
            .values()
            .filter(|e| e.safe)
            .map(|e| e.name)
            .collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl ServiceLookup for ServiceRegistry {
    fn find(&self, service: TypeId) -> Result<ServiceInstance, LookupFailure> {
        self.services
            .get(&service)
            .map(|e| Arc::clone(&e.instance))
            .ok_or(LookupFailure::Unknown)
    }
}

/// A view of a registry restricted to its safe services.
pub struct SafeServices {
    registry: Arc<ServiceRegistry>,
}

impl SafeServices {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        SafeServices { registry }
    }
}

impl ServiceLookup for SafeServices {
    fn find(&self, service: TypeId) -> Result<ServiceInstance, LookupFailure> {
        let instance = self.registry.find(service)?;
        if self.registry.is_safe(service) {
            Ok(instance)
        } else {
            Err(LookupFailure::Restricted)
        }
    }
}
