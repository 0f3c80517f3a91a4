//! The configuration object model.
//!
//! Plugins describe their configuration surface with [`ModelType`]s; the
//! [`ObjectFactory`] turns those into [`ModelObject`]s; build scripts reach the
//! objects through [`DynamicObject`] dispatch.

pub mod dynamic;
pub mod errors;
pub mod factory;
pub mod model_type;
pub mod object;
pub mod services;

pub use dynamic::{
    Argument, BeanDynamicObject, CompositeDynamicObject, ConfigureBlock, DynamicInvokeResult,
    DynamicObject,
};
pub use errors::ModelError;
pub use factory::{DefaultObjectFactory, ObjectFactory};
pub use model_type::{ModelType, PropertyDecl, PropertyKind};
pub use object::{ModelObject, NamedContainer, ObjectId, ObjectRef, PropertyValue};
pub use services::{LookupFailure, ServiceLookup, ServiceLookupExt, ServiceRegistry};
