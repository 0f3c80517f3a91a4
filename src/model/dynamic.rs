//! Dynamic method dispatch for the configuration surface.
//!
//! Build scripts configure objects through calls that are resolved at run time:
//! `version("1.0")` sets a property, `dependencies { ... }` configures a nested
//! object, and feature names like `native { ... }` apply a feature. Each source
//! of such methods implements [`DynamicObject`]; a [`CompositeDynamicObject`]
//! asks them in order.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::model::errors::ModelError;
use crate::model::object::{ObjectRef, PropertyValue};

/// A configuration block, run against the object it configures.
pub type ConfigureBlock = Arc<dyn Fn(&ObjectRef) -> Result<()> + Send + Sync>;

/// An argument to a dynamically dispatched call.
#[derive(Clone)]
pub enum Argument {
    Block(ConfigureBlock),
    Value(PropertyValue),
}

impl Argument {
    /// Wrap a closure as a block argument.
    pub fn block<F>(f: F) -> Self
    where
        F: Fn(&ObjectRef) -> Result<()> + Send + Sync + 'static,
    {
        Argument::Block(Arc::new(f))
    }

    pub fn value(value: impl Into<PropertyValue>) -> Self {
        Argument::Value(value.into())
    }

    pub fn as_block(&self) -> Option<&ConfigureBlock> {
        match self {
            Argument::Block(block) => Some(block),
            Argument::Value(_) => None,
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Block(_) => f.write_str("{ ... }"),
            Argument::Value(value) => fmt::Debug::fmt(value, f),
        }
    }
}

/// The single block argument of a call, if that is exactly what was passed.
pub fn single_block(args: &[Argument]) -> Option<&ConfigureBlock> {
    match args {
        [Argument::Block(block)] => Some(block),
        _ => None,
    }
}

/// Outcome of a dispatch attempt.
#[derive(Debug)]
pub enum DynamicInvokeResult {
    /// The call was handled; carries the call's result, if it has one.
    Found(Option<PropertyValue>),
    /// This object does not handle the call; another one may.
    NotFound,
}

impl DynamicInvokeResult {
    pub fn is_found(&self) -> bool {
        matches!(self, DynamicInvokeResult::Found(_))
    }

    /// The call result, if the call was handled and produced one.
    pub fn value(self) -> Option<PropertyValue> {
        match self {
            DynamicInvokeResult::Found(value) => value,
            DynamicInvokeResult::NotFound => None,
        }
    }
}

/// A source of dynamically dispatched methods.
pub trait DynamicObject {
    /// Human readable name of the receiver, used in error messages.
    fn display_name(&self) -> String;

    /// Whether a call with this name and these arguments would be handled.
    fn has_method(&self, name: &str, args: &[Argument]) -> bool;

    /// Attempt the call. `NotFound` lets another dynamic object try.
    fn try_invoke_method(&self, name: &str, args: &[Argument]) -> Result<DynamicInvokeResult>;

    /// Perform the call, failing when nothing handles it.
    fn invoke_method(&self, name: &str, args: &[Argument]) -> Result<Option<PropertyValue>> {
        match self.try_invoke_method(name, args)? {
            DynamicInvokeResult::Found(value) => Ok(value),
            DynamicInvokeResult::NotFound => Err(ModelError::MissingMethod {
                type_name: self.display_name(),
                method: name.to_string(),
            }
            .into()),
        }
    }
}

/// Exposes an object's own properties as methods.
///
/// * `name(value)` sets the value property `name`
/// * `name { block }` runs the block against the nested object `name`
pub struct BeanDynamicObject {
    object: ObjectRef,
}

impl BeanDynamicObject {
    pub fn new(object: ObjectRef) -> Self {
        BeanDynamicObject { object }
    }
}

impl DynamicObject for BeanDynamicObject {
    fn display_name(&self) -> String {
        self.object.model_type().name().to_string()
    }

    fn has_method(&self, name: &str, args: &[Argument]) -> bool {
        match args {
            [Argument::Value(_)] => self.object.has_value_property(name),
            [Argument::Block(_)] => self.object.nested(name).is_ok(),
            _ => false,
        }
    }

    fn try_invoke_method(&self, name: &str, args: &[Argument]) -> Result<DynamicInvokeResult> {
        if !self.has_method(name, args) {
            return Ok(DynamicInvokeResult::NotFound);
        }
        match args {
            [Argument::Value(value)] => {
                self.object.set(name, value.clone())?;
                Ok(DynamicInvokeResult::Found(None))
            }
            [Argument::Block(block)] => {
                let nested = self.object.nested(name)?;
                block(&nested)?;
                Ok(DynamicInvokeResult::Found(Some(PropertyValue::Object(nested))))
            }
            _ => Ok(DynamicInvokeResult::NotFound),
        }
    }
}

/// Dispatches to each member in turn.
pub struct CompositeDynamicObject {
    display_name: String,
    members: Vec<Box<dyn DynamicObject>>,
}

impl CompositeDynamicObject {
    pub fn new(display_name: impl Into<String>) -> Self {
        CompositeDynamicObject {
            display_name: display_name.into(),
            members: Vec::new(),
        }
    }

    pub fn with(mut self, member: impl DynamicObject + 'static) -> Self {
        self.members.push(Box::new(member));
        self
    }
}

impl DynamicObject for CompositeDynamicObject {
    fn display_name(&self) -> String {
        self.display_name.clone()
    }

    fn has_method(&self, name: &str, args: &[Argument]) -> bool {
        self.members.iter().any(|m| m.has_method(name, args))
    }

    fn try_invoke_method(&self, name: &str, args: &[Argument]) -> Result<DynamicInvokeResult> {
        for member in &self.members {
            let result = member.try_invoke_method(name, args)?;
            if result.is_found() {
                return Ok(result);
            }
        }
        Ok(DynamicInvokeResult::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::factory::DefaultObjectFactory;
    use crate::model::model_type::ModelType;

    fn library() -> ObjectRef {
        let publishing = ModelType::builder("Publishing").value("repository").build();
        let ty = ModelType::builder("Library")
            .value("version")
            .nested("publishing", &publishing)
            .build();
        DefaultObjectFactory::shared().new_instance(&ty).unwrap()
    }

    #[test]
    fn test_bean_sets_value_property() {
        let library = library();
        let bean = BeanDynamicObject::new(library.clone());

        assert!(bean.has_method("version", &[Argument::value("1.2")]));
        bean.invoke_method("version", &[Argument::value("1.2")]).unwrap();
        assert_eq!(library.get("version").unwrap(), Some("1.2".into()));
    }

    #[test]
    fn test_bean_configures_nested_object() {
        let library = library();
        let bean = BeanDynamicObject::new(library.clone());

        let result = bean
            .invoke_method(
                "publishing",
                &[Argument::block(|publishing| {
                    publishing.set("repository", "central")?;
                    Ok(())
                })],
            )
            .unwrap();

        let publishing = library.nested("publishing").unwrap();
        assert_eq!(result, Some(PropertyValue::Object(publishing.clone())));
        assert_eq!(publishing.get("repository").unwrap(), Some("central".into()));
    }

    #[test]
    fn test_composite_reports_missing_method() {
        let composite = CompositeDynamicObject::new("library")
            .with(BeanDynamicObject::new(library()));

        assert!(!composite.has_method("jvm", &[Argument::block(|_| Ok(()))]));
        let err = composite
            .invoke_method("jvm", &[Argument::block(|_| Ok(()))])
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ModelError>(),
            Some(ModelError::MissingMethod { .. })
        ));
    }

    #[test]
    fn test_single_block() {
        let block = Argument::block(|_| Ok(()));
        assert!(single_block(&[block.clone()]).is_some());
        assert!(single_block(&[]).is_none());
        assert!(single_block(&[block.clone(), block]).is_none());
        assert!(single_block(&[Argument::value(1i64)]).is_none());
    }
}
