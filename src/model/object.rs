//! Configuration objects.
//!
//! A [`ModelObject`] is an instance of a [`ModelType`]. It owns one slot per
//! declared property: value properties (with a convention and a finalized
//! flag), nested objects, and named containers. Objects have identity; two
//! objects are the same object only if their [`ObjectId`]s are equal.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::model::errors::ModelError;
use crate::model::factory::ObjectFactory;
use crate::model::model_type::{ModelType, PropertyKind};
use crate::util::InternedString;

/// Shared handle to a configuration object.
pub type ObjectRef = Arc<ModelObject>;

/// Identity of a [`ModelObject`]. Ids are never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

impl ObjectId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ObjectId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A property value.
#[derive(Clone)]
pub enum PropertyValue {
    String(String),
    Bool(bool),
    Int(i64),
    List(Vec<PropertyValue>),
    Object(ObjectRef),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            PropertyValue::Object(o) => Some(o),
            _ => None,
        }
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropertyValue::String(a), PropertyValue::String(b)) => a == b,
            (PropertyValue::Bool(a), PropertyValue::Bool(b)) => a == b,
            (PropertyValue::Int(a), PropertyValue::Int(b)) => a == b,
            (PropertyValue::List(a), PropertyValue::List(b)) => a == b,
            (PropertyValue::Object(a), PropertyValue::Object(b)) => a.id() == b.id(),
            _ => false,
        }
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => fmt::Debug::fmt(s, f),
            PropertyValue::Bool(b) => fmt::Debug::fmt(b, f),
            PropertyValue::Int(i) => fmt::Debug::fmt(i, f),
            PropertyValue::List(items) => f.debug_list().entries(items).finish(),
            PropertyValue::Object(o) => write!(f, "{}{}", o.model_type(), o.id()),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Int(i)
    }
}

impl From<ObjectRef> for PropertyValue {
    fn from(o: ObjectRef) -> Self {
        PropertyValue::Object(o)
    }
}

#[derive(Default)]
struct ValueSlot {
    value: Option<PropertyValue>,
    convention: Option<PropertyValue>,
    finalized: bool,
}

enum Slot {
    Value(ValueSlot),
    Nested(ObjectRef),
    Container(Arc<NamedContainer>),
}

impl Slot {
    fn kind_name(&self) -> &'static str {
        match self {
            Slot::Value(_) => "value",
            Slot::Nested(_) => "nested",
            Slot::Container(_) => "container",
        }
    }
}

/// An instance of a [`ModelType`].
pub struct ModelObject {
    id: ObjectId,
    model_type: ModelType,
    slots: RwLock<IndexMap<InternedString, Slot>>,
}

impl ModelObject {
    /// Create an object with the slots declared by `model_type`.
    ///
    /// Nested objects and containers are created through `factory`.
    pub(crate) fn instantiate(
        model_type: &ModelType,
        factory: &Arc<dyn ObjectFactory>,
    ) -> Result<ObjectRef, ModelError> {
        let mut slots = IndexMap::new();
        for decl in model_type.properties() {
            let slot = match &decl.kind {
                PropertyKind::Value => Slot::Value(ValueSlot::default()),
                PropertyKind::Nested(ty) => Slot::Nested(factory.new_instance(ty)?),
                PropertyKind::Container(element) => Slot::Container(Arc::new(NamedContainer::new(
                    format!("{}.{}", model_type.name(), decl.name),
                    element.clone(),
                    Arc::clone(factory),
                ))),
            };
            slots.insert(decl.name, slot);
        }

        Ok(Arc::new(ModelObject {
            id: ObjectId::next(),
            model_type: model_type.clone(),
            slots: RwLock::new(slots),
        }))
    }

    /// An object with no property slots, for marker types.
    pub(crate) fn marker(model_type: &ModelType) -> ObjectRef {
        Arc::new(ModelObject {
            id: ObjectId::next(),
            model_type: model_type.clone(),
            slots: RwLock::new(IndexMap::new()),
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn model_type(&self) -> &ModelType {
        &self.model_type
    }

    /// Whether this object can be used where `ty` is expected.
    pub fn is_instance_of(&self, ty: &ModelType) -> bool {
        ty.is_assignable_from(&self.model_type)
    }

    /// Names of all properties, in declaration order.
    pub fn property_names(&self) -> Vec<InternedString> {
        self.slots.read().keys().copied().collect()
    }

    /// Whether `name` is a value property of this object.
    pub fn has_value_property(&self, name: &str) -> bool {
        matches!(self.slots.read().get(name), Some(Slot::Value(_)))
    }

    /// Read a value property: the explicit value, else the convention.
    pub fn get(&self, name: &str) -> Result<Option<PropertyValue>, ModelError> {
        let slots = self.slots.read();
        match slots.get(name) {
            Some(Slot::Value(slot)) => Ok(slot.value.clone().or_else(|| slot.convention.clone())),
            Some(other) => Err(self.wrong_kind(name, "value", other)),
            None => Err(self.unknown(name)),
        }
    }

    /// Set the explicit value of a value property.
    pub fn set(&self, name: &str, value: impl Into<PropertyValue>) -> Result<(), ModelError> {
        let mut slots = self.slots.write();
        let slot = self.value_slot_mut(&mut slots, name)?;
        if slot.finalized {
            return Err(ModelError::PropertyFinalized {
                type_name: self.model_type.name().to_string(),
                property: name.to_string(),
            });
        }
        slot.value = Some(value.into());
        Ok(())
    }

    /// Set the convention (default) of a value property.
    pub fn set_convention(
        &self,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<(), ModelError> {
        let mut slots = self.slots.write();
        let slot = self.value_slot_mut(&mut slots, name)?;
        if slot.finalized {
            return Err(ModelError::PropertyFinalized {
                type_name: self.model_type.name().to_string(),
                property: name.to_string(),
            });
        }
        slot.convention = Some(value.into());
        Ok(())
    }

    /// Whether a value property has been finalized.
    pub fn is_finalized(&self, name: &str) -> Result<bool, ModelError> {
        let slots = self.slots.read();
        match slots.get(name) {
            Some(Slot::Value(slot)) => Ok(slot.finalized),
            Some(other) => Err(self.wrong_kind(name, "value", other)),
            None => Err(self.unknown(name)),
        }
    }

    /// Get a nested object.
    pub fn nested(&self, name: &str) -> Result<ObjectRef, ModelError> {
        let slots = self.slots.read();
        match slots.get(name) {
            Some(Slot::Nested(object)) => Ok(Arc::clone(object)),
            Some(other) => Err(self.wrong_kind(name, "nested", other)),
            None => Err(self.unknown(name)),
        }
    }

    /// Get a named container.
    pub fn container(&self, name: &str) -> Result<Arc<NamedContainer>, ModelError> {
        let slots = self.slots.read();
        match slots.get(name) {
            Some(Slot::Container(container)) => Ok(Arc::clone(container)),
            Some(other) => Err(self.wrong_kind(name, "container", other)),
            None => Err(self.unknown(name)),
        }
    }

    /// All nested objects with their property names.
    pub fn nested_objects(&self) -> Vec<(InternedString, ObjectRef)> {
        self.slots
            .read()
            .iter()
            .filter_map(|(name, slot)| match slot {
                Slot::Nested(object) => Some((*name, Arc::clone(object))),
                _ => None,
            })
            .collect()
    }

    /// All containers with their property names.
    pub fn containers(&self) -> Vec<(InternedString, Arc<NamedContainer>)> {
        self.slots
            .read()
            .iter()
            .filter_map(|(name, slot)| match slot {
                Slot::Container(container) => Some((*name, Arc::clone(container))),
                _ => None,
            })
            .collect()
    }

    /// Finalize every value property of this object and of its nested objects.
    ///
    /// The current value (or convention) becomes fixed; later writes fail.
    pub fn finalize_values(&self) {
        let nested = {
            let mut slots = self.slots.write();
            for slot in slots.values_mut() {
                if let Slot::Value(value) = slot {
                    if value.value.is_none() {
                        value.value = value.convention.clone();
                    }
                    value.finalized = true;
                }
            }
            self.nested_objects_locked(&slots)
        };
        for object in nested {
            object.finalize_values();
        }
    }

    fn nested_objects_locked(&self, slots: &IndexMap<InternedString, Slot>) -> Vec<ObjectRef> {
        slots
            .values()
            .filter_map(|slot| match slot {
                Slot::Nested(object) => Some(Arc::clone(object)),
                _ => None,
            })
            .collect()
    }

    fn value_slot_mut<'a>(
        &self,
        slots: &'a mut IndexMap<InternedString, Slot>,
        name: &str,
    ) -> Result<&'a mut ValueSlot, ModelError> {
        match slots.get_mut(name) {
            Some(Slot::Value(slot)) => Ok(slot),
            Some(other) => Err(self.wrong_kind(name, "value", other)),
            None => Err(self.unknown(name)),
        }
    }

    fn unknown(&self, name: &str) -> ModelError {
        ModelError::UnknownProperty {
            type_name: self.model_type.name().to_string(),
            property: name.to_string(),
        }
    }

    fn wrong_kind(&self, name: &str, expected: &'static str, actual: &Slot) -> ModelError {
        ModelError::WrongPropertyKind {
            type_name: self.model_type.name().to_string(),
            property: name.to_string(),
            expected,
            actual: actual.kind_name(),
        }
    }
}

impl fmt::Debug for ModelObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.model_type, self.id)
    }
}

/// Action run against container elements.
pub type ElementAction = Arc<dyn Fn(&ObjectRef) -> Result<()> + Send + Sync>;

/// A named, insertion-ordered container of objects of one element type.
///
/// Actions registered with [`NamedContainer::configure_each`] run against every
/// element present at registration and every element created afterwards.
pub struct NamedContainer {
    display_name: String,
    element_type: ModelType,
    factory: Arc<dyn ObjectFactory>,
    elements: RwLock<IndexMap<String, ObjectRef>>,
    actions: RwLock<Vec<ElementAction>>,
}

impl NamedContainer {
    fn new(display_name: String, element_type: ModelType, factory: Arc<dyn ObjectFactory>) -> Self {
        NamedContainer {
            display_name,
            element_type,
            factory,
            elements: RwLock::new(IndexMap::new()),
            actions: RwLock::new(Vec::new()),
        }
    }

    pub fn element_type(&self) -> &ModelType {
        &self.element_type
    }

    /// Create a new element and run the registered actions against it.
    pub fn create(&self, name: &str) -> Result<ObjectRef> {
        if self.elements.read().contains_key(name) {
            return Err(ModelError::DuplicateElement {
                container: self.display_name.clone(),
                element: name.to_string(),
            }
            .into());
        }

        let element = self.factory.new_instance(&self.element_type)?;
        self.elements
            .write()
            .insert(name.to_string(), Arc::clone(&element));

        // Actions may create further elements; never run them under a lock.
        let actions: Vec<ElementAction> = self.actions.read().clone();
        for action in actions {
            action(&element)?;
        }

        tracing::trace!(container = %self.display_name, element = name, "created element");
        Ok(element)
    }

    /// Look up an element by name.
    pub fn get(&self, name: &str) -> Option<ObjectRef> {
        self.elements.read().get(name).cloned()
    }

    /// Snapshot of the current elements, in creation order.
    pub fn elements(&self) -> Vec<ObjectRef> {
        self.elements.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.elements.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.read().is_empty()
    }

    /// Run `action` against every current and future element.
    pub fn configure_each(&self, action: ElementAction) -> Result<()> {
        self.actions.write().push(Arc::clone(&action));
        for element in self.elements() {
            action(&element)?;
        }
        Ok(())
    }
}
