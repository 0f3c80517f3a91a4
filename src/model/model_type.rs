//! Type tokens for the configuration model.
//!
//! A [`ModelType`] stands in for a declared configuration type: it has a name,
//! supertypes, an optional associated build model type (for definitions), and a
//! property layout that the object factory uses when instantiating it.
//!
//! Types are cheap to clone and compare by identity: two tokens are the same
//! type only if they came from the same [`ModelType::builder`] call (or are
//! clones of one another).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

use crate::util::InternedString;

/// Kind of a declared property.
#[derive(Debug, Clone)]
pub enum PropertyKind {
    /// A settable value with an optional convention.
    Value,
    /// A read-only nested object created together with its owner.
    Nested(ModelType),
    /// A named container whose elements all have the given type.
    Container(ModelType),
}

/// A property declared on a [`ModelType`].
#[derive(Debug, Clone)]
pub struct PropertyDecl {
    pub name: InternedString,
    pub kind: PropertyKind,
}

struct TypeInner {
    name: InternedString,
    supertypes: Vec<ModelType>,
    is_abstract: bool,
    build_model: Option<ModelType>,
    properties: Vec<PropertyDecl>,
}

/// An interned configuration type.
#[derive(Clone)]
pub struct ModelType {
    inner: Arc<TypeInner>,
}

static DEFINITION: LazyLock<ModelType> =
    LazyLock::new(|| ModelType::builder("Definition").abstract_type().build());

static BUILD_MODEL: LazyLock<ModelType> =
    LazyLock::new(|| ModelType::builder("BuildModel").abstract_type().build());

static BUILD_MODEL_NONE: LazyLock<ModelType> = LazyLock::new(|| {
    ModelType::builder("BuildModel.None")
        .extends(ModelType::build_model())
        .build()
});

static PROJECT: LazyLock<ModelType> = LazyLock::new(|| ModelType::builder("Project").build());

impl ModelType {
    /// Start declaring a new type.
    pub fn builder(name: impl Into<InternedString>) -> ModelTypeBuilder {
        ModelTypeBuilder {
            name: name.into(),
            supertypes: Vec::new(),
            is_abstract: false,
            build_model: None,
            properties: Vec::new(),
        }
    }

    /// Root of every definition type.
    pub fn definition() -> &'static ModelType {
        &DEFINITION
    }

    /// Root of every build model type.
    pub fn build_model() -> &'static ModelType {
        &BUILD_MODEL
    }

    /// Marker type for features that expose no build model.
    pub fn build_model_none() -> &'static ModelType {
        &BUILD_MODEL_NONE
    }

    /// The project type. Project types bind to exactly this type.
    pub fn project() -> &'static ModelType {
        &PROJECT
    }

    pub fn name(&self) -> InternedString {
        self.inner.name
    }

    pub fn is_abstract(&self) -> bool {
        self.inner.is_abstract
    }

    pub fn supertypes(&self) -> &[ModelType] {
        &self.inner.supertypes
    }

    /// The build model type a definition of this type produces, searching supertypes.
    pub fn build_model_type(&self) -> Option<ModelType> {
        if let Some(model) = &self.inner.build_model {
            return Some(model.clone());
        }
        self.inner
            .supertypes
            .iter()
            .find_map(|supertype| supertype.build_model_type())
    }

    /// Properties declared on this type and its supertypes, supertypes first.
    ///
    /// A property redeclared by a subtype replaces the inherited declaration.
    pub fn properties(&self) -> Vec<PropertyDecl> {
        let mut properties: Vec<PropertyDecl> = Vec::new();
        for supertype in &self.inner.supertypes {
            for decl in supertype.properties() {
                if !properties.iter().any(|p| p.name == decl.name) {
                    properties.push(decl);
                }
            }
        }
        for decl in &self.inner.properties {
            match properties.iter_mut().find(|p| p.name == decl.name) {
                Some(existing) => *existing = decl.clone(),
                None => properties.push(decl.clone()),
            }
        }
        properties
    }

    /// Look up a single property declaration by name.
    pub fn property(&self, name: &str) -> Option<PropertyDecl> {
        self.properties().into_iter().find(|p| p.name.as_str() == name)
    }

    /// Whether a value of type `other` can be used where `self` is expected.
    pub fn is_assignable_from(&self, other: &ModelType) -> bool {
        if self == other {
            return true;
        }
        other
            .inner
            .supertypes
            .iter()
            .any(|supertype| self.is_assignable_from(supertype))
    }

    /// Whether this type is a definition type.
    pub fn is_definition(&self) -> bool {
        ModelType::definition().is_assignable_from(self)
    }

    /// Whether this type is a build model type.
    pub fn is_build_model(&self) -> bool {
        ModelType::build_model().is_assignable_from(self)
    }
}

impl PartialEq for ModelType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ModelType {}

impl Hash for ModelType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.inner), state)
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelType({})", self.inner.name)
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner.name, f)
    }
}

/// Builder for [`ModelType`].
pub struct ModelTypeBuilder {
    name: InternedString,
    supertypes: Vec<ModelType>,
    is_abstract: bool,
    build_model: Option<ModelType>,
    properties: Vec<PropertyDecl>,
}

impl ModelTypeBuilder {
    /// Add a supertype.
    pub fn extends(mut self, supertype: &ModelType) -> Self {
        self.supertypes.push(supertype.clone());
        self
    }

    /// Mark the type as abstract; the object factory refuses to instantiate it.
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Declare a definition type: extends `Definition` and produces `build_model`.
    pub fn definition_of(mut self, build_model: &ModelType) -> Self {
        self.supertypes.push(ModelType::definition().clone());
        self.build_model = Some(build_model.clone());
        self
    }

    /// Declare a value property.
    pub fn value(mut self, name: impl Into<InternedString>) -> Self {
        self.properties.push(PropertyDecl {
            name: name.into(),
            kind: PropertyKind::Value,
        });
        self
    }

    /// Declare a nested object property.
    pub fn nested(mut self, name: impl Into<InternedString>, ty: &ModelType) -> Self {
        self.properties.push(PropertyDecl {
            name: name.into(),
            kind: PropertyKind::Nested(ty.clone()),
        });
        self
    }

    /// Declare a named container property.
    pub fn container(mut self, name: impl Into<InternedString>, element: &ModelType) -> Self {
        self.properties.push(PropertyDecl {
            name: name.into(),
            kind: PropertyKind::Container(element.clone()),
        });
        self
    }

    pub fn build(self) -> ModelType {
        ModelType {
            inner: Arc::new(TypeInner {
                name: self.name,
                supertypes: self.supertypes,
                is_abstract: self.is_abstract,
                build_model: self.build_model,
                properties: self.properties,
            }),
        }
    }
}
