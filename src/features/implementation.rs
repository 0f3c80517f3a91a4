//! Registered features and their model defaults.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;

use crate::features::action::ApplyActionFactory;
use crate::features::declaration::{ProjectFeatureBindingDeclaration, Safety, TargetTypeInformation};
use crate::features::plugins::PluginId;
use crate::model::{ModelType, ObjectRef, PropertyValue};
use crate::util::InternedString;

/// Registration-order identity of a feature within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureId(pub(crate) u32);

/// Marker for a kind of model default.
pub trait ModelDefault: Any + Send + Sync {
    /// The plugin that contributed this default.
    fn contributed_by(&self) -> PluginId;
}

/// A convention for a value property of new definitions.
#[derive(Debug, Clone)]
pub struct PropertyDefault {
    pub contributed_by: PluginId,
    pub property: InternedString,
    pub value: PropertyValue,
}

impl ModelDefault for PropertyDefault {
    fn contributed_by(&self) -> PluginId {
        self.contributed_by
    }
}

/// An action run against new definitions.
#[derive(Clone)]
pub struct ActionDefault {
    pub contributed_by: PluginId,
    pub action: Arc<dyn Fn(&ObjectRef) -> Result<()> + Send + Sync>,
}

impl ActionDefault {
    pub fn new<F>(contributed_by: impl Into<PluginId>, action: F) -> Self
    where
        F: Fn(&ObjectRef) -> Result<()> + Send + Sync + 'static,
    {
        ActionDefault {
            contributed_by: contributed_by.into(),
            action: Arc::new(action),
        }
    }
}

impl ModelDefault for ActionDefault {
    fn contributed_by(&self) -> PluginId {
        self.contributed_by
    }
}

/// Model defaults grouped by kind.
#[derive(Default)]
pub struct ModelDefaults {
    entries: HashMap<TypeId, Vec<Arc<dyn Any + Send + Sync>>>,
}

impl ModelDefaults {
    pub fn add<K: ModelDefault>(&mut self, default: K) {
        self.entries
            .entry(TypeId::of::<K>())
            .or_default()
            .push(Arc::new(default));
    }

    /// All defaults of kind `K`, in the order they were added.
    pub fn with_kind<K: ModelDefault>(&self) -> Vec<Arc<K>> {
        self.entries
            .get(&TypeId::of::<K>())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| Arc::clone(entry).downcast::<K>().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A binding registered by a plugin.
pub struct ProjectFeatureImplementation {
    id: FeatureId,
    declaration: ProjectFeatureBindingDeclaration,
    plugin: PluginId,
    registering_plugin: PluginId,
    registering_plugin_id: Option<String>,
    model_defaults: RwLock<ModelDefaults>,
}

impl ProjectFeatureImplementation {
    pub(crate) fn new(
        id: FeatureId,
        declaration: ProjectFeatureBindingDeclaration,
        plugin: PluginId,
        registering_plugin: PluginId,
        registering_plugin_id: Option<String>,
    ) -> Self {
        ProjectFeatureImplementation {
            id,
            declaration,
            plugin,
            registering_plugin,
            registering_plugin_id,
            model_defaults: RwLock::new(ModelDefaults::default()),
        }
    }

    pub fn id(&self) -> FeatureId {
        self.id
    }

    pub fn feature_name(&self) -> InternedString {
        self.declaration.name()
    }

    pub fn declaration(&self) -> &ProjectFeatureBindingDeclaration {
        &self.declaration
    }

    pub fn definition_public_type(&self) -> &ModelType {
        self.declaration.definition_type()
    }

    pub fn definition_implementation_type(&self) -> &ModelType {
        self.declaration.definition_implementation_type()
    }

    pub fn build_model_type(&self) -> &ModelType {
        self.declaration.build_model_type()
    }

    pub fn build_model_implementation_type(&self) -> &ModelType {
        self.declaration.build_model_implementation_type()
    }

    pub fn target_definition_type(&self) -> &TargetTypeInformation {
        self.declaration.target_definition_type()
    }

    pub fn definition_safety(&self) -> Safety {
        self.declaration.definition_safety()
    }

    pub fn apply_action_safety(&self) -> Safety {
        self.declaration.apply_action_safety()
    }

    pub fn apply_action_factory(&self) -> &ApplyActionFactory {
        self.declaration.apply_action_factory()
    }

    /// The plugin that supplies this feature; applied before the feature is.
    pub fn plugin(&self) -> PluginId {
        self.plugin
    }

    /// The plugin that registered this feature.
    pub fn registering_plugin(&self) -> PluginId {
        self.registering_plugin
    }

    pub fn registering_plugin_id(&self) -> Option<&str> {
        self.registering_plugin_id.as_deref()
    }

    /// Whether this feature is a project type.
    pub fn is_project_type(&self) -> bool {
        matches!(
            self.target_definition_type(),
            TargetTypeInformation::Exact(ty) if ty == ModelType::project()
        )
    }

    pub fn add_model_default<K: ModelDefault>(&self, default: K) {
        tracing::debug!(
            feature = %self.feature_name(),
            plugin = %default.contributed_by(),
            "adding model default"
        );
        self.model_defaults.write().add(default);
    }

    /// Model defaults of kind `K`.
    pub fn model_defaults<K: ModelDefault>(&self) -> Vec<Arc<K>> {
        self.model_defaults.read().with_kind::<K>()
    }
}

impl fmt::Debug for ProjectFeatureImplementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectFeatureImplementation")
            .field("id", &self.id)
            .field("name", &self.feature_name())
            .field("plugin", &self.plugin)
            .field("registering_plugin", &self.registering_plugin)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_defaults_by_kind() {
        let mut defaults = ModelDefaults::default();
        defaults.add(PropertyDefault {
            contributed_by: "settings".into(),
            property: "version".into(),
            value: "1.0".into(),
        });
        defaults.add(ActionDefault::new("settings", |_| Ok(())));
        defaults.add(PropertyDefault {
            contributed_by: "conventions".into(),
            property: "group".into(),
            value: "org.example".into(),
        });

        let properties = defaults.with_kind::<PropertyDefault>();
        assert_eq!(properties.len(), 2);
        assert_eq!(properties[0].property.as_str(), "version");
        assert_eq!(properties[1].contributed_by.as_str(), "conventions");
        assert_eq!(defaults.with_kind::<ActionDefault>().len(), 1);
        assert_eq!(defaults.len(), 3);
    }
}
