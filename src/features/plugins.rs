//! Plugins and the plugin manager.
//!
//! A plugin can register feature bindings supplied by other plugins (an
//! ecosystem plugin registering the project types of its language plugins).
//! The supplying plugin itself is only applied once one of its features is
//! used.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;

use crate::features::builder::{ProjectFeatureBindingBuilder, ProjectTypeBindingBuilder};
use crate::features::errors::FeatureError;
use crate::features::implementation::{FeatureId, ModelDefault};
use crate::features::registry::ProjectFeatureRegistry;
use crate::util::InternedString;

/// Identifies a plugin.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PluginId(InternedString);

impl PluginId {
    pub fn new(id: impl AsRef<str>) -> Self {
        PluginId(InternedString::new(id))
    }

    pub fn as_str(&self) -> &'static str {
        self.0.as_str()
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PluginId({})", self.as_str())
    }
}

impl From<&str> for PluginId {
    fn from(id: &str) -> Self {
        PluginId::new(id)
    }
}

impl From<String> for PluginId {
    fn from(id: String) -> Self {
        PluginId::new(id)
    }
}

/// A unit of build logic.
pub trait Plugin: Send + Sync {
    fn id(&self) -> PluginId;

    /// Id shown to users, if different from [`Plugin::id`].
    fn display_id(&self) -> Option<String> {
        None
    }

    /// Plugins whose bindings are registered when this plugin is applied.
    fn registers(&self) -> Vec<PluginId> {
        Vec::new()
    }

    /// Declare the project types this plugin supplies.
    fn bind_project_types(&self, _builder: &mut ProjectTypeBindingBuilder) {}

    /// Declare the project features this plugin supplies.
    fn bind_project_features(&self, _builder: &mut ProjectFeatureBindingBuilder) {}

    /// Run the plugin.
    fn apply(&self, _context: &PluginContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Applies plugins, each at most once.
pub struct PluginManager {
    registry: Arc<ProjectFeatureRegistry>,
    known: RwLock<IndexMap<PluginId, Arc<dyn Plugin>>>,
    applied: RwLock<IndexSet<PluginId>>,
}

impl PluginManager {
    pub fn new(registry: Arc<ProjectFeatureRegistry>) -> Self {
        PluginManager {
            registry,
            known: RwLock::new(IndexMap::new()),
            applied: RwLock::new(IndexSet::new()),
        }
    }

    pub fn registry(&self) -> &Arc<ProjectFeatureRegistry> {
        &self.registry
    }

    /// Make a plugin available without applying it.
    pub fn add_plugin(&self, plugin: Arc<dyn Plugin>) {
        self.known.write().insert(plugin.id(), plugin);
    }

    pub fn is_known(&self, id: PluginId) -> bool {
        self.known.read().contains_key(&id)
    }

    /// Whether `id` has been applied.
    pub fn has_plugin(&self, id: PluginId) -> bool {
        self.applied.read().contains(&id)
    }

    /// Applied plugins, in application order.
    pub fn applied_plugins(&self) -> Vec<PluginId> {
        self.applied.read().iter().copied().collect()
    }

    /// Apply the plugin `id` unless it has been applied already.
    pub fn apply(&self, id: PluginId) -> Result<(), FeatureError> {
        let plugin = self.find(id)?;
        // Marked before running, so a plugin applying itself indirectly is a no-op.
        if !self.applied.write().insert(id) {
            return Ok(());
        }
        tracing::debug!(plugin = %id, "applying plugin");

        let result = self.run(&plugin);
        if result.is_err() {
            self.applied.write().shift_remove(&id);
        }
        result
    }

    /// Register the bindings `plugin` supplies for others, then run it. On
    /// failure the bindings registered here are removed again, so a retry
    /// starts from a clean registry.
    fn run(&self, plugin: &Arc<dyn Plugin>) -> Result<(), FeatureError> {
        let mut registered = Vec::new();
        let result = self.register_and_apply(plugin, &mut registered);
        if result.is_err() {
            self.registry.unregister(&registered);
        }
        result
    }

    fn register_and_apply(
        &self,
        plugin: &Arc<dyn Plugin>,
        registered: &mut Vec<FeatureId>,
    ) -> Result<(), FeatureError> {
        for owner in plugin.registers() {
            let owner = self.find(owner)?;
            self.register_bindings(&owner, plugin, registered)?;
        }

        let context = PluginContext {
            manager: self,
            plugin: plugin.id(),
        };
        plugin
            .apply(&context)
            .map_err(|source| FeatureError::PluginFailed {
                plugin: plugin.id().to_string(),
                source,
            })
    }

    fn register_bindings(
        &self,
        owner: &Arc<dyn Plugin>,
        registering: &Arc<dyn Plugin>,
        registered: &mut Vec<FeatureId>,
    ) -> Result<(), FeatureError> {
        let mut project_types = ProjectTypeBindingBuilder::new();
        owner.bind_project_types(&mut project_types);
        let mut project_features = ProjectFeatureBindingBuilder::new();
        owner.bind_project_features(&mut project_features);

        let declarations = project_types
            .build()?
            .into_iter()
            .chain(project_features.build()?);
        for declaration in declarations {
            let implementation = self.registry.register(
                declaration,
                owner.id(),
                registering.id(),
                registering.display_id(),
            );
            registered.push(implementation.id());
        }
        Ok(())
    }

    fn find(&self, id: PluginId) -> Result<Arc<dyn Plugin>, FeatureError> {
        self.known
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| FeatureError::UnknownPlugin {
                plugin: id.to_string(),
            })
    }
}

/// What a running plugin can reach.
pub struct PluginContext<'a> {
    manager: &'a PluginManager,
    plugin: PluginId,
}

impl PluginContext<'_> {
    /// The plugin being applied.
    pub fn plugin(&self) -> PluginId {
        self.plugin
    }

    pub fn registry(&self) -> &ProjectFeatureRegistry {
        &self.manager.registry
    }

    pub fn apply_plugin(&self, id: impl Into<PluginId>) -> Result<(), FeatureError> {
        self.manager.apply(id.into())
    }

    /// Add `default` to every feature named `feature`. Returns how many
    /// features received it.
    pub fn add_model_default<K: ModelDefault + Clone>(
        &self,
        feature: &str,
        default: K,
    ) -> usize {
        let features = self.manager.registry.features_named(feature);
        if features.is_empty() {
            tracing::warn!(
                plugin = %self.plugin,
                feature,
                "model default for a feature that is not registered"
            );
        }
        for implementation in &features {
            implementation.add_model_default(default.clone());
        }
        features.len()
    }
}
