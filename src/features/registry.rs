//! The registry of feature implementations.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::features::declaration::ProjectFeatureBindingDeclaration;
use crate::features::implementation::{FeatureId, ProjectFeatureImplementation};
use crate::features::plugins::PluginId;
use crate::model::ModelType;

/// All features registered for a project, in registration order.
#[derive(Debug, Default)]
pub struct ProjectFeatureRegistry {
    features: RwLock<Vec<Arc<ProjectFeatureImplementation>>>,
    next_id: AtomicU32,
}

impl ProjectFeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declaration supplied by `plugin` on behalf of `registering_plugin`.
    pub fn register(
        &self,
        declaration: ProjectFeatureBindingDeclaration,
        plugin: PluginId,
        registering_plugin: PluginId,
        registering_plugin_id: Option<String>,
    ) -> Arc<ProjectFeatureImplementation> {
        let mut features = self.features.write();
        let id = FeatureId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let implementation = Arc::new(ProjectFeatureImplementation::new(
            id,
            declaration,
            plugin,
            registering_plugin,
            registering_plugin_id,
        ));
        tracing::debug!(
            feature = %implementation.feature_name(),
            plugin = %plugin,
            registered_by = %registering_plugin,
            target = %implementation.target_definition_type(),
            "registered feature"
        );
        features.push(Arc::clone(&implementation));
        implementation
    }

    /// Remove the features with the given ids. Ids are never reused.
    pub fn unregister(&self, ids: &[FeatureId]) {
        if ids.is_empty() {
            return;
        }
        self.features
            .write()
            .retain(|feature| !ids.contains(&feature.id()));
        tracing::debug!(count = ids.len(), "unregistered features");
    }

    /// Every registered feature.
    pub fn features(&self) -> Vec<Arc<ProjectFeatureImplementation>> {
        self.features.read().clone()
    }

    /// Features registered under `name`.
    pub fn features_named(&self, name: &str) -> Vec<Arc<ProjectFeatureImplementation>> {
        self.features
            .read()
            .iter()
            .filter(|feature| feature.feature_name().as_str() == name)
            .cloned()
            .collect()
    }

    /// Features named `name` that can be applied to a target of
    /// `target_type` producing a build model of `target_build_model`.
    pub fn features_applicable_to(
        &self,
        name: &str,
        target_type: &ModelType,
        target_build_model: Option<&ModelType>,
    ) -> Vec<Arc<ProjectFeatureImplementation>> {
        self.features
            .read()
            .iter()
            .filter(|feature| feature.feature_name().as_str() == name)
            .filter(|feature| {
                feature
                    .target_definition_type()
                    .accepts(target_type, target_build_model)
            })
            .cloned()
            .collect()
    }

    /// Registered project types.
    pub fn project_types(&self) -> Vec<Arc<ProjectFeatureImplementation>> {
        self.features
            .read()
            .iter()
            .filter(|feature| feature.is_project_type())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.features.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.read().is_empty()
    }
}
