//! Per-definition feature state.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::features::action::{ProjectFeatureApplicationContext, ProjectFeatureApplyAction};
use crate::features::errors::FeatureError;
use crate::features::implementation::{FeatureId, ProjectFeatureImplementation};
use crate::model::{ModelObject, ObjectFactory, ObjectRef};

const NOT_APPLIED: u8 = 0;
const APPLYING: u8 = 1;
const APPLIED: u8 = 2;

/// One feature instantiated against one target.
///
/// The definition and build model exist as soon as the application does;
/// [`FeatureApplication::apply`] runs the apply action at most once.
pub struct FeatureApplication {
    feature: Arc<ProjectFeatureImplementation>,
    definition: ObjectRef,
    build_model: ObjectRef,
    parent: Weak<ModelObject>,
    context: ProjectFeatureApplicationContext,
    action: Arc<dyn ProjectFeatureApplyAction>,
    state: AtomicU8,
}

impl FeatureApplication {
    pub(crate) fn new(
        feature: Arc<ProjectFeatureImplementation>,
        definition: ObjectRef,
        build_model: ObjectRef,
        parent: Weak<ModelObject>,
        context: ProjectFeatureApplicationContext,
        action: Arc<dyn ProjectFeatureApplyAction>,
    ) -> Self {
        FeatureApplication {
            feature,
            definition,
            build_model,
            parent,
            context,
            action,
            state: AtomicU8::new(NOT_APPLIED),
        }
    }

    pub fn feature(&self) -> &Arc<ProjectFeatureImplementation> {
        &self.feature
    }

    pub fn definition(&self) -> &ObjectRef {
        &self.definition
    }

    pub fn build_model(&self) -> &ObjectRef {
        &self.build_model
    }

    /// The object the feature was applied to, if it is still alive.
    pub fn parent(&self) -> Option<ObjectRef> {
        self.parent.upgrade()
    }

    pub fn is_project_type(&self) -> bool {
        self.feature.is_project_type()
    }

    pub fn is_applied(&self) -> bool {
        self.state.load(Ordering::Acquire) == APPLIED
    }

    /// Finalize the definition and run the apply action.
    ///
    /// Does nothing once the action has succeeded. A failed action leaves the
    /// application unapplied, so it can be retried.
    ///
    /// A call made while the action is still running (from inside the action,
    /// or from another thread) returns `Ok(())` at once without waiting for
    /// the action to finish; [`is_applied`](Self::is_applied) stays `false`
    /// until it has succeeded.
    pub fn apply(&self) -> Result<(), FeatureError> {
        if self
            .state
            .compare_exchange(NOT_APPLIED, APPLYING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        match self.run_apply_action() {
            Ok(()) => {
                self.state.store(APPLIED, Ordering::Release);
                Ok(())
            }
            Err(err) => {
                self.state.store(NOT_APPLIED, Ordering::Release);
                Err(err)
            }
        }
    }

    fn run_apply_action(&self) -> Result<(), FeatureError> {
        let feature = self.feature.feature_name();
        let parent = self.parent().ok_or_else(|| FeatureError::ParentDropped {
            feature: feature.to_string(),
        })?;

        self.definition.finalize_values();

        tracing::debug!(
            feature = %feature,
            definition = ?self.definition,
            parent = ?parent,
            "applying feature"
        );
        self.action
            .apply(&self.context, &self.definition, &self.build_model, &parent)
            .map_err(|source| FeatureError::ApplyActionFailed {
                feature: feature.to_string(),
                source,
            })
    }
}

impl fmt::Debug for FeatureApplication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureApplication")
            .field("feature", &self.feature.feature_name())
            .field("definition", &self.definition)
            .field("build_model", &self.build_model)
            .field("applied", &self.is_applied())
            .finish()
    }
}

/// Outcome of [`ProjectFeatureDefinitionContext::get_or_add_child_definition`].
pub struct ChildDefinitionAdditionResult {
    pub application: Arc<FeatureApplication>,
    /// Whether the application was created by this call.
    pub is_new: bool,
}

/// Feature state attached to one definition.
///
/// Records the build model the definition produces, the features applied to
/// it (at most one application per feature) and the nested definitions it
/// owns. Children and nested definitions are only ever appended, so an index
/// into either list stays valid while more are added.
pub struct ProjectFeatureDefinitionContext {
    build_model: ObjectRef,
    object_factory: Arc<dyn ObjectFactory>,
    children: RwLock<IndexMap<FeatureId, Arc<FeatureApplication>>>,
    nested: RwLock<Vec<ObjectRef>>,
}

impl ProjectFeatureDefinitionContext {
    pub(crate) fn new(build_model: ObjectRef, object_factory: Arc<dyn ObjectFactory>) -> Self {
        ProjectFeatureDefinitionContext {
            build_model,
            object_factory,
            children: RwLock::new(IndexMap::new()),
            nested: RwLock::new(Vec::new()),
        }
    }

    pub fn build_model(&self) -> &ObjectRef {
        &self.build_model
    }

    pub fn object_factory(&self) -> &Arc<dyn ObjectFactory> {
        &self.object_factory
    }

    /// The application of `feature` to this definition, creating it with
    /// `create` if there is none yet.
    ///
    /// `create` runs without any lock held and may itself add children. If an
    /// application for `feature` appears while `create` runs, that one wins
    /// and the freshly created one is discarded.
    pub fn get_or_add_child_definition<F>(
        &self,
        feature: &ProjectFeatureImplementation,
        create: F,
    ) -> Result<ChildDefinitionAdditionResult, FeatureError>
    where
        F: FnOnce() -> Result<FeatureApplication, FeatureError>,
    {
        if let Some(existing) = self.children.read().get(&feature.id()) {
            return Ok(ChildDefinitionAdditionResult {
                application: Arc::clone(existing),
                is_new: false,
            });
        }

        let created = Arc::new(create()?);
        let mut children = self.children.write();
        let application = Arc::clone(
            children
                .entry(feature.id())
                .or_insert_with(|| Arc::clone(&created)),
        );
        let is_new = Arc::ptr_eq(&application, &created);
        Ok(ChildDefinitionAdditionResult {
            application,
            is_new,
        })
    }

    /// The application of `feature`, if one exists.
    pub fn child(&self, feature: FeatureId) -> Option<Arc<FeatureApplication>> {
        self.children.read().get(&feature).cloned()
    }

    /// The features applied to this definition, in application order.
    pub fn child_features(&self) -> Vec<Arc<ProjectFeatureImplementation>> {
        self.children
            .read()
            .values()
            .map(|application| Arc::clone(application.feature()))
            .collect()
    }

    /// The `index`th child application, if there are that many.
    pub fn child_at(&self, index: usize) -> Option<Arc<FeatureApplication>> {
        self.children
            .read()
            .get_index(index)
            .map(|(_, application)| Arc::clone(application))
    }

    pub fn child_count(&self) -> usize {
        self.children.read().len()
    }

    pub fn add_nested_definition(&self, definition: ObjectRef) {
        self.nested.write().push(definition);
    }

    /// The `index`th nested definition, if there are that many.
    pub fn nested_at(&self, index: usize) -> Option<ObjectRef> {
        self.nested.read().get(index).cloned()
    }

    pub fn nested_definitions(&self) -> Vec<ObjectRef> {
        self.nested.read().clone()
    }
}

impl fmt::Debug for ProjectFeatureDefinitionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectFeatureDefinitionContext")
            .field("build_model", &self.build_model)
            .field("children", &self.child_count())
            .field("nested", &self.nested.read().len())
            .finish()
    }
}
