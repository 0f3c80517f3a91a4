//! Attaching feature contexts to definitions and walking the feature graph.
//!
//! Contexts live in a side table keyed by object identity. The table holds
//! only weak references to the definitions, so a context never keeps its
//! definition alive; entries for dropped definitions are pruned whenever a
//! new context is attached.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::features::context::ProjectFeatureDefinitionContext;
use crate::features::errors::FeatureError;
use crate::features::implementation::ProjectFeatureImplementation;
use crate::model::{ModelObject, ModelType, ObjectFactory, ObjectId, ObjectRef};

static BUILD_MODEL_NONE: Lazy<ObjectRef> =
    Lazy::new(|| ModelObject::marker(ModelType::build_model_none()));

struct ContextEntry {
    definition: Weak<ModelObject>,
    context: Arc<ProjectFeatureDefinitionContext>,
}

/// The side table of definition contexts.
#[derive(Default)]
pub struct ProjectFeatureSupport {
    contexts: RwLock<HashMap<ObjectId, ContextEntry>>,
}

impl ProjectFeatureSupport {
    pub fn new() -> Arc<Self> {
        Arc::new(ProjectFeatureSupport::default())
    }

    /// The build model shared by every feature that declares none.
    pub fn build_model_none() -> ObjectRef {
        Arc::clone(&BUILD_MODEL_NONE)
    }

    /// Create the build model for a new application of `feature`.
    pub fn create_build_model_instance(
        object_factory: &Arc<dyn ObjectFactory>,
        feature: &ProjectFeatureImplementation,
    ) -> Result<ObjectRef, FeatureError> {
        if feature.declaration().has_no_build_model() {
            return Ok(Self::build_model_none());
        }
        Ok(object_factory.new_instance(feature.build_model_implementation_type())?)
    }

    /// Attach a fresh context to `definition`, replacing any existing one.
    pub fn attach_definition_context(
        &self,
        definition: &ObjectRef,
        build_model: ObjectRef,
        object_factory: Arc<dyn ObjectFactory>,
    ) -> Arc<ProjectFeatureDefinitionContext> {
        let context = Arc::new(ProjectFeatureDefinitionContext::new(build_model, object_factory));
        let mut contexts = self.contexts.write();
        contexts.retain(|_, entry| entry.definition.strong_count() > 0);
        contexts.insert(
            definition.id(),
            ContextEntry {
                definition: Arc::downgrade(definition),
                context: Arc::clone(&context),
            },
        );
        tracing::trace!(definition = ?definition, "attached definition context");
        context
    }

    /// The context attached to `definition`, if any.
    pub fn try_get_context(
        &self,
        definition: &ObjectRef,
    ) -> Option<Arc<ProjectFeatureDefinitionContext>> {
        self.contexts
            .read()
            .get(&definition.id())
            .filter(|entry| entry.definition.strong_count() > 0)
            .map(|entry| Arc::clone(&entry.context))
    }

    /// The context attached to `definition`; its absence is a lifecycle error.
    pub fn get_context(
        &self,
        definition: &ObjectRef,
    ) -> Result<Arc<ProjectFeatureDefinitionContext>, FeatureError> {
        self.try_get_context(definition)
            .ok_or_else(|| FeatureError::MissingDefinitionContext {
                definition: format!("{:?}", definition),
            })
    }

    /// Number of live contexts.
    pub fn len(&self) -> usize {
        self.contexts
            .read()
            .values()
            .filter(|entry| entry.definition.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply every feature reachable from `root`, each exactly once.
    ///
    /// Applying a feature may add children or nested definitions anywhere in
    /// the graph, including on definitions the walk has already passed. Each
    /// visited context keeps a cursor into its children and nested
    /// definitions, and the walk repeats until no cursor can advance.
    pub fn walk_and_apply_features(&self, root: &ObjectRef) -> Result<(), FeatureError> {
        let mut walk = FeatureWalk::default();
        walk.visit(self, root)?;
        loop {
            let mut progressed = false;
            let mut index = 0;
            while index < walk.cursors.len() {
                progressed |= walk.drain(self, index)?;
                index += 1;
            }
            if !progressed {
                break;
            }
        }
        tracing::debug!(root = ?root, visited = walk.visited.len(), "applied features");
        Ok(())
    }
}

struct Cursor {
    context: Arc<ProjectFeatureDefinitionContext>,
    children: usize,
    nested: usize,
}

#[derive(Default)]
struct FeatureWalk {
    visited: HashSet<ObjectId>,
    cursors: Vec<Cursor>,
}

impl FeatureWalk {
    fn visit(
        &mut self,
        support: &ProjectFeatureSupport,
        definition: &ObjectRef,
    ) -> Result<(), FeatureError> {
        if !self.visited.insert(definition.id()) {
            return Ok(());
        }
        // Plain data objects have no context and are not expanded.
        let Some(context) = support.try_get_context(definition) else {
            return Ok(());
        };
        self.cursors.push(Cursor {
            context,
            children: 0,
            nested: 0,
        });
        self.drain(support, self.cursors.len() - 1)?;
        Ok(())
    }

    /// Advance the cursor at `index` as far as it goes. Returns whether it moved.
    fn drain(
        &mut self,
        support: &ProjectFeatureSupport,
        index: usize,
    ) -> Result<bool, FeatureError> {
        let mut progressed = false;
        loop {
            let cursor = &mut self.cursors[index];
            if let Some(application) = cursor.context.child_at(cursor.children) {
                cursor.children += 1;
                progressed = true;
                application.apply()?;
                self.visit(support, application.definition())?;
                continue;
            }
            if let Some(nested) = cursor.context.nested_at(cursor.nested) {
                cursor.nested += 1;
                progressed = true;
                self.visit(support, &nested)?;
                continue;
            }
            return Ok(progressed);
        }
    }
}
