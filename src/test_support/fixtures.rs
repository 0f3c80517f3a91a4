//! Test fixtures for common test scenarios.
//!
//! Model types, plugins and attribute schemas shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;

use crate::attributes::{
    Attribute, AttributeValue, AttributesFactory, DefaultAttributeSelectionSchema, Variant,
};
use crate::features::{
    ApplyActionFactory, BindingTypeInformation, Plugin, PluginContext, PluginId, PluginManager,
    Project, ProjectFeatureApplicationContext, ProjectFeatureBindingBuilder,
    ProjectFeatureBindingDeclaration, ProjectTypeApplyAction, ProjectTypeBindingBuilder,
    PropertyDefault, TargetTypeInformation,
};
use crate::model::{ModelType, ObjectRef, ServiceRegistry};

pub const ECOSYSTEM: &str = "ecosystem";
pub const TYPES_PLUGIN: &str = "project-types";
pub const NATIVE_PLUGIN: &str = "native";
pub const JVM_PLUGIN: &str = "jvm";

/// A small type hierarchy: two project types (`Library`, `Executable`) and
/// two features (`Native` for libraries, `Jvm` for executables).
#[derive(Clone)]
pub struct ModelTypes {
    pub library: ModelType,
    pub executable: ModelType,
    pub native: ModelType,
    pub native_impl: ModelType,
    pub native_model: ModelType,
    pub native_model_impl: ModelType,
    pub jvm: ModelType,
    pub jvm_model: ModelType,
    pub toolchain: ModelType,
    pub toolchain_model: ModelType,
    pub target: ModelType,
}

impl ModelTypes {
    pub fn new() -> Self {
        let definition = ModelType::definition();
        let build_model = ModelType::build_model();

        let native_model = ModelType::builder("NativeModel")
            .extends(build_model)
            .value("linker")
            .build();
        let native_model_impl = ModelType::builder("DefaultNativeModel")
            .extends(&native_model)
            .build();
        let toolchain_model = ModelType::builder("ToolchainModel")
            .extends(build_model)
            .value("path")
            .build();
        let toolchain = ModelType::builder("Toolchain")
            .extends(definition)
            .definition_of(&toolchain_model)
            .value("vendor")
            .build();
        let target = ModelType::builder("Target")
            .extends(definition)
            .value("arch")
            .build();
        let native = ModelType::builder("Native")
            .extends(definition)
            .definition_of(&native_model)
            .value("compiler")
            .nested("toolchain", &toolchain)
            .container("targets", &target)
            .build();
        let native_impl = ModelType::builder("DefaultNative").extends(&native).build();
        let jvm_model = ModelType::builder("JvmModel")
            .extends(build_model)
            .value("release")
            .build();
        let jvm = ModelType::builder("Jvm")
            .extends(definition)
            .definition_of(&jvm_model)
            .value("version")
            .build();
        let library = ModelType::builder("Library")
            .extends(definition)
            .value("version")
            .build();
        let executable = ModelType::builder("Executable")
            .extends(definition)
            .value("mainClass")
            .build();

        ModelTypes {
            library,
            executable,
            native,
            native_impl,
            native_model,
            native_model_impl,
            jvm,
            jvm_model,
            toolchain,
            toolchain_model,
            target,
        }
    }
}

pub fn noop_action() -> ApplyActionFactory {
    ApplyActionFactory::of(Arc::new(
        |_: &ProjectFeatureApplicationContext,
         _: &ObjectRef,
         _: &ObjectRef,
         _: &ObjectRef|
         -> Result<()> { Ok(()) },
    ))
}

pub fn noop_project_type_action() -> Arc<dyn ProjectTypeApplyAction> {
    Arc::new(
        |_: &ProjectFeatureApplicationContext, _: &ObjectRef, _: &ObjectRef| -> Result<()> {
            Ok(())
        },
    )
}

fn counting_project_type_action(
    counter: Option<Arc<AtomicUsize>>,
) -> Arc<dyn ProjectTypeApplyAction> {
    Arc::new(
        move |_: &ProjectFeatureApplicationContext, _: &ObjectRef, _: &ObjectRef| -> Result<()> {
            if let Some(counter) = &counter {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        },
    )
}

/// Derives the linker from the configured compiler.
pub fn native_action() -> ApplyActionFactory {
    ApplyActionFactory::of(Arc::new(
        |_: &ProjectFeatureApplicationContext,
         definition: &ObjectRef,
         build_model: &ObjectRef,
         _: &ObjectRef|
         -> Result<()> {
            let compiler = definition
                .get("compiler")?
                .and_then(|value| value.as_str().map(str::to_string))
                .unwrap_or_else(|| "cc".to_string());
            build_model.set("linker", format!("{}-ld", compiler))?;
            Ok(())
        },
    ))
}

/// `native` bound to libraries and `jvm` bound to executables.
pub fn native_and_jvm_declarations(types: &ModelTypes) -> Vec<ProjectFeatureBindingDeclaration> {
    let mut builder = ProjectFeatureBindingBuilder::new();
    builder.bind_project_feature(
        "native",
        BindingTypeInformation::new(
            &types.native,
            TargetTypeInformation::Definition(types.library.clone()),
        ),
        native_action(),
    );
    builder.bind_project_feature(
        "jvm",
        BindingTypeInformation::new(
            &types.jvm,
            TargetTypeInformation::Definition(types.executable.clone()),
        ),
        noop_action(),
    );
    builder.build().unwrap()
}

/// Registers the bindings of the other fixture plugins.
pub struct EcosystemPlugin;

impl Plugin for EcosystemPlugin {
    fn id(&self) -> PluginId {
        ECOSYSTEM.into()
    }

    fn display_id(&self) -> Option<String> {
        Some("org.example.ecosystem".to_string())
    }

    fn registers(&self) -> Vec<PluginId> {
        vec![TYPES_PLUGIN.into(), NATIVE_PLUGIN.into(), JVM_PLUGIN.into()]
    }
}

/// Supplies the `library` and `executable` project types.
pub struct ProjectTypesPlugin {
    types: ModelTypes,
    applied: Option<Arc<AtomicUsize>>,
}

impl Plugin for ProjectTypesPlugin {
    fn id(&self) -> PluginId {
        TYPES_PLUGIN.into()
    }

    fn bind_project_types(&self, builder: &mut ProjectTypeBindingBuilder) {
        builder.bind_project_type(
            "library",
            &self.types.library,
            counting_project_type_action(self.applied.clone()),
        );
        builder.bind_project_type(
            "executable",
            &self.types.executable,
            counting_project_type_action(self.applied.clone()),
        );
    }
}

/// Supplies the `native` feature and a default compiler for it.
pub struct NativePlugin {
    types: ModelTypes,
}

impl Plugin for NativePlugin {
    fn id(&self) -> PluginId {
        NATIVE_PLUGIN.into()
    }

    fn bind_project_features(&self, builder: &mut ProjectFeatureBindingBuilder) {
        builder.bind_project_feature(
            "native",
            BindingTypeInformation::new(
                &self.types.native,
                TargetTypeInformation::Definition(self.types.library.clone()),
            ),
            native_action(),
        );
    }

    fn apply(&self, context: &PluginContext<'_>) -> Result<()> {
        context.add_model_default(
            "native",
            PropertyDefault {
                contributed_by: context.plugin(),
                property: "compiler".into(),
                value: "gcc".into(),
            },
        );
        Ok(())
    }
}

/// Supplies the `jvm` feature.
pub struct JvmPlugin {
    types: ModelTypes,
}

impl Plugin for JvmPlugin {
    fn id(&self) -> PluginId {
        JVM_PLUGIN.into()
    }

    fn bind_project_features(&self, builder: &mut ProjectFeatureBindingBuilder) {
        builder.bind_project_feature(
            "jvm",
            BindingTypeInformation::new(
                &self.types.jvm,
                TargetTypeInformation::Definition(self.types.executable.clone()),
            ),
            noop_action(),
        );
    }
}

fn add_plugins(manager: &PluginManager, types: &ModelTypes, applied: Option<Arc<AtomicUsize>>) {
    manager.add_plugin(Arc::new(EcosystemPlugin));
    manager.add_plugin(Arc::new(ProjectTypesPlugin {
        types: types.clone(),
        applied,
    }));
    manager.add_plugin(Arc::new(NativePlugin {
        types: types.clone(),
    }));
    manager.add_plugin(Arc::new(JvmPlugin {
        types: types.clone(),
    }));
}

/// Make the fixture plugins known to `manager` without applying them.
pub fn add_language_plugins(manager: &PluginManager, types: &ModelTypes) {
    add_plugins(manager, types, None);
}

/// A project with the ecosystem plugin applied.
pub fn project(types: &ModelTypes) -> Project {
    let project = Project::new("demo", ServiceRegistry::new()).unwrap();
    add_language_plugins(project.plugins(), types);
    project.apply_plugin(ECOSYSTEM).unwrap();
    project
}

/// Like [`project`], counting project type applications in `applied`.
pub fn project_with_counter(types: &ModelTypes, applied: Arc<AtomicUsize>) -> Project {
    let project = Project::new("demo", ServiceRegistry::new()).unwrap();
    add_plugins(project.plugins(), types, Some(applied));
    project.apply_plugin(ECOSYSTEM).unwrap();
    project
}

pub fn usage() -> Attribute {
    Attribute::string("usage")
}

pub fn jvm_version() -> Attribute {
    Attribute::int("jvm.version")
}

/// `usage` (api requests accept runtime candidates, api preferred) and an
/// ordered `jvm.version`, with `usage` taking precedence.
pub fn jvm_schema() -> DefaultAttributeSelectionSchema {
    let mut schema = DefaultAttributeSelectionSchema::new();
    schema
        .attribute_strategy(usage())
        .unwrap()
        .compatible([("java-api".into(), "java-runtime".into())])
        .prefer(vec!["java-api".into()]);
    schema
        .attribute_strategy(jvm_version())
        .unwrap()
        .ordered(vec![
            AttributeValue::Int(8),
            AttributeValue::Int(11),
            AttributeValue::Int(17),
        ]);
    schema.set_precedence(["usage", "jvm.version"]).unwrap();
    schema
}

/// Api and runtime variants for Java 11 and 17, values desugared.
pub fn jvm_variants(factory: &AttributesFactory) -> Vec<Variant> {
    let variant = |name: &str, usage: &str, version: &str| {
        Variant::new(
            name,
            factory.of([
                (Attribute::string("usage"), usage),
                (Attribute::string("jvm.version"), version),
            ]),
        )
    };
    vec![
        variant("apiElements11", "java-api", "11"),
        variant("runtimeElements11", "java-runtime", "11"),
        variant("apiElements17", "java-api", "17"),
        variant("runtimeElements17", "java-runtime", "17"),
    ]
}

/// The matching-file form of [`jvm_schema`] and [`jvm_variants`].
pub const JVM_MATCHING_FILE: &str = r#"
precedence = ["usage", "jvm.version"]

[[attributes]]
name = "usage"
type = "string"
compatible = [["java-api", "java-runtime"]]
prefer = ["java-api"]

[[attributes]]
name = "jvm.version"
type = "int"
ordered = ["8", "11", "17"]

[[candidates]]
name = "apiElements11"
attributes = { usage = "java-api", "jvm.version" = "11" }

[[candidates]]
name = "runtimeElements11"
attributes = { usage = "java-runtime", "jvm.version" = "11" }

[[candidates]]
name = "apiElements17"
attributes = { usage = "java-api", "jvm.version" = "17" }

[[candidates]]
name = "runtimeElements17"
attributes = { usage = "java-runtime", "jvm.version" = "17" }

[requests]
compile = { usage = "java-api", "jvm.version" = "17" }
runtime = { usage = "java-runtime", "jvm.version" = "11" }
"#;
