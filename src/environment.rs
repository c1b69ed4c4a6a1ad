//! The modular environment: factory registry, object staging, and setup.
//!
//! Parsed definitions are staged per module name, then factories run in a
//! fixed dependency order (settings, source, materials, geometry) so each
//! factory can look up the modules it depends on through the environment it
//! is handed as setup context. Modules with no staged objects are skipped.

use crate::definitions::{
    ObjectDefinition, GEOMETRY_MODULE, MATERIALS_MODULE, SETTINGS_MODULE, SOURCE_MODULE,
};
use crate::error::{HeliosError, Result};
use crate::geometry::Geometry;
use crate::material::MaterialsModule;
use crate::settings::Settings;
use crate::source::SourceModule;
use indexmap::IndexMap;

/// A constructed module, tagged by kind.
#[derive(Debug, Clone)]
pub enum Module {
    /// The settings module.
    Settings(Settings),
    /// The source module.
    Source(SourceModule),
    /// The materials module.
    Materials(MaterialsModule),
    /// The geometry module.
    Geometry(Geometry),
}

/// Implemented by every concrete module type; gives it a registry name and a
/// downcast out of the [`Module`] variant.
pub trait ModuleKind: Sized {
    /// The module's registry name.
    const NAME: &'static str;

    /// Downcast a module variant to this concrete type.
    fn from_module(module: &Module) -> Option<&Self>;
}

impl ModuleKind for Settings {
    const NAME: &'static str = SETTINGS_MODULE;

    fn from_module(module: &Module) -> Option<&Self> {
        match module {
            Module::Settings(settings) => Some(settings),
            _ => None,
        }
    }
}

impl ModuleKind for SourceModule {
    const NAME: &'static str = SOURCE_MODULE;

    fn from_module(module: &Module) -> Option<&Self> {
        match module {
            Module::Source(source) => Some(source),
            _ => None,
        }
    }
}

impl ModuleKind for MaterialsModule {
    const NAME: &'static str = MATERIALS_MODULE;

    fn from_module(module: &Module) -> Option<&Self> {
        match module {
            Module::Materials(materials) => Some(materials),
            _ => None,
        }
    }
}

impl ModuleKind for Geometry {
    const NAME: &'static str = GEOMETRY_MODULE;

    fn from_module(module: &Module) -> Option<&Self> {
        match module {
            Module::Geometry(geometry) => Some(geometry),
            _ => None,
        }
    }
}

/// A module factory: staged definitions plus the environment as setup
/// context (already-built modules are reachable through it).
pub type Factory = fn(&[ObjectDefinition], &Environment) -> Result<Module>;

/// The fixed setup order. Materials precede geometry because cells resolve
/// material references at construction.
const SETUP_ORDER: [&str; 4] = [
    SETTINGS_MODULE,
    SOURCE_MODULE,
    MATERIALS_MODULE,
    GEOMETRY_MODULE,
];

/// Mapping from module name to factory.
///
/// Registration is an explicit construction step, not static initialization.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    factories: IndexMap<&'static str, Factory>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in module factory registered.
    pub fn with_builtin_modules() -> Self {
        let mut registry = Self::new();
        registry.register(SETTINGS_MODULE, |definitions, _| {
            Ok(Module::Settings(Settings::from_definitions(definitions)?))
        });
        registry.register(SOURCE_MODULE, |definitions, _| {
            Ok(Module::Source(SourceModule::from_definitions(definitions)?))
        });
        registry.register(MATERIALS_MODULE, |definitions, _| {
            Ok(Module::Materials(MaterialsModule::from_definitions(
                definitions,
            )?))
        });
        registry.register(GEOMETRY_MODULE, |definitions, environment| {
            let materials = environment.get::<MaterialsModule>().ok();
            Ok(Module::Geometry(Geometry::from_definitions(
                definitions,
                materials,
            )?))
        });
        registry
    }

    /// Register (or replace) the factory for a module name.
    pub fn register(&mut self, name: &'static str, factory: Factory) {
        self.factories.insert(name, factory);
    }

    /// The factory for a module name, if registered.
    pub fn factory(&self, name: &str) -> Option<Factory> {
        self.factories.get(name).copied()
    }
}

/// The environment: staged definitions and constructed modules.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    registry: Registry,
    staged: IndexMap<String, Vec<ObjectDefinition>>,
    modules: IndexMap<String, Module>,
}

impl Environment {
    /// An environment with the built-in module factories.
    pub fn new() -> Self {
        Self::with_registry(Registry::with_builtin_modules())
    }

    /// An environment with a caller-supplied registry.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            staged: IndexMap::new(),
            modules: IndexMap::new(),
        }
    }

    /// Stage one parsed definition under its module name.
    pub fn push_object(&mut self, definition: ObjectDefinition) {
        self.staged
            .entry(definition.module_name().to_string())
            .or_default()
            .push(definition);
    }

    /// Stage a whole definition stream in order.
    pub fn push_objects(&mut self, definitions: impl IntoIterator<Item = ObjectDefinition>) {
        for definition in definitions {
            self.push_object(definition);
        }
    }

    /// Definitions staged for a module.
    pub fn staged_objects(&self, module: &str) -> &[ObjectDefinition] {
        self.staged.get(module).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Staged definitions of a module with a given user id.
    ///
    /// Returns every match: user ids are not unique in every module
    /// (materials legitimately share them).
    pub fn staged_objects_with_id(&self, module: &str, user_id: &str) -> Vec<&ObjectDefinition> {
        self.staged_objects(module)
            .iter()
            .filter(|definition| definition.user_id() == user_id)
            .collect()
    }

    /// Construct every staged module in dependency order.
    ///
    /// Setting up a module looks up its factory first (failing with
    /// `MissingFactory`), then its staged objects; with none staged the
    /// module is skipped silently as unused.
    pub fn setup(&mut self) -> Result<()> {
        for name in SETUP_ORDER {
            self.setup_module(name)?;
        }
        // Anything staged outside the fixed order still needs a factory;
        // run those in staging order for custom registries.
        let extra: Vec<String> = self
            .staged
            .keys()
            .filter(|name| !SETUP_ORDER.contains(&name.as_str()))
            .cloned()
            .collect();
        for name in extra {
            self.setup_module(&name)?;
        }
        Ok(())
    }

    fn setup_module(&mut self, name: &str) -> Result<()> {
        let factory = self
            .registry
            .factory(name)
            .ok_or_else(|| HeliosError::MissingFactory {
                name: name.to_string(),
            })?;
        let Some(definitions) = self.staged.get(name) else {
            tracing::debug!("module '{name}' has no staged objects, skipping");
            return Ok(());
        };
        let definitions = definitions.clone();
        let module = factory(&definitions, self)?;
        self.modules.insert(name.to_string(), module);
        Ok(())
    }

    /// A constructed module by name.
    pub fn get_module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// Typed lookup of a constructed module.
    pub fn get<M: ModuleKind>(&self) -> Result<&M> {
        self.modules
            .get(M::NAME)
            .and_then(M::from_module)
            .ok_or_else(|| HeliosError::ModuleMissing {
                name: M::NAME.to_string(),
            })
    }
}
