//! Extensions: named bundles of reader and render components.

use crate::error::{ConfigError, StorageError};
use crate::extensions::{CoreExtension, FloatsExtension};
use crate::reader::Reader;
use crate::renderer::Renderer;
use crate::settings::{Schema, Settings};

pub trait Extension: Send + Sync {
    fn name(&self) -> &str;

    /// Options accepted in the extension's configuration block
    fn config_schema(&self) -> Schema {
        Schema::new()
    }

    /// Receive validated options; called once, before `extend`
    fn configure(&mut self, settings: Settings) {
        let _ = settings;
    }

    /// Register reader components, render components and packages
    fn extend(&self, reader: &mut Reader, renderer: &mut Renderer) -> Result<(), ConfigError>;

    /// Clear per-run state such as counters; registrations are kept
    fn reinit(&self) {}
}

pub type ExtensionFactory = fn() -> Box<dyn Extension>;

fn new_core() -> Box<dyn Extension> {
    Box::new(CoreExtension::default())
}

fn new_floats() -> Box<dyn Extension> {
    Box::new(FloatsExtension::default())
}

/// Extension factories by name
pub struct ExtensionCatalog {
    factories: Vec<(String, ExtensionFactory)>,
}

impl Default for ExtensionCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ExtensionCatalog {
    pub fn empty() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// Catalog holding the `core` and `floats` extensions
    pub fn builtin() -> Self {
        Self {
            factories: vec![
                ("core".to_string(), new_core as ExtensionFactory),
                ("floats".to_string(), new_floats as ExtensionFactory),
            ],
        }
    }

    /// Add a factory under `name`; an existing name is never replaced
    pub fn register(&mut self, name: &str, factory: ExtensionFactory) -> Result<(), ConfigError> {
        if self.factories.iter().any(|(known, _)| known == name) {
            return Err(StorageError::Duplicate(name.to_string()).into());
        }
        self.factories.push((name.to_string(), factory));
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.iter().map(|(name, _)| name.as_str())
    }

    /// Build extension `name` and configure it from its YAML options
    pub fn load(
        &self,
        name: &str,
        options: Option<&serde_yaml::Mapping>,
    ) -> Result<Box<dyn Extension>, ConfigError> {
        let factory = self
            .factories
            .iter()
            .find(|(known, _)| known == name)
            .map(|(_, factory)| factory)
            .ok_or_else(|| ConfigError::UnknownExtension(name.to_string()))?;
        let mut extension = factory();

        let schema = extension.config_schema();
        let settings = match options {
            Some(map) => schema.apply_yaml(map),
            None => Ok(schema.defaults()),
        }
        .map_err(|source| ConfigError::ExtensionOption {
            extension: name.to_string(),
            source,
        })?;

        tracing::debug!("Loaded extension '{}'", name);
        extension.configure(settings);
        Ok(extension)
    }
}
