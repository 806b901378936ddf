use super::channel::PluginBox;
use super::metadata::ModuleMetadata;
use crate::error::LoadError;
use std::path::Path;

/// A module instance that passed metadata validation, with the metadata it
/// reported at load time.
pub struct ModuleInstance {
    pub instance: PluginBox,
    pub metadata: ModuleMetadata,
}

/// Turns a module path into a validated instance.
///
/// Implementations invoke the module's factory exactly once per call.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<ModuleInstance, LoadError>;
}

pub type ModuleLoaderBox = Box<dyn ModuleLoader>;
