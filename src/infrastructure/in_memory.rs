use super::factory::instantiate;
use super::mock_channel::MockChannel;
use crate::domain::channel::PluginBox;
use crate::domain::ports::{ModuleInstance, ModuleLoader};
use crate::error::LoadError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

pub type SharedFactory = Arc<dyn Fn() -> Option<PluginBox> + Send + Sync>;

/// A loader backed by an in-process table of factories keyed by path.
///
/// Uses `Arc<RwLock<HashMap<PathBuf, SharedFactory>>>` so clones share the
/// table: a test can hand one clone to the registry and keep editing the other
/// to make a later reload fail. Also serves built-in channels on platforms
/// where native modules cannot be produced.
#[derive(Default, Clone)]
pub struct InMemoryModuleLoader {
    factories: Arc<RwLock<HashMap<PathBuf, SharedFactory>>>,
}

impl InMemoryModuleLoader {
    /// Creates a loader with an empty factory table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a loader serving the channels compiled into this crate.
    pub fn with_builtins() -> Self {
        let loader = Self::new();
        loader.register("mock", || Some(Box::new(MockChannel::new()) as PluginBox));
        loader
    }

    pub fn register<P, F>(&self, path: P, factory: F)
    where
        P: Into<PathBuf>,
        F: Fn() -> Option<PluginBox> + Send + Sync + 'static,
    {
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), Arc::new(factory));
    }

    /// Removes the factory for `path`, returning whether one was present.
    pub fn unregister(&self, path: impl AsRef<Path>) -> bool {
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path.as_ref())
            .is_some()
    }
}

impl ModuleLoader for InMemoryModuleLoader {
    fn load(&self, path: &Path) -> Result<ModuleInstance, LoadError> {
        // Table lock is released before the factory runs.
        let factory = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::Open {
                path: path.to_path_buf(),
                reason: "no in-process module registered under this path".to_string(),
            })?;

        instantiate(path, || factory())
    }
}
