use crate::domain::channel::SharedPlugin;
use crate::domain::metadata::{ModuleMetadata, PluginConfig};
use crate::domain::ports::ModuleLoaderBox;
use crate::error::{RegistryError, Result};
use crate::infrastructure::factory::panic_message;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Per-record usage bookkeeping. Both fields change together under one lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UsageStats {
    pub usage_count: u64,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// One registered channel.
///
/// Owned exclusively by the registry; callers only ever see the shared
/// instance (through [`PluginRegistry::get_plugin`]) or a [`ModuleSnapshot`].
struct LoadedModule {
    path: PathBuf,
    instance: SharedPlugin,
    metadata: ModuleMetadata,
    loaded_at: DateTime<Utc>,
    usage: Mutex<UsageStats>,
}

impl LoadedModule {
    /// Records one lookup and hands out the instance.
    fn touch(&self) -> SharedPlugin {
        let mut usage = self.usage.lock().unwrap_or_else(PoisonError::into_inner);
        usage.usage_count += 1;
        usage.last_used_at = Some(Utc::now());
        self.instance.clone()
    }

    fn snapshot(&self, channel_id: &str) -> ModuleSnapshot {
        let usage = *self.usage.lock().unwrap_or_else(PoisonError::into_inner);
        ModuleSnapshot {
            channel_id: channel_id.to_owned(),
            path: self.path.clone(),
            metadata: self.metadata.clone(),
            loaded_at: self.loaded_at,
            last_used_at: usage.last_used_at,
            usage_count: usage.usage_count,
        }
    }
}

/// Read-only copy of a registered channel, detached from registry state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleSnapshot {
    pub channel_id: String,
    pub path: PathBuf,
    pub metadata: ModuleMetadata,
    pub loaded_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub usage_count: u64,
}

/// Maps channel ids to loaded modules and owns their lifecycle.
///
/// Structural changes (load, unload, reload) take the write lock for their
/// whole check-then-act sequence. Lookups share the read lock and bump the
/// per-record counters under that record's own mutex, so concurrent lookups
/// never lose an increment. No lock is held while module code runs.
///
/// Field order matters: instances are dropped before the loader.
pub struct PluginRegistry {
    plugins: RwLock<HashMap<String, LoadedModule>>,
    loader: ModuleLoaderBox,
}

impl PluginRegistry {
    /// Creates an empty registry that opens modules through `loader`.
    pub fn new(loader: ModuleLoaderBox) -> Self {
        Self {
            plugins: RwLock::new(HashMap::new()),
            loader,
        }
    }

    /// Loads the module at `path` and registers it under `channel_id`.
    ///
    /// A second load for an id that is still registered fails with
    /// [`RegistryError::AlreadyLoaded`] instead of being ignored.
    pub async fn load_plugin(&self, path: impl AsRef<Path>, channel_id: &str) -> Result<()> {
        let mut plugins = self.plugins.write().await;
        self.insert_locked(&mut plugins, path.as_ref(), channel_id)
    }

    fn insert_locked(
        &self,
        plugins: &mut HashMap<String, LoadedModule>,
        path: &Path,
        channel_id: &str,
    ) -> Result<()> {
        if plugins.contains_key(channel_id) {
            return Err(RegistryError::AlreadyLoaded {
                channel_id: channel_id.to_owned(),
            });
        }

        let module = self
            .loader
            .load(path)
            .map_err(|source| RegistryError::Load {
                channel_id: channel_id.to_owned(),
                path: path.to_path_buf(),
                source,
            })?;

        info!(
            channel_id,
            path = %path.display(),
            name = %module.metadata.name,
            version = %module.metadata.version,
            channel_type = %module.metadata.channel_type,
            "plugin loaded"
        );

        plugins.insert(
            channel_id.to_owned(),
            LoadedModule {
                path: path.to_path_buf(),
                instance: SharedPlugin::from(module.instance),
                metadata: module.metadata,
                loaded_at: Utc::now(),
                usage: Mutex::new(UsageStats::default()),
            },
        );
        Ok(())
    }

    /// Returns the instance registered under `channel_id`, counting the lookup.
    ///
    /// This is the only way dispatch reaches an instance. Callers that cache
    /// the returned handle bypass usage accounting.
    pub async fn get_plugin(&self, channel_id: &str) -> Result<SharedPlugin> {
        let plugins = self.plugins.read().await;
        plugins
            .get(channel_id)
            .map(LoadedModule::touch)
            .ok_or_else(|| RegistryError::not_found(channel_id))
    }

    /// Drops the registration for `channel_id`.
    ///
    /// The module's code is not unmapped; see [`crate::infrastructure::dylib`].
    pub async fn unload_plugin(&self, channel_id: &str) -> Result<()> {
        let mut plugins = self.plugins.write().await;
        plugins
            .remove(channel_id)
            .ok_or_else(|| RegistryError::not_found(channel_id))?;
        info!(channel_id, "plugin unloaded");
        Ok(())
    }

    /// Replaces the module for `channel_id` with a fresh load from its path.
    ///
    /// The old record is discarded before the new load is attempted. If that
    /// load fails the channel is left unregistered.
    pub async fn reload_plugin(&self, channel_id: &str) -> Result<()> {
        let mut plugins = self.plugins.write().await;
        let previous = plugins
            .remove(channel_id)
            .ok_or_else(|| RegistryError::not_found(channel_id))?;
        let path = previous.path.clone();
        drop(previous);

        self.insert_locked(&mut plugins, &path, channel_id)
            .inspect(|_| info!(channel_id, path = %path.display(), "plugin reloaded"))
            .inspect_err(|e| {
                warn!(channel_id, error = %e, "reload failed; channel is now unregistered");
            })
    }

    /// A detached copy of every registration.
    pub async fn list_plugins(&self) -> HashMap<String, ModuleSnapshot> {
        let plugins = self.plugins.read().await;
        plugins
            .iter()
            .map(|(id, module)| (id.clone(), module.snapshot(id)))
            .collect()
    }

    /// Asks the live instance for its metadata rather than returning the copy
    /// cached at load time.
    pub async fn get_plugin_metadata(&self, channel_id: &str) -> Result<ModuleMetadata> {
        let instance = self.instance(channel_id).await?;
        instance
            .metadata()
            .map_err(|source| RegistryError::Metadata {
                channel_id: channel_id.to_owned(),
                source,
            })
    }

    /// Shallow liveness: `true` iff the channel still answers a metadata query.
    ///
    /// A failing or panicking channel is reported as `false` without affecting
    /// the rest of the sweep. Payment operations are never called.
    pub async fn health_check(&self) -> HashMap<String, bool> {
        let instances: Vec<(String, SharedPlugin)> = {
            let plugins = self.plugins.read().await;
            plugins
                .iter()
                .map(|(id, module)| (id.clone(), module.instance.clone()))
                .collect()
        };

        instances
            .into_iter()
            .map(|(id, instance)| {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| instance.metadata()));
                let healthy = match outcome {
                    Ok(Ok(_)) => true,
                    Ok(Err(e)) => {
                        warn!(channel_id = %id, error = %e, "plugin failed health check");
                        false
                    }
                    Err(payload) => {
                        warn!(
                            channel_id = %id,
                            panic = panic_message(payload.as_ref()),
                            "plugin panicked during health check"
                        );
                        false
                    }
                };
                (id, healthy)
            })
            .collect()
    }

    /// Validates `config` with the channel and, if accepted, initializes it.
    ///
    /// Management traffic, so it is not counted as usage.
    pub async fn configure_plugin(&self, channel_id: &str, config: &PluginConfig) -> Result<()> {
        let instance = self.instance(channel_id).await?;

        let to_config_error = |source| RegistryError::Config {
            channel_id: channel_id.to_owned(),
            source,
        };
        instance.validate_config(config).map_err(to_config_error)?;
        instance.initialize(config).map_err(to_config_error)?;
        info!(channel_id, keys = config.len(), "plugin configured");
        Ok(())
    }

    /// The instance for management calls; the read lock is released on return.
    async fn instance(&self, channel_id: &str) -> Result<SharedPlugin> {
        let plugins = self.plugins.read().await;
        plugins
            .get(channel_id)
            .map(|module| module.instance.clone())
            .ok_or_else(|| RegistryError::not_found(channel_id))
    }

    /// Usage counters for one channel.
    pub async fn usage(&self, channel_id: &str) -> Result<UsageStats> {
        let plugins = self.plugins.read().await;
        plugins
            .get(channel_id)
            .map(|module| *module.usage.lock().unwrap_or_else(PoisonError::into_inner))
            .ok_or_else(|| RegistryError::not_found(channel_id))
    }

    pub async fn len(&self) -> usize {
        self.plugins.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.plugins.read().await.is_empty()
    }
}
