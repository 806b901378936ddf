use crate::domain::channel::PluginBox;
use crate::domain::metadata::validate_metadata;
use crate::domain::ports::ModuleInstance;
use crate::error::{LoadError, MetadataError};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

/// Invokes `factory` once and validates the instance it returns.
///
/// Shared by every loader so that the factory/metadata rules are identical
/// regardless of where the module's code comes from. A rejected instance is
/// dropped here and never reaches the registry.
pub fn instantiate<F>(path: &Path, factory: F) -> Result<ModuleInstance, LoadError>
where
    F: FnOnce() -> Option<PluginBox>,
{
    let instance = match panic::catch_unwind(AssertUnwindSafe(factory)) {
        Ok(Some(instance)) => instance,
        Ok(None) => {
            return Err(LoadError::Instantiation {
                path: path.to_path_buf(),
                reason: "factory returned no instance".to_string(),
            });
        }
        Err(payload) => {
            return Err(LoadError::Instantiation {
                path: path.to_path_buf(),
                reason: format!("factory panicked: {}", panic_message(payload.as_ref())),
            });
        }
    };

    let metadata = instance
        .metadata()
        .map_err(|e| LoadError::MetadataValidation {
            path: path.to_path_buf(),
            source: MetadataError::Unavailable(e),
        })?;

    validate_metadata(&metadata).map_err(|source| LoadError::MetadataValidation {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(ModuleInstance { instance, metadata })
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
