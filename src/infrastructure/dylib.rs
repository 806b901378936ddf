//! Native module loading through the platform's dynamic linker.
//!
//! A library whose declaration passed the version checks is never closed: it
//! joins a process-wide set that is not dropped. Instances and their vtables
//! can outlive any registry or loader. Unloading a channel only drops its
//! registration; the module's code stays mapped, and reopening the same path
//! yields the already-mapped image.

use crate::domain::ports::{ModuleInstance, ModuleLoader};
use crate::error::LoadError;
use std::path::Path;

#[cfg(feature = "dynamic-loading")]
use {
    super::factory::instantiate,
    crate::domain::abi::{ABI_VERSION, CORE_VERSION, ENTRY_POINT, PluginDeclaration},
    libloading::Library,
    std::sync::{Mutex, PoisonError},
    tracing::debug,
};

/// Libraries resident for the rest of the process. Statics are never dropped.
#[cfg(feature = "dynamic-loading")]
static RESIDENT: Mutex<Vec<Library>> = Mutex::new(Vec::new());

/// Loads `cdylib` channel modules that export [`ENTRY_POINT`].
///
/// [`ENTRY_POINT`]: crate::domain::abi::ENTRY_POINT
#[derive(Debug, Default, Clone, Copy)]
pub struct DylibLoader;

impl DylibLoader {
    pub fn new() -> Self {
        Self
    }

    /// Whether this build can open native modules at all.
    pub const fn is_supported() -> bool {
        cfg!(feature = "dynamic-loading")
    }
}

#[cfg(feature = "dynamic-loading")]
impl ModuleLoader for DylibLoader {
    fn load(&self, path: &Path) -> Result<ModuleInstance, LoadError> {
        if !path.is_file() {
            return Err(LoadError::Open {
                path: path.to_path_buf(),
                reason: "no such file".to_string(),
            });
        }

        // SAFETY: opening a library runs its initializers. Modules are trusted
        // code chosen by the operator.
        let library = unsafe { Library::new(path) }.map_err(|e| LoadError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let symbol_name = format!("{ENTRY_POINT}\0");
        // SAFETY: the symbol is the address of a `PluginDeclaration` static;
        // only `abi_version` is read until the version markers are checked.
        let declaration: *const PluginDeclaration = unsafe {
            let symbol = library
                .get::<*const PluginDeclaration>(symbol_name.as_bytes())
                .map_err(|e| LoadError::EntryPointMissing {
                    path: path.to_path_buf(),
                    symbol: ENTRY_POINT,
                    reason: e.to_string(),
                })?;
            *symbol
        };
        if declaration.is_null() {
            return Err(LoadError::EntryPointMissing {
                path: path.to_path_buf(),
                symbol: ENTRY_POINT,
                reason: "symbol resolved to a null address".to_string(),
            });
        }

        // SAFETY: `abi_version` is the first field of a `repr(C)` struct.
        let abi_version = unsafe { (*declaration).abi_version };
        if abi_version != ABI_VERSION {
            return Err(LoadError::EntryPointSignatureMismatch {
                path: path.to_path_buf(),
                reason: format!("module ABI v{abi_version}, host expects v{ABI_VERSION}"),
            });
        }

        // SAFETY: the ABI version matches, so the full layout is the one this
        // build declares.
        let (core_version, factory) =
            unsafe { ((*declaration).core_version, (*declaration).new_plugin) };
        if core_version != CORE_VERSION {
            return Err(LoadError::EntryPointSignatureMismatch {
                path: path.to_path_buf(),
                reason: format!(
                    "module built against paychan {core_version}, host is {CORE_VERSION}"
                ),
            });
        }

        // Resident before the factory runs: whatever it creates may reference
        // the library's code even if validation then rejects the instance.
        RESIDENT
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(library);
        debug!(path = %path.display(), "native module resident");

        instantiate(path, factory)
    }
}

#[cfg(not(feature = "dynamic-loading"))]
impl ModuleLoader for DylibLoader {
    fn load(&self, path: &Path) -> Result<ModuleInstance, LoadError> {
        Err(LoadError::Unsupported {
            path: path.to_path_buf(),
        })
    }
}
