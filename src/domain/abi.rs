//! The host/module boundary: one exported static holding the factory.
//!
//! Rust has no stable ABI for trait objects, so a module must be built with
//! the same compiler and the same `paychan` version as the host. The
//! declaration carries both markers and the host checks them before it ever
//! calls into the factory.
//!
//! A module also links its own copy of the async runtime, one that is never
//! started. Module code must wait through
//! [`CallContext::sleep`](super::context::CallContext::sleep) and must not
//! create runtime timers or spawn tasks itself.

use super::channel::PluginBox;

/// Bumped whenever `PluginDeclaration` or the channel contract changes shape.
pub const ABI_VERSION: u32 = 2;

pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exact name of the exported declaration.
pub const ENTRY_POINT: &str = "PAYCHAN_PLUGIN_ENTRY";

/// Zero-argument factory producing a fresh instance. `None` means the module
/// could not build one.
pub type PluginFactory = fn() -> Option<PluginBox>;

#[repr(C)]
pub struct PluginDeclaration {
    /// Kept first so it can be read before the rest of the layout is trusted.
    pub abi_version: u32,
    pub core_version: &'static str,
    pub new_plugin: PluginFactory,
}

/// Exports `$factory` from a `cdylib` under [`ENTRY_POINT`].
///
/// ```ignore
/// fn new_plugin() -> Option<paychan::domain::channel::PluginBox> {
///     Some(Box::new(MyChannel::default()))
/// }
///
/// paychan::declare_plugin!(new_plugin);
/// ```
#[macro_export]
macro_rules! declare_plugin {
    ($factory:path) => {
        #[unsafe(no_mangle)]
        pub static PAYCHAN_PLUGIN_ENTRY: $crate::domain::abi::PluginDeclaration =
            $crate::domain::abi::PluginDeclaration {
                abi_version: $crate::domain::abi::ABI_VERSION,
                core_version: $crate::domain::abi::CORE_VERSION,
                new_plugin: $factory,
            };
    };
}
