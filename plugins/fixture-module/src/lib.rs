//! Deliberately incompatible modules for exercising the native loader's
//! entry-point checks. Built with no features it is a valid library that
//! exports no declaration.

#[cfg(any(feature = "stale-abi", feature = "stale-core"))]
use paychan::domain::abi::{ABI_VERSION, CORE_VERSION, PluginDeclaration};
#[cfg(any(feature = "stale-abi", feature = "stale-core"))]
use paychan::domain::channel::PluginBox;

#[cfg(any(feature = "stale-abi", feature = "stale-core"))]
fn new_plugin() -> Option<PluginBox> {
    Some(Box::new(paychan::infrastructure::mock_channel::MockChannel::new()))
}

#[cfg(feature = "stale-abi")]
#[unsafe(no_mangle)]
pub static PAYCHAN_PLUGIN_ENTRY: PluginDeclaration = PluginDeclaration {
    abi_version: ABI_VERSION + 100,
    core_version: CORE_VERSION,
    new_plugin,
};

#[cfg(all(feature = "stale-core", not(feature = "stale-abi")))]
#[unsafe(no_mangle)]
pub static PAYCHAN_PLUGIN_ENTRY: PluginDeclaration = PluginDeclaration {
    abi_version: ABI_VERSION,
    core_version: "0.0.0-stale",
    new_plugin,
};

/// Keeps the library non-empty when no declaration is exported.
#[unsafe(no_mangle)]
pub extern "C" fn paychan_fixture_marker() -> u32 {
    7
}
