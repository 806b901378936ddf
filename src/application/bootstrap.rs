use super::registry::PluginRegistry;
use crate::error::RegistryError;
use crate::interfaces::manifest::ChannelManifest;
use tracing::{error, info, warn};

/// What happened to one manifest entry.
#[derive(Debug)]
pub struct ChannelOutcome {
    pub channel_id: String,
    pub result: Result<(), RegistryError>,
}

/// Loads and configures every enabled channel in `manifest`.
///
/// Entries are independent: a failure is recorded and the next entry is
/// still attempted. A channel whose configuration is rejected is unloaded
/// again so it never stays registered unconfigured.
pub async fn load_manifest(
    registry: &PluginRegistry,
    manifest: &ChannelManifest,
) -> Vec<ChannelOutcome> {
    let mut outcomes = Vec::with_capacity(manifest.channels.len());

    for entry in manifest.enabled() {
        let channel_id = entry.channel_id.as_str();
        let result = match registry.load_plugin(&entry.path, channel_id).await {
            Ok(()) => match registry.configure_plugin(channel_id, &entry.config).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    if let Err(unload) = registry.unload_plugin(channel_id).await {
                        warn!(
                            channel_id,
                            error = %unload,
                            "rejected channel could not be unloaded"
                        );
                    }
                    Err(e)
                }
            },
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            error!(channel_id, error = %e, "channel failed to start");
        }
        outcomes.push(ChannelOutcome {
            channel_id: channel_id.to_owned(),
            result,
        });
    }

    let started = outcomes.iter().filter(|o| o.result.is_ok()).count();
    info!(started, failed = outcomes.len() - started, "manifest loaded");
    outcomes
}
