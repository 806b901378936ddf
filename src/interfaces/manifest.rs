use crate::domain::metadata::PluginConfig;
use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// The set of channels an operator wants loaded at startup.
///
/// ```json
/// {
///   "channels": [
///     { "channel_id": "mock", "path": "libmock_channel.so", "config": { "success_rate": 1.0 } }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChannelManifest {
    pub channels: Vec<ChannelEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChannelEntry {
    pub channel_id: String,
    pub path: PathBuf,
    #[serde(default)]
    pub config: PluginConfig,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl ChannelManifest {
    /// Parses and checks a manifest from any `Read` source.
    pub fn from_reader<R: Read>(source: R) -> Result<Self, ConfigError> {
        let manifest: Self = serde_json::from_reader(source)?;
        manifest.check()?;
        Ok(manifest)
    }

    /// Reads a manifest file; relative module paths resolve against its directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut manifest = Self::from_reader(BufReader::new(File::open(path)?))?;
        if let Some(base) = path.parent() {
            manifest.resolve_relative_to(base);
        }
        Ok(manifest)
    }

    pub fn resolve_relative_to(&mut self, base: &Path) {
        for entry in &mut self.channels {
            if entry.path.is_relative() {
                entry.path = base.join(&entry.path);
            }
        }
    }

    pub fn enabled(&self) -> impl Iterator<Item = &ChannelEntry> {
        self.channels.iter().filter(|entry| entry.enabled)
    }

    fn check(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (index, entry) in self.channels.iter().enumerate() {
            if entry.channel_id.is_empty() {
                return Err(ConfigError::EmptyChannelId { index });
            }
            if !seen.insert(entry.channel_id.as_str()) {
                return Err(ConfigError::DuplicateChannel {
                    channel_id: entry.channel_id.clone(),
                });
            }
        }
        Ok(())
    }
}
