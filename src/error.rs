use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a channel module itself.
///
/// The core never inspects or rewraps these: whatever a module returns from a
/// payment operation reaches the caller as-is.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Reasons a module's declared metadata is rejected.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("metadata unavailable: {0}")]
    Unavailable(#[source] ChannelError),
    #[error("module name is required")]
    MissingName,
    #[error("module version is required")]
    MissingVersion,
    #[error("module channel type is required")]
    MissingChannelType,
    #[error("module must declare at least one capability")]
    NoCapabilities,
}

/// Failures while turning a filesystem path into a validated module instance.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to open module {}: {reason}", path.display())]
    Open { path: PathBuf, reason: String },
    #[error(
        "dynamic loading is not supported in this build (enable the `dynamic-loading` feature); cannot open {}",
        path.display()
    )]
    Unsupported { path: PathBuf },
    #[error("module {} does not export entry point `{symbol}`: {reason}", path.display())]
    EntryPointMissing {
        path: PathBuf,
        symbol: &'static str,
        reason: String,
    },
    #[error("module {} entry point has an incompatible signature: {reason}", path.display())]
    EntryPointSignatureMismatch { path: PathBuf, reason: String },
    #[error("module {} failed to instantiate: {reason}", path.display())]
    Instantiation { path: PathBuf, reason: String },
    #[error("module {} metadata validation failed: {source}", path.display())]
    MetadataValidation {
        path: PathBuf,
        #[source]
        source: MetadataError,
    },
}

#[derive(Error, Debug, Diagnostic)]
pub enum RegistryError {
    #[error("plugin for channel {channel_id} is already loaded")]
    #[diagnostic(code(paychan::registry::already_loaded))]
    AlreadyLoaded { channel_id: String },

    #[error("plugin for channel {channel_id} not found")]
    #[diagnostic(code(paychan::registry::not_found))]
    NotFound { channel_id: String },

    #[error("failed to load plugin for channel {channel_id} from {}: {source}", path.display())]
    #[diagnostic(code(paychan::registry::load_failed))]
    Load {
        channel_id: String,
        path: PathBuf,
        #[source]
        source: LoadError,
    },

    #[error("plugin for channel {channel_id} failed to report metadata: {source}")]
    #[diagnostic(code(paychan::registry::metadata_failed))]
    Metadata {
        channel_id: String,
        #[source]
        source: ChannelError,
    },

    #[error("plugin for channel {channel_id} rejected its configuration: {source}")]
    #[diagnostic(code(paychan::registry::config_rejected))]
    Config {
        channel_id: String,
        #[source]
        source: ChannelError,
    },
}

impl RegistryError {
    pub(crate) fn not_found(channel_id: &str) -> Self {
        Self::NotFound {
            channel_id: channel_id.to_owned(),
        }
    }
}

/// Error returned by the dispatch facade: either the lookup failed, or the
/// module's own error, passed through untouched.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    #[diagnostic(code(paychan::config::io))]
    Io(#[from] std::io::Error),
    #[error("invalid manifest: {0}")]
    #[diagnostic(code(paychan::config::parse))]
    Parse(#[from] serde_json::Error),
    #[error("manifest entry #{index} has an empty channel_id")]
    #[diagnostic(code(paychan::config::empty_channel_id))]
    EmptyChannelId { index: usize },
    #[error("channel {channel_id} is declared more than once in the manifest")]
    #[diagnostic(code(paychan::config::duplicate_channel))]
    DuplicateChannel { channel_id: String },
}

pub type Result<T, E = RegistryError> = std::result::Result<T, E>;
