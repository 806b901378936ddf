use crate::error::MetadataError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Open-ended configuration handed to `initialize` and `validate_config`.
///
/// The core imposes no schema on it.
pub type PluginConfig = Map<String, Value>;

/// The six standardized payment operations a channel can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CollectOrder,
    PayoutOrder,
    CollectQuery,
    PayoutQuery,
    BalanceInquiry,
    Callback,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::CollectOrder,
        Operation::PayoutOrder,
        Operation::CollectQuery,
        Operation::PayoutQuery,
        Operation::BalanceInquiry,
        Operation::Callback,
    ];

    /// The capability name a module declares for this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CollectOrder => "collect_order",
            Operation::PayoutOrder => "payout_order",
            Operation::CollectQuery => "collect_query",
            Operation::PayoutQuery => "payout_query",
            Operation::BalanceInquiry => "balance_inquiry",
            Operation::Callback => "callback",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Self-description a module reports about itself.
///
/// Cached by the registry at load time; `capabilities` and `config_schema` are
/// informational and never enforced by the core.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleMetadata {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    pub channel_type: String,
    pub capabilities: BTreeSet<String>,
    #[serde(default)]
    pub config_schema: Map<String, Value>,
}

impl ModuleMetadata {
    pub fn supports(&self, operation: Operation) -> bool {
        self.capabilities.contains(operation.as_str())
    }

    pub fn validate(&self) -> Result<(), MetadataError> {
        validate_metadata(self)
    }
}

/// Checks the fields every loadable module must populate.
pub fn validate_metadata(metadata: &ModuleMetadata) -> Result<(), MetadataError> {
    if metadata.name.is_empty() {
        return Err(MetadataError::MissingName);
    }
    if metadata.version.is_empty() {
        return Err(MetadataError::MissingVersion);
    }
    if metadata.channel_type.is_empty() {
        return Err(MetadataError::MissingChannelType);
    }
    if metadata.capabilities.is_empty() {
        return Err(MetadataError::NoCapabilities);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ModuleMetadata {
        ModuleMetadata {
            name: "Test Plugin".to_string(),
            version: "1.0.0".to_string(),
            channel_type: "test".to_string(),
            capabilities: BTreeSet::from(["collect_order".to_string()]),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_metadata_passes() {
        assert!(validate_metadata(&valid()).is_ok());
    }

    #[test]
    fn test_each_required_field_is_enforced() {
        let mut m = valid();
        m.name.clear();
        assert!(matches!(validate_metadata(&m), Err(MetadataError::MissingName)));

        let mut m = valid();
        m.version.clear();
        assert!(matches!(validate_metadata(&m), Err(MetadataError::MissingVersion)));

        let mut m = valid();
        m.channel_type.clear();
        assert!(matches!(
            validate_metadata(&m),
            Err(MetadataError::MissingChannelType)
        ));

        let mut m = valid();
        m.capabilities.clear();
        assert!(matches!(
            validate_metadata(&m),
            Err(MetadataError::NoCapabilities)
        ));
    }

    #[test]
    fn test_schema_is_not_enforced() {
        let mut m = valid();
        m.config_schema
            .insert("anything".to_string(), Value::String("goes".to_string()));
        assert!(m.validate().is_ok());
    }

    #[test]
    fn test_supports_uses_capability_names() {
        let m = valid();
        assert!(m.supports(Operation::CollectOrder));
        assert!(!m.supports(Operation::Callback));
    }
}
