//! Configuration for the DevStatus engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use devstatus_agent::AnalyzerSettings;

use crate::activity::DEFAULT_ACTIVITY_CAPACITY;

/// Configuration for a dashboard engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Project the status records belong to
    pub project_id: String,
    /// Environment selected at startup (id or name)
    pub initial_environment: String,
    /// Operator identity used for manual changes
    pub operator: OperatorConfig,
    /// Activity feed configuration
    pub activity: ActivityConfig,
    /// Rule matcher configuration
    pub rules: RulesConfig,
    /// Manifest analyzer selection
    pub analyzer: AnalyzerSettings,
    /// Persistence configuration
    pub persistence: PersistenceConfig,
    /// General settings
    pub general: GeneralConfig,
    /// YAML catalog to use instead of the built-in one
    pub catalog_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            project_id: "p1".to_string(),
            initial_environment: "e1".to_string(),
            operator: OperatorConfig::default(),
            activity: ActivityConfig::default(),
            rules: RulesConfig::default(),
            analyzer: AnalyzerSettings::default(),
            persistence: PersistenceConfig::default(),
            general: GeneralConfig::default(),
            catalog_path: None,
        }
    }
}

impl EngineConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Who manual updates and comments are attributed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// Stored in `lastUpdatedBy` and `verifiedBy`
    pub id: String,
    /// Shown as history actor and comment author
    pub display_name: String,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            id: "user_1".to_string(),
            display_name: "User (JD)".to_string(),
        }
    }
}

/// Activity feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    /// Maximum entries retained
    pub capacity: usize,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_ACTIVITY_CAPACITY,
        }
    }
}

/// Rule matcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Delay before the quick-fix effect lands (ms)
    pub quick_fix_delay_ms: u64,
    /// Agent id whose CI events are treated as webhooks
    pub webhook_agent_id: String,
}

impl RulesConfig {
    pub fn quick_fix_delay(&self) -> Duration {
        Duration::from_millis(self.quick_fix_delay_ms)
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            quick_fix_delay_ms: 2000,
            webhook_agent_id: "webhook".to_string(),
        }
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Key prefix for the stored collections
    pub namespace: String,
    /// Directory for the file store; in-memory when unset
    pub data_dir: Option<PathBuf>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            namespace: "devstatus".to_string(),
            data_dir: None,
        }
    }
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
