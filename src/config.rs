// ⚙️ Configuration - input locations and KCP/EDP settings
//
// Loaded from a TOML file when one exists, otherwise defaults.
// KCP_BINARY and KCPCONFIG override the registry section.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Env var naming an explicit config file
pub const CONFIG_ENV: &str = "SUBACCOUNT_AUDIT_CONFIG";

/// Config file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "subaccount-audit.toml";

// ============================================================================
// APP CONFIG
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// EDP registration export (JSON array of `{ "name": ... }`)
    #[serde(default = "default_edp_subaccounts_path")]
    pub edp_subaccounts_path: PathBuf,

    /// Live runtime export, one runtime per line, subaccount first
    #[serde(default = "default_skr_subaccounts_path")]
    pub skr_subaccounts_path: PathBuf,

    /// Operations table extract
    #[serde(default = "default_operations_path")]
    pub operations_path: PathBuf,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub suggestions: SuggestionConfig,

    /// Default tracing filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_edp_subaccounts_path() -> PathBuf {
    PathBuf::from("edp-subaccounts.json")
}

fn default_skr_subaccounts_path() -> PathBuf {
    PathBuf::from("skr-subaccounts.txt")
}

fn default_operations_path() -> PathBuf {
    PathBuf::from("operations.csv")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            edp_subaccounts_path: default_edp_subaccounts_path(),
            skr_subaccounts_path: default_skr_subaccounts_path(),
            operations_path: default_operations_path(),
            registry: RegistryConfig::default(),
            suggestions: SuggestionConfig::default(),
            log_level: default_log_level(),
        }
    }
}

// ============================================================================
// REGISTRY (KCP CLI)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Run Phase 2 of the operations report
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_kcp_binary")]
    pub kcp_binary: PathBuf,

    /// Passed to the CLI as KCPCONFIG
    #[serde(default = "default_kcp_config")]
    pub kcp_config: PathBuf,

    /// Passed to the CLI as HOME (token cache lives there)
    #[serde(default = "default_home_dir")]
    pub home_dir: PathBuf,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Subaccount id produced by a header row; never queried
    #[serde(default = "default_header_sentinel")]
    pub header_sentinel: String,
}

fn default_true() -> bool {
    true
}

fn default_kcp_binary() -> PathBuf {
    PathBuf::from("kcp")
}

fn default_kcp_config() -> PathBuf {
    PathBuf::from("kcp.yaml")
}

fn default_home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_timeout_secs() -> u64 {
    3
}

fn default_header_sentinel() -> String {
    "subid".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            kcp_binary: default_kcp_binary(),
            kcp_config: default_kcp_config(),
            home_dir: default_home_dir(),
            timeout_secs: default_timeout_secs(),
            header_sentinel: default_header_sentinel(),
        }
    }
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============================================================================
// SUGGESTIONS (EDP commands)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionConfig {
    /// How the generated script invokes the EDP registrator
    #[serde(default = "default_edp_binary")]
    pub edp_binary: String,

    /// Append an `edp get <sid>` line after each registration
    #[serde(default)]
    pub emit_verification: bool,
}

fn default_edp_binary() -> String {
    "./edp".to_string()
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            edp_binary: default_edp_binary(),
            emit_verification: false,
        }
    }
}

// ============================================================================
// LOADING
// ============================================================================

impl AuditConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Resolve config the way the binary does:
    /// explicit file from env → file in working dir → defaults, then env overrides
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path))?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::load(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply KCP_BINARY / KCPCONFIG overrides from a lookup function
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(binary) = lookup("KCP_BINARY").filter(|v| !v.is_empty()) {
            self.registry.kcp_binary = PathBuf::from(binary);
        }
        if let Some(kcp_config) = lookup("KCPCONFIG").filter(|v| !v.is_empty()) {
            self.registry.kcp_config = PathBuf::from(kcp_config);
        }
    }
}
