use serde::Deserialize;
use std::path::PathBuf;

/// Which backend a partition is stored in. `Sled` is the native crash-safe
/// store; `Ldif` is the human-readable one-file-per-entry alternative.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Sled,
    Ldif,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartitionConfig {
    /// The suffix DN this partition roots, e.g. `dc=example,dc=com`.
    pub suffix: String,
    pub backend: BackendKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordPolicySettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_failure")]
    pub max_failure: u32,
    #[serde(default = "default_lockout_minutes")]
    pub lockout_minutes: i64,
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default = "default_history")]
    pub history: usize,
    #[serde(default)]
    pub must_change_on_reset: bool,
}

fn default_true() -> bool {
    true
}
fn default_max_failure() -> u32 {
    3
}
fn default_lockout_minutes() -> i64 {
    30
}
fn default_min_length() -> usize {
    8
}
fn default_history() -> usize {
    5
}

impl Default for PasswordPolicySettings {
    fn default() -> Self {
        PasswordPolicySettings {
            enabled: default_true(),
            max_failure: default_max_failure(),
            lockout_minutes: default_lockout_minutes(),
            min_length: default_min_length(),
            history: default_history(),
            must_change_on_reset: false,
        }
    }
}

impl PasswordPolicySettings {
    pub fn to_policy(&self) -> directoryd_auth::PasswordPolicyConfig {
        let mut policy = directoryd_auth::PasswordPolicyConfig::default();
        policy.enabled = self.enabled;
        policy.pwd_max_failure = self.max_failure;
        policy.pwd_lockout_duration = chrono::Duration::minutes(self.lockout_minutes);
        policy.pwd_min_length = self.min_length;
        policy.pwd_in_history = self.history;
        policy.pwd_must_change = self.must_change_on_reset;
        policy
    }
}

/// Loaded from a TOML file at startup. Bind address and TLS material are
/// recorded here for a future transport layer to consume — the core itself
/// (this binary included) never opens a socket, per the protocol-agnostic
/// boundary in spec.md §1.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    pub tls_cert: Option<PathBuf>,
    pub tls_key: Option<PathBuf>,
    pub schema_file: PathBuf,
    pub partitions: Vec<PartitionConfig>,
    pub admin_dn: String,
    pub admin_password: String,
    #[serde(default)]
    pub password_policy: PasswordPolicySettings,
    #[serde(default)]
    pub enable_aci: bool,
    #[serde(default)]
    pub enable_changelog: bool,
    #[serde(default = "default_changelog_path")]
    pub changelog_path: PathBuf,
}

fn default_changelog_path() -> PathBuf {
    PathBuf::from("changelog.ldif")
}

fn default_bind_address() -> String {
    "0.0.0.0:389".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("parsing config file {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("no partitions configured")]
    NoPartitions,
}

impl Config {
    pub fn load(path: &std::path::Path) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        if config.partitions.is_empty() {
            return Err(ConfigError::NoPartitions);
        }
        Ok(config)
    }
}
