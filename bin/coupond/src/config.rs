//! Server configuration — TOML file resolved from a context name.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub storage: StorageConfig,

    #[serde(default)]
    pub claim: ClaimConfig,

    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the SQLite database.
    pub data_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClaimConfig {
    /// Claim window in seconds. An identity that claims is barred from
    /// claiming again for this long.
    pub window_secs: i64,
    /// Interval between expiry sweeps of the claim ledger (seconds).
    pub sweep_interval_secs: u64,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            window_secs: 3600,
            sweep_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Frontend origin allowed to call the API with credentials.
    /// When unset, any origin is allowed (without credentials).
    pub allowed_origin: Option<String>,
}

impl ServerConfig {
    /// Resolve a context name or path to a config file path.
    ///
    /// A bare name resolves to `/etc/coupond/<name>.toml`; anything
    /// containing `/` or `.` is used as a path directly.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            PathBuf::from(format!("/etc/coupond/{name_or_path}.toml"))
        }
    }

    /// Load and verify configuration from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
        let config: ServerConfig = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
        config.verify()?;
        Ok(config)
    }

    /// Verify configuration is usable before touching storage.
    pub fn verify(&self) -> anyhow::Result<()> {
        if self.storage.data_dir.is_empty() {
            anyhow::bail!("storage.data_dir is empty in configuration");
        }
        if self.claim.window_secs <= 0 {
            anyhow::bail!("claim.window_secs must be positive");
        }
        Ok(())
    }

    /// Path of the SQLite database inside the data directory.
    pub fn resolve_sqlite_path(&self) -> PathBuf {
        Path::new(&self.storage.data_dir).join("coupond.sqlite")
    }
}
