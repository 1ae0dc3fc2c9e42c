use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    /// Whether to re-hash passwords with the current argon2 params on login
    pub auto_migrate_password_hashes: bool,

    /// Administrator account created on startup when it does not exist yet.
    pub bootstrap_admin: Option<BootstrapAdminConfig>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            auto_migrate_password_hashes: true,
            bootstrap_admin: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapAdminConfig {
    pub username: String,

    pub password: String,

    #[serde(default = "default_admin_first_name")]
    pub first_name: String,
}

fn default_admin_first_name() -> String {
    "Administrator".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    /// Emit logs as JSON lines instead of the human-readable format.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            json_logs: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Sessions expire after this many minutes without a request.
    pub session_inactivity_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8080,
            cors_allowed_origins: vec![
                "http://localhost:8080".to_string(),
                "http://127.0.0.1:8080".to_string(),
            ],
            secure_cookies: true,
            session_inactivity_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/dosport.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // A missing .env file is the normal case outside development.
        dotenvy::dotenv().ok();

        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        if let Ok(explicit) = std::env::var("DOSPORT_CONFIG") {
            paths.push(PathBuf::from(explicit));
        }

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("dosport").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".dosport").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.max_db_connections == 0 {
            anyhow::bail!("general.max_db_connections must be > 0");
        }

        if self.general.min_db_connections > self.general.max_db_connections {
            anyhow::bail!("general.min_db_connections cannot exceed max_db_connections");
        }

        if self.server.session_inactivity_minutes <= 0 {
            anyhow::bail!("server.session_inactivity_minutes must be > 0");
        }

        argon2::Params::new(
            self.security.argon2_memory_cost_kib,
            self.security.argon2_time_cost,
            self.security.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

        if let Some(admin) = &self.security.bootstrap_admin {
            if admin.username.trim().is_empty() {
                anyhow::bail!("security.bootstrap_admin.username cannot be blank");
            }
            if admin.password.chars().count() < 4 {
                anyhow::bail!("security.bootstrap_admin.password must be at least 4 characters");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.max_db_connections, 5);
        assert_eq!(config.security.argon2_time_cost, 3);
        assert!(config.security.auto_migrate_password_hashes);
        assert!(config.security.bootstrap_admin.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[security]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [security]
            argon2_time_cost = 2

            [security.bootstrap_admin]
            username = "root"
            password = "changeme"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.security.argon2_time_cost, 2);
        assert_eq!(config.security.argon2_memory_cost_kib, 8192);

        let admin = config.security.bootstrap_admin.unwrap();
        assert_eq!(admin.username, "root");
        assert_eq!(admin.first_name, "Administrator");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.security.argon2_time_cost = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.general.max_db_connections = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.security.bootstrap_admin = Some(BootstrapAdminConfig {
            username: "  ".to_string(),
            password: "changeme".to_string(),
            first_name: "Root".to_string(),
        });
        assert!(config.validate().is_err());
    }
}
