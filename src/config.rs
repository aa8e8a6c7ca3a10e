use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable prefix, nested keys separated by `__`
/// (e.g. `KITCHEN_ASSISTANT__SYSTEM__PORT=3000`).
const ENV_PREFIX: &str = "KITCHEN_ASSISTANT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Path of the assistant script handed to the interpreter.
    #[serde(default = "default_script_path")]
    pub script_path: String,
    /// Virtual environment probed first for an interpreter.
    #[serde(default = "default_venv_dir")]
    pub venv_dir: String,
    /// Explicit interpreter, skips the venv probe when set.
    #[serde(default)]
    pub interpreter: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

fn default_script_path() -> String {
    "backend/assistant.py".to_string()
}

fn default_venv_dir() -> String {
    "backend/venv".to_string()
}

fn default_database_url() -> String {
    "postgres://localhost:5432/restaurant_db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            upload_dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            script_path: default_script_path(),
            venv_dir: default_venv_dir(),
            interpreter: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

impl Config {
    /// Load configuration from an optional YAML/JSON file, then environment
    /// variables. A missing file is not an error; every key has a default.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config: Config = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.system.port == 0 {
            return Err(ConfigError::Invalid("system.port must not be 0".to_string()));
        }
        if self.assistant.script_path.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "assistant.script_path must not be empty".to_string(),
            ));
        }
        if self.system.upload_dir.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "system.upload_dir must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl SystemConfig {
    pub fn upload_path(&self) -> PathBuf {
        PathBuf::from(&self.upload_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_apply_without_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = Config::load("does-not-exist").unwrap();

        assert_eq!(config.system.port, 5000);
        assert_eq!(config.system.upload_dir, "uploads");
        assert_eq!(config.assistant.script_path, "backend/assistant.py");
        assert!(config.assistant.interpreter.is_none());
    }

    #[test]
    fn environment_overrides_nested_values() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("KITCHEN_ASSISTANT__SYSTEM__PORT", "8081");
        env::set_var("KITCHEN_ASSISTANT__ASSISTANT__INTERPRETER", "/opt/py/bin/python3");
        let result = Config::load("does-not-exist");
        env::remove_var("KITCHEN_ASSISTANT__SYSTEM__PORT");
        env::remove_var("KITCHEN_ASSISTANT__ASSISTANT__INTERPRETER");

        let config = result.unwrap();
        assert_eq!(config.system.port, 8081);
        assert_eq!(
            config.assistant.interpreter.as_deref(),
            Some("/opt/py/bin/python3")
        );
    }

    #[test]
    fn yaml_file_is_read() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf.yaml");
        std::fs::write(
            &path,
            "system:\n  port: 7070\nassistant:\n  script_path: scripts/bot.py\n",
        )
        .unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.system.port, 7070);
        assert_eq!(config.assistant.script_path, "scripts/bot.py");
        assert_eq!(config.system.host, "0.0.0.0");
    }

    #[test]
    fn empty_script_path_is_rejected() {
        let mut config = Config::default();
        config.assistant.script_path = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn empty_upload_dir_is_rejected() {
        let mut config = Config::default();
        config.system.upload_dir = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_port_is_rejected() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("KITCHEN_ASSISTANT__SYSTEM__PORT", "not-a-port");
        let result = Config::load("does-not-exist");
        env::remove_var("KITCHEN_ASSISTANT__SYSTEM__PORT");

        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn zero_port_is_rejected() {
        let mut config = Config::default();
        config.system.port = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
