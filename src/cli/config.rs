use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Contents of env.json: which server to talk to and the current session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub server_url: Option<String>,
    pub token: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub logged_in_at: Option<DateTime<Utc>>,
}

impl EnvironmentConfig {
    pub fn server_url(&self) -> String {
        self.server_url
            .clone()
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
    }

    pub fn set_session(&mut self, token: String, email: String, role: String) {
        self.token = Some(token);
        self.email = Some(email);
        self.role = Some(role);
        self.logged_in_at = Some(Utc::now());
    }

    pub fn clear_session(&mut self) {
        self.token = None;
        self.email = None;
        self.role = None;
        self.logged_in_at = None;
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("REZOLLO_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("rezollo").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_environment_config() -> anyhow::Result<EnvironmentConfig> {
    load_from(&get_config_dir()?)
}

pub fn save_environment_config(config: &EnvironmentConfig) -> anyhow::Result<()> {
    save_to(&get_config_dir()?, config)
}

pub fn load_from(dir: &Path) -> anyhow::Result<EnvironmentConfig> {
    let env_file = dir.join("env.json");
    if !env_file.exists() {
        return Ok(EnvironmentConfig::default());
    }
    let content = fs::read_to_string(env_file)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn save_to(dir: &Path, config: &EnvironmentConfig) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    fs::write(dir.join("env.json"), content)?;
    Ok(())
}
