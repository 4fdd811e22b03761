use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use toml;

/// Project defaults, also written out as the user's config on first start.
pub const BLUEPRINT: &str = include_str!("../transverify.default.toml");

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub model: String,
    pub models: Vec<String>,
    pub api_key: Option<String>,
    pub verify_url: String,
    pub source_field: String,
    pub target_field: String,
    pub request_timeout_secs: u64,
    pub source_extensions: Vec<String>,
    pub target_extensions: Vec<String>,
    pub source_dir: Option<String>,
    pub target_dir: Option<String>,
    pub data_dir: Option<String>,
    pub log_filter: Option<String>,
}

impl Settings {
    pub fn new() -> anyhow::Result<Self> {
        let user_config_path = get_user_config_path()?;

        // First start: seed the user config from the blueprint
        if !user_config_path.exists() {
            if let Some(parent) = user_config_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&user_config_path, BLUEPRINT)?;
        }

        Ok(Self::load(Some(user_config_path))?)
    }

    /// Blueprint, then the user file, then `./transverify.toml`, then
    /// `TRANSVERIFY_*` environment variables.
    pub fn load(user_config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with_env(user_config_path, environment())
    }

    fn load_with_env(user_config_path: Option<PathBuf>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(File::from_str(BLUEPRINT, FileFormat::Toml));
        if let Some(path) = user_config_path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let s = builder
            .add_source(File::with_name("transverify.toml").required(false))
            .add_source(env)
            .build()?;

        s.try_deserialize()
    }

    /// Where the history slot and the log file live.
    pub fn resolved_data_dir(&self) -> anyhow::Result<PathBuf> {
        match self.data_dir.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(dir) => Ok(PathBuf::from(shellexpand::full(dir)?.into_owned())),
            None => {
                let mut path = dirs::data_dir()
                    .ok_or_else(|| anyhow::anyhow!("Failed to get data directory"))?;
                path.push("transverify");
                Ok(path)
            }
        }
    }

    pub fn resolve_dir(dir: Option<&str>) -> anyhow::Result<PathBuf> {
        let dir = dir.filter(|d| !d.trim().is_empty()).unwrap_or(".");
        Ok(PathBuf::from(shellexpand::full(dir)?.into_owned()))
    }

    /// The next entry of `models` after the current one, wrapping around.
    pub fn next_model(&self) -> String {
        match self.models.iter().position(|m| *m == self.model) {
            Some(pos) => self.models[(pos + 1) % self.models.len()].clone(),
            None => self.models.first().cloned().unwrap_or_else(|| self.model.clone()),
        }
    }
}

// List settings take comma separated values, e.g. TRANSVERIFY_MODELS=a/b,c/d
fn environment() -> Environment {
    Environment::with_prefix("TRANSVERIFY")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("models")
        .with_list_parse_key("source_extensions")
        .with_list_parse_key("target_extensions")
}

pub fn get_user_config_path() -> anyhow::Result<PathBuf> {
    let mut path = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Failed to get home directory"))?;
    path.push(".config");
    path.push("transverify");
    path.push("transverify.toml");
    Ok(path)
}

pub fn save_api_key_to(user_config_path: &Path, api_key: &str) -> Result<(), anyhow::Error> {
    let config_str = fs::read_to_string(user_config_path).unwrap_or_else(|_| "".to_string());
    let mut doc = config_str.parse::<toml::Table>()?;

    doc.insert("api_key".to_string(), toml::Value::String(api_key.to_string()));

    if let Some(parent) = user_config_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(user_config_path, doc.to_string())?;

    Ok(())
}
