use crate::domain::policy::RefundPolicy;
use crate::error::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub policy: RefundPolicy,
    #[serde(default)]
    pub points: PointsSettings,
    #[serde(default)]
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PointsSettings {
    /// Days before earned points expire. `0` disables expiry.
    pub expiry_days: u32,
}

impl Default for PointsSettings {
    fn default() -> Self {
        Self { expiry_days: 365 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewaySettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageSettings {
    pub db_path: Option<PathBuf>,
}

impl Settings {
    /// Loads settings from `config/default`, an optional extra file and
    /// `BAPAL__*` environment variables, in increasing precedence.
    ///
    /// Sections that are absent fall back to the built-in defaults; a
    /// policy section is validated while it is deserialized.
    pub fn load(extra: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::with_name("config/default").required(false));

        if let Some(path) = extra {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            // BAPAL__GATEWAY__BASE_URL=... overrides gateway.base_url
            .add_source(Environment::with_prefix("BAPAL").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
