use anyhow::{anyhow, Result};
use config::{Config, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub log: Log,
    pub storage: Storage,
    pub mysql: Mysql,
    pub redis: Redis,
    pub broker: Broker,
    pub files: Files,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub cert_path: String,
    pub key_path: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
    pub backend: String, // "mysql" or "mem"
}

#[derive(Debug, Deserialize)]
pub struct Mysql {
    pub dsn: String,
}

#[derive(Debug, Deserialize)]
pub struct Redis {
    pub dsn: String,
}

#[derive(Debug, Deserialize)]
pub struct Broker {
    pub bootstrap: String,
    /// Topic names are `{prefix}.{event kind}`.
    pub topic_prefix: String,
    /// Topic the object-storage service publishes completion notices on.
    pub upload_notice_topic: String,
}

#[derive(Debug, Deserialize)]
pub struct Files {
    /// Public URL prefix for stored objects: `{base}/{bucket}/{key}`.
    pub public_base_url: String,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
