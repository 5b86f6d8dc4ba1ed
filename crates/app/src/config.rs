use config::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub blobs: BlobSettings,
    pub user: UserSettings,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
}

#[derive(Deserialize, Clone)]
pub struct BlobSettings {
    pub root: String,
    pub bucket: String,
    pub public_base_url: String,
}

#[derive(Deserialize, Clone)]
pub struct UserSettings {
    pub id: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        let env_map = collect_env_vars();

        let s = config::Config::builder()
            .set_default("database.url", "sqlite://data/talkback.db")?
            .set_default("blobs.root", "data/blobs")?
            .set_default("blobs.bucket", "attachments")?
            .set_default("blobs.public_base_url", "http://localhost:9000")?
            .set_default("user.id", "local-user")?
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::File::with_name(&format!("config.{}", run_mode)).required(false))
            .add_source(config::File::from_str(
                &serde_json::to_string(&env_map)
                    .expect("Environment variables should serialize to JSON"),
                config::FileFormat::Json,
            ))
            .build()?;

        s.try_deserialize()
    }
}

fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("TALKBACK_"))
        .map(|(k, v)| {
            let new_key = k
                .trim_start_matches("TALKBACK_")
                .replace("__", ".")
                .to_lowercase();
            (new_key, v)
        })
        .collect()
}
