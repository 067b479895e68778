use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Default number of documents fetched per page while draining a collection.
pub const DEFAULT_PAGE_SIZE: usize = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub cleanup: CleanupSettings,
    pub triggers: TriggerSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub backend: StoreBackend,
    pub url: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub ttl_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CleanupSettings {
    pub page_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerSettings {
    /// Run the in-process dispatcher for conversation write events.
    pub enabled: bool,
    /// Feed the dispatcher from a MongoDB change stream (needs a replica set).
    pub watch_changes: bool,
    pub channel_capacity: usize,
}

impl Settings {
    /// Loads settings from defaults, optional `config/default.toml`,
    /// optional `config/{APP_ENV}.toml` and `CONVO__*` environment variables,
    /// in that order of precedence.
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let settings: Settings = Config::builder()
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 5001_i64)?
            .set_default("database.backend", "mongo")?
            .set_default("database.url", "mongodb://localhost:27017")?
            .set_default("database.name", "convo")?
            .set_default("jwt.secret", "change-me")?
            .set_default("jwt.issuer", "convo")?
            .set_default("jwt.ttl_secs", 3600_i64)?
            .set_default("cleanup.page_size", DEFAULT_PAGE_SIZE as i64)?
            .set_default("triggers.enabled", true)?
            .set_default("triggers.watch_changes", true)?
            .set_default("triggers.channel_capacity", 4096_i64)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                Environment::with_prefix("CONVO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cleanup.page_size == 0 {
            return Err(ConfigError::Message(
                "cleanup.page_size must be at least 1".to_string(),
            ));
        }
        if self.triggers.channel_capacity == 0 {
            return Err(ConfigError::Message(
                "triggers.channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// True when the in-process trigger is on but nothing feeds it: the
    /// mongo backend only observes writes through its change stream.
    pub fn trigger_has_no_source(&self) -> bool {
        self.triggers.enabled
            && !self.triggers.watch_changes
            && self.database.backend == StoreBackend::Mongo
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app: AppSettings {
                host: "127.0.0.1".to_string(),
                port: 5001,
            },
            database: DatabaseSettings {
                backend: StoreBackend::Memory,
                url: "mongodb://localhost:27017".to_string(),
                name: "convo".to_string(),
            },
            jwt: JwtSettings {
                secret: "change-me".to_string(),
                issuer: "convo".to_string(),
                ttl_secs: 3600,
            },
            cleanup: CleanupSettings {
                page_size: DEFAULT_PAGE_SIZE,
            },
            triggers: TriggerSettings {
                enabled: true,
                watch_changes: true,
                channel_capacity: 4096,
            },
        }
    }
}
