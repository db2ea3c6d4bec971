use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Missing database environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct TemplateSettings {
    pub dir: String,
    pub debug: bool,
}

/// Connection parameters for the backing MySQL database.
#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    pub host: String,
    pub user: String,
    pub password: String,
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub debug: bool,
    pub host: String,
    pub port: u16,
    pub database: DatabaseSettings,
    pub template: TemplateSettings,
}

impl Settings {
    /// Load settings from the process environment.
    ///
    /// The four `MYSQL_*` variables are required; everything else has a
    /// default. Call `dotenvy::dotenv()` first if a `.env` file should be
    /// honored.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), but reads variables through the
    /// given lookup so tests can inject values without mutating the process
    /// environment.
    pub fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let require = |key: &'static str| {
            get(key)
                .filter(|v| !v.is_empty())
                .ok_or(SettingsError::MissingVar(key))
        };

        let database = DatabaseSettings {
            host: require("MYSQL_HOST")?,
            user: require("MYSQL_USER")?,
            password: require("MYSQL_PASSWORD")?,
            name: require("MYSQL_DB")?,
        };

        let port = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| SettingsError::Invalid {
                key: "PORT",
                value: raw,
            })?,
            None => 5000,
        };

        let debug = get("APP_DEBUG").as_deref() == Some("1");

        Ok(Settings {
            debug,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database,
            template: TemplateSettings {
                dir: get("TEMPLATE_DIR").unwrap_or_else(|| "templates".to_string()),
                debug,
            },
        })
    }

    /// Assemble the sqlx connection URL for the configured database.
    pub fn database_url(&self) -> String {
        format!(
            "mysql://{}:{}@{}/{}",
            self.database.user, self.database.password, self.database.host, self.database.name
        )
    }
}
