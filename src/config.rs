use std::str::FromStr;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without one the in-memory store is used.
    pub database_url: Option<String>,
    /// Force the in-memory store even when a database is configured.
    pub use_mock_db: bool,
    pub db_max_connections: u32,
    pub port: u16,
    pub frontend_url: String,
    pub schedule_runner_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: None,
            use_mock_db: false,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            port: DEFAULT_PORT,
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            schedule_runner_enabled: true,
        }
    }
}

impl Config {
    pub fn init() -> Config {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup (the process environment in
    /// production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Config {
        let defaults = Config::default();

        let database_url = lookup("DATABASE_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        Config {
            database_url,
            use_mock_db: lookup("USE_MOCK_DB").is_some_and(|v| parse_flag(&v)),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", &lookup, defaults.db_max_connections),
            port: parse_or("PORT", &lookup, defaults.port),
            frontend_url: lookup("FRONTEND_URL").unwrap_or(defaults.frontend_url),
            schedule_runner_enabled: lookup("SCHEDULE_RUNNER_ENABLED")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.schedule_runner_enabled),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(
    key: &str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: T,
) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, %default, "Invalid config value, using default");
            default
        }),
    }
}
