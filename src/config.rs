use anyhow::Context;
use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    /// PostgreSQL connection string. Without it the service runs on the memory store.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub nats_url: Option<String>,
    pub port: u16,
    pub page_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self { database_url: None, max_connections: 10, nats_url: None, port: 8083, page_size: 6 }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            max_connections: parse_var("DB_MAX_CONNECTIONS")?.unwrap_or(defaults.max_connections),
            nats_url: env::var("NATS_URL").ok().filter(|s| !s.is_empty()),
            port: parse_var("PORT")?.unwrap_or(defaults.port),
            page_size: parse_var::<u32>("PAGE_SIZE")?.unwrap_or(defaults.page_size).max(1),
        })
    }
}

fn parse_var<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map(Some).with_context(|| format!("{name} is not valid: {raw:?}")),
        Err(_) => Ok(None),
    }
}
