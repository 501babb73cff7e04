use std::env;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub cors_origins: Vec<String>,
    pub max_body_bytes: usize,
    pub max_concurrency: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 5000);
        let token_ttl_hours = parse_or("TOKEN_TTL_HOURS", 24);
        // 8 images of up to 5 MiB plus the text fields.
        let max_body_bytes = parse_or("MAX_BODY_BYTES", 48 * 1024 * 1024);
        let max_concurrency = parse_or("MAX_CONCURRENCY", 100);
        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| split_origins(&raw))
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:3001".to_string(),
                ]
            });

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            token_ttl_hours,
            cors_origins,
            max_body_bytes,
            max_concurrency,
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::split_origins;

    #[test]
    fn origins_are_trimmed_and_blank_entries_dropped() {
        let origins = split_origins(" http://a.test , ,http://b.test");
        assert_eq!(origins, vec!["http://a.test", "http://b.test"]);
    }
}
