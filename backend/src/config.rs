use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::{env, net::SocketAddr, str::FromStr};

const DEFAULT_MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub model_path: String,
    pub features_path: String,
    pub max_request_body_bytes: usize,
    pub stats_window_hours: i64,
    pub history_retention_days: i64,
    pub cors_allow_origins: Vec<String>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:./prediction_history.db?mode=rwc".to_string());

        let bind_addr_raw = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
        let bind_addr = SocketAddr::from_str(&bind_addr_raw)
            .map_err(|_| anyhow!("Invalid BIND_ADDR value: {}", bind_addr_raw))?;

        let model_path = env::var("MODEL_PATH").unwrap_or_else(|_| "models/model.json".to_string());
        let features_path = env::var("FEATURES_PATH")
            .unwrap_or_else(|_| "models/params/features.yaml".to_string());

        let max_request_body_bytes = parse_env("MAX_REQUEST_BODY_BYTES")
            .unwrap_or(DEFAULT_MAX_REQUEST_BODY_BYTES)
            .max(1);

        let stats_window_hours = parse_env::<i64>("STATS_WINDOW_HOURS")
            .unwrap_or(24)
            .max(1);

        let history_retention_days = parse_env::<i64>("HISTORY_RETENTION_DAYS")
            .unwrap_or(90)
            .max(0);

        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_else(|_| vec!["*".to_string()]);

        Ok(Config {
            database_url,
            bind_addr,
            model_path,
            features_path,
            max_request_body_bytes,
            stats_window_hours,
            history_retention_days,
            cors_allow_origins,
        })
    }

    /// Returns `None` when purging is disabled.
    pub fn history_retention(&self) -> Option<chrono::Duration> {
        if self.history_retention_days == 0 {
            None
        } else {
            Some(chrono::Duration::days(self.history_retention_days))
        }
    }

    pub fn stats_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.stats_window_hours)
    }
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse().ok())
}

fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect();
    if origins.is_empty() {
        vec!["*".to_string()]
    } else {
        origins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            database_url: "sqlite::memory:".into(),
            bind_addr: "127.0.0.1:8000".parse().unwrap(),
            model_path: "models/model.json".into(),
            features_path: "models/params/features.yaml".into(),
            max_request_body_bytes: 1024,
            stats_window_hours: 24,
            history_retention_days: 30,
            cors_allow_origins: vec!["*".into()],
        }
    }

    #[test]
    fn history_retention_zero_disables_purge() {
        let mut config = sample();
        config.history_retention_days = 0;
        assert!(config.history_retention().is_none());
    }

    #[test]
    fn history_retention_uses_days() {
        let config = sample();
        assert_eq!(config.history_retention(), Some(chrono::Duration::days(30)));
    }

    #[test]
    fn parse_origins_trims_and_defaults() {
        assert_eq!(
            parse_origins(" http://a.test , http://b.test "),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert_eq!(parse_origins(" , "), vec!["*".to_string()]);
    }
}
