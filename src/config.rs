use crate::model::ValidationRules;
use anyhow::{anyhow, bail, Result};
use axum::http::{HeaderValue, Method};
use std::net::ToSocketAddrs;
use std::str::FromStr;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use url::Url;

const DEFAULT_PORT: &str = "5000";
const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/linkmanager";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(anyhow!("unknown storage backend: {}", other)),
        }
    }
}

/// Who may call the API from a browser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CorsPolicy {
    /// Any origin, without credentials.
    AnyOrigin,
    /// Only these origins, with credentials.
    Origins(Vec<String>),
}

impl CorsPolicy {
    pub fn parse(value: &str) -> Result<Self> {
        let entries: Vec<&str> = value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .collect();
        if entries.is_empty() || entries.contains(&"*") {
            return Ok(CorsPolicy::AnyOrigin);
        }
        let mut origins = Vec::with_capacity(entries.len());
        for entry in entries {
            let url = Url::parse(entry).map_err(|err| anyhow!("invalid origin {}: {}", entry, err))?;
            if url.host().is_none() {
                bail!("invalid origin {}: missing host", entry);
            }
            origins.push(url.origin().ascii_serialization());
        }
        Ok(CorsPolicy::Origins(origins))
    }

    pub fn layer(&self) -> CorsLayer {
        match self {
            CorsPolicy::AnyOrigin => CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
            CorsPolicy::Origins(origins) => {
                let origins: Vec<HeaderValue> = origins
                    .iter()
                    .filter_map(|origin| HeaderValue::from_str(origin).ok())
                    .collect();
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods([
                        Method::GET,
                        Method::POST,
                        Method::PUT,
                        Method::DELETE,
                        Method::OPTIONS,
                    ])
                    .allow_headers([
                        axum::http::header::CONTENT_TYPE,
                        axum::http::header::AUTHORIZATION,
                    ])
                    .allow_credentials(true)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_address: String,
    pub storage_backend: StorageBackend,
    pub database_url: String,
    pub database_max_connections: u32,
    pub store_timeout_ms: u64,
    pub cors: CorsPolicy,
    pub validation: ValidationRules,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let server_address = match lookup("SERVER_ADDRESS") {
            Some(address) => address,
            None => format!(
                "0.0.0.0:{}",
                lookup("PORT").unwrap_or_else(|| DEFAULT_PORT.to_string())
            ),
        };
        server_address
            .to_socket_addrs()
            .map_err(|err| anyhow!("invalid SERVER_ADDRESS {}: {}", server_address, err))?;

        let store_timeout_ms = parse_or(&lookup, "STORE_TIMEOUT_MS", "5000")?;
        if store_timeout_ms == 0 {
            bail!("STORE_TIMEOUT_MS must be greater than zero");
        }

        Ok(Self {
            server_address,
            storage_backend: parse_or(&lookup, "STORAGE_BACKEND", "postgres")?,
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", "20")?,
            store_timeout_ms,
            cors: CorsPolicy::parse(&lookup("CORS_ALLOWED_ORIGINS").unwrap_or_default())?,
            validation: ValidationRules {
                link_description_required: parse_or(&lookup, "LINK_DESCRIPTION_REQUIRED", "false")?,
            },
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = lookup(key).unwrap_or_else(|| default.to_string());
    value
        .trim()
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.server_address, "0.0.0.0:5000");
        assert_eq!(config.storage_backend, StorageBackend::Postgres);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.database_max_connections, 20);
        assert_eq!(config.store_timeout_ms, 5000);
        assert_eq!(config.cors, CorsPolicy::AnyOrigin);
        assert!(!config.validation.link_description_required);
    }

    #[test]
    fn port_fills_in_missing_address() {
        let from_port = config(&[("PORT", "8081")]).unwrap();
        assert_eq!(from_port.server_address, "0.0.0.0:8081");

        let explicit = config(&[("PORT", "8081"), ("SERVER_ADDRESS", "127.0.0.1:9000")]).unwrap();
        assert_eq!(explicit.server_address, "127.0.0.1:9000");
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("STORAGE_BACKEND", "Memory"),
            ("LINK_DESCRIPTION_REQUIRED", "true"),
            ("CORS_ALLOWED_ORIGINS", "https://links.example.com/, http://localhost:5173"),
        ])
        .unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert!(config.validation.link_description_required);
        assert_eq!(
            config.cors,
            CorsPolicy::Origins(vec![
                "https://links.example.com".to_string(),
                "http://localhost:5173".to_string(),
            ])
        );
    }

    #[test]
    fn host_names_are_accepted_as_address() {
        let cfg = config(&[("SERVER_ADDRESS", "localhost:5000")]).unwrap();
        assert_eq!(cfg.server_address, "localhost:5000");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("SERVER_ADDRESS", "nowhere")]).is_err());
        assert!(config(&[("STORAGE_BACKEND", "mongo")]).is_err());
        assert!(config(&[("STORE_TIMEOUT_MS", "soon")]).is_err());
        assert!(config(&[("STORE_TIMEOUT_MS", "0")]).is_err());
        assert!(config(&[("LINK_DESCRIPTION_REQUIRED", "yes")]).is_err());
        assert!(config(&[("CORS_ALLOWED_ORIGINS", "not an origin")]).is_err());
    }

    #[test]
    fn wildcard_origin_means_any() {
        assert_eq!(CorsPolicy::parse("*").unwrap(), CorsPolicy::AnyOrigin);
        assert_eq!(CorsPolicy::parse(" , ").unwrap(), CorsPolicy::AnyOrigin);
    }
}
