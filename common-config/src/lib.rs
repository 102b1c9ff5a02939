use anyhow::{Context, Result};
use std::env;

/// Process-wide configuration, loaded once at startup. Every optional field
/// is defaulted here rather than scattered across call sites.
#[derive(Debug, Clone)]
pub struct ObservatoryConfig {
    pub database_url: String,
    pub proxy_url: Option<String>,
    pub proxy_username: Option<String>,
    pub proxy_password: Option<String>,
    pub category_tree_depth: u32,
    pub page_size: u32,
    pub degree_of_parallelism: usize,
    pub min_batch_size: usize,
    pub max_batch_size: usize,
    pub http_request_timeout_secs: u64,
    pub batch_timeout_secs: u64,
    pub retailer_run_timeout_secs: u64,
    pub metrics_port: Option<u16>,
}

impl ObservatoryConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let proxy_url = env::var("OBSERVATORY_PROXY_URL").ok();
        let proxy_username = env::var("OBSERVATORY_PROXY_USERNAME").ok();
        let proxy_password = env::var("OBSERVATORY_PROXY_PASSWORD").ok();

        let category_tree_depth = env_parse_or("VTEX_CATEGORY_TREE_DEPTH", 50);
        let page_size = env_parse_or("VTEX_PAGE_SIZE", 50);
        let degree_of_parallelism = env_parse_or("PROBE_DEGREE_OF_PARALLELISM", 8usize);
        let min_batch_size = env_parse_or("PROBE_MIN_BATCH_SIZE", 20usize);
        let max_batch_size = env_parse_or("PROBE_MAX_BATCH_SIZE", 50usize);
        let http_request_timeout_secs = env_parse_or("OBSERVATORY_HTTP_TIMEOUT_SECONDS", 90u64);
        let batch_timeout_secs = env_parse_or("OBSERVATORY_BATCH_TIMEOUT_SECONDS", 600u64);
        let retailer_run_timeout_secs =
            env_parse_or("OBSERVATORY_RETAILER_TIMEOUT_SECONDS", 21_600u64);
        let metrics_port = env::var("OBSERVATORY_METRICS_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok());

        Ok(Self {
            database_url,
            proxy_url,
            proxy_username,
            proxy_password,
            category_tree_depth,
            page_size,
            degree_of_parallelism: degree_of_parallelism.max(1),
            min_batch_size: min_batch_size.max(1),
            max_batch_size: max_batch_size.max(min_batch_size.max(1)),
            http_request_timeout_secs,
            batch_timeout_secs,
            retailer_run_timeout_secs,
            metrics_port,
        })
    }

    pub fn proxy_configured(&self) -> bool {
        self.proxy_url.is_some()
    }
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse::<T>().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_optional_vars_absent() {
        // SAFETY: test-only mutation of process env, not run concurrently with
        // other tests that read these specific keys.
        unsafe {
            env::set_var("DATABASE_URL", "postgres://localhost/test");
            env::remove_var("PROBE_DEGREE_OF_PARALLELISM");
            env::remove_var("PROBE_MIN_BATCH_SIZE");
            env::remove_var("PROBE_MAX_BATCH_SIZE");
        }
        let cfg = ObservatoryConfig::from_env().unwrap();
        assert_eq!(cfg.degree_of_parallelism, 8);
        assert_eq!(cfg.min_batch_size, 20);
        assert_eq!(cfg.max_batch_size, 50);
        assert_eq!(cfg.category_tree_depth, 50);
    }

    #[test]
    fn missing_database_url_fails_fast() {
        unsafe {
            env::remove_var("DATABASE_URL");
        }
        assert!(ObservatoryConfig::from_env().is_err());
    }
}
