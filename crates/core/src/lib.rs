pub mod cache;
pub mod domain;
pub mod ingest;
pub mod rank;
pub mod resolve;
pub mod scoring;
pub mod service;

pub mod config {
    use crate::ingest::provider::RetryPolicy;
    use crate::rank::RankOptions;
    use anyhow::Context;
    use std::time::Duration;

    pub const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;
    pub const DEFAULT_FETCH_MAX_ATTEMPTS: u32 = 3;
    pub const DEFAULT_FETCH_BACKOFF_MS: u64 = 1000;
    pub const DEFAULT_HISTORY_MONTHS: u32 = 12;
    pub const DEFAULT_SCAN_LIMIT: usize = 20;
    pub const DEFAULT_SCAN_TOP: usize = 5;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub sentry_dsn: Option<String>,
        pub membership_url: Option<String>,
        pub cache_ttl_secs: u64,
        pub fetch_max_attempts: u32,
        pub fetch_backoff_ms: u64,
        pub history_months: u32,
        pub scan_limit: usize,
        pub scan_top: usize,
        pub scan_delay_ms: u64,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                sentry_dsn: None,
                membership_url: None,
                cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
                fetch_max_attempts: DEFAULT_FETCH_MAX_ATTEMPTS,
                fetch_backoff_ms: DEFAULT_FETCH_BACKOFF_MS,
                history_months: DEFAULT_HISTORY_MONTHS,
                scan_limit: DEFAULT_SCAN_LIMIT,
                scan_top: DEFAULT_SCAN_TOP,
                scan_delay_ms: 0,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        /// Builds settings from any key/value source. Unset or blank keys keep their defaults.
        pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
            let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
            let mut out = Self {
                sentry_dsn: get("SENTRY_DSN"),
                membership_url: get("MEMBERSHIP_URL"),
                ..Self::default()
            };

            if let Some(v) = get("CACHE_TTL_SECS") {
                out.cache_ttl_secs = parse_key("CACHE_TTL_SECS", &v)?;
            }
            if let Some(v) = get("FETCH_MAX_ATTEMPTS") {
                out.fetch_max_attempts = parse_key("FETCH_MAX_ATTEMPTS", &v)?;
            }
            if let Some(v) = get("FETCH_BACKOFF_MS") {
                out.fetch_backoff_ms = parse_key("FETCH_BACKOFF_MS", &v)?;
            }
            if let Some(v) = get("HISTORY_MONTHS") {
                out.history_months = parse_key("HISTORY_MONTHS", &v)?;
            }
            if let Some(v) = get("SCAN_LIMIT") {
                out.scan_limit = parse_key("SCAN_LIMIT", &v)?;
            }
            if let Some(v) = get("SCAN_TOP") {
                out.scan_top = parse_key("SCAN_TOP", &v)?;
            }
            if let Some(v) = get("SCAN_DELAY_MS") {
                out.scan_delay_ms = parse_key("SCAN_DELAY_MS", &v)?;
            }

            anyhow::ensure!(
                out.fetch_max_attempts >= 1,
                "FETCH_MAX_ATTEMPTS must be >= 1 (got {})",
                out.fetch_max_attempts
            );
            anyhow::ensure!(
                out.scan_top >= 1,
                "SCAN_TOP must be >= 1 (got {})",
                out.scan_top
            );

            Ok(out)
        }

        pub fn cache_ttl(&self) -> Duration {
            Duration::from_secs(self.cache_ttl_secs)
        }

        pub fn retry_policy(&self) -> RetryPolicy {
            RetryPolicy {
                max_attempts: self.fetch_max_attempts,
                backoff: Duration::from_millis(self.fetch_backoff_ms),
            }
        }

        pub fn rank_options(&self) -> RankOptions {
            RankOptions {
                limit: Some(self.scan_limit),
                top: self.scan_top,
                delay: Duration::from_millis(self.scan_delay_ms),
            }
        }
    }

    fn parse_key<T>(key: &str, value: &str) -> anyhow::Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} is not a valid number: {value}"))
    }

}
