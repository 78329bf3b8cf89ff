use serde::Deserialize;

/// Engine tuning knobs. Every field has a serde default so a bare config
/// file (or none at all) yields the production settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub bulk: BulkConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Horizon, in days, for the "expires soon" bucket.
    #[serde(default = "default_expiring_soon_days")]
    pub expiring_soon_days: u32,

    /// Deadline for individual store calls inside bulk items.
    #[serde(default = "default_store_timeout")]
    pub store_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkConfig {
    /// Items dispatched concurrently per batch. The next batch starts only
    /// after every item of the previous one has settled.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Per-operation request ceilings within one sliding window.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_window")]
    pub window_secs: u64,

    #[serde(default = "default_create_limit")]
    pub create: u32,

    #[serde(default = "default_update_limit")]
    pub update: u32,

    #[serde(default = "default_delete_limit")]
    pub delete: u32,

    #[serde(default = "default_list_limit")]
    pub list: u32,

    /// Ceiling for operations without a dedicated column (bulk runs).
    #[serde(default = "default_fallback_limit")]
    pub fallback: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// Entry cap; the oldest entry is evicted when full.
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

fn default_batch_size() -> usize {
    10
}
fn default_window() -> u64 {
    60
}
fn default_create_limit() -> u32 {
    10
}
fn default_update_limit() -> u32 {
    30
}
fn default_delete_limit() -> u32 {
    5
}
fn default_list_limit() -> u32 {
    100
}
fn default_fallback_limit() -> u32 {
    60
}
fn default_cache_ttl() -> u64 {
    300
}
fn default_cache_max_entries() -> usize {
    1000
}
fn default_expiring_soon_days() -> u32 {
    7
}
fn default_store_timeout() -> u64 {
    10
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window(),
            create: default_create_limit(),
            update: default_update_limit(),
            delete: default_delete_limit(),
            list: default_list_limit(),
            fallback: default_fallback_limit(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
            max_entries: default_cache_max_entries(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bulk: BulkConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            expiring_soon_days: default_expiring_soon_days(),
            store_timeout_secs: default_store_timeout(),
        }
    }
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl EngineConfig {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/engine.toml - base configuration (optional)
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with BAE__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/engine").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("BAE").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.bulk.batch_size == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "bulk.batch_size cannot be 0".to_string(),
            ));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "rate_limit.window_secs cannot be 0".to_string(),
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "cache.max_entries cannot be 0".to_string(),
            ));
        }
        if self.expiring_soon_days == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "expiring_soon_days cannot be 0".to_string(),
            ));
        }
        Ok(())
    }

    /// The "expires soon" horizon as a chrono duration.
    pub fn expiring_horizon(&self) -> chrono::Duration {
        chrono::Duration::days(self.expiring_soon_days as i64)
    }
}
