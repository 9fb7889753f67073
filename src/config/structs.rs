use serde::{Deserialize, Serialize};

/// 应用程序配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Redis 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// 建立连接超时（毫秒）
    #[serde(default = "default_redis_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// 单条命令响应超时（毫秒）
    #[serde(default = "default_redis_response_timeout_ms")]
    pub response_timeout_ms: u64,
    /// 连通性探测间隔（秒）
    #[serde(default = "default_redis_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
    /// SCAN 每批建议返回数量
    #[serde(default = "default_redis_scan_count")]
    pub scan_count: usize,
}

/// 缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// 默认过期时间（秒）
    #[serde(default = "default_cache_default_expiration_secs")]
    pub default_expiration_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            connect_timeout_ms: default_redis_connect_timeout_ms(),
            response_timeout_ms: default_redis_response_timeout_ms(),
            health_check_interval_secs: default_redis_health_check_interval_secs(),
            scan_count: default_redis_scan_count(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_expiration_secs: default_cache_default_expiration_secs(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            enable_rotation: default_enable_rotation(),
        }
    }
}

// ============ Default Functions ============

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_redis_connect_timeout_ms() -> u64 {
    5000
}

fn default_redis_response_timeout_ms() -> u64 {
    2000
}

fn default_redis_health_check_interval_secs() -> u64 {
    5
}

fn default_redis_scan_count() -> usize {
    250
}

fn default_cache_default_expiration_secs() -> u64 {
    3600 // 1 hour
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_enable_rotation() -> bool {
    false
}
