use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use super::{AppConfig, CacheConfig, RedisConfig};
use crate::errors::CacheError;

/// 未指定路径时使用的配置文件
const DEFAULT_CONFIG_FILE: &str = "keycache.toml";

impl AppConfig {
    /// 从文件加载配置,支持环境变量覆盖
    ///
    /// # 参数
    /// * `config_path` - 可选的配置文件路径
    ///   - `Some(path)`: 使用指定文件（不存在则报错）
    ///   - `None`: 使用默认 "keycache.toml"（不存在则使用默认值）
    pub fn load(config_path: Option<&str>) -> Result<Self, CacheError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => {
                tracing::warn!(
                    "Config file {} not found, using defaults",
                    DEFAULT_CONFIG_FILE
                );
                Self::default()
            }
        };
        config.override_with_env();
        Ok(config)
    }

    /// 从 TOML 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            CacheError::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml_str(&content)
    }

    /// 从 TOML 文本解析配置
    pub fn from_toml_str(content: &str) -> Result<Self, CacheError> {
        toml::from_str(content)
            .map_err(|e| CacheError::Config(format!("Failed to parse config: {}", e)))
    }

    /// 用环境变量覆盖配置
    pub fn override_with_env(&mut self) {
        self.override_with(|name| env::var(name).ok());
    }

    /// 用任意键值来源覆盖配置
    ///
    /// 无法解析的数值会被忽略并记录错误日志
    pub fn override_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Redis 配置
        if let Some(url) = lookup("REDIS_URL") {
            self.redis.url = url;
        }
        override_parsed(&lookup, "REDIS_CONNECT_TIMEOUT_MS", &mut self.redis.connect_timeout_ms);
        override_parsed(&lookup, "REDIS_RESPONSE_TIMEOUT_MS", &mut self.redis.response_timeout_ms);
        override_parsed(
            &lookup,
            "REDIS_HEALTH_CHECK_INTERVAL",
            &mut self.redis.health_check_interval_secs,
        );
        override_parsed(&lookup, "REDIS_SCAN_COUNT", &mut self.redis.scan_count);

        // 缓存配置
        override_parsed(
            &lookup,
            "CACHE_DEFAULT_EXPIRATION",
            &mut self.cache.default_expiration_secs,
        );

        // 日志配置
        if let Some(level) = lookup("RUST_LOG") {
            self.log.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.log.format = format;
        }
        if let Some(file) = lookup("LOG_FILE") {
            self.log.file = Some(file);
        }
        if let Some(enable) = lookup("LOG_ENABLE_ROTATION") {
            self.log.enable_rotation = enable == "true" || enable == "1";
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = AppConfig::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("# failed to render sample config: {}", e))
    }

    /// 保存当前配置到 TOML 文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CacheError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CacheError::Config(format!("Failed to render config: {}", e)))?;

        // 如果需要,创建父目录
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)
                .map_err(|e| CacheError::Config(format!("Failed to create directory: {}", e)))?;
        }

        fs::write(path, content)
            .map_err(|e| CacheError::Config(format!("Failed to write config: {}", e)))
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), CacheError> {
        if !self.redis.url.starts_with("redis://") && !self.redis.url.starts_with("rediss://") {
            return Err(CacheError::Config(format!(
                "Redis URL must start with redis:// or rediss://, got {}",
                self.redis.url
            )));
        }

        if self.redis.scan_count == 0 {
            return Err(CacheError::Config("Redis scan count must be positive".into()));
        }

        if self.redis.health_check_interval_secs == 0 {
            return Err(CacheError::Config(
                "Redis health check interval must be positive".into(),
            ));
        }

        if self.cache.default_expiration_secs == 0 {
            return Err(CacheError::Config(
                "Default expiration must be positive".into(),
            ));
        }

        Ok(())
    }
}

impl RedisConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }
}

impl CacheConfig {
    pub fn default_expiration(&self) -> Duration {
        Duration::from_secs(self.default_expiration_secs)
    }
}

fn override_parsed<F, V>(lookup: &F, name: &str, target: &mut V)
where
    F: Fn(&str) -> Option<String>,
    V: std::str::FromStr,
{
    if let Some(raw) = lookup(name) {
        match raw.parse() {
            Ok(value) => *target = value,
            Err(_) => tracing::error!("Invalid {}: {}", name, raw),
        }
    }
}
