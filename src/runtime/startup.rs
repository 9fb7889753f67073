use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing_appender::non_blocking::WorkerGuard;

use crate::cache::{KeyMapper, TypedCache};
use crate::config::AppConfig;
use crate::errors::CacheError;
use crate::store::{KeyValueStore, RedisStore};
use crate::system::init_logging;

/// 缓存运行上下文
///
/// 持有共享的存储连接和连通性探测任务，上下文释放时探测任务随之停止。
pub struct CacheContext {
    store: Arc<dyn KeyValueStore>,
    config: AppConfig,
    health_check: Option<JoinHandle<()>>,
    _log_guard: Option<WorkerGuard>,
}

impl CacheContext {
    /// 使用外部提供的存储构建上下文（不初始化日志，不启动探测）
    pub fn with_store(store: Arc<dyn KeyValueStore>, config: AppConfig) -> Self {
        Self {
            store,
            config,
            health_check: None,
            _log_guard: None,
        }
    }

    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        self.store.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 创建一个使用配置默认过期时间的类型化缓存
    pub fn cache<T, M>(&self, mapper: M) -> TypedCache<T, M>
    where
        T: Serialize + DeserializeOwned,
        M: KeyMapper,
    {
        TypedCache::new(self.store.clone(), mapper)
            .with_default_expiration(self.config.cache.default_expiration())
    }
}

impl Drop for CacheContext {
    fn drop(&mut self) {
        if let Some(handle) = self.health_check.take() {
            handle.abort();
        }
    }
}

/// 初始化缓存系统
pub async fn prepare_cache_context(config: AppConfig) -> Result<CacheContext, CacheError> {
    // 1. 初始化日志（宿主程序已安装 subscriber 时沿用宿主的）
    let log_guard = match init_logging(&config.log) {
        Ok(guard) => guard,
        Err(e) => {
            tracing::warn!("{}", e.format_simple());
            None
        }
    };
    tracing::info!("keycache v{} starting...", env!("CARGO_PKG_VERSION"));

    // 2. 验证配置
    config.validate()?;

    // 3. 连接 Redis
    tracing::info!("Connecting to Redis: {}", config.redis.url);
    let store = Arc::new(RedisStore::connect(&config.redis).await?);
    tracing::info!("Redis connected");

    // 4. 启动连通性探测
    let health_check = store.spawn_health_check(config.redis.health_check_interval());
    tracing::info!(
        "Redis health check every {:?}",
        config.redis.health_check_interval()
    );

    Ok(CacheContext {
        store,
        config,
        health_check: Some(health_check),
        _log_guard: log_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PrefixKeyMapper;
    use crate::store::MemoryStore;
    use std::time::Duration;

    #[tokio::test]
    async fn test_context_cache_uses_configured_expiration() {
        let mut config = AppConfig::default();
        config.cache.default_expiration_secs = 90;
        let context = CacheContext::with_store(Arc::new(MemoryStore::default()), config);

        let cache: TypedCache<String, PrefixKeyMapper<u32>> =
            context.cache(PrefixKeyMapper::new("session"));
        assert_eq!(cache.default_expiration(), Duration::from_secs(90));

        cache.set(&1, &"token".to_string(), None).await.unwrap();
        let (value, remaining) = cache.get_first_or_default_with_expiry(&1).await.unwrap();
        assert_eq!(value.as_deref(), Some("token"));
        assert!(remaining.unwrap() <= Duration::from_secs(90));
    }

    #[tokio::test]
    async fn test_caches_share_the_context_store() {
        let store = Arc::new(MemoryStore::default());
        let context = CacheContext::with_store(store, AppConfig::default());
        let writer: TypedCache<u32, PrefixKeyMapper<u32>> =
            context.cache(PrefixKeyMapper::new("n"));
        let reader: TypedCache<u32, PrefixKeyMapper<u32>> =
            context.cache(PrefixKeyMapper::new("n"));

        writer.set(&1, &10, None).await.unwrap();
        assert_eq!(reader.get_first_or_default(&1).await.unwrap(), Some(10));
        assert!(context.store().is_connected());
    }

    #[tokio::test]
    async fn test_prepare_rejects_invalid_config() {
        let mut config = AppConfig::default();
        config.cache.default_expiration_secs = 0;

        let result = prepare_cache_context(config).await;
        assert!(matches!(result, Err(CacheError::Config(_))));
    }
}
