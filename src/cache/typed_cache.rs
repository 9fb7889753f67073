use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::key_mapper::KeyMapper;
use crate::errors::{CacheError, CacheResult};
use crate::store::KeyValueStore;

/// 未指定时的默认过期时间
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(60 * 60);

/// 类型化缓存（JSON 序列化，读写直通存储）
///
/// 不在本地保留任何值：每次读都访问存储。
/// 每个操作开始前检查存储连通性，不可达时返回 `CacheError::Unavailable`
/// 且不发起任何存储调用；需要"不可达即未命中"语义时配合 `FailSoft` 使用。
pub struct TypedCache<T, M> {
    store: Arc<dyn KeyValueStore>,
    mapper: M,
    default_expiration: Duration,
    _value: PhantomData<fn() -> T>,
}

impl<T, M: Clone> Clone for TypedCache<T, M> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            mapper: self.mapper.clone(),
            default_expiration: self.default_expiration,
            _value: PhantomData,
        }
    }
}

impl<T, M> TypedCache<T, M>
where
    T: Serialize + DeserializeOwned,
    M: KeyMapper,
{
    pub fn new(store: Arc<dyn KeyValueStore>, mapper: M) -> Self {
        Self {
            store,
            mapper,
            default_expiration: DEFAULT_EXPIRATION,
            _value: PhantomData,
        }
    }

    pub fn with_default_expiration(mut self, expiration: Duration) -> Self {
        self.default_expiration = expiration;
        self
    }

    pub fn default_expiration(&self) -> Duration {
        self.default_expiration
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_connected()
    }

    /// 读取单个值
    pub async fn get_first_or_default(&self, key: &M::Key) -> CacheResult<Option<T>> {
        self.fetch(key).await
    }

    /// 读取单个值及其剩余存活时间
    ///
    /// 值不存在时剩余时间同样为 `None`
    pub async fn get_first_or_default_with_expiry(
        &self,
        key: &M::Key,
    ) -> CacheResult<(Option<T>, Option<Duration>)> {
        let storage_key = self.mapper.storage_key(key);
        self.ensure_connected(&storage_key)?;

        match self.store.get_with_expiry(&storage_key).await? {
            (Some(payload), expiry) => {
                tracing::debug!("Cache hit: {} (ttl: {:?})", storage_key, expiry);
                Ok((Some(serde_json::from_str(&payload)?), expiry))
            }
            (None, _) => {
                tracing::debug!("Cache miss: {}", storage_key);
                Ok((None, None))
            }
        }
    }

    /// 读取以 JSON 数组存储的列表
    pub async fn get_list(&self, key: &M::Key) -> CacheResult<Option<Vec<T>>> {
        self.fetch(key).await
    }

    /// 按 glob 模式批量读取
    ///
    /// 扫描与读取之间被删除或过期的键直接跳过。
    /// 多个存储键映射到同一逻辑键时保留先扫描到的那个。
    ///
    /// 存储不可达时返回 `Unavailable`，降级后为 `None`，与"没有匹配"的空表区分。
    pub async fn get_multiple_from_pattern(
        &self,
        pattern: &str,
    ) -> CacheResult<Option<HashMap<M::Key, T>>>
    where
        M::Key: Eq + Hash,
    {
        self.ensure_connected(pattern)?;

        let storage_keys = self.store.keys(pattern).await?;
        let mut result = HashMap::with_capacity(storage_keys.len());
        for storage_key in storage_keys {
            let Some(payload) = self.store.get(&storage_key).await? else {
                tracing::debug!("Key vanished after scan: {}", storage_key);
                continue;
            };
            let value: T = serde_json::from_str(&payload)?;
            result
                .entry(self.mapper.logical_key(&storage_key)?)
                .or_insert(value);
        }

        tracing::debug!("Pattern {} resolved {} entries", pattern, result.len());
        Ok(Some(result))
    }

    /// 按 glob 模式列出逻辑键（保持扫描顺序，不读取值）
    pub async fn get_keys_that_have_values(
        &self,
        pattern: &str,
    ) -> CacheResult<Option<Vec<M::Key>>> {
        self.ensure_connected(pattern)?;

        self.store
            .keys(pattern)
            .await?
            .iter()
            .map(|storage_key| self.mapper.logical_key(storage_key))
            .collect::<CacheResult<Vec<_>>>()
            .map(Some)
    }

    /// 写入单个值，`expiration` 为空时使用默认过期时间
    pub async fn set(
        &self,
        key: &M::Key,
        item: &T,
        expiration: Option<Duration>,
    ) -> CacheResult<()> {
        self.write(key, item, expiration).await
    }

    /// 以 JSON 数组写入列表
    pub async fn set_list(
        &self,
        key: &M::Key,
        items: &[T],
        expiration: Option<Duration>,
    ) -> CacheResult<()> {
        self.write(key, items, expiration).await
    }

    async fn fetch<V: DeserializeOwned>(&self, key: &M::Key) -> CacheResult<Option<V>> {
        let storage_key = self.mapper.storage_key(key);
        self.ensure_connected(&storage_key)?;

        match self.store.get(&storage_key).await? {
            Some(payload) => {
                tracing::debug!("Cache hit: {}", storage_key);
                Ok(Some(serde_json::from_str(&payload)?))
            }
            None => {
                tracing::debug!("Cache miss: {}", storage_key);
                Ok(None)
            }
        }
    }

    async fn write<V: Serialize + ?Sized>(
        &self,
        key: &M::Key,
        value: &V,
        expiration: Option<Duration>,
    ) -> CacheResult<()> {
        let storage_key = self.mapper.storage_key(key);
        let expiration = expiration.unwrap_or(self.default_expiration);
        if expiration.is_zero() {
            return Err(CacheError::InvalidExpiration(expiration));
        }
        self.ensure_connected(&storage_key)?;

        let payload = serde_json::to_string(value)?;
        self.store.set(&storage_key, payload, expiration).await?;
        tracing::debug!("Cache set: {} (ttl: {:?})", storage_key, expiration);
        Ok(())
    }

    fn ensure_connected(&self, target: &str) -> CacheResult<()> {
        if self.store.is_connected() {
            Ok(())
        } else {
            tracing::warn!("Store unavailable, skipping: {}", target);
            Err(CacheError::Unavailable)
        }
    }
}
