use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::cache::key_mapper::KeyMapper;
use crate::cache::typed_cache::TypedCache;
use crate::errors::CacheResult;

/// 缓存特征
///
/// 单值与列表读写的最小接口，便于以 `Arc<dyn Cache<T, K>>` 注入。
/// 模式扫描等扩展操作见 `TypedCache`。
#[async_trait]
pub trait Cache<T, K>: Send + Sync {
    /// 获取缓存值
    async fn get_first_or_default(&self, key: &K) -> CacheResult<Option<T>>;

    /// 获取缓存列表
    async fn get_list(&self, key: &K) -> CacheResult<Option<Vec<T>>>;

    /// 设置缓存值
    async fn set(&self, key: &K, item: &T, expiration: Option<Duration>) -> CacheResult<()>;

    /// 设置缓存列表
    async fn set_list(&self, key: &K, items: &[T], expiration: Option<Duration>) -> CacheResult<()>;
}

#[async_trait]
impl<T, M> Cache<T, M::Key> for TypedCache<T, M>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
    M: KeyMapper + 'static,
{
    async fn get_first_or_default(&self, key: &M::Key) -> CacheResult<Option<T>> {
        self.get_first_or_default(key).await
    }

    async fn get_list(&self, key: &M::Key) -> CacheResult<Option<Vec<T>>> {
        self.get_list(key).await
    }

    async fn set(&self, key: &M::Key, item: &T, expiration: Option<Duration>) -> CacheResult<()> {
        self.set(key, item, expiration).await
    }

    async fn set_list(
        &self,
        key: &M::Key,
        items: &[T],
        expiration: Option<Duration>,
    ) -> CacheResult<()> {
        self.set_list(key, items, expiration).await
    }
}
