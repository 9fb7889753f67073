use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache as MokaCache;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::errors::{CacheError, CacheResult};
use crate::store::pattern::GlobPattern;
use crate::store::traits::KeyValueStore;

#[derive(Debug, Clone)]
struct StoredEntry {
    payload: String,
    ttl: Duration,
    expires_at: Instant,
}

impl StoredEntry {
    fn remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at.checked_duration_since(now).filter(|d| !d.is_zero())
    }
}

/// 每个条目按写入时的过期时间失效
struct EntryExpiry;

impl Expiry<String, StoredEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// 内存存储实现（基于 Moka）
///
/// 行为与 Redis 存储一致：逐条过期、glob 枚举、可切换的连通状态。
/// 用于测试和本地开发，不是 Redis 前面的缓存层。
pub struct MemoryStore {
    cache: Arc<MokaCache<String, StoredEntry>>,
    connected: AtomicBool,
    calls: AtomicU64,
}

impl MemoryStore {
    pub fn new(max_capacity: u64) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryExpiry)
            .build();

        Self {
            cache: Arc::new(cache),
            connected: AtomicBool::new(true),
            calls: AtomicU64::new(0),
        }
    }

    /// 模拟连接断开或恢复
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// 已执行的存储操作次数（不含连通性检查）
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn begin_call(&self) -> CacheResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.is_connected() {
            Ok(())
        } else {
            Err(CacheError::Unavailable)
        }
    }

    async fn live_entry(&self, key: &str) -> Option<StoredEntry> {
        let entry = self.cache.get(key).await?;
        // Moka 的过期清理是惰性的，这里按时间再判断一次
        entry.remaining(Instant::now()).map(|_| entry)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.begin_call()?;
        Ok(self.live_entry(key).await.map(|entry| entry.payload))
    }

    async fn get_with_expiry(&self, key: &str) -> CacheResult<(Option<String>, Option<Duration>)> {
        self.begin_call()?;
        match self.live_entry(key).await {
            Some(entry) => {
                let remaining = entry.remaining(Instant::now());
                Ok((Some(entry.payload), remaining))
            }
            None => Ok((None, None)),
        }
    }

    async fn set(&self, key: &str, value: String, expiration: Duration) -> CacheResult<()> {
        self.begin_call()?;
        if expiration.is_zero() {
            return Err(CacheError::InvalidExpiration(expiration));
        }

        let entry = StoredEntry {
            payload: value,
            ttl: expiration,
            expires_at: Instant::now() + expiration,
        };
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        self.begin_call()?;
        let glob = GlobPattern::new(pattern)?;
        let now = Instant::now();

        let mut keys: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, entry)| entry.remaining(now).is_some() && glob.matches(key))
            .map(|(key, _)| key.to_string())
            .collect();
        // 哈希表迭代顺序不稳定，排序后作为"扫描顺序"
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MemoryStore::default();
        store
            .set("user:1", "\"alice\"".into(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(store.get("user:1").await.unwrap().as_deref(), Some("\"alice\""));
        assert_eq!(store.get("user:2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let store = MemoryStore::default();
        store
            .set("short", "1".into(), Duration::from_millis(30))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(store.get("short").await.unwrap(), None);
        assert!(store.keys("*").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_with_expiry_reports_remaining_ttl() {
        let store = MemoryStore::default();
        store
            .set("k", "v".into(), Duration::from_secs(30))
            .await
            .unwrap();

        let (value, ttl) = store.get_with_expiry("k").await.unwrap();
        assert_eq!(value.as_deref(), Some("v"));
        let ttl = ttl.unwrap();
        assert!(ttl <= Duration::from_secs(30));
        assert!(ttl > Duration::from_secs(25));

        assert_eq!(store.get_with_expiry("missing").await.unwrap(), (None, None));
    }

    #[tokio::test]
    async fn test_keys_filters_by_pattern() {
        let store = MemoryStore::default();
        for key in ["user:2", "user:1", "order:1"] {
            store.set(key, "0".into(), Duration::from_secs(60)).await.unwrap();
        }

        assert_eq!(store.keys("user:*").await.unwrap(), vec!["user:1", "user:2"]);
        assert_eq!(store.keys("*:1").await.unwrap(), vec!["order:1", "user:1"]);
    }

    #[tokio::test]
    async fn test_keys_with_empty_or_reversed_class() {
        let store = MemoryStore::default();
        for key in ["user:a", "user:m", "user:]"] {
            store.set(key, "0".into(), Duration::from_secs(60)).await.unwrap();
        }

        assert!(store.keys("user:[]").await.unwrap().is_empty());
        assert!(store.keys("user:[^]").await.unwrap().is_empty());
        assert_eq!(store.keys("user:[z-b]").await.unwrap(), vec!["user:m"]);
    }

    #[tokio::test]
    async fn test_disconnected_store_rejects_calls() {
        let store = MemoryStore::default();
        store.set_connected(false);

        assert!(matches!(store.get("k").await, Err(CacheError::Unavailable)));
        assert!(matches!(
            store.set("k", "v".into(), Duration::from_secs(1)).await,
            Err(CacheError::Unavailable)
        ));
        assert_eq!(store.call_count(), 2);

        store.set_connected(true);
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_zero_expiration_rejected() {
        let store = MemoryStore::default();
        let result = store.set("k", "v".into(), Duration::ZERO).await;
        assert!(matches!(result, Err(CacheError::InvalidExpiration(_))));
    }
}
