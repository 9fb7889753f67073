use async_trait::async_trait;
use std::time::Duration;

use crate::errors::CacheResult;

/// 键值存储特征
///
/// 缓存层只依赖这五个操作。实现方负责连接生命周期，
/// 并保证同一实例可被多个调用方并发使用。
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 当前是否可达（不发起网络请求）
    fn is_connected(&self) -> bool;

    /// 读取原始文本，键不存在返回 `None`
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// 读取原始文本及剩余存活时间
    ///
    /// 键不存在时为 `(None, None)`；键存在但没有过期时间时剩余时间为 `None`
    async fn get_with_expiry(&self, key: &str) -> CacheResult<(Option<String>, Option<Duration>)>;

    /// 写入文本并设置过期时间
    async fn set(&self, key: &str, value: String, expiration: Duration) -> CacheResult<()>;

    /// 按 glob 模式枚举键，保持扫描顺序且不重复
    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>>;
}
