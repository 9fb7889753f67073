use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client, RedisResult};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::RedisConfig;
use crate::errors::{CacheError, CacheResult, is_transport_error};
use crate::store::traits::KeyValueStore;

/// Redis 存储实现
///
/// `ConnectionManager` 是多路复用连接，克隆开销很小，每个命令各持一份克隆，
/// 不需要额外加锁。连通状态由命令结果和定时 PING 共同维护。
pub struct RedisStore {
    conn: ConnectionManager,
    connectivity: Connectivity,
    scan_count: usize,
}

/// 连通状态
///
/// 断开后每隔 `retry_after` 放行一次命令，命令成功即恢复，
/// 所以没有后台 PING 时存储也不会一直停在断开状态。
#[derive(Debug)]
struct Connectivity {
    connected: AtomicBool,
    last_failure: Mutex<Option<Instant>>,
    retry_after: Duration,
}

impl Connectivity {
    fn new(retry_after: Duration) -> Self {
        Self {
            connected: AtomicBool::new(true),
            last_failure: Mutex::new(None),
            retry_after,
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// 已连通，或距上次失败已超过重试间隔
    fn should_attempt(&self, now: Instant) -> bool {
        if self.is_connected() {
            return true;
        }
        match *self.last_failure.lock().unwrap_or_else(|e| e.into_inner()) {
            Some(failed_at) => now.saturating_duration_since(failed_at) >= self.retry_after,
            None => true,
        }
    }

    /// 返回状态是否发生变化
    fn mark_failed(&self, now: Instant) -> bool {
        *self.last_failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(now);
        self.connected.swap(false, Ordering::SeqCst)
    }

    fn mark_ok(&self) -> bool {
        !self.connected.swap(true, Ordering::SeqCst)
    }
}

impl RedisStore {
    pub async fn connect(config: &RedisConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.url.as_str())?;
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(config.connect_timeout())
            .set_response_timeout(config.response_timeout());
        let conn = ConnectionManager::new_with_config(client, manager_config).await?;

        Ok(Self {
            conn,
            connectivity: Connectivity::new(config.health_check_interval()),
            scan_count: config.scan_count.max(1),
        })
    }

    /// 发送 PING 并刷新连通状态
    pub async fn ping(&self) -> bool {
        let mut conn = self.conn.clone();
        let result: RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        match result {
            Ok(_) => self.mark(true),
            Err(e) => {
                tracing::debug!("Redis PING failed: {}", e);
                self.mark(false);
            }
        }
        self.connectivity.is_connected()
    }

    /// 启动后台连通性探测
    ///
    /// 任务只持有弱引用，存储被释放后自动退出。
    pub fn spawn_health_check(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                store.ping().await;
            }
        })
    }

    fn mark(&self, connected: bool) {
        if connected {
            if self.connectivity.mark_ok() {
                tracing::info!("Redis connection restored");
            }
        } else if self.connectivity.mark_failed(Instant::now()) {
            tracing::warn!("Redis connection lost, cache operations will be skipped");
        }
    }

    /// 记录命令结果：成功即视为连通，传输层错误标记为断开
    fn track<T>(&self, result: RedisResult<T>) -> CacheResult<T> {
        match result {
            Ok(value) => {
                self.mark(true);
                Ok(value)
            }
            Err(e) => {
                if is_transport_error(&e) {
                    self.mark(false);
                }
                Err(CacheError::Redis(e))
            }
        }
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    fn is_connected(&self) -> bool {
        self.connectivity.should_attempt(Instant::now())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn.clone();
        self.track(conn.get(key).await)
    }

    async fn get_with_expiry(&self, key: &str) -> CacheResult<(Option<String>, Option<Duration>)> {
        let mut conn = self.conn.clone();
        let result: RedisResult<(Option<String>, i64)> = redis::pipe()
            .atomic()
            .get(key)
            .cmd("PTTL")
            .arg(key)
            .query_async(&mut conn)
            .await;

        match self.track(result)? {
            (Some(value), pttl) => Ok((Some(value), decode_pttl(pttl))),
            (None, _) => Ok((None, None)),
        }
    }

    async fn set(&self, key: &str, value: String, expiration: Duration) -> CacheResult<()> {
        let millis = u64::try_from(expiration.as_millis()).unwrap_or(u64::MAX);
        if millis == 0 {
            return Err(CacheError::InvalidExpiration(expiration));
        }

        let mut conn = self.conn.clone();
        let result: RedisResult<()> = conn.pset_ex(key, value, millis).await;
        self.track(result)
    }

    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        // SCAN 不阻塞服务端，但同一个键可能在多批中重复出现
        loop {
            let result: RedisResult<(u64, Vec<String>)> = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(self.scan_count)
                .query_async(&mut conn)
                .await;
            let (next, batch) = self.track(result)?;

            collect_unique(&mut keys, &mut seen, batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        tracing::debug!("SCAN {} matched {} keys", pattern, keys.len());
        Ok(keys)
    }
}

/// PTTL: -2 键不存在，-1 没有过期时间
fn decode_pttl(pttl: i64) -> Option<Duration> {
    u64::try_from(pttl)
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

fn collect_unique(keys: &mut Vec<String>, seen: &mut HashSet<String>, batch: Vec<String>) {
    for key in batch {
        if seen.insert(key.clone()) {
            keys.push(key);
        }
    }
}
