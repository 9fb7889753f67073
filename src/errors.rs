use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    // 存储不可达
    #[error("Store unavailable")]
    Unavailable,

    // Redis 错误
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    // 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // 键映射错误
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid expiration: {0:?}")]
    InvalidExpiration(Duration),

    // 通用错误
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

impl CacheError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            CacheError::Unavailable => "E001",
            CacheError::Redis(_) => "E002",
            CacheError::Serialization(_) => "E003",
            CacheError::InvalidKey(_) => "E004",
            CacheError::InvalidExpiration(_) => "E005",
            CacheError::Config(_) => "E006",
            CacheError::Internal(_) => "E007",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            CacheError::Unavailable => "Store Unavailable",
            CacheError::Redis(_) => "Redis Error",
            CacheError::Serialization(_) => "Serialization Error",
            CacheError::InvalidKey(_) => "Invalid Key",
            CacheError::InvalidExpiration(_) => "Invalid Expiration",
            CacheError::Config(_) => "Configuration Error",
            CacheError::Internal(_) => "Internal Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!(
            "[{}] {}: {}",
            self.code(),
            self.error_type(),
            self.message()
        )
    }

    /// 是否属于存储层故障（不可达或传输层失败）
    ///
    /// 这类错误在降级模式下等同于"未命中"。类型不匹配、WRONGTYPE
    /// 等 Redis 错误说明数据本身有问题，不算在内。
    pub fn is_store_failure(&self) -> bool {
        match self {
            CacheError::Unavailable => true,
            CacheError::Redis(e) => is_transport_error(e),
            _ => false,
        }
    }
}

/// 连接层面的 Redis 错误（I/O、拒绝连接、连接断开、超时）
pub fn is_transport_error(e: &redis::RedisError) -> bool {
    e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
}

/// 降级处理：把存储层故障吸收为默认值
///
/// - 读操作: `Option<T>` 降级为 `None`
/// - 写操作: `()` 降级为空操作
/// - 带过期时间的读: `(None, None)`
///
/// 序列化、键映射、过期时间参数错误仍然向上传播。
pub trait FailSoft<T> {
    fn fail_soft(self) -> CacheResult<T>;
}

impl<T: Default> FailSoft<T> for CacheResult<T> {
    fn fail_soft(self) -> CacheResult<T> {
        match self {
            Err(e) if e.is_store_failure() => {
                tracing::debug!("Store failure absorbed: {}", e);
                Ok(T::default())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_soft_absorbs_unavailable() {
        let read: CacheResult<Option<u32>> = Err(CacheError::Unavailable);
        assert_eq!(read.fail_soft().unwrap(), None);

        let write: CacheResult<()> = Err(CacheError::Unavailable);
        assert!(write.fail_soft().is_ok());

        let with_expiry: CacheResult<(Option<u32>, Option<Duration>)> =
            Err(CacheError::Unavailable);
        assert_eq!(with_expiry.fail_soft().unwrap(), (None, None));
    }

    #[test]
    fn test_fail_soft_absorbs_redis_errors() {
        let err = redis::RedisError::from((redis::ErrorKind::IoError, "connection reset"));
        let read: CacheResult<Option<u32>> = Err(CacheError::Redis(err));
        assert_eq!(read.fail_soft().unwrap(), None);
    }

    #[test]
    fn test_fail_soft_keeps_redis_type_errors() {
        let err = redis::RedisError::from((
            redis::ErrorKind::TypeError,
            "Response was of incompatible type",
        ));
        let read: CacheResult<Option<String>> = Err(CacheError::Redis(err));
        assert!(matches!(read.fail_soft(), Err(CacheError::Redis(_))));

        let wrong_type = redis::RedisError::from((
            redis::ErrorKind::ExtensionError,
            "WRONGTYPE",
            "Operation against a key holding the wrong kind of value".to_string(),
        ));
        let read: CacheResult<Option<String>> = Err(CacheError::Redis(wrong_type));
        assert!(matches!(read.fail_soft(), Err(CacheError::Redis(_))));
    }

    #[test]
    fn test_transport_error_classification() {
        let io = redis::RedisError::from((redis::ErrorKind::IoError, "broken pipe"));
        assert!(is_transport_error(&io));

        let type_error = redis::RedisError::from((redis::ErrorKind::TypeError, "WRONGTYPE"));
        assert!(!is_transport_error(&type_error));
    }

    #[test]
    fn test_fail_soft_keeps_decode_errors() {
        let decode = serde_json::from_str::<u32>("not json").unwrap_err();
        let read: CacheResult<Option<u32>> = Err(CacheError::Serialization(decode));
        assert!(matches!(read.fail_soft(), Err(CacheError::Serialization(_))));

        let key: CacheResult<Vec<u32>> = Err(CacheError::InvalidKey("user:x".into()));
        assert!(matches!(key.fail_soft(), Err(CacheError::InvalidKey(_))));
    }

    #[test]
    fn test_fail_soft_passes_values_through() {
        let read: CacheResult<Option<u32>> = Ok(Some(7));
        assert_eq!(read.fail_soft().unwrap(), Some(7));
    }

    #[test]
    fn test_format_simple() {
        let err = CacheError::InvalidKey("user:".into());
        assert_eq!(err.format_simple(), "[E004] Invalid Key: Invalid key: user:");
    }
}
