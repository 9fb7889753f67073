use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;

use crate::errors::{CacheError, CacheResult};
use crate::store::escape_glob;

/// 逻辑键与存储键之间的映射
///
/// 两个方向必须互逆：对缓存自己生成的任意存储键，
/// `logical_key(storage_key(k)) == k`。
/// `logical_key` 只在模式扫描时使用。
pub trait KeyMapper: Send + Sync {
    type Key: Send + Sync;

    fn storage_key(&self, key: &Self::Key) -> String;

    fn logical_key(&self, storage_key: &str) -> CacheResult<Self::Key>;
}

/// `"{prefix}:{key}"` 形式的映射
#[derive(Debug)]
pub struct PrefixKeyMapper<K> {
    prefix: String,
    _key: PhantomData<fn() -> K>,
}

impl<K> PrefixKeyMapper<K> {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            _key: PhantomData,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 匹配本命名空间全部键的 glob 模式
    pub fn pattern(&self) -> String {
        format!("{}:*", escape_glob(&self.prefix))
    }
}

impl<K> Clone for PrefixKeyMapper<K> {
    fn clone(&self) -> Self {
        Self::new(self.prefix.clone())
    }
}

impl<K> KeyMapper for PrefixKeyMapper<K>
where
    K: Display + FromStr + Send + Sync,
{
    type Key = K;

    fn storage_key(&self, key: &K) -> String {
        format!("{}:{}", self.prefix, key)
    }

    fn logical_key(&self, storage_key: &str) -> CacheResult<K> {
        storage_key
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| CacheError::InvalidKey(storage_key.to_string()))
    }
}

/// 由一对函数组成的映射
pub struct FnKeyMapper<K, F, G> {
    forward: F,
    inverse: G,
    _key: PhantomData<fn() -> K>,
}

impl<K, F, G> FnKeyMapper<K, F, G>
where
    F: Fn(&K) -> String,
    G: Fn(&str) -> CacheResult<K>,
{
    pub fn new(forward: F, inverse: G) -> Self {
        Self {
            forward,
            inverse,
            _key: PhantomData,
        }
    }
}

impl<K, F, G> KeyMapper for FnKeyMapper<K, F, G>
where
    K: Send + Sync,
    F: Fn(&K) -> String + Send + Sync,
    G: Fn(&str) -> CacheResult<K> + Send + Sync,
{
    type Key = K;

    fn storage_key(&self, key: &K) -> String {
        (self.forward)(key)
    }

    fn logical_key(&self, storage_key: &str) -> CacheResult<K> {
        (self.inverse)(storage_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_prefix_mapping() {
        let mapper = PrefixKeyMapper::<u64>::new("user");
        assert_eq!(mapper.storage_key(&42), "user:42");
        assert_eq!(mapper.logical_key("user:42").unwrap(), 42);
        assert_eq!(mapper.pattern(), "user:*");
    }

    #[test]
    fn test_prefix_mapping_rejects_foreign_keys() {
        let mapper = PrefixKeyMapper::<u64>::new("user");
        assert!(matches!(mapper.logical_key("order:42"), Err(CacheError::InvalidKey(_))));
        assert!(matches!(mapper.logical_key("user:abc"), Err(CacheError::InvalidKey(_))));
        assert!(matches!(mapper.logical_key("user42"), Err(CacheError::InvalidKey(_))));
    }

    #[test]
    fn test_pattern_escapes_prefix() {
        let mapper = PrefixKeyMapper::<u64>::new("tenant[7]");
        assert_eq!(mapper.pattern(), r"tenant\[7\]:*");
    }

    #[test]
    fn test_fn_mapper() {
        let mapper = FnKeyMapper::new(
            |(org, id): &(u32, u32)| format!("org:{}:doc:{}", org, id),
            |raw: &str| -> CacheResult<(u32, u32)> {
                let parts: Vec<&str> = raw.split(':').collect();
                match parts.as_slice() {
                    ["org", org, "doc", id] => Ok((
                        org.parse().map_err(|_| CacheError::InvalidKey(raw.into()))?,
                        id.parse().map_err(|_| CacheError::InvalidKey(raw.into()))?,
                    )),
                    _ => Err(CacheError::InvalidKey(raw.into())),
                }
            },
        );

        let key = mapper.storage_key(&(3, 9));
        assert_eq!(key, "org:3:doc:9");
        assert_eq!(mapper.logical_key(&key).unwrap(), (3, 9));
    }

    proptest! {
        #[test]
        fn prop_numeric_keys_round_trip(id in any::<u64>()) {
            let mapper = PrefixKeyMapper::<u64>::new("user");
            let storage_key = mapper.storage_key(&id);
            prop_assert_eq!(mapper.logical_key(&storage_key).unwrap(), id);
        }

        #[test]
        fn prop_string_keys_round_trip(key in ".*", prefix in "[a-z]{1,8}") {
            let mapper = PrefixKeyMapper::<String>::new(prefix);
            let storage_key = mapper.storage_key(&key);
            prop_assert_eq!(mapper.logical_key(&storage_key).unwrap(), key);
        }
    }
}
