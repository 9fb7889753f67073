pub mod errors;
pub mod config;
pub mod system;
pub mod store;
pub mod cache;
pub mod runtime;

// 重新导出常用类型
pub use cache::{Cache, FnKeyMapper, KeyMapper, PrefixKeyMapper, TypedCache};
pub use config::AppConfig;
pub use errors::{CacheError, CacheResult, FailSoft};
pub use store::{KeyValueStore, MemoryStore, RedisStore};
