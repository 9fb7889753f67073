mod loader;
mod structs;

pub use structs::{AppConfig, CacheConfig, LogConfig, RedisConfig};
