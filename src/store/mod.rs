pub mod memory_store;
pub mod pattern;
pub mod redis_store;
pub mod traits;

pub use memory_store::MemoryStore;
pub use pattern::{GlobPattern, escape as escape_glob};
pub use redis_store::RedisStore;
pub use traits::KeyValueStore;
