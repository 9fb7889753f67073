pub mod startup;

pub use startup::{CacheContext, prepare_cache_context};
