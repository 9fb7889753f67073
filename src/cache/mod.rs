pub mod key_mapper;
pub mod traits;
pub mod typed_cache;


pub use key_mapper::{FnKeyMapper, KeyMapper, PrefixKeyMapper};
pub use traits::Cache;
pub use typed_cache::{DEFAULT_EXPIRATION, TypedCache};
