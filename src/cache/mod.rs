//! List-response cache.
//!
//! Holds serialized `GET /posts` responses keyed by `"<limit>:<offset>"` for a
//! fixed TTL. Every successful write to the post store flushes it wholesale.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! ttl_seconds = 30
//! sweep_interval_seconds = 60   # 0 disables the background sweeper
//! ```

mod config;
pub mod counters;
mod keys;
mod store;
mod sweeper;

pub use config::CacheConfig;
pub use keys::list_key;
pub use store::{CacheGeneration, ListCache};
pub use sweeper::spawn_sweeper;
