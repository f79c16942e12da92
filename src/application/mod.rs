//! Application services layer.

pub mod api_keys;
pub mod error;
pub mod pagination;
pub mod posts;
pub mod repos;
