//! postwell: CRUD over posts with an in-memory store and a TTL list cache.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;

mod util;
