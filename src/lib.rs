//! Label harvester library
//!
//! Exposes the cache, label file store, API client and harvest run for the
//! binary and for integration tests.

pub mod cache;
pub mod cli;
pub mod data;
pub mod harvest;
pub mod labels;
pub mod observe;
pub mod session;
