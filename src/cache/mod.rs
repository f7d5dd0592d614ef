//! Cache module for storing raw API responses on disk
//!
//! Every response is written verbatim as `<key>.json` inside the cache
//! directory. An entry never expires: once its file exists it is treated as
//! authoritative and the remote API is not asked for that key again.

pub(crate) mod store;

pub use store::{CacheError, CacheStore};
