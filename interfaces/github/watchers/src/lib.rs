//! GitHub REST v3 client for repository watchers and user profiles
//!
//! - `index` holds the authenticated client and its two read calls
//! - `models` holds the payload types handed back to callers

pub mod index;
pub mod models;
