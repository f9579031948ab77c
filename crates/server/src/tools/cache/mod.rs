//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and refreshing the agent's cache.

pub mod check;
pub mod get;
pub mod status;

pub use check::{CacheCheckParams, check_impl};
pub use get::{CacheGetParams, get_impl};
pub use status::status_impl;
