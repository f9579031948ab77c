//! Client side of precache.
//!
//! This crate provides the reqwest-backed network capability and the agent
//! itself: install, version check, flush, fetch interception and the worker
//! lifecycle that ties them together.

pub mod agent;
pub mod fetch;

#[cfg(test)]
pub(crate) mod test_utils;

pub use agent::{
    AgentConfig, Client, Clients, FlushOutcome, Flusher, InstallReport, Installer, Interceptor, Staleness, TaskOutcome,
    VersionChecker, Worker, WorkerId, WorkerState,
};
pub use fetch::{FetchClient, FetchConfig};
