//! ModHost Core: host configuration and the shared error type.

pub mod config;
pub mod error;

pub use config::{HostConfig, HostPaths};
pub use error::{Error, Phase, Result};
