//! Concrete adapter implementations for ports.

pub mod file_config_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
