//! Port traits the domain talks through.

pub mod config_port;
pub mod ledger_port;
