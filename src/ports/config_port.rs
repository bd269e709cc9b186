//! Configuration access port.
//!
//! Sections read by wheeler: `[database]` (`path`, `pool_size`,
//! `busy_timeout_ms`) and `[logging]` (`level`, `ansi`).

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    /// Falls back to `default` when the key is missing or not an integer.
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
}
