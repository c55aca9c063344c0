//! Dispatcher configuration.
//!
//! Everything has a sensible default; set only what you need:
//!
//! ```rust
//! use switchyard::{Config, Router};
//! use http::StatusCode;
//!
//! let router = Router::new().config(
//!     Config::default()
//!         .debug(cfg!(debug_assertions))
//!         .deny_status(StatusCode::NOT_FOUND),
//! );
//! ```

use std::env;

use http::StatusCode;

pub const ENV_DEBUG: &str = "SWITCHYARD_DEBUG";
pub const ENV_COMPRESSION: &str = "SWITCHYARD_COMPRESSION";

#[derive(Clone, Debug)]
pub struct Config {
    pub(crate) debug: bool,
    pub(crate) compression: bool,
    pub(crate) deny_status: Option<StatusCode>,
    pub(crate) params_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { debug: false, compression: true, deny_status: None, params_capacity: 4 }
    }
}

impl Config {
    /// Defaults, overridden by `SWITCHYARD_DEBUG` and `SWITCHYARD_COMPRESSION`
    /// when set (`1`, `true`, `on` / `0`, `false`, `off`).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(debug) = env_flag(ENV_DEBUG) {
            config.debug = debug;
        }
        if let Some(compression) = env_flag(ENV_COMPRESSION) {
            config.compression = compression;
        }
        config
    }

    /// Include panic messages in `500` bodies. Never enable in production.
    pub fn debug(mut self, on: bool) -> Self {
        self.debug = on;
        self
    }

    /// Compress compressible responses when the client advertises support.
    pub fn compression(mut self, on: bool) -> Self {
        self.compression = on;
        self
    }

    /// Answer every failed access check with `status` instead of the
    /// `401`/`403` split.
    pub fn deny_status(mut self, status: StatusCode) -> Self {
        self.deny_status = Some(status);
        self
    }

    /// Base capacity of pooled parameter lists.
    pub fn params_capacity(mut self, capacity: usize) -> Self {
        self.params_capacity = capacity;
        self
    }
}

fn env_flag(key: &str) -> Option<bool> {
    parse_flag(&env::var(key).ok()?)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
