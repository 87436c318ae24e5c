use serde::{Deserialize, Serialize};

use crate::default::{
    get_default_address, get_default_connect_timeout_ms, get_default_log,
    get_default_log_file, get_default_log_file_path, get_default_log_level,
    get_default_port, get_default_upstream,
};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub version: u32,

    pub listen: Listen,

    // Ordered backend target URLs, "scheme://host[:port][/path]". May be
    // empty; the pool then serves 503s until a backend is added.
    #[serde(default)]
    pub backends: Vec<String>,

    #[serde(default = "get_default_upstream")]
    pub upstream: Upstream,

    #[serde(default = "get_default_log")]
    pub log: Log,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Listen {
    #[serde(default = "get_default_address")]
    pub address: String, // "0.0.0.0"

    #[serde(default = "get_default_port")]
    pub port: u32, // 8080
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Upstream {
    #[serde(default = "get_default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Log {
    #[serde(default = "get_default_log_level")]
    pub level: String, // "trace" .. "off"

    #[serde(default = "get_default_log_file")]
    pub file: LogFile,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LogFile {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "get_default_log_file_path")]
    pub path: String,
}
