use crate::config::{Log, LogFile, Upstream};

pub fn get_default_address() -> String {
    "0.0.0.0".to_string()
}

pub fn get_default_port() -> u32 {
    8080
}

pub fn get_default_connect_timeout_ms() -> u64 {
    10_000
}

pub fn get_default_upstream() -> Upstream {
    Upstream {
        connect_timeout_ms: get_default_connect_timeout_ms(),
    }
}

pub fn get_default_log_level() -> String {
    "info".to_string()
}

pub fn get_default_log_file_path() -> String {
    "./logs/rondo.log".to_string()
}

pub fn get_default_log_file() -> LogFile {
    LogFile {
        enabled: false,
        path: get_default_log_file_path(),
    }
}

pub fn get_default_log() -> Log {
    Log {
        level: get_default_log_level(),
        file: get_default_log_file(),
    }
}
