use std::env;
use std::path::PathBuf;

/// Default number of read-transition-write cycles before giving up with `Conflict`.
pub const DEFAULT_TRANSITION_ATTEMPTS: u32 = 2;

/// Configuration for the membership-approval service and CLI.
#[derive(Debug, Clone)]
pub struct Config {
    /// Data directory path (default: `.membership-approval/` in current directory)
    pub data_dir: PathBuf,

    /// Output format: "human" (default) or "json"
    pub output_format: String,

    /// Log level: "info", "debug", "warn", "error" (default: "info")
    pub log_level: String,

    /// Address the HTTP server binds to (default: `127.0.0.1:8080`)
    pub bind_addr: String,

    /// Optimistic-concurrency retry budget for approve/reject
    pub transition_attempts: u32,
}

impl Config {
    /// Create a new config with defaults
    pub fn new() -> Self {
        let data_dir = env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".membership-approval");

        Config {
            data_dir,
            output_format: "human".to_string(),
            log_level: "info".to_string(),
            bind_addr: "127.0.0.1:8080".to_string(),
            transition_attempts: DEFAULT_TRANSITION_ATTEMPTS,
        }
    }

    /// Create config with custom data directory
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Config {
            data_dir,
            ..Config::new()
        }
    }

    pub fn get_data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    pub fn set_data_dir(&mut self, dir: PathBuf) {
        self.data_dir = dir;
    }

    pub fn get_output_format(&self) -> &str {
        &self.output_format
    }

    /// Set output format ("human" or "json")
    pub fn set_output_format(&mut self, format: String) {
        self.output_format = format;
    }

    pub fn get_log_level(&self) -> &str {
        &self.log_level
    }

    pub fn set_log_level(&mut self, level: String) {
        self.log_level = level;
    }

    pub fn get_bind_addr(&self) -> &str {
        &self.bind_addr
    }

    pub fn set_bind_addr(&mut self, addr: String) {
        self.bind_addr = addr;
    }

    pub fn get_transition_attempts(&self) -> u32 {
        self.transition_attempts
    }

    /// Get application snapshot path
    pub fn get_store_path(&self) -> PathBuf {
        self.data_dir.join("applications.bin")
    }

    /// Load config from environment variables
    ///
    /// Environment variables:
    /// - `MEMBERSHIP_APPROVAL_DATA_DIR`: override data directory
    /// - `MEMBERSHIP_APPROVAL_OUTPUT_FORMAT`: "human" or "json"
    /// - `MEMBERSHIP_APPROVAL_LOG_LEVEL`: log level
    /// - `MEMBERSHIP_APPROVAL_BIND_ADDR`: HTTP bind address
    /// - `MEMBERSHIP_APPROVAL_TRANSITION_ATTEMPTS`: retry budget (minimum 1)
    pub fn from_env() -> Self {
        let mut config = Config::new();

        if let Ok(dir) = env::var("MEMBERSHIP_APPROVAL_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Ok(format) = env::var("MEMBERSHIP_APPROVAL_OUTPUT_FORMAT") {
            config.output_format = format;
        }

        if let Ok(level) = env::var("MEMBERSHIP_APPROVAL_LOG_LEVEL") {
            config.log_level = level;
        }

        if let Ok(addr) = env::var("MEMBERSHIP_APPROVAL_BIND_ADDR") {
            config.bind_addr = addr;
        }

        if let Ok(attempts) = env::var("MEMBERSHIP_APPROVAL_TRANSITION_ATTEMPTS") {
            if let Ok(n) = attempts.trim().parse::<u32>() {
                config.transition_attempts = n.max(1);
            }
        }

        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}
