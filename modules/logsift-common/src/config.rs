use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Durable store
    pub db_path: String,

    // Web server
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    /// Everything has a sane local default; nothing is required.
    pub fn from_env() -> Self {
        Self {
            db_path: env::var("LOGSIFT_DB_PATH")
                .unwrap_or_else(|_| "data/logsift.db".to_string()),
            host: env::var("LOGSIFT_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("LOGSIFT_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("LOGSIFT_PORT must be a number"),
        }
    }
}
