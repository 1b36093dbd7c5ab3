//! Configuration module for the club portal backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite file of the hosted backend. `None` runs against the local store only.
    pub db_path: Option<PathBuf>,
    /// JSON file backing the local store. `None` keeps it in memory.
    pub local_store_path: Option<PathBuf>,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of the human-readable format
    pub log_json: bool,
    /// Secret of the fixed administrator credential
    pub admin_password: Option<String>,
    /// E-mail shown for the administrator account
    pub admin_email: String,
    /// Club name, used as the default content author
    pub club_name: String,
    /// Category assigned to content created without one
    pub default_category: String,
    /// Seed sample content into empty page types on startup
    pub seed_content: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AddrParseError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("CLUB_DB_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let local_store_path = match env::var("CLUB_LOCAL_STORE_PATH") {
            Ok(path) if path.trim().is_empty() => None,
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => Some(PathBuf::from("./data/local-store.json")),
        };

        let bind_addr = env::var("CLUB_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()?;

        let log_level = env::var("CLUB_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_json = env::var("CLUB_LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let admin_password = env::var("CLUB_ADMIN_PASSWORD")
            .ok()
            .filter(|p| !p.is_empty());
        let admin_email = env::var("CLUB_ADMIN_EMAIL")
            .unwrap_or_else(|_| "admin@ventureclub.local".to_string());
        let club_name = env::var("CLUB_NAME").unwrap_or_else(|_| "Venture Club".to_string());
        let default_category =
            env::var("CLUB_DEFAULT_CATEGORY").unwrap_or_else(|_| "General".to_string());
        let seed_content = env::var("CLUB_SEED_CONTENT")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            db_path,
            local_store_path,
            bind_addr,
            log_level,
            log_json,
            admin_password,
            admin_email,
            club_name,
            default_category,
            seed_content,
        })
    }
}
