use crate::types::{MonitorError, Result};
use chrono::NaiveTime;
use std::env;
use std::time::Duration;

/// SMTP session settings for outbound alerts. Required as a group:
/// either all of them are present or mail configuration fails.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub from: String,
    pub to: String,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
}

impl EmailConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            from: require("EMAIL_FROM")?,
            to: require("EMAIL_TO")?,
            smtp_server: require("SMTP_SERVER")?,
            smtp_port: require("SMTP_PORT")?
                .parse()
                .map_err(|_| MonitorError::Config("SMTP_PORT is not a valid port".to_string()))?,
            smtp_username: require("SMTP_USERNAME")?,
            smtp_password: require("SMTP_PASSWORD")?,
        })
    }
}

/// Process-wide configuration, loaded once before the scheduler starts
/// and immutable thereafter.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Newline-delimited list of pages to watch.
    pub url_file: String,
    /// SQLite database holding the last-known post per url.
    pub db_path: String,
    /// CSS selector locating the latest post's heading. One rule is
    /// applied to every watched url.
    pub post_selector: String,
    /// Local wall-clock time of the daily check.
    pub check_at: NaiveTime,
    /// How often the scheduler wakes to check whether the daily trigger
    /// has fired.
    pub poll_interval: Duration,
    pub email: EmailConfig,
}

impl MonitorConfig {
    pub fn from_env() -> Result<Self> {
        let check_at = env::var("MONITOR_CHECK_AT").unwrap_or_else(|_| "09:00".to_string());
        let check_at = NaiveTime::parse_from_str(&check_at, "%H:%M").map_err(|_| {
            MonitorError::Config(format!("MONITOR_CHECK_AT not in %H:%M format: {check_at}"))
        })?;

        Ok(Self {
            url_file: env::var("MONITOR_URL_FILE").unwrap_or_else(|_| "urls.txt".to_string()),
            db_path: env::var("MONITOR_DB_PATH").unwrap_or_else(|_| "monitor.db".to_string()),
            post_selector: env::var("MONITOR_SELECTOR")
                .unwrap_or_else(|_| "h2.post-title".to_string()),
            check_at,
            poll_interval: Duration::from_secs(60),
            email: EmailConfig::from_env()?,
        })
    }
}

fn require(key: &str) -> Result<String> {
    env::var(key).map_err(|_| MonitorError::Config(format!("missing environment variable {key}")))
}
