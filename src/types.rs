use serde::{Deserialize, Serialize};

/// Title and link of the most recent post found on a watched page.
/// Produced fresh on every fetch; only `link` is compared against and
/// written into the persistent record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedPost {
    pub title: String,
    pub link: String,
}

/// Persistent record of the last post link seen for a watched url.
/// At most one record per url; overwritten when a different link is
/// observed, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub url: String,
    pub last_known_post: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Mail address error: {0}")]
    MailAddress(#[from] lettre::address::AddressError),

    #[error("Mail build error: {0}")]
    MailBuild(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
