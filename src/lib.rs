pub mod config;
pub mod detector;
pub mod extractor;
pub mod notifier;
pub mod scheduler;
pub mod store;
pub mod types;
pub mod watchlist;

pub use config::{EmailConfig, MonitorConfig};
pub use detector::{ChangeDetector, PassSummary};
pub use extractor::{HttpExtractor, PostExtractor};
pub use notifier::{EmailNotifier, Notifier};
pub use scheduler::Scheduler;
pub use store::PostStore;
pub use types::{ExtractedPost, MonitorError, PostRecord, Result};
