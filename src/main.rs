use post_monitor::{ChangeDetector, EmailNotifier, HttpExtractor, MonitorConfig, PostStore, Scheduler};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    info!("Starting post monitor");

    let config = MonitorConfig::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        error!("Mail settings come from EMAIL_FROM, EMAIL_TO, SMTP_SERVER, SMTP_PORT, SMTP_USERNAME and SMTP_PASSWORD");
        e
    })?;

    let store = PostStore::connect(&config.db_path).await.map_err(|e| {
        error!("Failed to open post store at {}: {}", config.db_path, e);
        e
    })?;
    store.initialize().await?;

    let extractor = HttpExtractor::new(&config.post_selector)?;
    let notifier = EmailNotifier::new(config.email.clone())?;
    let detector = ChangeDetector::new(store, extractor, notifier);

    info!(
        "Watching urls from {}, daily check at {}",
        config.url_file, config.check_at
    );

    // First pass immediately, then daily forever; killed externally.
    let scheduler = Scheduler::new(config.check_at, config.poll_interval);
    scheduler.run(&detector, &config.url_file).await;

    Ok(())
}
