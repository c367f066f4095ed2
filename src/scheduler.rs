use crate::detector::ChangeDetector;
use crate::extractor::PostExtractor;
use crate::notifier::Notifier;
use crate::watchlist::load_watchlist;
use chrono::{DateTime, Days, Duration as ChronoDuration, Local, NaiveTime};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

/// Drives the detection passes: one pass immediately at startup, then
/// one pass daily at a fixed local wall-clock time, forever. The trigger
/// is checked on a coarse fixed interval rather than event-driven, and
/// passes never overlap because the loop is fully sequential.
pub struct Scheduler {
    check_at: NaiveTime,
    poll_interval: Duration,
}

impl Scheduler {
    pub fn new(check_at: NaiveTime, poll_interval: Duration) -> Self {
        Self {
            check_at,
            poll_interval,
        }
    }

    pub async fn run<E: PostExtractor, N: Notifier>(
        &self,
        detector: &ChangeDetector<E, N>,
        url_file: &str,
    ) {
        self.run_one(detector, url_file).await;

        loop {
            let trigger = next_trigger_after(Local::now(), self.check_at);
            info!("Next pass scheduled for {}", trigger);

            while Local::now() < trigger {
                sleep(self.poll_interval).await;
            }

            self.run_one(detector, url_file).await;
        }
    }

    /// One scheduled pass. The watchlist is re-read each time so edits
    /// to the url file take effect without a restart. Failures are fatal
    /// to this pass only; the schedule keeps running.
    async fn run_one<E: PostExtractor, N: Notifier>(
        &self,
        detector: &ChangeDetector<E, N>,
        url_file: &str,
    ) {
        let urls = match load_watchlist(url_file) {
            Ok(urls) => urls,
            Err(e) => {
                error!("Failed to load watchlist from {}: {}", url_file, e);
                return;
            }
        };

        if let Err(e) = detector.run_pass(&urls).await {
            error!("Pass aborted: {}", e);
        }
    }
}

/// First wall-clock occurrence of `at` strictly after `now`.
pub fn next_trigger_after(now: DateTime<Local>, at: NaiveTime) -> DateTime<Local> {
    let date = if now.time() < at {
        now.date_naive()
    } else {
        now.date_naive() + Days::new(1)
    };

    let naive = date.and_time(at);
    // A time falling into a DST gap is nudged forward an hour.
    naive
        .and_local_timezone(Local)
        .earliest()
        .or_else(|| (naive + ChronoDuration::hours(1)).and_local_timezone(Local).earliest())
        .unwrap_or(now)
}
