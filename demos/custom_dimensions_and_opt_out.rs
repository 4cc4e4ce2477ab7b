use std::error::Error;

use matomo_rs_sdk::logger::{set_user_log_handler_fn, LogCallbackParams, LogLevel, LogOptions};
use matomo_rs_sdk::tracker::{LifecycleAdapter, SearchOptions, Tracker, TrackerSettings};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Print tracker diagnostics (malformed URLs, failed dispatches) to stdout.
    set_user_log_handler_fn(
        Some(|params: LogCallbackParams| {
            println!("[{}] {:?}: {}", params.logger_type, params.level, params.message);
        }),
        Some(LogOptions {
            level: Some(LogLevel::Warn),
        }),
    );

    let tracker = Tracker::new(TrackerSettings::default().with_application_id("com.example.shop"));
    tracker.init_tracker("https://matomo.example.com/matomo.php", 7)?;
    tracker.set_user_id(Some("customer-1138"));

    tracker.set_custom_dimension(1, Some("premium"));
    tracker.set_custom_dimension(2, Some("dark-mode"));
    let search = SearchOptions::default()
        .with_category("catalog")
        .with_result_count(12);
    tracker.track_search("trail shoes", search);

    // Dimension 2 is gone for every request built from now on.
    tracker.set_custom_dimension(2, None);
    tracker.track_download_link("https://cdn.example.com/catalog.pdf");

    // Reported through the logger, nothing is queued.
    tracker.track_outlink("not a url");

    tracker.set_app_opt_out(true);
    tracker.track_screen("/checkout", Some("Checkout"));
    println!("Opted out: {}, queued: {}", tracker.opted_out(), tracker.queue_len());
    tracker.set_app_opt_out(false);

    for request in tracker.queued_requests() {
        let dimensions: Vec<String> = request
            .dimensions()
            .iter()
            .map(|(id, value)| format!("dimension{id}={value}"))
            .collect();
        println!("{:?} {:?}", request.param("url"), dimensions);
    }

    let lifecycle = LifecycleAdapter::new(tracker.clone());
    let report = lifecycle.on_host_pause_async().await;
    println!("Sent {}, remaining {}", report.sent, report.remaining);

    Ok(())
}
