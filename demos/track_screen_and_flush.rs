use std::error::Error;

use matomo_rs_sdk::tracker::{EventOptions, Tracker, TrackerSettings};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // TODO: Point this at your own Matomo instance and site id.
    let collector_url = "https://matomo.example.com/matomo.php";
    let site_id = 1;

    let settings = TrackerSettings::default()
        .with_application_id("com.example.demo")
        .with_application_version("1.4.0")
        .with_language("en-US");
    let tracker = Tracker::new(settings);
    tracker.init_tracker(collector_url, site_id)?;

    tracker.track_app_download();
    tracker.track_screen("/home", Some("Home Screen"));
    tracker.track_event(
        "onboarding",
        "completed",
        EventOptions::default().with_name("tutorial").with_value(3.0),
    );

    println!("Queued {} request(s):", tracker.queue_len());
    for request in tracker.queued_requests() {
        println!("  {}", request.query_string());
    }

    let report = tracker.flush().await;
    match report.error {
        Some(err) => println!(
            "Sent {} request(s), {} still queued: {err}",
            report.sent, report.remaining
        ),
        None => println!("Sent {} request(s)", report.sent),
    }

    Ok(())
}
