use std::sync::{Arc, Mutex};

use crate::logger::{LogArgument, LogLevel, Logger};

#[derive(Clone, Debug)]
pub struct CapturedLog {
    pub level: LogLevel,
    pub message: String,
    /// Error code argument such as `tracker/malformed-url`, when one was logged.
    pub code: Option<String>,
}

/// Replaces the log handler of `logger` with one that records every entry.
pub fn capture_logs(logger: &Logger) -> Arc<Mutex<Vec<CapturedLog>>> {
    let records = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&records);
    logger.set_log_handler(move |_, level, args: &[LogArgument]| {
        let fragments: Vec<String> = args
            .iter()
            .filter_map(LogArgument::to_message_fragment)
            .collect();
        let code = args
            .iter()
            .filter_map(LogArgument::as_text)
            .find(|text| text.starts_with("tracker/"))
            .map(str::to_owned);
        sink.lock().unwrap().push(CapturedLog {
            level,
            message: fragments.join(" "),
            code,
        });
    });
    records
}
