//! Test utilities shared across crate-level unit tests.

pub mod collector;
pub mod http;
pub mod logs;

pub use collector::ScriptedCollector;
pub use http::start_mock_server;
pub use logs::{capture_logs, CapturedLog};
