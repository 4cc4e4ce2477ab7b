use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::platform::runtime::sleep;
use crate::tracker::{transport_error, CollectorClient, OutboundRequest, TrackerResult};

#[derive(Default)]
struct ScriptState {
    calls: usize,
    failing_calls: Vec<usize>,
    delay: Duration,
    sent: Vec<OutboundRequest>,
}

/// Collector double that records delivered requests and fails on chosen call numbers.
#[derive(Clone, Default)]
pub struct ScriptedCollector {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedCollector {
    /// Fails the given 1-based call numbers, counted across every flush.
    pub fn failing_on(calls: &[usize]) -> Self {
        let collector = Self::default();
        collector.state.lock().unwrap().failing_calls = calls.to_vec();
        collector
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    pub fn sent(&self) -> Vec<OutboundRequest> {
        self.state.lock().unwrap().sent.clone()
    }
}

#[async_trait]
impl CollectorClient for ScriptedCollector {
    async fn send(&self, request: &OutboundRequest) -> TrackerResult<()> {
        let (call, delay, fail) = {
            let mut state = self.state.lock().unwrap();
            state.calls += 1;
            let call = state.calls;
            (call, state.delay, state.failing_calls.contains(&call))
        };
        sleep(delay).await;
        if fail {
            return Err(transport_error(format!("scripted failure on call {call}")));
        }
        self.state.lock().unwrap().sent.push(request.clone());
        Ok(())
    }
}
