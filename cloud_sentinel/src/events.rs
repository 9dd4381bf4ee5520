use crate::core_modules::hazard_matcher::Recommendation;
use crate::core_modules::report::{HazardReport, HazardStatus};
use std::time::Duration;
use tokio::sync::broadcast;

/// Everything one analysis cycle produced.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// 1-based count of analysis cycles in this run.
    pub cycle: u64,
    pub frame_index: u64,
    pub report: HazardReport,
    pub recommendations: Vec<Recommendation>,
}

impl CycleReport {
    pub fn is_danger(&self) -> bool {
        self.report.status == HazardStatus::Danger
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The source ran out of frames.
    StreamEnd,
    /// The shutdown signal was raised.
    Interrupted,
    /// The source could not produce the next frame.
    SourceFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub cycles: u64,
    pub danger_cycles: u64,
    pub error_cycles: u64,
    pub stop: StopReason,
}

#[derive(Debug, Clone)]
pub enum SentinelEvent {
    Started { source: String, cooldown: Duration },
    /// Cooldown progress. Published when it enters a new tenth, not every frame.
    Progress { frame_index: u64, progress: f64 },
    Cycle(CycleReport),
    Stopped(RunSummary),
}

#[derive(Clone)]
pub struct SentinelBus {
    pub events_tx: broadcast::Sender<SentinelEvent>,
}

impl SentinelBus {
    pub fn new(capacity: usize) -> Self {
        let (events_tx, _) = broadcast::channel::<SentinelEvent>(capacity.max(1));
        Self { events_tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SentinelEvent> {
        self.events_tx.subscribe()
    }

    /// Publishing with nobody listening is fine.
    pub fn publish(&self, event: SentinelEvent) {
        let _ = self.events_tx.send(event);
    }
}

impl Default for SentinelBus {
    fn default() -> Self {
        Self::new(64)
    }
}
