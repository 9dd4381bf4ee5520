// THEORY:
// The `sentinel` module is the top-level API of the engine. It wires the stack
// together into one polling loop:
//
//   frame source -> cooldown gate -> analysis gateway -> hazard matcher -> bus
//
// Key architectural principles:
// 1.  **Owned Handles**: The frame source, gateway and matcher (with its rule
//     store) are constructed by the caller and moved into the `Sentinel`. There
//     are no process-wide clients. `run` consumes the sentinel, so every handle
//     is dropped, and every resource released, on every exit path.
// 2.  **One Call in Flight**: The loop awaits the gateway and the store in
//     sequence before reading the next frame. Cycles never overlap.
// 3.  **Always Keep Polling**: Gateway failures arrive as `ERROR` reports and
//     store failures as `DB_ERROR` recommendations; both are published like any
//     other cycle and the loop moves on. Only end of stream, a failing source,
//     or the shutdown signal stop it.
// 4.  **Cooperative Shutdown**: A `watch` flag is checked between frames and
//     also cuts the pacing sleep short.

use crate::config::SentinelConfig;
use crate::core_modules::cooldown::{CooldownGate, Tick};
use crate::core_modules::frame_source::{Frame, FrameSource};
use crate::core_modules::gateway::{AnalysisGateway, observe};
use crate::core_modules::hazard_matcher::HazardMatcher;
use crate::core_modules::report::HazardStatus;
use crate::events::{CycleReport, RunSummary, SentinelBus, SentinelEvent, StopReason};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Runs one frame through the gateway and the matcher.
pub async fn assess(
    gateway: &dyn AnalysisGateway,
    matcher: &HazardMatcher,
    frame: &Frame,
    cycle: u64,
) -> CycleReport {
    let report = observe(gateway, &frame.jpeg).await;
    let recommendations = matcher.resolve(&report.hazards).await;
    CycleReport {
        cycle,
        frame_index: frame.index,
        report,
        recommendations,
    }
}

pub struct Sentinel {
    source: Box<dyn FrameSource>,
    gateway: Arc<dyn AnalysisGateway>,
    matcher: HazardMatcher,
    gate: CooldownGate,
    frame_delay: Duration,
    bus: SentinelBus,
}

impl Sentinel {
    pub fn new(
        source: Box<dyn FrameSource>,
        gateway: Arc<dyn AnalysisGateway>,
        matcher: HazardMatcher,
        config: &SentinelConfig,
    ) -> Self {
        Self {
            source,
            gateway,
            matcher,
            gate: CooldownGate::new(config.cooldown),
            frame_delay: config.frame_delay,
            bus: SentinelBus::default(),
        }
    }

    pub fn with_bus(mut self, bus: SentinelBus) -> Self {
        self.bus = bus;
        self
    }

    pub fn bus(&self) -> &SentinelBus {
        &self.bus
    }

    /// Polls the source until it ends, fails, or `shutdown` turns true.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> RunSummary {
        let source_name = self.source.describe();
        info!(
            "🚀 Sentinel online. Feed: {} | gateway: {} | cooldown: {:?}",
            source_name,
            self.gateway.name(),
            self.gate.cooldown()
        );
        self.bus.publish(SentinelEvent::Started {
            source: source_name,
            cooldown: self.gate.cooldown(),
        });

        let mut frames = 0u64;
        let mut cycles = 0u64;
        let mut danger_cycles = 0u64;
        let mut error_cycles = 0u64;
        // Progress is published once per tenth of the cooldown, not per frame.
        let mut progress_step: Option<u32> = None;

        let stop = loop {
            if *shutdown.borrow() {
                break StopReason::Interrupted;
            }

            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break StopReason::StreamEnd,
                Err(e) => {
                    error!("Error reading frame: {}", e);
                    break StopReason::SourceFailed(e.to_string());
                }
            };
            frames += 1;

            match self.gate.tick(Instant::now()) {
                Tick::Sample => {
                    cycles += 1;
                    info!("[Frame {}] 📸 Analyzing...", frame.index);
                    let outcome = assess(self.gateway.as_ref(), &self.matcher, &frame, cycles).await;
                    match outcome.report.status {
                        HazardStatus::Danger => danger_cycles += 1,
                        HazardStatus::Error => error_cycles += 1,
                        HazardStatus::Safe => {}
                    }
                    info!(
                        "[Frame {}] {} in {:.2}s: {} hazard(s), {} recommendation(s)",
                        frame.index,
                        outcome.report.status,
                        outcome.report.latency.as_secs_f64(),
                        outcome.report.hazards.len(),
                        outcome.recommendations.len()
                    );
                    self.gate.complete(Instant::now());
                    self.bus.publish(SentinelEvent::Cycle(outcome));
                    progress_step = None;
                }
                Tick::Wait { progress } => {
                    let step = (progress * 10.0).floor() as u32;
                    if progress_step != Some(step) {
                        progress_step = Some(step);
                        debug!("[Frame {}] cooling down ({:.0}%)", frame.index, progress * 100.0);
                        self.bus.publish(SentinelEvent::Progress {
                            frame_index: frame.index,
                            progress,
                        });
                    }
                }
            }

            self.pace(&mut shutdown).await;
        };

        let summary = RunSummary {
            frames,
            cycles,
            danger_cycles,
            error_cycles,
            stop,
        };
        info!(
            "🛑 Sentinel stopped ({:?}) after {} frames, {} analyses",
            summary.stop, summary.frames, summary.cycles
        );
        self.bus.publish(SentinelEvent::Stopped(summary.clone()));
        summary
    }

    /// Sleeps the frame delay, waking early if shutdown is requested. With no
    /// delay it still yields, so subscribers and signal handlers sharing the
    /// runtime get to run between frames.
    async fn pace(&self, shutdown: &mut watch::Receiver<bool>) {
        if self.frame_delay.is_zero() {
            tokio::task::yield_now().await;
            return;
        }
        let sleep = tokio::time::sleep(self.frame_delay);
        tokio::pin!(sleep);
        let signalled = tokio::select! {
            _ = &mut sleep => false,
            changed = shutdown.changed() => changed.is_ok(),
        };
        // A dropped sender can never signal again; finish the delay.
        if !signalled && !sleep.is_elapsed() {
            sleep.await;
        }
    }
}
