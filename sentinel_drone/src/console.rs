// Console presentation for sentinel events. Plain text, one block per analysis.

use cloud_sentinel::{CycleReport, HazardStatus, RunSummary, SentinelEvent, StopReason};
use tokio::sync::broadcast;

pub fn render_cycle(cycle: &CycleReport) -> String {
    let report = &cycle.report;
    let mut lines = vec![format!(
        "[Frame {}] ☁️  Analysis #{} ({:.2}s): Found {} hazards",
        cycle.frame_index,
        cycle.cycle,
        report.latency.as_secs_f64(),
        report.hazards.len()
    )];

    match report.status {
        HazardStatus::Error => {
            lines.push(format!("   🔴  UPLINK ERROR: {}", report.description));
        }
        _ if report.hazards.is_empty() => {
            lines.push("   🟢  STATUS: Safe".to_string());
        }
        _ => {
            lines.push(format!("   ⚠️  DETECTED: {}", report.hazards.join(", ")));
            let protocols: Vec<String> = cycle.recommendations.iter().map(|r| r.to_string()).collect();
            lines.push(format!("   🧠  PROTOCOL: {}", protocols.join(", ")));
        }
    }
    if !report.description.is_empty() && report.status != HazardStatus::Error {
        lines.push(format!("   📝  {}", report.description));
    }
    lines.join("\n")
}

pub fn render_summary(summary: &RunSummary) -> String {
    let reason = match &summary.stop {
        StopReason::StreamEnd => "Signal lost: end of feed.".to_string(),
        StopReason::Interrupted => "Stopped.".to_string(),
        StopReason::SourceFailed(cause) => format!("Feed failed: {cause}"),
    };
    format!(
        "🛑 {} {} frames, {} analyses ({} danger, {} errors)",
        reason, summary.frames, summary.cycles, summary.danger_cycles, summary.error_cycles
    )
}

/// Prints cycles and the final summary until the bus closes.
pub async fn print_events(mut rx: broadcast::Receiver<SentinelEvent>) {
    loop {
        match rx.recv().await {
            Ok(SentinelEvent::Started { source, cooldown }) => {
                println!("🚀 CLOUD SENTINEL: SYSTEM ONLINE");
                println!("📂 Feed: {source} | cooldown {}s", cooldown.as_secs_f64());
            }
            Ok(SentinelEvent::Cycle(cycle)) => println!("\n{}", render_cycle(&cycle)),
            Ok(SentinelEvent::Progress { .. }) => {}
            Ok(SentinelEvent::Stopped(summary)) => println!("\n{}", render_summary(&summary)),
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloud_sentinel::{HazardReport, ProtocolRecommendation, Recommendation};
    use std::time::Duration;

    fn cycle(report: HazardReport, recommendations: Vec<Recommendation>) -> CycleReport {
        CycleReport {
            cycle: 2,
            frame_index: 40,
            report: report.with_latency(Duration::from_millis(1530)),
            recommendations,
        }
    }

    #[test]
    fn danger_lists_hazards_and_protocols() {
        let text = render_cycle(&cycle(
            HazardReport::danger(vec!["roof damage".to_string()], ""),
            vec![Recommendation::Protocol(ProtocolRecommendation::new(
                "STRUCTURAL_LOCKDOWN",
                "BLACK-COLLAPSE",
            ))],
        ));
        assert!(text.starts_with("[Frame 40] ☁️  Analysis #2 (1.53s): Found 1 hazards"));
        assert!(text.contains("DETECTED: roof damage"));
        assert!(text.contains("PROTOCOL: STRUCTURAL_LOCKDOWN (BLACK-COLLAPSE)"));
    }

    #[test]
    fn safe_cycle_says_safe() {
        let text = render_cycle(&cycle(HazardReport::safe("quiet floor"), vec![Recommendation::ObservationOnly]));
        assert!(text.contains("STATUS: Safe"));
        assert!(text.contains("quiet floor"));
    }

    #[test]
    fn error_cycle_shows_cause_once() {
        let text = render_cycle(&cycle(HazardReport::error("HTTP 429"), vec![Recommendation::ObservationOnly]));
        assert!(text.contains("UPLINK ERROR: HTTP 429"));
        assert_eq!(text.matches("HTTP 429").count(), 1);
    }

    #[test]
    fn summary_names_the_stop_reason() {
        let summary = RunSummary {
            frames: 300,
            cycles: 4,
            danger_cycles: 1,
            error_cycles: 1,
            stop: StopReason::StreamEnd,
        };
        assert_eq!(
            render_summary(&summary),
            "🛑 Signal lost: end of feed. 300 frames, 4 analyses (1 danger, 1 errors)"
        );
    }
}
