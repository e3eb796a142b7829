use std::collections::BTreeMap;
use std::time::Instant;

use crate::alerting::domain::alert_state_machine::AlertEvent;

/// Observer for the watch loop: progress, stage timings, alerts.
pub trait PipelineLogger: Send {
    /// `total` is `None` for live sources.
    fn progress(&mut self, current: usize, total: Option<usize>);

    /// Duration of one named stage for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Point-in-time value such as the live item count.
    fn metric(&mut self, name: &str, value: f64);

    /// Records an alert for the summary. Console output is up to the
    /// renderers.
    fn alert(&mut self, event: &AlertEvent);

    fn info(&mut self, message: &str);

    fn summary(&self) {}
}

/// Discards everything. Used by tests.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: Option<usize>) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn alert(&mut self, _event: &AlertEvent) {}
    fn info(&mut self, _message: &str) {}
}

/// Aggregates per-stage timings and metrics and writes through the `log`
/// crate. Progress lines are throttled to every `throttle_frames` frames.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    timings: BTreeMap<String, Series>,
    metrics: BTreeMap<String, Series>,
    alerts: Vec<AlertEvent>,
    frames_seen: usize,
    start_time: Instant,
}

/// Running sum and count; the loop may run indefinitely on a camera, so
/// samples are not kept.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Series {
    sum: f64,
    count: usize,
    max: f64,
}

impl Series {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
        self.max = self.max.max(value);
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            alerts: Vec::new(),
            frames_seen: 0,
            start_time: Instant::now(),
        }
    }

    pub fn alerts(&self) -> &[AlertEvent] {
        &self.alerts
    }

    pub fn mean_timing(&self, stage: &str) -> Option<f64> {
        self.timings.get(stage).map(Series::mean)
    }

    pub fn mean_metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).map(Series::mean)
    }

    /// `None` until at least one frame was reported.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames_seen == 0 {
            return None;
        }
        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Watch summary ({} frames, {:.1}s, {} alerts):",
            self.frames_seen,
            elapsed_s,
            self.alerts.len()
        )];

        for (stage, series) in &self.timings {
            lines.push(format!(
                "  {stage:8}: avg {:6.1}ms  max {:6.1}ms",
                series.mean(),
                series.max
            ));
        }
        for (name, series) in &self.metrics {
            lines.push(format!("  {name}: avg {:.1}  max {:.0}", series.mean(), series.max));
        }
        for alert in &self.alerts {
            lines.push(format!(
                "  alert: item {} at frame {} ({})",
                alert.item_id, alert.frame_index, alert.reason
            ));
        }
        if elapsed_s > 0.0 {
            lines.push(format!(
                "  Throughput: {:.1} fps",
                self.frames_seen as f64 / elapsed_s
            ));
        }
        Some(lines.join("\n"))
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: Option<usize>) {
        self.frames_seen = self.frames_seen.max(current);
        let due = current % self.throttle_frames == 0 || Some(current) == total;
        if !due {
            return;
        }
        match total {
            Some(total) if total > 0 => {
                let pct = current as f64 / total as f64 * 100.0;
                log::info!("Watching: {current}/{total} frames ({pct:.1}%)");
            }
            _ => log::info!("Watching: {current} frames"),
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings.entry(stage.to_string()).or_default().push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
    }

    fn alert(&mut self, event: &AlertEvent) {
        self.alerts.push(event.clone());
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
