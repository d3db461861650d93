// Frame-rate measurement: frames processed vs frames actually presented.

use serde::Serialize;
use std::time::{Duration, Instant};

const MEASURE_EVERY: Duration = Duration::from_secs(1);

/// Rates measured over the last window (at least one second).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FpsReport {
    pub processing_fps: f32,
    pub rendering_fps: f32,
    #[serde(skip)]
    pub skipped_frames: u32,
}

/// Receives a report roughly once per second, on the loop thread.
pub trait FpsSink: Send {
    fn report(&mut self, report: FpsReport);
}

impl<F> FpsSink for F
where
    F: FnMut(FpsReport) + Send,
{
    fn report(&mut self, report: FpsReport) {
        self(report)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    Skipped, // previous present still in flight
    Failed,
}

#[derive(Debug)]
pub struct FpsCounter {
    processed: u32,
    presented: u32,
    skipped: u32,
    since: Instant,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self { processed: 0, presented: 0, skipped: 0, since: now }
    }

    /// Count one tick. Returns a report and resets once a second has passed.
    pub fn record(&mut self, now: Instant, outcome: PresentOutcome) -> Option<FpsReport> {
        self.processed += 1;
        match outcome {
            PresentOutcome::Presented => self.presented += 1,
            PresentOutcome::Skipped => self.skipped += 1,
            PresentOutcome::Failed => {}
        }

        let elapsed = now.checked_duration_since(self.since)?;
        if elapsed < MEASURE_EVERY {
            return None;
        }

        let secs = elapsed.as_secs_f32();
        let report = FpsReport {
            processing_fps: self.processed as f32 / secs,
            rendering_fps: self.presented as f32 / secs,
            skipped_frames: self.skipped,
        };
        *self = Self::new(now);
        Some(report)
    }
}
