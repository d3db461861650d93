// One render session: the surface, the pen and the tick loop that evolves them.
// Everything in here lives on the loop thread; other threads only reach it
// through the event queue.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use super::commands::{Command, LoopEvent, Point};
use super::fps::{FpsCounter, FpsSink, PresentOutcome};
use crate::error::Error;
use crate::present::{Frame, PresentDone, Presenter};
use crate::settings::Settings;
use crate::surface::Surface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Stop,
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopExit {
    Requested,
    Failed,
}

pub(crate) struct Session {
    surface: Surface,
    settings: Arc<Settings>,
    generation: u64, // tags this session's PresentDone tokens
    pen: Option<Point>,
    strokes: Vec<(Point, Point)>, // DrawTo segments waiting for the next tick
    drawing: bool,
    present_in_flight: bool,
    skipped_frames: u64,
    fps: FpsCounter,
    events: Sender<LoopEvent>, // cloned into each PresentDone
}

impl Session {
    pub(crate) fn new(
        settings: Arc<Settings>,
        generation: u64,
        (width, height): (u32, u32),
        events: Sender<LoopEvent>,
        now: Instant,
    ) -> Self {
        Self {
            surface: Surface::new(width, height),
            settings,
            generation,
            pen: None,
            strokes: Vec::new(),
            drawing: false,
            present_in_flight: false,
            skipped_frames: 0,
            fps: FpsCounter::new(now),
            events,
        }
    }

    pub(crate) fn surface(&self) -> &Surface {
        &self.surface
    }

    #[cfg(test)]
    pub(crate) fn present_in_flight(&self) -> bool {
        self.present_in_flight
    }

    pub(crate) fn skipped_frames(&self) -> u64 {
        self.skipped_frames
    }

    pub(crate) fn apply(&mut self, event: LoopEvent) -> Flow {
        match event {
            LoopEvent::Command(command) => self.apply_command(command),
            LoopEvent::PresentCompleted(generation) if generation == self.generation => {
                self.present_in_flight = false;
            }
            LoopEvent::PresentCompleted(generation) => {
                trace!(generation, current = self.generation, "ignoring completion from an older session");
            }
            LoopEvent::Stop => return Flow::Stop,
        }
        Flow::Continue
    }

    fn apply_command(&mut self, command: Command) {
        match command {
            Command::MoveTo(to) => self.pen = Some(to),
            Command::DrawTo(to) => {
                // No stroke from an unknown position: the first point only moves the pen.
                if let Some(from) = self.pen {
                    self.strokes.push((from, to));
                }
                self.pen = Some(to);
            }
            Command::SetDrawing(drawing) => self.drawing = drawing,
        }
    }

    /// Apply everything currently queued, in order, without blocking.
    pub(crate) fn drain(&mut self, events: &Receiver<LoopEvent>) -> Flow {
        loop {
            match events.try_recv() {
                Ok(event) => {
                    if self.apply(event) == Flow::Stop {
                        return Flow::Stop;
                    }
                }
                Err(TryRecvError::Empty) => return Flow::Continue,
                Err(TryRecvError::Disconnected) => return Flow::Stop,
            }
        }
    }

    /// Evolve, rasterize pending strokes, present (or skip) and measure.
    /// Commands must already be applied.
    pub(crate) fn tick(&mut self, presenter: &mut dyn Presenter, sink: &mut dyn FpsSink, now: Instant) {
        let size = presenter.size();
        if size != self.surface.dimensions() {
            info!(width = size.0, height = size.1, "display resized, reallocating surface");
            self.surface = Surface::new(size.0, size.1);
            self.pen = None;
            self.strokes.clear();
        }

        self.surface.decay(self.settings.decay_params());

        // Strokes land after the decay so they are presented at full intensity.
        let radius = self.settings.radius();
        for (from, to) in self.strokes.drain(..) {
            self.surface.line(from.x, from.y, to.x, to.y, radius);
        }
        if self.drawing {
            if let Some(pen) = self.pen {
                self.surface.circle(pen.x, pen.y, radius);
            }
        }

        let outcome = self.present(presenter);

        if let Some(report) = self.fps.record(now, outcome) {
            debug!(
                processing_fps = report.processing_fps,
                rendering_fps = report.rendering_fps,
                skipped = report.skipped_frames,
                "frame rates"
            );
            sink.report(report);
        }
    }

    // At most one present in flight; otherwise this tick's frame is dropped.
    fn present(&mut self, presenter: &mut dyn Presenter) -> PresentOutcome {
        if self.present_in_flight {
            self.skipped_frames += 1;
            trace!(total = self.skipped_frames, "present still in flight, skipping frame");
            return PresentOutcome::Skipped;
        }

        let frame = Frame::new(self.surface.front().clone());
        self.present_in_flight = true;
        match presenter.present(frame, PresentDone::new(self.events.clone(), self.generation)) {
            Ok(()) => PresentOutcome::Presented,
            Err(err) => {
                // the dropped token clears the in-flight flag on the next drain
                warn!(%err, "present failed");
                PresentOutcome::Failed
            }
        }
    }
}

/// Sleep length for one tick at `fps`.
pub(crate) fn tick_interval(fps: u8) -> Duration {
    Duration::from_micros(1_000_000 / fps.max(1) as u64)
}

/// Drive ticks until stopped. Runs on the dedicated loop thread.
pub(crate) fn run_loop(
    settings: Arc<Settings>,
    generation: u64,
    events: &Receiver<LoopEvent>,
    events_tx: Sender<LoopEvent>,
    presenter: &mut dyn Presenter,
    sink: &mut dyn FpsSink,
) -> LoopExit {
    let mut session = Session::new(settings.clone(), generation, presenter.size(), events_tx, Instant::now());
    let mut early: VecDeque<LoopEvent> = VecDeque::new(); // arrived while sleeping
    let (width, height) = session.surface().dimensions();
    info!(width, height, generation, "render session started");

    let exit = loop {
        let tick_start = Instant::now();

        /* 1) Commands first, in submission order. */
        if early.drain(..).any(|event| session.apply(event) == Flow::Stop) {
            break LoopExit::Requested;
        }
        if session.drain(events) == Flow::Stop {
            break LoopExit::Requested;
        }

        /* 2-5) Evolve, stamp, present, measure. */
        session.tick(presenter, sink, tick_start);

        /* 6) Wait out the rest of the interval; no debt carried over. */
        let deadline = match next_deadline(tick_start, settings.fps()) {
            Ok(deadline) => deadline,
            Err(err) => {
                warn!(%err, "render loop cannot schedule the next tick");
                break LoopExit::Failed;
            }
        };
        match wait_until(events, deadline, &mut early) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Stop) => break LoopExit::Requested,
            Err(err) => {
                warn!(%err, "render loop lost its event queue");
                break LoopExit::Failed;
            }
        }
    };

    info!(?exit, skipped = session.skipped_frames(), "render session finished");
    exit
}

fn next_deadline(tick_start: Instant, fps: u8) -> Result<Instant, Error> {
    tick_start
        .checked_add(tick_interval(fps))
        .ok_or(Error::Clock("tick deadline overflows the clock"))
}

// Block for new events until `deadline`; a stop request ends the wait at once.
fn wait_until(
    events: &Receiver<LoopEvent>,
    deadline: Instant,
    early: &mut VecDeque<LoopEvent>,
) -> Result<Flow, Error> {
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(Flow::Continue);
        }
        match events.recv_timeout(remaining) {
            Ok(LoopEvent::Stop) => return Ok(Flow::Stop),
            Ok(event) => early.push_back(event),
            Err(RecvTimeoutError::Timeout) => return Ok(Flow::Continue),
            Err(RecvTimeoutError::Disconnected) => return Err(Error::Clock("event queue disconnected")),
        }
    }
}
