// Renderer: owns the render loop thread and the session resources it runs with.
// Other threads talk to it only through `move_to`, `draw_to` and `set_drawing`,
// which queue work for the loop instead of touching the surface.

pub mod commands;
pub mod fps;
mod session;
pub mod state;

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

use tracing::{info, trace, warn};

use crate::error::Error;
use crate::present::Presenter;
use crate::settings::Settings;

pub use commands::{Command, Point};
pub use fps::{FpsCounter, FpsReport, FpsSink, PresentOutcome};
pub use state::Lifecycle;

use commands::LoopEvent;
use session::LoopExit;
use state::SharedLifecycle;

const LOOP_THREAD_NAME: &str = "glow-render";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    AlreadyIdle,
}

/// What a session needs besides settings. Moved into the loop thread on start
/// and handed back when the thread is joined.
struct LoopParts {
    events: Receiver<LoopEvent>,
    presenter: Box<dyn Presenter>,
    sink: Box<dyn FpsSink>,
}

#[derive(Default)]
struct RendererState {
    parked: Option<LoopParts>,
    thread: Option<JoinHandle<Option<LoopParts>>>,
    generation: u64, // bumped on every start
}

pub struct Renderer {
    settings: Arc<Settings>,
    events: Sender<LoopEvent>,
    lifecycle: Arc<SharedLifecycle>,
    state: Mutex<RendererState>,
    // Outside `state`: `stop` must see it even while another thread holds the
    // state lock and is joining the loop.
    loop_thread: Mutex<Option<ThreadId>>,
}

impl Renderer {
    pub fn new<P, S>(settings: Arc<Settings>, presenter: P, sink: S) -> Self
    where
        P: Presenter + 'static,
        S: FpsSink + 'static,
    {
        let (events, events_rx) = mpsc::channel();
        let parts = LoopParts {
            events: events_rx,
            presenter: Box::new(presenter),
            sink: Box::new(sink),
        };
        Self {
            settings,
            events,
            lifecycle: Arc::new(SharedLifecycle::new()),
            state: Mutex::new(RendererState { parked: Some(parts), ..RendererState::default() }),
            loop_thread: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.get()
    }

    /// False once a session has been stopped, or ended itself on a loop failure.
    pub fn is_running(&self) -> bool {
        self.lifecycle().is_running()
    }

    // The lock only guards the thread handle and parked parts, never the surface.
    fn lock_state(&self) -> MutexGuard<'_, RendererState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_loop_thread(&self, id: Option<ThreadId>) {
        *self.loop_thread.lock().unwrap_or_else(PoisonError::into_inner) = id;
    }

    fn on_loop_thread(&self) -> bool {
        let current = thread::current().id();
        *self.loop_thread.lock().unwrap_or_else(PoisonError::into_inner) == Some(current)
    }

    /// Spawn the render loop. A no-op while a session is already running.
    pub fn start(&self) -> Result<StartOutcome, Error> {
        let mut state = self.lock_state();

        if let Some(handle) = state.thread.take() {
            if !handle.is_finished() && self.is_running() {
                state.thread = Some(handle);
                return Ok(StartOutcome::AlreadyRunning);
            }
            // The loop ended by itself; collect its parts before starting over.
            self.lifecycle.transition(Lifecycle::Stopping);
            self.reap(&mut state, handle)?;
        }

        let Some(parts) = state.parked.take() else {
            return Err(Error::SessionUnavailable);
        };
        let stale = parts.events.try_iter().count();
        if stale > 0 {
            trace!(stale, "discarding events queued while idle");
        }

        state.generation += 1;
        let generation = state.generation;
        let (handoff_tx, handoff_rx) = mpsc::sync_channel::<LoopParts>(1);
        let settings = self.settings.clone();
        let events = self.events.clone();
        let lifecycle = self.lifecycle.clone();

        let spawned = thread::Builder::new()
            .name(LOOP_THREAD_NAME.to_string())
            .spawn(move || {
                let mut parts = handoff_rx.recv().ok()?;
                let exit = session::run_loop(
                    settings,
                    generation,
                    &parts.events,
                    events,
                    &mut *parts.presenter,
                    &mut *parts.sink,
                );
                if exit == LoopExit::Failed {
                    // Reported to the host as a stopped session.
                    lifecycle.transition(Lifecycle::Stopping);
                }
                Some(parts)
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                state.parked = Some(parts);
                return Err(Error::LoopSpawn(err));
            }
        };

        self.set_loop_thread(Some(handle.thread().id()));
        self.lifecycle.transition(Lifecycle::Running);
        if let Err(mpsc::SendError(parts)) = handoff_tx.send(parts) {
            // Thread died before taking its parts; keep them for the next start.
            state.parked = Some(parts);
            self.lifecycle.transition(Lifecycle::Stopping);
            self.reap(&mut state, handle)?;
            return Err(Error::LoopPanicked);
        }
        state.thread = Some(handle);
        info!(generation, "renderer started");
        Ok(StartOutcome::Started)
    }

    /// Stop the render loop and wait until its thread has exited and released
    /// the surface. Must not be called from the loop thread itself.
    pub fn stop(&self) -> Result<StopOutcome, Error> {
        // Checked before the state lock: a concurrent stop holds it while joining us.
        if self.on_loop_thread() {
            return Err(Error::StopFromLoopThread);
        }
        let mut state = self.lock_state();

        let Some(handle) = state.thread.take() else {
            return Ok(StopOutcome::AlreadyIdle);
        };

        self.lifecycle.transition(Lifecycle::Stopping);
        // Loop already gone when this fails; the join below still succeeds.
        let _ = self.events.send(LoopEvent::Stop);
        self.reap(&mut state, handle)?;
        info!("renderer stopped");
        Ok(StopOutcome::Stopped)
    }

    fn reap(&self, state: &mut RendererState, handle: JoinHandle<Option<LoopParts>>) -> Result<(), Error> {
        let joined = handle.join();
        self.set_loop_thread(None);
        self.lifecycle.transition(Lifecycle::Idle);
        match joined {
            Ok(Some(parts)) => {
                state.parked = Some(parts);
                Ok(())
            }
            // handoff never happened; parts were put back by `start`
            Ok(None) => Ok(()),
            Err(_) => {
                warn!("render loop thread panicked, session resources are lost");
                Err(Error::LoopPanicked)
            }
        }
    }

    pub fn move_to(&self, point: Point) {
        self.submit(Command::MoveTo(point));
    }

    pub fn draw_to(&self, point: Point) {
        self.submit(Command::DrawTo(point));
    }

    pub fn set_drawing(&self, drawing: bool) {
        self.submit(Command::SetDrawing(drawing));
    }

    /// Queue a command for the next tick. Dropped when no session is running.
    pub fn submit(&self, command: Command) {
        if !self.is_running() {
            trace!(?command, "renderer not running, dropping command");
            return;
        }
        let _ = self.events.send(LoopEvent::Command(command));
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            warn!(%err, "renderer did not stop cleanly");
        }
    }
}
