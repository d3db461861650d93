use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Running,
    Stopping,
}

impl Lifecycle {
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Running => 1,
            Self::Stopping => 2,
        }
    }
}

pub fn can_transition(from: Lifecycle, to: Lifecycle) -> bool {
    matches!(
        (from, to),
        (Lifecycle::Idle, Lifecycle::Running)
            | (Lifecycle::Running, Lifecycle::Stopping)
            | (Lifecycle::Stopping, Lifecycle::Idle)
    ) || from == to
}

/// Lifecycle shared between the renderer handle and its loop thread.
#[derive(Debug)]
pub(crate) struct SharedLifecycle(AtomicU8);

impl SharedLifecycle {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(Lifecycle::Idle.as_u8()))
    }

    pub(crate) fn get(&self) -> Lifecycle {
        Lifecycle::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn transition(&self, to: Lifecycle) {
        let from = self.get();
        if !can_transition(from, to) {
            tracing::debug!(?from, ?to, "unexpected render lifecycle transition");
        }
        self.0.store(to.as_u8(), Ordering::Release);
    }
}
