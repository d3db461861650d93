// Work items handed to the render loop thread.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Pen commands, applied on the loop thread in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MoveTo(Point),
    DrawTo(Point),
    SetDrawing(bool),
}

/// Everything that arrives on the loop thread's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopEvent {
    Command(Command),
    /// Carries the generation of the session whose present finished.
    PresentCompleted(u64),
    Stop,
}
