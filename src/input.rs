// Pointer events -> pen commands.
// Visual: press and drag paints a glowing trail; releasing or leaving the
// window lifts the pen.

use crate::renderer::{Point, Renderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up,
    Leave,
}

/// Anything that accepts pen commands. `Renderer` queues them for its loop.
pub trait StrokeTarget {
    fn move_to(&self, point: Point);
    fn draw_to(&self, point: Point);
    fn set_drawing(&self, drawing: bool);
}

impl StrokeTarget for Renderer {
    fn move_to(&self, point: Point) {
        Renderer::move_to(self, point);
    }

    fn draw_to(&self, point: Point) {
        Renderer::draw_to(self, point);
    }

    fn set_drawing(&self, drawing: bool) {
        Renderer::set_drawing(self, drawing);
    }
}

/// Tracks whether the button is held so moves only draw while pressed.
#[derive(Debug, Default)]
pub struct PointerRouter {
    drawing: bool,
}

impl PointerRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    /// Forward one event; returns false when it produced no command
    /// (a move with the button up).
    pub fn handle<T: StrokeTarget + ?Sized>(&mut self, event: PointerEvent, target: &T) -> bool {
        match event {
            PointerEvent::Down(at) => {
                self.drawing = true;
                target.set_drawing(true);
                target.move_to(at);
            }
            PointerEvent::Move(at) => {
                if !self.drawing {
                    return false;
                }
                target.draw_to(at);
            }
            PointerEvent::Up | PointerEvent::Leave => {
                self.drawing = false;
                target.set_drawing(false);
            }
        }
        true
    }

    /// The view changed under the pointer (e.g. resize): forget the pressed state.
    pub fn reset(&mut self) {
        self.drawing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::Command;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<Command>>);

    impl StrokeTarget for Recorder {
        fn move_to(&self, point: Point) {
            self.0.borrow_mut().push(Command::MoveTo(point));
        }
        fn draw_to(&self, point: Point) {
            self.0.borrow_mut().push(Command::DrawTo(point));
        }
        fn set_drawing(&self, drawing: bool) {
            self.0.borrow_mut().push(Command::SetDrawing(drawing));
        }
    }

    #[test]
    fn press_drag_release_issues_commands_in_order() {
        let target = Recorder::default();
        let mut router = PointerRouter::new();

        assert!(!router.handle(PointerEvent::Move(Point::new(1, 1)), &target));
        assert!(router.handle(PointerEvent::Down(Point::new(2, 3)), &target));
        assert!(router.handle(PointerEvent::Move(Point::new(4, 5)), &target));
        assert!(router.handle(PointerEvent::Up, &target));
        assert!(!router.handle(PointerEvent::Move(Point::new(9, 9)), &target));

        assert_eq!(
            target.0.into_inner(),
            vec![
                Command::SetDrawing(true),
                Command::MoveTo(Point::new(2, 3)),
                Command::DrawTo(Point::new(4, 5)),
                Command::SetDrawing(false),
            ]
        );
    }

    #[test]
    fn leaving_lifts_the_pen() {
        let target = Recorder::default();
        let mut router = PointerRouter::new();
        router.handle(PointerEvent::Down(Point::new(0, 0)), &target);
        assert!(router.is_drawing());
        router.handle(PointerEvent::Leave, &target);
        assert!(!router.is_drawing());
        router.handle(PointerEvent::Move(Point::new(3, 3)), &target);
        assert_eq!(target.0.borrow().last(), Some(&Command::SetDrawing(false)));
    }

    #[test]
    fn reset_stops_drawing_on_moves() {
        let target = Recorder::default();
        let mut router = PointerRouter::new();
        router.handle(PointerEvent::Down(Point::new(0, 0)), &target);
        router.reset();
        assert!(!router.handle(PointerEvent::Move(Point::new(3, 3)), &target));
        assert_eq!(target.0.borrow().len(), 2);
    }
}
