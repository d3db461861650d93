// Host window: shows frames and turns mouse state into pointer events.
// Visual: a resizable window showing the glow surface in gray.

use glowtrail::Error;
use glowtrail::Point;
use glowtrail::input::PointerEvent;
use glowtrail::present::Frame;
use minifb::{Key, MouseButton, MouseMode, Window, WindowOptions};

pub struct Drawer {
    window: Window, // the on-screen window you see
    pointer: PointerTracker,
}

impl Drawer {
    /// Create a resizable window of the given size.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, Error> {
        let options = WindowOptions { resize: true, ..WindowOptions::default() };
        let window = Window::new(title, width, height, options)
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        Ok(Self { window, pointer: PointerTracker::default() })
    }

    /// Push one frame to the screen.
    /// Visual: the window immediately shows the new glow state.
    pub fn present(&mut self, frame: &Frame) -> Result<(), Error> {
        self.window
            .update_with_buffer(&frame.to_argb(), frame.width() as usize, frame.height() as usize)
            .map_err(|e| Error::WindowUpdate(e.to_string()))
    }

    /// Pump window events without a new frame (keeps input responsive).
    pub fn update(&mut self) {
        self.window.update();
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn esc_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }

    pub fn size(&self) -> (u32, u32) {
        let (w, h) = self.window.get_size();
        (w as u32, h as u32)
    }

    pub fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }

    /// Pointer events since the last call, derived from the current mouse state.
    pub fn pointer_events(&mut self) -> Vec<PointerEvent> {
        let pos = self
            .window
            .get_mouse_pos(MouseMode::Discard)
            .map(|(x, y)| Point::new(x as i32, y as i32));
        let down = self.window.get_mouse_down(MouseButton::Left);
        self.pointer.update(pos, down)
    }
}

/// minifb only reports state; this turns state changes into discrete events.
#[derive(Debug, Default)]
struct PointerTracker {
    down: bool,
    last: Option<Point>,
}

impl PointerTracker {
    fn update(&mut self, pos: Option<Point>, down: bool) -> Vec<PointerEvent> {
        let mut events = Vec::new();

        let Some(at) = pos else {
            if self.last.take().is_some() {
                events.push(PointerEvent::Leave);
            }
            self.down = false;
            return events;
        };

        let moved = self.last != Some(at);
        if down && !self.down {
            events.push(PointerEvent::Down(at));
        } else if moved {
            events.push(PointerEvent::Move(at));
        }
        if !down && self.down {
            events.push(PointerEvent::Up);
        }

        self.down = down;
        self.last = Some(at);
        events
    }
}
