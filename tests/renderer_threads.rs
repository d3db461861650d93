use glowtrail::present::{Frame, PresentDone, Presenter, present_channel};
use glowtrail::renderer::FpsReport;
use glowtrail::{Error, Point, Renderer, Settings};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const SIZE: (u32, u32) = (32, 32);

#[derive(Clone, Default)]
struct Recorded {
    frames: Arc<Mutex<Vec<Frame>>>,
    held: Arc<Mutex<Vec<PresentDone>>>,
}

/// Records frames. With `hold` set it keeps the completion tokens, like a slow display.
struct RecordingPresenter {
    recorded: Recorded,
    hold: bool,
}

impl Presenter for RecordingPresenter {
    fn size(&self) -> (u32, u32) {
        SIZE
    }

    fn present(&mut self, frame: Frame, done: PresentDone) -> Result<(), Error> {
        self.recorded.frames.lock().unwrap().push(frame);
        if self.hold {
            self.recorded.held.lock().unwrap().push(done);
        } else {
            done.complete();
        }
        Ok(())
    }
}

fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    false
}

fn fast_settings() -> Arc<Settings> {
    let settings = Arc::new(Settings::new());
    settings.set_fps(200);
    settings
}

#[test]
fn stroke_from_another_thread_is_presented_at_full_intensity() {
    let settings = fast_settings();
    settings.set_radius(0);
    let recorded = Recorded::default();
    let presenter = RecordingPresenter { recorded: recorded.clone(), hold: false };
    let renderer = Arc::new(Renderer::new(settings, presenter, |_: FpsReport| {}));
    renderer.start().unwrap();

    let pen = renderer.clone();
    thread::spawn(move || {
        pen.move_to(Point::new(4, 16));
        pen.draw_to(Point::new(27, 16));
    })
    .join()
    .unwrap();

    let lit = wait_for(Duration::from_secs(5), || {
        recorded
            .frames
            .lock()
            .unwrap()
            .iter()
            .any(|f| (4..=27).all(|x| f.image().get_pixel(x, 16)[0] == 255))
    });
    renderer.stop().unwrap();
    assert!(lit, "the whole segment should be white in some frame");
}

#[test]
fn slow_presenter_makes_the_loop_skip_frames() {
    let (fps_tx, fps_rx) = mpsc::channel::<FpsReport>();
    let recorded = Recorded::default();
    let presenter = RecordingPresenter { recorded: recorded.clone(), hold: true };
    let renderer = Renderer::new(fast_settings(), presenter, move |report: FpsReport| {
        let _ = fps_tx.send(report);
    });
    renderer.start().unwrap();

    let report = fps_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(report.skipped_frames > 0);
    assert!(report.processing_fps > report.rendering_fps);
    // never more than one present outstanding
    assert_eq!(recorded.frames.lock().unwrap().len(), 1);

    // releasing the token lets presentation resume
    recorded.held.lock().unwrap().clear();
    assert!(wait_for(Duration::from_secs(5), || recorded.frames.lock().unwrap().len() >= 2));
    renderer.stop().unwrap();
}

#[test]
fn channel_presenter_follows_host_resizes() {
    let (presenter, frames) = present_channel(8, 8);
    let renderer = Renderer::new(fast_settings(), presenter, |_: FpsReport| {});
    renderer.start().unwrap();

    let (frame, done) = frames.next_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!((frame.width(), frame.height()), (8, 8));
    done.complete();

    frames.set_size(12, 10);
    let resized = wait_for(Duration::from_secs(5), || match frames.try_next() {
        Some((frame, done)) => {
            done.complete();
            (frame.width(), frame.height()) == (12, 10)
        }
        None => false,
    });
    renderer.stop().unwrap();
    assert!(resized);
}

#[test]
fn stop_returns_after_the_loop_has_exited() {
    let recorded = Recorded::default();
    let presenter = RecordingPresenter { recorded: recorded.clone(), hold: false };
    let renderer = Renderer::new(fast_settings(), presenter, |_: FpsReport| {});
    renderer.start().unwrap();
    assert!(wait_for(Duration::from_secs(5), || !recorded.frames.lock().unwrap().is_empty()));

    renderer.stop().unwrap();
    assert!(!renderer.is_running());
    let count = recorded.frames.lock().unwrap().len();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(recorded.frames.lock().unwrap().len(), count);
}

#[test]
fn strokes_survive_one_frame_even_when_decay_clears_every_tick() {
    let settings = fast_settings();
    settings.set_radius(0);
    let recorded = Recorded::default();
    let presenter = RecordingPresenter { recorded: recorded.clone(), hold: false };
    let renderer = Renderer::new(settings.clone(), presenter, |_: FpsReport| {});
    renderer.start().unwrap();

    settings.set_decay_exp(15.0);
    renderer.move_to(Point::new(10, 10));
    renderer.draw_to(Point::new(20, 10));

    let stroke = |f: &Frame| (10..=20).all(|x| f.image().get_pixel(x, 10)[0] == 255);
    assert!(wait_for(Duration::from_secs(5), || {
        let frames = recorded.frames.lock().unwrap();
        frames.iter().position(stroke).is_some_and(|i| i + 1 < frames.len())
    }));
    renderer.stop().unwrap();

    // shown exactly once, then wiped by the next tick
    let frames = recorded.frames.lock().unwrap();
    let shown = frames.iter().position(stroke).unwrap();
    assert!(frames[shown + 1..].iter().all(|f| f.image().pixels().all(|p| p[0] == 0)));
}
