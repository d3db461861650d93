// Desktop host for the glow trail engine.
// What you SEE:
// • A dark window. Hold Left Mouse and drag: a glowing trail follows the cursor,
//   blurs outward and fades away.
// • The title bar shows processing / presented FPS. ESC quits.
// Control channel: JSON messages on stdin (one per line), responses and FPS
// reports as JSON lines on stdout.

mod logging;
mod window;

use anyhow::{Context, Result};
use glowtrail::api::{Api, Outbound};
use glowtrail::input::PointerRouter;
use glowtrail::present::present_channel;
use glowtrail::renderer::FpsReport;
use glowtrail::{Renderer, Settings};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use window::Drawer;

const TITLE: &str = "Glow Trail";
const DEFAULT_SIZE: (u32, u32) = (640, 480);
const SIZE_ENV: &str = "GLOWTRAIL_SIZE";
const DEBUG_ENV: &str = "GLOWTRAIL_DEBUG";
const FRAME_WAIT: Duration = Duration::from_millis(5);

fn main() -> Result<()> {
    let debug = std::env::var(DEBUG_ENV).is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    logging::init(debug);

    /* --- Window + presentation channel ---
       Visual: window opens black; frames arrive from the render thread. */
    let (width, height) = window_size();
    let mut drawer = Drawer::new(TITLE, width as usize, height as usize).context("opening the window")?;
    let (presenter, frames) = present_channel(width, height);

    /* --- Renderer ---
       FPS reports come back to this thread for the title bar and stdout. */
    let (fps_tx, fps_rx) = mpsc::channel::<FpsReport>();
    let renderer = Arc::new(Renderer::new(
        Arc::new(Settings::new()),
        presenter,
        move |report: FpsReport| {
            let _ = fps_tx.send(report);
        },
    ));

    /* --- Control channel (stdin -> Api -> stdout) --- */
    let (out_tx, out_rx) = mpsc::channel::<Outbound>();
    let api = Api::new(renderer.clone());
    let _ = out_tx.send(api.settings_broadcast());
    spawn_stdout_writer(out_rx)?;
    spawn_control_reader(api, out_tx.clone())?;

    renderer.start().context("starting the renderer")?;

    /* ------------------------------ Main loop ------------------------------ */
    let mut router = PointerRouter::new();
    while drawer.is_open() && !drawer.esc_pressed() {
        /* 1) Mouse -> pen commands (queued for the render thread). */
        for event in drawer.pointer_events() {
            router.handle(event, &*renderer);
        }

        /* 2) Resizes reach the render thread through the shared extent. */
        let (w, h) = drawer.size();
        if w > 0 && h > 0 && (w, h) != frames.size() {
            frames.set_size(w, h);
            router.reset();
        }

        /* 3) Show the next frame if one is waiting, else just pump events. */
        match frames.next_timeout(FRAME_WAIT) {
            Some((frame, done)) => {
                drawer.present(&frame)?;
                done.complete();
            }
            None => drawer.update(),
        }

        /* 4) FPS (title bar + control channel) */
        for report in fps_rx.try_iter() {
            drawer.set_title(&format!(
                "{TITLE} | {:.1} FPS processed | {:.1} FPS presented",
                report.processing_fps, report.rendering_fps
            ));
            let _ = out_tx.send(Outbound::FpsBroadcast(report));
        }
    }

    renderer.stop().context("stopping the renderer")?;
    Ok(())
}

/// `GLOWTRAIL_SIZE=WIDTHxHEIGHT`, falling back to 640x480.
fn window_size() -> (u32, u32) {
    std::env::var(SIZE_ENV)
        .ok()
        .and_then(|raw| parse_size(&raw))
        .unwrap_or(DEFAULT_SIZE)
}

fn parse_size(raw: &str) -> Option<(u32, u32)> {
    let (w, h) = raw.trim().split_once(['x', 'X'])?;
    let (w, h) = (w.parse().ok()?, h.parse().ok()?);
    (w > 0 && h > 0).then_some((w, h))
}

fn spawn_control_reader(api: Api, out: Sender<Outbound>) -> Result<()> {
    thread::Builder::new()
        .name("glow-control".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                if let Some(response) = api.handle_text(&line) {
                    if out.send(response).is_err() {
                        break;
                    }
                }
            }
            tracing::debug!("control channel closed");
        })
        .context("spawning the control thread")?;
    Ok(())
}

fn spawn_stdout_writer(messages: Receiver<Outbound>) -> Result<()> {
    thread::Builder::new()
        .name("glow-stdout".to_string())
        .spawn(move || {
            let stdout = io::stdout();
            for message in messages {
                let line = match message.to_json() {
                    Ok(line) => line,
                    Err(err) => {
                        tracing::warn!(%err, ?message, "dropping outbound message that cannot be encoded");
                        continue;
                    }
                };
                let mut out = stdout.lock();
                if writeln!(out, "{line}").and_then(|_| out.flush()).is_err() {
                    break;
                }
            }
        })
        .context("spawning the stdout writer")?;
    Ok(())
}
