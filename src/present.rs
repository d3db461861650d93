// Presentation channel: hands finished frames to whoever shows them.
// Visual expectation: each `Frame` is exactly what the window displays for one update.

use image::{DynamicImage, GrayImage, RgbaImage};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TrySendError};
use std::time::Duration;

use crate::error::Error;
use crate::renderer::commands::LoopEvent;

/// A copy of the surface's front buffer at present time.
#[derive(Debug, Clone)]
pub struct Frame {
    image: GrayImage,
}

impl Frame {
    pub fn new(image: GrayImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    /// 0xFFRRGGBB per pixel with the intensity in all three channels.
    /// Visual: a gray image on any window that takes packed u32 pixels (minifb).
    pub fn to_argb(&self) -> Vec<u32> {
        self.image.pixels().map(|p| gray_to_argb(p[0])).collect()
    }

    /// Opaque RGBA copy for hosts that want byte channels.
    pub fn to_rgba8(&self) -> RgbaImage {
        DynamicImage::ImageLuma8(self.image.clone()).to_rgba8()
    }
}

#[inline]
pub fn gray_to_argb(v: u8) -> u32 {
    let v = v as u32;
    0xFF00_0000 | (v << 16) | (v << 8) | v
}

/// Completion token for one present. Completing it, or just dropping it,
/// tells the render loop the presentation channel is free again.
/// A token outliving its session is ignored by the next one.
#[derive(Debug)]
pub struct PresentDone {
    events: Option<Sender<LoopEvent>>,
    generation: u64,
}

impl PresentDone {
    pub(crate) fn new(events: Sender<LoopEvent>, generation: u64) -> Self {
        Self { events: Some(events), generation }
    }

    pub fn complete(self) {}
}

impl Drop for PresentDone {
    fn drop(&mut self) {
        if let Some(events) = self.events.take() {
            // loop already gone: nobody is waiting
            let _ = events.send(LoopEvent::PresentCompleted(self.generation));
        }
    }
}

/// Host side of presentation. Owned by the render loop thread while a session runs.
pub trait Presenter: Send {
    /// Current extent of the display surface.
    fn size(&self) -> (u32, u32);

    /// Accept a frame and return immediately; finish `done` once it is shown.
    fn present(&mut self, frame: Frame, done: PresentDone) -> Result<(), Error>;
}

/// Width and height packed into one atomic so a reader never sees half a resize.
#[derive(Debug)]
pub struct Extent(AtomicU64);

impl Extent {
    pub fn new(width: u32, height: u32) -> Self {
        Self(AtomicU64::new(pack(width, height)))
    }

    pub fn get(&self) -> (u32, u32) {
        let raw = self.0.load(Ordering::Relaxed);
        ((raw >> 32) as u32, raw as u32)
    }

    pub fn set(&self, width: u32, height: u32) {
        self.0.store(pack(width, height), Ordering::Relaxed);
    }
}

#[inline]
fn pack(width: u32, height: u32) -> u64 {
    ((width as u64) << 32) | height as u64
}

type Handoff = (Frame, PresentDone);

/// Presenter that passes frames to another thread (usually the window thread).
pub struct ChannelPresenter {
    frames: SyncSender<Handoff>,
    extent: Arc<Extent>,
}

/// Receiving end of a `ChannelPresenter`, polled by the host.
pub struct PresentQueue {
    frames: Receiver<Handoff>,
    extent: Arc<Extent>,
}

/// One frame slot: the render loop never has more than one present in flight.
pub fn present_channel(width: u32, height: u32) -> (ChannelPresenter, PresentQueue) {
    let (tx, rx) = mpsc::sync_channel(1);
    let extent = Arc::new(Extent::new(width, height));
    (
        ChannelPresenter { frames: tx, extent: extent.clone() },
        PresentQueue { frames: rx, extent },
    )
}

impl Presenter for ChannelPresenter {
    fn size(&self) -> (u32, u32) {
        self.extent.get()
    }

    fn present(&mut self, frame: Frame, done: PresentDone) -> Result<(), Error> {
        // On failure the returned handoff is dropped here, which completes `done`.
        match self.frames.try_send((frame, done)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(Error::Present("frame slot is occupied".into())),
            Err(TrySendError::Disconnected(_)) => Err(Error::Present("host stopped listening".into())),
        }
    }
}

impl PresentQueue {
    pub fn try_next(&self) -> Option<(Frame, PresentDone)> {
        self.frames.try_recv().ok()
    }

    /// Wait up to `timeout` for a frame; `None` on timeout or when the sender is gone.
    pub fn next_timeout(&self, timeout: Duration) -> Option<(Frame, PresentDone)> {
        match self.frames.recv_timeout(timeout) {
            Ok(handoff) => Some(handoff),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Report a new display size; the render loop reallocates on its next tick.
    pub fn set_size(&self, width: u32, height: u32) {
        self.extent.set(width, height);
    }

    pub fn size(&self) -> (u32, u32) {
        self.extent.get()
    }
}
