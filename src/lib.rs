//! Glow trail engine: a grayscale diffusion framebuffer that bleeds and fades
//! every tick, fed by pointer strokes and evolved on a dedicated render thread.
//!
//! Hosts provide a [`present::Presenter`] to show frames, forward pointer
//! events through [`input::PointerRouter`], and route control messages through
//! [`api::Api`].

pub mod api;
pub mod error;
pub mod input;
pub mod present;
pub mod renderer;
pub mod settings;
pub mod surface;

pub use error::{Error, MessageError};
pub use renderer::{Command, Point, Renderer, StartOutcome, StopOutcome};
pub use settings::Settings;
pub use surface::{DecayParams, Surface};
