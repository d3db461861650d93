// Error types for the engine.
// Every variant states *where* things went wrong.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Window init error: {0}")]
    WindowInit(String), // Creating the host window failed
    #[error("Window update error: {0}")]
    WindowUpdate(String), // Pushing a frame to the host window failed
    #[error("Present error: {0}")]
    Present(String), // The presentation channel refused a frame
    #[error("failed to spawn render loop thread: {0}")]
    LoopSpawn(#[source] std::io::Error),
    #[error("render loop thread panicked")]
    LoopPanicked,
    #[error("render session resources were lost after a loop panic")]
    SessionUnavailable,
    #[error("stop was called from the render loop thread")]
    StopFromLoopThread,
    #[error("clock failure: {0}")]
    Clock(&'static str),
}

/// A control message that could not be understood. Never fatal; the message is
/// bounced back to the sender with this description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("message is not valid JSON")]
    NotJson,
    #[error("message is not an object")]
    NotAnObject,
    #[error("message has no string subject")]
    MissingSubject,
    #[error("unknown subject `{0}`")]
    UnknownSubject(String),
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },
}
