//! Error types.
//!
//! Decode errors never escape [`AnimatedTexture`](crate::AnimatedTexture):
//! a texture that fails to decode is left empty and the error is logged.
//! Overlay errors are returned from [`run`](crate::window::run) and surfaced
//! by [`OverlaySession::stop`](crate::OverlaySession::stop).

/// Failure to turn a file or byte buffer into RGBA frames.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The file could not be opened or read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The decoder rejected the data.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    /// The container decoded but produced no frames.
    #[error("image contains no frames")]
    Empty,
}

/// Failure to bring up or drive an overlay window.
#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    /// The windowing event loop could not be created or pumped.
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    /// An earlier attempt to build the event loop on this thread failed, and
    /// winit allows only one attempt per process.
    #[error("event loop unavailable after earlier failure: {0}")]
    EventLoopUnavailable(String),
    /// The window (or a GL config for it) could not be created.
    #[error("window creation failed: {0}")]
    WindowCreation(String),
    /// GL context or surface error.
    #[error("gl error: {0}")]
    Gl(#[from] glutin::error::Error),
    /// The native window handle was unavailable.
    #[error("window handle error: {0}")]
    Handle(#[from] raw_window_handle::HandleError),
    /// The GUI painter failed to compile its shaders.
    #[error("painter error: {0}")]
    Painter(String),
    /// The render thread could not be spawned.
    #[error("failed to spawn render thread: {0}")]
    Spawn(std::io::Error),
    /// The render loop panicked, or the render thread is gone.
    #[error("render thread panicked")]
    RenderThreadPanicked,
    /// This platform only runs event loops on the main thread.
    #[error("{0} requires the event loop on the main thread; call `window::run` from `main`")]
    MainThreadOnly(&'static str),
}
