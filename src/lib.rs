//! Always-on-top overlay windows drawn with [egui] over OpenGL via [glow],
//! plus textures that play animated images.
//!
//! An [`OverlaySession`] opens one window on a background render thread and
//! calls a draw callback once per frame inside a single full-window panel.
//! In overlay mode the window is borderless, transparent, always on top, and
//! click-through where the platform supports it.
//!
//! [`AnimatedTexture`] decodes a still or animated image (GIF, APNG, animated
//! WebP) into a ring of uploaded frames and advances through them as their
//! delays expire. Frames can be box-blurred on the CPU in place.
//!
//! # Features
//!
//! - **Explicit sessions**: each session owns its running flag.
//!   [`OverlaySession::stop`] only returns once the render loop has exited,
//!   after which [`OverlaySession::start`] can open the window again.
//! - **Soft decode failures**: an image that cannot be decoded yields an
//!   empty texture that draws nothing, never an error at draw time.
//! - **Single-step playback**: each poll advances at most one frame, so slow
//!   polling stretches delays but never skips frames.
//! - **Idempotent blur**: [`AnimatedTexture::ensure_blurred`] applies blur
//!   passes only until the requested count is reached.
//!
//! # Threading
//!
//! All windowing, GL, and egui calls happen on the render thread. Textures
//! are not internally synchronized; create and use them from the draw
//! callback.
//!
//! # Platforms
//!
//! Linux (X11 and Wayland) and Windows run the render loop on a background
//! thread. macOS requires the event loop on the main thread, so hosts there
//! call [`window::run`] from `main` instead of using a session.
//!
//! [egui]: https://docs.rs/egui
//! [glow]: https://docs.rs/glow

mod animated;
mod blur;
mod config;
pub mod decode;
mod error;
pub mod platform;
mod session;
mod store;
mod timer;
pub mod window;

pub use animated::AnimatedTexture;
pub use blur::box_blur;
pub use config::{OverlayConfig, DEFAULT_BASE_SIZE, DEFAULT_CLEAR_COLOR, DEFAULT_FONT_SIZE};
pub use error::{DecodeError, OverlayError};
pub use session::OverlaySession;
pub use store::{EguiTexture, EguiTextures, TextureStore};
pub use timer::FrameTimer;
pub use window::OverlayEvent;
