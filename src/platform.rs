//! Per-platform capabilities, chosen once at compile time.
//!
//! The window loop asks [`current`] what the platform can do instead of
//! branching on the target itself.

use std::path::Path;

use tracing::debug;
use winit::event_loop::EventLoopBuilder;
use winit::window::{Icon, WindowAttributes};

use crate::window::OverlayEvent;

/// What the overlay can rely on for the target platform.
#[derive(Debug)]
pub struct PlatformCaps {
    /// Short platform name for logs.
    pub name: &'static str,
    /// System font files tried in order before egui's built-in fonts.
    pub font_candidates: &'static [&'static str],
    /// Whether the window can ignore the mouse (click-through).
    pub click_through: bool,
    /// Whether the event loop may live on a thread other than `main`.
    pub render_thread_supported: bool,
    pub(crate) prepare_event_loop: fn(&mut EventLoopBuilder<OverlayEvent>),
    pub(crate) apply_taskbar_icon: fn(WindowAttributes, Icon) -> WindowAttributes,
}

#[cfg(target_os = "windows")]
static CURRENT: PlatformCaps = PlatformCaps {
    name: "windows",
    font_candidates: &["C:/Windows/Fonts/segoeui.ttf"],
    click_through: true,
    render_thread_supported: true,
    prepare_event_loop: windows::allow_any_thread,
    apply_taskbar_icon: windows::taskbar_icon,
};

#[cfg(target_os = "linux")]
static CURRENT: PlatformCaps = PlatformCaps {
    name: "linux",
    font_candidates: &[
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    ],
    click_through: true,
    render_thread_supported: true,
    prepare_event_loop: linux::allow_any_thread,
    apply_taskbar_icon: no_taskbar_icon,
};

#[cfg(target_os = "macos")]
static CURRENT: PlatformCaps = PlatformCaps {
    name: "macos",
    font_candidates: &["/System/Library/Fonts/Supplemental/Arial.ttf"],
    click_through: true,
    render_thread_supported: false,
    prepare_event_loop: keep_event_loop,
    apply_taskbar_icon: no_taskbar_icon,
};

#[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
static CURRENT: PlatformCaps = PlatformCaps {
    name: "other",
    font_candidates: &[],
    click_through: false,
    render_thread_supported: false,
    prepare_event_loop: keep_event_loop,
    apply_taskbar_icon: no_taskbar_icon,
};

/// Capabilities of the platform this crate was built for.
#[must_use]
pub fn current() -> &'static PlatformCaps {
    &CURRENT
}

/// Read the first font file in `candidates` that exists.
#[must_use]
pub fn read_first_font<'a>(candidates: &[&'a str]) -> Option<(&'a str, Vec<u8>)> {
    candidates.iter().find_map(|&path| match std::fs::read(Path::new(path)) {
        Ok(bytes) => Some((path, bytes)),
        Err(err) => {
            debug!(path, %err, "font candidate unavailable");
            None
        }
    })
}

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
fn keep_event_loop(_builder: &mut EventLoopBuilder<OverlayEvent>) {}

#[cfg(not(target_os = "windows"))]
fn no_taskbar_icon(attributes: WindowAttributes, _icon: Icon) -> WindowAttributes {
    attributes
}

#[cfg(target_os = "linux")]
mod linux {
    use winit::event_loop::EventLoopBuilder;
    use winit::platform::x11::EventLoopBuilderExtX11;

    use crate::window::OverlayEvent;

    // Covers Wayland too; both backends share the flag.
    pub(super) fn allow_any_thread(builder: &mut EventLoopBuilder<OverlayEvent>) {
        builder.with_any_thread(true);
    }
}

#[cfg(target_os = "windows")]
mod windows {
    use winit::event_loop::EventLoopBuilder;
    use winit::platform::windows::{EventLoopBuilderExtWindows, WindowAttributesExtWindows};
    use winit::window::{Icon, WindowAttributes};

    use crate::window::OverlayEvent;

    pub(super) fn allow_any_thread(builder: &mut EventLoopBuilder<OverlayEvent>) {
        builder.with_any_thread(true);
    }

    pub(super) fn taskbar_icon(attributes: WindowAttributes, icon: Icon) -> WindowAttributes {
        attributes.with_taskbar_icon(Some(icon))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn first_existing_font_wins() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("font.ttf");
        std::fs::write(&present, b"fake font").unwrap();
        let missing = dir.path().join("missing.ttf");

        let missing = missing.to_str().unwrap();
        let present = present.to_str().unwrap();
        let (path, bytes) = read_first_font(&[missing, present]).unwrap();
        assert_eq!(path, present);
        assert_eq!(bytes, b"fake font");
    }

    #[test]
    fn no_fonts_found() {
        assert!(read_first_font(&["/definitely/not/here.ttf"]).is_none());
        assert!(read_first_font(&[]).is_none());
    }

    #[test]
    #[cfg(not(target_os = "windows"))]
    fn taskbar_icon_is_ignored_without_a_taskbar() {
        let icon = Icon::from_rgba(vec![255; 16], 2, 2).unwrap();
        let attributes = WindowAttributes::default().with_title("HUD");
        let attributes = no_taskbar_icon(attributes, icon);
        assert_eq!(attributes.title, "HUD");
        assert!(attributes.window_icon.is_none());
    }

    #[test]
    #[cfg(any(target_os = "linux", target_os = "windows"))]
    fn desktop_platforms_run_off_main_thread() {
        let caps = current();
        assert!(caps.render_thread_supported);
        assert!(!caps.font_candidates.is_empty());
    }
}
