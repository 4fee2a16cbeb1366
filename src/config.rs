//! Overlay window configuration.

use std::sync::Arc;

use egui::IconData;

/// Logical size of the window before content scaling.
pub const DEFAULT_BASE_SIZE: [u32; 2] = [1280, 800];

/// Body text size in points.
pub const DEFAULT_FONT_SIZE: f32 = 18.0;

/// Opaque clear color, premultiplied.
pub const DEFAULT_CLEAR_COLOR: [f32; 4] = [0.45, 0.55, 0.60, 1.0];

/// How the overlay window is created.
///
/// ```
/// use glow_overlay::OverlayConfig;
///
/// let config = OverlayConfig::new("Overlay").with_overlay(true);
/// assert_eq!(config.effective_clear_color(), [0.0; 4]);
/// ```
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Window title.
    pub title: String,

    /// Borderless, transparent, always-on-top, and click-through where the
    /// platform allows it.
    pub overlay: bool,

    /// Window size in logical pixels; the platform multiplies it by the
    /// monitor's content scale.
    pub base_size: [u32; 2],

    /// Body and button text size in points.
    pub font_size: f32,

    /// Clear color outside overlay mode (premultiplied RGBA).
    pub clear_color: [f32; 4],

    /// Title bar / window icon.
    pub window_icon: Option<Arc<IconData>>,

    /// Large taskbar icon, on platforms that distinguish it.
    pub taskbar_icon: Option<Arc<IconData>>,
}

impl OverlayConfig {
    /// Default configuration with the given title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Enable or disable overlay mode.
    #[must_use]
    pub fn with_overlay(mut self, overlay: bool) -> Self {
        self.overlay = overlay;
        self
    }

    /// Set the logical window size.
    #[must_use]
    pub fn with_base_size(mut self, width: u32, height: u32) -> Self {
        self.base_size = [width, height];
        self
    }

    /// Set the body text size.
    #[must_use]
    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }

    /// Set the window and taskbar icons.
    #[must_use]
    pub fn with_icons(
        mut self,
        window_icon: Option<Arc<IconData>>,
        taskbar_icon: Option<Arc<IconData>>,
    ) -> Self {
        self.window_icon = window_icon;
        self.taskbar_icon = taskbar_icon;
        self
    }

    /// Color the framebuffer is cleared to each frame: fully transparent in
    /// overlay mode, [`clear_color`](Self::clear_color) otherwise.
    #[must_use]
    pub fn effective_clear_color(&self) -> [f32; 4] {
        if self.overlay {
            [0.0; 4]
        } else {
            self.clear_color
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            title: String::from("Overlay"),
            overlay: false,
            base_size: DEFAULT_BASE_SIZE,
            font_size: DEFAULT_FONT_SIZE,
            clear_color: DEFAULT_CLEAR_COLOR,
            window_icon: None,
            taskbar_icon: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = OverlayConfig::new("HUD");
        assert_eq!(config.title, "HUD");
        assert!(!config.overlay);
        assert_eq!(config.base_size, [1280, 800]);
        assert!((config.font_size - 18.0).abs() < f32::EPSILON);
        assert_eq!(config.effective_clear_color(), DEFAULT_CLEAR_COLOR);
    }

    #[test]
    fn overlay_clears_transparent() {
        let config = OverlayConfig::new("HUD")
            .with_overlay(true)
            .with_base_size(640, 480);
        assert_eq!(config.effective_clear_color(), [0.0; 4]);
        assert_eq!(config.base_size, [640, 480]);
    }

    #[test]
    fn icons_are_shared() {
        let icon = Arc::new(IconData {
            rgba: vec![255; 16],
            width: 2,
            height: 2,
        });
        let config = OverlayConfig::new("HUD").with_icons(Some(Arc::clone(&icon)), None);
        assert!(config.taskbar_icon.is_none());
        assert_eq!(Arc::strong_count(&icon), 2);
        drop(config);
        assert_eq!(Arc::strong_count(&icon), 1);
    }
}
