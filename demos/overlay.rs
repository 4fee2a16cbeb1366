//! Opens a click-through overlay for a few seconds, optionally showing an
//! image passed on the command line.
//!
//! ```text
//! cargo run --example overlay -- path/to/animation.gif [blur-radius]
//! ```

use std::time::Duration;

use glow_overlay::{AnimatedTexture, EguiTextures, OverlayConfig, OverlaySession};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<(), glow_overlay::OverlayError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let image_path = args.next();
    let blur_radius: u32 = args.next().and_then(|arg| arg.parse().ok()).unwrap_or(0);

    let mut texture: Option<AnimatedTexture<EguiTextures>> = None;
    let mut session = OverlaySession::new();
    session.start(OverlayConfig::new("Overlay").with_overlay(true), move |ui| {
        ui.colored_label(egui::Color32::RED, "HELLO WORLD");

        let Some(path) = image_path.as_deref() else {
            return;
        };
        let texture = texture.get_or_insert_with(|| {
            AnimatedTexture::open(path, EguiTextures::new(ui.ctx().clone()))
        });
        if texture.is_empty() {
            ui.label(format!("could not load {path}"));
            return;
        }
        texture.ensure_blurred(blur_radius, 1);
        texture.draw(ui);
        ui.ctx().request_repaint();
    })?;

    info!("overlay running for five seconds");
    std::thread::sleep(Duration::from_secs(5));
    session.stop()
}
