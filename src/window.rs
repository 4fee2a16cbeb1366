//! The overlay window and its render loop.
//!
//! [`run`] owns everything graphical: the winit event loop and window, the
//! glutin GL context and surface, the glow function table, and the egui
//! context with its winit input translation and glow painter. All of it
//! lives on the thread that calls [`run`].
//!
//! winit allows one event loop per process, so the loop is built by the first
//! run and parked in a thread-local between runs. Later runs on the same
//! thread reuse it and only create a new window and GL context.
//!
//! Each iteration pumps pending window events, skips rendering while the
//! window is minimized, runs one egui pass with a single full-window
//! [`CentralPanel`](egui::CentralPanel) hosting the caller's draw callback,
//! clears the framebuffer, paints, and swaps with vsync.

use std::cell::RefCell;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use egui::{FontData, FontDefinitions, FontFamily, TextStyle};
use glow::HasContext;
use glutin::config::{Config, ConfigTemplateBuilder};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, NotCurrentContext, PossiblyCurrentContext,
};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow};
use raw_window_handle::HasWindowHandle;
use tracing::{debug, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Icon, Window, WindowAttributes, WindowId, WindowLevel};

use crate::config::OverlayConfig;
use crate::error::OverlayError;
use crate::platform::{self, PlatformCaps};

/// How long to sleep per iteration while the window is minimized.
const MINIMIZED_SLEEP: Duration = Duration::from_millis(10);

/// Name of the system font inside egui's font table.
const SYSTEM_FONT: &str = "system";

thread_local! {
    /// The event loop built by the first run on this thread, parked between
    /// runs.
    static EVENT_LOOP: RefCell<Option<EventLoop<OverlayEvent>>> = const { RefCell::new(None) };

    /// Why building the event loop failed on this thread. winit counts a
    /// failed build as created, so later runs report this instead.
    static EVENT_LOOP_FAILURE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Events delivered to the render loop from other threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayEvent {
    /// Close the window and leave the loop.
    Close,
}

/// State shared between a render loop and whoever controls it.
///
/// The running flag is the only thing the loop reads from outside; the proxy
/// slot lets the controller wake the event loop with
/// [`OverlayEvent::Close`] while it exists.
#[derive(Clone, Default)]
pub(crate) struct RenderSignals {
    running: Arc<AtomicBool>,
    proxy: Arc<Mutex<Option<EventLoopProxy<OverlayEvent>>>>,
}

impl RenderSignals {
    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn set_running(&self) {
        self.running.store(true, Ordering::Release);
    }

    /// Clear the running flag, returning whether it was set.
    pub(crate) fn clear_running(&self) -> bool {
        self.running.swap(false, Ordering::AcqRel)
    }

    fn install_proxy(&self, proxy: EventLoopProxy<OverlayEvent>) {
        *self.proxy.lock().unwrap_or_else(PoisonError::into_inner) = Some(proxy);
    }

    pub(crate) fn clear_proxy(&self) {
        self.proxy.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    /// Ask the event loop to close its window, if one is up.
    pub(crate) fn request_close(&self) {
        let guard = self.proxy.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(proxy) = guard.as_ref() {
            // A closed loop has already exited; nothing left to wake.
            let _ = proxy.send_event(OverlayEvent::Close);
        }
    }
}

/// Open a window for `config` and render until it is closed.
///
/// Blocks the calling thread. `draw` runs once per rendered frame inside the
/// full-window panel and must not block, since presentation waits on it.
///
/// Every windowing, GL, and egui call happens on the calling thread. Textures
/// created inside `draw` belong to this thread too. Calling `run` again on
/// the same thread reuses its event loop.
///
/// # Errors
///
/// Returns [`OverlayError`] if the event loop, window, GL context, or painter
/// cannot be created, or if presenting a frame fails. Nothing is retried.
pub fn run<F>(config: &OverlayConfig, draw: F) -> Result<(), OverlayError>
where
    F: FnMut(&mut egui::Ui),
{
    let signals = RenderSignals::default();
    signals.set_running();
    let result = run_with_signals(config, draw, &signals);
    signals.clear_running();
    result
}

/// [`run`], stopping early once `signals` is cleared.
pub(crate) fn run_with_signals<F>(
    config: &OverlayConfig,
    draw: F,
    signals: &RenderSignals,
) -> Result<(), OverlayError>
where
    F: FnMut(&mut egui::Ui),
{
    let caps = platform::current();
    let mut event_loop = match EVENT_LOOP.with_borrow_mut(Option::take) {
        Some(event_loop) => event_loop,
        None => build_event_loop(caps)?,
    };

    discard_pending_events(&mut event_loop);
    signals.install_proxy(event_loop.create_proxy());
    let result = drive(&mut event_loop, config, caps, draw, signals);
    signals.clear_proxy();

    EVENT_LOOP.with_borrow_mut(|slot| *slot = Some(event_loop));
    result
}

fn build_event_loop(caps: &PlatformCaps) -> Result<EventLoop<OverlayEvent>, OverlayError> {
    if let Some(reason) = EVENT_LOOP_FAILURE.with_borrow(Clone::clone) {
        return Err(OverlayError::EventLoopUnavailable(reason));
    }

    let mut builder = EventLoop::<OverlayEvent>::with_user_event();
    (caps.prepare_event_loop)(&mut builder);
    match builder.build() {
        Ok(event_loop) => {
            debug!(platform = caps.name, "event loop created");
            Ok(event_loop)
        }
        Err(err) => {
            EVENT_LOOP_FAILURE.with_borrow_mut(|failure| *failure = Some(err.to_string()));
            Err(err.into())
        }
    }
}

/// Drop events queued for a previous window, such as a close request that
/// arrived after its loop had already stopped.
fn discard_pending_events(event_loop: &mut EventLoop<OverlayEvent>) {
    if let PumpStatus::Exit(code) = event_loop.pump_app_events(Some(Duration::ZERO), &mut Discard)
    {
        debug!(code, "event loop exited while idle");
    }
}

struct Discard;

impl ApplicationHandler<OverlayEvent> for Discard {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        _event: WindowEvent,
    ) {
    }
}

fn drive<F>(
    event_loop: &mut EventLoop<OverlayEvent>,
    config: &OverlayConfig,
    caps: &PlatformCaps,
    draw: F,
    signals: &RenderSignals,
) -> Result<(), OverlayError>
where
    F: FnMut(&mut egui::Ui),
{
    let mut app = OverlayApp::new(event_loop, config, caps, draw)?;
    info!(
        title = %config.title,
        overlay = config.overlay,
        platform = caps.name,
        "overlay window ready"
    );

    let mut result = Ok(());
    while signals.is_running() && !app.close_requested {
        if let PumpStatus::Exit(code) = event_loop.pump_app_events(Some(Duration::ZERO), &mut app)
        {
            debug!(code, "event loop exited");
            break;
        }
        if app.close_requested || !signals.is_running() {
            break;
        }
        if app.window.is_minimized().unwrap_or(false) {
            std::thread::sleep(MINIMIZED_SLEEP);
            continue;
        }
        if let Err(err) = app.render_frame() {
            result = Err(err);
            break;
        }
    }

    app.shutdown();
    debug!("overlay window torn down");
    result
}

/// Everything the loop owns between frames.
struct OverlayApp<F> {
    draw: F,
    overlay: bool,
    clear_color: [f32; 4],
    close_requested: bool,
    egui_ctx: egui::Context,
    egui_winit: egui_winit::State,
    painter: egui_glow::Painter,
    gl: Arc<glow::Context>,
    gl_surface: Surface<WindowSurface>,
    gl_context: PossiblyCurrentContext,
    // Declared last: dropped after the GL objects that render into it.
    window: Window,
}

impl<F: FnMut(&mut egui::Ui)> OverlayApp<F> {
    fn new(
        event_loop: &EventLoop<OverlayEvent>,
        config: &OverlayConfig,
        caps: &PlatformCaps,
        draw: F,
    ) -> Result<Self, OverlayError> {
        let attributes = window_attributes(config, caps);
        let template = ConfigTemplateBuilder::new()
            .with_alpha_size(8)
            .with_transparency(config.overlay);

        let (window, gl_config) = DisplayBuilder::new()
            .with_window_attributes(Some(attributes))
            .build(event_loop, template, pick_gl_config)
            .map_err(|err| OverlayError::WindowCreation(err.to_string()))?;
        let window = window.ok_or_else(|| {
            OverlayError::WindowCreation("display builder returned no window".to_string())
        })?;

        if config.overlay && caps.click_through {
            if let Err(err) = window.set_cursor_hittest(false) {
                warn!(%err, "click-through unavailable, overlay will capture input");
            }
        }

        let not_current = create_context(&window, &gl_config)?;
        let surface_attributes = window.build_surface_attributes(SurfaceAttributesBuilder::default())?;
        let gl_display = gl_config.display();
        let gl_surface =
            unsafe { gl_display.create_window_surface(&gl_config, &surface_attributes)? };
        let gl_context = not_current.make_current(&gl_surface)?;

        if let Err(err) =
            gl_surface.set_swap_interval(&gl_context, SwapInterval::Wait(NonZeroU32::MIN))
        {
            warn!(%err, "vsync unavailable");
        }

        let gl = Arc::new(unsafe {
            glow::Context::from_loader_function_cstr(|symbol| {
                gl_display.get_proc_address(symbol).cast()
            })
        });

        let egui_ctx = egui::Context::default();
        egui_ctx.set_visuals(egui::Visuals::dark());
        install_fonts(&egui_ctx, caps);
        set_text_size(&egui_ctx, config.font_size);

        // Scale factors are small positive values; f32 is plenty.
        #[expect(clippy::cast_possible_truncation)]
        let pixels_per_point = window.scale_factor() as f32;
        let egui_winit = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(pixels_per_point),
            None,
            None,
        );

        let painter = egui_glow::Painter::new(Arc::clone(&gl), "", None, false)
            .map_err(|err| OverlayError::Painter(format!("{err:?}")))?;

        Ok(Self {
            draw,
            overlay: config.overlay,
            clear_color: config.effective_clear_color(),
            close_requested: false,
            egui_ctx,
            egui_winit,
            painter,
            gl,
            gl_surface,
            gl_context,
            window,
        })
    }

    /// Run one egui pass and present it.
    fn render_frame(&mut self) -> Result<(), OverlayError> {
        let raw_input = self.egui_winit.take_egui_input(&self.window);
        let panel = if self.overlay {
            egui::Frame::default()
        } else {
            egui::Frame::central_panel(&self.egui_ctx.style())
        };

        let draw = &mut self.draw;
        let output = self.egui_ctx.run(raw_input, |ctx| {
            egui::CentralPanel::default()
                .frame(panel)
                .show(ctx, |ui| draw(ui));
        });
        self.egui_winit
            .handle_platform_output(&self.window, output.platform_output);

        let primitives = self
            .egui_ctx
            .tessellate(output.shapes, output.pixels_per_point);
        let size = self.window.inner_size();
        let [r, g, b, a] = self.clear_color;

        unsafe {
            self.gl
                .viewport(0, 0, gl_size(size.width), gl_size(size.height));
            self.gl.clear_color(r, g, b, a);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
        self.painter.paint_and_update_textures(
            [size.width, size.height],
            output.pixels_per_point,
            &primitives,
            &output.textures_delta,
        );

        self.gl_surface.swap_buffers(&self.gl_context)?;
        Ok(())
    }

    /// Release GUI state before the GL context, and the context before the
    /// window.
    fn shutdown(mut self) {
        self.painter.destroy();
        drop(self.egui_winit);
        drop(self.egui_ctx);
        drop(self.gl);
        drop(self.gl_surface);
        drop(self.gl_context);
        drop(self.window);
    }
}

impl<F: FnMut(&mut egui::Ui)> ApplicationHandler<OverlayEvent> for OverlayApp<F> {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: OverlayEvent) {
        match event {
            OverlayEvent::Close => self.close_requested = true,
        }
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        // Late events for an earlier window on the same loop.
        if window_id != self.window.id() {
            return;
        }
        let _ = self.egui_winit.on_window_event(&self.window, &event);

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                self.close_requested = true;
            }
            WindowEvent::Resized(size) => {
                if let (Some(width), Some(height)) =
                    (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
                {
                    self.gl_surface.resize(&self.gl_context, width, height);
                }
            }
            _ => {}
        }
    }
}

/// Window attributes for `config`, with overlay hints and icons applied.
fn window_attributes(config: &OverlayConfig, caps: &PlatformCaps) -> WindowAttributes {
    let [width, height] = config.base_size;
    let mut attributes = Window::default_attributes()
        .with_title(config.title.clone())
        .with_inner_size(LogicalSize::new(width, height));

    if config.overlay {
        attributes = attributes
            .with_decorations(false)
            .with_transparent(true)
            .with_window_level(WindowLevel::AlwaysOnTop);
    }
    if let Some(icon) = config.window_icon.as_deref().and_then(to_winit_icon) {
        attributes = attributes.with_window_icon(Some(icon));
    }
    if let Some(icon) = config.taskbar_icon.as_deref().and_then(to_winit_icon) {
        attributes = (caps.apply_taskbar_icon)(attributes, icon);
    }
    attributes
}

fn to_winit_icon(icon: &egui::IconData) -> Option<Icon> {
    match Icon::from_rgba(icon.rgba.clone(), icon.width, icon.height) {
        Ok(icon) => Some(icon),
        Err(err) => {
            warn!(%err, "ignoring invalid window icon");
            None
        }
    }
}

/// Prefer configs that can do transparency, then more samples.
fn pick_gl_config(configs: Box<dyn Iterator<Item = Config> + '_>) -> Config {
    configs
        .reduce(|best, candidate| {
            let key = |config: &Config| {
                (
                    config.supports_transparency().unwrap_or(false),
                    config.num_samples(),
                )
            };
            if key(&candidate) > key(&best) {
                candidate
            } else {
                best
            }
        })
        .expect("glutin offered no GL configs")
}

/// Desktop GL first, GLES as a fallback.
fn create_context(window: &Window, gl_config: &Config) -> Result<NotCurrentContext, OverlayError> {
    let raw_window_handle = window.window_handle()?.as_raw();
    let gl_display = gl_config.display();

    let desktop = ContextAttributesBuilder::new().build(Some(raw_window_handle));
    let gles = ContextAttributesBuilder::new()
        .with_context_api(ContextApi::Gles(None))
        .build(Some(raw_window_handle));

    unsafe {
        match gl_display.create_context(gl_config, &desktop) {
            Ok(context) => Ok(context),
            Err(err) => {
                debug!(%err, "desktop GL context unavailable, trying GLES");
                Ok(gl_display.create_context(gl_config, &gles)?)
            }
        }
    }
}

/// Use the first available platform font as the primary proportional font.
fn install_fonts(ctx: &egui::Context, caps: &PlatformCaps) {
    let Some((path, bytes)) = platform::read_first_font(caps.font_candidates) else {
        debug!("no system font found, using built-in fonts");
        return;
    };

    let mut fonts = FontDefinitions::default();
    fonts
        .font_data
        .insert(SYSTEM_FONT.to_owned(), Arc::new(FontData::from_owned(bytes)));
    fonts
        .families
        .entry(FontFamily::Proportional)
        .or_default()
        .insert(0, SYSTEM_FONT.to_owned());
    ctx.set_fonts(fonts);
    debug!(path, "system font installed");
}

fn set_text_size(ctx: &egui::Context, size: f32) {
    ctx.style_mut(|style| {
        for (text_style, font) in &mut style.text_styles {
            if matches!(text_style, TextStyle::Body | TextStyle::Button) {
                font.size = size;
            }
        }
    });
}

/// Convert a `u32` to `i32` for GL API calls.
///
/// # Panics
///
/// Panics if `value > i32::MAX`, which no real window size reaches.
fn gl_size(value: u32) -> i32 {
    i32::try_from(value).expect("dimension exceeds i32::MAX")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signals_start_cleared() {
        let signals = RenderSignals::default();
        assert!(!signals.is_running());
        signals.set_running();
        assert!(signals.is_running());
        assert!(signals.clear_running());
        assert!(!signals.clear_running());
    }

    #[test]
    fn close_request_without_loop_is_harmless() {
        let signals = RenderSignals::default();
        signals.request_close();
        signals.clear_proxy();
    }

    #[test]
    fn clones_share_state() {
        let signals = RenderSignals::default();
        let other = signals.clone();
        other.set_running();
        assert!(signals.is_running());
    }

    #[test]
    #[cfg(any(target_os = "linux", target_os = "windows"))]
    fn second_run_reuses_the_event_loop() {
        let run_once = || {
            let signals = RenderSignals::default();
            signals.set_running();
            let stopper = signals.clone();
            let config = OverlayConfig::new("reuse").with_base_size(64, 64);
            // One frame, then leave the loop.
            let draw = move |_ui: &mut egui::Ui| {
                stopper.clear_running();
            };
            run_with_signals(&config, draw, &signals)
        };

        let first = run_once();
        let second = run_once();

        assert!(
            !matches!(
                second,
                Err(OverlayError::EventLoop(
                    winit::error::EventLoopError::RecreationAttempt
                ))
            ),
            "second run tried to build another event loop: {second:?}"
        );
        if first.is_ok() {
            assert!(second.is_ok(), "second run failed: {second:?}");
        }
    }

    #[test]
    fn gl_size_in_range() {
        assert_eq!(gl_size(1920), 1920);
    }

    #[test]
    #[should_panic(expected = "dimension exceeds i32::MAX")]
    fn gl_size_overflow_panics() {
        let _ = gl_size(u32::MAX);
    }

    #[test]
    fn text_size_applies_to_body_and_button() {
        let ctx = egui::Context::default();
        set_text_size(&ctx, 22.0);
        let style = ctx.style();
        assert!((style.text_styles[&TextStyle::Body].size - 22.0).abs() < f32::EPSILON);
        assert!((style.text_styles[&TextStyle::Button].size - 22.0).abs() < f32::EPSILON);
    }
}
