//! Start/stop control over a render loop on a background thread.
//!
//! Render loops run on a host thread that outlives any one session. winit
//! allows one event loop per process, and the window module keeps that loop
//! parked on whichever thread built it, so every session's loop has to run
//! on the same thread to be restartable.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread;

use tracing::{debug, error, info, warn};

use crate::config::OverlayConfig;
use crate::error::OverlayError;
use crate::platform;
use crate::window::{self, RenderSignals};

/// Name given to render threads.
const THREAD_NAME: &str = "overlay-render";

type Runner = Box<dyn FnOnce(&RenderSignals) -> Result<(), OverlayError> + Send>;

/// One render loop waiting for the host.
struct Job {
    runner: Runner,
    signals: RenderSignals,
    done: Sender<Result<(), OverlayError>>,
}

/// A long-lived thread that runs render loops one at a time.
#[derive(Clone)]
pub(crate) struct RenderHost {
    jobs: Sender<Job>,
}

impl RenderHost {
    /// Start a new host thread. It exits once every handle is dropped.
    pub(crate) fn spawn() -> Result<Self, OverlayError> {
        let (jobs, queue) = mpsc::channel::<Job>();
        thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || serve(&queue))
            .map_err(OverlayError::Spawn)?;
        Ok(Self { jobs })
    }

    /// The process-wide host, started on first use.
    fn shared() -> Result<Self, OverlayError> {
        static SHARED: Mutex<Option<RenderHost>> = Mutex::new(None);

        let mut shared = SHARED.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(host) = shared.as_ref() {
            return Ok(host.clone());
        }
        let host = Self::spawn()?;
        *shared = Some(host.clone());
        Ok(host)
    }

    /// Queue `runner`; the receiver yields its result once it has finished.
    fn submit(
        &self,
        runner: Runner,
        signals: RenderSignals,
    ) -> Result<Receiver<Result<(), OverlayError>>, OverlayError> {
        let (done, finished) = mpsc::channel();
        self.jobs
            .send(Job {
                runner,
                signals,
                done,
            })
            .map_err(|_| OverlayError::RenderThreadPanicked)?;
        Ok(finished)
    }
}

fn serve(queue: &Receiver<Job>) {
    debug!("render host started");
    for Job {
        runner,
        signals,
        done,
    } in queue
    {
        let result = if signals.is_running() {
            debug!("render loop starting");
            panic::catch_unwind(AssertUnwindSafe(|| runner(&signals)))
                .unwrap_or(Err(OverlayError::RenderThreadPanicked))
        } else {
            debug!("render loop stopped before it started");
            Ok(())
        };

        signals.clear_running();
        signals.clear_proxy();
        if let Err(err) = &result {
            error!(%err, "overlay render loop failed");
        }
        // Nobody is waiting if the session was leaked.
        let _ = done.send(result);
    }
    debug!("render host exiting");
}

/// An overlay whose window runs on a background render thread.
///
/// The host owns the session and decides when it starts and stops; dropping
/// the session stops it. A session can be started again after it stops.
///
/// ```no_run
/// use glow_overlay::{OverlayConfig, OverlaySession};
///
/// let mut session = OverlaySession::new();
/// session.start(OverlayConfig::new("Overlay").with_overlay(true), |ui| {
///     ui.label("HELLO WORLD");
/// })?;
///
/// // ... the host keeps working ...
///
/// session.stop()?;
/// # Ok::<(), glow_overlay::OverlayError>(())
/// ```
///
/// # Threading
///
/// Windowing, GL, and egui calls all happen on the render thread, inside the
/// draw callback. Calling into them from any other thread while the session
/// runs is not supported. The only cross-thread traffic is the running flag
/// and the close request sent by [`stop`](Self::stop).
///
/// All sessions in a process share one render thread, so a second session
/// started while another runs waits for it to stop before its window opens.
#[derive(Default)]
pub struct OverlaySession {
    signals: RenderSignals,
    host: Option<RenderHost>,
    pending: Option<Receiver<Result<(), OverlayError>>>,
}

impl OverlaySession {
    /// A session with nothing running.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A session whose loops run on `host` instead of the shared one.
    #[cfg(test)]
    fn on_host(host: RenderHost) -> Self {
        Self {
            signals: RenderSignals::default(),
            host: Some(host),
            pending: None,
        }
    }

    /// Whether the render loop is (still) running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.signals.is_running()
    }

    /// Open the window described by `config` on the render thread, calling
    /// `draw` once per frame inside the full-window panel.
    ///
    /// Does nothing if this session is already running. The result of a
    /// loop that ended on its own (for example because the user closed the
    /// window) is collected and logged first.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::MainThreadOnly`] on platforms whose event loop
    /// must own the main thread, and [`OverlayError::Spawn`] if the render
    /// thread cannot be created. Window and GL failures happen on the render
    /// thread and are returned by [`stop`](Self::stop).
    pub fn start<F>(&mut self, config: OverlayConfig, draw: F) -> Result<(), OverlayError>
    where
        F: FnMut(&mut egui::Ui) + Send + 'static,
    {
        let caps = platform::current();
        if !caps.render_thread_supported {
            return Err(OverlayError::MainThreadOnly(caps.name));
        }
        self.spawn(move |signals| window::run_with_signals(&config, draw, signals))
    }

    /// Queue `runner` as this session's render loop.
    pub(crate) fn spawn<R>(&mut self, runner: R) -> Result<(), OverlayError>
    where
        R: FnOnce(&RenderSignals) -> Result<(), OverlayError> + Send + 'static,
    {
        if self.is_running() {
            debug!("overlay already running, start ignored");
            return Ok(());
        }
        if let Some(finished) = self.pending.take() {
            if let Err(err) = wait(&finished) {
                warn!(%err, "previous overlay session ended with an error");
            }
        }

        let host = match &self.host {
            Some(host) => host.clone(),
            None => {
                let host = RenderHost::shared()?;
                self.host = Some(host.clone());
                host
            }
        };

        self.signals.set_running();
        match host.submit(Box::new(runner), self.signals.clone()) {
            Ok(finished) => {
                self.pending = Some(finished);
                info!("overlay session started");
                Ok(())
            }
            Err(err) => {
                self.signals.clear_running();
                Err(err)
            }
        }
    }

    /// Ask the render loop to exit and wait for it to finish.
    ///
    /// Does nothing if no loop was started. Otherwise clears the running
    /// flag, wakes the event loop with a close request, and blocks until the
    /// loop has returned and its window is gone.
    ///
    /// # Errors
    ///
    /// Returns the render loop's own error, or
    /// [`OverlayError::RenderThreadPanicked`] if it panicked.
    pub fn stop(&mut self) -> Result<(), OverlayError> {
        if self.signals.clear_running() {
            self.signals.request_close();
        }
        let Some(finished) = self.pending.take() else {
            return Ok(());
        };
        let result = wait(&finished);
        info!("overlay session stopped");
        result
    }
}

impl Drop for OverlaySession {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            warn!(%err, "overlay session ended with an error");
        }
    }
}

fn wait(finished: &Receiver<Result<(), OverlayError>>) -> Result<(), OverlayError> {
    finished
        .recv()
        .unwrap_or(Err(OverlayError::RenderThreadPanicked))
}
