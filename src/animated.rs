//! Animated (and still) textures with timer-driven playback.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::blur;
use crate::decode::{self, DecodedImage};
use crate::store::TextureStore;
use crate::timer::FrameTimer;

/// One uploaded frame.
struct Frame<H> {
    handle: H,
    delay: Duration,
}

/// A decoded image whose frames live in a [`TextureStore`].
///
/// Frames play in order and wrap back to the first after the last. Each call
/// to [`current_frame`](Self::current_frame) advances at most one frame, and
/// only once the current frame's delay has passed, so a caller polling once
/// per rendered frame never skips frames even when polling is slow.
///
/// A texture that failed to decode is empty: it has no frames, its size is
/// `[0, 0]`, and drawing it does nothing.
///
/// # Threading
///
/// There is no internal locking. All calls on one texture must come from one
/// thread at a time, normally the render thread from inside the draw
/// callback. The store's own threading rules apply on top of that.
pub struct AnimatedTexture<S: TextureStore> {
    path: PathBuf,
    size: [usize; 2],
    frames: Vec<Frame<S::Handle>>,
    current: usize,
    timer: FrameTimer,
    blur_passes: u32,
    store: S,
}

impl<S: TextureStore> AnimatedTexture<S> {
    /// Decode the image at `path` and upload its frames into `store`.
    ///
    /// Decoding failures are logged and leave the texture empty; check
    /// [`is_empty`](Self::is_empty) before relying on its contents.
    pub fn open(path: impl AsRef<Path>, store: S) -> Self {
        let path = path.as_ref();
        match decode::decode_file(path) {
            Ok(decoded) => Self::from_decoded(path, decoded, store),
            Err(err) => {
                warn!(path = %path.display(), %err, "failed to decode image, texture left empty");
                Self::empty(path.to_path_buf(), store)
            }
        }
    }

    /// Upload already-decoded frames. `path` is only kept for reference.
    ///
    /// An image without frames, or with a frame whose pixels do not match
    /// `width` x `height`, is logged and leaves the texture empty.
    pub fn from_decoded(path: impl Into<PathBuf>, decoded: DecodedImage, mut store: S) -> Self {
        let path = path.into();
        if let Some(index) = mismatched_frame(&decoded) {
            warn!(
                path = %path.display(),
                index,
                width = decoded.width,
                height = decoded.height,
                "frame does not match image size, texture left empty"
            );
            return Self::empty(path, store);
        }
        if decoded.frames.is_empty() {
            warn!(path = %path.display(), "image has no frames, texture left empty");
            return Self::empty(path, store);
        }

        let size = [decoded.width as usize, decoded.height as usize];
        let name = path.display().to_string();

        let frames: Vec<_> = decoded
            .frames
            .into_iter()
            .enumerate()
            .map(|(index, frame)| Frame {
                handle: store.upload(&format!("{name}#{index}"), size, frame.image.as_raw()),
                delay: frame.delay,
            })
            .collect();

        debug!(
            path = %path.display(),
            frames = frames.len(),
            width = size[0],
            height = size[1],
            "texture uploaded"
        );

        Self {
            path,
            size,
            frames,
            current: 0,
            timer: FrameTimer::new(),
            blur_passes: 0,
            store,
        }
    }

    fn empty(path: PathBuf, store: S) -> Self {
        Self {
            path,
            size: [0, 0],
            frames: Vec::new(),
            current: 0,
            timer: FrameTimer::new(),
            blur_passes: 0,
            store,
        }
    }

    /// The path this texture was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of frames; zero if decoding failed.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Whether there is nothing to draw.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// `[width, height]` in pixels; `[0, 0]` if decoding failed.
    #[must_use]
    pub fn size(&self) -> [usize; 2] {
        self.size
    }

    /// [`size`](Self::size) as an egui vector, for drawing at native size.
    #[must_use]
    pub fn display_size(&self) -> egui::Vec2 {
        // Image dimensions are well within f32's exact integer range.
        #[expect(clippy::cast_precision_loss)]
        let size = egui::vec2(self.size[0] as f32, self.size[1] as f32);
        size
    }

    /// Index of the frame currently on screen.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Number of [`apply_blur`](Self::apply_blur) calls so far.
    #[must_use]
    pub fn blur_passes(&self) -> u32 {
        self.blur_passes
    }

    /// The store backing this texture.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Advance if the current frame's delay has passed, then return the frame
    /// to show. `None` when the texture is empty.
    pub fn current_frame(&mut self) -> Option<&S::Handle> {
        self.current_frame_at(Instant::now())
    }

    /// [`current_frame`](Self::current_frame) evaluated at `now`.
    pub fn current_frame_at(&mut self, now: Instant) -> Option<&S::Handle> {
        let delay = self.frames.get(self.current)?.delay;
        if self.timer.has_elapsed_at(now, delay) {
            self.current = (self.current + 1) % self.frames.len();
            self.timer.mark_at(now);
        }
        Some(&self.frames[self.current].handle)
    }

    /// egui id of the frame to show, advancing like
    /// [`current_frame`](Self::current_frame).
    pub fn current_texture_id(&mut self) -> Option<egui::TextureId> {
        self.current_frame_at(Instant::now())?;
        Some(self.store.texture_id(&self.frames[self.current].handle))
    }

    /// Draw the current frame at native size.
    ///
    /// Returns `None` without touching the store or `ui` if the texture is
    /// empty.
    pub fn draw(&mut self, ui: &mut egui::Ui) -> Option<egui::Response> {
        let id = self.current_texture_id()?;
        let size = self.display_size();
        let image = egui::Image::new(egui::load::SizedTexture::new(id, size)).fit_to_exact_size(size);
        Some(ui.add(image))
    }

    /// Box-blur every frame in place with `radius` (zero leaves pixels as
    /// they are). Counts as one pass regardless of frame count.
    pub fn apply_blur(&mut self, radius: u32) {
        if radius > 0 {
            let [width, height] = self.size;
            for frame in &mut self.frames {
                let mut pixels = self.store.read_back(&frame.handle);
                blur::box_blur(&mut pixels, width, height, radius);
                self.store.update(&mut frame.handle, self.size, &pixels);
            }
        }
        self.blur_passes += 1;
        trace!(
            path = %self.path.display(),
            radius,
            passes = self.blur_passes,
            "blur pass applied"
        );
    }

    /// Apply blur passes until [`blur_passes`](Self::blur_passes) reaches
    /// `times`. Calling again with the same `times` does nothing, and a
    /// texture already blurred more than `times` is left alone.
    pub fn ensure_blurred(&mut self, radius: u32, times: u32) {
        while self.blur_passes < times {
            self.apply_blur(radius);
        }
    }

    /// [`ensure_blurred`](Self::ensure_blurred) followed by
    /// [`draw`](Self::draw).
    pub fn draw_blurred(
        &mut self,
        ui: &mut egui::Ui,
        radius: u32,
        times: u32,
    ) -> Option<egui::Response> {
        self.ensure_blurred(radius, times);
        self.draw(ui)
    }
}

/// Index of the first frame whose pixel buffer is not `width` x `height`.
fn mismatched_frame(decoded: &DecodedImage) -> Option<usize> {
    decoded.frames.iter().position(|frame| {
        frame.image.dimensions() != (decoded.width, decoded.height)
            || frame.image.as_raw().len() != decoded.width as usize * decoded.height as usize * 4
    })
}

impl<S: TextureStore> Drop for AnimatedTexture<S> {
    fn drop(&mut self) {
        for frame in self.frames.drain(..) {
            self.store.release(frame.handle);
        }
    }
}
