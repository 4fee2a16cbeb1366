//! GPU-side storage for decoded frames.
//!
//! [`TextureStore`] is the seam between frame bookkeeping in
//! [`AnimatedTexture`](crate::AnimatedTexture) and whatever owns the actual
//! textures. [`EguiTextures`] backs it with egui's texture manager, which the
//! overlay's glow painter uploads to GL on the render thread.

use egui::{ColorImage, TextureHandle, TextureId, TextureOptions};

/// Allocates, updates, reads back, and frees 2D RGBA textures.
///
/// Sizes are `[width, height]` in pixels and buffers are tightly packed
/// RGBA8, `width * height * 4` bytes long.
pub trait TextureStore {
    /// Opaque reference to one resident texture.
    type Handle;

    /// Upload `rgba` as a new texture.
    fn upload(&mut self, name: &str, size: [usize; 2], rgba: &[u8]) -> Self::Handle;

    /// Read the texture's resident pixels back.
    fn read_back(&self, handle: &Self::Handle) -> Vec<u8>;

    /// Replace the texture's pixels in place. The size does not change.
    fn update(&mut self, handle: &mut Self::Handle, size: [usize; 2], rgba: &[u8]);

    /// Free the texture. The handle is consumed so it is freed at most once.
    fn release(&mut self, handle: Self::Handle);

    /// The id egui draws this texture with.
    fn texture_id(&self, handle: &Self::Handle) -> TextureId;
}

/// A texture living in egui's texture manager plus its resident pixels.
#[derive(Clone)]
pub struct EguiTexture {
    texture: TextureHandle,
    pixels: Vec<u8>,
}

impl EguiTexture {
    /// Texture size in pixels.
    #[must_use]
    pub fn size(&self) -> [usize; 2] {
        self.texture.size()
    }
}

/// [`TextureStore`] over an [`egui::Context`].
///
/// Textures are created with linear filtering and clamp-to-edge wrapping.
/// Dropping a handle (or releasing it) frees the texture at the end of the
/// next painted frame.
#[derive(Clone)]
pub struct EguiTextures {
    ctx: egui::Context,
    options: TextureOptions,
}

impl EguiTextures {
    /// Store textures in `ctx`.
    #[must_use]
    pub fn new(ctx: egui::Context) -> Self {
        Self {
            ctx,
            options: TextureOptions::LINEAR,
        }
    }

    /// Use `options` for textures uploaded from now on.
    #[must_use]
    pub fn with_options(mut self, options: TextureOptions) -> Self {
        self.options = options;
        self
    }
}

impl TextureStore for EguiTextures {
    type Handle = EguiTexture;

    fn upload(&mut self, name: &str, size: [usize; 2], rgba: &[u8]) -> EguiTexture {
        let texture = self.ctx.load_texture(
            name,
            ColorImage::from_rgba_unmultiplied(size, rgba),
            self.options,
        );
        EguiTexture {
            texture,
            pixels: rgba.to_vec(),
        }
    }

    fn read_back(&self, handle: &EguiTexture) -> Vec<u8> {
        handle.pixels.clone()
    }

    fn update(&mut self, handle: &mut EguiTexture, size: [usize; 2], rgba: &[u8]) {
        handle
            .texture
            .set(ColorImage::from_rgba_unmultiplied(size, rgba), self.options);
        handle.pixels.clear();
        handle.pixels.extend_from_slice(rgba);
    }

    fn release(&mut self, handle: EguiTexture) {
        drop(handle);
    }

    fn texture_id(&self, handle: &EguiTexture) -> TextureId {
        handle.texture.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_read_back_update() {
        let mut store = EguiTextures::new(egui::Context::default());
        let pixels = [10u8, 20, 30, 255, 40, 50, 60, 255];
        let mut handle = store.upload("pair", [2, 1], &pixels);

        assert_eq!(handle.size(), [2, 1]);
        assert_eq!(store.read_back(&handle), pixels);

        let replaced = [1u8, 1, 1, 1, 2, 2, 2, 2];
        store.update(&mut handle, [2, 1], &replaced);
        assert_eq!(store.read_back(&handle), replaced);
    }

    #[test]
    fn uploads_get_distinct_ids() {
        let mut store = EguiTextures::new(egui::Context::default());
        let a = store.upload("a", [1, 1], &[0, 0, 0, 255]);
        let b = store.upload("b", [1, 1], &[0, 0, 0, 255]);
        assert_ne!(store.texture_id(&a), store.texture_id(&b));

        let id = store.texture_id(&a);
        let mut updated = a;
        store.update(&mut updated, [1, 1], &[255, 255, 255, 255]);
        assert_eq!(store.texture_id(&updated), id);

        store.release(updated);
        store.release(b);
    }
}
