//! Sampled sprite atlas texture.

use std::path::Path;

use ash::vk;
use sprig_gpu::image::{create_image_view, create_pixel_art_sampler};
use sprig_gpu::{GpuAllocator, GpuContext, GpuError, GpuImage, Result};
use tracing::info;

use crate::upload::Uploader;

const BYTES_PER_PIXEL: usize = 4;

/// Decoded RGBA8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaPixels {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RgbaPixels {
    /// Wrap raw pixels, checking for exactly four bytes per pixel.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        validate_rgba8(width, height, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Decode an encoded image file (PNG and friends) into RGBA8.
    pub fn decode(encoded: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(encoded)
            .map_err(|e| GpuError::InvalidTexture(e.to_string()))?
            .into_rgba8();
        let (width, height) = decoded.dimensions();
        Self::new(width, height, decoded.into_raw())
    }

    /// Read and decode an image file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let decoded = image::open(path)
            .map_err(|e| GpuError::InvalidTexture(format!("{}: {e}", path.display())))?
            .into_rgba8();
        let (width, height) = decoded.dimensions();
        Self::new(width, height, decoded.into_raw())
    }
}

/// Check that `len` bytes are exactly a `width` x `height` RGBA8 image.
pub fn validate_rgba8(width: u32, height: u32, len: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(GpuError::InvalidTexture(format!(
            "empty texture {width}x{height}"
        )));
    }
    let expected = width as usize * height as usize * BYTES_PER_PIXEL;
    if len != expected {
        return Err(GpuError::InvalidTexture(format!(
            "{width}x{height} needs {expected} bytes at 4 bytes per pixel, got {len}"
        )));
    }
    Ok(())
}

/// Device-local texture with its view and pixel-art sampler.
pub struct Texture {
    pub image: GpuImage,
    pub view: vk::ImageView,
    pub sampler: vk::Sampler,
}

impl Texture {
    /// Load an image file and upload it.
    pub fn load(ctx: &GpuContext, uploader: &Uploader<'_>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let pixels = RgbaPixels::open(path)?;
        info!(
            "Loaded texture {} ({}x{})",
            path.display(),
            pixels.width,
            pixels.height
        );
        Self::from_rgba8(ctx, uploader, &pixels)
    }

    /// Upload decoded pixels and create the view and sampler.
    pub fn from_rgba8(ctx: &GpuContext, uploader: &Uploader<'_>, pixels: &RgbaPixels) -> Result<Self> {
        let mut image =
            uploader.create_texture_image(pixels.width, pixels.height, &pixels.data, "texture")?;
        let device = ctx.device();

        let view = match unsafe { create_image_view(device, image.image, image.format) } {
            Ok(view) => view,
            Err(e) => {
                ctx.allocator().lock().free_image(&mut image)?;
                return Err(e);
            }
        };

        let sampler = match unsafe { create_pixel_art_sampler(device, ctx.max_sampler_anisotropy()) } {
            Ok(sampler) => sampler,
            Err(e) => {
                unsafe { device.destroy_image_view(view, None) };
                ctx.allocator().lock().free_image(&mut image)?;
                return Err(e);
            }
        };

        Ok(Self {
            image,
            view,
            sampler,
        })
    }

    /// Destroy the sampler and view, then free the image.
    ///
    /// # Safety
    /// The device must be valid and the texture must not be in use.
    pub unsafe fn destroy(&mut self, device: &ash::Device, allocator: &mut GpuAllocator) -> Result<()> {
        unsafe {
            device.destroy_sampler(self.sampler, None);
            device.destroy_image_view(self.view, None);
        }
        self.sampler = vk::Sampler::null();
        self.view = vk::ImageView::null();
        allocator.free_image(&mut self.image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgba};
    use std::io::Cursor;

    #[test]
    fn four_bytes_per_pixel_is_required() {
        assert!(validate_rgba8(2, 3, 24).is_ok());
        assert!(matches!(
            validate_rgba8(2, 3, 18),
            Err(GpuError::InvalidTexture(_))
        ));
        assert!(validate_rgba8(0, 3, 0).is_err());
    }

    #[test]
    fn decoded_png_is_rgba8() {
        let source: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_fn(3, 2, |x, y| Rgba([x as u8 * 10, y as u8 * 20, 7, 255]));
        let mut encoded = Vec::new();
        source
            .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)
            .unwrap();

        let pixels = RgbaPixels::decode(&encoded).unwrap();
        assert_eq!((pixels.width, pixels.height), (3, 2));
        assert_eq!(pixels.data, source.into_raw());
    }

    #[test]
    fn garbage_is_not_a_texture() {
        let err = RgbaPixels::decode(b"not an image").unwrap_err();
        assert!(matches!(err, GpuError::InvalidTexture(_)));
    }
}
