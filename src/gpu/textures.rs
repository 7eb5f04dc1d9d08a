//! Texture management: the sampled image texture, offscreen targets and readback.

use wgpu::{Device, Texture, TextureFormat, TextureUsages, TextureView};

use super::context::{AcceleratorContext, Allocation, GpuError};

/// Format of the uploaded display image.
pub const IMAGE_FORMAT: TextureFormat = TextureFormat::Rgba8UnormSrgb;

const BYTES_PER_PIXEL: u32 = 4;

/// Errors from creating or filling textures.
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("Texture must be at least 1x1, got {width}x{height}")]
    Empty { width: u32, height: u32 },
    #[error("Texture {width}x{height} exceeds the device limit of {max}")]
    TooLarge { width: u32, height: u32, max: u32 },
    #[error("Expected {expected} bytes of pixel data, got {got}")]
    SizeMismatch { expected: usize, got: usize },
}

/// A 2D RGBA texture sampled by the fragment stage.
///
/// Written once from host memory at creation and never modified.
pub struct ImageTexture {
    texture: Texture,
    view: TextureView,
    width: u32,
    height: u32,
    _allocation: Allocation,
}

impl ImageTexture {
    /// Create the texture and upload `pixels` (tightly packed RGBA8 rows).
    pub fn from_rgba(
        ctx: &AcceleratorContext,
        label: &str,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::Empty { width, height });
        }
        let max = ctx.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(TextureError::TooLarge { width, height, max });
        }
        let expected = width as usize * height as usize * BYTES_PER_PIXEL as usize;
        if pixels.len() != expected {
            return Err(TextureError::SizeMismatch {
                expected,
                got: pixels.len(),
            });
        }

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: IMAGE_FORMAT,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * BYTES_PER_PIXEL),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        log::debug!("uploaded {}x{} image texture `{}`", width, height, label);

        Ok(Self {
            texture,
            view,
            width,
            height,
            _allocation: ctx.track_allocation(expected as u64),
        })
    }

    pub fn view(&self) -> &TextureView {
        &self.view
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// A render target that owns both texture and view.
/// The texture must outlive its view, so we keep them together.
pub struct RenderTarget {
    texture: Texture,
    view: TextureView,
    width: u32,
    height: u32,
}

impl RenderTarget {
    /// Create an offscreen target that can be drawn into and copied to the CPU.
    pub fn for_output(
        device: &Device,
        label: &str,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width,
            height,
        }
    }

    /// Get the texture view for rendering.
    pub fn view(&self) -> &TextureView {
        &self.view
    }

    /// Get the underlying texture (for copy operations).
    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Readback buffer for copying GPU texture data to CPU.
pub struct ReadbackBuffer {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_row_bytes: u32,
    unpadded_row_bytes: u32,
}

impl ReadbackBuffer {
    /// Create a new readback buffer sized for the given dimensions.
    pub fn new(device: &Device, width: u32, height: u32) -> Self {
        let unpadded_row_bytes = width * BYTES_PER_PIXEL;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row_bytes = unpadded_row_bytes.div_ceil(align) * align;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback_buffer"),
            size: (padded_row_bytes * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            width,
            height,
            padded_row_bytes,
            unpadded_row_bytes,
        }
    }

    /// Record a copy of `target` into this buffer.
    pub fn copy_from(&self, encoder: &mut wgpu::CommandEncoder, target: &RenderTarget) {
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: target.texture(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_row_bytes),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Get the padded bytes per row (for texture copy).
    pub fn padded_row_bytes(&self) -> u32 {
        self.padded_row_bytes
    }

    /// Read pixels from the mapped buffer, removing row padding.
    ///
    /// The copy must have been committed before calling this.
    pub fn read_pixels(&self, device: &Device) -> Result<Vec<u8>, GpuError> {
        let buffer_slice = self.buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device.poll(wgpu::PollType::wait_indefinitely())?;
        receiver
            .recv()
            .map_err(|e| GpuError::BufferMap(e.to_string()))?
            .map_err(|e| GpuError::BufferMap(format!("{:?}", e)))?;

        let data = buffer_slice.get_mapped_range();
        let mut pixels =
            Vec::with_capacity((self.width * self.height * BYTES_PER_PIXEL) as usize);
        for row in 0..self.height {
            let start = (row * self.padded_row_bytes) as usize;
            let end = start + self.unpadded_row_bytes as usize;
            pixels.extend_from_slice(&data[start..end]);
        }
        drop(data);
        self.buffer.unmap();
        Ok(pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_image_texture_upload() {
        let ctx = match AcceleratorContext::new().await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        let pixels = vec![128u8; 16 * 8 * 4];
        let texture = ImageTexture::from_rgba(&ctx, "test_image", 16, 8, &pixels).unwrap();
        assert_eq!((texture.width(), texture.height()), (16, 8));
        assert_eq!(ctx.current_allocated_size(), 512);

        drop(texture);
        assert_eq!(ctx.current_allocated_size(), 0);
    }

    #[tokio::test]
    async fn test_image_texture_rejects_bad_input() {
        let ctx = match AcceleratorContext::new().await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        assert!(matches!(
            ImageTexture::from_rgba(&ctx, "empty", 0, 4, &[]),
            Err(TextureError::Empty { .. })
        ));
        assert!(matches!(
            ImageTexture::from_rgba(&ctx, "short", 2, 2, &[0u8; 12]),
            Err(TextureError::SizeMismatch {
                expected: 16,
                got: 12
            })
        ));
    }

    #[tokio::test]
    async fn test_readback_buffer_creation() {
        let ctx = match AcceleratorContext::new().await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        let buffer = ReadbackBuffer::new(&ctx.device, 100, 4);
        assert_eq!(buffer.padded_row_bytes(), 512);
    }
}
