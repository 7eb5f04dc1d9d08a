//! Window surface configuration and frame acquisition.

use std::sync::Arc;

use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::HostError;
use crate::gpu::{AcceleratorContext, FrameTarget};

/// Surface bound to the host window, configured for the render pipeline's format.
pub struct WindowSurface {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    config: wgpu::SurfaceConfiguration,
}

impl WindowSurface {
    pub fn new(
        ctx: &AcceleratorContext,
        window: Arc<Window>,
        format: wgpu::TextureFormat,
        present_mode: wgpu::PresentMode,
    ) -> Result<Self, HostError> {
        let size = window.inner_size();
        let surface = ctx.instance.create_surface(window)?;

        let caps = surface.get_capabilities(&ctx.adapter);
        if !caps.formats.contains(&format) {
            return Err(HostError::UnsupportedFormat {
                format,
                available: caps.formats,
            });
        }

        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&ctx.device, &config);
        log::debug!(
            "surface configured: {}x{} {:?} {:?}",
            config.width,
            config.height,
            format,
            present_mode
        );

        Ok(Self {
            surface,
            device: ctx.device.clone(),
            config,
        })
    }

    /// Reconfigure for a new drawable size. Zero sizes are ignored.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
    }

    fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Acquire this tick's drawable.
    ///
    /// `Ok(None)` means no drawable is available this tick; the surface has
    /// been reconfigured where that helps. Out of memory is fatal.
    pub fn acquire(&self) -> Result<Option<FrameTarget>, HostError> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(Some(FrameTarget::from_surface(frame))),
            Err(SurfaceError::Lost | SurfaceError::Outdated | SurfaceError::Timeout) => {
                log::debug!("surface unavailable, reconfiguring");
                self.reconfigure();
                Ok(None)
            }
            Err(SurfaceError::OutOfMemory) => Err(HostError::OutOfMemory),
            Err(SurfaceError::Other) => Ok(None),
        }
    }
}
