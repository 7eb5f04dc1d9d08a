//! Thin winit host: one window, continuous redraw, one frame callback per redraw.

mod surface;

use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalPosition, LogicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::gpu::{AcceleratorContext, FrameHandler};
use crate::pipeline::PipelineConfig;

pub use surface::WindowSurface;

/// Window configuration.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub origin: (i32, i32),
    /// Surface format; must match the render pipeline's output format.
    pub format: wgpu::TextureFormat,
    pub present_mode: wgpu::PresentMode,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::from_pipeline(&PipelineConfig::default())
    }
}

impl HostConfig {
    pub fn from_pipeline(config: &PipelineConfig) -> Self {
        Self {
            title: config.window_title.clone(),
            width: config.width,
            height: config.height,
            origin: config.window_origin,
            format: config.output_format,
            present_mode: wgpu::PresentMode::Fifo,
        }
    }
}

/// Errors that end the host loop.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("Window creation failed: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("Surface creation failed: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("Surface cannot present {format:?}; supported formats: {available:?}")]
    UnsupportedFormat {
        format: wgpu::TextureFormat,
        available: Vec<wgpu::TextureFormat>,
    },
    #[error("Surface ran out of memory")]
    OutOfMemory,
}

/// Open the window and drive `handler` until the window is closed.
pub fn run<H: FrameHandler>(
    config: HostConfig,
    ctx: &AcceleratorContext,
    handler: &H,
) -> Result<(), HostError> {
    let event_loop = EventLoop::new()?;
    let mut app = HostApp {
        config,
        ctx,
        handler,
        window: None,
        surface: None,
        error: None,
    };

    event_loop.run_app(&mut app)?;

    match app.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct HostApp<'a, H: FrameHandler> {
    config: HostConfig,
    ctx: &'a AcceleratorContext,
    handler: &'a H,
    window: Option<Arc<Window>>,
    surface: Option<WindowSurface>,
    error: Option<HostError>,
}

impl<H: FrameHandler> HostApp<'_, H> {
    fn open_window(&mut self, event_loop: &ActiveEventLoop) -> Result<(), HostError> {
        let (x, y) = self.config.origin;
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height))
            .with_position(LogicalPosition::new(x, y));

        let window = Arc::new(event_loop.create_window(attrs)?);
        let surface = WindowSurface::new(
            self.ctx,
            window.clone(),
            self.config.format,
            self.config.present_mode,
        )?;

        window.request_redraw();
        self.surface = Some(surface);
        self.window = Some(window);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: HostError) {
        log::error!("{}", err);
        self.error = Some(err);
        self.surface = None;
        event_loop.exit();
    }

    fn redraw(&mut self) -> Result<(), HostError> {
        let Some(surface) = &self.surface else {
            return Ok(());
        };
        let target = surface.acquire()?;
        let report = self.handler.draw(target);
        log::trace!("frame: {:?}", report);
        Ok(())
    }
}

impl<H: FrameHandler> ApplicationHandler for HostApp<'_, H> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.open_window(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.surface = None;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.handler.drawable_size_will_change(size.width, size.height);
                if let Some(surface) = &mut self.surface {
                    surface.resize(size);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    self.fail(event_loop, err);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_config_from_pipeline() {
        let config = HostConfig::default();
        assert_eq!((config.width, config.height), (512, 512));
        assert_eq!(config.origin, (100, 100));
        assert_eq!(config.format, wgpu::TextureFormat::Bgra8UnormSrgb);
        assert_eq!(config.present_mode, wgpu::PresentMode::Fifo);
    }
}
