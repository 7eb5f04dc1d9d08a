//! Per-frame rendering of the displayed image.
//!
//! The host calls [`FrameHandler::draw`] once per display refresh. Each call
//! opens one command buffer, records at most one render pass and commits it
//! without waiting.

use wgpu::{BindGroup, SurfaceTexture, TextureView};

use super::pipelines::RenderPipelineState;
use super::queue::CommandQueue;
use super::textures::ImageTexture;

/// Number of vertices in the full-screen quad draw.
pub const QUAD_VERTEX_COUNT: u32 = 6;

/// Render target for one frame.
pub struct FrameTarget {
    /// Color attachment to draw into.
    pub view: TextureView,
    /// Surface texture to present after committing, if the target is on screen.
    pub presentable: Option<SurfaceTexture>,
}

impl FrameTarget {
    /// Target a surface texture; it is presented after the frame is committed.
    pub fn from_surface(frame: SurfaceTexture) -> Self {
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            view,
            presentable: Some(frame),
        }
    }

    /// Target an offscreen view; nothing is presented.
    pub fn offscreen(view: TextureView) -> Self {
        Self {
            view,
            presentable: None,
        }
    }
}

/// What one [`FrameHandler::draw`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    /// A render pass was recorded.
    pub encoded: bool,
    pub draw_calls: u32,
    pub presented: bool,
}

/// Per-frame callback invoked by the host.
pub trait FrameHandler {
    /// Draw one frame. `None` means the host has no drawable this tick.
    fn draw(&self, target: Option<FrameTarget>) -> FrameReport;

    /// The drawable is about to be resized.
    fn drawable_size_will_change(&self, width: u32, height: u32);
}

/// Draws the image texture as a full-screen quad.
///
/// Borrows the queue, pipeline and texture; it owns only the bind group
/// joining the latter two.
pub struct Renderer<'a> {
    queue: &'a CommandQueue,
    pipeline: &'a RenderPipelineState,
    image: &'a ImageTexture,
    bind_group: BindGroup,
    clear_color: wgpu::Color,
}

impl<'a> Renderer<'a> {
    pub fn new(
        queue: &'a CommandQueue,
        pipeline: &'a RenderPipelineState,
        image: &'a ImageTexture,
        clear_color: wgpu::Color,
    ) -> Self {
        let bind_group = pipeline.bind_image(queue.device(), image);
        Self {
            queue,
            pipeline,
            image,
            bind_group,
            clear_color,
        }
    }

    pub fn pipeline(&self) -> &RenderPipelineState {
        self.pipeline
    }

    pub fn image(&self) -> &ImageTexture {
        self.image
    }
}

impl FrameHandler for Renderer<'_> {
    fn draw(&self, target: Option<FrameTarget>) -> FrameReport {
        let mut cmd = self.queue.command_buffer("frame_encoder");

        let Some(target) = target else {
            // Keep one submission per tick even when there is nothing to draw.
            let _ = cmd.commit();
            log::trace!("frame skipped: no render target");
            return FrameReport::default();
        };

        {
            let mut pass = cmd
                .encoder()
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("quad_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &target.view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(self.clear_color),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                    multiview_mask: None,
                });
            pass.set_pipeline(self.pipeline.pipeline());
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.draw(0..QUAD_VERTEX_COUNT, 0..1);
        }

        let _ = cmd.commit();

        let presented = match target.presentable {
            Some(frame) => {
                frame.present();
                true
            }
            None => false,
        };

        FrameReport {
            encoded: true,
            draw_calls: 1,
            presented,
        }
    }

    fn drawable_size_will_change(&self, width: u32, height: u32) {
        log::debug!("drawable size will change to {}x{}", width, height);
    }
}
