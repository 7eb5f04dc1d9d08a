//! Render pipeline for drawing the image as a full-screen quad.

use wgpu::{
    BindGroup, BindGroupLayout, ColorTargetState, Device, PipelineLayout, RenderPipeline, Sampler,
    ShaderModule, TextureFormat,
};

use super::context::AcceleratorContext;
use super::layouts::create_image_layout;
use super::program::{EntryPoint, ProgramError};
use super::textures::ImageTexture;

/// Default presentation format of the render pipeline.
pub const DEFAULT_OUTPUT_FORMAT: TextureFormat = TextureFormat::Bgra8UnormSrgb;

/// One corner of the full-screen quad.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    /// Clip-space position.
    pub position: [f32; 2],
    /// Texture coordinate, origin at the top-left of the image.
    pub coord: [f32; 2],
}

const fn vertex(position: [f32; 2], coord: [f32; 2]) -> QuadVertex {
    QuadVertex { position, coord }
}

/// Two triangles covering clip space. The vertex stage generates the same
/// table from `vertex_index`; this copy is for the host side.
pub const FULLSCREEN_QUAD: [QuadVertex; 6] = [
    vertex([-1.0, -1.0], [0.0, 1.0]),
    vertex([1.0, -1.0], [1.0, 1.0]),
    vertex([-1.0, 1.0], [0.0, 0.0]),
    vertex([-1.0, 1.0], [0.0, 0.0]),
    vertex([1.0, -1.0], [1.0, 1.0]),
    vertex([1.0, 1.0], [1.0, 0.0]),
];

/// Builder for creating render pipelines with common patterns.
pub struct RenderPipelineBuilder<'a> {
    label: Option<&'a str>,
    layout: Option<&'a PipelineLayout>,
    shader: &'a ShaderModule,
    vertex_entry: &'a str,
    fragment_entry: &'a str,
    format: TextureFormat,
}

impl<'a> RenderPipelineBuilder<'a> {
    /// Create a builder for the given vertex and fragment entry points of `shader`.
    pub fn new(
        label: &'a str,
        shader: &'a ShaderModule,
        vertex_entry: &'a str,
        fragment_entry: &'a str,
    ) -> Self {
        Self {
            label: Some(label),
            layout: None,
            shader,
            vertex_entry,
            fragment_entry,
            format: DEFAULT_OUTPUT_FORMAT,
        }
    }

    /// Set the pipeline layout.
    pub fn layout(mut self, layout: &'a PipelineLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Set the texture format.
    pub fn format(mut self, format: TextureFormat) -> Self {
        self.format = format;
        self
    }

    /// Build the render pipeline.
    pub fn build(self, device: &Device) -> RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: self.label,
            layout: self.layout,
            vertex: wgpu::VertexState {
                module: self.shader,
                entry_point: Some(self.vertex_entry),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: self.shader,
                entry_point: Some(self.fragment_entry),
                targets: &[Some(ColorTargetState {
                    format: self.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }
}

/// Create a pipeline layout from bind group layouts.
pub fn create_pipeline_layout(
    device: &Device,
    label: &str,
    layouts: &[&BindGroupLayout],
) -> PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: layouts,
        immediate_size: 0,
    })
}

/// Clamp-to-edge, linearly filtered sampler for the displayed image.
pub fn create_image_sampler(device: &Device) -> Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("image_sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    })
}

/// Vertex + fragment pipeline drawing a sampled texture over the whole target.
///
/// Immutable after creation.
pub struct RenderPipelineState {
    pipeline: RenderPipeline,
    image_layout: BindGroupLayout,
    sampler: Sampler,
    format: TextureFormat,
}

impl RenderPipelineState {
    /// Build from a vertex and a fragment entry point of the same program.
    ///
    /// Fails if the stages' interfaces do not match each other or the layout,
    /// or if `format` cannot be rendered to.
    pub fn build(
        ctx: &AcceleratorContext,
        vertex: &EntryPoint<'_>,
        fragment: &EntryPoint<'_>,
        format: TextureFormat,
    ) -> Result<Self, ProgramError> {
        if !std::ptr::eq(vertex.program(), fragment.program()) {
            return Err(ProgramError::PipelineBuild {
                entry_point: fragment.name().to_string(),
                reason: format!(
                    "vertex `{}` and fragment `{}` come from different programs",
                    vertex.name(),
                    fragment.name()
                ),
            });
        }

        let image_layout = create_image_layout(&ctx.device);
        let layout = create_pipeline_layout(&ctx.device, "quad_pipeline_layout", &[&image_layout]);
        let builder = RenderPipelineBuilder::new(
            "quad_pipeline",
            vertex.program().shader(),
            vertex.name(),
            fragment.name(),
        )
        .layout(&layout)
        .format(format);
        let pipeline = ctx
            .validated(|device| builder.build(device))
            .map_err(|err| ProgramError::PipelineBuild {
                entry_point: fragment.name().to_string(),
                reason: err.to_string(),
            })?;

        log::debug!(
            "built render pipeline `{}`/`{}` for {:?}",
            vertex.name(),
            fragment.name(),
            format
        );

        Ok(Self {
            pipeline,
            image_layout,
            sampler: create_image_sampler(&ctx.device),
            format,
        })
    }

    /// Bind `image` and the sampler for the fragment stage.
    pub fn bind_image(&self, device: &Device, image: &ImageTexture) -> BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("image_bind_group"),
            layout: &self.image_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(image.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    pub fn output_format(&self) -> TextureFormat {
        self.format
    }
}
