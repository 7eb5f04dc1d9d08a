//! Compute-then-display orchestration.
//!
//! The compute phase runs once and blocks until the result is on the host.
//! The display phase turns that result into a texture and hands back the
//! resources a [`Renderer`] borrows for every frame.

use std::borrow::Cow;

use crate::gpu::frame::FrameHandler;
use crate::gpu::{
    AcceleratorContext, CommandQueue, DispatchError, DispatchPlan, ElementwiseAdd, FrameTarget,
    GpuError, ImageTexture, Program, ProgramError, ReadbackBuffer, RenderPipelineState,
    RenderTarget, Renderer, TextureError, ADD_KERNEL, DEFAULT_OUTPUT_FORMAT, DEFAULT_PROGRAM,
    QUAD_FRAGMENT, QUAD_VERTEX,
};
use crate::image::{GrayscaleImage, ImageError};

/// Pipeline configuration for the compute and display phases.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Image width; also the row length of the computed array.
    pub width: u32,
    pub height: u32,
    /// WGSL program holding the compute, vertex and fragment entries.
    pub program_source: Cow<'static, str>,
    pub compute_entry: String,
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub output_format: wgpu::TextureFormat,
    /// RGBA clear color of the render pass.
    pub clear_color: [f64; 4],
    pub window_title: String,
    pub window_origin: (i32, i32),
    /// Print diagnostics for the first `len / diagnostic_divisor` elements.
    pub diagnostic_divisor: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            program_source: Cow::Borrowed(DEFAULT_PROGRAM),
            compute_entry: ADD_KERNEL.to_string(),
            vertex_entry: QUAD_VERTEX.to_string(),
            fragment_entry: QUAD_FRAGMENT.to_string(),
            output_format: DEFAULT_OUTPUT_FORMAT,
            clear_color: [0.5, 0.5, 0.5, 1.0],
            window_title: "compute-view".to_string(),
            window_origin: (100, 100),
            diagnostic_divisor: 1000,
        }
    }
}

impl PipelineConfig {
    /// Compute-only preset: a single row of 1024 elements.
    pub fn minimal() -> Self {
        Self {
            width: 1024,
            height: 1,
            diagnostic_divisor: 10,
            ..Self::default()
        }
    }

    pub fn element_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn wgpu_clear_color(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_color;
        wgpu::Color { r, g, b, a }
    }
}

/// Errors that can occur during pipeline execution.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    #[error("Program error: {0}")]
    Program(#[from] ProgramError),
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
    #[error("Image error: {0}")]
    Image(#[from] ImageError),
    #[error("Texture error: {0}")]
    Texture(#[from] TextureError),
}

/// Operands for the addition: `a[i] = 1`, `b[i] = i`.
pub fn generate_inputs(len: usize) -> (Vec<f32>, Vec<f32>) {
    let a = vec![1.0; len];
    let b = (0..len).map(|i| i as f32).collect();
    (a, b)
}

/// Inputs and result of the compute phase, all on the host.
#[derive(Debug, Clone)]
pub struct ComputeOutcome {
    pub a: Vec<f32>,
    pub b: Vec<f32>,
    pub result: Vec<f32>,
    pub plan: DispatchPlan,
}

impl ComputeOutcome {
    /// Console lines for the first `len / divisor` elements, two per element.
    pub fn diagnostic_lines(&self, divisor: usize) -> Vec<String> {
        let count = self.result.len() / divisor.max(1);
        (0..count)
            .flat_map(|i| {
                [
                    format!("f: {}, s: {}", self.a[i], self.b[i]),
                    format!("{} + {} = {}", self.a[i], self.b[i], self.result[i]),
                ]
            })
            .collect()
    }
}

/// Run the addition kernel over `config.element_count()` elements.
///
/// Blocks until the device has finished; the program, pipeline and buffers
/// are released before returning.
pub fn run_compute_phase(
    ctx: &AcceleratorContext,
    queue: &CommandQueue,
    config: &PipelineConfig,
) -> Result<ComputeOutcome, PipelineError> {
    let program = Program::compile(ctx, "compute_program", &config.program_source)?;
    let add = ElementwiseAdd::new(ctx, &program, &config.compute_entry)?;

    let (a, b) = generate_inputs(config.element_count());
    let output = add.run(ctx, queue, &a, &b)?;

    log::info!(
        "compute phase: {} elements, {} groups of {}",
        output.plan.grid_size,
        output.plan.group_count,
        output.plan.threads_per_group
    );

    Ok(ComputeOutcome {
        a,
        b,
        result: output.values,
        plan: output.plan,
    })
}

/// Everything a [`Renderer`] borrows for the lifetime of the display.
pub struct DisplayResources {
    queue: CommandQueue,
    pipeline: RenderPipelineState,
    texture: ImageTexture,
    image: GrayscaleImage,
    clear_color: wgpu::Color,
}

impl DisplayResources {
    /// Borrow the resources into a per-frame renderer.
    pub fn renderer(&self) -> Renderer<'_> {
        Renderer::new(&self.queue, &self.pipeline, &self.texture, self.clear_color)
    }

    pub fn image(&self) -> &GrayscaleImage {
        &self.image
    }

    pub fn texture(&self) -> &ImageTexture {
        &self.texture
    }

    pub fn output_format(&self) -> wgpu::TextureFormat {
        self.pipeline.output_format()
    }

    /// Draw one frame offscreen at the image's size and read it back as
    /// tightly packed pixels in the output format.
    pub fn snapshot(&self) -> Result<Vec<u8>, GpuError> {
        let (width, height) = (self.texture.width(), self.texture.height());
        let device = self.queue.device();
        let target =
            RenderTarget::for_output(device, "snapshot_target", width, height, self.output_format());
        let readback = ReadbackBuffer::new(device, width, height);

        self.renderer()
            .draw(Some(FrameTarget::offscreen(target.view().clone())));

        let mut cmd = self.queue.command_buffer("snapshot_copy");
        readback.copy_from(cmd.encoder(), &target);
        cmd.commit().wait_until_completed()?;

        readback.read_pixels(device)
    }
}

/// Normalize the compute result and build the render side.
pub fn prepare_display(
    ctx: &AcceleratorContext,
    queue: &CommandQueue,
    config: &PipelineConfig,
    outcome: &ComputeOutcome,
) -> Result<DisplayResources, PipelineError> {
    let image = GrayscaleImage::from_values(&outcome.result, config.width, config.height)?;
    let texture = ImageTexture::from_rgba(
        ctx,
        "result_image",
        image.width(),
        image.height(),
        image.pixels(),
    )?;

    let program = Program::compile(ctx, "render_program", &config.program_source)?;
    let pipeline = RenderPipelineState::build(
        ctx,
        &program.vertex(&config.vertex_entry)?,
        &program.fragment(&config.fragment_entry)?,
        config.output_format,
    )?;

    log::info!(
        "display prepared: {}x{} image, output {:?}",
        image.width(),
        image.height(),
        config.output_format
    );

    Ok(DisplayResources {
        queue: queue.clone(),
        pipeline,
        texture,
        image,
        clear_color: config.wgpu_clear_color(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(a: Vec<f32>, b: Vec<f32>) -> ComputeOutcome {
        let result = a.iter().zip(&b).map(|(x, y)| x + y).collect::<Vec<_>>();
        ComputeOutcome {
            plan: DispatchPlan {
                grid_size: result.len() as u32,
                threads_per_group: 64,
                group_count: (result.len() as u32).div_ceil(64),
            },
            a,
            b,
            result,
        }
    }

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.width, 512);
        assert_eq!(config.height, 512);
        assert_eq!(config.element_count(), 262_144);
        assert_eq!(config.window_origin, (100, 100));
        assert_eq!(config.output_format, wgpu::TextureFormat::Bgra8UnormSrgb);
    }

    #[test]
    fn test_minimal_config() {
        let config = PipelineConfig::minimal();
        assert_eq!(config.element_count(), 1024);
        assert_eq!(config.diagnostic_divisor, 10);
    }

    #[test]
    fn test_generate_inputs() {
        let (a, b) = generate_inputs(4);
        assert_eq!(a, vec![1.0; 4]);
        assert_eq!(b, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_diagnostic_lines() {
        let (a, b) = generate_inputs(25);
        let lines = outcome(a, b).diagnostic_lines(10);
        assert_eq!(
            lines,
            vec![
                "f: 1, s: 0".to_string(),
                "1 + 0 = 1".to_string(),
                "f: 1, s: 1".to_string(),
                "1 + 1 = 2".to_string(),
            ]
        );
    }

    #[test]
    fn test_diagnostic_lines_short_result() {
        let (a, b) = generate_inputs(999);
        assert!(outcome(a, b).diagnostic_lines(1000).is_empty());
    }
}
