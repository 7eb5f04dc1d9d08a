//! Accelerator access through wgpu.
//!
//! Device and queue ownership, program compilation, the compute pipeline
//! that produces the result array, and the render pipeline plus per-frame
//! driver that display it.

pub mod buffers;
pub mod compute;
pub mod context;
pub mod frame;
pub mod layouts;
pub mod pipelines;
pub mod program;
pub mod queue;
pub mod textures;

pub use buffers::DeviceBuffer;
pub use compute::{
    dispatch, AddResult, ComputePipelineState, DispatchError, DispatchPlan, ElementwiseAdd,
    ADD_KERNEL,
};
pub use context::{AcceleratorContext, GpuError};
pub use frame::{FrameHandler, FrameReport, FrameTarget, Renderer};
pub use pipelines::{QuadVertex, RenderPipelineState, DEFAULT_OUTPUT_FORMAT, FULLSCREEN_QUAD};
pub use program::{EntryPoint, Kernel, Program, ProgramError, Stage};
pub use queue::{CommandBuffer, CommandQueue, Submission};
pub use textures::{ImageTexture, ReadbackBuffer, RenderTarget, TextureError};

/// Program text with the addition kernel and the full-screen quad stages.
pub const DEFAULT_PROGRAM: &str = include_str!("shaders/pipeline.wgsl");

/// Entry point names in [`DEFAULT_PROGRAM`].
pub const QUAD_VERTEX: &str = "quad_vertex";
pub const QUAD_FRAGMENT: &str = "quad_fragment";
