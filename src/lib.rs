//! Compute View
//!
//! Runs an element-wise kernel on the GPU and shows the result as a
//! grayscale image.
//!
//! # Features
//!
//! - Accelerator context with allocation accounting
//! - WGSL programs validated on the host, kernels reflected for their arguments
//! - Dispatch sized to the pipeline's own maximum thread group
//! - Min/max normalization of results into 8-bit gray
//! - Full-screen quad render pipeline driven by a per-frame callback
//! - winit window host (when the `window` feature is enabled)

pub mod gpu;
pub mod image;
pub mod logging;
pub mod pipeline;

#[cfg(feature = "window")]
pub mod host;

// Re-export commonly used types
pub use gpu::{
    AcceleratorContext, CommandQueue, ComputePipelineState, DispatchError, ElementwiseAdd,
    FrameHandler, FrameReport, FrameTarget, GpuError, Program, ProgramError, RenderPipelineState,
    Renderer, DEFAULT_PROGRAM,
};
pub use image::{normalize_to_grayscale, GrayscaleImage, ImageError};
pub use logging::{init_logging, LoggingConfig};
pub use pipeline::{
    prepare_display, run_compute_phase, ComputeOutcome, DisplayResources, PipelineConfig,
    PipelineError,
};
