//! Element-wise addition of two float arrays on the GPU.

use super::dispatch::{check_array_bytes, dispatch, grid_size_for, DispatchError, DispatchPlan};
use super::pipelines::ComputePipelineState;
use crate::gpu::buffers::DeviceBuffer;
use crate::gpu::context::AcceleratorContext;
use crate::gpu::program::{Program, ProgramError};
use crate::gpu::queue::CommandQueue;

/// Entry point of the addition kernel in the default program.
pub const ADD_KERNEL: &str = "add_arrays";

/// Output of one addition run.
#[derive(Debug, Clone)]
pub struct AddResult {
    pub values: Vec<f32>,
    pub plan: DispatchPlan,
}

/// `result[i] = a[i] + b[i]` over equal-length arrays.
///
/// Holds the pipeline state only; operand and result buffers live for a
/// single [`run`](Self::run).
pub struct ElementwiseAdd {
    state: ComputePipelineState,
}

impl ElementwiseAdd {
    /// Build the pipeline for `entry_point` of `program`.
    pub fn new(
        ctx: &AcceleratorContext,
        program: &Program,
        entry_point: &str,
    ) -> Result<Self, ProgramError> {
        let kernel = program.kernel(entry_point)?;
        if kernel.signature().argument_count() != 3 {
            return Err(ProgramError::PipelineBuild {
                entry_point: entry_point.to_string(),
                reason: format!(
                    "addition takes two inputs and one output, kernel binds {} arrays",
                    kernel.signature().argument_count()
                ),
            });
        }
        let state = ComputePipelineState::build(ctx, &kernel)?;
        Ok(Self { state })
    }

    pub fn state(&self) -> &ComputePipelineState {
        &self.state
    }

    /// Add `a` and `b` using the pipeline's maximum thread group.
    pub fn run(
        &self,
        ctx: &AcceleratorContext,
        queue: &CommandQueue,
        a: &[f32],
        b: &[f32],
    ) -> Result<AddResult, DispatchError> {
        self.run_with_group_size(
            ctx,
            queue,
            a,
            b,
            self.state.max_total_threads_per_threadgroup(),
        )
    }

    /// Add `a` and `b` with an explicit thread-group size.
    pub fn run_with_group_size(
        &self,
        ctx: &AcceleratorContext,
        queue: &CommandQueue,
        a: &[f32],
        b: &[f32],
        threads_per_group: u32,
    ) -> Result<AddResult, DispatchError> {
        if a.len() != b.len() {
            return Err(DispatchError::LengthMismatch {
                a: a.len(),
                b: b.len(),
            });
        }
        let grid_size = grid_size_for(a.len())?;
        check_array_bytes(a.len(), ctx.max_storage_bytes())?;

        let buf_a = DeviceBuffer::from_slice(ctx, "operand_a", a);
        let buf_b = DeviceBuffer::from_slice(ctx, "operand_b", b);
        let buf_result = DeviceBuffer::new(ctx, "result", a.len());

        let (submission, plan) = dispatch(
            queue,
            &self.state,
            &[&buf_a, &buf_b, &buf_result],
            grid_size,
            threads_per_group,
        )?;
        submission.wait_until_completed()?;

        let values = buf_result.read(queue)?;
        Ok(AddResult { values, plan })
    }
}
