//! One-dimensional kernel dispatch.
//!
//! A dispatch covers `grid_size` logical threads split into groups of
//! `threads_per_group`. Kernels that read the dispatch parameter uniform
//! mask off lanes past `threads_per_group` and ids past `grid_size`, so the
//! last group may be partial.

use wgpu::util::DeviceExt;

use super::params::DispatchParams;
use super::pipelines::ComputePipelineState;
use crate::gpu::buffers::DeviceBuffer;
use crate::gpu::context::GpuError;
use crate::gpu::program::WorkgroupDecl;
use crate::gpu::queue::{CommandBuffer, CommandQueue, Submission};

/// Errors from recording a dispatch.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Thread group size {requested} is outside 1..={max}")]
    ThreadGroupSize { requested: u32, max: u32 },
    #[error("Kernel has a fixed thread group of {fixed}, cannot dispatch with {requested}")]
    FixedThreadGroup { requested: u32, fixed: u32 },
    #[error("Kernel expects {expected} array arguments, got {got}")]
    ArgumentCount { expected: usize, got: usize },
    #[error("Argument {binding} holds {len} elements, dispatch covers {grid_size}")]
    BufferTooSmall {
        binding: usize,
        len: usize,
        grid_size: u32,
    },
    #[error("Dispatch needs {groups} thread groups, device allows {max}")]
    TooManyGroups { groups: u32, max: u32 },
    #[error("Array of {bytes} bytes exceeds the device's storage binding limit of {max}")]
    BufferTooLarge { bytes: u64, max: u64 },
    #[error("Grid of {0} elements does not fit a single dispatch")]
    GridTooLarge(usize),
    #[error("Operand lengths differ: {a} vs {b}")]
    LengthMismatch { a: usize, b: usize },
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// Resolved shape of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPlan {
    pub grid_size: u32,
    pub threads_per_group: u32,
    pub group_count: u32,
}

impl DispatchPlan {
    /// Validate a requested shape against a pipeline.
    pub fn new(
        state: &ComputePipelineState,
        grid_size: u32,
        threads_per_group: u32,
    ) -> Result<Self, DispatchError> {
        let max = state.max_total_threads_per_threadgroup();
        if threads_per_group == 0 || threads_per_group > max {
            return Err(DispatchError::ThreadGroupSize {
                requested: threads_per_group,
                max,
            });
        }

        // Without the parameter uniform the kernel cannot mask lanes, so the
        // group must be exactly as wide as it was declared.
        if !state.signature().uses_dispatch_params {
            if let WorkgroupDecl::Fixed(fixed) = state.signature().workgroup {
                if threads_per_group != fixed {
                    return Err(DispatchError::FixedThreadGroup {
                        requested: threads_per_group,
                        fixed,
                    });
                }
            }
        }

        let group_count = grid_size.div_ceil(threads_per_group);
        if group_count > state.max_groups_per_dispatch() {
            return Err(DispatchError::TooManyGroups {
                groups: group_count,
                max: state.max_groups_per_dispatch(),
            });
        }

        Ok(Self {
            grid_size,
            threads_per_group,
            group_count,
        })
    }

    /// Logical threads launched, including masked ones in the last group.
    pub fn launched_threads(&self) -> u64 {
        self.group_count as u64 * self.threads_per_group as u64
    }
}

/// Record a dispatch of `state` over `buffers` into `cmd`.
///
/// `buffers` bind to argument slots `0..N-1` in order. An empty grid records
/// nothing.
pub fn encode_dispatch(
    cmd: &mut CommandBuffer,
    queue: &CommandQueue,
    state: &ComputePipelineState,
    buffers: &[&DeviceBuffer],
    grid_size: u32,
    threads_per_group: u32,
) -> Result<DispatchPlan, DispatchError> {
    let plan = DispatchPlan::new(state, grid_size, threads_per_group)?;

    let expected = state.signature().argument_count();
    if buffers.len() != expected {
        return Err(DispatchError::ArgumentCount {
            expected,
            got: buffers.len(),
        });
    }
    let max_bytes = storage_limit(queue.device());
    for (binding, buffer) in buffers.iter().enumerate() {
        check_array_bytes(buffer.len(), max_bytes)?;
        if buffer.len() < grid_size as usize {
            return Err(DispatchError::BufferTooSmall {
                binding,
                len: buffer.len(),
                grid_size,
            });
        }
    }

    if plan.group_count == 0 {
        log::debug!("`{}`: empty grid, nothing recorded", state.entry_point());
        return Ok(plan);
    }

    let device = queue.device();
    let entries: Vec<wgpu::BindGroupEntry> = buffers
        .iter()
        .enumerate()
        .map(|(binding, buffer)| wgpu::BindGroupEntry {
            binding: binding as u32,
            resource: buffer.buffer().as_entire_binding(),
        })
        .collect();
    let argument_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("kernel_arguments"),
        layout: state.argument_layout(),
        entries: &entries,
    });

    let params_group = state.params_layout().map(|layout| {
        let params = DispatchParams::new(grid_size, threads_per_group);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("dispatch_params"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("dispatch_params_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    });

    {
        let mut pass = cmd
            .encoder()
            .begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(state.entry_point()),
                timestamp_writes: None,
            });
        pass.set_pipeline(state.pipeline());
        pass.set_bind_group(0, &argument_group, &[]);
        if let Some(group) = &params_group {
            pass.set_bind_group(1, group, &[]);
        }
        pass.dispatch_workgroups(plan.group_count, 1, 1);
    }

    log::debug!(
        "`{}`: grid {} in {} groups of {}",
        state.entry_point(),
        plan.grid_size,
        plan.group_count,
        plan.threads_per_group
    );
    Ok(plan)
}

/// Record a dispatch in its own command buffer and commit it.
///
/// The caller must wait on the returned submission before reading any
/// buffer the kernel writes.
pub fn dispatch(
    queue: &CommandQueue,
    state: &ComputePipelineState,
    buffers: &[&DeviceBuffer],
    grid_size: u32,
    threads_per_group: u32,
) -> Result<(Submission, DispatchPlan), DispatchError> {
    let mut cmd = queue.command_buffer(state.entry_point());
    let plan = encode_dispatch(&mut cmd, queue, state, buffers, grid_size, threads_per_group)?;
    Ok((cmd.commit(), plan))
}

/// Bytes of a `len`-element float array, if a kernel argument may bind it.
pub fn check_array_bytes(len: usize, max_bytes: u64) -> Result<u64, DispatchError> {
    let bytes = (len as u64).saturating_mul(std::mem::size_of::<f32>() as u64);
    if bytes > max_bytes {
        return Err(DispatchError::BufferTooLarge {
            bytes,
            max: max_bytes,
        });
    }
    Ok(bytes)
}

fn storage_limit(device: &wgpu::Device) -> u64 {
    let limits = device.limits();
    (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size)
}

/// Convert a host length to a grid size.
pub fn grid_size_for(len: usize) -> Result<u32, DispatchError> {
    u32::try_from(len).map_err(|_| DispatchError::GridTooLarge(len))
}
