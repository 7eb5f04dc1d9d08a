//! Compute pipeline state creation.

use wgpu::{BindGroupLayout, ComputePipeline};

use crate::gpu::context::AcceleratorContext;
use crate::gpu::layouts::{create_argument_layout, create_dispatch_params_layout};
use crate::gpu::program::{Kernel, KernelSignature, ProgramError, WorkgroupDecl, WORKGROUP_SIZE_OVERRIDE};

/// Compiled kernel plus the layouts and limits needed to dispatch it.
///
/// Immutable after creation.
pub struct ComputePipelineState {
    pipeline: ComputePipeline,
    argument_layout: BindGroupLayout,
    params_layout: Option<BindGroupLayout>,
    signature: KernelSignature,
    entry_point: String,
    max_threads: u32,
    max_groups: u32,
}

impl ComputePipelineState {
    /// Build a pipeline for `kernel`, sizing its thread group from the device.
    ///
    /// Kernels sized by the `WORKGROUP_SIZE` override are specialised to the
    /// device maximum. Kernels with a literal size keep it; a literal larger
    /// than the device allows is rejected. Device-side validation failures
    /// come back as [`ProgramError::PipelineBuild`].
    pub fn build(ctx: &AcceleratorContext, kernel: &Kernel<'_>) -> Result<Self, ProgramError> {
        let device_max = ctx.max_threads_per_group();
        let signature = kernel.signature().clone();

        let (max_threads, constants): (u32, Vec<(&str, f64)>) = match signature.workgroup {
            WorkgroupDecl::Override => (
                device_max,
                vec![(WORKGROUP_SIZE_OVERRIDE, device_max as f64)],
            ),
            WorkgroupDecl::Fixed(threads) if threads == 0 || threads > device_max => {
                return Err(ProgramError::PipelineBuild {
                    entry_point: kernel.name().to_string(),
                    reason: format!(
                        "declared thread group of {} exceeds the device maximum of {}",
                        threads, device_max
                    ),
                });
            }
            WorkgroupDecl::Fixed(threads) => (threads, Vec::new()),
        };

        let argument_layout = create_argument_layout(&ctx.device, &signature.arguments);
        let params_layout = signature
            .uses_dispatch_params
            .then(|| create_dispatch_params_layout(&ctx.device));

        let mut layouts = vec![&argument_layout];
        layouts.extend(params_layout.as_ref());

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{}_pipeline_layout", kernel.name())),
                bind_group_layouts: &layouts,
                immediate_size: 0,
            });

        let pipeline = ctx
            .validated(|device| {
                device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(&format!("{}_pipeline", kernel.name())),
                    layout: Some(&pipeline_layout),
                    module: kernel.program().shader(),
                    entry_point: Some(kernel.name()),
                    compilation_options: wgpu::PipelineCompilationOptions {
                        constants: &constants,
                        zero_initialize_workgroup_memory: true,
                    },
                    cache: None,
                })
            })
            .map_err(|err| ProgramError::PipelineBuild {
                entry_point: kernel.name().to_string(),
                reason: err.to_string(),
            })?;

        log::debug!(
            "built compute pipeline `{}`: {} threads per group, {} arguments",
            kernel.name(),
            max_threads,
            signature.argument_count()
        );

        Ok(Self {
            pipeline,
            argument_layout,
            params_layout,
            signature,
            entry_point: kernel.name().to_string(),
            max_threads,
            max_groups: ctx.limits().max_compute_workgroups_per_dimension,
        })
    }

    /// Largest thread group a dispatch of this pipeline may use.
    pub fn max_total_threads_per_threadgroup(&self) -> u32 {
        self.max_threads
    }

    /// Largest number of thread groups in one dispatch.
    pub fn max_groups_per_dispatch(&self) -> u32 {
        self.max_groups
    }

    pub fn signature(&self) -> &KernelSignature {
        &self.signature
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub(crate) fn pipeline(&self) -> &ComputePipeline {
        &self.pipeline
    }

    pub(crate) fn argument_layout(&self) -> &BindGroupLayout {
        &self.argument_layout
    }

    pub(crate) fn params_layout(&self) -> Option<&BindGroupLayout> {
        self.params_layout.as_ref()
    }
}
