//! Bind group layout builders for GPU pipelines.
//!
//! Provides reusable helpers for creating wgpu bind group layouts.

use wgpu::{BindGroupLayout, BindGroupLayoutEntry, Device, ShaderStages};

use super::program::ArgumentSlot;

/// Builder for creating bind group layouts with common patterns.
pub struct BindGroupLayoutBuilder {
    label: Option<&'static str>,
    entries: Vec<BindGroupLayoutEntry>,
}

impl BindGroupLayoutBuilder {
    /// Create a new bind group layout builder.
    pub fn new(label: &'static str) -> Self {
        Self {
            label: Some(label),
            entries: Vec::new(),
        }
    }

    /// Add a storage buffer entry.
    pub fn storage(mut self, binding: u32, read_only: bool, visibility: ShaderStages) -> Self {
        self.entries.push(BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        });
        self
    }

    /// Add a uniform buffer entry.
    pub fn uniform(mut self, binding: u32, visibility: ShaderStages) -> Self {
        self.entries.push(BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        });
        self
    }

    /// Add a 2D texture entry.
    pub fn texture_2d(mut self, binding: u32, visibility: ShaderStages) -> Self {
        self.entries.push(BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        self
    }

    /// Add a filtering sampler entry.
    pub fn sampler(mut self, binding: u32, visibility: ShaderStages) -> Self {
        self.entries.push(BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
        self
    }

    /// Build the bind group layout.
    pub fn build(self, device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: self.label,
            entries: &self.entries,
        })
    }
}

/// Layout for a kernel's array arguments, one storage entry per slot.
pub fn create_argument_layout(device: &Device, slots: &[ArgumentSlot]) -> BindGroupLayout {
    slots
        .iter()
        .fold(
            BindGroupLayoutBuilder::new("kernel_arguments_layout"),
            |builder, slot| builder.storage(slot.binding, slot.read_only, ShaderStages::COMPUTE),
        )
        .build(device)
}

/// Layout for the dispatch parameter uniform.
pub fn create_dispatch_params_layout(device: &Device) -> BindGroupLayout {
    BindGroupLayoutBuilder::new("dispatch_params_layout")
        .uniform(0, ShaderStages::COMPUTE)
        .build(device)
}

/// Layout for the displayed image (texture, sampler).
pub fn create_image_layout(device: &Device) -> BindGroupLayout {
    BindGroupLayoutBuilder::new("image_bind_group_layout")
        .texture_2d(0, ShaderStages::FRAGMENT)
        .sampler(1, ShaderStages::FRAGMENT)
        .build(device)
}
