//! Accelerator context: device, queue and allocation bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use wgpu::{Adapter, Device, Instance, Queue};

use super::queue::CommandQueue;

/// Errors that can occur while acquiring or driving the device.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Failed to request device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
    #[error("Waiting for the device failed: {0}")]
    Wait(#[from] wgpu::PollError),
    #[error("GPU buffer mapping failed: {0}")]
    BufferMap(String),
}

/// Running total of device memory handed out through an [`AcceleratorContext`].
#[derive(Debug, Default)]
pub struct AllocationTracker {
    bytes: AtomicU64,
}

impl AllocationTracker {
    /// Record an allocation; the returned guard releases it on drop.
    pub fn track(self: &Arc<Self>, bytes: u64) -> Allocation {
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
        Allocation {
            tracker: Arc::clone(self),
            bytes,
        }
    }

    pub fn current(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// Guard for one tracked allocation.
#[derive(Debug)]
pub struct Allocation {
    tracker: Arc<AllocationTracker>,
    bytes: u64,
}

impl Allocation {
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        self.tracker.bytes.fetch_sub(self.bytes, Ordering::Relaxed);
    }
}

/// Root of all GPU resource allocation.
///
/// Owns the instance, adapter, device and the single submission queue. The
/// device and queue are reference counted so that command queues, buffers and
/// pipelines derived from the context can never outlive the device.
pub struct AcceleratorContext {
    pub instance: Instance,
    pub adapter: Arc<Adapter>,
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
    allocations: Arc<AllocationTracker>,
}

impl AcceleratorContext {
    /// Select the system's default accelerator.
    ///
    /// Prefers a high-performance adapter on Metal, Vulkan, DX12 or GL.
    pub async fn new() -> Result<Self, GpuError> {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::METAL
                | wgpu::Backends::VULKAN
                | wgpu::Backends::DX12
                | wgpu::Backends::GL,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .map_err(|_| GpuError::NoAdapter)?;

        // Ask for the adapter's real compute and buffer limits so thread groups
        // and arrays can be sized to the hardware instead of the portable defaults.
        let adapter_limits = adapter.limits();
        let required_limits = wgpu::Limits {
            max_compute_invocations_per_workgroup: adapter_limits
                .max_compute_invocations_per_workgroup,
            max_compute_workgroup_size_x: adapter_limits.max_compute_workgroup_size_x,
            max_storage_buffer_binding_size: adapter_limits.max_storage_buffer_binding_size,
            max_buffer_size: adapter_limits.max_buffer_size,
            ..wgpu::Limits::default()
        };

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("compute-view"),
                required_features: wgpu::Features::empty(),
                required_limits,
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        let ctx = Self {
            instance,
            adapter: Arc::new(adapter),
            device: Arc::new(device),
            queue: Arc::new(queue),
            allocations: Arc::new(AllocationTracker::default()),
        };

        let info = ctx.adapter_info();
        log::info!(
            "Accelerator: {} ({:?}, {:?})",
            info.name,
            info.backend,
            info.device_type
        );
        Ok(ctx)
    }

    /// Blocking variant of [`AcceleratorContext::new`].
    pub fn new_blocking() -> Result<Self, GpuError> {
        pollster::block_on(Self::new())
    }

    /// Create an ordered submission channel bound to this device.
    pub fn new_command_queue(&self) -> CommandQueue {
        CommandQueue::new(self.device.clone(), self.queue.clone())
    }

    /// Get info about the GPU adapter.
    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Limits the device was created with.
    pub fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }

    /// Largest one-dimensional thread group the device accepts.
    pub fn max_threads_per_group(&self) -> u32 {
        let limits = self.limits();
        limits
            .max_compute_invocations_per_workgroup
            .min(limits.max_compute_workgroup_size_x)
    }

    /// Largest storage array, in bytes, a kernel argument can bind.
    pub fn max_storage_bytes(&self) -> u64 {
        let limits = self.limits();
        (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size)
    }

    /// Bytes currently held by buffers and textures created through this context.
    pub fn current_allocated_size(&self) -> u64 {
        self.allocations.current()
    }

    /// Device memory in use as reported by the backend allocator, or
    /// [`current_allocated_size`](Self::current_allocated_size) when the
    /// backend keeps no report.
    pub fn device_allocated_size(&self) -> u64 {
        self.device
            .generate_allocator_report()
            .map(|report| report.total_allocated_bytes)
            .unwrap_or_else(|| self.current_allocated_size())
    }

    /// Log [`device_allocated_size`](Self::device_allocated_size).
    pub fn log_allocated_size(&self) {
        log::info!(
            "alloc_sz = {} (tracked {})",
            self.device_allocated_size(),
            self.current_allocated_size()
        );
    }

    /// Run `create` inside a validation error scope.
    ///
    /// Object creation that fails validation returns the error here instead
    /// of reaching the device's uncaptured-error handler.
    pub(crate) fn validated<T>(
        &self,
        create: impl FnOnce(&Device) -> T,
    ) -> Result<T, wgpu::Error> {
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create(&self.device);
        match pollster::block_on(scope.pop()) {
            Some(err) => Err(err),
            None => Ok(value),
        }
    }

    pub(crate) fn track_allocation(&self, bytes: u64) -> Allocation {
        self.allocations.track(bytes)
    }
}
