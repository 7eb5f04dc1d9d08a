//! Device buffers for compute operands and results.

use wgpu::{Buffer, BufferUsages};

use super::context::{AcceleratorContext, Allocation, GpuError};
use super::queue::CommandQueue;

/// A fixed-length `f32` array in device memory.
///
/// The buffer can be filled from the host before a dispatch and read back
/// after the producing submission has completed. Its allocation is released
/// from the context's accounting when the buffer is dropped.
pub struct DeviceBuffer {
    buffer: Buffer,
    len: usize,
    _allocation: Allocation,
}

impl DeviceBuffer {
    /// Allocate a zeroed buffer holding `len` floats.
    pub fn new(ctx: &AcceleratorContext, label: &str, len: usize) -> Self {
        let size = byte_len(len);
        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_SRC | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            len,
            _allocation: ctx.track_allocation(size),
        }
    }

    /// Allocate a buffer initialised with `values`.
    pub fn from_slice(ctx: &AcceleratorContext, label: &str, values: &[f32]) -> Self {
        let buffer = Self::new(ctx, label, values.len());
        if !values.is_empty() {
            ctx.queue
                .write_buffer(&buffer.buffer, 0, bytemuck::cast_slice(values));
        }
        buffer
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn byte_len(&self) -> u64 {
        byte_len(self.len)
    }

    /// Copy the buffer back to the host.
    ///
    /// Records a copy into a staging buffer, commits it and blocks until the
    /// device has completed all prior work on the queue.
    pub fn read(&self, queue: &CommandQueue) -> Result<Vec<f32>, GpuError> {
        if self.len == 0 {
            return Ok(Vec::new());
        }

        let size = self.byte_len();
        let staging = queue.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback_staging"),
            size,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut cmd = queue.command_buffer("readback_encoder");
        cmd.encoder()
            .copy_buffer_to_buffer(&self.buffer, 0, &staging, 0, size);
        cmd.commit().wait_until_completed()?;

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        queue.device().poll(wgpu::PollType::wait_indefinitely())?;

        rx.recv()
            .map_err(|e| GpuError::BufferMap(e.to_string()))?
            .map_err(|e| GpuError::BufferMap(format!("{:?}", e)))?;

        let data = slice.get_mapped_range();
        let result: Vec<f32> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging.unmap();

        Ok(result)
    }
}

/// Byte length of `len` floats. Storage bindings cannot be empty, so a zero
/// length still reserves one element.
fn byte_len(len: usize) -> u64 {
    (len.max(1) * std::mem::size_of::<f32>()) as u64
}
