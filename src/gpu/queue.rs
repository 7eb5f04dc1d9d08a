//! Command queue and one-shot command buffers.
//!
//! A [`CommandBuffer`] records GPU work and is consumed by
//! [`CommandBuffer::commit`], so a buffer is submitted exactly once. The
//! returned [`Submission`] is either waited on (compute phase) or dropped
//! (per-frame rendering).

use std::sync::Arc;
use wgpu::{CommandEncoder, Device, Queue, SubmissionIndex};

use super::context::GpuError;

/// Ordered submission channel bound to one device.
///
/// Cheap to clone; every clone feeds the same FIFO queue.
#[derive(Clone)]
pub struct CommandQueue {
    device: Arc<Device>,
    queue: Arc<Queue>,
}

impl CommandQueue {
    pub(crate) fn new(device: Arc<Device>, queue: Arc<Queue>) -> Self {
        Self { device, queue }
    }

    /// Open a new command buffer.
    pub fn command_buffer(&self, label: &str) -> CommandBuffer {
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
        CommandBuffer {
            encoder,
            device: self.device.clone(),
            queue: self.queue.clone(),
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }
}

/// Short-lived recorder for one submission.
pub struct CommandBuffer {
    encoder: CommandEncoder,
    device: Arc<Device>,
    queue: Arc<Queue>,
}

impl CommandBuffer {
    /// Access the underlying encoder to record passes and copies.
    pub fn encoder(&mut self) -> &mut CommandEncoder {
        &mut self.encoder
    }

    /// Submit the recorded work.
    pub fn commit(self) -> Submission {
        let index = self.queue.submit(std::iter::once(self.encoder.finish()));
        Submission {
            index,
            device: self.device,
        }
    }
}

/// Handle to committed work.
#[derive(Debug)]
#[must_use = "dropping a submission does not wait for it; call wait_until_completed to block"]
pub struct Submission {
    index: SubmissionIndex,
    device: Arc<Device>,
}

impl Submission {
    /// Block the host thread until the device has finished this submission.
    ///
    /// Buffers written by the submission may only be read after this returns.
    pub fn wait_until_completed(self) -> Result<(), GpuError> {
        self.device.poll(wgpu::PollType::Wait {
            submission_index: Some(self.index.clone()),
            timeout: None,
        })?;
        log::trace!("submission {:?} completed", self.index);
        Ok(())
    }
}
