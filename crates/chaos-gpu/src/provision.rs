//! One-shot promotion of host data into device-exclusive buffers
//!
//! Host data is written into a mapped staging buffer (`MAP_WRITE | COPY_SRC`),
//! copied on the queue into a buffer with no `MAP_*` usage, and the staging buffer
//! is destroyed from the queue's work-done callback. The caller never waits: later
//! submissions on the same queue are ordered after the copy.

use crate::GpuContext;
use anyhow::{bail, ensure, Context, Result};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc, Arc,
};

/// Usage of every provisioned buffer.
///
/// `COPY_SRC` only serves diagnostic readback; the buffer is never host-mapped.
pub const DEVICE_USAGE: wgpu::BufferUsages = wgpu::BufferUsages::STORAGE
    .union(wgpu::BufferUsages::COPY_DST)
    .union(wgpu::BufferUsages::COPY_SRC);

/// Tracks whether a staging buffer has been handed back to the driver
#[derive(Clone, Debug, Default)]
pub struct StagingRelease(Arc<AtomicBool>);

impl StagingRelease {
    pub fn is_released(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn mark_released(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// A device-exclusive buffer plus the release state of its staging source
pub struct Provisioned {
    pub buffer: wgpu::Buffer,
    /// Length of the host data (the buffer may be padded up to copy alignment)
    pub len: u64,
    pub staging: StagingRelease,
}

/// Create the mapped staging buffer and its device-exclusive destination.
///
/// Allocation failures are captured and returned; the buffers are only handed
/// out once both are known to be valid.
async fn allocate(ctx: &GpuContext, label: &str, size: u64) -> Result<(wgpu::Buffer, wgpu::Buffer)> {
    ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
    ctx.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

    let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(&format!("{label} (staging)")),
        size,
        usage: wgpu::BufferUsages::MAP_WRITE | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: true,
    });

    let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: DEVICE_USAGE,
        mapped_at_creation: false,
    });

    let out_of_memory = ctx.device.pop_error_scope().await;
    let invalid = ctx.device.pop_error_scope().await;
    if let Some(err) = out_of_memory.or(invalid) {
        bail!("{label}: failed to allocate {size} bytes: {err}");
    }
    Ok((staging, buffer))
}

/// Copy `contents` into a new device-exclusive buffer.
///
/// Fails on empty input, on sizes beyond the device limit, and when either
/// allocation reports out-of-memory.
pub async fn provision(ctx: &GpuContext, label: &str, contents: &[u8]) -> Result<Provisioned> {
    ensure!(!contents.is_empty(), "{label}: nothing to provision");

    let len = contents.len() as u64;
    let size = len.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
    let max = ctx.device.limits().max_buffer_size;
    ensure!(
        size <= max,
        "{label}: {size} bytes exceeds the device buffer limit of {max} bytes"
    );

    let (staging, buffer) = allocate(ctx, label, size).await?;

    {
        let mut view = staging.slice(..).get_mapped_range_mut();
        view[..contents.len()].copy_from_slice(contents);
    }
    staging.unmap();

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Provisioning Encoder"),
        });
    encoder.copy_buffer_to_buffer(&staging, 0, &buffer, 0, size);
    ctx.queue.submit(std::iter::once(encoder.finish()));

    let release = StagingRelease::default();
    let on_done = release.clone();
    ctx.queue.on_submitted_work_done(move || {
        staging.destroy();
        on_done.mark_released();
    });

    log::info!("✓ Provisioned {label} ({len} bytes)");

    Ok(Provisioned {
        buffer,
        len,
        staging: release,
    })
}

/// Typed convenience over [`provision`]
pub async fn provision_slice<T: bytemuck::Pod>(
    ctx: &GpuContext,
    label: &str,
    data: &[T],
) -> Result<Provisioned> {
    provision(ctx, label, bytemuck::cast_slice(data)).await
}

/// Blocking copy of `len` bytes out of a `COPY_SRC` buffer.
///
/// Diagnostic only: it stalls until the queue drains.
pub fn read_back(ctx: &GpuContext, buffer: &wgpu::Buffer, len: u64) -> Result<Vec<u8>> {
    ensure!(len > 0, "nothing to read back");
    let size = len.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);

    let readback = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Buffer"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
    encoder.copy_buffer_to_buffer(buffer, 0, &readback, 0, size);
    ctx.queue.submit(std::iter::once(encoder.finish()));

    let slice = readback.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    ctx.device
        .poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        })
        .context("device lost while waiting for readback")?;
    rx.recv()
        .context("readback callback never ran")?
        .context("failed to map readback buffer")?;

    let bytes = {
        let data = slice.get_mapped_range();
        data[..len as usize].to_vec()
    };
    readback.unmap();
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_allocation_is_an_error() {
        let ctx = match pollster::block_on(GpuContext::headless()) {
            Ok(ctx) => ctx,
            Err(err) => {
                eprintln!("skipping GPU test: {err:#}");
                return;
            }
        };

        let size = ctx.device.limits().max_buffer_size + wgpu::COPY_BUFFER_ALIGNMENT;
        let err = pollster::block_on(allocate(&ctx, "Oversized", size)).unwrap_err();
        assert!(err.to_string().contains("failed to allocate"));

        // The device stays usable afterwards
        let (staging, buffer) = pollster::block_on(allocate(&ctx, "Small", 16)).unwrap();
        assert_eq!(buffer.size(), 16);
        assert_eq!(buffer.usage(), DEVICE_USAGE);
        assert!(staging.usage().contains(wgpu::BufferUsages::MAP_WRITE));
    }
}
