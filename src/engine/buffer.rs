use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::error::{EngineError, EngineResult};
use super::scene::Scene;

pub const FLOATS_PER_VERTEX: usize = 3;

/// Opaque id of a device-resident buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// The slice of a graphics API the engine needs for vertex data.
pub trait GpuDevice {
    /// Allocates a buffer and uploads `data` into it. Implementations must not
    /// leave a buffer allocated when they return an error.
    fn create_vertex_buffer(&mut self, data: &[f32]) -> EngineResult<BufferHandle>;

    fn destroy_buffer(&mut self, buffer: BufferHandle);
}

struct VertexBuffer {
    handle: BufferHandle,
    vertex_count: usize,
}

/// Owns the packed node-position buffer and the device it lives on.
///
/// The buffer is released on [`GpuBufferManager::release`] and again, if still
/// held, when the manager is dropped.
pub struct GpuBufferManager {
    device: Box<dyn GpuDevice>,
    buffer: Option<VertexBuffer>,
    packed: Vec<f32>,
}

impl GpuBufferManager {
    pub fn new(device: Box<dyn GpuDevice>) -> Self {
        Self {
            device,
            buffer: None,
            packed: Vec::new(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.buffer.as_ref().map_or(0, |buffer| buffer.vertex_count)
    }

    /// Device buffer holding the current packed positions, if one is live.
    pub fn handle(&self) -> Option<BufferHandle> {
        self.buffer.as_ref().map(|buffer| buffer.handle)
    }

    pub fn is_allocated(&self) -> bool {
        self.buffer.is_some()
    }

    /// Last packed vertex data, xyz per node in scene order.
    pub fn packed(&self) -> &[f32] {
        &self.packed
    }

    /// Repacks node positions and reallocates the device buffer.
    ///
    /// The previous buffer is released before the new one is requested, so a
    /// failed allocation leaves nothing behind.
    pub fn rebuild(&mut self, scene: &Scene) -> EngineResult<()> {
        self.release();

        self.packed.clear();
        self.packed.reserve(scene.node_count() * FLOATS_PER_VERTEX);
        for node in scene.nodes() {
            self.packed.extend_from_slice(&node.position.to_array());
        }

        if self.packed.is_empty() {
            log::debug!("vertex buffer rebuild skipped: scene is empty");
            return Ok(());
        }

        let handle = self.device.create_vertex_buffer(&self.packed)?;
        let vertex_count = scene.node_count();
        log::debug!("vertex buffer {handle:?} allocated for {vertex_count} nodes");
        self.buffer = Some(VertexBuffer {
            handle,
            vertex_count,
        });
        Ok(())
    }

    pub fn release(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.device.destroy_buffer(buffer.handle);
            log::debug!("vertex buffer {:?} released", buffer.handle);
        }
    }
}

impl Drop for GpuBufferManager {
    fn drop(&mut self) {
        self.release();
    }
}

/// Shared allocation counters for [`HeadlessDevice`].
#[derive(Clone, Debug, Default)]
pub struct DeviceStats {
    allocated: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl DeviceStats {
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::Relaxed)
    }

    pub fn live(&self) -> usize {
        self.allocated().saturating_sub(self.released())
    }
}

/// CPU-side device used when no graphics context is available.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next_id: u64,
    stats: DeviceStats,
    fail_allocations: bool,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> DeviceStats {
        self.stats.clone()
    }

    /// Makes every later allocation fail, for exercising error paths.
    pub fn failing() -> Self {
        Self {
            fail_allocations: true,
            ..Self::default()
        }
    }
}

impl GpuDevice for HeadlessDevice {
    fn create_vertex_buffer(&mut self, data: &[f32]) -> EngineResult<BufferHandle> {
        if self.fail_allocations {
            return Err(EngineError::Device(format!(
                "refusing to allocate {} floats",
                data.len()
            )));
        }
        self.next_id += 1;
        self.stats.allocated.fetch_add(1, Ordering::Relaxed);
        Ok(BufferHandle(self.next_id))
    }

    fn destroy_buffer(&mut self, _buffer: BufferHandle) {
        self.stats.released.fetch_add(1, Ordering::Relaxed);
    }
}
