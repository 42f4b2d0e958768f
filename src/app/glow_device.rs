use std::num::NonZeroU32;
use std::sync::Arc;

use eframe::glow::{self, HasContext};

use crate::engine::{BufferHandle, EngineError, EngineResult, GpuDevice};

/// Vertex buffers on eframe's OpenGL context. Calls must come from the UI
/// thread while the context is current.
pub(super) struct GlowDevice {
    gl: Arc<glow::Context>,
}

impl GlowDevice {
    pub(super) fn new(gl: Arc<glow::Context>) -> Self {
        Self { gl }
    }
}

pub(super) fn native_buffer(handle: BufferHandle) -> Option<glow::NativeBuffer> {
    u32::try_from(handle.0)
        .ok()
        .and_then(NonZeroU32::new)
        .map(glow::NativeBuffer)
}

impl GpuDevice for GlowDevice {
    fn create_vertex_buffer(&mut self, data: &[f32]) -> EngineResult<BufferHandle> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        // SAFETY: the context is current on this thread for the whole frame and
        // the buffer is unbound again before returning.
        unsafe {
            let buffer = self.gl.create_buffer().map_err(EngineError::Device)?;
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl
                .buffer_data_u8_slice(glow::ARRAY_BUFFER, bytes, glow::STATIC_DRAW);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);

            let error = self.gl.get_error();
            if error != glow::NO_ERROR {
                self.gl.delete_buffer(buffer);
                return Err(EngineError::Device(format!(
                    "glBufferData failed with 0x{error:04x}"
                )));
            }
            Ok(BufferHandle(u64::from(buffer.0.get())))
        }
    }

    fn destroy_buffer(&mut self, handle: BufferHandle) {
        let Some(buffer) = native_buffer(handle) else {
            log::warn!("ignoring release of invalid buffer handle {handle:?}");
            return;
        };
        // SAFETY: the handle came from `create_vertex_buffer` on this context.
        unsafe { self.gl.delete_buffer(buffer) };
    }
}
