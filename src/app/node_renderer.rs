use eframe::egui_glow::ShaderVersion;
use eframe::glow::{self, HasContext};

use crate::engine::{EngineError, EngineResult, NodeBatch};

use super::glow_device::native_buffer;

const POSITION_ATTRIBUTE: u32 = 0;

const VERTEX_SHADER: &str = r#"
uniform mat4 u_view_projection;
uniform float u_point_size;
in vec3 a_position;

void main() {
    gl_Position = u_view_projection * vec4(a_position, 1.0);
    gl_PointSize = u_point_size;
}
"#;

const FRAGMENT_SHADER: &str = r#"
precision mediump float;
uniform vec4 u_color;
out vec4 out_color;

void main() {
    vec2 offset = gl_PointCoord * 2.0 - 1.0;
    float radius = dot(offset, offset);
    if (radius > 1.0) {
        discard;
    }
    float rim = step(0.72, radius) * 0.35;
    out_color = vec4(mix(u_color.rgb, vec3(0.0), rim), u_color.a);
}
"#;

struct RunRange {
    offset_bytes: i32,
    count: i32,
    diameter: f32,
    color: [f32; 4],
}

/// Everything one paint callback needs, detached from the engine borrow.
pub(super) struct NodeDraw {
    positions: glow::Buffer,
    view_projection: [f32; 16],
    indices: Vec<u32>,
    runs: Vec<RunRange>,
}

impl NodeDraw {
    /// `None` when the batch has no buffer bound or nothing to draw.
    pub(super) fn from_batch(batch: &NodeBatch<'_>) -> Option<Self> {
        let positions = batch.buffer.and_then(native_buffer)?;
        if batch.node_count() == 0 {
            return None;
        }

        let mut indices = Vec::with_capacity(batch.node_count());
        let mut runs = Vec::with_capacity(batch.runs.len());
        for run in batch.runs {
            runs.push(RunRange {
                offset_bytes: (indices.len() * size_of::<u32>()) as i32,
                count: run.vertices.len() as i32,
                diameter: run.diameter,
                color: run.color.to_normalized_gamma_f32(),
            });
            indices.extend_from_slice(&run.vertices);
        }

        Some(Self {
            positions,
            view_projection: batch.view_projection.to_cols_array(),
            indices,
            runs,
        })
    }
}

/// Point-sprite program drawing node runs straight from the node vertex
/// buffer.
pub(super) struct NodeRenderer {
    program: glow::Program,
    vertex_array: glow::VertexArray,
    indices: glow::Buffer,
    view_projection: Option<glow::UniformLocation>,
    point_size: Option<glow::UniformLocation>,
    color: Option<glow::UniformLocation>,
    embedded: bool,
}

unsafe fn compile_shader(
    gl: &glow::Context,
    kind: u32,
    version: ShaderVersion,
    source: &str,
) -> EngineResult<glow::Shader> {
    // SAFETY: called with the eframe context current on the UI thread.
    unsafe {
        let shader = gl.create_shader(kind).map_err(EngineError::Device)?;
        gl.shader_source(shader, &format!("{}{source}", version.version_declaration()));
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(EngineError::Device(format!("node shader failed to compile: {log}")));
        }
        Ok(shader)
    }
}

impl NodeRenderer {
    pub(super) fn new(gl: &glow::Context) -> EngineResult<Self> {
        let version = ShaderVersion::get(gl);
        if !version.is_new_shader_interface() {
            return Err(EngineError::Device(format!(
                "{version:?} shaders cannot draw node sprites"
            )));
        }

        // SAFETY: the context is current on the UI thread during app creation.
        unsafe {
            let vertex = compile_shader(gl, glow::VERTEX_SHADER, version, VERTEX_SHADER)?;
            let fragment = match compile_shader(gl, glow::FRAGMENT_SHADER, version, FRAGMENT_SHADER) {
                Ok(fragment) => fragment,
                Err(error) => {
                    gl.delete_shader(vertex);
                    return Err(error);
                }
            };

            let program = gl.create_program().map_err(EngineError::Device)?;
            gl.attach_shader(program, vertex);
            gl.attach_shader(program, fragment);
            gl.bind_attrib_location(program, POSITION_ATTRIBUTE, "a_position");
            gl.link_program(program);
            for shader in [vertex, fragment] {
                gl.detach_shader(program, shader);
                gl.delete_shader(shader);
            }
            if !gl.get_program_link_status(program) {
                let log = gl.get_program_info_log(program);
                gl.delete_program(program);
                return Err(EngineError::Device(format!("node program failed to link: {log}")));
            }

            let vertex_array = match gl.create_vertex_array() {
                Ok(vertex_array) => vertex_array,
                Err(error) => {
                    gl.delete_program(program);
                    return Err(EngineError::Device(error));
                }
            };
            let indices = match gl.create_buffer() {
                Ok(indices) => indices,
                Err(error) => {
                    gl.delete_vertex_array(vertex_array);
                    gl.delete_program(program);
                    return Err(EngineError::Device(error));
                }
            };

            log::info!("node sprite program ready ({version:?})");
            Ok(Self {
                view_projection: gl.get_uniform_location(program, "u_view_projection"),
                point_size: gl.get_uniform_location(program, "u_point_size"),
                color: gl.get_uniform_location(program, "u_color"),
                program,
                vertex_array,
                indices,
                embedded: version.is_embedded(),
            })
        }
    }

    /// Draws the runs of `draw` into the viewport egui set up for the callback.
    pub(super) fn paint(&self, gl: &glow::Context, draw: &NodeDraw, pixels_per_point: f32) {
        // SAFETY: egui_glow invokes paint callbacks on the UI thread with its
        // context current; every binding changed here is reset before
        // returning or restored by egui_glow afterwards.
        unsafe {
            gl.use_program(Some(self.program));
            gl.uniform_matrix_4_f32_slice(self.view_projection.as_ref(), false, &draw.view_projection);

            gl.bind_vertex_array(Some(self.vertex_array));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(draw.positions));
            gl.enable_vertex_attrib_array(POSITION_ATTRIBUTE);
            gl.vertex_attrib_pointer_f32(POSITION_ATTRIBUTE, 3, glow::FLOAT, false, 0, 0);
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(self.indices));
            gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(&draw.indices),
                glow::STREAM_DRAW,
            );

            if !self.embedded {
                gl.enable(glow::PROGRAM_POINT_SIZE);
            }
            for run in &draw.runs {
                let [r, g, b, a] = run.color;
                gl.uniform_1_f32(self.point_size.as_ref(), run.diameter * pixels_per_point);
                gl.uniform_4_f32(self.color.as_ref(), r, g, b, a);
                gl.draw_elements(glow::POINTS, run.count, glow::UNSIGNED_INT, run.offset_bytes);
            }
            if !self.embedded {
                gl.disable(glow::PROGRAM_POINT_SIZE);
            }

            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            gl.use_program(None);
        }
    }

    pub(super) fn destroy(&self, gl: &glow::Context) {
        // SAFETY: called once from `on_exit` while the context is still alive.
        unsafe {
            gl.delete_buffer(self.indices);
            gl.delete_vertex_array(self.vertex_array);
            gl.delete_program(self.program);
        }
    }
}
