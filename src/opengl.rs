use std::sync::Arc;

use glow::HasContext;

use crate::{
    device::{BufferKind, BufferUsage, Layout, RenderDevice},
    error::DeviceError,
    viewport::Viewport,
};

/// `RenderDevice` over an OpenGL 3.3 core context.
pub struct GlowDevice {
    gl: Arc<glow::Context>,
}

impl GlowDevice {
    pub fn new(gl: Arc<glow::Context>) -> Self {
        unsafe {
            gl.enable(glow::DEPTH_TEST);
            gl.depth_func(glow::LESS);
        }
        Self { gl }
    }
}

/// Routes driver debug output into the `gpu` log target. Must run before the
/// context is shared.
pub fn install_debug_callback(gl: &mut glow::Context) {
    if !gl.supports_debug() {
        log::debug!(target: "gpu", "GL debug output not supported by this context");
        return;
    }

    unsafe {
        gl.enable(glow::DEBUG_OUTPUT);
        gl.debug_message_callback(|_source, gl_type, id, severity, message| {
            if gl_type == glow::DEBUG_TYPE_ERROR {
                log::error!(target: "gpu", "** GL ERROR ** id = {id}, message = {message}");
            } else if severity == glow::DEBUG_SEVERITY_HIGH
                || severity == glow::DEBUG_SEVERITY_MEDIUM
            {
                log::warn!(target: "gpu", "GL: id = {id}, message = {message}");
            } else {
                log::trace!(target: "gpu", "GL: id = {id}, message = {message}");
            }
        });
    }
}

fn target(kind: BufferKind) -> u32 {
    match kind {
        BufferKind::Vertex => glow::ARRAY_BUFFER,
        BufferKind::Index => glow::ELEMENT_ARRAY_BUFFER,
        BufferKind::Uniform => glow::UNIFORM_BUFFER,
    }
}

fn usage_hint(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::Static => glow::STATIC_DRAW,
        BufferUsage::Dynamic => glow::DYNAMIC_DRAW,
    }
}

impl RenderDevice for GlowDevice {
    type Buffer = glow::Buffer;
    type VertexArray = glow::VertexArray;
    type Program = glow::Program;

    fn create_buffer(
        &self,
        kind: BufferKind,
        data: &[u8],
        usage: BufferUsage,
    ) -> Result<Self::Buffer, DeviceError> {
        unsafe {
            let buffer = self.gl.create_buffer().map_err(DeviceError::Allocation)?;
            // Index buffers bind to whatever vertex array is current; keep it out of the way.
            if kind == BufferKind::Index {
                self.gl.bind_vertex_array(None);
            }
            self.gl.bind_buffer(target(kind), Some(buffer));
            self.gl.buffer_data_u8_slice(target(kind), data, usage_hint(usage));
            self.gl.bind_buffer(target(kind), None);
            Ok(buffer)
        }
    }

    fn update_buffer(
        &self,
        kind: BufferKind,
        buffer: Self::Buffer,
        byte_offset: usize,
        data: &[u8],
    ) {
        unsafe {
            if kind == BufferKind::Index {
                self.gl.bind_vertex_array(None);
            }
            self.gl.bind_buffer(target(kind), Some(buffer));
            self.gl.buffer_sub_data_u8_slice(target(kind), byte_offset as i32, data);
        }
    }

    fn destroy_buffer(&self, buffer: Self::Buffer) {
        unsafe { self.gl.delete_buffer(buffer) }
    }

    fn create_vertex_array(
        &self,
        vertex_buffer: Self::Buffer,
        index_buffer: Self::Buffer,
        stride: i32,
        layouts: &[Layout],
    ) -> Result<Self::VertexArray, DeviceError> {
        unsafe {
            let vao = self.gl.create_vertex_array().map_err(DeviceError::Allocation)?;
            self.gl.bind_vertex_array(Some(vao));

            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(vertex_buffer));
            for layout in layouts {
                self.gl.vertex_attrib_pointer_f32(
                    layout.index,
                    layout.size,
                    glow::FLOAT,
                    false,
                    stride,
                    layout.offset as i32,
                );
                self.gl.enable_vertex_attrib_array(layout.index);
            }
            self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(index_buffer));

            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
            Ok(vao)
        }
    }

    fn destroy_vertex_array(&self, vertex_array: Self::VertexArray) {
        unsafe { self.gl.delete_vertex_array(vertex_array) }
    }

    fn create_program(
        &self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self::Program, DeviceError> {
        unsafe {
            let vertex_shader =
                compile_shader(&self.gl, glow::VERTEX_SHADER, "vertex", vertex_source)?;
            let fragment_shader = match compile_shader(
                &self.gl,
                glow::FRAGMENT_SHADER,
                "fragment",
                fragment_source,
            ) {
                Ok(shader) => shader,
                Err(e) => {
                    self.gl.delete_shader(vertex_shader);
                    return Err(e);
                }
            };

            let program = match self.gl.create_program() {
                Ok(program) => program,
                Err(e) => {
                    self.gl.delete_shader(vertex_shader);
                    self.gl.delete_shader(fragment_shader);
                    return Err(DeviceError::Allocation(e));
                }
            };
            self.gl.attach_shader(program, vertex_shader);
            self.gl.attach_shader(program, fragment_shader);
            self.gl.link_program(program);

            self.gl.detach_shader(program, vertex_shader);
            self.gl.detach_shader(program, fragment_shader);
            self.gl.delete_shader(vertex_shader);
            self.gl.delete_shader(fragment_shader);

            if !self.gl.get_program_link_status(program) {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                return Err(DeviceError::ProgramLink(log));
            }

            Ok(program)
        }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { self.gl.use_program(program) }
    }

    fn destroy_program(&self, program: Self::Program) {
        unsafe { self.gl.delete_program(program) }
    }

    fn bind_uniform_block(
        &self,
        program: Self::Program,
        block_name: &str,
        binding: u32,
        buffer: Self::Buffer,
    ) {
        unsafe {
            match self.gl.get_uniform_block_index(program, block_name) {
                Some(index) => self.gl.uniform_block_binding(program, index, binding),
                // The block may be optimised out of the program; the buffer binding still holds.
                None => log::trace!(target: "gpu", "uniform block {block_name} not active"),
            }
            self.gl.bind_buffer_base(glow::UNIFORM_BUFFER, binding, Some(buffer));
        }
    }

    fn draw_indexed(
        &self,
        vertex_array: Self::VertexArray,
        index_count: u32,
        index_byte_offset: usize,
    ) {
        unsafe {
            self.gl.bind_vertex_array(Some(vertex_array));
            self.gl.draw_elements(
                glow::TRIANGLES,
                index_count as i32,
                glow::UNSIGNED_INT,
                index_byte_offset as i32,
            );
            // Some drivers (Intel) misbehave if a vertex array stays bound.
            self.gl.bind_vertex_array(None);
        }
    }

    fn clear_frame(&self, color: [f32; 4]) {
        unsafe {
            self.gl.disable(glow::SCISSOR_TEST);
            self.gl.clear_color(color[0], color[1], color[2], color[3]);
            self.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    fn begin_viewport(&self, viewport: &Viewport) {
        unsafe {
            self.gl.enable(glow::DEPTH_TEST);
            self.gl.depth_func(glow::LESS);
            self.gl.viewport(viewport.x, viewport.y, viewport.width, viewport.height);
            self.gl.enable(glow::SCISSOR_TEST);
            self.gl.scissor(viewport.x, viewport.y, viewport.width, viewport.height);
            self.gl.clear(glow::DEPTH_BUFFER_BIT);
            self.gl.disable(glow::SCISSOR_TEST);
        }
    }
}

unsafe fn compile_shader(
    gl: &glow::Context,
    shader_type: u32,
    stage: &'static str,
    source: &str,
) -> Result<glow::Shader, DeviceError> {
    let shader = gl.create_shader(shader_type).map_err(DeviceError::Allocation)?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);

    if !gl.get_shader_compile_status(shader) {
        let log = gl.get_shader_info_log(shader);
        gl.delete_shader(shader);
        return Err(DeviceError::ShaderCompile { stage, log });
    }

    Ok(shader)
}
