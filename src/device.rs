//! The narrow slice of a graphics API the scene layer needs.
//!
//! `Level`, `StaticMesh` and `Renderer` only ever talk to a `RenderDevice`, so the
//! whole load/upload/draw/free protocol runs the same against OpenGL
//! (`opengl::GlowDevice`) and against a recording fake in tests.

use std::fmt::Debug;

use crate::{error::DeviceError, viewport::Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
    Uniform,
}

/// Hint for how often a buffer's contents are rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Written once at creation.
    Static,
    /// Rewritten every frame (or every draw).
    Dynamic,
}

/// One float vertex attribute inside an interleaved vertex buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub index: u32,
    pub size: i32, // Number of f32 components
    pub offset: usize,
}

impl Layout {
    pub fn new(index: u32, size: i32, offset: usize) -> Self {
        Self {
            index,
            size,
            offset,
        }
    }
}

pub trait RenderDevice {
    type Buffer: Copy + Debug + PartialEq;
    type VertexArray: Copy + Debug + PartialEq;
    type Program: Copy + Debug + PartialEq;

    fn create_buffer(
        &self,
        kind: BufferKind,
        data: &[u8],
        usage: BufferUsage,
    ) -> Result<Self::Buffer, DeviceError>;

    /// Overwrites `data.len()` bytes of `buffer` starting at `byte_offset`.
    fn update_buffer(
        &self,
        kind: BufferKind,
        buffer: Self::Buffer,
        byte_offset: usize,
        data: &[u8],
    );

    fn destroy_buffer(&self, buffer: Self::Buffer);

    /// Records how `layouts` map onto `vertex_buffer` and which index buffer to draw from.
    fn create_vertex_array(
        &self,
        vertex_buffer: Self::Buffer,
        index_buffer: Self::Buffer,
        stride: i32,
        layouts: &[Layout],
    ) -> Result<Self::VertexArray, DeviceError>;

    fn destroy_vertex_array(&self, vertex_array: Self::VertexArray);

    fn create_program(
        &self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self::Program, DeviceError>;

    fn use_program(&self, program: Option<Self::Program>);

    fn destroy_program(&self, program: Self::Program);

    /// Connects the uniform block `block_name` of `program` to `buffer` through `binding`.
    fn bind_uniform_block(
        &self,
        program: Self::Program,
        block_name: &str,
        binding: u32,
        buffer: Self::Buffer,
    );

    /// Draws `index_count` u32 indices as triangles, starting `index_byte_offset` bytes in.
    fn draw_indexed(
        &self,
        vertex_array: Self::VertexArray,
        index_count: u32,
        index_byte_offset: usize,
    );

    /// Clears the whole framebuffer to `color`.
    fn clear_frame(&self, color: [f32; 4]);

    /// Restricts rendering to `viewport` and clears its depth.
    fn begin_viewport(&self, viewport: &Viewport);
}
