use std::path::Path;

use cgmath::SquareMatrix;

use crate::{
    data::{LoadedMesh, MaterialAttributes, ModelData, Submesh, Vertex},
    device::{BufferKind, BufferUsage, Layout, RenderDevice},
    error::{AssetError, DeviceError, SceneError},
    loader,
};

/// Uniform block name and binding point of the per-instance `ModelData`.
pub const MODEL_DATA_BLOCK: &str = "ModelData";
pub const MODEL_DATA_BINDING: u32 = 2;

/// One indexed draw, captured from a submesh at upload time.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawBatch {
    pub index_count: u32,
    pub index_byte_offset: usize,
    pub material: MaterialAttributes,
}

/// Device resources owned by exactly one `StaticMesh`.
#[derive(Debug)]
pub struct StaticRenderData<D: RenderDevice> {
    pub vao: D::VertexArray,
    pub vbo: D::Buffer,
    pub ebo: D::Buffer,
    pub ubo: D::Buffer,
    pub stride: i32,
    pub layouts: Vec<Layout>,
    pub batches: Vec<DrawBatch>,

    pub vertex_count: usize,
    pub index_count: usize,
}

impl<D: RenderDevice> StaticRenderData<D> {
    pub fn new(
        device: &D,
        mesh: &LoadedMesh,
        world: &cgmath::Matrix4<f32>,
    ) -> Result<Self, DeviceError> {
        let layouts = determine_layouts();
        let stride = calculate_stride(&layouts);

        let vbo = device.create_buffer(
            BufferKind::Vertex,
            bytemuck::cast_slice(&mesh.vertices),
            BufferUsage::Static,
        )?;

        let ebo = match device.create_buffer(
            BufferKind::Index,
            bytemuck::cast_slice(&mesh.indices),
            BufferUsage::Static,
        ) {
            Ok(ebo) => ebo,
            Err(e) => {
                device.destroy_buffer(vbo);
                return Err(e);
            }
        };

        let initial = ModelData {
            world: (*world).into(),
            material: MaterialAttributes::default(),
        };
        let ubo = match device.create_buffer(
            BufferKind::Uniform,
            bytemuck::bytes_of(&initial),
            BufferUsage::Dynamic,
        ) {
            Ok(ubo) => ubo,
            Err(e) => {
                device.destroy_buffer(ebo);
                device.destroy_buffer(vbo);
                return Err(e);
            }
        };

        let vao = match device.create_vertex_array(vbo, ebo, stride, &layouts) {
            Ok(vao) => vao,
            Err(e) => {
                device.destroy_buffer(ubo);
                device.destroy_buffer(ebo);
                device.destroy_buffer(vbo);
                return Err(e);
            }
        };

        let batches = mesh
            .submeshes
            .iter()
            .map(|submesh| draw_batch(mesh, submesh))
            .collect();

        Ok(Self {
            vao,
            vbo,
            ebo,
            ubo,
            stride,
            layouts,
            batches,
            vertex_count: mesh.vertices.len(),
            index_count: mesh.indices.len(),
        })
    }

    pub fn destroy(self, device: &D) {
        device.destroy_vertex_array(self.vao);
        device.destroy_buffer(self.vbo);
        device.destroy_buffer(self.ebo);
        device.destroy_buffer(self.ubo);
    }
}

fn draw_batch(mesh: &LoadedMesh, submesh: &Submesh) -> DrawBatch {
    DrawBatch {
        index_count: submesh.index_count,
        index_byte_offset: submesh.index_offset as usize * std::mem::size_of::<u32>(),
        material: mesh.material_for(submesh),
    }
}

/// A placed, renderable copy of one H2B mesh.
///
/// Lifecycle: `load_from_disk` → `upload_to_gpu` → `draw`* → `free_resources`.
/// `render_data` is `Some` exactly while the instance owns device resources.
#[derive(Debug)]
pub struct StaticMesh<D: RenderDevice> {
    pub name: String,
    world: cgmath::Matrix4<f32>,
    mesh: Option<LoadedMesh>,
    render_data: Option<StaticRenderData<D>>,
}

impl<D: RenderDevice> StaticMesh<D> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            world: cgmath::Matrix4::identity(),
            mesh: None,
            render_data: None,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_world_matrix(&mut self, world: cgmath::Matrix4<f32>) {
        self.world = world;
    }

    pub fn world_matrix(&self) -> &cgmath::Matrix4<f32> {
        &self.world
    }

    pub fn mesh(&self) -> Option<&LoadedMesh> {
        self.mesh.as_ref()
    }

    pub fn render_data(&self) -> Option<&StaticRenderData<D>> {
        self.render_data.as_ref()
    }

    pub fn is_uploaded(&self) -> bool {
        self.render_data.is_some()
    }

    /// Replaces the CPU mesh with the contents of `path`. On failure the mesh is left empty.
    pub fn load_from_disk(&mut self, path: &Path) -> Result<(), AssetError> {
        match loader::load_h2b(path) {
            Ok(mesh) => {
                self.mesh = Some(mesh);
                Ok(())
            }
            Err(e) => {
                self.mesh = None;
                Err(e)
            }
        }
    }

    /// Creates this instance's vertex, index and uniform buffers plus vertex layout.
    /// A second upload without `free_resources` in between is rejected.
    pub fn upload_to_gpu(&mut self, device: &D) -> Result<(), SceneError> {
        if self.render_data.is_some() {
            return Err(SceneError::AlreadyUploaded {
                name: self.name.clone(),
            });
        }
        let mesh = self.mesh.as_ref().ok_or_else(|| SceneError::NoMeshData {
            name: self.name.clone(),
        })?;

        let render_data =
            StaticRenderData::new(device, mesh, &self.world).map_err(|source| SceneError::Device {
                name: self.name.clone(),
                source,
            })?;

        log::debug!(
            target: "gpu",
            "{}: uploaded {} vertices, {} indices, {} batches",
            self.name,
            render_data.vertex_count,
            render_data.index_count,
            render_data.batches.len()
        );
        self.render_data = Some(render_data);
        Ok(())
    }

    /// One indexed draw per submesh. The uniform buffer is rewritten before every
    /// draw, so draws must be issued in order from a single thread.
    pub fn draw(&self, device: &D, program: D::Program) -> Result<(), SceneError> {
        let render_data = self.render_data.as_ref().ok_or_else(|| SceneError::NotUploaded {
            name: self.name.clone(),
        })?;

        device.bind_uniform_block(program, MODEL_DATA_BLOCK, MODEL_DATA_BINDING, render_data.ubo);

        for batch in &render_data.batches {
            let model = ModelData {
                world: self.world.into(),
                material: batch.material,
            };
            let model = bytemuck::bytes_of(&model);
            device.update_buffer(BufferKind::Uniform, render_data.ubo, 0, model);
            device.draw_indexed(render_data.vao, batch.index_count, batch.index_byte_offset);
        }

        Ok(())
    }

    /// Releases all device resources. No-op when nothing is allocated.
    pub fn free_resources(&mut self, device: &D) {
        if let Some(render_data) = self.render_data.take() {
            render_data.destroy(device);
        }
    }
}

impl<D: RenderDevice> Drop for StaticMesh<D> {
    fn drop(&mut self) {
        if self.render_data.is_some() {
            log::warn!(
                target: "gpu",
                "{} dropped while still owning GPU resources; they leak until the context dies",
                self.name
            );
        }
    }
}

/// Position, uvw and normal, three floats each, interleaved.
pub fn determine_layouts() -> Vec<Layout> {
    let float = std::mem::size_of::<f32>();
    vec![
        Layout::new(0, 3, 0),
        Layout::new(1, 3, 3 * float),
        Layout::new(2, 3, 6 * float),
    ]
}

pub fn calculate_stride(layouts: &[Layout]) -> i32 {
    let stride = layouts
        .iter()
        .map(|l| l.offset + l.size as usize * std::mem::size_of::<f32>())
        .max()
        .unwrap_or(0);
    debug_assert_eq!(stride, std::mem::size_of::<Vertex>());
    stride as i32
}
