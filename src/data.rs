use std::path::PathBuf;

use bytemuck::{Pod, Zeroable};

/// One vertex as stored in an H2B file: position, texture coordinate, normal.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uvw: [f32; 3],
    pub normal: [f32; 3],
}

/// Surface description of a material, laid out to match the `ModelData` block in
/// the shaders (every vec3 is packed with a scalar so std140 adds no padding).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct MaterialAttributes {
    pub diffuse: [f32; 3],
    pub dissolve: f32,
    pub specular: [f32; 3],
    pub specular_exponent: f32,
    pub ambient: [f32; 3],
    pub sharpness: f32,
    pub transmission_filter: [f32; 3],
    pub optical_density: f32,
    pub emissive: [f32; 3],
    pub illumination_model: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedMaterial {
    pub name: Option<String>,
    pub attributes: MaterialAttributes,

    pub diffuse_map: Option<String>,
    pub specular_map: Option<String>,
    pub ambient_map: Option<String>,
    pub emissive_map: Option<String>,
    pub specular_exponent_map: Option<String>,
    pub dissolve_map: Option<String>,
    pub displacement_map: Option<String>,
    pub decal_map: Option<String>,
    pub bump_map: Option<String>,
}

/// A contiguous index range drawn with one material.
#[derive(Debug, Clone, PartialEq)]
pub struct Submesh {
    pub name: Option<String>,
    pub index_count: u32,
    pub index_offset: u32, // In indices, not bytes
    pub material_index: u32,
}

impl Submesh {
    pub fn index_range(&self) -> std::ops::Range<usize> {
        let start = self.index_offset as usize;
        start..start + self.index_count as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedMesh {
    pub name: String,
    pub path: PathBuf,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub materials: Vec<LoadedMaterial>,
    pub submeshes: Vec<Submesh>,
}

impl LoadedMesh {
    /// Material attributes used by `submesh`; falls back to defaults if the index is stale.
    pub fn material_for(&self, submesh: &Submesh) -> MaterialAttributes {
        self.materials
            .get(submesh.material_index as usize)
            .map(|m| m.attributes)
            .unwrap_or_default()
    }
}

/// Per-instance uniform block (`ModelData`, binding 2).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ModelData {
    pub world: [[f32; 4]; 4],
    pub material: MaterialAttributes,
}

/// Per-frame uniform block (`SceneData`, binding 1), shared by both viewports.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SceneData {
    pub sun_direction: [f32; 4],
    pub sun_color: [f32; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub sun_ambient: [f32; 4],
}

impl SceneData {
    pub const VIEW_OFFSET: usize = std::mem::offset_of!(SceneData, view);
    pub const CAMERA_POS_OFFSET: usize = std::mem::offset_of!(SceneData, camera_pos);
}
