use std::path::Path;

use crate::{
    data::{LoadedMaterial, LoadedMesh, MaterialAttributes, Submesh, Vertex},
    error::AssetError,
};

pub const H2B_EXTENSION: &str = "h2b";

const VERTEX_SIZE: usize = std::mem::size_of::<Vertex>();
const ATTRIBUTES_SIZE: usize = std::mem::size_of::<MaterialAttributes>();
const BATCH_SIZE: usize = 8;
const MAX_STRING_LEN: usize = 260;

/// Reads and decodes an H2B file. Nothing but the file is touched.
pub fn load_h2b(path: &Path) -> Result<LoadedMesh, AssetError> {
    let bytes = std::fs::read(path).map_err(|source| AssetError::NotFound {
        path: path.to_path_buf(),
        source,
    })?;

    let mut mesh = parse_h2b(&bytes).map_err(|reason| AssetError::Malformed {
        path: path.to_path_buf(),
        reason,
    })?;

    mesh.name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    mesh.path = path.to_path_buf();

    Ok(mesh)
}

/// Decodes an in-memory H2B file. `name` and `path` of the result are left empty.
pub fn parse_h2b(bytes: &[u8]) -> Result<LoadedMesh, String> {
    let mut reader = ByteReader::new(bytes);

    let version = reader.take(4, "version tag")?;
    if version[1] < b'1' || version[2] < b'9' || version[3] < b'd' {
        return Err(format!(
            "unsupported version tag {:?}",
            String::from_utf8_lossy(version)
        ));
    }

    let vertex_count = reader.read_u32("vertex count")? as usize;
    let index_count = reader.read_u32("index count")? as usize;
    let material_count = reader.read_u32("material count")? as usize;
    let mesh_count = reader.read_u32("mesh count")? as usize;

    let vertex_bytes = reader.take_array(vertex_count, VERTEX_SIZE, "vertices")?;
    let vertices: Vec<Vertex> = vertex_bytes
        .chunks_exact(VERTEX_SIZE)
        .map(bytemuck::pod_read_unaligned)
        .collect();

    let index_bytes = reader.take_array(index_count, 4, "indices")?;
    let indices: Vec<u32> = index_bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    let mut materials = Vec::with_capacity(material_count.min(1024));
    for _ in 0..material_count {
        let attributes: MaterialAttributes =
            bytemuck::pod_read_unaligned(reader.take(ATTRIBUTES_SIZE, "material attributes")?);
        materials.push(LoadedMaterial {
            attributes,
            name: reader.read_string("material name")?,
            diffuse_map: reader.read_string("map_Kd")?,
            specular_map: reader.read_string("map_Ks")?,
            ambient_map: reader.read_string("map_Ka")?,
            emissive_map: reader.read_string("map_Ke")?,
            specular_exponent_map: reader.read_string("map_Ns")?,
            dissolve_map: reader.read_string("map_d")?,
            displacement_map: reader.read_string("disp")?,
            decal_map: reader.read_string("decal")?,
            bump_map: reader.read_string("bump")?,
        });
    }

    // Per-material batches duplicate what the mesh records below already say.
    reader.take_array(material_count, BATCH_SIZE, "material batches")?;

    let mut submeshes = Vec::with_capacity(mesh_count.min(1024));
    for _ in 0..mesh_count {
        let name = reader.read_string("mesh name")?;
        let index_count = reader.read_u32("mesh index count")?;
        let index_offset = reader.read_u32("mesh index offset")?;
        let material_index = reader.read_u32("mesh material index")?;
        submeshes.push(Submesh {
            name,
            index_count,
            index_offset,
            material_index,
        });
    }

    let mesh = LoadedMesh {
        name: String::new(),
        path: Default::default(),
        vertices,
        indices,
        materials,
        submeshes,
    };
    validate(&mesh)?;

    Ok(mesh)
}

fn validate(mesh: &LoadedMesh) -> Result<(), String> {
    if mesh.submeshes.is_empty() {
        return Err("no meshes".to_string());
    }

    for (i, submesh) in mesh.submeshes.iter().enumerate() {
        let range = submesh.index_range();
        if range.end > mesh.indices.len() {
            return Err(format!(
                "mesh {i} draws indices {}..{} but only {} exist",
                range.start,
                range.end,
                mesh.indices.len()
            ));
        }
        if submesh.material_index as usize >= mesh.materials.len() {
            return Err(format!(
                "mesh {i} uses material {} but only {} exist",
                submesh.material_index,
                mesh.materials.len()
            ));
        }
    }

    if let Some(bad) = mesh
        .indices
        .iter()
        .find(|&&index| index as usize >= mesh.vertices.len())
    {
        return Err(format!(
            "index {bad} is out of range for {} vertices",
            mesh.vertices.len()
        ));
    }

    Ok(())
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8], String> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| format!("truncated while reading {what} at byte {}", self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_array(&mut self, count: usize, size: usize, what: &str) -> Result<&'a [u8], String> {
        let len = count
            .checked_mul(size)
            .ok_or_else(|| format!("{what} count {count} overflows"))?;
        self.take(len, what)
    }

    fn read_u32(&mut self, what: &str) -> Result<u32, String> {
        let b = self.take(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// NUL-terminated string; an empty string means "absent".
    fn read_string(&mut self, what: &str) -> Result<Option<String>, String> {
        let rest = &self.bytes[self.pos..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| format!("unterminated {what} at byte {}", self.pos))?;
        if len >= MAX_STRING_LEN {
            return Err(format!("{what} longer than {MAX_STRING_LEN} bytes"));
        }
        let text = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.pos += len + 1;
        Ok((!text.is_empty()).then_some(text))
    }
}
