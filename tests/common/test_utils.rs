use std::{
    cell::RefCell,
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, Once,
    },
};

use level_viewer::{
    data::{MaterialAttributes, Vertex},
    device::{BufferKind, BufferUsage, Layout, RenderDevice},
    error::DeviceError,
    viewport::Viewport,
};

/// Every call the scene layer makes on a `RecordingDevice`, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateBuffer { kind: BufferKind, id: u32, len: usize },
    UpdateBuffer { kind: BufferKind, id: u32, offset: usize, data: Vec<u8> },
    DestroyBuffer(u32),
    CreateVertexArray { id: u32, vbo: u32, ebo: u32, stride: i32 },
    DestroyVertexArray(u32),
    CreateProgram(u32),
    UseProgram(Option<u32>),
    DestroyProgram(u32),
    BindUniformBlock { program: u32, block: String, binding: u32, buffer: u32 },
    DrawIndexed { vao: u32, index_count: u32, index_byte_offset: usize },
    ClearFrame,
    BeginViewport(Viewport),
}

#[derive(Default)]
struct State {
    next_id: u32,
    allocations_left: Option<usize>,
    buffers: HashSet<u32>,
    vertex_arrays: HashSet<u32>,
    programs: HashSet<u32>,
    calls: Vec<Call>,
}

impl State {
    fn allocate(&mut self) -> Result<u32, DeviceError> {
        if let Some(left) = self.allocations_left.as_mut() {
            if *left == 0 {
                return Err(DeviceError::Allocation("out of device memory".into()));
            }
            *left -= 1;
        }
        self.next_id += 1;
        Ok(self.next_id)
    }
}

/// A `RenderDevice` that hands out integer handles and remembers what was done with them.
#[derive(Default)]
pub struct RecordingDevice {
    state: RefCell<State>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` allocations succeed, every one after that fails.
    pub fn fail_allocations_after(&self, n: usize) {
        self.state.borrow_mut().allocations_left = Some(n);
    }

    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.state.borrow().vertex_arrays.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn draws(&self) -> Vec<(u32, u32, usize)> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::DrawIndexed {
                    vao,
                    index_count,
                    index_byte_offset,
                } => Some((*vao, *index_count, *index_byte_offset)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl RenderDevice for RecordingDevice {
    type Buffer = u32;
    type VertexArray = u32;
    type Program = u32;

    fn create_buffer(
        &self,
        kind: BufferKind,
        data: &[u8],
        _usage: BufferUsage,
    ) -> Result<u32, DeviceError> {
        let mut state = self.state.borrow_mut();
        let id = state.allocate()?;
        state.buffers.insert(id);
        state.calls.push(Call::CreateBuffer {
            kind,
            id,
            len: data.len(),
        });
        Ok(id)
    }

    fn update_buffer(&self, kind: BufferKind, buffer: u32, byte_offset: usize, data: &[u8]) {
        assert!(
            self.state.borrow().buffers.contains(&buffer),
            "update of dead buffer {buffer}"
        );
        self.record(Call::UpdateBuffer {
            kind,
            id: buffer,
            offset: byte_offset,
            data: data.to_vec(),
        });
    }

    fn destroy_buffer(&self, buffer: u32) {
        let mut state = self.state.borrow_mut();
        assert!(state.buffers.remove(&buffer), "double free of buffer {buffer}");
        state.calls.push(Call::DestroyBuffer(buffer));
    }

    fn create_vertex_array(
        &self,
        vertex_buffer: u32,
        index_buffer: u32,
        stride: i32,
        _layouts: &[Layout],
    ) -> Result<u32, DeviceError> {
        let mut state = self.state.borrow_mut();
        let id = state.allocate()?;
        state.vertex_arrays.insert(id);
        state.calls.push(Call::CreateVertexArray {
            id,
            vbo: vertex_buffer,
            ebo: index_buffer,
            stride,
        });
        Ok(id)
    }

    fn destroy_vertex_array(&self, vertex_array: u32) {
        let mut state = self.state.borrow_mut();
        assert!(
            state.vertex_arrays.remove(&vertex_array),
            "double free of vertex array {vertex_array}"
        );
        state.calls.push(Call::DestroyVertexArray(vertex_array));
    }

    fn create_program(
        &self,
        _vertex_source: &str,
        _fragment_source: &str,
    ) -> Result<u32, DeviceError> {
        let mut state = self.state.borrow_mut();
        let id = state.allocate()?;
        state.programs.insert(id);
        state.calls.push(Call::CreateProgram(id));
        Ok(id)
    }

    fn use_program(&self, program: Option<u32>) {
        self.record(Call::UseProgram(program));
    }

    fn destroy_program(&self, program: u32) {
        let mut state = self.state.borrow_mut();
        assert!(state.programs.remove(&program), "double free of program {program}");
        state.calls.push(Call::DestroyProgram(program));
    }

    fn bind_uniform_block(&self, program: u32, block_name: &str, binding: u32, buffer: u32) {
        self.record(Call::BindUniformBlock {
            program,
            block: block_name.to_string(),
            binding,
            buffer,
        });
    }

    fn draw_indexed(&self, vertex_array: u32, index_count: u32, index_byte_offset: usize) {
        assert!(
            self.state.borrow().vertex_arrays.contains(&vertex_array),
            "draw with dead vertex array {vertex_array}"
        );
        self.record(Call::DrawIndexed {
            vao: vertex_array,
            index_count,
            index_byte_offset,
        });
    }

    fn clear_frame(&self, _color: [f32; 4]) {
        self.record(Call::ClearFrame);
    }

    fn begin_viewport(&self, viewport: &Viewport) {
        self.record(Call::BeginViewport(*viewport));
    }
}

struct H2bMaterial {
    name: String,
    attributes: MaterialAttributes,
}

struct H2bSubmesh {
    name: String,
    index_count: u32,
    index_offset: u32,
    material_index: u32,
}

/// Writes H2B files byte for byte the way the exporter does.
pub struct H2bBuilder {
    version: [u8; 4],
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    materials: Vec<H2bMaterial>,
    submeshes: Vec<H2bSubmesh>,
}

impl Default for H2bBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl H2bBuilder {
    pub fn new() -> Self {
        Self {
            version: *b"H19d",
            vertices: Vec::new(),
            indices: Vec::new(),
            materials: Vec::new(),
            submeshes: Vec::new(),
        }
    }

    /// A quad split into two triangles, each with its own material.
    pub fn two_part_quad() -> Self {
        let corner = |x: f32, z: f32| Vertex {
            position: [x, 0.0, z],
            uvw: [x, z, 0.0],
            normal: [0.0, 1.0, 0.0],
        };
        Self::new()
            .vertices(vec![
                corner(0.0, 0.0),
                corner(1.0, 0.0),
                corner(1.0, 1.0),
                corner(0.0, 1.0),
            ])
            .indices(vec![0, 1, 2, 0, 2, 3])
            .material("Red", diffuse([1.0, 0.0, 0.0]))
            .material("Blue", diffuse([0.0, 0.0, 1.0]))
            .submesh("Left", 3, 0, 0)
            .submesh("Right", 3, 3, 1)
    }

    pub fn version(mut self, version: &[u8; 4]) -> Self {
        self.version = *version;
        self
    }

    pub fn vertices(mut self, vertices: Vec<Vertex>) -> Self {
        self.vertices = vertices;
        self
    }

    pub fn indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = indices;
        self
    }

    pub fn material(mut self, name: &str, attributes: MaterialAttributes) -> Self {
        self.materials.push(H2bMaterial {
            name: name.to_string(),
            attributes,
        });
        self
    }

    pub fn submesh(
        mut self,
        name: &str,
        index_count: u32,
        index_offset: u32,
        material_index: u32,
    ) -> Self {
        self.submeshes.push(H2bSubmesh {
            name: name.to_string(),
            index_count,
            index_offset,
            material_index,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        fn string(bytes: &mut Vec<u8>, text: &str) {
            bytes.extend_from_slice(text.as_bytes());
            bytes.push(0);
        }

        let mut bytes = self.version.to_vec();
        for count in [
            self.vertices.len(),
            self.indices.len(),
            self.materials.len(),
            self.submeshes.len(),
        ] {
            bytes.extend_from_slice(&(count as u32).to_le_bytes());
        }
        bytes.extend_from_slice(bytemuck::cast_slice(&self.vertices));
        for index in &self.indices {
            bytes.extend_from_slice(&index.to_le_bytes());
        }
        for material in &self.materials {
            bytes.extend_from_slice(bytemuck::bytes_of(&material.attributes));
            string(&mut bytes, &material.name);
            // Nine texture map names, none set.
            for _ in 0..9 {
                string(&mut bytes, "");
            }
        }
        bytes.extend(std::iter::repeat(0u8).take(self.materials.len() * 8));
        for submesh in &self.submeshes {
            string(&mut bytes, &submesh.name);
            bytes.extend_from_slice(&submesh.index_count.to_le_bytes());
            bytes.extend_from_slice(&submesh.index_offset.to_le_bytes());
            bytes.extend_from_slice(&submesh.material_index.to_le_bytes());
        }
        bytes
    }

    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, self.build()).unwrap();
    }
}

pub fn diffuse(color: [f32; 3]) -> MaterialAttributes {
    MaterialAttributes {
        diffuse: color,
        dissolve: 1.0,
        specular_exponent: 32.0,
        illumination_model: 2,
        ..Default::default()
    }
}

/// One `MESH` record laid out like Blender's matrix printout, translation in the last row.
pub fn mesh_record(name: &str, translation: [f32; 3]) -> String {
    let [x, y, z] = translation;
    format!(
        "MESH\n{name}\n\
         <Matrix 4x4 (1.0000, 0.0000, 0.0000, 0.0000)\n\
         \x20           (0.0000, 1.0000, 0.0000, 0.0000)\n\
         \x20           (0.0000, 0.0000, 1.0000, 0.0000)\n\
         \x20           ({x:.4}, {y:.4}, {z:.4}, 1.0000)>\n"
    )
}

/// A throwaway level folder: `<dir>/GameLevel.txt` plus `<dir>/Models`.
pub struct ScratchLevel {
    root: PathBuf,
    pub dir: PathBuf,
}

impl ScratchLevel {
    pub fn new(name: &str) -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let root = std::env::temp_dir().join(format!(
            "level_viewer_{}_{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let dir = root.join(name);
        std::fs::create_dir_all(dir.join("Models")).unwrap();
        Self { root, dir }
    }

    pub fn description(&self) -> PathBuf {
        self.dir.join("GameLevel.txt")
    }

    pub fn models(&self) -> PathBuf {
        self.dir.join("Models")
    }

    pub fn write_description(&self, contents: impl AsRef<[u8]>) {
        std::fs::write(self.description(), contents).unwrap();
    }

    pub fn add_model(&self, file_name: &str, builder: &H2bBuilder) {
        builder.write_to(&self.models().join(file_name));
    }
}

impl Drop for ScratchLevel {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

#[derive(Debug, Clone)]
pub struct CapturedLog {
    pub level: log::Level,
    pub target: String,
    pub message: String,
}

static RECORDS: Mutex<Vec<CapturedLog>> = Mutex::new(Vec::new());

struct CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if let Ok(mut records) = RECORDS.lock() {
            records.push(CapturedLog {
                level: record.level(),
                target: record.target().to_string(),
                message: record.args().to_string(),
            });
        }
    }

    fn flush(&self) {}
}

/// Routes every log record of this test binary into memory. Tests run in
/// parallel, so look records up by something unique to the test.
pub fn capture_logs() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        log::set_boxed_logger(Box::new(CaptureLogger)).unwrap();
        log::set_max_level(log::LevelFilter::Trace);
    });
}

pub fn logs_containing(needle: &str) -> Vec<CapturedLog> {
    RECORDS
        .lock()
        .unwrap()
        .iter()
        .filter(|r| r.message.contains(needle))
        .cloned()
        .collect()
}
