use std::path::Path;

use cgmath::InnerSpace;

use crate::{
    camera::Camera,
    data::SceneData,
    device::{BufferKind, BufferUsage, RenderDevice},
    error::DeviceError,
    level::Level,
    viewport::FrameViewports,
};

pub const SCENE_DATA_BLOCK: &str = "SceneData";
pub const SCENE_DATA_BINDING: u32 = 1;

pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Directional light shared by both viewports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneLighting {
    pub sun_direction: [f32; 4],
    pub sun_color: [f32; 4],
    pub sun_ambient: [f32; 4],
}

impl Default for SceneLighting {
    fn default() -> Self {
        let dir = cgmath::vec3(-1.0f32, -1.0, -2.0).normalize();
        Self {
            sun_direction: [dir.x, dir.y, dir.z, 0.0],
            sun_color: [0.9, 0.9, 1.0, 1.0],
            sun_ambient: [0.25, 0.25, 0.35, 1.0],
        }
    }
}

/// The only part of `SceneData` the minimap replaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub view: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
}

impl CameraView {
    pub fn of(camera: &dyn Camera) -> Self {
        let p = camera.get_position();
        Self {
            view: (*camera.get_view()).into(),
            camera_pos: [p.x, p.y, p.z, 1.0],
        }
    }
}

/// GLSL sources for the single program every instance is drawn with.
#[derive(Debug, Clone)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    pub fn load(folder: &Path) -> std::io::Result<Self> {
        Ok(Self {
            vertex: std::fs::read_to_string(folder.join("vertex.glsl"))?,
            fragment: std::fs::read_to_string(folder.join("fragment.glsl"))?,
        })
    }
}

/// Drives one frame: main view, then minimap, through one shared scene uniform buffer.
pub struct Renderer<D: RenderDevice> {
    program: D::Program,
    scene_ubo: D::Buffer,
    scene: SceneData,
    minimap: CameraView,
}

impl<D: RenderDevice> Renderer<D> {
    pub fn new(
        device: &D,
        shaders: &ShaderSources,
        lighting: SceneLighting,
        main_camera: &dyn Camera,
        minimap_camera: &dyn Camera,
    ) -> Result<Self, DeviceError> {
        let program = device.create_program(&shaders.vertex, &shaders.fragment)?;

        let main = CameraView::of(main_camera);
        let scene = SceneData {
            sun_direction: lighting.sun_direction,
            sun_color: lighting.sun_color,
            view: main.view,
            projection: (*main_camera.get_projection()).into(),
            camera_pos: main.camera_pos,
            sun_ambient: lighting.sun_ambient,
        };

        let scene_ubo = match device.create_buffer(
            BufferKind::Uniform,
            bytemuck::bytes_of(&scene),
            BufferUsage::Dynamic,
        ) {
            Ok(ubo) => ubo,
            Err(e) => {
                device.destroy_program(program);
                return Err(e);
            }
        };

        Ok(Self {
            program,
            scene_ubo,
            scene,
            minimap: CameraView::of(minimap_camera),
        })
    }

    pub fn program(&self) -> D::Program {
        self.program
    }

    pub fn scene_data(&self) -> &SceneData {
        &self.scene
    }

    pub fn minimap_view(&self) -> &CameraView {
        &self.minimap
    }

    /// Takes the main camera's view, projection and position for the next frame.
    pub fn update_camera(&mut self, camera: &dyn Camera) {
        let view = CameraView::of(camera);
        self.scene.view = view.view;
        self.scene.camera_pos = view.camera_pos;
        self.scene.projection = (*camera.get_projection()).into();
    }

    pub fn set_minimap_camera(&mut self, camera: &dyn Camera) {
        self.minimap = CameraView::of(camera);
    }

    /// Draws `level` twice. The minimap pass overwrites only the view and camera
    /// position of the scene buffer; the next frame rewrites it whole.
    pub fn render_frame(&self, device: &D, level: &Level<D>, viewports: &FrameViewports) {
        device.clear_frame(CLEAR_COLOR);
        device.use_program(Some(self.program));
        device.bind_uniform_block(
            self.program,
            SCENE_DATA_BLOCK,
            SCENE_DATA_BINDING,
            self.scene_ubo,
        );

        device.begin_viewport(&viewports.main);
        let scene = bytemuck::bytes_of(&self.scene);
        device.update_buffer(BufferKind::Uniform, self.scene_ubo, 0, scene);
        level.render_level(device, self.program);

        device.begin_viewport(&viewports.minimap);
        device.update_buffer(
            BufferKind::Uniform,
            self.scene_ubo,
            SceneData::VIEW_OFFSET,
            bytemuck::bytes_of(&self.minimap.view),
        );
        device.update_buffer(
            BufferKind::Uniform,
            self.scene_ubo,
            SceneData::CAMERA_POS_OFFSET,
            bytemuck::bytes_of(&self.minimap.camera_pos),
        );
        level.render_level(device, self.program);

        device.use_program(None);
    }

    pub fn destroy(self, device: &D) {
        device.destroy_buffer(self.scene_ubo);
        device.destroy_program(self.program);
    }
}
