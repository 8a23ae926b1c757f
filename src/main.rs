use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context as _};
use egui_glow::Painter;
use egui_winit::State as EguiState;
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version,
};
use glutin::display::{Display, DisplayApiPreference};
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, WindowSurface};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, DeviceId, ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::window::{Window, WindowId};

use level_viewer::camera::PerspectiveCamera;
use level_viewer::config::{LevelCatalog, ViewerConfig};
use level_viewer::gui::{Gui, GuiAction, LevelStatus};
use level_viewer::input::{InputAction, InputState};
use level_viewer::level::Level;
use level_viewer::logging::{init_logging, LoggingConfig};
use level_viewer::opengl::{self, GlowDevice};
use level_viewer::renderer::{Renderer, SceneLighting, ShaderSources};
use level_viewer::viewport::{FrameViewports, Viewport};

const FIELD_OF_VIEW_DEG: f32 = 65.0;
const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 100.0;
const CAMERA_SPEED: f32 = 2.5;

struct Timer {
    last_frame: Instant,
    delta_time: f64,
}

impl Timer {
    fn new() -> Timer {
        Timer {
            last_frame: Instant::now(),
            delta_time: 0.0,
        }
    }

    fn update(&mut self) {
        let now = Instant::now();
        self.delta_time = now.duration_since(self.last_frame).as_secs_f64();
        self.last_frame = now;
    }

    fn get_delta_time(&self) -> f64 {
        self.delta_time
    }
}

/// Everything that needs a live window and GL context.
struct Viewer {
    timer: Timer,

    // Fields drop top to bottom: surface, then context, then the window under them.
    // GL objects are released in `shutdown` before any of these go.
    surface: Surface<WindowSurface>,
    current_context: PossiblyCurrentContext,
    window: Window,

    device: GlowDevice,
    renderer: Renderer<GlowDevice>,
    level: Level<GlowDevice>,
    status: LevelStatus,

    main_camera: PerspectiveCamera,
    minimap_camera: PerspectiveCamera,
    input: InputState,

    gui: Gui,
    egui_context: egui::Context,
    egui_painter: Painter,
    egui_state: EguiState,
}

fn create_cameras(size: PhysicalSize<u32>) -> (PerspectiveCamera, PerspectiveCamera) {
    let main = PerspectiveCamera::new(
        "Main Camera".to_string(),
        cgmath::point3(7.35, 4.95, -6.92),
        FIELD_OF_VIEW_DEG,
        size.width,
        size.height,
        NEAR_PLANE,
        FAR_PLANE,
        CAMERA_SPEED,
    )
    .look_at(cgmath::point3(0.15, 0.75, 0.0));

    let minimap = Viewport::minimap(size.width, size.height);
    let overhead = PerspectiveCamera::new(
        "Minimap Camera".to_string(),
        cgmath::point3(0.1, 40.0, 0.1),
        FIELD_OF_VIEW_DEG,
        minimap.width.max(1) as u32,
        minimap.height.max(1) as u32,
        NEAR_PLANE,
        FAR_PLANE,
        0.0,
    )
    .look_at(cgmath::point3(0.0, 0.0, 0.0));

    (main, overhead)
}

impl Viewer {
    fn new(event_loop: &ActiveEventLoop, config: &ViewerConfig) -> anyhow::Result<Self> {
        let window = event_loop.create_window(
            Window::default_attributes()
                .with_title("Level Viewer")
                .with_inner_size(PhysicalSize::new(config.width, config.height)),
        )?;

        // Get platform-specific handles to the display and window
        let display_handle = window.display_handle()?;
        let window_handle = window.window_handle()?;

        #[cfg(windows)]
        let preference = DisplayApiPreference::Wgl(Some(window_handle.as_raw()));
        #[cfg(not(windows))]
        let preference = DisplayApiPreference::Egl;

        let display = unsafe { Display::new(display_handle.as_raw(), preference)? };

        let config_template = ConfigTemplateBuilder::new().with_depth_size(24).build();
        let gl_config = unsafe {
            display
                .find_configs(config_template)?
                .next()
                .ok_or_else(|| anyhow!("no OpenGL framebuffer configuration available"))?
        };

        let physical_size = window.inner_size();
        let width = NonZeroU32::new(physical_size.width.max(1)).unwrap_or(NonZeroU32::MIN);
        let height = NonZeroU32::new(physical_size.height.max(1)).unwrap_or(NonZeroU32::MIN);

        let surface_attributes = SurfaceAttributesBuilder::<WindowSurface>::new().build(
            window_handle.as_raw(),
            width,
            height,
        );

        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .with_profile(GlProfile::Core)
            .build(Some(window_handle.as_raw()));

        let surface = unsafe { display.create_window_surface(&gl_config, &surface_attributes)? };
        let non_current_context =
            unsafe { display.create_context(&gl_config, &context_attributes)? };
        let current_context = non_current_context.make_current(&surface)?;

        let mut gl = unsafe {
            glow::Context::from_loader_function_cstr(|s| display.get_proc_address(s) as *const _)
        };
        if cfg!(debug_assertions) {
            opengl::install_debug_callback(&mut gl);
        }
        let gl = Arc::new(gl);
        let device = GlowDevice::new(gl.clone());

        let shaders = ShaderSources::load(&config.shaders)
            .with_context(|| format!("reading shaders from {}", config.shaders.display()))?;
        let (main_camera, minimap_camera) = create_cameras(physical_size);
        let renderer = Renderer::new(
            &device,
            &shaders,
            SceneLighting::default(),
            &main_camera,
            &minimap_camera,
        )?;

        let egui_context = egui::Context::default();
        let egui_painter =
            Painter::new(gl, "", None, false).map_err(|e| anyhow!("egui painter: {e}"))?;
        let egui_state = EguiState::new(
            egui_context.clone(),
            egui_context.viewport_id(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        Ok(Self {
            timer: Timer::new(),
            window,
            current_context,
            surface,
            device,
            renderer,
            level: Level::new(),
            status: LevelStatus::default(),
            main_camera,
            minimap_camera,
            input: InputState::new(),
            gui: Gui::new(),
            egui_context,
            egui_painter,
            egui_state,
        })
    }

    /// Synchronously replaces the resident level; rendering stalls until it is on the GPU.
    fn switch_level(&mut self, index: usize, catalog: &LevelCatalog) {
        let Some(entry) = catalog.get(index) else {
            log::warn!(target: "level", "there is no level {}", index + 1);
            return;
        };

        self.status = match self.level.load_level(&self.device, &entry.description, &entry.models) {
            Ok(load) => {
                let upload = self.level.upload_level_to_gpu(&self.device);
                LevelStatus {
                    current: Some(index),
                    name: self.level.name.clone(),
                    instances: self.level.len(),
                    load,
                    upload,
                }
            }
            Err(_) => LevelStatus::default(),
        };
        self.gui.append_console(self.status.describe());
        self.window.set_title(&format!("Level Viewer - {}", entry.label));
    }

    fn apply_gui_action(&mut self, action: GuiAction, catalog: &LevelCatalog) {
        match action {
            GuiAction::LoadLevel(index) => self.switch_level(index, catalog),
            GuiAction::Reload => {
                if let Some(index) = self.status.current {
                    self.switch_level(index, catalog);
                }
            }
        }
    }

    fn apply_input_action(&mut self, action: InputAction, catalog: &LevelCatalog) {
        match action {
            InputAction::SwitchLevel(index) => self.switch_level(index, catalog),
            InputAction::ToggleOverlay => {
                self.gui.toggle();
                log::debug!("overlay visible: {}", self.gui.is_visible());
            }
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        let (Some(width), Some(height)) =
            (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        else {
            // Minimised
            return;
        };
        self.surface.resize(&self.current_context, width, height);

        self.main_camera.resize(size.width, size.height);
        let minimap = Viewport::minimap(size.width, size.height);
        self.minimap_camera.resize(minimap.width.max(1) as u32, minimap.height.max(1) as u32);
        self.renderer.set_minimap_camera(&self.minimap_camera);
    }

    fn redraw(&mut self, catalog: &LevelCatalog) -> anyhow::Result<()> {
        self.timer.update();

        let camera_input = self.input.take_camera_input();
        self.main_camera.apply_input(&camera_input, self.timer.get_delta_time() as f32);
        self.renderer.update_camera(&self.main_camera);

        let physical_size = self.window.inner_size();
        let viewports = FrameViewports::for_size(physical_size.width, physical_size.height);
        self.renderer.render_frame(&self.device, &self.level, &viewports);

        // The overlay is painted on top of both viewports
        let (full_output, actions) = self.gui.update(
            self.egui_state.take_egui_input(&self.window),
            &self.egui_context,
            catalog,
            &self.status,
        );
        self.egui_state.handle_platform_output(&self.window, full_output.platform_output);
        let clipped_primitives =
            self.egui_context.tessellate(full_output.shapes, full_output.pixels_per_point);
        self.egui_painter.paint_and_update_textures(
            [physical_size.width, physical_size.height],
            full_output.pixels_per_point,
            &clipped_primitives,
            &full_output.textures_delta,
        );

        self.surface.swap_buffers(&self.current_context)?;

        for action in actions {
            self.apply_gui_action(action, catalog);
        }

        self.window.request_redraw();
        Ok(())
    }

    fn shutdown(mut self) {
        self.level.unload_level(&self.device);
        self.renderer.destroy(&self.device);
        self.egui_painter.destroy();
        log::info!("viewer shut down");
    }
}

fn is_release(event: &WindowEvent) -> bool {
    match event {
        WindowEvent::KeyboardInput { event, .. } => event.state == ElementState::Released,
        WindowEvent::MouseInput { state, .. } => *state == ElementState::Released,
        WindowEvent::Focused(false) => true,
        _ => false,
    }
}

struct App {
    config: ViewerConfig,
    catalog: LevelCatalog,
    viewer: Option<Viewer>,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: ViewerConfig, catalog: LevelCatalog) -> Self {
        Self {
            config,
            catalog,
            viewer: None,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() {
            return;
        }

        match Viewer::new(event_loop, &self.config) {
            Ok(mut viewer) => {
                if self.catalog.is_empty() {
                    log::warn!(target: "level", "no levels under {}", self.config.assets.display());
                } else {
                    viewer.switch_level(self.config.level - 1, &self.catalog);
                }
                viewer.window.request_redraw();
                self.viewer = Some(viewer);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(viewer) = self.viewer.as_mut() else {
            return;
        };

        // give egui any winit events
        let response = viewer.egui_state.on_window_event(&viewer.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("The close button was pressed; stopping");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => viewer.resize(size),
            WindowEvent::RedrawRequested => {
                if let Err(e) = viewer.redraw(&self.catalog) {
                    self.fail(event_loop, e);
                }
            }
            other => {
                // Releases always reach the input state so keys never stick.
                if !response.consumed || is_release(&other) {
                    if let Some(action) = viewer.input.handle_window_event(&other) {
                        viewer.apply_input_action(action, &self.catalog);
                    }
                }
            }
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let Some(viewer) = self.viewer.as_mut() {
            viewer.input.handle_device_event(&event);
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(viewer) = self.viewer.take() {
            viewer.shutdown();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let config = ViewerConfig::from_args(std::env::args_os()).unwrap_or_else(|e| e.exit());

    init_logging(LoggingConfig {
        filter: config.log_filter.clone(),
        ..Default::default()
    });

    let catalog = LevelCatalog::discover(&config.assets)
        .with_context(|| format!("reading levels from {}", config.assets.display()))?;

    let event_loop = EventLoop::new()?;

    // ControlFlow::Wait pauses the event loop if no events are available to process.
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config, catalog);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
