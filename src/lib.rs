//! Loads levels exported from Blender (a `GameLevel.txt` placement list plus one
//! H2B mesh per model) and renders them through OpenGL, once from a fly camera
//! and once more from a top-down minimap camera.
//!
//! The scene layer (`level`, `mesh`, `renderer`) is generic over
//! [`device::RenderDevice`]; [`opengl::GlowDevice`] is the real backend.

pub mod camera;
pub mod config;
pub mod data;
pub mod device;
pub mod error;
pub mod gui;
pub mod input;
pub mod level;
pub mod level_file;
pub mod loader;
pub mod logging;
pub mod mesh;
pub mod opengl;
pub mod renderer;
pub mod viewport;

pub use device::RenderDevice;
pub use error::{AssetError, DeviceError, LevelError, LevelParseError, SceneError};
pub use level::{Level, LevelSummary, UploadSummary};
pub use mesh::StaticMesh;
