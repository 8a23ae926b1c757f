use std::{fmt, io, path::PathBuf};

/// A mesh asset that could not be turned into a `LoadedMesh`.
#[derive(Debug)]
pub enum AssetError {
    /// The file could not be opened or read.
    NotFound { path: PathBuf, source: io::Error },
    /// The file was read but its contents are not a valid H2B mesh.
    Malformed { path: PathBuf, reason: String },
}

impl AssetError {
    pub fn path(&self) -> &PathBuf {
        match self {
            AssetError::NotFound { path, .. } => path,
            AssetError::Malformed { path, .. } => path,
        }
    }
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::NotFound { path, source } => {
                write!(f, "H2B not found: {} ({})", path.display(), source)
            }
            AssetError::Malformed { path, reason } => {
                write!(f, "H2B malformed: {}: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssetError::NotFound { source, .. } => Some(source),
            AssetError::Malformed { .. } => None,
        }
    }
}

/// The level description itself could not be read. Fatal to one `load_level` call.
#[derive(Debug)]
pub enum LevelError {
    NotFound { path: PathBuf, source: io::Error },
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::NotFound { path, source } => {
                write!(f, "game level not found: {} ({})", path.display(), source)
            }
        }
    }
}

impl std::error::Error for LevelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LevelError::NotFound { source, .. } => Some(source),
        }
    }
}

/// A single record of a level description that could not be parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelParseError {
    pub message: String,
    /// 1-based line number of the offending line.
    pub line: usize,
}

impl LevelParseError {
    pub(crate) fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for LevelParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "level parse error at line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for LevelParseError {}

/// Allocation, compilation or link failure reported by a `RenderDevice`.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceError {
    Allocation(String),
    ShaderCompile { stage: &'static str, log: String },
    ProgramLink(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Allocation(what) => write!(f, "GPU allocation failed: {what}"),
            DeviceError::ShaderCompile { stage, log } => {
                write!(f, "error compiling {stage} shader: {log}")
            }
            DeviceError::ProgramLink(log) => write!(f, "shader link error: {log}"),
        }
    }
}

impl std::error::Error for DeviceError {}

/// Lifecycle errors of a single scene instance.
#[derive(Debug)]
pub enum SceneError {
    /// `upload_to_gpu` was called on an instance whose mesh never loaded.
    NoMeshData { name: String },
    /// `upload_to_gpu` was called twice without `free_resources` in between.
    AlreadyUploaded { name: String },
    /// `draw` was called before `upload_to_gpu`.
    NotUploaded { name: String },
    Device { name: String, source: DeviceError },
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::NoMeshData { name } => {
                write!(f, "{name}: no mesh data loaded, nothing to upload")
            }
            SceneError::AlreadyUploaded { name } => {
                write!(f, "{name}: already uploaded, free its resources first")
            }
            SceneError::NotUploaded { name } => write!(f, "{name}: drawn before upload"),
            SceneError::Device { name, source } => write!(f, "{name}: {source}"),
        }
    }
}

impl std::error::Error for SceneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SceneError::Device { source, .. } => Some(source),
            _ => None,
        }
    }
}
