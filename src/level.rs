use std::path::{Path, PathBuf};

use crate::{
    device::RenderDevice,
    error::{LevelError, SceneError},
    level_file::{LevelFileReader, LevelRecord, MeshRecord},
    mesh::StaticMesh,
};

/// What one `load_level` call found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelSummary {
    pub loaded: usize,
    /// Mesh records dropped because their H2B file was missing or malformed.
    pub missing_assets: usize,
    /// Records dropped because the level text itself was malformed.
    pub malformed_records: usize,
    /// `LIGHT` records seen (and ignored).
    pub lights: usize,
}

impl LevelSummary {
    pub fn skipped(&self) -> usize {
        self.missing_assets + self.malformed_records
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub uploaded: usize,
    pub failed: usize,
}

/// The currently resident level: an ordered list of static mesh instances.
///
/// Holds at most one level's worth of GPU resources; loading a level releases the
/// previous one first.
#[derive(Debug)]
pub struct Level<D: RenderDevice> {
    pub name: String,
    source: Option<PathBuf>,
    static_meshes: Vec<StaticMesh<D>>,
}

impl<D: RenderDevice> Default for Level<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: RenderDevice> Level<D> {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            source: None,
            static_meshes: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.static_meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.static_meshes.is_empty()
    }

    pub fn instances(&self) -> &[StaticMesh<D>] {
        &self.static_meshes
    }

    pub fn find(&self, name: &str) -> Option<&StaticMesh<D>> {
        self.static_meshes.iter().find(|m| m.name == name)
    }

    /// Path of the description the current contents came from.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Replaces the current level with the one described by `level_path`, reading
    /// each mesh from `asset_folder`. Only an unreadable description is an error;
    /// missing or broken meshes are logged and skipped.
    pub fn load_level(
        &mut self,
        device: &D,
        level_path: &Path,
        asset_folder: &Path,
    ) -> Result<LevelSummary, LevelError> {
        log::info!(target: "level", "LOADING GAME LEVEL {}", level_path.display());

        self.unload_level(device);

        let bytes = std::fs::read(level_path).map_err(|source| {
            let err = LevelError::NotFound {
                path: level_path.to_path_buf(),
                source,
            };
            log::error!(target: "level", "{err}");
            err
        })?;

        log::debug!(target: "level", "Begin reading game level text file.");

        // Badly encoded bytes cost at most the record they sit in.
        let text = String::from_utf8_lossy(&bytes);
        let mut summary = LevelSummary::default();
        for record in LevelFileReader::new(&text) {
            match record {
                Ok(LevelRecord::Mesh(record)) => {
                    if self.load_mesh_record(&record, asset_folder) {
                        summary.loaded += 1;
                    } else {
                        summary.missing_assets += 1;
                    }
                }
                Ok(LevelRecord::Light { line }) => {
                    log::debug!(
                        target: "level",
                        "LIGHT record at line {line} ignored, lights are not supported"
                    );
                    summary.lights += 1;
                }
                Err(e) => {
                    log::error!(target: "level", "{}: {e}", level_path.display());
                    log::warn!(target: "level", "Loading will continue but model(s) are missing.");
                    summary.malformed_records += 1;
                }
            }
        }

        self.name = level_path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| level_path.display().to_string());
        self.source = Some(level_path.to_path_buf());

        log::info!(
            target: "level",
            "GAME LEVEL {} WAS LOADED TO CPU: {} instances, {} skipped",
            self.name,
            summary.loaded,
            summary.skipped()
        );
        Ok(summary)
    }

    fn load_mesh_record(&mut self, record: &MeshRecord, asset_folder: &Path) -> bool {
        log::info!(target: "level", "Model detected: {}", record.name);

        let world = record.world_matrix();
        log::debug!(
            target: "level",
            "Location: X {} Y {} Z {}",
            world.w.x,
            world.w.y,
            world.w.z
        );

        let mut static_mesh = StaticMesh::new(record.name.clone());
        static_mesh.set_world_matrix(world);

        let asset_path = asset_folder.join(record.asset_file_name());
        match static_mesh.load_from_disk(&asset_path) {
            Ok(()) => {
                log::info!(target: "asset", "H2B imported: {}", asset_path.display());
                self.static_meshes.push(static_mesh);
                true
            }
            Err(e) => {
                log::error!(target: "asset", "{e}");
                log::warn!(target: "level", "Loading will continue but model(s) are missing.");
                false
            }
        }
    }

    /// Uploads every instance. Failures are logged and counted; the rest still upload.
    pub fn upload_level_to_gpu(&mut self, device: &D) -> UploadSummary {
        let mut summary = UploadSummary::default();
        for static_mesh in &mut self.static_meshes {
            match static_mesh.upload_to_gpu(device) {
                Ok(()) => summary.uploaded += 1,
                Err(e) => {
                    log::error!(target: "gpu", "upload failed: {e}");
                    summary.failed += 1;
                }
            }
        }
        log::info!(
            target: "gpu",
            "level {} uploaded: {} ok, {} failed",
            self.name,
            summary.uploaded,
            summary.failed
        );
        summary
    }

    /// Draws every uploaded instance in insertion order.
    pub fn render_level(&self, device: &D, program: D::Program) {
        for static_mesh in &self.static_meshes {
            match static_mesh.draw(device, program) {
                Ok(()) => {}
                Err(SceneError::NotUploaded { name }) => {
                    log::trace!(target: "frame", "{name} skipped, not on the GPU");
                }
                Err(e) => log::error!(target: "frame", "{e}"),
            }
        }
    }

    /// Frees every instance's GPU resources and empties the level.
    pub fn unload_level(&mut self, device: &D) {
        if self.static_meshes.is_empty() && self.source.is_none() {
            return;
        }
        for static_mesh in &mut self.static_meshes {
            static_mesh.free_resources(device);
        }
        log::debug!(
            target: "level",
            "unloaded {} instances of {}",
            self.static_meshes.len(),
            self.name
        );
        self.static_meshes.clear();
        self.name.clear();
        self.source = None;
    }
}
