//! Command line options and discovery of the levels shipped under the asset root.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use clap::{value_parser, Arg, ArgAction, Command};

pub const LEVEL_FILE_NAME: &str = "GameLevel.txt";
pub const MODELS_DIR_NAME: &str = "Models";

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub assets: PathBuf,
    /// 1-based position in the level catalog.
    pub level: usize,
    pub shaders: PathBuf,
    pub log_filter: Option<String>,
    pub width: u32,
    pub height: u32,
}

fn command() -> Command {
    Command::new("level_viewer")
        .about("Loads Blender-exported levels and renders them with a minimap")
        .arg(
            Arg::new("assets")
                .long("assets")
                .value_name("DIR")
                .help("Folder holding one sub-folder per level")
                .default_value("assets")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("level")
                .long("level")
                .value_name("N")
                .help("Level to open first, counting from 1")
                .default_value("1")
                .value_parser(value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new("shaders")
                .long("shaders")
                .value_name("DIR")
                .help("Folder holding vertex.glsl and fragment.glsl")
                .default_value("shaders")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("log")
                .long("log")
                .value_name("FILTER")
                .help("env_logger filter, overrides RUST_LOG")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("width")
                .long("width")
                .default_value("800")
                .value_parser(value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new("height")
                .long("height")
                .default_value("600")
                .value_parser(value_parser!(u32).range(1..)),
        )
}

impl ViewerConfig {
    /// Parses `args`, whose first item is the program name.
    pub fn from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = command().try_get_matches_from(args)?;

        // Every argument but `log` has a default, so these lookups always succeed.
        let path = |id: &str| matches.get_one::<PathBuf>(id).cloned().unwrap_or_default();
        let number = |id: &str| matches.get_one::<u32>(id).copied().unwrap_or(1);

        Ok(Self {
            assets: path("assets"),
            level: number("level") as usize,
            shaders: path("shaders"),
            log_filter: matches.get_one::<String>("log").cloned(),
            width: number("width"),
            height: number("height"),
        })
    }
}

/// One level folder under the asset root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelEntry {
    /// Folder name, shown in the overlay.
    pub label: String,
    pub description: PathBuf,
    pub models: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelCatalog {
    entries: Vec<LevelEntry>,
}

impl LevelCatalog {
    /// Every `<root>/<dir>` that has both a `GameLevel.txt` and a `Models`
    /// folder, ordered by folder name.
    pub fn discover(root: &Path) -> std::io::Result<Self> {
        let mut entries = Vec::new();
        for dir_entry in std::fs::read_dir(root)? {
            let dir = dir_entry?.path();
            if !dir.is_dir() {
                continue;
            }
            let description = dir.join(LEVEL_FILE_NAME);
            let models = dir.join(MODELS_DIR_NAME);
            if !description.is_file() || !models.is_dir() {
                log::debug!(target: "level", "{} is not a level folder", dir.display());
                continue;
            }
            let label = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            entries.push(LevelEntry {
                label,
                description,
                models,
            });
        }
        entries.sort_by(|a, b| a.label.cmp(&b.label));

        log::info!(target: "level", "found {} level(s) under {}", entries.len(), root.display());
        Ok(Self { entries })
    }

    pub fn from_entries(entries: Vec<LevelEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Zero-based lookup.
    pub fn get(&self, index: usize) -> Option<&LevelEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[LevelEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let name = format!("level_viewer_config_{tag}_{}", std::process::id());
        let dir = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn make_level(root: &Path, name: &str) {
        let dir = root.join(name);
        std::fs::create_dir_all(dir.join(MODELS_DIR_NAME)).unwrap();
        std::fs::write(dir.join(LEVEL_FILE_NAME), "").unwrap();
    }

    #[test]
    fn defaults() {
        let config = ViewerConfig::from_args(["level_viewer"]).unwrap();
        assert_eq!(config.assets, PathBuf::from("assets"));
        assert_eq!(config.shaders, PathBuf::from("shaders"));
        assert_eq!(config.level, 1);
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.log_filter, None);
    }

    #[test]
    fn overrides() {
        let config = ViewerConfig::from_args([
            "level_viewer",
            "--assets",
            "data",
            "--level",
            "3",
            "--log",
            "gpu=trace",
        ])
        .unwrap();
        assert_eq!(config.assets, PathBuf::from("data"));
        assert_eq!(config.level, 3);
        assert_eq!(config.log_filter.as_deref(), Some("gpu=trace"));
    }

    #[test]
    fn level_zero_is_rejected() {
        assert!(ViewerConfig::from_args(["level_viewer", "--level", "0"]).is_err());
    }

    #[test]
    fn catalog_is_sorted_and_skips_incomplete_folders() {
        let root = scratch_dir("catalog");
        make_level(&root, "Level_2");
        make_level(&root, "Level_1");
        std::fs::create_dir_all(root.join("Level_3")).unwrap();
        std::fs::write(root.join("notes.txt"), "x").unwrap();

        let catalog = LevelCatalog::discover(&root).unwrap();
        let labels: Vec<_> = catalog.entries().iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, ["Level_1", "Level_2"]);
        assert_eq!(catalog.get(0).unwrap().models, root.join("Level_1").join(MODELS_DIR_NAME));

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn missing_root_is_an_error() {
        assert!(LevelCatalog::discover(Path::new("/definitely/not/here")).is_err());
    }
}
