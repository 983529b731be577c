use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "avif"];
pub const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm"];
pub const DEFAULT_FRAME_STRIDE: usize = 6;
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.7;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory tree to index.
    pub root_path: String,
    pub db_path: String,
    pub image_extensions: Vec<String>,
    pub video_extensions: Vec<String>,
    pub ignore_patterns: Vec<String>,
    /// When false, sync only indexes; new rows stay unlinked.
    pub classify: bool,
    pub video_frame_stride: usize,
    pub min_confidence: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_path: home_dir().to_string_lossy().into_owned(),
            db_path: data_dir().join("database.db").to_string_lossy().into_owned(),
            image_extensions: DEFAULT_IMAGE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            video_extensions: DEFAULT_VIDEO_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            ignore_patterns: Vec::new(),
            classify: true,
            video_frame_stride: DEFAULT_FRAME_STRIDE,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl AppConfig {
    /// Defaults with the given root and database locations.
    pub fn with_paths(root_path: &str, db_path: &str) -> Self {
        Self {
            root_path: root_path.to_string(),
            db_path: db_path.to_string(),
            ..Self::default()
        }
    }
}

/// Load from an optional `Config` file in the working directory, then
/// `PICTO_*` environment variables. Missing keys fall back to defaults.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("PICTO")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("image_extensions")
                .with_list_parse_key("video_extensions")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Per-user data directory holding the database.
pub fn data_dir() -> PathBuf {
    home_dir().join(".picto")
}
