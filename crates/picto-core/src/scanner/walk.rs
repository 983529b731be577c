use glob::Pattern;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{error, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::AppConfig;
use crate::storage::models::FileType;

/// A media file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedMedia {
    pub path: PathBuf,
    pub file_type: FileType,
    pub directory: PathBuf,
}

/// Extension allowlists plus glob ignore patterns.
#[derive(Debug, Clone, Default)]
pub struct MediaFilter {
    image_extensions: HashSet<String>,
    video_extensions: HashSet<String>,
    ignore_patterns: Vec<Pattern>,
}

impl MediaFilter {
    pub fn new(
        image_extensions: &[String],
        video_extensions: &[String],
        ignore_globs: &[String],
    ) -> Self {
        let normalize = |exts: &[String]| -> HashSet<String> {
            exts.iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect()
        };

        let ignore_patterns = ignore_globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();

        Self {
            image_extensions: normalize(image_extensions),
            video_extensions: normalize(video_extensions),
            ignore_patterns,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.image_extensions,
            &config.video_extensions,
            &config.ignore_patterns,
        )
    }

    /// Classify a path by extension, case-insensitively.
    pub fn file_type(&self, path: &Path) -> Option<FileType> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if self.image_extensions.contains(&ext) {
            Some(FileType::Image)
        } else if self.video_extensions.contains(&ext) {
            Some(FileType::Video)
        } else {
            None
        }
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(path))
    }
}

/// Lazy walk over the media under a root. Consumed once.
pub struct MediaWalk {
    inner: Box<dyn Iterator<Item = walkdir::Result<DirEntry>> + Send>,
    filter: MediaFilter,
}

/// Walk `root` recursively, yielding every regular file whose extension is on
/// the allowlist. Directories whose name starts with `.` are never entered.
/// Symbolic links are not followed. Siblings are visited in file name order.
pub fn scan_media(root: &Path, filter: MediaFilter) -> MediaWalk {
    let prune = filter.clone();
    let inner = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| !should_skip(entry, &prune));

    MediaWalk {
        inner: Box::new(inner),
        filter,
    }
}

fn should_skip(entry: &DirEntry, filter: &MediaFilter) -> bool {
    if entry.depth() > 0 && entry.file_type().is_dir() && is_hidden(entry) {
        return true;
    }
    filter.is_ignored(entry.path())
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

impl Iterator for MediaWalk {
    type Item = ScannedMedia;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let at = err
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    warn!("Skipping unreadable entry {}: {}", at, err);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if let Some(file_type) = self.filter.file_type(path) {
                let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
                return Some(ScannedMedia {
                    path: entry.into_path(),
                    file_type,
                    directory,
                });
            }
        }
    }
}
