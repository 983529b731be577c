/// Trait for reporting sync progress.
///
/// The CLI implements this with indicatif bars. All methods have default no-op
/// implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self) {}
    fn on_scan_progress(&self, _files_found: usize, _current_path: &str) {}
    fn on_scan_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_hash_start(&self, _total_files: usize) {}
    fn on_hash_progress(&self, _files_hashed: usize, _total_files: usize) {}
    fn on_hash_complete(&self, _hashed: usize, _duration_secs: f64) {}
    fn on_classify_start(&self, _pending: usize) {}
    fn on_classify_progress(&self, _classified: usize, _pending: usize) {}
    fn on_classify_complete(&self, _classified: usize, _failed: usize, _duration_secs: f64) {}
    fn on_prune_complete(&self, _media: usize, _classes: usize) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
