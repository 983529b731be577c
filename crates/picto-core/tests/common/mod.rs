#![allow(dead_code)]

use picto_core::{Classifier, ClassifyError, FileType};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Test classifier that reads labels out of the file itself.
///
/// A file containing `cat,dog#1` is labelled {cat, dog}; the part after `#`
/// only makes the bytes unique. `#2` alone yields no labels.
#[derive(Default)]
pub struct ContentClassifier {
    calls: Mutex<Vec<PathBuf>>,
    failing: AtomicBool,
}

impl ContentClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, path: &Path) -> usize {
        self.calls.lock().unwrap().iter().filter(|p| *p == path).count()
    }
}

impl Classifier for ContentClassifier {
    fn classify(
        &self,
        path: &Path,
        _file_type: FileType,
    ) -> Result<BTreeSet<String>, ClassifyError> {
        self.calls.lock().unwrap().push(path.to_path_buf());
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClassifyError::Detector("model unavailable".to_string()));
        }
        let content = fs::read_to_string(path)?;
        let labels = content.split('#').next().unwrap_or_default();
        Ok(labels
            .split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }
}

pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
