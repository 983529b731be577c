pub mod classify;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod library;
pub mod lifecycle;
pub mod progress;
pub mod scanner;
pub mod storage;

pub use classify::{Classifier, ClassifyError};
pub use config::AppConfig;
pub use coordinator::{SyncAttempt, SyncCoordinator};
pub use engine::{SyncEngine, SyncReport};
pub use error::Error;
pub use library::Library;
pub use progress::{ProgressReporter, SilentReporter};
pub use storage::models::{FileType, Visibility};
