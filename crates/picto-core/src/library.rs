use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::classify::Classifier;
use crate::config::AppConfig;
use crate::coordinator::{SyncAttempt, SyncCoordinator};
use crate::engine::{SyncEngine, SyncReport};
use crate::error::Error;
use crate::lifecycle::{self, DeleteReport, Transition, TransitionReport};
use crate::progress::{ProgressReporter, SilentReporter};
use crate::storage::grouping::Groups;
use crate::storage::models::{FileType, Media, MediaInfo, StoreStats, Visibility};
use crate::storage::Database;

/// Entry point for a front end: one media library backed by one database.
///
/// Mutations (sync and visibility changes) go through a single writer lock.
/// Reads open their own connection and see the last committed state.
pub struct Library {
    engine: SyncEngine,
    coordinator: SyncCoordinator,
    writer: Mutex<()>,
}

impl Library {
    pub fn new(config: AppConfig) -> Self {
        Self {
            engine: SyncEngine::new(config),
            coordinator: SyncCoordinator::new(),
            writer: Mutex::new(()),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.engine = self.engine.with_classifier(classifier);
        self
    }

    pub fn config(&self) -> &AppConfig {
        self.engine.config()
    }

    pub fn has_classifier(&self) -> bool {
        self.engine.has_classifier()
    }

    pub fn coordinator(&self) -> &SyncCoordinator {
        &self.coordinator
    }

    /// Open the library database, creating its directory on first use.
    pub fn open_db(&self) -> Result<Database, Error> {
        let db_path = &self.config().db_path;
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Database::open(db_path)?)
    }

    /// Sync now, or wait for the sync already running and share its report.
    pub fn sync(&self, reporter: &dyn ProgressReporter) -> Result<SyncReport, Error> {
        self.coordinator.run(|| self.sync_locked(reporter))
    }

    /// Sync unless one is already running. Returns `None` when another
    /// caller's sync is in flight.
    pub fn refresh(&self) -> Result<Option<SyncReport>, Error> {
        match self.coordinator.try_run(|| self.sync_locked(&SilentReporter))? {
            SyncAttempt::Completed(report) => Ok(Some(report)),
            SyncAttempt::InFlight => Ok(None),
        }
    }

    fn sync_locked(&self, reporter: &dyn ProgressReporter) -> Result<SyncReport, Error> {
        let _writer = self.write_lock();
        let db = self.open_db()?;
        let report = self.engine.sync_database(&db, reporter)?;
        db.close()?;
        Ok(report)
    }

    fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn group_by_class(
        &self,
        visibility: Visibility,
        file_type: Option<FileType>,
    ) -> Result<Groups, Error> {
        self.read(|db| db.group_by_class(visibility, file_type))
    }

    pub fn group_by_directory(
        &self,
        visibility: Visibility,
        file_type: Option<FileType>,
    ) -> Result<Groups, Error> {
        self.read(|db| db.group_by_directory(visibility, file_type))
    }

    pub fn unlinked_media(&self) -> Result<Vec<Media>, Error> {
        self.read(|db| db.unlinked_media())
    }

    pub fn media_info(&self, path: &str) -> Result<Option<MediaInfo>, Error> {
        self.read(|db| db.media_info(path))
    }

    pub fn stats(&self) -> Result<StoreStats, Error> {
        self.read(|db| db.stats())
    }

    fn read<T, F>(&self, query: F) -> Result<T, Error>
    where
        F: FnOnce(&Database) -> rusqlite::Result<T>,
    {
        let db = self.open_db()?;
        let result = query(&db)?;
        db.close()?;
        Ok(result)
    }

    // ── Visibility ───────────────────────────────────────────────

    pub fn transition(
        &self,
        transition: Transition,
        paths: &[String],
    ) -> Result<TransitionReport, Error> {
        self.write(|db| lifecycle::apply(db, transition, paths))
    }

    pub fn transition_by_class(
        &self,
        transition: Transition,
        classes: &[String],
    ) -> Result<TransitionReport, Error> {
        self.write(|db| lifecycle::apply_by_class(db, transition, classes))
    }

    pub fn delete(&self, paths: &[String]) -> Result<DeleteReport, Error> {
        self.write(|db| lifecycle::delete(db, paths))
    }

    pub fn delete_by_class(&self, classes: &[String]) -> Result<DeleteReport, Error> {
        self.write(|db| lifecycle::delete_by_class(db, classes))
    }

    fn write<T, F>(&self, mutation: F) -> Result<T, Error>
    where
        F: FnOnce(&Database) -> Result<T, Error>,
    {
        let _writer = self.write_lock();
        let db = self.open_db()?;
        let result = mutation(&db)?;
        db.close()?;
        Ok(result)
    }
}
