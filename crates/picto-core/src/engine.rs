use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, UNIX_EPOCH};
use tracing::{debug, info, warn};

use crate::classify::{self, Classifier, ClassifyError};
use crate::config::AppConfig;
use crate::error::Error;
use crate::hasher;
use crate::progress::ProgressReporter;
use crate::scanner::{self, MediaFilter, ScannedMedia};
use crate::storage::models::{Media, NewMedia};
use crate::storage::Database;

/// Reconciles the media under the configured root with the database.
pub struct SyncEngine {
    config: AppConfig,
    classifier: Option<Arc<dyn Classifier>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub scanned: usize,
    pub hashed: usize,
    /// Files that could not be hashed (vanished or unreadable).
    pub skipped: usize,
    pub unchanged: usize,
    pub inserted: usize,
    pub moved: usize,
    /// Rows whose path now holds different content.
    pub rewritten: usize,
    /// Extra copies of content already indexed at another live path.
    pub duplicates: usize,
    /// Rows whose path now holds other content and whose own content is
    /// nowhere under the root.
    pub dropped: usize,
    pub classified: usize,
    pub classification_failures: usize,
    pub pruned_media: usize,
    pub pruned_classes: usize,
    pub scan_duration: Duration,
    pub hash_duration: Duration,
    pub reconcile_duration: Duration,
    pub classify_duration: Duration,
}

impl SyncEngine {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            classifier: None,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Open the configured database, run one sync pass and close it.
    pub fn sync(&self, reporter: &dyn ProgressReporter) -> Result<SyncReport, Error> {
        let db = Database::open(&self.config.db_path)?;
        let report = self.sync_database(&db, reporter)?;
        db.close()?;
        Ok(report)
    }

    /// Run one sync pass against an open database:
    /// 1. Walk the root for media files
    /// 2. Hash them in parallel; unreadable files are skipped
    /// 3. Reconcile against stored rows (insert / move / rewrite)
    /// 4. Delete rows whose file is gone, then classes nothing refers to
    /// 5. Classify every unlinked row and store the labels
    pub fn sync_database(
        &self,
        db: &Database,
        reporter: &dyn ProgressReporter,
    ) -> Result<SyncReport, Error> {
        let mut report = SyncReport::default();
        let root = Path::new(&self.config.root_path);
        if !root.is_dir() {
            warn!("Root {} is not a readable directory", root.display());
        }

        // Phase 1: Scan
        info!("Scanning {}...", root.display());
        reporter.on_scan_start();
        let scan_start = Instant::now();
        let mut scanned: Vec<ScannedMedia> = Vec::new();
        for media in scanner::scan_media(root, MediaFilter::from_config(&self.config)) {
            if scanned.len() % 100 == 0 {
                reporter.on_scan_progress(scanned.len(), &media.path.to_string_lossy());
            }
            scanned.push(media);
        }
        report.scanned = scanned.len();
        report.scan_duration = scan_start.elapsed();
        reporter.on_scan_complete(report.scanned, report.scan_duration.as_secs_f64());

        // Phase 2: Hash
        info!("Hashing {} files...", report.scanned);
        let hash_start = Instant::now();
        reporter.on_hash_start(report.scanned);
        let paths: Vec<PathBuf> = scanned.iter().map(|m| m.path.clone()).collect();
        let total = paths.len();
        let digests = hasher::hash_files(&paths, |done| reporter.on_hash_progress(done, total));

        let mut live: Vec<LiveFile> = Vec::with_capacity(scanned.len());
        for (media, digest) in scanned.into_iter().zip(digests) {
            match digest {
                Ok(hash) => live.push(LiveFile::new(media, hash)),
                Err(e) => {
                    warn!("Skipping {}: {}", media.path.display(), e);
                    report.skipped += 1;
                }
            }
        }
        report.hashed = live.len();
        report.hash_duration = hash_start.elapsed();
        reporter.on_hash_complete(report.hashed, report.hash_duration.as_secs_f64());

        // Phase 3: Reconcile
        let reconcile_start = Instant::now();
        let tx = db.transaction()?;
        reconcile(db, &live, &mut report)?;
        tx.commit()?;
        report.reconcile_duration = reconcile_start.elapsed();
        debug!(
            "Reconciled in {:.2}s: {} new, {} moved, {} rewritten, {} duplicates, {} unchanged",
            report.reconcile_duration.as_secs_f64(),
            report.inserted,
            report.moved,
            report.rewritten,
            report.duplicates,
            report.unchanged,
        );

        // Phase 4: Prune
        let (pruned_media, pruned_classes) = prune_missing(db)?;
        report.pruned_media = pruned_media;
        report.pruned_classes = pruned_classes;
        reporter.on_prune_complete(pruned_media, pruned_classes);

        // Phase 5: Classify
        match &self.classifier {
            Some(classifier) if self.config.classify => {
                let classify_start = Instant::now();
                let (classified, failed) = classify_unlinked(db, classifier.as_ref(), reporter)?;
                report.classified = classified;
                report.classification_failures = failed;
                report.classify_duration = classify_start.elapsed();
                reporter.on_classify_complete(
                    classified,
                    failed,
                    report.classify_duration.as_secs_f64(),
                );
            }
            _ => debug!("Classification disabled; unlinked rows left for a later pass"),
        }

        info!(
            "Sync complete: {} scanned, {} new, {} moved, {} pruned, {} classified",
            report.scanned, report.inserted, report.moved, report.pruned_media, report.classified
        );
        Ok(report)
    }
}

/// A scanned file with its digest, in the string form the database uses.
struct LiveFile {
    path: String,
    directory: String,
    media: ScannedMedia,
    hash: String,
}

impl LiveFile {
    fn new(media: ScannedMedia, hash: String) -> Self {
        Self {
            path: media.path.to_string_lossy().into_owned(),
            directory: media.directory.to_string_lossy().into_owned(),
            media,
            hash,
        }
    }

    fn timestamp(&self) -> i64 {
        fs::metadata(&self.media.path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

/// Match every hashed file against the stored rows.
///
/// A row is identified by its hash. When a file lands on a path still held by
/// another row, that row is parked on a placeholder path if its content is
/// live elsewhere under the root (it is picked up again when that file is
/// reached) and dropped otherwise.
fn reconcile(db: &Database, live: &[LiveFile], report: &mut SyncReport) -> Result<(), Error> {
    let live_hashes: HashMap<&str, &str> = live
        .iter()
        .map(|f| (f.path.as_str(), f.hash.as_str()))
        .collect();
    let live_digests: HashSet<&str> = live.iter().map(|f| f.hash.as_str()).collect();

    for file in live {
        match db.media_by_hash(&file.hash)? {
            Some(row) if row.path == file.path => report.unchanged += 1,
            Some(row) if live_hashes.get(row.path.as_str()) == Some(&file.hash.as_str()) => {
                debug!("{} duplicates {}", file.path, row.path);
                release_path(db, file, &live_digests, report)?;
                report.duplicates += 1;
            }
            Some(row) => {
                release_path(db, file, &live_digests, report)?;
                debug!("Moved {} -> {}", row.path, file.path);
                db.update_media_location(
                    row.id,
                    &file.path,
                    &file.directory,
                    file.timestamp(),
                )?;
                report.moved += 1;
            }
            None => match db.media_by_path(&file.path)? {
                Some(existing) if !live_digests.contains(existing.hash.as_str()) => {
                    debug!("Content changed at {}", file.path);
                    db.replace_media_content(
                        existing.id,
                        &file.hash,
                        file.media.file_type,
                        file.timestamp(),
                    )?;
                    report.rewritten += 1;
                }
                holder => {
                    if let Some(moved_away) = holder {
                        debug!("Parking row {} at {}", moved_away.id, moved_away.path);
                        db.detach_media(moved_away.id)?;
                    }
                    db.insert_media(&NewMedia {
                        hash: file.hash.clone(),
                        path: file.path.clone(),
                        directory: file.directory.clone(),
                        file_type: file.media.file_type,
                        timestamp: file.timestamp(),
                    })?;
                    report.inserted += 1;
                }
            },
        }
    }
    Ok(())
}

/// Free `file.path` from a row holding other content.
fn release_path(
    db: &Database,
    file: &LiveFile,
    live_digests: &HashSet<&str>,
    report: &mut SyncReport,
) -> Result<(), Error> {
    let holder = match db.media_by_path(&file.path)? {
        Some(holder) if holder.hash != file.hash => holder,
        _ => return Ok(()),
    };
    if live_digests.contains(holder.hash.as_str()) {
        debug!("Parking row {} at {}", holder.id, holder.path);
        db.detach_media(holder.id)?;
    } else {
        debug!("Dropping stale row {} at {}", holder.id, holder.path);
        db.delete_media(holder.id)?;
        report.dropped += 1;
    }
    Ok(())
}

/// Delete rows whose file no longer exists, in one statement, then classes
/// left without tags.
fn prune_missing(db: &Database) -> Result<(usize, usize), Error> {
    let missing: Vec<String> = db
        .all_media_paths()?
        .into_iter()
        .filter(|p| !Path::new(p).exists())
        .collect();

    let tx = db.transaction()?;
    let media = db.delete_media_by_paths(&missing)?;
    let classes = db.prune_orphan_classes()?;
    tx.commit()?;

    if media > 0 || classes > 0 {
        info!("Pruned {} missing media and {} unused classes", media, classes);
    }
    Ok((media, classes))
}

/// Classify unlinked rows in parallel, then write labels back through the
/// single connection. Returns (classified, failed).
fn classify_unlinked(
    db: &Database,
    classifier: &dyn Classifier,
    reporter: &dyn ProgressReporter,
) -> Result<(usize, usize), Error> {
    let pending: Vec<Media> = db.unlinked_media()?;
    if pending.is_empty() {
        return Ok((0, 0));
    }
    info!("Classifying {} unlinked media...", pending.len());
    reporter.on_classify_start(pending.len());

    let done = AtomicUsize::new(0);
    let total = pending.len();
    let outcomes: Vec<(&Media, Result<BTreeSet<String>, ClassifyError>)> = pending
        .par_iter()
        .map(|media| {
            let labels = classifier.classify(Path::new(&media.path), media.file_type);
            reporter.on_classify_progress(done.fetch_add(1, Ordering::Relaxed) + 1, total);
            (media, labels)
        })
        .collect();

    let mut classified = 0;
    let mut failed = 0;
    let tx = db.transaction()?;
    for (media, outcome) in outcomes {
        match outcome {
            Ok(labels) => {
                classify::persist_labels(db, media.id, &labels)?;
                classified += 1;
            }
            Err(e) => {
                warn!("Classification failed for {}: {}", media.path, e);
                failed += 1;
            }
        }
    }
    tx.commit()?;
    Ok((classified, failed))
}
