//! Visibility state machine.
//!
//! ```text
//!   Hidden <--hide/unhide--> Active <--trash/restore--> Trashed --delete--> (gone)
//! ```
//!
//! Every batch transition is a single UPDATE restricted to rows in the source
//! state. Paths that are unknown or in another state are skipped.

use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io;
use tracing::{info, warn};

use crate::error::Error;
use crate::storage::models::Visibility;
use crate::storage::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Hide,
    Unhide,
    Trash,
    Restore,
}

impl Transition {
    pub fn from_state(&self) -> Visibility {
        match self {
            Transition::Hide | Transition::Trash => Visibility::Active,
            Transition::Unhide => Visibility::Hidden,
            Transition::Restore => Visibility::Trashed,
        }
    }

    pub fn to_state(&self) -> Visibility {
        match self {
            Transition::Hide => Visibility::Hidden,
            Transition::Trash => Visibility::Trashed,
            Transition::Unhide | Transition::Restore => Visibility::Active,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransitionReport {
    pub requested: usize,
    pub applied: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub requested: usize,
    /// Paths whose file and row are both gone.
    pub deleted: Vec<String>,
    /// Paths that were not in the trash.
    pub skipped: usize,
    /// Paths whose file could not be removed; their rows stay trashed.
    pub unlink_failures: Vec<(String, String)>,
}

pub fn apply(
    db: &Database,
    transition: Transition,
    paths: &[String],
) -> Result<TransitionReport, Error> {
    let applied = db.set_visibility(paths, transition.from_state(), transition.to_state())?;
    info!(
        "{:?}: {} of {} paths moved to {}",
        transition,
        applied,
        paths.len(),
        transition.to_state()
    );
    Ok(TransitionReport {
        requested: paths.len(),
        applied,
    })
}

pub fn hide(db: &Database, paths: &[String]) -> Result<TransitionReport, Error> {
    apply(db, Transition::Hide, paths)
}

pub fn unhide(db: &Database, paths: &[String]) -> Result<TransitionReport, Error> {
    apply(db, Transition::Unhide, paths)
}

pub fn trash(db: &Database, paths: &[String]) -> Result<TransitionReport, Error> {
    apply(db, Transition::Trash, paths)
}

pub fn restore(db: &Database, paths: &[String]) -> Result<TransitionReport, Error> {
    apply(db, Transition::Restore, paths)
}

/// Apply `transition` to every media in its source state tagged with any of
/// `classes`.
pub fn apply_by_class(
    db: &Database,
    transition: Transition,
    classes: &[String],
) -> Result<TransitionReport, Error> {
    let paths = db.paths_by_classes(classes, transition.from_state())?;
    apply(db, transition, &paths)
}

pub fn hide_by_class(db: &Database, classes: &[String]) -> Result<TransitionReport, Error> {
    apply_by_class(db, Transition::Hide, classes)
}

pub fn unhide_by_class(db: &Database, classes: &[String]) -> Result<TransitionReport, Error> {
    apply_by_class(db, Transition::Unhide, classes)
}

pub fn trash_by_class(db: &Database, classes: &[String]) -> Result<TransitionReport, Error> {
    apply_by_class(db, Transition::Trash, classes)
}

/// Permanently delete trashed media: unlink each file, then remove the rows
/// of every path whose file is gone in one statement.
///
/// Best effort per path. A file that cannot be removed is reported and its
/// row stays in the trash; the rest of the batch still goes through.
pub fn delete(db: &Database, paths: &[String]) -> Result<DeleteReport, Error> {
    let trashed = db.paths_in_state(paths, Visibility::Trashed)?;
    let distinct: HashSet<&String> = paths.iter().collect();
    let mut report = DeleteReport {
        requested: paths.len(),
        skipped: distinct.len().saturating_sub(trashed.len()),
        ..DeleteReport::default()
    };

    let mut removed = Vec::with_capacity(trashed.len());
    for path in trashed {
        match fs::remove_file(&path) {
            Ok(()) => removed.push(path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => removed.push(path),
            Err(e) => {
                warn!("Could not remove {}: {}", path, e);
                report.unlink_failures.push((path, e.to_string()));
            }
        }
    }

    let tx = db.transaction()?;
    db.delete_media_by_paths(&removed)?;
    db.prune_orphan_classes()?;
    tx.commit()?;

    info!(
        "Deleted {} of {} requested paths ({} unlink failures)",
        removed.len(),
        report.requested,
        report.unlink_failures.len()
    );
    report.deleted = removed;
    Ok(report)
}

/// Permanently delete every trashed media tagged with any of `classes`.
pub fn delete_by_class(db: &Database, classes: &[String]) -> Result<DeleteReport, Error> {
    let paths = db.paths_by_classes(classes, Visibility::Trashed)?;
    delete(db, &paths)
}
