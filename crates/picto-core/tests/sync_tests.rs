mod common;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

use common::{path_str, ContentClassifier};
use picto_core::hasher::hash_data;
use picto_core::lifecycle;
use picto_core::storage::Database;
use picto_core::{AppConfig, FileType, ProgressReporter, SilentReporter, SyncEngine, Visibility};

fn engine_for(root: &Path, classifier: &Arc<ContentClassifier>) -> SyncEngine {
    let config = AppConfig::with_paths(&path_str(root), ":memory:");
    SyncEngine::new(config).with_classifier(classifier.clone())
}

fn tag_count(db: &Database) -> i64 {
    db.stats().unwrap().tags
}

#[test]
fn test_end_to_end_index_move_delete() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let a = root.join("a.jpg");
    fs::write(&a, "cat#1").unwrap();

    let classifier = Arc::new(ContentClassifier::new());
    let engine = engine_for(root, &classifier);
    let db = Database::open_in_memory().unwrap();

    // Index
    let report = engine.sync_database(&db, &SilentReporter).unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.classified, 1);

    let rows = db.all_media().unwrap();
    assert_eq!(rows.len(), 1);
    let original = rows[0].clone();
    assert_eq!(original.hash, hash_data(b"cat#1"));
    assert_eq!(original.path, path_str(&a));
    assert_eq!(original.directory, path_str(root));
    assert_eq!(original.file_type, FileType::Image);
    assert_eq!(original.visibility, Visibility::Active);
    let stats = db.stats().unwrap();
    assert_eq!((stats.classes, stats.tags), (1, 1));

    let groups = db.group_by_class(Visibility::Active, Some(FileType::Image)).unwrap();
    let expected: BTreeMap<String, Vec<String>> =
        [("cat".to_string(), vec![path_str(&a)])].into_iter().collect();
    assert_eq!(groups, expected);

    // Rename
    let b = root.join("b.jpg");
    fs::rename(&a, &b).unwrap();
    let report = engine.sync_database(&db, &SilentReporter).unwrap();
    assert_eq!(report.moved, 1);
    assert_eq!(report.inserted, 0);
    assert_eq!(report.pruned_media, 0);

    let rows = db.all_media().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, original.id);
    assert_eq!(rows[0].hash, original.hash);
    assert_eq!(rows[0].path, path_str(&b));
    assert_eq!(classifier.call_count(), 1, "moved file must not be classified again");
    assert_eq!(tag_count(&db), 1);

    // Delete from disk
    fs::remove_file(&b).unwrap();
    let report = engine.sync_database(&db, &SilentReporter).unwrap();
    assert_eq!(report.pruned_media, 1);
    assert_eq!(report.pruned_classes, 1);

    assert!(db.all_media().unwrap().is_empty());
    assert_eq!(tag_count(&db), 0);
    assert!(db
        .group_by_class(Visibility::Active, Some(FileType::Image))
        .unwrap()
        .is_empty());
}

#[test]
fn test_sync_is_idempotent() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    fs::create_dir_all(root.join("trip")).unwrap();
    fs::write(root.join("a.jpg"), "cat#1").unwrap();
    fs::write(root.join("trip/b.png"), "cat,dog#2").unwrap();
    fs::write(root.join("trip/c.mp4"), "person#3").unwrap();
    fs::write(root.join("trip/notes.txt"), "ignored").unwrap();

    let classifier = Arc::new(ContentClassifier::new());
    let engine = engine_for(root, &classifier);
    let db = Database::open_in_memory().unwrap();

    engine.sync_database(&db, &SilentReporter).unwrap();
    let media_before = db.all_media().unwrap();
    let stats_before = db.stats().unwrap();
    let groups_before = db.group_by_class(Visibility::Active, None).unwrap();
    let calls_before = classifier.call_count();

    let report = engine.sync_database(&db, &SilentReporter).unwrap();
    assert_eq!(report.unchanged, 3);
    assert_eq!(report.inserted + report.moved + report.rewritten + report.pruned_media, 0);

    assert_eq!(db.all_media().unwrap(), media_before);
    assert_eq!(db.stats().unwrap(), stats_before);
    assert_eq!(db.group_by_class(Visibility::Active, None).unwrap(), groups_before);
    assert_eq!(classifier.call_count(), calls_before);
    assert_eq!(stats_before.media, 3);
    assert_eq!(stats_before.tags, 4);
}

#[test]
fn test_identical_bytes_yield_one_row() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    fs::write(root.join("a.jpg"), "cat#same").unwrap();
    fs::write(root.join("copy.jpg"), "cat#same").unwrap();

    let classifier = Arc::new(ContentClassifier::new());
    let engine = engine_for(root, &classifier);
    let db = Database::open_in_memory().unwrap();

    let report = engine.sync_database(&db, &SilentReporter).unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.duplicates, 1);
    assert_eq!(db.all_media().unwrap().len(), 1);

    // Re-syncing with both copies present keeps the same row and path.
    let stored = db.all_media().unwrap()[0].clone();
    engine.sync_database(&db, &SilentReporter).unwrap();
    assert_eq!(db.all_media().unwrap(), vec![stored.clone()]);

    // Moving the indexed copy away updates the path in place.
    fs::rename(root.join("a.jpg"), root.join("z.jpg")).unwrap();
    engine.sync_database(&db, &SilentReporter).unwrap();

    let rows = db.all_media().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, stored.id);
    assert_ne!(rows[0].path, stored.path);
    assert_eq!(classifier.call_count(), 1);
}

#[test]
fn test_deleted_file_is_reclaimed_with_its_tags() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    fs::write(root.join("keep.jpg"), "cat#1").unwrap();
    fs::write(root.join("gone.jpg"), "cat,dog#2").unwrap();

    let classifier = Arc::new(ContentClassifier::new());
    let engine = engine_for(root, &classifier);
    let db = Database::open_in_memory().unwrap();
    engine.sync_database(&db, &SilentReporter).unwrap();
    assert_eq!(tag_count(&db), 3);

    fs::remove_file(root.join("gone.jpg")).unwrap();
    let report = engine.sync_database(&db, &SilentReporter).unwrap();
    assert_eq!(report.pruned_media, 1);

    let rows = db.all_media().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].path, path_str(&root.join("keep.jpg")));
    assert_eq!(tag_count(&db), 1);
    // "dog" lost its only tag.
    assert_eq!(db.stats().unwrap().classes, 1);
}

#[test]
fn test_failed_classification_is_retried_next_pass() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let a = root.join("a.jpg");
    fs::write(&a, "cat#1").unwrap();

    let classifier = Arc::new(ContentClassifier::new());
    classifier.set_failing(true);
    let engine = engine_for(root, &classifier);
    let db = Database::open_in_memory().unwrap();

    let report = engine.sync_database(&db, &SilentReporter).unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.classification_failures, 1);
    assert_eq!(db.unlinked_media().unwrap().len(), 1);

    classifier.set_failing(false);
    let report = engine.sync_database(&db, &SilentReporter).unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(report.classified, 1);
    assert!(db.unlinked_media().unwrap().is_empty());
    assert_eq!(classifier.calls_for(&a), 2);
}

#[test]
fn test_unclassified_rows_wait_for_a_classifier() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    fs::write(root.join("a.jpg"), "cat#1").unwrap();
    let db = Database::open_in_memory().unwrap();

    let indexing_only = SyncEngine::new(AppConfig::with_paths(&path_str(root), ":memory:"));
    let report = indexing_only.sync_database(&db, &SilentReporter).unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.classified, 0);
    assert_eq!(db.unlinked_media().unwrap().len(), 1);

    let classifier = Arc::new(ContentClassifier::new());
    let report = engine_for(root, &classifier)
        .sync_database(&db, &SilentReporter)
        .unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(report.classified, 1);
    assert_eq!(db.stats().unwrap().tags, 1);
}

#[test]
fn test_classify_flag_disables_classification() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    fs::write(root.join("a.jpg"), "cat#1").unwrap();

    let classifier = Arc::new(ContentClassifier::new());
    let mut config = AppConfig::with_paths(&path_str(root), ":memory:");
    config.classify = false;
    let engine = SyncEngine::new(config).with_classifier(classifier.clone());
    let db = Database::open_in_memory().unwrap();

    engine.sync_database(&db, &SilentReporter).unwrap();
    assert_eq!(classifier.call_count(), 0);
    assert_eq!(db.unlinked_media().unwrap().len(), 1);
}

#[test]
fn test_rewritten_file_takes_new_identity_and_labels() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let a = root.join("a.jpg");
    fs::write(&a, "cat#1").unwrap();

    let classifier = Arc::new(ContentClassifier::new());
    let engine = engine_for(root, &classifier);
    let db = Database::open_in_memory().unwrap();
    engine.sync_database(&db, &SilentReporter).unwrap();
    let before = db.all_media().unwrap()[0].clone();

    fs::write(&a, "dog#2").unwrap();
    let report = engine.sync_database(&db, &SilentReporter).unwrap();
    assert_eq!(report.rewritten, 1);
    // "cat" lost its only tag when the content changed.
    assert_eq!(report.pruned_classes, 1);

    let info = db.media_info(&path_str(&a)).unwrap().unwrap();
    assert_eq!(info.media.id, before.id);
    assert_eq!(info.media.hash, hash_data(b"dog#2"));
    assert_eq!(info.classes, vec!["dog".to_string()]);
    assert_eq!(db.stats().unwrap().classes, 1);
}

#[test]
fn test_empty_label_set_is_not_a_failure() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    fs::write(root.join("blank.jpg"), "#1").unwrap();

    let classifier = Arc::new(ContentClassifier::new());
    let engine = engine_for(root, &classifier);
    let db = Database::open_in_memory().unwrap();

    let report = engine.sync_database(&db, &SilentReporter).unwrap();
    assert_eq!(report.classified, 1);
    assert_eq!(report.classification_failures, 0);
    assert_eq!(db.stats().unwrap().tags, 0);
}

#[test]
fn test_hidden_directories_are_not_indexed() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    fs::create_dir_all(root.join(".thumbnails")).unwrap();
    fs::write(root.join(".thumbnails/t.jpg"), "cat#t").unwrap();
    fs::write(root.join("a.jpg"), "cat#a").unwrap();

    let classifier = Arc::new(ContentClassifier::new());
    let db = Database::open_in_memory().unwrap();
    let report = engine_for(root, &classifier)
        .sync_database(&db, &SilentReporter)
        .unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(db.all_media().unwrap().len(), 1);
}

#[test]
fn test_sync_opens_and_closes_configured_database() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("media");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("a.jpg"), "cat#1").unwrap();
    let db_path = tmp.path().join("picto.db");

    let classifier = Arc::new(ContentClassifier::new());
    let config = AppConfig::with_paths(&path_str(&root), &path_str(&db_path));
    let engine = SyncEngine::new(config).with_classifier(classifier.clone());
    engine.sync(&SilentReporter).unwrap();

    let db = Database::open(&path_str(&db_path)).unwrap();
    let stats = db.stats().unwrap();
    assert_eq!((stats.media, stats.classes, stats.tags), (1, 1, 1));
}

#[test]
fn test_rename_chain_keeps_identity_and_visibility() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let (a, b, c) = (root.join("a.jpg"), root.join("b.jpg"), root.join("c.jpg"));
    fs::write(&a, "cat#1").unwrap();
    fs::write(&b, "dog#2").unwrap();

    let classifier = Arc::new(ContentClassifier::new());
    let engine = engine_for(root, &classifier);
    let db = Database::open_in_memory().unwrap();
    engine.sync_database(&db, &SilentReporter).unwrap();
    let cat = db.media_by_path(&path_str(&a)).unwrap().unwrap();
    let dog = db.media_by_path(&path_str(&b)).unwrap().unwrap();
    lifecycle::hide(&db, &[path_str(&b)]).unwrap();

    // b -> c, then a -> b
    fs::rename(&b, &c).unwrap();
    fs::rename(&a, &b).unwrap();
    let report = engine.sync_database(&db, &SilentReporter).unwrap();
    assert_eq!(report.moved, 2);
    assert_eq!((report.inserted, report.dropped, report.pruned_media), (0, 0, 0));

    let at_b = db.media_info(&path_str(&b)).unwrap().unwrap();
    assert_eq!(at_b.media.id, cat.id);
    assert_eq!(at_b.media.visibility, Visibility::Active);
    assert_eq!(at_b.classes, vec!["cat".to_string()]);

    let at_c = db.media_info(&path_str(&c)).unwrap().unwrap();
    assert_eq!(at_c.media.id, dog.id);
    assert_eq!(at_c.media.visibility, Visibility::Hidden);
    assert_eq!(at_c.classes, vec!["dog".to_string()]);

    assert_eq!(db.all_media().unwrap().len(), 2);
    assert_eq!(classifier.call_count(), 2, "renamed files must not be classified again");
}

#[test]
fn test_swapped_files_keep_their_rows() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let (a, b, tmp_path) = (root.join("a.jpg"), root.join("b.jpg"), root.join("swap"));
    fs::write(&a, "cat#1").unwrap();
    fs::write(&b, "dog#2").unwrap();

    let classifier = Arc::new(ContentClassifier::new());
    let engine = engine_for(root, &classifier);
    let db = Database::open_in_memory().unwrap();
    engine.sync_database(&db, &SilentReporter).unwrap();
    let cat = db.media_by_path(&path_str(&a)).unwrap().unwrap();
    let dog = db.media_by_path(&path_str(&b)).unwrap().unwrap();
    lifecycle::trash(&db, &[path_str(&a)]).unwrap();

    fs::rename(&a, &tmp_path).unwrap();
    fs::rename(&b, &a).unwrap();
    fs::rename(&tmp_path, &b).unwrap();
    let report = engine.sync_database(&db, &SilentReporter).unwrap();
    assert_eq!(report.moved, 2);
    assert_eq!(report.inserted, 0);

    let at_a = db.media_by_path(&path_str(&a)).unwrap().unwrap();
    let at_b = db.media_by_path(&path_str(&b)).unwrap().unwrap();
    assert_eq!((at_a.id, at_a.hash), (dog.id, dog.hash));
    assert_eq!((at_b.id, at_b.hash), (cat.id, cat.hash));
    assert_eq!(at_b.visibility, Visibility::Trashed);
    assert_eq!(at_a.visibility, Visibility::Active);
    assert_eq!(classifier.call_count(), 2);
}

#[test]
fn test_path_overwritten_with_indexed_copy_drops_old_row() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let (a, b) = (root.join("a.jpg"), root.join("b.jpg"));
    fs::write(&a, "cat#1").unwrap();
    fs::write(&b, "dog#2").unwrap();

    let classifier = Arc::new(ContentClassifier::new());
    let engine = engine_for(root, &classifier);
    let db = Database::open_in_memory().unwrap();
    engine.sync_database(&db, &SilentReporter).unwrap();

    fs::copy(&b, &a).unwrap();
    let report = engine.sync_database(&db, &SilentReporter).unwrap();
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.dropped, 1);
    assert_eq!(report.pruned_classes, 1);

    assert!(db.media_info(&path_str(&a)).unwrap().is_none());
    let groups = db.group_by_class(Visibility::Active, None).unwrap();
    let expected: BTreeMap<String, Vec<String>> =
        [("dog".to_string(), vec![path_str(&b)])].into_iter().collect();
    assert_eq!(groups, expected);
}

#[test]
fn test_move_onto_path_of_deleted_file_replaces_its_row() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let (a, b) = (root.join("a.jpg"), root.join("b.jpg"));
    fs::write(&a, "cat#1").unwrap();
    fs::write(&b, "dog#2").unwrap();

    let classifier = Arc::new(ContentClassifier::new());
    let engine = engine_for(root, &classifier);
    let db = Database::open_in_memory().unwrap();
    engine.sync_database(&db, &SilentReporter).unwrap();
    let cat = db.media_by_path(&path_str(&a)).unwrap().unwrap();

    fs::remove_file(&b).unwrap();
    fs::rename(&a, &b).unwrap();
    let report = engine.sync_database(&db, &SilentReporter).unwrap();
    assert_eq!(report.moved, 1);
    assert_eq!(report.dropped, 1);

    let rows = db.all_media().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, cat.id);
    assert_eq!(rows[0].path, path_str(&b));
    let stats = db.stats().unwrap();
    assert_eq!((stats.classes, stats.tags), (1, 1));
}

/// Removes a file once the walk is done, before it can be hashed.
struct VanishingFile(std::path::PathBuf);

impl ProgressReporter for VanishingFile {
    fn on_hash_start(&self, _total_files: usize) {
        fs::remove_file(&self.0).unwrap();
    }
}

#[test]
fn test_unreadable_file_is_skipped_and_pass_commits() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    fs::write(root.join("a.jpg"), "cat#1").unwrap();
    fs::write(root.join("b.jpg"), "dog#2").unwrap();
    fs::write(root.join("c.jpg"), "bird#3").unwrap();

    let classifier = Arc::new(ContentClassifier::new());
    let engine = engine_for(root, &classifier);
    let db = Database::open_in_memory().unwrap();

    let report = engine
        .sync_database(&db, &VanishingFile(root.join("b.jpg")))
        .unwrap();
    assert_eq!(report.scanned, 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.hashed, 2);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.classified, 2);

    assert!(db.media_by_path(&path_str(&root.join("b.jpg"))).unwrap().is_none());
    assert_eq!(db.all_media().unwrap().len(), 2);
    assert_eq!(db.stats().unwrap().tags, 2);
}
