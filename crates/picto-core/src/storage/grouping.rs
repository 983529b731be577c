//! Aggregate queries consumed by the presentation layer.
//!
//! Each grouping runs as one query and is folded into a map client-side.
//! Path order inside a group is whatever order SQLite returns the join in.

use super::models::{FileType, Visibility};
use super::sqlite::{text_array, Database};
use rusqlite::{params, Result};
use std::collections::BTreeMap;

pub type Groups = BTreeMap<String, Vec<String>>;

impl Database {
    /// Class name → paths of media in `visibility` tagged with that class.
    /// `file_type = None` matches both images and videos.
    pub fn group_by_class(
        &self,
        visibility: Visibility,
        file_type: Option<FileType>,
    ) -> Result<Groups> {
        let mut stmt = self.connection().prepare_cached(
            "SELECT c.class, m.path \
             FROM media m \
             JOIN junction j ON j.media_id = m.media_id \
             JOIN class c ON c.class_id = j.class_id \
             WHERE m.hidden = ?1 AND (?2 IS NULL OR m.file_type = ?2)",
        )?;
        let rows = stmt.query_map(params![visibility, file_type], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        fold_groups(rows)
    }

    /// Parent directory → paths of media in `visibility`.
    pub fn group_by_directory(
        &self,
        visibility: Visibility,
        file_type: Option<FileType>,
    ) -> Result<Groups> {
        let mut stmt = self.connection().prepare_cached(
            "SELECT directory, path FROM media \
             WHERE hidden = ?1 AND (?2 IS NULL OR file_type = ?2)",
        )?;
        let rows = stmt.query_map(params![visibility, file_type], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        fold_groups(rows)
    }

    /// Distinct paths in `visibility` tagged with any of `classes`.
    pub fn paths_by_classes(
        &self,
        classes: &[String],
        visibility: Visibility,
    ) -> Result<Vec<String>> {
        if classes.is_empty() {
            return Ok(Vec::new());
        }
        let mut stmt = self.connection().prepare(
            "SELECT DISTINCT m.path \
             FROM media m \
             JOIN junction j ON j.media_id = m.media_id \
             JOIN class c ON c.class_id = j.class_id \
             WHERE m.hidden = ?1 AND c.class IN rarray(?2)",
        )?;
        let paths = stmt
            .query_map(params![visibility, text_array(classes)], |row| row.get(0))?
            .collect::<Result<Vec<String>>>()?;
        Ok(paths)
    }
}

fn fold_groups<I>(rows: I) -> Result<Groups>
where
    I: Iterator<Item = Result<(String, String)>>,
{
    let mut groups = Groups::new();
    for row in rows {
        let (key, path) = row?;
        groups.entry(key).or_default().push(path);
    }
    Ok(groups)
}
