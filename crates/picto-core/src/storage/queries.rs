use super::models::*;
use super::sqlite::{text_array, Database};
use rusqlite::{params, OptionalExtension, Result, Row};
use tracing::debug;

const MEDIA_COLUMNS: &str =
    "media_id, hash, path, directory, file_type, timestamp, hidden";

/// Path prefix of rows parked by `detach_media`. Never a real file, so a
/// row left parked is removed by the next prune.
const DETACHED_PREFIX: &str = "detached:";

fn media_from_row(row: &Row<'_>) -> Result<Media> {
    Ok(Media {
        id: row.get(0)?,
        hash: row.get(1)?,
        path: row.get(2)?,
        directory: row.get(3)?,
        file_type: row.get(4)?,
        timestamp: row.get(5)?,
        visibility: row.get(6)?,
    })
}

impl Database {
    // ── Media ────────────────────────────────────────────────────

    pub fn media_by_hash(&self, hash: &str) -> Result<Option<Media>> {
        let mut stmt = self.connection().prepare_cached(&format!(
            "SELECT {} FROM media WHERE hash = ?1",
            MEDIA_COLUMNS
        ))?;
        stmt.query_row(params![hash], media_from_row).optional()
    }

    pub fn media_by_path(&self, path: &str) -> Result<Option<Media>> {
        let mut stmt = self.connection().prepare_cached(&format!(
            "SELECT {} FROM media WHERE path = ?1",
            MEDIA_COLUMNS
        ))?;
        stmt.query_row(params![path], media_from_row).optional()
    }

    /// Insert a new active row with no tags. Returns its id.
    pub fn insert_media(&self, media: &NewMedia) -> Result<i64> {
        let mut stmt = self.connection().prepare_cached(
            "INSERT INTO media (hash, path, directory, file_type, timestamp, hidden) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        stmt.execute(params![
            media.hash,
            media.path,
            media.directory,
            media.file_type,
            media.timestamp,
            Visibility::Active,
        ])?;
        Ok(self.connection().last_insert_rowid())
    }

    /// Point an existing row at a new location. Tags and visibility are kept.
    pub fn update_media_location(
        &self,
        media_id: i64,
        path: &str,
        directory: &str,
        timestamp: i64,
    ) -> Result<()> {
        let mut stmt = self.connection().prepare_cached(
            "UPDATE media SET path = ?1, directory = ?2, timestamp = ?3 WHERE media_id = ?4",
        )?;
        stmt.execute(params![path, directory, timestamp, media_id])?;
        Ok(())
    }

    /// The file at this row's path now holds different bytes: take the new
    /// identity and drop the tags so the row is classified again.
    pub fn replace_media_content(
        &self,
        media_id: i64,
        hash: &str,
        file_type: FileType,
        timestamp: i64,
    ) -> Result<()> {
        self.connection().execute(
            "UPDATE media SET hash = ?1, file_type = ?2, timestamp = ?3 WHERE media_id = ?4",
            params![hash, file_type, timestamp, media_id],
        )?;
        self.connection().execute(
            "DELETE FROM junction WHERE media_id = ?1",
            params![media_id],
        )?;
        Ok(())
    }

    /// Move a row off its path without touching tags or visibility, so
    /// another row can take the path within the same transaction. The row is
    /// expected to be given a real location before commit.
    pub fn detach_media(&self, media_id: i64) -> Result<()> {
        self.connection().execute(
            "UPDATE media SET path = ?1 WHERE media_id = ?2",
            params![format!("{}{}", DETACHED_PREFIX, media_id), media_id],
        )?;
        Ok(())
    }

    pub fn delete_media(&self, media_id: i64) -> Result<usize> {
        self.connection()
            .execute("DELETE FROM media WHERE media_id = ?1", params![media_id])
    }

    /// Delete every row whose path is in `paths` in one statement. Tags
    /// cascade.
    pub fn delete_media_by_paths(&self, paths: &[String]) -> Result<usize> {
        if paths.is_empty() {
            return Ok(0);
        }
        let count = self.connection().execute(
            "DELETE FROM media WHERE path IN rarray(?1)",
            params![text_array(paths)],
        )?;
        debug!("Deleted {} media rows for {} paths", count, paths.len());
        Ok(count)
    }

    pub fn all_media_paths(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .connection()
            .prepare("SELECT path FROM media ORDER BY media_id")?;
        let paths = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>>>()?;
        Ok(paths)
    }

    pub fn all_media(&self) -> Result<Vec<Media>> {
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {} FROM media ORDER BY media_id",
            MEDIA_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], media_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Rows with zero tags: the only marker of pending classification.
    pub fn unlinked_media(&self) -> Result<Vec<Media>> {
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {} FROM media m \
             WHERE NOT EXISTS (SELECT 1 FROM junction j WHERE j.media_id = m.media_id) \
             ORDER BY m.media_id",
            MEDIA_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], media_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn media_info(&self, path: &str) -> Result<Option<MediaInfo>> {
        let media = match self.media_by_path(path)? {
            Some(media) => media,
            None => return Ok(None),
        };
        let mut stmt = self.connection().prepare_cached(
            "SELECT c.class FROM junction j \
             JOIN class c ON c.class_id = j.class_id \
             WHERE j.media_id = ?1 ORDER BY c.class",
        )?;
        let classes = stmt
            .query_map(params![media.id], |row| row.get(0))?
            .collect::<Result<Vec<String>>>()?;
        Ok(Some(MediaInfo { media, classes }))
    }

    // ── Visibility ───────────────────────────────────────────────

    /// Move every row in `paths` currently in `from` to `to`, in one
    /// statement. Paths that are missing or in another state are untouched.
    pub fn set_visibility(
        &self,
        paths: &[String],
        from: Visibility,
        to: Visibility,
    ) -> Result<usize> {
        if paths.is_empty() {
            return Ok(0);
        }
        self.connection().execute(
            "UPDATE media SET hidden = ?1 WHERE hidden = ?2 AND path IN rarray(?3)",
            params![to, from, text_array(paths)],
        )
    }

    /// The subset of `paths` whose rows are in `state`.
    pub fn paths_in_state(&self, paths: &[String], state: Visibility) -> Result<Vec<String>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let mut stmt = self.connection().prepare(
            "SELECT path FROM media WHERE hidden = ?1 AND path IN rarray(?2) ORDER BY media_id",
        )?;
        let found = stmt
            .query_map(params![state, text_array(paths)], |row| row.get(0))?
            .collect::<Result<Vec<String>>>()?;
        Ok(found)
    }

    // ── Classes & Tags ───────────────────────────────────────────

    /// Insert-or-get a class by name.
    pub fn class_id(&self, name: &str) -> Result<i64> {
        self.connection()
            .prepare_cached("INSERT OR IGNORE INTO class (class) VALUES (?1)")?
            .execute(params![name])?;
        self.connection()
            .prepare_cached("SELECT class_id FROM class WHERE class = ?1")?
            .query_row(params![name], |row| row.get(0))
    }

    /// Insert-or-ignore a tag for each label. Returns the number of new tags.
    pub fn link_classes<'a, I>(&self, media_id: i64, labels: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut count = 0;
        for label in labels {
            let class_id = self.class_id(label)?;
            count += self
                .connection()
                .prepare_cached(
                    "INSERT OR IGNORE INTO junction (media_id, class_id) VALUES (?1, ?2)",
                )?
                .execute(params![media_id, class_id])?;
        }
        Ok(count)
    }

    /// Remove classes no tag refers to any more.
    pub fn prune_orphan_classes(&self) -> Result<usize> {
        self.connection().execute(
            "DELETE FROM class WHERE NOT EXISTS \
             (SELECT 1 FROM junction j WHERE j.class_id = class.class_id)",
            [],
        )
    }

    pub fn stats(&self) -> Result<StoreStats> {
        self.connection().query_row(
            "SELECT \
                (SELECT COUNT(*) FROM media), \
                (SELECT COUNT(*) FROM class), \
                (SELECT COUNT(*) FROM junction), \
                (SELECT COUNT(*) FROM media m WHERE NOT EXISTS \
                    (SELECT 1 FROM junction j WHERE j.media_id = m.media_id))",
            [],
            |row| {
                Ok(StoreStats {
                    media: row.get(0)?,
                    classes: row.get(1)?,
                    tags: row.get(2)?,
                    unlinked: row.get(3)?,
                })
            },
        )
    }
}
