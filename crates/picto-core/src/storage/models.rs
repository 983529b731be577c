use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Kind of indexed media, stored as `img` / `vid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileType {
    #[serde(rename = "img")]
    Image,
    #[serde(rename = "vid")]
    Video,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Image => "img",
            FileType::Video => "vid",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "img" | "image" => Ok(FileType::Image),
            "vid" | "video" => Ok(FileType::Video),
            other => Err(format!("unknown file type '{}'", other)),
        }
    }
}

impl ToSql for FileType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for FileType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

/// Visibility of a media row. Deletion is terminal and has no stored value.
///
/// Persisted in the `hidden` column: 0 active, 1 hidden, -1 trashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Active,
    Hidden,
    Trashed,
}

impl Visibility {
    pub fn code(&self) -> i64 {
        match self {
            Visibility::Active => 0,
            Visibility::Hidden => 1,
            Visibility::Trashed => -1,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Visibility::Active),
            1 => Some(Visibility::Hidden),
            -1 => Some(Visibility::Trashed),
            _ => None,
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Visibility::Active => "active",
            Visibility::Hidden => "hidden",
            Visibility::Trashed => "trashed",
        };
        f.write_str(name)
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Visibility::Active),
            "hidden" => Ok(Visibility::Hidden),
            "trashed" | "trash" => Ok(Visibility::Trashed),
            other => Err(format!("unknown visibility '{}'", other)),
        }
    }
}

impl ToSql for Visibility {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for Visibility {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_i64()?;
        Visibility::from_code(code).ok_or(FromSqlError::OutOfRange(code))
    }
}

/// A persisted media row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Media {
    pub id: i64,
    pub hash: String,
    pub path: String,
    pub directory: String,
    pub file_type: FileType,
    pub timestamp: i64,
    pub visibility: Visibility,
}

/// Values for a media row that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub hash: String,
    pub path: String,
    pub directory: String,
    pub file_type: FileType,
    pub timestamp: i64,
}

/// A media row together with the names of its classes.
#[derive(Debug, Clone, Serialize)]
pub struct MediaInfo {
    #[serde(flatten)]
    pub media: Media,
    pub classes: Vec<String>,
}

/// Row counts across the three tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub media: i64,
    pub classes: i64,
    pub tags: i64,
    pub unlinked: i64,
}
