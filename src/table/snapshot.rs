use std::fs;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::model::DatasetRow;

use super::{DatasetError, Result};

pub const SNAPSHOT_FORMAT: &str = "cellsheet-dataset";
pub const SNAPSHOT_VERSION: u32 = 1;
pub const DEFAULT_SNAPSHOT_NAME: &str = "dataset.json";

/// Declared column order of every snapshot.
pub const COLUMNS: [&str; 7] = [
    "Filename",
    "Directory",
    "Group",
    "Group_ID",
    "Threshold",
    "Fraction",
    "Mean Value",
];

#[derive(Debug, Deserialize)]
struct SnapshotHeader {
    format: String,
    version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDocument {
    format: String,
    version: u32,
    columns: Vec<String>,
    rows: Vec<DatasetRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Json,
    Yaml,
}

impl Encoding {
    fn for_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if matches!(extension.as_str(), "yaml" | "yml") {
            Self::Yaml
        } else {
            Self::Json
        }
    }

    fn parse<T: DeserializeOwned>(self, raw: &str) -> std::result::Result<T, String> {
        match self {
            Self::Json => serde_json::from_str(raw).map_err(|error| error.to_string()),
            Self::Yaml => serde_yaml::from_str(raw).map_err(|error| error.to_string()),
        }
    }
}

pub(super) fn read_snapshot(path: &Path) -> Result<Vec<DatasetRow>> {
    let raw = fs::read_to_string(path)?;
    let encoding = Encoding::for_path(path);
    let corrupt = |reason: String| DatasetError::CorruptFile {
        path: path.to_path_buf(),
        reason,
    };

    let header = encoding.parse::<SnapshotHeader>(&raw).map_err(corrupt)?;
    if header.format != SNAPSHOT_FORMAT {
        return Err(corrupt(format!("unknown format tag `{}`", header.format)));
    }
    if header.version != SNAPSHOT_VERSION {
        return Err(DatasetError::VersionMismatch {
            path: path.to_path_buf(),
            found: header.version,
            expected: SNAPSHOT_VERSION,
        });
    }

    let document = encoding.parse::<SnapshotDocument>(&raw).map_err(corrupt)?;
    if document.columns.iter().map(String::as_str).ne(COLUMNS) {
        return Err(corrupt(format!("unexpected columns {:?}", document.columns)));
    }
    Ok(document.rows)
}

/// Writes next to `path` and renames over it, so readers never see a partial file.
pub(super) fn write_snapshot(path: &Path, rows: &[DatasetRow]) -> Result<()> {
    let document = SnapshotDocument {
        format: SNAPSHOT_FORMAT.to_string(),
        version: SNAPSHOT_VERSION,
        columns: COLUMNS.iter().map(|column| column.to_string()).collect(),
        rows: rows.to_vec(),
    };
    let serialized = match Encoding::for_path(path) {
        Encoding::Yaml => serde_yaml::to_string(&document).map_err(|error| error.to_string()),
        Encoding::Json => {
            serde_json::to_string_pretty(&document).map_err(|error| error.to_string())
        }
    }
    .map_err(DatasetError::Encode)?;

    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(directory)?;
    temp.write_all(serialized.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|error| error.error)?;
    Ok(())
}
