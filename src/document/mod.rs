//! The persisted workflow document: its serde model, source references and I/O helpers.

use crate::error::DocumentError;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub mod definition;
pub mod reference;

pub use definition::{ConnectorDocument, StepDocument, WorkflowDocument};
pub use reference::SourceRef;

/// Reads and decodes a workflow document from a file.
pub fn read_path(path: &Path) -> Result<WorkflowDocument, DocumentError> {
    let locator = path.display().to_string();
    let file = File::open(path).map_err(|source| DocumentError::Io {
        locator: locator.clone(),
        source,
    })?;
    read_from(BufReader::new(file), &locator)
}

/// Decodes a workflow document from an open stream; `locator` names it in errors.
pub fn read_from<R: Read>(reader: R, locator: &str) -> Result<WorkflowDocument, DocumentError> {
    serde_json::from_reader(reader).map_err(|source| DocumentError::Json {
        locator: locator.to_string(),
        source,
    })
}

/// Encodes a workflow document as pretty-printed JSON into a file.
pub fn write_path(document: &WorkflowDocument, path: &Path) -> Result<(), DocumentError> {
    let locator = path.display().to_string();
    let file = File::create(path).map_err(|source| DocumentError::Io {
        locator: locator.clone(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, document).map_err(|source| DocumentError::Json {
        locator: locator.clone(),
        source,
    })?;
    writer
        .flush()
        .map_err(|source| DocumentError::Io { locator, source })
}

/// Resolves a nested document locator against the directory of the including document.
///
/// Absolute locators and documents without a known directory are returned unchanged.
pub fn resolve_locator(base_dir: Option<&Path>, locator: &str) -> PathBuf {
    let path = Path::new(locator);
    match base_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}
