use std::io::{Cursor, Write};

use bytes::Bytes;
use chrono::NaiveDate;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::PhotoError;

/// One file to place in a zip archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Bytes,
}

/// Build a zip archive from `entries`.
///
/// Photos are already compressed, so entries are stored rather than
/// deflated. Entry names must be unique; callers de-duplicate.
pub fn build_zip(entries: &[ArchiveEntry]) -> Result<Bytes, PhotoError> {
    let capacity = entries.iter().map(|e| e.data.len() + 128).sum::<usize>() + 64;
    let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(capacity)));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .large_file(capacity > u32::MAX as usize);

    for entry in entries {
        writer
            .start_file(entry.name.as_str(), options)
            .map_err(|e| PhotoError::Archive(e.to_string()))?;
        writer
            .write_all(&entry.data)
            .map_err(|e| PhotoError::Archive(e.to_string()))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| PhotoError::Archive(e.to_string()))?;
    Ok(Bytes::from(cursor.into_inner()))
}

/// Download file name such as `selection_2025-12-20.zip`.
pub fn archive_name(prefix: &str, date: NaiveDate) -> String {
    format!("{}_{}.zip", prefix, date.format("%Y-%m-%d"))
}
