//! Zip archive I/O for session blobs.
//!
//! The store never interprets archive contents beyond entry paths: it reads
//! entries, drops junk, and writes the survivors back into a fresh archive.
//! Packing and unpacking a profile directory is the lifecycle's side of the
//! same format.

use super::junk::{self, JunkPattern};
use crate::error::SessionStoreError;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// One `(path, content)` pair inside a session archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub data: Vec<u8>,
    pub is_dir: bool,
}

impl ArchiveEntry {
    pub fn file(path: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data,
            is_dir: false,
        }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.ends_with('/') {
            path.push('/');
        }
        Self {
            path,
            data: Vec::new(),
            is_dir: true,
        }
    }
}

/// Result of stripping junk from an archive.
#[derive(Debug)]
pub struct FilteredArchive {
    pub bytes: Vec<u8>,
    pub kept: usize,
    pub dropped: usize,
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated)
}

/// Upper bound on the buffer reserved from an entry's declared size.
const MAX_PREALLOC_BYTES: usize = 64 * 1024 * 1024;

/// Header sizes are untrusted; `read_to_end` grows past the cap when needed.
fn prealloc_len(declared: u64) -> usize {
    usize::try_from(declared).map_or(MAX_PREALLOC_BYTES, |len| len.min(MAX_PREALLOC_BYTES))
}

/// Read every entry of an in-memory zip archive, in archive order.
pub fn read_entries(bytes: &[u8]) -> zip::result::ZipResult<Vec<ArchiveEntry>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let path = file.name().to_string();
        if file.is_dir() {
            entries.push(ArchiveEntry::dir(path));
            continue;
        }
        let mut data = Vec::with_capacity(prealloc_len(file.size()));
        file.read_to_end(&mut data)?;
        entries.push(ArchiveEntry::file(path, data));
    }

    Ok(entries)
}

/// Write entries into a new zip archive held in memory.
pub fn write_entries(entries: &[ArchiveEntry]) -> zip::result::ZipResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = entry_options();

    for entry in entries {
        if entry.is_dir {
            zip.add_directory(entry.path.as_str(), options)?;
        } else {
            zip.start_file(entry.path.as_str(), options)?;
            zip.write_all(&entry.data)?;
        }
    }

    Ok(zip.finish()?.into_inner())
}

/// Load the archive at `path`, drop junk entries and repack the rest.
pub fn repack_without_junk(
    path: &Path,
    patterns: &[JunkPattern],
) -> Result<FilteredArchive, SessionStoreError> {
    let original = fs::read(path).map_err(|e| SessionStoreError::serialization(path, e))?;
    let entries = read_entries(&original).map_err(|e| SessionStoreError::serialization(path, e))?;
    let total = entries.len();

    let kept = junk::filter(entries, patterns);
    let bytes = write_entries(&kept).map_err(|e| SessionStoreError::serialization(path, e))?;

    Ok(FilteredArchive {
        bytes,
        kept: kept.len(),
        dropped: total - kept.len(),
    })
}

/// Pack a directory tree into a zip archive; entry paths are relative to
/// `root` and always use forward slashes.
pub fn pack_directory(root: &Path) -> Result<Vec<u8>, SessionStoreError> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| SessionStoreError::serialization(root, e))?;
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| SessionStoreError::serialization(entry.path(), e))?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            entries.push(ArchiveEntry::dir(name));
        } else if entry.file_type().is_file() {
            let data =
                fs::read(entry.path()).map_err(|e| SessionStoreError::serialization(entry.path(), e))?;
            entries.push(ArchiveEntry::file(name, data));
        }
    }

    write_entries(&entries).map_err(|e| SessionStoreError::serialization(root, e))
}

/// Unpack a zip archive into `dest`, refusing entries that would land
/// outside of it.
pub fn unpack_into(bytes: &[u8], dest: &Path) -> Result<usize, SessionStoreError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| SessionStoreError::serialization(dest, e))?;
    fs::create_dir_all(dest).map_err(|e| SessionStoreError::serialization(dest, e))?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| SessionStoreError::serialization(dest, e))?;
        let Some(relative) = file.enclosed_name() else {
            return Err(SessionStoreError::serialization(
                dest,
                format!("entry escapes destination: {}", file.name()),
            ));
        };
        let target: PathBuf = dest.join(relative);

        if file.is_dir() {
            fs::create_dir_all(&target).map_err(|e| SessionStoreError::serialization(&target, e))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| SessionStoreError::serialization(parent, e))?;
        }
        let mut out =
            fs::File::create(&target).map_err(|e| SessionStoreError::serialization(&target, e))?;
        std::io::copy(&mut file, &mut out)
            .map_err(|e| SessionStoreError::serialization(&target, e))?;
        written += 1;
    }

    Ok(written)
}
