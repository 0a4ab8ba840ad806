//! The `Archive` handle: bound to one backing file and one access mode,
//! holding the current EOCD in memory and a buffered random-access file
//! handle. This is the shared state [`crate::reader`], [`crate::writer`],
//! and [`crate::remove`] operate on.

use crate::codec::{EndOfCentralDirectoryRecord, END_OF_CENTRAL_DIRECTORY_FIXED_SIZE, END_OF_CENTRAL_DIRECTORY_SIGNATURE};
use crate::error::{Result, ZipCoreError};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// EOCD is at least 22 bytes; the scan window accommodates the maximum
/// 65535-byte comment plus the fixed record size.
pub const EOCD_SEARCH_WINDOW: u64 = 66_000;

/// Access mode an [`Archive`] was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveMode {
    /// The file must not pre-exist; it's initialized with an empty EOCD.
    Create,
    /// The file must exist; only reads are permitted.
    Read,
    /// The file must exist; reads and mutations are permitted.
    Update,
}

/// A handle bound to one backing ZIP file and one access mode.
pub struct Archive {
    pub(crate) file: File,
    pub(crate) path: PathBuf,
    pub(crate) mode: ArchiveMode,
    pub(crate) eocd: EndOfCentralDirectoryRecord,
}

impl Archive {
    /// Opens `path` under `mode`. On `Create`, the path must not
    /// pre-exist; on `Read`/`Update`, it must exist and be accessible.
    pub fn open(path: impl AsRef<Path>, mode: ArchiveMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        match mode {
            ArchiveMode::Create => Self::create(path),
            ArchiveMode::Read => Self::open_existing(path, mode),
            ArchiveMode::Update => Self::open_existing(path, mode),
        }
    }

    fn create(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    ZipCoreError::new(crate::error::ErrorKind::FileNotAccessible, e.to_string())
                        .with_context("path", path.display())
                } else {
                    ZipCoreError::from(e).with_context("path", path.display())
                }
            })?;
        let mut archive = Self {
            file,
            path,
            mode: ArchiveMode::Create,
            eocd: EndOfCentralDirectoryRecord::empty(),
        };
        archive.write_eocd()?;
        Ok(archive)
    }

    fn open_existing(path: PathBuf, mode: ArchiveMode) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(matches!(mode, ArchiveMode::Update))
            .open(&path)
            .map_err(|e| ZipCoreError::from(e).with_context("path", path.display()))?;
        let mut archive = Self {
            file,
            path,
            mode,
            eocd: EndOfCentralDirectoryRecord::empty(),
        };
        archive.eocd = archive.locate_and_decode_eocd()?;
        Ok(archive)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> ArchiveMode {
        self.mode
    }

    pub fn entry_count(&self) -> usize {
        self.eocd.total_number_of_entries_in_central_directory as usize
    }

    pub fn eocd(&self) -> &EndOfCentralDirectoryRecord {
        &self.eocd
    }

    fn require_not_read_only(&self) -> Result<()> {
        if matches!(self.mode, ArchiveMode::Read) {
            return Err(ZipCoreError::new(
                crate::error::ErrorKind::FileNotAccessible,
                "archive is open in read mode",
            ));
        }
        Ok(())
    }

    pub(crate) fn check_mutable(&self) -> Result<()> {
        self.require_not_read_only()
    }

    /// Finds the EOCD by scanning backward from `fileSize - 22` with a
    /// single tail read (rather than one byte at a time), searching at
    /// most [`EOCD_SEARCH_WINDOW`] bytes from the end.
    fn locate_and_decode_eocd(&mut self) -> Result<EndOfCentralDirectoryRecord> {
        let file_size = self.file.seek(SeekFrom::End(0))?;
        let window = EOCD_SEARCH_WINDOW.min(file_size);
        let search_start = file_size - window;
        self.file.seek(SeekFrom::Start(search_start))?;

        let mut buffer = vec![0u8; window as usize];
        self.file.read_exact(&mut buffer)?;

        let signature = END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes();
        let position = buffer
            .windows(4)
            .rposition(|w| w == signature)
            .ok_or_else(|| ZipCoreError::invalid_format("end of central directory record not found"))?;

        let fixed_end = position + END_OF_CENTRAL_DIRECTORY_FIXED_SIZE;
        if fixed_end > buffer.len() {
            return Err(ZipCoreError::invalid_format("eocd: truncated record"));
        }
        let fixed = &buffer[position..fixed_end];
        let comment = &buffer[fixed_end..];
        let eocd = EndOfCentralDirectoryRecord::decode(fixed, comment)?;
        log::trace!("{:?}", eocd);
        Ok(eocd)
    }

    /// Seeks to, and overwrites, the current EOCD record (its prior
    /// on-disk bytes, if any, are at `offset_to_start_of_central_directory
    /// + size_of_central_directory`, which is always the file's current
    /// logical end when this is called).
    pub(crate) fn write_eocd(&mut self) -> Result<()> {
        let offset = self.eocd.offset_to_start_of_central_directory as u64
            + self.eocd.size_of_central_directory as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&self.eocd.encode())?;
        self.file.set_len(offset + self.eocd.encode().len() as u64)?;
        self.file.flush()?;
        Ok(())
    }

    pub(crate) fn reopen_read_write(&mut self) -> Result<()> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| ZipCoreError::from(e).with_context("path", self.path.display()))?;
        self.file = file;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_initializes_empty_eocd() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.zip");
        let archive = Archive::open(&path, ArchiveMode::Create).unwrap();
        assert_eq!(archive.entry_count(), 0);
        assert!(path.exists());
    }

    #[test]
    fn create_on_existing_path_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.zip");
        Archive::open(&path, ArchiveMode::Create).unwrap();
        let err = Archive::open(&path, ArchiveMode::Create).unwrap_err();
        assert_eq!(*err.kind(), crate::error::ErrorKind::FileNotAccessible);
    }

    #[test]
    fn read_on_missing_path_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.zip");
        let err = Archive::open(&path, ArchiveMode::Read).unwrap_err();
        assert_eq!(*err.kind(), crate::error::ErrorKind::FileNotFound);
    }

    #[test]
    fn read_mode_refuses_mutation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.zip");
        Archive::open(&path, ArchiveMode::Create).unwrap();
        let archive = Archive::open(&path, ArchiveMode::Read).unwrap();
        assert!(archive.check_mutable().is_err());
    }
}
