//! The logical entry view callers see: an immutable record identified
//! by path, composed of the central directory's fields plus the
//! derived [`EntryType`].

use crate::attr::{self, EntryType};
use crate::codec::{CentralDirectoryRecord, LOCAL_FILE_HEADER_FIXED_SIZE};
use crate::compress::CompressionLevel;
use std::time::SystemTime;

/// An archive entry, as assembled from one central directory record.
///
/// Entries are value records: they embed copies of their on-disk bytes
/// and carry no reference back to the archive. They're only meaningful
/// with their originating archive present, since `relative_offset_of_local_header`
/// refers to that file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub(crate) path: String,
    pub(crate) central_directory: CentralDirectoryRecord,
    /// Length of the optional trailing data descriptor in the local
    /// region, `0` when bit 3 of the general purpose flag is unset.
    pub(crate) data_descriptor_size: u64,
}

impl Entry {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn entry_type(&self) -> EntryType {
        attr::entry_type(
            self.central_directory.version_made_by,
            self.central_directory.external_file_attributes,
            &self.path,
        )
    }

    pub fn crc32(&self) -> u32 {
        self.central_directory.crc32
    }

    pub fn compressed_size(&self) -> u64 {
        self.central_directory.compressed_size as u64
    }

    pub fn uncompressed_size(&self) -> u64 {
        self.central_directory.uncompressed_size as u64
    }

    pub fn compression_method_raw(&self) -> u16 {
        self.central_directory.compression_method
    }

    pub fn compression_level(&self) -> crate::error::Result<CompressionLevel> {
        CompressionLevel::from_raw_value(self.central_directory.compression_method)
    }

    pub fn permissions(&self) -> u32 {
        attr::decode_permissions(self.central_directory.external_file_attributes)
    }

    pub fn modified(&self) -> SystemTime {
        attr::decode_dos_date_time(
            self.central_directory.last_mod_file_time,
            self.central_directory.last_mod_file_date,
        )
    }

    pub fn relative_offset_of_local_header(&self) -> u64 {
        self.central_directory.relative_offset_of_local_header as u64
    }

    pub fn central_directory(&self) -> &CentralDirectoryRecord {
        &self.central_directory
    }

    /// Total byte length of this entry's local region: local header +
    /// filename + extra field + payload + optional data descriptor.
    /// This is what the Entry Remover copies verbatim for survivors.
    pub fn local_size(&self) -> u64 {
        LOCAL_FILE_HEADER_FIXED_SIZE as u64
            + self.central_directory.file_name.len() as u64
            + self.central_directory.extra_field.len() as u64
            + self.central_directory.compressed_size as u64
            + self.data_descriptor_size
    }

    /// Total byte length of this entry's central directory record.
    pub fn central_directory_size(&self) -> u64 {
        self.central_directory.total_size()
    }
}

/// Caller-supplied parameters for [`crate::archive::Archive::add_entry`].
pub struct AddEntrySpec {
    pub path: String,
    pub entry_type: EntryType,
    /// Caller-declared uncompressed size, used only to plan the
    /// [`crate::progress::Progress`] total before streaming starts — the
    /// true size written to the central directory comes from the stream
    /// itself, not this hint.
    pub uncompressed_size: u64,
    pub modified: SystemTime,
    pub permissions: Option<u32>,
    pub level: CompressionLevel,
    pub buffer_size: usize,
}

impl AddEntrySpec {
    pub fn new(path: impl Into<String>, entry_type: EntryType) -> Self {
        Self {
            path: path.into(),
            entry_type,
            uncompressed_size: 0,
            modified: SystemTime::now(),
            permissions: None,
            level: CompressionLevel::Store,
            buffer_size: crate::compress::DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn with_level(mut self, level: CompressionLevel) -> Self {
        self.level = level;
        self
    }

    /// Declares the expected uncompressed size, used to plan the
    /// progress total for files/symlinks (spec §4.6).
    pub fn with_uncompressed_size(mut self, uncompressed_size: u64) -> Self {
        self.uncompressed_size = uncompressed_size;
        self
    }

    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn with_modified(mut self, modified: SystemTime) -> Self {
        self.modified = modified;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub(crate) fn resolved_permissions(&self) -> u32 {
        self.permissions
            .unwrap_or_else(|| attr::default_permissions(self.entry_type))
    }
}
