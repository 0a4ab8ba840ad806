//! Central directory iteration, name lookup, and extraction.

use crate::archive::Archive;
use crate::attr::{self, EntryType};
use crate::codec::{CentralDirectoryRecord, CENTRAL_DIRECTORY_RECORD_FIXED_SIZE};
use crate::compress::{self, CompressionLevel};
use crate::entry::Entry;
use crate::error::{Result, ZipCoreError};
use crate::progress::Progress;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// One central directory record that was skipped during iteration
/// because it used ZIP64 extensions or traditional encryption, surfaced
/// by [`Archive::iter_with_diagnostics`] rather than silently dropped.
#[derive(Debug, Clone)]
pub struct SkippedEntry {
    pub file_name: Vec<u8>,
    pub reason: &'static str,
}

impl Archive {
    /// Reads every central directory record and assembles it into an
    /// [`Entry`]. Records flagged `is_unsupported` (ZIP64 or encrypted)
    /// are silently excluded; use [`Archive::iter_with_diagnostics`] to
    /// see what was dropped and why.
    pub fn entries(&mut self) -> Result<Vec<Entry>> {
        Ok(self
            .read_all_central_directory_records()?
            .into_iter()
            .filter(|record| !record.is_unsupported())
            .map(Self::record_to_entry)
            .collect())
    }

    /// Like [`Archive::entries`], but also returns the records that were
    /// excluded and why.
    pub fn iter_with_diagnostics(&mut self) -> Result<(Vec<Entry>, Vec<SkippedEntry>)> {
        let records = self.read_all_central_directory_records()?;
        let mut entries = Vec::new();
        let mut skipped = Vec::new();
        for record in records {
            if record.is_unsupported() {
                let reason = if record.version_needed_to_extract >= 45 {
                    "zip64 extension"
                } else {
                    "traditional encryption"
                };
                log::warn!(
                    "skipping entry {:?}: {reason}",
                    String::from_utf8_lossy(&record.file_name)
                );
                skipped.push(SkippedEntry {
                    file_name: record.file_name.clone(),
                    reason,
                });
            } else {
                entries.push(Self::record_to_entry(record));
            }
        }
        Ok((entries, skipped))
    }

    /// First-hit-wins linear lookup by path.
    pub fn lookup(&mut self, path: &str) -> Result<Option<Entry>> {
        Ok(self.entries()?.into_iter().find(|entry| entry.path() == path))
    }

    /// Decompresses `entry`'s payload into `sink`, checking the
    /// compression method is one this crate supports. Returns the CRC32
    /// of the reconstructed content.
    pub fn extract(&mut self, entry: &Entry, sink: &mut impl Write, progress: &Progress) -> Result<u32> {
        progress.set_total_unit_count(entry.uncompressed_size() as i64);
        let level = entry.compression_level()?;
        let local = self.read_local_header(entry)?;
        self.file
            .seek(SeekFrom::Start(entry.relative_offset_of_local_header() + local.total_size()))?;
        let crc = compress::read_stream(
            level,
            &mut self.file,
            entry.compressed_size(),
            sink,
            crate::compress::DEFAULT_BUFFER_SIZE,
            progress,
        )?;
        if crc != entry.crc32() {
            return Err(ZipCoreError::invalid_format(format!(
                "crc32 mismatch extracting {}: expected 0x{:08x}, got 0x{crc:08x}",
                entry.path(),
                entry.crc32()
            )));
        }
        Ok(crc)
    }

    /// Materializes `entry` under `destination_root`, creating parent
    /// directories as needed and applying its decoded permissions on
    /// Unix. Rejects entries whose path would escape `destination_root`.
    /// Returns the CRC32 of the extracted content (`0` for directories,
    /// which carry no payload).
    pub fn extract_to_path(
        &mut self,
        entry: &Entry,
        destination_root: &Path,
        progress: &Progress,
    ) -> Result<u32> {
        let target = Self::resolve_target(destination_root, entry.path())?;

        let planned_total = match entry.entry_type() {
            EntryType::Directory => 1,
            EntryType::File | EntryType::Symlink => entry.uncompressed_size() as i64,
        };
        progress.set_total_unit_count(planned_total);

        match entry.entry_type() {
            EntryType::Directory => {
                fs::create_dir_all(&target)?;
                Ok(0)
            }
            EntryType::File => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut out = File::create(&target)?;
                let crc = self.extract(entry, &mut out, progress)?;
                out.flush()?;
                Self::apply_permissions(&target, entry.permissions());
                Ok(crc)
            }
            EntryType::Symlink => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut link_target = Vec::new();
                let crc = self.extract(entry, &mut link_target, progress)?;
                let link_target = String::from_utf8(link_target)
                    .map_err(|_| ZipCoreError::invalid_format("symlink target is not valid utf-8"))?;
                Self::create_symlink(&link_target, &target)?;
                Ok(crc)
            }
        }
    }

    #[cfg(unix)]
    fn apply_permissions(path: &Path, permissions: u32) {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(permissions));
    }

    #[cfg(not(unix))]
    fn apply_permissions(_path: &Path, _permissions: u32) {}

    #[cfg(unix)]
    fn create_symlink(target: &str, link: &Path) -> Result<()> {
        std::os::unix::fs::symlink(target, link)?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn create_symlink(target: &str, link: &Path) -> Result<()> {
        fs::write(link, target)?;
        Ok(())
    }

    fn resolve_target(root: &Path, path: &str) -> Result<std::path::PathBuf> {
        let mut target = root.to_path_buf();
        for component in Path::new(path).components() {
            use std::path::Component;
            match component {
                Component::Normal(part) => target.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(ZipCoreError::invalid_format(format!(
                        "entry path escapes destination: {path}"
                    )));
                }
            }
        }
        Ok(target)
    }

    fn record_to_entry(record: CentralDirectoryRecord) -> Entry {
        let path = attr::decode_filename(&record.file_name, record.general_purpose_bit_flag);
        let data_descriptor_size = if record.general_purpose_bit_flag & crate::codec::FLAG_DATA_DESCRIPTOR != 0 {
            12
        } else {
            0
        };
        Entry {
            path,
            central_directory: record,
            data_descriptor_size,
        }
    }

    fn read_local_header(&mut self, entry: &Entry) -> Result<crate::codec::LocalFileHeaderRecord> {
        self.file
            .seek(SeekFrom::Start(entry.relative_offset_of_local_header()))?;
        let mut fixed = [0u8; crate::codec::LOCAL_FILE_HEADER_FIXED_SIZE];
        self.file.read_exact(&mut fixed)?;
        let file_name_length = u16::from_le_bytes([fixed[26], fixed[27]]) as usize;
        let extra_field_length = u16::from_le_bytes([fixed[28], fixed[29]]) as usize;
        let mut tail = vec![0u8; file_name_length + extra_field_length];
        self.file.read_exact(&mut tail)?;
        crate::codec::LocalFileHeaderRecord::decode(&fixed, &tail)
    }

    /// Seeks to the central directory and decodes every record in
    /// sequence, validating the signature of each.
    pub(crate) fn read_all_central_directory_records(&mut self) -> Result<Vec<CentralDirectoryRecord>> {
        self.file
            .seek(SeekFrom::Start(self.eocd.offset_to_start_of_central_directory as u64))?;
        let mut records = Vec::with_capacity(self.eocd.total_number_of_entries_in_central_directory as usize);
        for _ in 0..self.eocd.total_number_of_entries_in_central_directory {
            let mut fixed = [0u8; CENTRAL_DIRECTORY_RECORD_FIXED_SIZE];
            self.file.read_exact(&mut fixed)?;
            let file_name_length = u16::from_le_bytes([fixed[28], fixed[29]]) as usize;
            let extra_field_length = u16::from_le_bytes([fixed[30], fixed[31]]) as usize;
            let file_comment_length = u16::from_le_bytes([fixed[32], fixed[33]]) as usize;
            let mut tail = vec![0u8; file_name_length + extra_field_length + file_comment_length];
            self.file.read_exact(&mut tail)?;
            records.push(CentralDirectoryRecord::decode(&fixed, &tail)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveMode;
    use crate::attr::EntryType;
    use crate::entry::AddEntrySpec;
    use tempfile::tempdir;

    #[test]
    fn lookup_and_extract_round_trip_utf8_store_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.zip");
        let mut archive = Archive::open(&path, ArchiveMode::Create).unwrap();
        let spec = AddEntrySpec::new("héllo.txt", EntryType::File)
            .with_level(CompressionLevel::Store)
            .with_uncompressed_size(10);
        archive
            .add_entry(&spec, &mut &b"1234567890"[..], &Progress::new(0))
            .unwrap();
        drop(archive);

        let mut archive = Archive::open(&path, ArchiveMode::Read).unwrap();
        let entry = archive.lookup("héllo.txt").unwrap().unwrap();
        assert_eq!(entry.crc32(), 0x261D_AEE5);
        let mut out = Vec::new();
        let progress = Progress::new(0);
        let crc = archive.extract(&entry, &mut out, &progress).unwrap();
        assert_eq!(crc, 0x261D_AEE5);
        assert_eq!(out, b"1234567890");
        assert_eq!(progress.total_unit_count(), 10);
    }
}
