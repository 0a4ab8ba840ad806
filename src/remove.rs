//! Entry Remover: copy-through rebuild.
//!
//! Rather than shifting bytes in place, every surviving entry's local
//! region is copied verbatim to a sibling temp file, the central
//! directory is rebuilt with adjusted offsets, and the temp file
//! atomically replaces the original.

use crate::archive::Archive;
use crate::codec::{CentralDirectoryRecord, EndOfCentralDirectoryRecord, LOCAL_FILE_HEADER_FIXED_SIZE};
use crate::error::{Result, ZipCoreError};
use crate::progress::Progress;
use std::io::{Read, Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

impl Archive {
    /// Removes the first entry whose decoded path equals `path`.
    /// Returns `Ok(false)` if no entry matched; the archive is left
    /// untouched in that case. On cancellation, the archive is left
    /// exactly as it was before the call.
    pub fn remove_entry(&mut self, path: &str, progress: &Progress) -> Result<bool> {
        self.check_mutable()?;

        let records = self.read_all_central_directory_records()?;
        if let Some(record) = records.iter().find(|r| r.is_unsupported()) {
            return Err(ZipCoreError::invalid_format(format!(
                "cannot rebuild archive: unsupported entry {:?} uses zip64 or encryption",
                String::from_utf8_lossy(&record.file_name)
            )));
        }

        let remove_index = records
            .iter()
            .position(|r| crate::attr::decode_filename(&r.file_name, r.general_purpose_bit_flag) == path);
        let Some(remove_index) = remove_index else {
            return Ok(false);
        };

        let removed_local_size = Self::local_region_size(&records[remove_index]);
        let planned_total = (self.eocd.offset_to_start_of_central_directory as u64)
            .saturating_sub(removed_local_size);
        progress.set_total_unit_count(planned_total as i64);

        let parent = self
            .path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| std::path::PathBuf::from("."));
        let mut temp = NamedTempFile::new_in(&parent)?;

        let mut surviving_records = Vec::with_capacity(records.len() - 1);
        for (index, record) in records.iter().enumerate() {
            progress.check_cancelled()?;
            if index == remove_index {
                continue;
            }
            let new_offset = temp.as_file().stream_position()?;
            self.copy_local_region(record, temp.as_file_mut())?;
            let mut adjusted = record.clone();
            adjusted.relative_offset_of_local_header = new_offset as u32;
            surviving_records.push(adjusted);
            progress.advance(1);
        }

        let central_directory_offset = temp.as_file().stream_position()?;
        for record in &surviving_records {
            temp.as_file_mut().write_all(&record.encode())?;
        }
        let central_directory_size = temp.as_file().stream_position()? - central_directory_offset;

        if central_directory_offset + central_directory_size > u32::MAX as u64 {
            return Err(ZipCoreError::invalid_start_of_central_directory_offset(
                central_directory_offset + central_directory_size,
            ));
        }

        let new_eocd = EndOfCentralDirectoryRecord {
            disk_number: 0,
            disk_with_central_directory: 0,
            entries_on_this_disk: surviving_records.len() as u16,
            total_number_of_entries_in_central_directory: surviving_records.len() as u16,
            size_of_central_directory: central_directory_size as u32,
            offset_to_start_of_central_directory: central_directory_offset as u32,
            comment: self.eocd.comment.clone(),
        };
        temp.as_file_mut().write_all(&new_eocd.encode())?;
        temp.as_file_mut().flush()?;

        let persisted_path = self.path.clone();
        temp.persist(&persisted_path)
            .map_err(|e| ZipCoreError::from(e.error))?;

        self.reopen_read_write()?;
        self.eocd = new_eocd;
        log::debug!("removed entry {:?}, {} entries remain", path, self.eocd.total_number_of_entries_in_central_directory);
        Ok(true)
    }

    /// Total byte length of `record`'s local region: header + filename +
    /// extra field + payload + optional data descriptor. This is both
    /// what the remover copies verbatim for survivors and the unit the
    /// spec's `startOfCentralDirectory − removedLocalSize` total uses.
    fn local_region_size(record: &CentralDirectoryRecord) -> u64 {
        let data_descriptor_size: u64 = if record.general_purpose_bit_flag & crate::codec::FLAG_DATA_DESCRIPTOR != 0 {
            crate::codec::DATA_DESCRIPTOR_FIXED_SIZE as u64 + 4
        } else {
            0
        };
        LOCAL_FILE_HEADER_FIXED_SIZE as u64
            + record.file_name.len() as u64
            + record.extra_field.len() as u64
            + record.compressed_size as u64
            + data_descriptor_size
    }

    /// Copies one entry's local region (header + filename + extra field
    /// + payload + optional data descriptor) verbatim to `sink`.
    fn copy_local_region(&mut self, record: &CentralDirectoryRecord, sink: &mut impl Write) -> Result<()> {
        let local_size = Self::local_region_size(record);

        self.file
            .seek(SeekFrom::Start(record.relative_offset_of_local_header as u64))?;
        let mut remaining = local_size;
        let mut buf = [0u8; 16 * 1024];
        while remaining > 0 {
            let chunk = remaining.min(buf.len() as u64) as usize;
            self.file.read_exact(&mut buf[..chunk])?;
            sink.write_all(&buf[..chunk])?;
            remaining -= chunk as u64;
        }
        Ok(())
    }
}
