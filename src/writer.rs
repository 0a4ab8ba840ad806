//! Entry Writer: the add-entry protocol.
//!
//! Each call appends one entry via a provisional-then-true local header
//! (the historical two-pass technique: write a zeroed header, stream the
//! payload, rewind and rewrite the header with the true CRC/sizes),
//! followed by the entry's central directory record and a rewritten
//! EOCD. Generalizes the teacher's `StreamingZipWriter::finish_current_entry`
//! bookkeeping to both compression methods and to random-access rewrite
//! rather than a trailing data descriptor.

use crate::archive::Archive;
use crate::attr;
use crate::codec::{CentralDirectoryRecord, LocalFileHeaderRecord, CENTRAL_DIRECTORY_SIGNATURE};
use crate::compress::{self, Provider};
use crate::entry::{AddEntrySpec, Entry};
use crate::error::{Result, ZipCoreError};
use crate::progress::Progress;
use std::io::{Read, Seek, SeekFrom, Write};

/// Version needed to extract for entries this crate writes: no ZIP64,
/// no encryption, just `store`/`deflate`.
pub const VERSION_NEEDED_TO_EXTRACT: u16 = 20;
/// Creator OS byte this crate stamps into `versionMadeBy`'s upper half.
pub const CREATOR_UNIX: u8 = attr::CREATOR_UNIX;

impl Archive {
    /// Appends one entry, streaming its payload from `reader`.
    ///
    /// Steps (spec component "Entry Writer"):
    /// 1. Snapshot the current EOCD and central directory bytes.
    /// 2. Write a provisional (zeroed) local header.
    /// 3. Stream the payload, compressing per `spec.level`.
    /// 4. Rewind and rewrite the local header with the true CRC/sizes.
    /// 5. Re-append the preserved central directory.
    /// 6. Append this entry's new central directory record.
    /// 7. Write the updated EOCD.
    /// 8. Flush.
    ///
    /// On cancellation, truncates back to the snapshot and re-raises so
    /// the archive is left exactly as it was before the call.
    pub fn add_entry(
        &mut self,
        spec: &AddEntrySpec,
        reader: &mut impl Read,
        progress: &Progress,
    ) -> Result<Entry> {
        self.check_mutable()?;

        let planned_total = match spec.entry_type {
            crate::attr::EntryType::Directory => 1,
            crate::attr::EntryType::File | crate::attr::EntryType::Symlink => {
                spec.uncompressed_size as i64
            }
        };
        progress.set_total_unit_count(planned_total);

        let snapshot_central_directory_offset = self.eocd.offset_to_start_of_central_directory as u64;
        let snapshot_central_directory_size = self.eocd.size_of_central_directory as u64;
        let mut preserved_central_directory = vec![0u8; snapshot_central_directory_size as usize];
        if snapshot_central_directory_size > 0 {
            self.file
                .seek(SeekFrom::Start(snapshot_central_directory_offset))?;
            self.file.read_exact(&mut preserved_central_directory)?;
        }

        let result = self.add_entry_inner(
            spec,
            reader,
            progress,
            snapshot_central_directory_offset,
            &preserved_central_directory,
        );

        if result.is_err() {
            // Roll back: the provisional header/payload write clobbered the
            // on-disk central directory bytes at `snapshot_central_directory_offset`
            // (that's where the new entry's local header landed), so restore
            // them from the in-memory snapshot before truncating and
            // rewriting the EOCD exactly as it was.
            let _ = self.file.set_len(snapshot_central_directory_offset);
            if snapshot_central_directory_size > 0 {
                let _ = self.file.seek(SeekFrom::Start(snapshot_central_directory_offset));
                let _ = self.file.write_all(&preserved_central_directory);
            }
            self.eocd.offset_to_start_of_central_directory = snapshot_central_directory_offset as u32;
            self.eocd.size_of_central_directory = snapshot_central_directory_size as u32;
            let _ = self.write_eocd();
        }

        result
    }

    fn add_entry_inner(
        &mut self,
        spec: &AddEntrySpec,
        reader: &mut impl Read,
        progress: &Progress,
        central_directory_offset: u64,
        preserved_central_directory: &[u8],
    ) -> Result<Entry> {
        let local_header_offset = central_directory_offset;
        let permissions = spec.resolved_permissions();
        let (dos_time, dos_date) = attr::encode_dos_date_time(spec.modified);

        let mut file_name = spec.path.clone().into_bytes();
        if matches!(spec.entry_type, crate::attr::EntryType::Directory) && !spec.path.ends_with('/') {
            file_name.push(b'/');
        }

        let provisional = LocalFileHeaderRecord {
            version_needed_to_extract: VERSION_NEEDED_TO_EXTRACT,
            general_purpose_bit_flag: crate::codec::FLAG_UTF8_FILENAME,
            compression_method: spec.level.raw_value(),
            last_mod_file_time: dos_time,
            last_mod_file_date: dos_date,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            file_name: file_name.clone(),
            extra_field: Vec::new(),
        };

        self.file.seek(SeekFrom::Start(local_header_offset))?;
        self.file.write_all(&provisional.encode())?;

        let payload_offset = self.file.stream_position()?;
        let mut provider: Box<Provider> = Box::new(|buf: &mut [u8]| reader.read(buf));
        let stream_result = compress::write_stream(
            spec.level,
            &mut *provider,
            &mut self.file,
            spec.buffer_size,
            progress,
        )?;

        if stream_result.compressed_size > u32::MAX as u64
            || stream_result.uncompressed_size > u32::MAX as u64
        {
            return Err(ZipCoreError::invalid_start_of_central_directory_offset(
                payload_offset + stream_result.compressed_size,
            ));
        }

        let payload_end = self.file.stream_position()?;

        let true_header = LocalFileHeaderRecord {
            crc32: stream_result.crc32,
            compressed_size: stream_result.compressed_size as u32,
            uncompressed_size: stream_result.uncompressed_size as u32,
            ..provisional
        };
        self.file.seek(SeekFrom::Start(local_header_offset))?;
        self.file.write_all(&true_header.encode())?;
        self.file.seek(SeekFrom::Start(payload_end))?;

        let new_central_directory_offset = payload_end;
        if new_central_directory_offset > u32::MAX as u64 {
            return Err(ZipCoreError::invalid_start_of_central_directory_offset(
                new_central_directory_offset,
            ));
        }

        self.file.write_all(preserved_central_directory)?;

        let external_attributes = attr::encode_external_attributes(spec.entry_type, permissions);
        let record = CentralDirectoryRecord {
            version_made_by: ((CREATOR_UNIX as u16) << 8) | VERSION_NEEDED_TO_EXTRACT,
            version_needed_to_extract: VERSION_NEEDED_TO_EXTRACT,
            general_purpose_bit_flag: crate::codec::FLAG_UTF8_FILENAME,
            compression_method: spec.level.raw_value(),
            last_mod_file_time: dos_time,
            last_mod_file_date: dos_date,
            crc32: stream_result.crc32,
            compressed_size: stream_result.compressed_size as u32,
            uncompressed_size: stream_result.uncompressed_size as u32,
            disk_number_start: 0,
            internal_file_attributes: 0,
            external_file_attributes: external_attributes,
            relative_offset_of_local_header: local_header_offset as u32,
            file_name: file_name.clone(),
            extra_field: Vec::new(),
            file_comment: Vec::new(),
        };
        let record_signature_check = record.encode();
        debug_assert_eq!(
            u32::from_le_bytes(record_signature_check[0..4].try_into().unwrap()),
            CENTRAL_DIRECTORY_SIGNATURE
        );
        self.file.write_all(&record_signature_check)?;

        let new_central_directory_size =
            preserved_central_directory.len() as u64 + record.total_size();

        self.eocd.offset_to_start_of_central_directory = new_central_directory_offset as u32;
        self.eocd.size_of_central_directory = new_central_directory_size as u32;
        self.eocd.entries_on_this_disk += 1;
        self.eocd.total_number_of_entries_in_central_directory += 1;
        self.write_eocd()?;
        self.file.flush()?;

        log::debug!(
            "wrote entry {:?}: {} -> {} bytes",
            spec.path,
            stream_result.uncompressed_size,
            stream_result.compressed_size
        );

        Ok(Entry {
            path: spec.path.clone(),
            central_directory: record,
            data_descriptor_size: 0,
        })
    }
}
