//! Little-endian pack/unpack of the four fixed-size ZIP records and their
//! variable tails (filename, extra field, comment).
//!
//! Layouts follow the PKWARE APPNOTE, non-ZIP64 subset: a 30-byte local
//! file header, a 46-byte central directory record, a 22-byte end of
//! central directory record, and a 12- or 16-byte data descriptor.

use crate::error::{Result, ZipCoreError};

pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x0403_4b50;
pub const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x0807_4b50;
pub const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0201_4b50;
pub const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;

pub const LOCAL_FILE_HEADER_FIXED_SIZE: usize = 30;
pub const CENTRAL_DIRECTORY_RECORD_FIXED_SIZE: usize = 46;
pub const DATA_DESCRIPTOR_FIXED_SIZE: usize = 12;
pub const END_OF_CENTRAL_DIRECTORY_FIXED_SIZE: usize = 22;

/// General purpose bit flag bit 3: sizes/CRC live in a trailing data
/// descriptor instead of the local header.
pub const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;
/// General purpose bit flag bit 11: filename is UTF-8, not CP437.
pub const FLAG_UTF8_FILENAME: u16 = 1 << 11;
/// General purpose bit flag bit 0: entry is traditionally encrypted.
pub const FLAG_ENCRYPTED: u16 = 1 << 0;

fn u16_at(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn u32_at(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

/// Local file header: 30-byte fixed prefix + filename + extra field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeaderRecord {
    pub version_needed_to_extract: u16,
    pub general_purpose_bit_flag: u16,
    pub compression_method: u16,
    pub last_mod_file_time: u16,
    pub last_mod_file_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name: Vec<u8>,
    pub extra_field: Vec<u8>,
}

impl LocalFileHeaderRecord {
    /// Decodes a record from its fixed-size prefix plus the already-read
    /// variable tail (filename followed by extra field). `fixed` must be
    /// exactly [`LOCAL_FILE_HEADER_FIXED_SIZE`] bytes.
    pub fn decode(fixed: &[u8], tail: &[u8]) -> Result<Self> {
        if fixed.len() != LOCAL_FILE_HEADER_FIXED_SIZE {
            return Err(ZipCoreError::invalid_format(
                "local file header: short fixed prefix",
            ));
        }
        let signature = u32_at(fixed, 0);
        if signature != LOCAL_FILE_HEADER_SIGNATURE {
            return Err(ZipCoreError::invalid_format(format!(
                "local file header: bad signature 0x{signature:08x}"
            )));
        }
        let file_name_length = u16_at(fixed, 26) as usize;
        let extra_field_length = u16_at(fixed, 28) as usize;
        if tail.len() != file_name_length + extra_field_length {
            return Err(ZipCoreError::invalid_format(
                "local file header: tail length does not match declared fields",
            ));
        }
        Ok(Self {
            version_needed_to_extract: u16_at(fixed, 4),
            general_purpose_bit_flag: u16_at(fixed, 6),
            compression_method: u16_at(fixed, 8),
            last_mod_file_time: u16_at(fixed, 10),
            last_mod_file_date: u16_at(fixed, 12),
            crc32: u32_at(fixed, 14),
            compressed_size: u32_at(fixed, 18),
            uncompressed_size: u32_at(fixed, 22),
            file_name: tail[..file_name_length].to_vec(),
            extra_field: tail[file_name_length..].to_vec(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(LOCAL_FILE_HEADER_FIXED_SIZE + self.file_name.len() + self.extra_field.len());
        out.extend_from_slice(&LOCAL_FILE_HEADER_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&self.version_needed_to_extract.to_le_bytes());
        out.extend_from_slice(&self.general_purpose_bit_flag.to_le_bytes());
        out.extend_from_slice(&self.compression_method.to_le_bytes());
        out.extend_from_slice(&self.last_mod_file_time.to_le_bytes());
        out.extend_from_slice(&self.last_mod_file_date.to_le_bytes());
        out.extend_from_slice(&self.crc32.to_le_bytes());
        out.extend_from_slice(&self.compressed_size.to_le_bytes());
        out.extend_from_slice(&self.uncompressed_size.to_le_bytes());
        out.extend_from_slice(&(self.file_name.len() as u16).to_le_bytes());
        out.extend_from_slice(&(self.extra_field.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.file_name);
        out.extend_from_slice(&self.extra_field);
        out
    }

    /// Total on-disk size of this header, including variable tails.
    pub fn total_size(&self) -> u64 {
        (LOCAL_FILE_HEADER_FIXED_SIZE + self.file_name.len() + self.extra_field.len()) as u64
    }
}

/// Central directory file header: 46-byte fixed prefix + filename +
/// extra field + file comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryRecord {
    pub version_made_by: u16,
    pub version_needed_to_extract: u16,
    pub general_purpose_bit_flag: u16,
    pub compression_method: u16,
    pub last_mod_file_time: u16,
    pub last_mod_file_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub disk_number_start: u16,
    pub internal_file_attributes: u16,
    pub external_file_attributes: u32,
    pub relative_offset_of_local_header: u32,
    pub file_name: Vec<u8>,
    pub extra_field: Vec<u8>,
    pub file_comment: Vec<u8>,
}

impl CentralDirectoryRecord {
    pub fn decode(fixed: &[u8], tail: &[u8]) -> Result<Self> {
        if fixed.len() != CENTRAL_DIRECTORY_RECORD_FIXED_SIZE {
            return Err(ZipCoreError::invalid_format(
                "central directory record: short fixed prefix",
            ));
        }
        let signature = u32_at(fixed, 0);
        if signature != CENTRAL_DIRECTORY_SIGNATURE {
            return Err(ZipCoreError::invalid_format(format!(
                "central directory record: bad signature 0x{signature:08x}"
            )));
        }
        let file_name_length = u16_at(fixed, 28) as usize;
        let extra_field_length = u16_at(fixed, 30) as usize;
        let file_comment_length = u16_at(fixed, 32) as usize;
        if tail.len() != file_name_length + extra_field_length + file_comment_length {
            return Err(ZipCoreError::invalid_format(
                "central directory record: tail length does not match declared fields",
            ));
        }
        let file_name = tail[..file_name_length].to_vec();
        let extra_field = tail[file_name_length..file_name_length + extra_field_length].to_vec();
        let file_comment = tail[file_name_length + extra_field_length..].to_vec();
        Ok(Self {
            version_made_by: u16_at(fixed, 4),
            version_needed_to_extract: u16_at(fixed, 6),
            general_purpose_bit_flag: u16_at(fixed, 8),
            compression_method: u16_at(fixed, 10),
            last_mod_file_time: u16_at(fixed, 12),
            last_mod_file_date: u16_at(fixed, 14),
            crc32: u32_at(fixed, 16),
            compressed_size: u32_at(fixed, 20),
            uncompressed_size: u32_at(fixed, 24),
            disk_number_start: u16_at(fixed, 34),
            internal_file_attributes: u16_at(fixed, 36),
            external_file_attributes: u32_at(fixed, 38),
            relative_offset_of_local_header: u32_at(fixed, 42),
            file_name,
            extra_field,
            file_comment,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_size() as usize);
        out.extend_from_slice(&CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&self.version_made_by.to_le_bytes());
        out.extend_from_slice(&self.version_needed_to_extract.to_le_bytes());
        out.extend_from_slice(&self.general_purpose_bit_flag.to_le_bytes());
        out.extend_from_slice(&self.compression_method.to_le_bytes());
        out.extend_from_slice(&self.last_mod_file_time.to_le_bytes());
        out.extend_from_slice(&self.last_mod_file_date.to_le_bytes());
        out.extend_from_slice(&self.crc32.to_le_bytes());
        out.extend_from_slice(&self.compressed_size.to_le_bytes());
        out.extend_from_slice(&self.uncompressed_size.to_le_bytes());
        out.extend_from_slice(&(self.file_name.len() as u16).to_le_bytes());
        out.extend_from_slice(&(self.extra_field.len() as u16).to_le_bytes());
        out.extend_from_slice(&(self.file_comment.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.disk_number_start.to_le_bytes());
        out.extend_from_slice(&self.internal_file_attributes.to_le_bytes());
        out.extend_from_slice(&self.external_file_attributes.to_le_bytes());
        out.extend_from_slice(&self.relative_offset_of_local_header.to_le_bytes());
        out.extend_from_slice(&self.file_name);
        out.extend_from_slice(&self.extra_field);
        out.extend_from_slice(&self.file_comment);
        out
    }

    /// Total on-disk size of this record, including variable tails — the
    /// unit the EOCD's `sizeOfCentralDirectory` sums over all entries.
    pub fn total_size(&self) -> u64 {
        (CENTRAL_DIRECTORY_RECORD_FIXED_SIZE
            + self.file_name.len()
            + self.extra_field.len()
            + self.file_comment.len()) as u64
    }

    /// `true` if this entry uses ZIP64 extensions or traditional
    /// encryption — both are refused at load time (spec invariant 6).
    pub fn is_unsupported(&self) -> bool {
        self.version_needed_to_extract >= 45 || self.general_purpose_bit_flag & FLAG_ENCRYPTED != 0
    }
}

/// Optional 12- or 16-byte trailer carrying CRC and sizes when bit 3 of
/// the general purpose flag is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDescriptorRecord {
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
}

impl DataDescriptorRecord {
    /// Decodes a data descriptor from exactly 12 or 16 bytes. The
    /// leading signature, when present, is detected by its magic value
    /// rather than by buffer length alone.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let (crc_offset, has_signature) = if buf.len() >= 4 && u32_at(buf, 0) == DATA_DESCRIPTOR_SIGNATURE {
            (4, true)
        } else {
            (0, false)
        };
        let needed = crc_offset + DATA_DESCRIPTOR_FIXED_SIZE;
        if buf.len() < needed {
            return Err(ZipCoreError::invalid_format(
                "data descriptor: truncated record",
            ));
        }
        let _ = has_signature;
        Ok(Self {
            crc32: u32_at(buf, crc_offset),
            compressed_size: u32_at(buf, crc_offset + 4),
            uncompressed_size: u32_at(buf, crc_offset + 8),
        })
    }

    pub fn encode_with_signature(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16);
        out.extend_from_slice(&DATA_DESCRIPTOR_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&self.crc32.to_le_bytes());
        out.extend_from_slice(&self.compressed_size.to_le_bytes());
        out.extend_from_slice(&self.uncompressed_size.to_le_bytes());
        out
    }
}

/// The 22-byte trailer (plus optional comment) that anchors archive
/// parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectoryRecord {
    pub disk_number: u16,
    pub disk_with_central_directory: u16,
    pub entries_on_this_disk: u16,
    pub total_number_of_entries_in_central_directory: u16,
    pub size_of_central_directory: u32,
    pub offset_to_start_of_central_directory: u32,
    pub comment: Vec<u8>,
}

impl EndOfCentralDirectoryRecord {
    pub fn empty() -> Self {
        Self {
            disk_number: 0,
            disk_with_central_directory: 0,
            entries_on_this_disk: 0,
            total_number_of_entries_in_central_directory: 0,
            size_of_central_directory: 0,
            offset_to_start_of_central_directory: 0,
            comment: Vec::new(),
        }
    }

    pub fn decode(fixed: &[u8], comment: &[u8]) -> Result<Self> {
        if fixed.len() != END_OF_CENTRAL_DIRECTORY_FIXED_SIZE {
            return Err(ZipCoreError::invalid_format("eocd: short fixed prefix"));
        }
        let signature = u32_at(fixed, 0);
        if signature != END_OF_CENTRAL_DIRECTORY_SIGNATURE {
            return Err(ZipCoreError::invalid_format(format!(
                "eocd: bad signature 0x{signature:08x}"
            )));
        }
        let comment_length = u16_at(fixed, 20) as usize;
        if comment.len() != comment_length {
            return Err(ZipCoreError::invalid_format(
                "eocd: comment length does not match declared field",
            ));
        }
        Ok(Self {
            disk_number: u16_at(fixed, 4),
            disk_with_central_directory: u16_at(fixed, 6),
            entries_on_this_disk: u16_at(fixed, 8),
            total_number_of_entries_in_central_directory: u16_at(fixed, 10),
            size_of_central_directory: u32_at(fixed, 12),
            offset_to_start_of_central_directory: u32_at(fixed, 16),
            comment: comment.to_vec(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(END_OF_CENTRAL_DIRECTORY_FIXED_SIZE + self.comment.len());
        out.extend_from_slice(&END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&self.disk_number.to_le_bytes());
        out.extend_from_slice(&self.disk_with_central_directory.to_le_bytes());
        out.extend_from_slice(&self.entries_on_this_disk.to_le_bytes());
        out.extend_from_slice(&self.total_number_of_entries_in_central_directory.to_le_bytes());
        out.extend_from_slice(&self.size_of_central_directory.to_le_bytes());
        out.extend_from_slice(&self.offset_to_start_of_central_directory.to_le_bytes());
        out.extend_from_slice(&(self.comment.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.comment);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_file_header_round_trips() {
        let lfh = LocalFileHeaderRecord {
            version_needed_to_extract: 20,
            general_purpose_bit_flag: FLAG_UTF8_FILENAME,
            compression_method: 8,
            last_mod_file_time: 0,
            last_mod_file_date: 0,
            crc32: 0xDEAD_BEEF,
            compressed_size: 10,
            uncompressed_size: 20,
            file_name: b"hello.txt".to_vec(),
            extra_field: Vec::new(),
        };
        let encoded = lfh.encode();
        let decoded =
            LocalFileHeaderRecord::decode(&encoded[..LOCAL_FILE_HEADER_FIXED_SIZE], &encoded[LOCAL_FILE_HEADER_FIXED_SIZE..])
                .unwrap();
        assert_eq!(lfh, decoded);
    }

    #[test]
    fn local_file_header_rejects_bad_signature() {
        let mut buf = vec![0u8; LOCAL_FILE_HEADER_FIXED_SIZE];
        buf[0] = 0xff;
        assert!(LocalFileHeaderRecord::decode(&buf, &[]).is_err());
    }

    #[test]
    fn central_directory_record_round_trips() {
        let cd = CentralDirectoryRecord {
            version_made_by: 0x0314,
            version_needed_to_extract: 20,
            general_purpose_bit_flag: FLAG_UTF8_FILENAME,
            compression_method: 0,
            last_mod_file_time: 1,
            last_mod_file_date: 2,
            crc32: 7,
            compressed_size: 3,
            uncompressed_size: 3,
            disk_number_start: 0,
            internal_file_attributes: 0,
            external_file_attributes: 0o644 << 16,
            relative_offset_of_local_header: 1234,
            file_name: b"a/b.txt".to_vec(),
            extra_field: vec![1, 2, 3, 4],
            file_comment: b"hi".to_vec(),
        };
        let encoded = cd.encode();
        assert_eq!(encoded.len() as u64, cd.total_size());
        let decoded = CentralDirectoryRecord::decode(
            &encoded[..CENTRAL_DIRECTORY_RECORD_FIXED_SIZE],
            &encoded[CENTRAL_DIRECTORY_RECORD_FIXED_SIZE..],
        )
        .unwrap();
        assert_eq!(cd, decoded);
    }

    #[test]
    fn central_directory_record_flags_zip64_and_encrypted_as_unsupported() {
        let mut cd = CentralDirectoryRecord {
            version_made_by: 20,
            version_needed_to_extract: 45,
            general_purpose_bit_flag: 0,
            compression_method: 0,
            last_mod_file_time: 0,
            last_mod_file_date: 0,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            disk_number_start: 0,
            internal_file_attributes: 0,
            external_file_attributes: 0,
            relative_offset_of_local_header: 0,
            file_name: Vec::new(),
            extra_field: Vec::new(),
            file_comment: Vec::new(),
        };
        assert!(cd.is_unsupported());
        cd.version_needed_to_extract = 20;
        cd.general_purpose_bit_flag = FLAG_ENCRYPTED;
        assert!(cd.is_unsupported());
        cd.general_purpose_bit_flag = 0;
        assert!(!cd.is_unsupported());
    }

    #[test]
    fn data_descriptor_decodes_with_and_without_signature() {
        let mut with_sig = DATA_DESCRIPTOR_SIGNATURE.to_le_bytes().to_vec();
        with_sig.extend_from_slice(&1u32.to_le_bytes());
        with_sig.extend_from_slice(&2u32.to_le_bytes());
        with_sig.extend_from_slice(&3u32.to_le_bytes());
        let decoded = DataDescriptorRecord::decode(&with_sig).unwrap();
        assert_eq!(decoded.crc32, 1);
        assert_eq!(decoded.compressed_size, 2);
        assert_eq!(decoded.uncompressed_size, 3);

        let mut without_sig = 1u32.to_le_bytes().to_vec();
        without_sig.extend_from_slice(&2u32.to_le_bytes());
        without_sig.extend_from_slice(&3u32.to_le_bytes());
        let decoded = DataDescriptorRecord::decode(&without_sig).unwrap();
        assert_eq!(decoded, decoded_expected());
    }

    fn decoded_expected() -> DataDescriptorRecord {
        DataDescriptorRecord {
            crc32: 1,
            compressed_size: 2,
            uncompressed_size: 3,
        }
    }

    #[test]
    fn eocd_round_trips_with_comment() {
        let eocd = EndOfCentralDirectoryRecord {
            disk_number: 0,
            disk_with_central_directory: 0,
            entries_on_this_disk: 3,
            total_number_of_entries_in_central_directory: 3,
            size_of_central_directory: 200,
            offset_to_start_of_central_directory: 1000,
            comment: b"a zip comment".to_vec(),
        };
        let encoded = eocd.encode();
        let decoded = EndOfCentralDirectoryRecord::decode(
            &encoded[..END_OF_CENTRAL_DIRECTORY_FIXED_SIZE],
            &encoded[END_OF_CENTRAL_DIRECTORY_FIXED_SIZE..],
        )
        .unwrap();
        assert_eq!(eocd, decoded);
    }
}
