//! DOS/Unicode filename decoding, MS-DOS date/time <-> UTC conversion,
//! and external attribute <-> entry-type mapping.

use crate::codec::FLAG_UTF8_FILENAME;
use chrono::{Datelike, TimeZone, Timelike, Utc};
use codepage_437::{BorrowFromCp437, CP437_CONTROL};
use std::borrow::Cow;
use std::time::SystemTime;

/// Creator OS byte, packed into the upper byte of `versionMadeBy`.
pub const CREATOR_MSDOS: u8 = 0;
pub const CREATOR_UNIX: u8 = 3;
pub const CREATOR_OSX: u8 = 19;

const S_IFMT: u32 = 0o170_000;
const S_IFREG: u32 = 0o100_000;
const S_IFDIR: u32 = 0o040_000;
const S_IFLNK: u32 = 0o120_000;

/// MS-DOS directory attribute bit, packed into the low byte of a
/// DOS-creator `externalFileAttributes`.
const MSDOS_DIRECTORY_ATTRIBUTE: u32 = 0x10;

pub const DEFAULT_FILE_PERMISSIONS: u32 = 0o644;
pub const DEFAULT_DIRECTORY_PERMISSIONS: u32 = 0o755;

/// The sum type an entry's record bytes resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
    Symlink,
}

/// Derives the entry type from `versionMadeBy`'s creator OS,
/// `externalFileAttributes`, and the path's trailing slash — spec §4.7.
pub fn entry_type(version_made_by: u16, external_file_attributes: u32, path: &str) -> EntryType {
    let creator_os = (version_made_by >> 8) as u8;
    let ends_with_slash = path.ends_with('/');

    if creator_os == CREATOR_UNIX || creator_os == CREATOR_OSX {
        let mode = (external_file_attributes >> 16) & S_IFMT;
        match mode {
            S_IFDIR => EntryType::Directory,
            S_IFLNK => EntryType::Symlink,
            S_IFREG => EntryType::File,
            _ => {
                if ends_with_slash {
                    EntryType::Directory
                } else {
                    EntryType::File
                }
            }
        }
    } else if creator_os == CREATOR_MSDOS {
        if ends_with_slash || (external_file_attributes >> 4) & 0x01 == 0x01 {
            EntryType::Directory
        } else {
            EntryType::File
        }
    } else if ends_with_slash {
        EntryType::Directory
    } else {
        EntryType::File
    }
}

/// Packs `((typeMode | permissions) & 0xFFFF) << 16`, with the MS-DOS
/// directory bit additionally set for directories so non-Unix tools
/// still recognize them.
pub fn encode_external_attributes(entry_type: EntryType, permissions: u32) -> u32 {
    let type_mode = match entry_type {
        EntryType::File => S_IFREG,
        EntryType::Directory => S_IFDIR,
        EntryType::Symlink => S_IFLNK,
    };
    let unix_bits = ((type_mode | permissions) & 0xFFFF) << 16;
    if matches!(entry_type, EntryType::Directory) {
        unix_bits | MSDOS_DIRECTORY_ATTRIBUTE
    } else {
        unix_bits
    }
}

/// Extracts the POSIX permission bits (mode & 0o7777) from
/// `externalFileAttributes`, for Unix/macOS-authored entries.
pub fn decode_permissions(external_file_attributes: u32) -> u32 {
    (external_file_attributes >> 16) & 0o7777
}

pub fn default_permissions(entry_type: EntryType) -> u32 {
    match entry_type {
        EntryType::Directory => DEFAULT_DIRECTORY_PERMISSIONS,
        EntryType::File | EntryType::Symlink => DEFAULT_FILE_PERMISSIONS,
    }
}

/// Encodes a UTC instant as MS-DOS date/time: `dosDate = day | (month <<
/// 5) | ((year - 1980) << 9)`, `dosTime = (sec/2) | (min << 5) | (hour <<
/// 11)`, with the year clamped to `[1980, 2099]`.
pub fn encode_dos_date_time(time: SystemTime) -> (u16, u16) {
    let datetime: chrono::DateTime<Utc> = time.into();
    let year = datetime.year().clamp(1980, 2099);
    let dos_date = (datetime.day() as u16)
        | ((datetime.month() as u16) << 5)
        | (((year - 1980) as u16) << 9);
    let dos_time =
        ((datetime.second() / 2) as u16) | ((datetime.minute() as u16) << 5) | ((datetime.hour() as u16) << 11);
    (dos_time, dos_date)
}

/// Inverse of [`encode_dos_date_time`]. DOS seconds resolution is 2s;
/// the nominal year range is `[1980, 2107]` (a 7-bit year field).
pub fn decode_dos_date_time(dos_time: u16, dos_date: u16) -> SystemTime {
    let day = (dos_date & 0x1F).max(1) as u32;
    let month = ((dos_date >> 5) & 0x0F).clamp(1, 12) as u32;
    let year = 1980 + ((dos_date >> 9) & 0x7F) as i32;

    let second = ((dos_time & 0x1F) as u32) * 2;
    let minute = (dos_time >> 5) & 0x3F;
    let hour = (dos_time >> 11) & 0x1F;

    let datetime = Utc
        .with_ymd_and_hms(year, month, day, hour as u32, minute as u32, second)
        .single()
        .unwrap_or_else(|| Utc.with_ymd_and_hms(1980, 1, 1, 0, 0, 0).unwrap());
    datetime.into()
}

/// Decodes filename bytes: UTF-8 when bit 11 of the general purpose
/// flag is set, otherwise IBM Code Page 437. An undecodable filename
/// yields an empty string rather than failing the whole entry.
pub fn decode_filename(bytes: &[u8], general_purpose_bit_flag: u16) -> String {
    if general_purpose_bit_flag & FLAG_UTF8_FILENAME != 0 {
        String::from_utf8(bytes.to_vec()).unwrap_or_default()
    } else {
        let decoded: Cow<str> = Cow::borrow_from_cp437(bytes, &CP437_CONTROL);
        decoded.into_owned()
    }
}
