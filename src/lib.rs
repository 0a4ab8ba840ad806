//! # zipcore: PKWARE ZIP archive reading and writing
//!
//! `zipcore` creates, reads, and mutates ZIP archives in the PKWARE
//! APPNOTE non-ZIP64, unencrypted subset. Entries are compressed with
//! `store` or `deflate`; CRC32 is always computed over the uncompressed
//! bytes.
//!
//! ## Quick Start
//!
//! ### Reading an archive
//!
//! ```no_run
//! use zipcore::{Archive, ArchiveMode, Progress};
//!
//! let mut archive = Archive::open("archive.zip", ArchiveMode::Read)?;
//! for entry in archive.entries()? {
//!     println!("{}: {} bytes", entry.path(), entry.uncompressed_size());
//! }
//!
//! if let Some(entry) = archive.lookup("file.txt")? {
//!     let mut out = Vec::new();
//!     archive.extract(&entry, &mut out, &Progress::default())?;
//! }
//! # Ok::<(), zipcore::ZipCoreError>(())
//! ```
//!
//! ### Writing an archive
//!
//! ```no_run
//! use zipcore::{Archive, ArchiveMode, AddEntrySpec, CompressionLevel, EntryType, Progress};
//!
//! let mut archive = Archive::open("output.zip", ArchiveMode::Create)?;
//! let spec = AddEntrySpec::new("file1.txt", EntryType::File).with_level(CompressionLevel::Deflate);
//! archive.add_entry(&spec, &mut &b"Hello, World!"[..], &Progress::default())?;
//! # Ok::<(), zipcore::ZipCoreError>(())
//! ```

pub mod archive;
pub mod attr;
pub mod codec;
pub mod compress;
pub mod entry;
pub mod error;
pub mod progress;
pub mod reader;
pub mod remove;
pub mod writer;

pub use archive::{Archive, ArchiveMode};
pub use attr::EntryType;
pub use compress::CompressionLevel;
pub use entry::{AddEntrySpec, Entry};
pub use error::{ErrorKind, Result, ZipCoreError};
pub use progress::Progress;
pub use reader::SkippedEntry;
