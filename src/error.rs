//! Error types for zipcore

use std::collections::BTreeMap;
use std::fmt;
use std::io;

/// Result type for zipcore operations
pub type Result<T> = std::result::Result<T, ZipCoreError>;

/// The closed set of error kinds zipcore can raise.
///
/// Every variant carries a human-readable description and a key/value
/// context bag (notably file path and zlib return code) via [`ZipCoreError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A cooperative cancellation flag was observed mid-operation.
    Cancelled,
    /// A filesystem prerequisite failed: the path does not exist.
    FileNotFound,
    /// A filesystem prerequisite failed: the path exists but isn't usable
    /// for the requested mode (e.g. `create` on an existing file).
    FileNotAccessible,
    /// The EOCD could not be located, a signature mismatched, or a record
    /// was truncated.
    InvalidFormat,
    /// An entry's compression method is neither `store` (0) nor
    /// `deflate` (8).
    InvalidArchiveLevel,
    /// Writing the new entry would push the start of the central
    /// directory past `u32::MAX` (ZIP64 is out of scope).
    InvalidStartOfCentralDirectoryOffset,
    /// The DEFLATE/INFLATE stream reported a structural error (mirrors
    /// `Z_STREAM_ERROR`).
    GzipStream,
    /// The DEFLATE/INFLATE stream reported corrupt data (mirrors
    /// `Z_DATA_ERROR`).
    GzipData,
    /// The DEFLATE/INFLATE stream ran out of memory (mirrors
    /// `Z_MEM_ERROR`).
    GzipMemory,
    /// The DEFLATE/INFLATE stream ran out of buffer space (mirrors
    /// `Z_BUF_ERROR`).
    GzipBuffer,
    /// The underlying zlib version is incompatible (mirrors
    /// `Z_VERSION_ERROR`).
    GzipVersion,
    /// Catch-all for anything not covered above.
    Unknown,
}

impl ErrorKind {
    fn describe(&self) -> &'static str {
        match self {
            ErrorKind::Cancelled => "operation cancelled",
            ErrorKind::FileNotFound => "file not found",
            ErrorKind::FileNotAccessible => "file not accessible",
            ErrorKind::InvalidFormat => "invalid zip format",
            ErrorKind::InvalidArchiveLevel => "invalid archive compression level",
            ErrorKind::InvalidStartOfCentralDirectoryOffset => {
                "start of central directory offset exceeds u32::MAX"
            }
            ErrorKind::GzipStream => "deflate stream error",
            ErrorKind::GzipData => "deflate data error",
            ErrorKind::GzipMemory => "deflate memory error",
            ErrorKind::GzipBuffer => "deflate buffer error",
            ErrorKind::GzipVersion => "deflate version error",
            ErrorKind::Unknown => "unknown error",
        }
    }
}

/// An error raised by a zipcore operation.
#[derive(Debug, Clone)]
pub struct ZipCoreError {
    kind: ErrorKind,
    message: String,
    context: BTreeMap<String, String>,
}

impl ZipCoreError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Attach a key/value pair to the error's context bag (e.g. `"path"`,
    /// `"zlib_code"`). Returns `self` for chaining at the call site.
    pub fn with_context(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, ErrorKind::Cancelled.describe())
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidFormat, message.into())
    }

    pub fn invalid_archive_level(method: u16) -> Self {
        Self::new(
            ErrorKind::InvalidArchiveLevel,
            format!("unsupported compression method: {method}"),
        )
        .with_context("compression_method", method)
    }

    pub fn invalid_start_of_central_directory_offset(offset: u64) -> Self {
        Self::new(
            ErrorKind::InvalidStartOfCentralDirectoryOffset,
            ErrorKind::InvalidStartOfCentralDirectoryOffset.describe(),
        )
        .with_context("offset", offset)
    }
}

impl fmt::Display for ZipCoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.describe(), self.message)?;
        for (key, value) in &self.context {
            write!(f, " [{key}={value}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for ZipCoreError {}

impl From<io::Error> for ZipCoreError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::new(ErrorKind::FileNotFound, err.to_string()),
            io::ErrorKind::PermissionDenied | io::ErrorKind::AlreadyExists => {
                Self::new(ErrorKind::FileNotAccessible, err.to_string())
            }
            io::ErrorKind::UnexpectedEof | io::ErrorKind::WriteZero => {
                Self::new(ErrorKind::GzipBuffer, err.to_string())
            }
            io::ErrorKind::InvalidData => Self::new(ErrorKind::GzipData, err.to_string()),
            _ => Self::new(ErrorKind::Unknown, err.to_string()),
        }
    }
}
