// Error taxonomy for speller operations.

use std::path::PathBuf;
use std::time::Duration;

use divvun_abi::{ArchiveFormat, DecodeError, NativeError};

use crate::registry::ConfigError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type for every operation that crosses the native boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The archive path does not exist.
    #[error("speller archive not found: {}", path.display())]
    ArchiveNotFound { path: PathBuf },

    /// The native library could not open the archive.
    #[error("cannot open speller archive {}: {message}", path.display())]
    ArchiveUnreadable { path: PathBuf, message: String },

    /// No speller could be derived from the archive.
    #[error("unsupported speller archive {}: {message}", path.display())]
    ArchiveUnsupportedFormat { path: PathBuf, message: String },

    /// Input cannot be represented as a UTF-8 slice.
    #[error("cannot encode {what} as UTF-8")]
    EncodingFailure { what: String },

    /// Bytes returned by the native library are not valid UTF-8.
    #[error(transparent)]
    DecodingFailure(#[from] DecodeError),

    /// The native library reported an error through the error channel.
    #[error(transparent)]
    NativeCallFailure(#[from] NativeError),

    /// The native library returned something the protocol does not allow.
    #[error("native library broke the speller protocol: {0}")]
    ProtocolViolation(String),

    #[error("could not find {name} in any of the search paths:\n{searched}")]
    LibraryNotFound { name: String, searched: String },

    #[error("failed to load native library {}: {source}", path.display())]
    LibraryLoad {
        path: PathBuf,
        source: libloading::Error,
    },

    #[error("native library does not export `{symbol}`")]
    MissingSymbol {
        symbol: &'static str,
        source: libloading::Error,
    },

    #[error("native library cannot open {0} archives")]
    FormatUnavailable(ArchiveFormat),

    #[error("native library has not been initialized")]
    NotInitialized,

    #[error("native library is already initialized")]
    AlreadyInitialized,

    #[error("no speller configured for language `{0}`")]
    UnknownLanguage(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("speller call did not finish within {0:?}")]
    Timeout(Duration),

    #[error("failed to start speller worker thread: {0}")]
    Worker(#[source] std::io::Error),

    #[error("speller worker thread exited without a result")]
    WorkerLost,
}

/// Discriminant of [`Error`], for callers that branch on the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ArchiveNotFound,
    ArchiveUnreadable,
    ArchiveUnsupportedFormat,
    EncodingFailure,
    DecodingFailure,
    NativeCallFailure,
    ProtocolViolation,
    Library,
    NotInitialized,
    AlreadyInitialized,
    UnknownLanguage,
    Config,
    Timeout,
    Worker,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ArchiveNotFound { .. } => ErrorKind::ArchiveNotFound,
            Error::ArchiveUnreadable { .. } => ErrorKind::ArchiveUnreadable,
            Error::ArchiveUnsupportedFormat { .. } => ErrorKind::ArchiveUnsupportedFormat,
            Error::EncodingFailure { .. } => ErrorKind::EncodingFailure,
            Error::DecodingFailure(_) => ErrorKind::DecodingFailure,
            Error::NativeCallFailure(_) => ErrorKind::NativeCallFailure,
            Error::ProtocolViolation(_) => ErrorKind::ProtocolViolation,
            Error::LibraryNotFound { .. }
            | Error::LibraryLoad { .. }
            | Error::MissingSymbol { .. }
            | Error::FormatUnavailable(_) => ErrorKind::Library,
            Error::NotInitialized => ErrorKind::NotInitialized,
            Error::AlreadyInitialized => ErrorKind::AlreadyInitialized,
            Error::UnknownLanguage(_) => ErrorKind::UnknownLanguage,
            Error::Config(_) => ErrorKind::Config,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::Worker(_) | Error::WorkerLost => ErrorKind::Worker,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_error_is_transparent() {
        let err = Error::from(NativeError {
            call: "divvun_vec_suggestion_len",
            message: "boom".into(),
        });
        assert_eq!(err.kind(), ErrorKind::NativeCallFailure);
        assert_eq!(err.to_string(), "divvun_vec_suggestion_len failed: boom");
    }

    #[test]
    fn not_found_message() {
        let err = Error::ArchiveNotFound {
            path: PathBuf::from("/tmp/se.zhfst"),
        };
        assert_eq!(err.kind(), ErrorKind::ArchiveNotFound);
        assert_eq!(err.to_string(), "speller archive not found: /tmp/se.zhfst");
    }

    #[test]
    fn library_errors_share_a_kind() {
        assert_eq!(
            Error::FormatUnavailable(ArchiveFormat::Chunked).kind(),
            ErrorKind::Library
        );
    }
}
