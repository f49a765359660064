use std::fmt;

use gnc_config::ConfigError;
use gnc_domain::ValueError;
use gnc_sys as ffi;
use thiserror::Error;

/// Typed form of the engine's backend error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendErrorKind {
    NoHandler,
    NoBackend,
    BadUrl,
    NoSuchDb,
    CantConnect,
    ConnectionLost,
    Locked,
    StoreExists,
    ReadOnly,
    TooNew,
    DataCorrupt,
    ServerError,
    Alloc,
    Permission,
    Modified,
    ModifiedDestroyed,
    Misc,
    Overflow,
    FileBadRead,
    FileEmpty,
    FileLockError,
    FileNotFound,
    FileTooOld,
    UnknownFileType,
    ParseError,
    BackupError,
    WriteError,
    ReadError,
    NoEncoding,
    FileAccess,
    ReservedWrite,
    FileUpgrade,
    Unknown(i32),
}

const KNOWN: [(ffi::QofBackendError, BackendErrorKind); 32] = [
    (ffi::ERR_BACKEND_NO_HANDLER, BackendErrorKind::NoHandler),
    (ffi::ERR_BACKEND_NO_BACKEND, BackendErrorKind::NoBackend),
    (ffi::ERR_BACKEND_BAD_URL, BackendErrorKind::BadUrl),
    (ffi::ERR_BACKEND_NO_SUCH_DB, BackendErrorKind::NoSuchDb),
    (ffi::ERR_BACKEND_CANT_CONNECT, BackendErrorKind::CantConnect),
    (ffi::ERR_BACKEND_CONN_LOST, BackendErrorKind::ConnectionLost),
    (ffi::ERR_BACKEND_LOCKED, BackendErrorKind::Locked),
    (ffi::ERR_BACKEND_STORE_EXISTS, BackendErrorKind::StoreExists),
    (ffi::ERR_BACKEND_READONLY, BackendErrorKind::ReadOnly),
    (ffi::ERR_BACKEND_TOO_NEW, BackendErrorKind::TooNew),
    (ffi::ERR_BACKEND_DATA_CORRUPT, BackendErrorKind::DataCorrupt),
    (ffi::ERR_BACKEND_SERVER_ERR, BackendErrorKind::ServerError),
    (ffi::ERR_BACKEND_ALLOC, BackendErrorKind::Alloc),
    (ffi::ERR_BACKEND_PERM, BackendErrorKind::Permission),
    (ffi::ERR_BACKEND_MODIFIED, BackendErrorKind::Modified),
    (ffi::ERR_BACKEND_MOD_DESTROY, BackendErrorKind::ModifiedDestroyed),
    (ffi::ERR_BACKEND_MISC, BackendErrorKind::Misc),
    (ffi::ERR_QOF_OVERFLOW, BackendErrorKind::Overflow),
    (ffi::ERR_FILEIO_FILE_BAD_READ, BackendErrorKind::FileBadRead),
    (ffi::ERR_FILEIO_FILE_EMPTY, BackendErrorKind::FileEmpty),
    (ffi::ERR_FILEIO_FILE_LOCKERR, BackendErrorKind::FileLockError),
    (ffi::ERR_FILEIO_FILE_NOT_FOUND, BackendErrorKind::FileNotFound),
    (ffi::ERR_FILEIO_FILE_TOO_OLD, BackendErrorKind::FileTooOld),
    (ffi::ERR_FILEIO_UNKNOWN_FILE_TYPE, BackendErrorKind::UnknownFileType),
    (ffi::ERR_FILEIO_PARSE_ERROR, BackendErrorKind::ParseError),
    (ffi::ERR_FILEIO_BACKUP_ERROR, BackendErrorKind::BackupError),
    (ffi::ERR_FILEIO_WRITE_ERROR, BackendErrorKind::WriteError),
    (ffi::ERR_FILEIO_READ_ERROR, BackendErrorKind::ReadError),
    (ffi::ERR_FILEIO_NO_ENCODING, BackendErrorKind::NoEncoding),
    (ffi::ERR_FILEIO_FILE_EACCES, BackendErrorKind::FileAccess),
    (ffi::ERR_FILEIO_RESERVED_WRITE, BackendErrorKind::ReservedWrite),
    (ffi::ERR_FILEIO_FILE_UPGRADE, BackendErrorKind::FileUpgrade),
];

impl BackendErrorKind {
    /// `None` for the "no error" code.
    pub fn from_code(code: ffi::QofBackendError) -> Option<Self> {
        if code == ffi::ERR_BACKEND_NO_ERR {
            return None;
        }
        let kind = KNOWN
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, kind)| *kind)
            .unwrap_or(BackendErrorKind::Unknown(code));
        Some(kind)
    }

    pub fn code(self) -> ffi::QofBackendError {
        match self {
            BackendErrorKind::Unknown(code) => code,
            kind => KNOWN
                .iter()
                .find(|(_, known)| *known == kind)
                .map(|(code, _)| *code)
                .unwrap_or(ffi::ERR_BACKEND_MISC),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            BackendErrorKind::NoHandler => "no backend handles this URI scheme",
            BackendErrorKind::NoBackend => "session has no backend",
            BackendErrorKind::BadUrl => "malformed URI",
            BackendErrorKind::NoSuchDb => "database does not exist",
            BackendErrorKind::CantConnect => "cannot connect to the store",
            BackendErrorKind::ConnectionLost => "connection to the store was lost",
            BackendErrorKind::Locked => "store is locked by another session",
            BackendErrorKind::StoreExists => "store already exists",
            BackendErrorKind::ReadOnly => "store is read-only",
            BackendErrorKind::TooNew => "store was written by a newer version",
            BackendErrorKind::DataCorrupt => "store data is corrupt",
            BackendErrorKind::ServerError => "server error",
            BackendErrorKind::Alloc => "allocation failed",
            BackendErrorKind::Permission => "permission denied",
            BackendErrorKind::Modified => "entity was modified elsewhere",
            BackendErrorKind::ModifiedDestroyed => "entity was destroyed elsewhere",
            BackendErrorKind::Misc => "backend error",
            BackendErrorKind::Overflow => "numeric overflow",
            BackendErrorKind::FileBadRead => "file could not be read completely",
            BackendErrorKind::FileEmpty => "file is empty",
            BackendErrorKind::FileLockError => "lock file could not be written",
            BackendErrorKind::FileNotFound => "file not found",
            BackendErrorKind::FileTooOld => "file format is too old",
            BackendErrorKind::UnknownFileType => "unknown file type",
            BackendErrorKind::ParseError => "file could not be parsed",
            BackendErrorKind::BackupError => "backup could not be written",
            BackendErrorKind::WriteError => "file could not be written",
            BackendErrorKind::ReadError => "file could not be read",
            BackendErrorKind::NoEncoding => "file has no encoding",
            BackendErrorKind::FileAccess => "file access denied",
            BackendErrorKind::ReservedWrite => "write to reserved file refused",
            BackendErrorKind::FileUpgrade => "file needs an upgrade",
            BackendErrorKind::Unknown(_) => "unrecognized backend error",
        }
    }
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendErrorKind::Unknown(code) => write!(f, "{} (code {code})", self.describe()),
            kind => f.write_str(kind.describe()),
        }
    }
}

/// Every failure the binding surfaces. No native failure escapes as a panic.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("invalid {0} handle: engine returned null")]
    InvalidHandle(&'static str),

    #[error("stale {0} handle: its book is closed or the entity was released")]
    StaleHandle(&'static str),

    #[error("invalid numeric: {0}")]
    InvalidNumeric(String),

    #[error("malformed identifier: {0}")]
    MalformedIdentifier(String),

    #[error("{operation} failed: {kind}: {message}")]
    NativeCallFailed {
        operation: &'static str,
        kind: BackendErrorKind,
        message: String,
    },

    #[error("{0} already has an open edit")]
    EditInProgress(&'static str),

    #[error("entity does not belong here: {0}")]
    ForeignEntity(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, BindingError>;

impl BindingError {
    /// Backend classification for failed native calls.
    pub fn backend_kind(&self) -> Option<BackendErrorKind> {
        match self {
            BindingError::NativeCallFailed { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, BindingError::StaleHandle(_))
    }
}

impl From<ValueError> for BindingError {
    fn from(err: ValueError) -> Self {
        match err {
            ValueError::InvalidNumeric(msg) => BindingError::InvalidNumeric(msg),
            ValueError::MalformedIdentifier(msg) => BindingError::MalformedIdentifier(msg),
            ValueError::InvalidDate(msg) => BindingError::InvalidArgument(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_code_maps_back_to_itself() {
        for (code, kind) in KNOWN {
            assert_eq!(BackendErrorKind::from_code(code), Some(kind));
            assert_eq!(kind.code(), code);
        }
    }

    #[test]
    fn unknown_codes_are_preserved() {
        let kind = BackendErrorKind::from_code(4242).unwrap();
        assert_eq!(kind, BackendErrorKind::Unknown(4242));
        assert_eq!(kind.code(), 4242);
        assert!(kind.to_string().contains("4242"));
        assert_eq!(BackendErrorKind::from_code(ffi::ERR_BACKEND_NO_ERR), None);
    }

    #[test]
    fn value_errors_keep_their_category() {
        let err: BindingError = ValueError::InvalidNumeric("1/0".into()).into();
        assert!(matches!(err, BindingError::InvalidNumeric(_)));
        let err: BindingError = ValueError::MalformedIdentifier("zz".into()).into();
        assert!(matches!(err, BindingError::MalformedIdentifier(_)));
    }
}
