//! Backend error codes as reported by `qof_session_pop_error`.

use std::os::raw::c_int;

pub type QofBackendError = c_int;

pub const ERR_BACKEND_NO_ERR: QofBackendError = 0;
pub const ERR_BACKEND_NO_HANDLER: QofBackendError = 1;
pub const ERR_BACKEND_NO_BACKEND: QofBackendError = 2;
pub const ERR_BACKEND_BAD_URL: QofBackendError = 3;
pub const ERR_BACKEND_NO_SUCH_DB: QofBackendError = 4;
pub const ERR_BACKEND_CANT_CONNECT: QofBackendError = 5;
pub const ERR_BACKEND_CONN_LOST: QofBackendError = 6;
pub const ERR_BACKEND_LOCKED: QofBackendError = 7;
pub const ERR_BACKEND_STORE_EXISTS: QofBackendError = 8;
pub const ERR_BACKEND_READONLY: QofBackendError = 9;
pub const ERR_BACKEND_TOO_NEW: QofBackendError = 10;
pub const ERR_BACKEND_DATA_CORRUPT: QofBackendError = 11;
pub const ERR_BACKEND_SERVER_ERR: QofBackendError = 12;
pub const ERR_BACKEND_ALLOC: QofBackendError = 13;
pub const ERR_BACKEND_PERM: QofBackendError = 14;
pub const ERR_BACKEND_MODIFIED: QofBackendError = 15;
pub const ERR_BACKEND_MOD_DESTROY: QofBackendError = 16;
pub const ERR_BACKEND_MISC: QofBackendError = 17;
pub const ERR_QOF_OVERFLOW: QofBackendError = 18;

pub const ERR_FILEIO_FILE_BAD_READ: QofBackendError = 1000;
pub const ERR_FILEIO_FILE_EMPTY: QofBackendError = 1001;
pub const ERR_FILEIO_FILE_LOCKERR: QofBackendError = 1002;
pub const ERR_FILEIO_FILE_NOT_FOUND: QofBackendError = 1003;
pub const ERR_FILEIO_FILE_TOO_OLD: QofBackendError = 1004;
pub const ERR_FILEIO_UNKNOWN_FILE_TYPE: QofBackendError = 1005;
pub const ERR_FILEIO_PARSE_ERROR: QofBackendError = 1006;
pub const ERR_FILEIO_BACKUP_ERROR: QofBackendError = 1007;
pub const ERR_FILEIO_WRITE_ERROR: QofBackendError = 1008;
pub const ERR_FILEIO_READ_ERROR: QofBackendError = 1009;
pub const ERR_FILEIO_NO_ENCODING: QofBackendError = 1010;
pub const ERR_FILEIO_FILE_EACCES: QofBackendError = 1011;
pub const ERR_FILEIO_RESERVED_WRITE: QofBackendError = 1012;
pub const ERR_FILEIO_FILE_UPGRADE: QofBackendError = 1013;
