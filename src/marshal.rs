//! Conversions between Rust values and what crosses the native boundary.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use gnc_domain::{Guid, Numeric};
use gnc_sys::{gboolean, gnc_numeric, GncGUID, NativeEngine};

use crate::error::{BindingError, Result};

/// Copies a borrowed engine string. Null reads as empty.
///
/// # Safety
/// `raw` must be null or point to a NUL-terminated string that stays valid
/// for the duration of the call.
pub(crate) unsafe fn copy_str(raw: *const c_char) -> String {
    if raw.is_null() {
        return String::new();
    }
    CStr::from_ptr(raw).to_string_lossy().into_owned()
}

/// Copies a caller-owned engine string and hands it back for freeing.
///
/// # Safety
/// `raw` must be null or a string the engine allocated for the caller.
pub(crate) unsafe fn take_str(native: &dyn NativeEngine, raw: *mut c_char) -> String {
    if raw.is_null() {
        return String::new();
    }
    let text = copy_str(raw);
    native.free_string(raw);
    text
}

pub(crate) fn to_cstring(value: &str, what: &str) -> Result<CString> {
    CString::new(value).map_err(|err| {
        BindingError::InvalidArgument(format!(
            "{what} contains a NUL byte at offset {}",
            err.nul_position()
        ))
    })
}

pub(crate) fn numeric_out(raw: gnc_numeric) -> Result<Numeric> {
    Numeric::try_from(raw).map_err(BindingError::from)
}

pub(crate) fn guid_out(raw: GncGUID) -> Guid {
    Guid::from(raw)
}

pub(crate) fn guid_in(guid: &Guid) -> GncGUID {
    GncGUID::from(*guid)
}

pub(crate) fn truth(value: gboolean) -> bool {
    value != 0
}
