//! `#[repr(C)]` mirrors of the engine's value structs and opaque entities.

#![allow(non_camel_case_types)]

use std::os::raw::{c_int, c_void};

use gnc_domain::{Guid, Numeric, ValueError};

pub type gboolean = c_int;
pub type time64 = i64;
pub type gpointer = *mut c_void;

pub const GUID_DATA_SIZE: usize = 16;

/// Error numerics carry their code in `num` and a zero `denom`.
pub const GNC_ERROR_OK: i64 = 0;
pub const GNC_ERROR_ARG: i64 = -1;
pub const GNC_ERROR_OVERFLOW: i64 = -2;
pub const GNC_ERROR_DENOM_DIFF: i64 = -3;
pub const GNC_ERROR_REMAINDER: i64 = -4;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GncGUID {
    pub reserved: [u8; GUID_DATA_SIZE],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct gnc_numeric {
    pub num: i64,
    pub denom: i64,
}

impl gnc_numeric {
    pub const fn error(code: i64) -> Self {
        Self {
            num: code,
            denom: 0,
        }
    }
}

/// Glib doubly linked list node, as returned by list-valued getters.
#[repr(C)]
pub struct GList {
    pub data: gpointer,
    pub next: *mut GList,
    pub prev: *mut GList,
}

macro_rules! opaque {
    ($($name:ident),* $(,)?) => {
        $(
            #[repr(C)]
            pub struct $name {
                _private: [u8; 0],
            }
        )*
    };
}

opaque!(
    QofSession,
    QofBook,
    QofCollection,
    Account,
    Transaction,
    Split,
    GNCPrice,
    GNCPriceDB,
    gnc_commodity,
    gnc_commodity_table,
);

impl From<GncGUID> for Guid {
    fn from(raw: GncGUID) -> Self {
        Guid::from_bytes(raw.reserved)
    }
}

impl From<Guid> for GncGUID {
    fn from(guid: Guid) -> Self {
        GncGUID {
            reserved: *guid.as_bytes(),
        }
    }
}

/// Keeps the exact pair; error numerics and non-positive denominators are
/// rejected rather than normalized.
impl TryFrom<gnc_numeric> for Numeric {
    type Error = ValueError;

    fn try_from(raw: gnc_numeric) -> Result<Self, Self::Error> {
        if raw.denom == 0 {
            return Err(ValueError::InvalidNumeric(format!(
                "engine returned error numeric (code {})",
                raw.num
            )));
        }
        Numeric::new(raw.num, raw.denom)
    }
}

impl From<Numeric> for gnc_numeric {
    fn from(value: Numeric) -> Self {
        gnc_numeric {
            num: value.num(),
            denom: value.denom(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_pairs_cross_unchanged() {
        for (num, denom) in [(0, 1), (-5000, 100), (3, 6), (i64::MAX, i64::MAX), (i64::MIN, 7)] {
            let raw = gnc_numeric { num, denom };
            let value = Numeric::try_from(raw).unwrap();
            assert_eq!(gnc_numeric::from(value), raw);
        }
    }

    #[test]
    fn error_numerics_are_rejected() {
        let err = Numeric::try_from(gnc_numeric::error(GNC_ERROR_OVERFLOW)).unwrap_err();
        assert!(matches!(err, ValueError::InvalidNumeric(_)));
    }

    #[test]
    fn guid_bytes_cross_unchanged() {
        let guid = Guid::new_random();
        let raw = GncGUID::from(guid);
        assert_eq!(raw.reserved, *guid.as_bytes());
        assert_eq!(Guid::from(raw), guid);
    }
}
