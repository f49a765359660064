use gnc_domain::{Guid, Numeric, ReconcileState};
use gnc_sys as ffi;

use crate::account::Account;
use crate::error::{BackendErrorKind, BindingError, Result};
use crate::lifeline::Handle;
use crate::marshal::{copy_str, guid_out, numeric_out};
use crate::transaction::Transaction;

/// One leg of a transaction. Changes go through
/// [`TransactionEdit::split`](crate::TransactionEdit::split).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Split {
    handle: Handle<ffi::Split>,
}

impl Split {
    pub(crate) fn from_handle(handle: Handle<ffi::Split>) -> Self {
        Self { handle }
    }

    pub(crate) fn handle(&self) -> &Handle<ffi::Split> {
        &self.handle
    }

    pub fn guid(&self) -> Result<Guid> {
        self.handle
            .with(|live, raw| guid_out(unsafe { live.native().split_get_guid(raw) }))
    }

    /// Quantity in the account's commodity, exactly as stored.
    pub fn amount(&self) -> Result<Numeric> {
        self.handle
            .try_with(|live, raw| numeric_out(unsafe { live.native().split_get_amount(raw) }))
    }

    /// Value in the transaction's currency, exactly as stored.
    pub fn value(&self) -> Result<Numeric> {
        self.handle
            .try_with(|live, raw| numeric_out(unsafe { live.native().split_get_value(raw) }))
    }

    pub fn memo(&self) -> Result<String> {
        self.handle
            .with(|live, raw| unsafe { copy_str(live.native().split_get_memo(raw)) })
    }

    pub fn action(&self) -> Result<String> {
        self.handle
            .with(|live, raw| unsafe { copy_str(live.native().split_get_action(raw)) })
    }

    pub fn reconcile_state(&self) -> Result<ReconcileState> {
        let flag = self
            .handle
            .with(|live, raw| unsafe { live.native().split_get_reconcile(raw) })?;
        let flag = flag as u8 as char;
        ReconcileState::from_char(flag).ok_or_else(|| BindingError::NativeCallFailed {
            operation: "split reconcile state",
            kind: BackendErrorKind::Misc,
            message: format!("unrecognized reconcile flag {flag:?}"),
        })
    }

    pub fn account(&self) -> Result<Option<Account>> {
        self.handle.with(|live, raw| {
            let account = unsafe { live.native().split_get_account(raw) };
            live.wrap_opt(account, "account").map(Account::from_handle)
        })
    }

    pub fn transaction(&self) -> Result<Option<Transaction>> {
        self.handle.with(|live, raw| {
            let parent = unsafe { live.native().split_get_parent(raw) };
            live.wrap_opt(parent, "transaction")
                .map(Transaction::from_handle)
        })
    }

    /// The native pointer, for engine functions this crate does not wrap.
    ///
    /// # Safety
    /// Valid only while the book is open and the split still exists.
    pub unsafe fn as_raw(&self) -> *mut ffi::Split {
        self.handle.as_ptr()
    }
}
