//! Transactions and the scoped edit that changes them.
//!
//! All changes to a transaction or its splits happen inside a
//! [`TransactionEdit`]. Ending the edit either commits or rolls back; an
//! edit dropped without either is rolled back.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::os::raw::c_char;

use chrono::NaiveDate;
use gnc_domain::{Guid, IntoNumeric, Numeric, ReconcileState, Time64};
use gnc_sys as ffi;
use tracing::{debug, warn};

use crate::account::Account;
use crate::error::{BackendErrorKind, BindingError, Result};
use crate::iter::TransactionSplits;
use crate::lifeline::Handle;
use crate::marshal::{copy_str, guid_out, numeric_out, to_cstring, truth};
use crate::split::Split;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    handle: Handle<ffi::Transaction>,
}

impl Transaction {
    pub(crate) fn from_handle(handle: Handle<ffi::Transaction>) -> Self {
        Self { handle }
    }

    pub fn guid(&self) -> Result<Guid> {
        self.handle
            .with(|live, raw| guid_out(unsafe { live.native().trans_get_guid(raw) }))
    }

    pub fn description(&self) -> Result<String> {
        self.handle
            .with(|live, raw| unsafe { copy_str(live.native().trans_get_description(raw)) })
    }

    pub fn num(&self) -> Result<String> {
        self.handle
            .with(|live, raw| unsafe { copy_str(live.native().trans_get_num(raw)) })
    }

    pub fn notes(&self) -> Result<String> {
        self.handle
            .with(|live, raw| unsafe { copy_str(live.native().trans_get_notes(raw)) })
    }

    pub fn date_posted(&self) -> Result<Time64> {
        self.handle.with(|live, raw| {
            Time64::from_secs(unsafe { live.native().trans_get_date_posted(raw) })
        })
    }

    pub fn date_entered(&self) -> Result<Time64> {
        self.handle.with(|live, raw| {
            Time64::from_secs(unsafe { live.native().trans_get_date_entered(raw) })
        })
    }

    pub fn split_count(&self) -> Result<usize> {
        self.handle
            .with(|live, raw| unsafe { live.native().trans_count_splits(raw) }.max(0) as usize)
    }

    pub fn nth_split(&self, index: usize) -> Result<Option<Split>> {
        let Ok(index) = i32::try_from(index) else {
            return Ok(None);
        };
        self.handle.with(|live, raw| {
            let split = unsafe { live.native().trans_get_split(raw, index) };
            live.wrap_opt(split, "split").map(Split::from_handle)
        })
    }

    pub fn splits(&self) -> TransactionSplits {
        TransactionSplits::new(self.clone())
    }

    /// Split values sum to zero.
    pub fn is_balanced(&self) -> Result<bool> {
        self.handle
            .with(|live, raw| truth(unsafe { live.native().trans_is_balanced(raw) }))
    }

    pub fn imbalance_value(&self) -> Result<Numeric> {
        self.handle.try_with(|live, raw| {
            numeric_out(unsafe { live.native().trans_get_imbalance_value(raw) })
        })
    }

    /// Whether an edit is open on the engine side.
    pub fn is_open(&self) -> Result<bool> {
        self.handle
            .with(|live, raw| truth(unsafe { live.native().trans_is_open(raw) }))
    }

    /// Opens the transaction for editing. A second edit while one is open
    /// fails with [`BindingError::EditInProgress`].
    pub fn edit(&self) -> Result<TransactionEdit<'_>> {
        let addr = self.handle.addr();
        self.handle.life().claim_edit(addr, "transaction")?;
        let begun = self
            .handle
            .with(|live, raw| unsafe { live.native().trans_begin_edit(raw) });
        if let Err(err) = begun {
            self.handle.life().release_edit(addr);
            return Err(err);
        }
        Ok(TransactionEdit {
            trans: self,
            created: RefCell::new(Vec::new()),
            done: false,
        })
    }

    /// The native pointer, for engine functions this crate does not wrap.
    ///
    /// # Safety
    /// Valid only while the book is open and the transaction still exists.
    pub unsafe fn as_raw(&self) -> *mut ffi::Transaction {
        self.handle.as_ptr()
    }
}

/// Everything needed to add one split.
#[derive(Clone, Debug)]
pub struct SplitSpec {
    pub account: Account,
    pub amount: Numeric,
    pub value: Numeric,
    pub memo: String,
    pub action: String,
    pub reconcile: ReconcileState,
}

impl SplitSpec {
    /// A split whose value equals its amount, as for single-currency books.
    pub fn new(account: &Account, amount: Numeric) -> Self {
        Self {
            account: account.clone(),
            amount,
            value: amount,
            memo: String::new(),
            action: String::new(),
            reconcile: ReconcileState::NotReconciled,
        }
    }

    pub fn value(mut self, value: Numeric) -> Self {
        self.value = value;
        self
    }

    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    pub fn reconcile(mut self, state: ReconcileState) -> Self {
        self.reconcile = state;
        self
    }
}

/// How a committed edit left the transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    Kept,
    /// The transaction had no splits and the engine destroyed it.
    Destroyed,
}

#[derive(Debug)]
pub struct TransactionEdit<'a> {
    trans: &'a Transaction,
    created: RefCell<Vec<usize>>,
    done: bool,
}

impl<'a> TransactionEdit<'a> {
    pub fn transaction(&self) -> &'a Transaction {
        self.trans
    }

    fn set_text(
        &self,
        value: &str,
        what: &str,
        setter: fn(&dyn ffi::NativeEngine, *mut ffi::Transaction, *const c_char),
    ) -> Result<()> {
        let text = to_cstring(value, what)?;
        self.trans
            .handle
            .with(|live, raw| setter(live.native(), raw, text.as_ptr()))
    }

    pub fn set_description(&self, description: &str) -> Result<()> {
        self.set_text(description, "transaction description", |native, raw, text| unsafe {
            native.trans_set_description(raw, text)
        })
    }

    pub fn set_num(&self, num: &str) -> Result<()> {
        self.set_text(num, "transaction number", |native, raw, text| unsafe {
            native.trans_set_num(raw, text)
        })
    }

    pub fn set_notes(&self, notes: &str) -> Result<()> {
        self.set_text(notes, "transaction notes", |native, raw, text| unsafe {
            native.trans_set_notes(raw, text)
        })
    }

    pub fn set_date_posted(&self, when: Time64) -> Result<()> {
        self.trans
            .handle
            .with(|live, raw| unsafe { live.native().trans_set_date_posted(raw, when.secs()) })
    }

    /// Posts on a calendar day at the timezone-neutral time of day.
    pub fn set_posted_date(&self, date: NaiveDate) -> Result<()> {
        self.set_date_posted(Time64::from_date_neutral(date))
    }

    pub fn set_posted_ymd(&self, year: i32, month: u32, day: u32) -> Result<()> {
        self.set_date_posted(Time64::from_ymd_neutral(year, month, day)?)
    }

    /// Creates a split in this transaction against `spec.account`.
    pub fn add_split(&self, spec: &SplitSpec) -> Result<Split> {
        let memo = to_cstring(&spec.memo, "split memo")?;
        let action = to_cstring(&spec.action, "split action")?;
        let handle = self.trans.handle.try_with(|live, trans_raw| {
            let account_raw = live.check(spec.account.handle())?;
            let native = live.native();
            unsafe {
                let raw = native.split_malloc(live.book());
                let handle = live.wrap(raw, "split")?;
                native.split_set_parent(raw, trans_raw);
                native.split_set_account(raw, account_raw);
                native.split_set_amount(raw, spec.amount.into());
                native.split_set_value(raw, spec.value.into());
                native.split_set_memo(raw, memo.as_ptr());
                native.split_set_action(raw, action.as_ptr());
                native.split_set_reconcile(raw, spec.reconcile.as_char() as c_char);
                Ok(handle)
            }
        })?;
        self.created.borrow_mut().push(handle.addr());
        Ok(Split::from_handle(handle))
    }

    /// Edits one of this transaction's splits.
    pub fn split<'e>(&'e self, split: &Split) -> Result<SplitEdit<'e>> {
        self.trans.handle.try_with(|live, trans_raw| {
            let split_raw = live.check(split.handle())?;
            let parent = unsafe { live.native().split_get_parent(split_raw) };
            if parent != trans_raw {
                return Err(BindingError::ForeignEntity(
                    "split belongs to a different transaction".into(),
                ));
            }
            Ok(())
        })?;
        Ok(SplitEdit {
            split: split.clone(),
            _edit: PhantomData,
        })
    }

    /// Destroys one of this transaction's splits. Existing views of it go
    /// stale, even if the edit is later rolled back. If the engine keeps the
    /// split, as it does for read-only transactions, nothing changes and
    /// the call fails with [`BindingError::NativeCallFailed`].
    pub fn remove_split(&self, split: &Split) -> Result<()> {
        self.trans.handle.try_with(|live, trans_raw| {
            let split_raw = live.check(split.handle())?;
            let native = live.native();
            unsafe {
                if native.split_get_parent(split_raw) != trans_raw {
                    return Err(BindingError::ForeignEntity(
                        "split belongs to a different transaction".into(),
                    ));
                }
                if !truth(native.split_destroy(split_raw)) {
                    return Err(BindingError::NativeCallFailed {
                        operation: "split destroy",
                        kind: BackendErrorKind::ReadOnly,
                        message: "the engine kept the split".into(),
                    });
                }
            }
            live.retire(split.handle().addr());
            Ok(())
        })?;
        let addr = split.handle().addr();
        self.created.borrow_mut().retain(|created| *created != addr);
        Ok(())
    }

    /// Commits the changes. The engine destroys a transaction that is left
    /// without splits; its views then go stale and
    /// [`CommitOutcome::Destroyed`] is returned.
    pub fn commit(mut self) -> Result<CommitOutcome> {
        self.done = true;
        let handle = &self.trans.handle;
        let committed = handle.with(|live, raw| {
            let native = live.native();
            let emptied = unsafe { native.trans_count_splits(raw) } == 0;
            unsafe { native.trans_commit_edit(raw) };
            if emptied {
                live.retire(handle.addr());
                CommitOutcome::Destroyed
            } else {
                CommitOutcome::Kept
            }
        });
        handle.life().release_edit(handle.addr());
        if let Ok(CommitOutcome::Destroyed) = committed {
            debug!("transaction without splits destroyed on commit");
        }
        committed
    }

    /// Restores the transaction to its state when the edit began. Splits
    /// added during the edit are released.
    pub fn rollback(mut self) -> Result<()> {
        self.roll_back()
    }

    /// Destroys the transaction and all of its splits. If the engine keeps
    /// the transaction, the edit ends as a commit and nothing goes stale.
    pub fn destroy(mut self) -> Result<()> {
        self.done = true;
        let handle = &self.trans.handle;
        let destroyed = handle.try_with(|live, raw| unsafe {
            let native = live.native();
            let guid = native.trans_get_guid(raw);
            let splits: Vec<usize> = (0..native.trans_count_splits(raw))
                .map(|index| native.trans_get_split(raw, index) as usize)
                .filter(|addr| *addr != 0)
                .collect();
            native.trans_destroy(raw);
            if !native.trans_lookup(&guid, live.book()).is_null() {
                return Err(BindingError::NativeCallFailed {
                    operation: "transaction destroy",
                    kind: BackendErrorKind::ReadOnly,
                    message: "the engine kept the transaction".into(),
                });
            }
            for addr in splits {
                live.retire(addr);
            }
            live.retire(handle.addr());
            Ok(())
        });
        handle.life().release_edit(handle.addr());
        if destroyed.is_ok() {
            debug!("transaction destroyed");
        }
        destroyed
    }

    fn roll_back(&mut self) -> Result<()> {
        self.done = true;
        let handle = &self.trans.handle;
        let created = std::mem::take(&mut *self.created.borrow_mut());
        let rolled = handle.with(|live, raw| {
            for addr in &created {
                live.retire(*addr);
            }
            unsafe { live.native().trans_rollback_edit(raw) }
        });
        handle.life().release_edit(handle.addr());
        rolled
    }
}

impl Drop for TransactionEdit<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        warn!("transaction edit dropped without commit; rolling back");
        if let Err(err) = self.roll_back() {
            debug!(error = %err, "rollback after drop failed");
        }
    }
}

/// Changes to one split, valid while its transaction edit is open.
pub struct SplitEdit<'e> {
    split: Split,
    _edit: PhantomData<&'e ()>,
}

impl SplitEdit<'_> {
    pub fn split(&self) -> &Split {
        &self.split
    }

    pub fn set_amount(&self, amount: impl IntoNumeric) -> Result<()> {
        let amount = amount.into_numeric()?;
        self.split
            .handle()
            .with(|live, raw| unsafe { live.native().split_set_amount(raw, amount.into()) })
    }

    pub fn set_value(&self, value: impl IntoNumeric) -> Result<()> {
        let value = value.into_numeric()?;
        self.split
            .handle()
            .with(|live, raw| unsafe { live.native().split_set_value(raw, value.into()) })
    }

    pub fn set_memo(&self, memo: &str) -> Result<()> {
        let memo = to_cstring(memo, "split memo")?;
        self.split
            .handle()
            .with(|live, raw| unsafe { live.native().split_set_memo(raw, memo.as_ptr()) })
    }

    pub fn set_action(&self, action: &str) -> Result<()> {
        let action = to_cstring(action, "split action")?;
        self.split
            .handle()
            .with(|live, raw| unsafe { live.native().split_set_action(raw, action.as_ptr()) })
    }

    pub fn set_reconcile(&self, state: ReconcileState) -> Result<()> {
        self.split.handle().with(|live, raw| unsafe {
            live.native()
                .split_set_reconcile(raw, state.as_char() as c_char)
        })
    }

    /// Moves the split to another account of the same book.
    pub fn set_account(&self, account: &Account) -> Result<()> {
        self.split.handle().try_with(|live, raw| {
            let account_raw = live.check(account.handle())?;
            unsafe { live.native().split_set_account(raw, account_raw) };
            Ok(())
        })
    }
}
