use std::os::raw::c_char;

use gnc_domain::{AccountType, Guid, Numeric};
use gnc_sys as ffi;
use tracing::debug;

use crate::error::{BindingError, Result};
use crate::iter::{AccountSplits, Children, Descendants};
use crate::lifeline::Handle;
use crate::marshal::{copy_str, guid_out, numeric_out, take_str, to_cstring};
use crate::split::Split;

/// A view of one account in an open book.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    handle: Handle<ffi::Account>,
}

impl Account {
    pub(crate) fn from_handle(handle: Handle<ffi::Account>) -> Self {
        Self { handle }
    }

    pub(crate) fn handle(&self) -> &Handle<ffi::Account> {
        &self.handle
    }

    pub fn guid(&self) -> Result<Guid> {
        self.handle
            .with(|live, raw| guid_out(unsafe { live.native().account_get_guid(raw) }))
    }

    pub fn name(&self) -> Result<String> {
        self.handle
            .with(|live, raw| unsafe { copy_str(live.native().account_get_name(raw)) })
    }

    /// Colon separated path from the top-level account down to this one.
    pub fn full_name(&self) -> Result<String> {
        self.handle.with(|live, raw| unsafe {
            take_str(live.native(), live.native().account_get_full_name(raw))
        })
    }

    pub fn description(&self) -> Result<String> {
        self.handle
            .with(|live, raw| unsafe { copy_str(live.native().account_get_description(raw)) })
    }

    pub fn code(&self) -> Result<String> {
        self.handle
            .with(|live, raw| unsafe { copy_str(live.native().account_get_code(raw)) })
    }

    /// `None` when the engine reports no valid type.
    pub fn account_type(&self) -> Result<Option<AccountType>> {
        self.handle.with(|live, raw| {
            AccountType::from_code(unsafe { live.native().account_get_type(raw) })
        })
    }

    pub fn is_root(&self) -> Result<bool> {
        Ok(self.parent()?.is_none() && self.account_type()? == Some(AccountType::Root))
    }

    pub fn parent(&self) -> Result<Option<Account>> {
        self.handle.with(|live, raw| {
            let parent = unsafe { live.native().account_get_parent(raw) };
            live.wrap_opt(parent, "account").map(Account::from_handle)
        })
    }

    pub fn n_children(&self) -> Result<usize> {
        self.handle
            .with(|live, raw| unsafe { live.native().account_n_children(raw) }.max(0) as usize)
    }

    pub fn nth_child(&self, index: usize) -> Result<Option<Account>> {
        let Ok(index) = i32::try_from(index) else {
            return Ok(None);
        };
        self.handle.with(|live, raw| {
            let child = unsafe { live.native().account_nth_child(raw, index) };
            live.wrap_opt(child, "account").map(Account::from_handle)
        })
    }

    /// Direct children in engine order. Each call starts from the first child.
    pub fn children(&self) -> Children {
        Children::new(self.clone())
    }

    /// Every account below this one, depth first.
    pub fn descendants(&self) -> Descendants {
        Descendants::new(self.clone())
    }

    /// Searches direct children first, then each child's subtree.
    pub fn lookup_by_name(&self, name: &str) -> Result<Option<Account>> {
        let c_name = to_cstring(name, "account name")?;
        self.handle.with(|live, raw| {
            let hit = unsafe { live.native().account_lookup_by_name(raw, c_name.as_ptr()) };
            live.wrap_opt(hit, "account").map(Account::from_handle)
        })
    }

    pub fn split_count(&self) -> Result<usize> {
        self.handle
            .with(|live, raw| unsafe { live.native().account_n_splits(raw) }.max(0) as usize)
    }

    pub fn nth_split(&self, index: usize) -> Result<Option<Split>> {
        let Ok(index) = i32::try_from(index) else {
            return Ok(None);
        };
        self.handle.with(|live, raw| {
            let split = unsafe { live.native().account_nth_split(raw, index) };
            live.wrap_opt(split, "split").map(Split::from_handle)
        })
    }

    pub fn splits(&self) -> AccountSplits {
        AccountSplits::new(self.clone())
    }

    pub fn balance(&self) -> Result<Numeric> {
        self.handle
            .try_with(|live, raw| numeric_out(unsafe { live.native().account_get_balance(raw) }))
    }

    pub fn cleared_balance(&self) -> Result<Numeric> {
        self.handle.try_with(|live, raw| {
            numeric_out(unsafe { live.native().account_get_cleared_balance(raw) })
        })
    }

    pub fn reconciled_balance(&self) -> Result<Numeric> {
        self.handle.try_with(|live, raw| {
            numeric_out(unsafe { live.native().account_get_reconciled_balance(raw) })
        })
    }

    /// Opens an edit. Only one edit per account may be open at a time.
    pub fn edit(&self) -> Result<AccountEdit<'_>> {
        self.handle
            .life()
            .claim_edit(self.handle.addr(), "account")?;
        let begun = self
            .handle
            .with(|live, raw| unsafe { live.native().account_begin_edit(raw) });
        if let Err(err) = begun {
            self.handle.life().release_edit(self.handle.addr());
            return Err(err);
        }
        Ok(AccountEdit {
            account: self,
            done: false,
        })
    }

    /// Moves `child` (with its subtree) under this account.
    pub fn append_child(&self, child: &Account) -> Result<()> {
        if !self.handle.same_book(&child.handle) {
            return Err(BindingError::ForeignEntity(
                "child account belongs to a different book".into(),
            ));
        }
        self.handle.try_with(|live, raw| {
            let native = live.native();
            let child_raw = live.check(&child.handle)?;
            unsafe {
                if native.account_get_parent(child_raw).is_null()
                    && native.account_get_type(child_raw) == AccountType::Root.code()
                {
                    return Err(BindingError::InvalidArgument(
                        "the root account cannot be reparented".into(),
                    ));
                }
                let mut cursor = raw;
                while !cursor.is_null() {
                    if cursor == child_raw {
                        return Err(BindingError::InvalidArgument(
                            "an account cannot become its own descendant".into(),
                        ));
                    }
                    cursor = native.account_get_parent(cursor);
                }
                native.account_append_child(raw, child_raw);
            }
            Ok(())
        })
    }

    /// The native pointer, for engine functions this crate does not wrap.
    ///
    /// # Safety
    /// The pointer is only valid while the book is open and the account has
    /// not been destroyed; nothing checks either once it leaves this call.
    pub unsafe fn as_raw(&self) -> *mut ffi::Account {
        self.handle.as_ptr()
    }
}

/// An open account edit. Committed by [`AccountEdit::commit`] or on drop;
/// the engine has no rollback for accounts.
pub struct AccountEdit<'a> {
    account: &'a Account,
    done: bool,
}

impl AccountEdit<'_> {
    fn set_text(
        &self,
        value: &str,
        what: &str,
        setter: fn(&dyn ffi::NativeEngine, *mut ffi::Account, *const c_char),
    ) -> Result<()> {
        let text = to_cstring(value, what)?;
        self.account
            .handle
            .with(|live, raw| setter(live.native(), raw, text.as_ptr()))
    }

    pub fn set_name(&self, name: &str) -> Result<()> {
        self.set_text(name, "account name", |native, raw, text| unsafe {
            native.account_set_name(raw, text)
        })
    }

    pub fn set_description(&self, description: &str) -> Result<()> {
        self.set_text(description, "account description", |native, raw, text| unsafe {
            native.account_set_description(raw, text)
        })
    }

    pub fn set_code(&self, code: &str) -> Result<()> {
        self.set_text(code, "account code", |native, raw, text| unsafe {
            native.account_set_code(raw, text)
        })
    }

    pub fn set_type(&self, kind: AccountType) -> Result<()> {
        if kind == AccountType::Root {
            return Err(BindingError::InvalidArgument(
                "only the book's root account may have the root type".into(),
            ));
        }
        self.account
            .handle
            .with(|live, raw| unsafe { live.native().account_set_type(raw, kind.code()) })
    }

    pub fn commit(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        if self.done {
            return Ok(());
        }
        self.done = true;
        let handle = &self.account.handle;
        let committed = handle.with(|live, raw| unsafe { live.native().account_commit_edit(raw) });
        handle.life().release_edit(handle.addr());
        committed
    }
}

impl Drop for AccountEdit<'_> {
    fn drop(&mut self) {
        if !self.done {
            debug!("account edit dropped without commit; committing");
            if let Err(err) = self.finish() {
                debug!(error = %err, "account edit could not be committed");
            }
        }
    }
}
