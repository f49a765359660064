use std::fmt;
use std::sync::Arc;

use gnc_domain::{AccountType, Guid};
use gnc_sys::QofBook;
use tracing::debug;

use crate::account::Account;
use crate::error::{BindingError, Result};
use crate::lifeline::Lifeline;
use crate::marshal::{guid_in, guid_out, to_cstring, truth};
use crate::price::PriceDb;
use crate::split::Split;
use crate::transaction::Transaction;

/// The container of accounts, transactions and prices.
///
/// A book obtained from a [`Session`](crate::Session) is a view that goes
/// stale when the session ends. A book from
/// [`Engine::new_book`](crate::Engine::new_book) owns its native book and
/// releases it on drop.
pub struct Book {
    life: Arc<Lifeline>,
    owned: bool,
}

impl Book {
    pub(crate) fn borrowed(life: Arc<Lifeline>) -> Self {
        Self { life, owned: false }
    }

    pub(crate) fn owning(life: Arc<Lifeline>) -> Self {
        Self { life, owned: true }
    }

    /// False once the session that owns the book has ended.
    pub fn is_open(&self) -> bool {
        self.life.is_alive()
    }

    pub fn guid(&self) -> Result<Guid> {
        let live = self.life.enter("book")?;
        Ok(guid_out(unsafe { live.native().book_get_guid(live.book()) }))
    }

    pub fn root_account(&self) -> Result<Account> {
        let live = self.life.enter("book")?;
        let raw = unsafe { live.native().book_get_root_account(live.book()) };
        Ok(Account::from_handle(live.wrap(raw, "account")?))
    }

    /// Whether the book has changes not yet saved.
    pub fn is_dirty(&self) -> Result<bool> {
        let live = self.life.enter("book")?;
        Ok(truth(unsafe { live.native().book_session_not_saved(live.book()) }))
    }

    pub fn mark_dirty(&self) -> Result<()> {
        let live = self.life.enter("book")?;
        unsafe { live.native().book_mark_session_dirty(live.book()) };
        Ok(())
    }

    pub fn is_readonly(&self) -> Result<bool> {
        let live = self.life.enter("book")?;
        Ok(truth(unsafe { live.native().book_is_readonly(live.book()) }))
    }

    pub fn transaction_count(&self) -> Result<usize> {
        let live = self.life.enter("book")?;
        Ok(unsafe { live.native().book_count_transactions(live.book()) } as usize)
    }

    /// No accounts below the root and no transactions.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.root_account()?.n_children()? == 0 && self.transaction_count()? == 0)
    }

    pub fn price_db(&self) -> Result<PriceDb> {
        let live = self.life.enter("book")?;
        let raw = unsafe { live.native().pricedb_get_db(live.book()) };
        Ok(PriceDb::from_handle(live.wrap(raw, "price database")?))
    }

    /// Creates an account under `parent` and returns it committed.
    pub fn create_account(&self, parent: &Account, name: &str, kind: AccountType) -> Result<Account> {
        if !Arc::ptr_eq(parent.handle().life(), &self.life) {
            return Err(BindingError::ForeignEntity(format!(
                "parent of `{name}` belongs to a different book"
            )));
        }
        let c_name = to_cstring(name, "account name")?;
        let account = parent.handle().try_with(|live, parent_raw| {
            let native = live.native();
            unsafe {
                let raw = native.account_malloc(live.book());
                let handle = live.wrap(raw, "account")?;
                native.account_begin_edit(raw);
                native.account_set_name(raw, c_name.as_ptr());
                native.account_set_type(raw, kind.code());
                native.account_commit_edit(raw);
                native.account_append_child(parent_raw, raw);
                Ok(handle)
            }
        })?;
        debug!(name, %kind, "account created");
        Ok(Account::from_handle(account))
    }

    /// A new, empty transaction. Populate it through
    /// [`Transaction::edit`]; committing it with no splits destroys it.
    pub fn create_transaction(&self) -> Result<Transaction> {
        let live = self.life.enter("book")?;
        let raw = unsafe { live.native().trans_malloc(live.book()) };
        Ok(Transaction::from_handle(live.wrap(raw, "transaction")?))
    }

    pub fn account_by_guid(&self, guid: &Guid) -> Result<Option<Account>> {
        let live = self.life.enter("book")?;
        let raw_guid = guid_in(guid);
        let raw = unsafe { live.native().account_lookup(&raw_guid, live.book()) };
        Ok(live.wrap_opt(raw, "account").map(Account::from_handle))
    }

    pub fn transaction_by_guid(&self, guid: &Guid) -> Result<Option<Transaction>> {
        let live = self.life.enter("book")?;
        let raw_guid = guid_in(guid);
        let raw = unsafe { live.native().trans_lookup(&raw_guid, live.book()) };
        Ok(live.wrap_opt(raw, "transaction").map(Transaction::from_handle))
    }

    pub fn split_by_guid(&self, guid: &Guid) -> Result<Option<Split>> {
        let live = self.life.enter("book")?;
        let raw_guid = guid_in(guid);
        let raw = unsafe { live.native().split_lookup(&raw_guid, live.book()) };
        Ok(live.wrap_opt(raw, "split").map(Split::from_handle))
    }

    /// The native book pointer, for calling engine functions this crate does
    /// not wrap. Null once the book is closed.
    pub fn as_raw(&self) -> *mut QofBook {
        match self.life.enter("book") {
            Ok(live) => live.book(),
            Err(_) => std::ptr::null_mut(),
        }
    }
}

impl fmt::Debug for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Book")
            .field("open", &self.is_open())
            .field("owned", &self.owned)
            .finish()
    }
}

impl Drop for Book {
    fn drop(&mut self) {
        if self.owned {
            let released = self
                .life
                .release(|native, book| unsafe { native.book_destroy(book) });
            if released.is_some() {
                debug!("standalone book released");
            }
        }
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use gnc_domain::{Commodity, Numeric, Time64};

    use crate::{AccountType, Engine, PriceQuote};

    #[test]
    fn churn_does_not_grow_the_liveness_table() {
        let engine = Engine::simulated();
        let book = engine.new_book().unwrap();
        let root = book.root_account().unwrap();
        let kept = book.create_account(&root, "Kept", AccountType::Bank).unwrap();

        let db = book.price_db().unwrap();
        let quote = PriceQuote::new(
            Commodity::new("NASDAQ", "ACME"),
            Commodity::currency("USD"),
            Time64::from_secs(0),
            Numeric::from_integer(1),
        );
        for _ in 0..300 {
            let price = db.create_price(&quote).unwrap();
            db.remove_price(&price).unwrap();
        }
        assert_eq!(book.life.tracked(), 3);

        for idx in 0..300 {
            book.create_account(&root, &format!("Temp {idx}"), AccountType::Asset)
                .unwrap();
        }
        assert!(book.life.tracked() < 100, "tracked {}", book.life.tracked());
        assert_eq!(root.lookup_by_name("Kept").unwrap(), Some(kept.clone()));
        assert_eq!(kept.name().unwrap(), "Kept");
    }
}
