//! The engine entry points, one method per native function.
//!
//! String conventions follow the C API:
//! - `*const c_char` arguments are NUL-terminated and only borrowed.
//! - `*const c_char` results are owned by the engine and stay valid until the
//!   entity is modified or released; callers copy them immediately.
//! - `*mut c_char` results are owned by the caller and go back through
//!   [`NativeEngine::free_string`].
//!
//! Lookups that return a `*mut GNCPrice` from the price database hand the
//! caller an extra reference which must be dropped with
//! [`NativeEngine::price_unref`].

use std::os::raw::{c_char, c_int, c_uint};

use crate::{
    gboolean, gnc_commodity, gnc_numeric, time64, Account, GNCPrice, GNCPriceDB, GncGUID,
    QofBackendError, QofBook, QofSession, Split, Transaction,
};

#[allow(clippy::missing_safety_doc)]
pub trait NativeEngine: Send + Sync {
    /// Short name used in log events.
    fn label(&self) -> &'static str;

    /// Sets up engine-wide registries. Called before the first book exists.
    fn engine_init(&self);
    /// Tears down engine-wide registries. Called after the last book is gone.
    fn engine_shutdown(&self);

    unsafe fn free_string(&self, text: *mut c_char);

    // ---- sessions ----
    /// A null `book` asks the engine to create one for the session.
    unsafe fn session_new(&self, book: *mut QofBook) -> *mut QofSession;
    unsafe fn session_begin(&self, session: *mut QofSession, uri: *const c_char, mode: c_int);
    unsafe fn session_load(&self, session: *mut QofSession);
    unsafe fn session_save(&self, session: *mut QofSession);
    unsafe fn session_end(&self, session: *mut QofSession);
    /// Releases the session together with the book it owns.
    unsafe fn session_destroy(&self, session: *mut QofSession);
    unsafe fn session_get_book(&self, session: *mut QofSession) -> *mut QofBook;
    /// Returns the pending error and clears it.
    unsafe fn session_pop_error(&self, session: *mut QofSession) -> QofBackendError;
    unsafe fn session_get_error_message(&self, session: *mut QofSession) -> *const c_char;

    // ---- books ----
    fn book_new(&self) -> *mut QofBook;
    unsafe fn book_destroy(&self, book: *mut QofBook);
    unsafe fn book_get_guid(&self, book: *mut QofBook) -> GncGUID;
    unsafe fn book_is_readonly(&self, book: *mut QofBook) -> gboolean;
    unsafe fn book_session_not_saved(&self, book: *mut QofBook) -> gboolean;
    unsafe fn book_mark_session_dirty(&self, book: *mut QofBook);
    unsafe fn book_get_root_account(&self, book: *mut QofBook) -> *mut Account;
    unsafe fn book_count_transactions(&self, book: *mut QofBook) -> c_uint;

    // ---- accounts ----
    unsafe fn account_malloc(&self, book: *mut QofBook) -> *mut Account;
    unsafe fn account_lookup(&self, guid: *const GncGUID, book: *mut QofBook) -> *mut Account;
    unsafe fn account_begin_edit(&self, account: *mut Account);
    unsafe fn account_commit_edit(&self, account: *mut Account);
    unsafe fn account_get_guid(&self, account: *mut Account) -> GncGUID;
    unsafe fn account_get_name(&self, account: *mut Account) -> *const c_char;
    unsafe fn account_set_name(&self, account: *mut Account, name: *const c_char);
    unsafe fn account_get_description(&self, account: *mut Account) -> *const c_char;
    unsafe fn account_set_description(&self, account: *mut Account, text: *const c_char);
    unsafe fn account_get_code(&self, account: *mut Account) -> *const c_char;
    unsafe fn account_set_code(&self, account: *mut Account, code: *const c_char);
    unsafe fn account_get_type(&self, account: *mut Account) -> c_int;
    unsafe fn account_set_type(&self, account: *mut Account, kind: c_int);
    unsafe fn account_get_parent(&self, account: *mut Account) -> *mut Account;
    unsafe fn account_append_child(&self, parent: *mut Account, child: *mut Account);
    unsafe fn account_n_children(&self, account: *mut Account) -> c_int;
    unsafe fn account_nth_child(&self, account: *mut Account, index: c_int) -> *mut Account;
    unsafe fn account_lookup_by_name(
        &self,
        parent: *mut Account,
        name: *const c_char,
    ) -> *mut Account;
    /// Caller-owned colon separated path below the root.
    unsafe fn account_get_full_name(&self, account: *mut Account) -> *mut c_char;
    unsafe fn account_get_balance(&self, account: *mut Account) -> gnc_numeric;
    unsafe fn account_get_cleared_balance(&self, account: *mut Account) -> gnc_numeric;
    unsafe fn account_get_reconciled_balance(&self, account: *mut Account) -> gnc_numeric;
    unsafe fn account_n_splits(&self, account: *mut Account) -> c_int;
    unsafe fn account_nth_split(&self, account: *mut Account, index: c_int) -> *mut Split;

    // ---- transactions ----
    unsafe fn trans_malloc(&self, book: *mut QofBook) -> *mut Transaction;
    unsafe fn trans_lookup(&self, guid: *const GncGUID, book: *mut QofBook) -> *mut Transaction;
    unsafe fn trans_begin_edit(&self, trans: *mut Transaction);
    unsafe fn trans_commit_edit(&self, trans: *mut Transaction);
    unsafe fn trans_rollback_edit(&self, trans: *mut Transaction);
    unsafe fn trans_is_open(&self, trans: *mut Transaction) -> gboolean;
    /// Destroys the transaction and its splits, closing the caller's open edit.
    unsafe fn trans_destroy(&self, trans: *mut Transaction);
    unsafe fn trans_get_guid(&self, trans: *mut Transaction) -> GncGUID;
    unsafe fn trans_get_description(&self, trans: *mut Transaction) -> *const c_char;
    unsafe fn trans_set_description(&self, trans: *mut Transaction, text: *const c_char);
    unsafe fn trans_get_num(&self, trans: *mut Transaction) -> *const c_char;
    unsafe fn trans_set_num(&self, trans: *mut Transaction, num: *const c_char);
    unsafe fn trans_get_notes(&self, trans: *mut Transaction) -> *const c_char;
    unsafe fn trans_set_notes(&self, trans: *mut Transaction, notes: *const c_char);
    unsafe fn trans_get_date_posted(&self, trans: *mut Transaction) -> time64;
    unsafe fn trans_set_date_posted(&self, trans: *mut Transaction, when: time64);
    unsafe fn trans_get_date_entered(&self, trans: *mut Transaction) -> time64;
    unsafe fn trans_count_splits(&self, trans: *mut Transaction) -> c_int;
    unsafe fn trans_get_split(&self, trans: *mut Transaction, index: c_int) -> *mut Split;
    unsafe fn trans_is_balanced(&self, trans: *mut Transaction) -> gboolean;
    unsafe fn trans_get_imbalance_value(&self, trans: *mut Transaction) -> gnc_numeric;

    // ---- splits ----
    unsafe fn split_malloc(&self, book: *mut QofBook) -> *mut Split;
    unsafe fn split_lookup(&self, guid: *const GncGUID, book: *mut QofBook) -> *mut Split;
    unsafe fn split_destroy(&self, split: *mut Split) -> gboolean;
    unsafe fn split_get_guid(&self, split: *mut Split) -> GncGUID;
    unsafe fn split_set_parent(&self, split: *mut Split, trans: *mut Transaction);
    unsafe fn split_get_parent(&self, split: *mut Split) -> *mut Transaction;
    unsafe fn split_set_account(&self, split: *mut Split, account: *mut Account);
    unsafe fn split_get_account(&self, split: *mut Split) -> *mut Account;
    unsafe fn split_get_amount(&self, split: *mut Split) -> gnc_numeric;
    unsafe fn split_set_amount(&self, split: *mut Split, amount: gnc_numeric);
    unsafe fn split_get_value(&self, split: *mut Split) -> gnc_numeric;
    unsafe fn split_set_value(&self, split: *mut Split, value: gnc_numeric);
    unsafe fn split_get_memo(&self, split: *mut Split) -> *const c_char;
    unsafe fn split_set_memo(&self, split: *mut Split, memo: *const c_char);
    unsafe fn split_get_action(&self, split: *mut Split) -> *const c_char;
    unsafe fn split_set_action(&self, split: *mut Split, action: *const c_char);
    unsafe fn split_get_reconcile(&self, split: *mut Split) -> c_char;
    unsafe fn split_set_reconcile(&self, split: *mut Split, flag: c_char);

    // ---- commodities ----
    unsafe fn commodity_lookup(
        &self,
        book: *mut QofBook,
        namespace: *const c_char,
        mnemonic: *const c_char,
    ) -> *mut gnc_commodity;
    unsafe fn commodity_find_or_create(
        &self,
        book: *mut QofBook,
        namespace: *const c_char,
        mnemonic: *const c_char,
    ) -> *mut gnc_commodity;
    unsafe fn commodity_get_namespace(&self, commodity: *mut gnc_commodity) -> *const c_char;
    unsafe fn commodity_get_mnemonic(&self, commodity: *mut gnc_commodity) -> *const c_char;

    // ---- prices ----
    /// Returns a price holding one reference owned by the caller.
    unsafe fn price_create(&self, book: *mut QofBook) -> *mut GNCPrice;
    /// Borrowed; no reference is added.
    unsafe fn price_lookup(&self, guid: *const GncGUID, book: *mut QofBook) -> *mut GNCPrice;
    unsafe fn price_unref(&self, price: *mut GNCPrice);
    unsafe fn price_begin_edit(&self, price: *mut GNCPrice);
    unsafe fn price_commit_edit(&self, price: *mut GNCPrice);
    unsafe fn price_get_guid(&self, price: *mut GNCPrice) -> GncGUID;
    unsafe fn price_set_commodity(&self, price: *mut GNCPrice, commodity: *mut gnc_commodity);
    unsafe fn price_get_commodity(&self, price: *mut GNCPrice) -> *mut gnc_commodity;
    unsafe fn price_set_currency(&self, price: *mut GNCPrice, currency: *mut gnc_commodity);
    unsafe fn price_get_currency(&self, price: *mut GNCPrice) -> *mut gnc_commodity;
    unsafe fn price_set_time(&self, price: *mut GNCPrice, when: time64);
    unsafe fn price_get_time(&self, price: *mut GNCPrice) -> time64;
    unsafe fn price_set_value(&self, price: *mut GNCPrice, value: gnc_numeric);
    unsafe fn price_get_value(&self, price: *mut GNCPrice) -> gnc_numeric;
    unsafe fn price_set_source(&self, price: *mut GNCPrice, source: c_int);
    unsafe fn price_get_source(&self, price: *mut GNCPrice) -> c_int;
    unsafe fn price_set_typestr(&self, price: *mut GNCPrice, kind: *const c_char);
    unsafe fn price_get_typestr(&self, price: *mut GNCPrice) -> *const c_char;
    unsafe fn price_set_source_string(&self, price: *mut GNCPrice, source: *const c_char);
    unsafe fn price_get_source_string(&self, price: *mut GNCPrice) -> *const c_char;
    /// A new unlisted price for the reversed pair, holding one reference the
    /// caller must release.
    unsafe fn price_invert(&self, price: *mut GNCPrice) -> *mut GNCPrice;

    unsafe fn pricedb_get_db(&self, book: *mut QofBook) -> *mut GNCPriceDB;
    unsafe fn pricedb_add_price(&self, db: *mut GNCPriceDB, price: *mut GNCPrice) -> gboolean;
    unsafe fn pricedb_remove_price(&self, db: *mut GNCPriceDB, price: *mut GNCPrice) -> gboolean;
    unsafe fn pricedb_get_num_prices(&self, db: *mut GNCPriceDB) -> c_uint;
    unsafe fn pricedb_lookup_latest(
        &self,
        db: *mut GNCPriceDB,
        commodity: *mut gnc_commodity,
        currency: *mut gnc_commodity,
    ) -> *mut GNCPrice;
    unsafe fn pricedb_lookup_nearest(
        &self,
        db: *mut GNCPriceDB,
        commodity: *mut gnc_commodity,
        currency: *mut gnc_commodity,
        when: time64,
    ) -> *mut GNCPrice;
}
