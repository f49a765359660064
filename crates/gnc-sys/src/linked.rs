//! `extern "C"` declarations against libgnc-engine (5.x) and the
//! [`NativeEngine`] implementation that forwards to them.
//!
//! The engine keeps process-wide registries, so at most one `LinkedEngine`
//! exists per process; see [`LinkedEngine::claim`].

use std::os::raw::{c_char, c_int, c_uint, c_void};
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    gboolean, gnc_commodity, gnc_commodity_table, gnc_numeric, time64, Account, GList,
    GNCPrice, GNCPriceDB, GncGUID, NativeEngine, QofBackendError, QofBook, QofCollection,
    QofSession, Split, Transaction,
};

type QofPercentageFunc = Option<unsafe extern "C" fn(message: *const c_char, percent: f64)>;

const GNC_ID_TRANS: &[u8] = b"Trans\0";
const DEFAULT_COMMODITY_FRACTION: c_int = 100;

extern "C" {
    fn g_free(mem: *mut c_void);
    fn g_list_nth_data(list: *mut GList, n: c_uint) -> *mut c_void;
    fn g_list_free(list: *mut GList);

    fn gnc_engine_init(argc: c_int, argv: *mut *mut c_char);
    fn gnc_engine_shutdown();

    fn qof_entity_get_guid(entity: *const c_void) -> *const GncGUID;

    fn qof_session_new(book: *mut QofBook) -> *mut QofSession;
    fn qof_session_begin(session: *mut QofSession, uri: *const c_char, mode: c_int);
    fn qof_session_load(session: *mut QofSession, progress: QofPercentageFunc);
    fn qof_session_save(session: *mut QofSession, progress: QofPercentageFunc);
    fn qof_session_end(session: *mut QofSession);
    fn qof_session_destroy(session: *mut QofSession);
    fn qof_session_get_book(session: *const QofSession) -> *mut QofBook;
    fn qof_session_pop_error(session: *mut QofSession) -> QofBackendError;
    fn qof_session_get_error_message(session: *const QofSession) -> *const c_char;

    fn qof_book_new() -> *mut QofBook;
    fn qof_book_destroy(book: *mut QofBook);
    fn qof_book_is_readonly(book: *const QofBook) -> gboolean;
    fn qof_book_session_not_saved(book: *const QofBook) -> gboolean;
    fn qof_book_mark_session_dirty(book: *mut QofBook);
    fn qof_book_get_collection(book: *const QofBook, kind: *const c_char) -> *mut QofCollection;
    fn qof_collection_count(collection: *const QofCollection) -> c_uint;
    fn gnc_book_get_root_account(book: *mut QofBook) -> *mut Account;

    fn xaccMallocAccount(book: *mut QofBook) -> *mut Account;
    fn xaccAccountLookup(guid: *const GncGUID, book: *mut QofBook) -> *mut Account;
    fn xaccAccountBeginEdit(account: *mut Account);
    fn xaccAccountCommitEdit(account: *mut Account);
    fn xaccAccountGetName(account: *const Account) -> *const c_char;
    fn xaccAccountSetName(account: *mut Account, name: *const c_char);
    fn xaccAccountGetDescription(account: *const Account) -> *const c_char;
    fn xaccAccountSetDescription(account: *mut Account, text: *const c_char);
    fn xaccAccountGetCode(account: *const Account) -> *const c_char;
    fn xaccAccountSetCode(account: *mut Account, code: *const c_char);
    fn xaccAccountGetType(account: *const Account) -> c_int;
    fn xaccAccountSetType(account: *mut Account, kind: c_int);
    fn gnc_account_get_parent(account: *const Account) -> *mut Account;
    fn gnc_account_append_child(parent: *mut Account, child: *mut Account);
    fn gnc_account_n_children(account: *const Account) -> c_int;
    fn gnc_account_nth_child(account: *const Account, index: c_int) -> *mut Account;
    fn gnc_account_lookup_by_name(parent: *const Account, name: *const c_char) -> *mut Account;
    fn gnc_account_get_full_name(account: *const Account) -> *mut c_char;
    fn xaccAccountGetBalance(account: *const Account) -> gnc_numeric;
    fn xaccAccountGetClearedBalance(account: *const Account) -> gnc_numeric;
    fn xaccAccountGetReconciledBalance(account: *const Account) -> gnc_numeric;
    fn xaccAccountGetSplitsSize(account: *const Account) -> usize;
    fn xaccAccountGetSplitList(account: *const Account) -> *mut GList;

    fn xaccMallocTransaction(book: *mut QofBook) -> *mut Transaction;
    fn xaccTransLookup(guid: *const GncGUID, book: *mut QofBook) -> *mut Transaction;
    fn xaccTransBeginEdit(trans: *mut Transaction);
    fn xaccTransCommitEdit(trans: *mut Transaction);
    fn xaccTransRollbackEdit(trans: *mut Transaction);
    fn xaccTransIsOpen(trans: *const Transaction) -> gboolean;
    fn xaccTransDestroy(trans: *mut Transaction);
    fn xaccTransGetDescription(trans: *const Transaction) -> *const c_char;
    fn xaccTransSetDescription(trans: *mut Transaction, text: *const c_char);
    fn xaccTransGetNum(trans: *const Transaction) -> *const c_char;
    fn xaccTransSetNum(trans: *mut Transaction, num: *const c_char);
    fn xaccTransGetNotes(trans: *const Transaction) -> *const c_char;
    fn xaccTransSetNotes(trans: *mut Transaction, notes: *const c_char);
    fn xaccTransGetDate(trans: *const Transaction) -> time64;
    fn xaccTransSetDatePostedSecs(trans: *mut Transaction, when: time64);
    fn xaccTransGetDateEntered(trans: *const Transaction) -> time64;
    fn xaccTransCountSplits(trans: *const Transaction) -> c_int;
    fn xaccTransGetSplit(trans: *const Transaction, index: c_int) -> *mut Split;
    fn xaccTransIsBalanced(trans: *const Transaction) -> gboolean;
    fn xaccTransGetImbalanceValue(trans: *const Transaction) -> gnc_numeric;

    fn xaccMallocSplit(book: *mut QofBook) -> *mut Split;
    fn xaccSplitLookup(guid: *const GncGUID, book: *mut QofBook) -> *mut Split;
    fn xaccSplitDestroy(split: *mut Split) -> gboolean;
    fn xaccSplitSetParent(split: *mut Split, trans: *mut Transaction);
    fn xaccSplitGetParent(split: *const Split) -> *mut Transaction;
    fn xaccSplitSetAccount(split: *mut Split, account: *mut Account);
    fn xaccSplitGetAccount(split: *const Split) -> *mut Account;
    fn xaccSplitGetAmount(split: *const Split) -> gnc_numeric;
    fn xaccSplitSetAmount(split: *mut Split, amount: gnc_numeric);
    fn xaccSplitGetValue(split: *const Split) -> gnc_numeric;
    fn xaccSplitSetValue(split: *mut Split, value: gnc_numeric);
    fn xaccSplitGetMemo(split: *const Split) -> *const c_char;
    fn xaccSplitSetMemo(split: *mut Split, memo: *const c_char);
    fn xaccSplitGetAction(split: *const Split) -> *const c_char;
    fn xaccSplitSetAction(split: *mut Split, action: *const c_char);
    fn xaccSplitGetReconcile(split: *const Split) -> c_char;
    fn xaccSplitSetReconcile(split: *mut Split, flag: c_char);

    fn gnc_commodity_table_get_table(book: *mut QofBook) -> *mut gnc_commodity_table;
    fn gnc_commodity_table_lookup(
        table: *const gnc_commodity_table,
        namespace: *const c_char,
        mnemonic: *const c_char,
    ) -> *mut gnc_commodity;
    fn gnc_commodity_table_insert(
        table: *mut gnc_commodity_table,
        commodity: *mut gnc_commodity,
    ) -> *mut gnc_commodity;
    fn gnc_commodity_new(
        book: *mut QofBook,
        fullname: *const c_char,
        namespace: *const c_char,
        mnemonic: *const c_char,
        cusip: *const c_char,
        fraction: c_int,
    ) -> *mut gnc_commodity;
    fn gnc_commodity_get_namespace(commodity: *const gnc_commodity) -> *const c_char;
    fn gnc_commodity_get_mnemonic(commodity: *const gnc_commodity) -> *const c_char;

    fn gnc_price_create(book: *mut QofBook) -> *mut GNCPrice;
    fn gnc_price_lookup(guid: *const GncGUID, book: *mut QofBook) -> *mut GNCPrice;
    fn gnc_price_unref(price: *mut GNCPrice);
    fn gnc_price_begin_edit(price: *mut GNCPrice);
    fn gnc_price_commit_edit(price: *mut GNCPrice);
    fn gnc_price_set_commodity(price: *mut GNCPrice, commodity: *mut gnc_commodity);
    fn gnc_price_get_commodity(price: *const GNCPrice) -> *mut gnc_commodity;
    fn gnc_price_set_currency(price: *mut GNCPrice, currency: *mut gnc_commodity);
    fn gnc_price_get_currency(price: *const GNCPrice) -> *mut gnc_commodity;
    fn gnc_price_set_time64(price: *mut GNCPrice, when: time64);
    fn gnc_price_get_time64(price: *const GNCPrice) -> time64;
    fn gnc_price_set_value(price: *mut GNCPrice, value: gnc_numeric);
    fn gnc_price_get_value(price: *const GNCPrice) -> gnc_numeric;
    fn gnc_price_set_source(price: *mut GNCPrice, source: c_int);
    fn gnc_price_get_source(price: *const GNCPrice) -> c_int;
    fn gnc_price_set_typestr(price: *mut GNCPrice, kind: *const c_char);
    fn gnc_price_get_typestr(price: *const GNCPrice) -> *const c_char;
    fn gnc_price_set_source_string(price: *mut GNCPrice, source: *const c_char);
    fn gnc_price_get_source_string(price: *const GNCPrice) -> *const c_char;
    fn gnc_price_invert(price: *mut GNCPrice) -> *mut GNCPrice;

    fn gnc_pricedb_get_db(book: *mut QofBook) -> *mut GNCPriceDB;
    fn gnc_pricedb_add_price(db: *mut GNCPriceDB, price: *mut GNCPrice) -> gboolean;
    fn gnc_pricedb_remove_price(db: *mut GNCPriceDB, price: *mut GNCPrice) -> gboolean;
    fn gnc_pricedb_get_num_prices(db: *mut GNCPriceDB) -> c_uint;
    fn gnc_pricedb_lookup_latest(
        db: *mut GNCPriceDB,
        commodity: *const gnc_commodity,
        currency: *const gnc_commodity,
    ) -> *mut GNCPrice;
    fn gnc_pricedb_lookup_nearest_in_time64(
        db: *mut GNCPriceDB,
        commodity: *const gnc_commodity,
        currency: *const gnc_commodity,
        when: time64,
    ) -> *mut GNCPrice;
}

static CLAIMED: AtomicBool = AtomicBool::new(false);

/// Forwards every call to the linked engine library.
#[derive(Debug)]
pub struct LinkedEngine {
    _private: (),
}

impl LinkedEngine {
    /// Hands out the process's only `LinkedEngine`. Every later call gets
    /// `None`, so two runtimes can never drive the library at once.
    pub fn claim() -> Option<Self> {
        claim_once(&CLAIMED).then_some(Self { _private: () })
    }
}

fn claim_once(flag: &AtomicBool) -> bool {
    flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
}

unsafe fn guid_of<T>(entity: *const T) -> GncGUID {
    let guid = qof_entity_get_guid(entity.cast());
    if guid.is_null() {
        GncGUID::default()
    } else {
        *guid
    }
}

impl NativeEngine for LinkedEngine {
    fn label(&self) -> &'static str {
        "libgnc-engine"
    }

    fn engine_init(&self) {
        unsafe { gnc_engine_init(0, ptr::null_mut()) }
    }

    fn engine_shutdown(&self) {
        unsafe { gnc_engine_shutdown() }
    }

    unsafe fn free_string(&self, text: *mut c_char) {
        g_free(text.cast());
    }

    unsafe fn session_new(&self, book: *mut QofBook) -> *mut QofSession {
        qof_session_new(book)
    }

    unsafe fn session_begin(&self, session: *mut QofSession, uri: *const c_char, mode: c_int) {
        qof_session_begin(session, uri, mode)
    }

    unsafe fn session_load(&self, session: *mut QofSession) {
        qof_session_load(session, None)
    }

    unsafe fn session_save(&self, session: *mut QofSession) {
        qof_session_save(session, None)
    }

    unsafe fn session_end(&self, session: *mut QofSession) {
        qof_session_end(session)
    }

    unsafe fn session_destroy(&self, session: *mut QofSession) {
        qof_session_destroy(session)
    }

    unsafe fn session_get_book(&self, session: *mut QofSession) -> *mut QofBook {
        qof_session_get_book(session)
    }

    unsafe fn session_pop_error(&self, session: *mut QofSession) -> QofBackendError {
        qof_session_pop_error(session)
    }

    unsafe fn session_get_error_message(&self, session: *mut QofSession) -> *const c_char {
        qof_session_get_error_message(session)
    }

    fn book_new(&self) -> *mut QofBook {
        unsafe { qof_book_new() }
    }

    unsafe fn book_destroy(&self, book: *mut QofBook) {
        qof_book_destroy(book)
    }

    unsafe fn book_get_guid(&self, book: *mut QofBook) -> GncGUID {
        guid_of(book)
    }

    unsafe fn book_is_readonly(&self, book: *mut QofBook) -> gboolean {
        qof_book_is_readonly(book)
    }

    unsafe fn book_session_not_saved(&self, book: *mut QofBook) -> gboolean {
        qof_book_session_not_saved(book)
    }

    unsafe fn book_mark_session_dirty(&self, book: *mut QofBook) {
        qof_book_mark_session_dirty(book)
    }

    unsafe fn book_get_root_account(&self, book: *mut QofBook) -> *mut Account {
        gnc_book_get_root_account(book)
    }

    unsafe fn book_count_transactions(&self, book: *mut QofBook) -> c_uint {
        let collection = qof_book_get_collection(book, GNC_ID_TRANS.as_ptr().cast());
        if collection.is_null() {
            0
        } else {
            qof_collection_count(collection)
        }
    }

    unsafe fn account_malloc(&self, book: *mut QofBook) -> *mut Account {
        xaccMallocAccount(book)
    }

    unsafe fn account_lookup(&self, guid: *const GncGUID, book: *mut QofBook) -> *mut Account {
        xaccAccountLookup(guid, book)
    }

    unsafe fn account_begin_edit(&self, account: *mut Account) {
        xaccAccountBeginEdit(account)
    }

    unsafe fn account_commit_edit(&self, account: *mut Account) {
        xaccAccountCommitEdit(account)
    }

    unsafe fn account_get_guid(&self, account: *mut Account) -> GncGUID {
        guid_of(account)
    }

    unsafe fn account_get_name(&self, account: *mut Account) -> *const c_char {
        xaccAccountGetName(account)
    }

    unsafe fn account_set_name(&self, account: *mut Account, name: *const c_char) {
        xaccAccountSetName(account, name)
    }

    unsafe fn account_get_description(&self, account: *mut Account) -> *const c_char {
        xaccAccountGetDescription(account)
    }

    unsafe fn account_set_description(&self, account: *mut Account, text: *const c_char) {
        xaccAccountSetDescription(account, text)
    }

    unsafe fn account_get_code(&self, account: *mut Account) -> *const c_char {
        xaccAccountGetCode(account)
    }

    unsafe fn account_set_code(&self, account: *mut Account, code: *const c_char) {
        xaccAccountSetCode(account, code)
    }

    unsafe fn account_get_type(&self, account: *mut Account) -> c_int {
        xaccAccountGetType(account)
    }

    unsafe fn account_set_type(&self, account: *mut Account, kind: c_int) {
        xaccAccountSetType(account, kind)
    }

    unsafe fn account_get_parent(&self, account: *mut Account) -> *mut Account {
        gnc_account_get_parent(account)
    }

    unsafe fn account_append_child(&self, parent: *mut Account, child: *mut Account) {
        gnc_account_append_child(parent, child)
    }

    unsafe fn account_n_children(&self, account: *mut Account) -> c_int {
        gnc_account_n_children(account)
    }

    unsafe fn account_nth_child(&self, account: *mut Account, index: c_int) -> *mut Account {
        gnc_account_nth_child(account, index)
    }

    unsafe fn account_lookup_by_name(
        &self,
        parent: *mut Account,
        name: *const c_char,
    ) -> *mut Account {
        gnc_account_lookup_by_name(parent, name)
    }

    unsafe fn account_get_full_name(&self, account: *mut Account) -> *mut c_char {
        gnc_account_get_full_name(account)
    }

    unsafe fn account_get_balance(&self, account: *mut Account) -> gnc_numeric {
        xaccAccountGetBalance(account)
    }

    unsafe fn account_get_cleared_balance(&self, account: *mut Account) -> gnc_numeric {
        xaccAccountGetClearedBalance(account)
    }

    unsafe fn account_get_reconciled_balance(&self, account: *mut Account) -> gnc_numeric {
        xaccAccountGetReconciledBalance(account)
    }

    unsafe fn account_n_splits(&self, account: *mut Account) -> c_int {
        c_int::try_from(xaccAccountGetSplitsSize(account)).unwrap_or(c_int::MAX)
    }

    unsafe fn account_nth_split(&self, account: *mut Account, index: c_int) -> *mut Split {
        let Ok(index) = c_uint::try_from(index) else {
            return ptr::null_mut();
        };
        // 5.x hands back a fresh copy of the list, so each step costs O(n).
        let list = xaccAccountGetSplitList(account);
        let split = g_list_nth_data(list, index).cast::<Split>();
        g_list_free(list);
        split
    }

    unsafe fn trans_malloc(&self, book: *mut QofBook) -> *mut Transaction {
        xaccMallocTransaction(book)
    }

    unsafe fn trans_lookup(&self, guid: *const GncGUID, book: *mut QofBook) -> *mut Transaction {
        xaccTransLookup(guid, book)
    }

    unsafe fn trans_begin_edit(&self, trans: *mut Transaction) {
        xaccTransBeginEdit(trans)
    }

    unsafe fn trans_commit_edit(&self, trans: *mut Transaction) {
        xaccTransCommitEdit(trans)
    }

    unsafe fn trans_rollback_edit(&self, trans: *mut Transaction) {
        xaccTransRollbackEdit(trans)
    }

    unsafe fn trans_is_open(&self, trans: *mut Transaction) -> gboolean {
        xaccTransIsOpen(trans)
    }

    unsafe fn trans_destroy(&self, trans: *mut Transaction) {
        // Destruction completes when the caller's edit level drops to zero.
        xaccTransDestroy(trans);
        xaccTransCommitEdit(trans);
    }

    unsafe fn trans_get_guid(&self, trans: *mut Transaction) -> GncGUID {
        guid_of(trans)
    }

    unsafe fn trans_get_description(&self, trans: *mut Transaction) -> *const c_char {
        xaccTransGetDescription(trans)
    }

    unsafe fn trans_set_description(&self, trans: *mut Transaction, text: *const c_char) {
        xaccTransSetDescription(trans, text)
    }

    unsafe fn trans_get_num(&self, trans: *mut Transaction) -> *const c_char {
        xaccTransGetNum(trans)
    }

    unsafe fn trans_set_num(&self, trans: *mut Transaction, num: *const c_char) {
        xaccTransSetNum(trans, num)
    }

    unsafe fn trans_get_notes(&self, trans: *mut Transaction) -> *const c_char {
        xaccTransGetNotes(trans)
    }

    unsafe fn trans_set_notes(&self, trans: *mut Transaction, notes: *const c_char) {
        xaccTransSetNotes(trans, notes)
    }

    unsafe fn trans_get_date_posted(&self, trans: *mut Transaction) -> time64 {
        xaccTransGetDate(trans)
    }

    unsafe fn trans_set_date_posted(&self, trans: *mut Transaction, when: time64) {
        xaccTransSetDatePostedSecs(trans, when)
    }

    unsafe fn trans_get_date_entered(&self, trans: *mut Transaction) -> time64 {
        xaccTransGetDateEntered(trans)
    }

    unsafe fn trans_count_splits(&self, trans: *mut Transaction) -> c_int {
        xaccTransCountSplits(trans)
    }

    unsafe fn trans_get_split(&self, trans: *mut Transaction, index: c_int) -> *mut Split {
        xaccTransGetSplit(trans, index)
    }

    unsafe fn trans_is_balanced(&self, trans: *mut Transaction) -> gboolean {
        xaccTransIsBalanced(trans)
    }

    unsafe fn trans_get_imbalance_value(&self, trans: *mut Transaction) -> gnc_numeric {
        xaccTransGetImbalanceValue(trans)
    }

    unsafe fn split_malloc(&self, book: *mut QofBook) -> *mut Split {
        xaccMallocSplit(book)
    }

    unsafe fn split_lookup(&self, guid: *const GncGUID, book: *mut QofBook) -> *mut Split {
        xaccSplitLookup(guid, book)
    }

    unsafe fn split_destroy(&self, split: *mut Split) -> gboolean {
        xaccSplitDestroy(split)
    }

    unsafe fn split_get_guid(&self, split: *mut Split) -> GncGUID {
        guid_of(split)
    }

    unsafe fn split_set_parent(&self, split: *mut Split, trans: *mut Transaction) {
        xaccSplitSetParent(split, trans)
    }

    unsafe fn split_get_parent(&self, split: *mut Split) -> *mut Transaction {
        xaccSplitGetParent(split)
    }

    unsafe fn split_set_account(&self, split: *mut Split, account: *mut Account) {
        xaccSplitSetAccount(split, account)
    }

    unsafe fn split_get_account(&self, split: *mut Split) -> *mut Account {
        xaccSplitGetAccount(split)
    }

    unsafe fn split_get_amount(&self, split: *mut Split) -> gnc_numeric {
        xaccSplitGetAmount(split)
    }

    unsafe fn split_set_amount(&self, split: *mut Split, amount: gnc_numeric) {
        xaccSplitSetAmount(split, amount)
    }

    unsafe fn split_get_value(&self, split: *mut Split) -> gnc_numeric {
        xaccSplitGetValue(split)
    }

    unsafe fn split_set_value(&self, split: *mut Split, value: gnc_numeric) {
        xaccSplitSetValue(split, value)
    }

    unsafe fn split_get_memo(&self, split: *mut Split) -> *const c_char {
        xaccSplitGetMemo(split)
    }

    unsafe fn split_set_memo(&self, split: *mut Split, memo: *const c_char) {
        xaccSplitSetMemo(split, memo)
    }

    unsafe fn split_get_action(&self, split: *mut Split) -> *const c_char {
        xaccSplitGetAction(split)
    }

    unsafe fn split_set_action(&self, split: *mut Split, action: *const c_char) {
        xaccSplitSetAction(split, action)
    }

    unsafe fn split_get_reconcile(&self, split: *mut Split) -> c_char {
        xaccSplitGetReconcile(split)
    }

    unsafe fn split_set_reconcile(&self, split: *mut Split, flag: c_char) {
        xaccSplitSetReconcile(split, flag)
    }

    unsafe fn commodity_lookup(
        &self,
        book: *mut QofBook,
        namespace: *const c_char,
        mnemonic: *const c_char,
    ) -> *mut gnc_commodity {
        let table = gnc_commodity_table_get_table(book);
        if table.is_null() {
            return ptr::null_mut();
        }
        gnc_commodity_table_lookup(table, namespace, mnemonic)
    }

    unsafe fn commodity_find_or_create(
        &self,
        book: *mut QofBook,
        namespace: *const c_char,
        mnemonic: *const c_char,
    ) -> *mut gnc_commodity {
        let table = gnc_commodity_table_get_table(book);
        if table.is_null() {
            return ptr::null_mut();
        }
        let existing = gnc_commodity_table_lookup(table, namespace, mnemonic);
        if !existing.is_null() {
            return existing;
        }
        let created = gnc_commodity_new(
            book,
            mnemonic,
            namespace,
            mnemonic,
            ptr::null(),
            DEFAULT_COMMODITY_FRACTION,
        );
        gnc_commodity_table_insert(table, created)
    }

    unsafe fn commodity_get_namespace(&self, commodity: *mut gnc_commodity) -> *const c_char {
        gnc_commodity_get_namespace(commodity)
    }

    unsafe fn commodity_get_mnemonic(&self, commodity: *mut gnc_commodity) -> *const c_char {
        gnc_commodity_get_mnemonic(commodity)
    }

    unsafe fn price_create(&self, book: *mut QofBook) -> *mut GNCPrice {
        gnc_price_create(book)
    }

    unsafe fn price_lookup(&self, guid: *const GncGUID, book: *mut QofBook) -> *mut GNCPrice {
        gnc_price_lookup(guid, book)
    }

    unsafe fn price_unref(&self, price: *mut GNCPrice) {
        gnc_price_unref(price)
    }

    unsafe fn price_begin_edit(&self, price: *mut GNCPrice) {
        gnc_price_begin_edit(price)
    }

    unsafe fn price_commit_edit(&self, price: *mut GNCPrice) {
        gnc_price_commit_edit(price)
    }

    unsafe fn price_get_guid(&self, price: *mut GNCPrice) -> GncGUID {
        guid_of(price)
    }

    unsafe fn price_set_commodity(&self, price: *mut GNCPrice, commodity: *mut gnc_commodity) {
        gnc_price_set_commodity(price, commodity)
    }

    unsafe fn price_get_commodity(&self, price: *mut GNCPrice) -> *mut gnc_commodity {
        gnc_price_get_commodity(price)
    }

    unsafe fn price_set_currency(&self, price: *mut GNCPrice, currency: *mut gnc_commodity) {
        gnc_price_set_currency(price, currency)
    }

    unsafe fn price_get_currency(&self, price: *mut GNCPrice) -> *mut gnc_commodity {
        gnc_price_get_currency(price)
    }

    unsafe fn price_set_time(&self, price: *mut GNCPrice, when: time64) {
        gnc_price_set_time64(price, when)
    }

    unsafe fn price_get_time(&self, price: *mut GNCPrice) -> time64 {
        gnc_price_get_time64(price)
    }

    unsafe fn price_set_value(&self, price: *mut GNCPrice, value: gnc_numeric) {
        gnc_price_set_value(price, value)
    }

    unsafe fn price_get_value(&self, price: *mut GNCPrice) -> gnc_numeric {
        gnc_price_get_value(price)
    }

    unsafe fn price_set_source(&self, price: *mut GNCPrice, source: c_int) {
        gnc_price_set_source(price, source)
    }

    unsafe fn price_get_source(&self, price: *mut GNCPrice) -> c_int {
        gnc_price_get_source(price)
    }

    unsafe fn price_set_typestr(&self, price: *mut GNCPrice, kind: *const c_char) {
        gnc_price_set_typestr(price, kind)
    }

    unsafe fn price_get_typestr(&self, price: *mut GNCPrice) -> *const c_char {
        gnc_price_get_typestr(price)
    }

    unsafe fn price_set_source_string(&self, price: *mut GNCPrice, source: *const c_char) {
        gnc_price_set_source_string(price, source)
    }

    unsafe fn price_get_source_string(&self, price: *mut GNCPrice) -> *const c_char {
        gnc_price_get_source_string(price)
    }

    unsafe fn price_invert(&self, price: *mut GNCPrice) -> *mut GNCPrice {
        gnc_price_invert(price)
    }

    unsafe fn pricedb_get_db(&self, book: *mut QofBook) -> *mut GNCPriceDB {
        gnc_pricedb_get_db(book)
    }

    unsafe fn pricedb_add_price(&self, db: *mut GNCPriceDB, price: *mut GNCPrice) -> gboolean {
        gnc_pricedb_add_price(db, price)
    }

    unsafe fn pricedb_remove_price(&self, db: *mut GNCPriceDB, price: *mut GNCPrice) -> gboolean {
        gnc_pricedb_remove_price(db, price)
    }

    unsafe fn pricedb_get_num_prices(&self, db: *mut GNCPriceDB) -> c_uint {
        gnc_pricedb_get_num_prices(db)
    }

    unsafe fn pricedb_lookup_latest(
        &self,
        db: *mut GNCPriceDB,
        commodity: *mut gnc_commodity,
        currency: *mut gnc_commodity,
    ) -> *mut GNCPrice {
        gnc_pricedb_lookup_latest(db, commodity, currency)
    }

    unsafe fn pricedb_lookup_nearest(
        &self,
        db: *mut GNCPriceDB,
        commodity: *mut gnc_commodity,
        currency: *mut gnc_commodity,
        when: time64,
    ) -> *mut GNCPrice {
        gnc_pricedb_lookup_nearest_in_time64(db, commodity, currency, when)
    }
}
