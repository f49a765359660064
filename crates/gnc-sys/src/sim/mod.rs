//! In-process engine with the native library's handle discipline.
//!
//! Entities live in tables keyed by never-reused ids. Handing a released id
//! back in panics instead of reading freed memory, which makes lifetime bugs
//! in the safe layer loud. Books persist as JSON files behind the
//! `file://`, `xml://` and `sqlite3://` schemes.

mod state;
mod store;

use std::ffi::{CStr, CString};
use std::fs;
use std::os::raw::{c_char, c_int, c_uint};
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use gnc_domain::{PriceSource, SessionOpenMode};
use tracing::{debug, trace};

use self::state::{as_id, as_ptr, opt_id, opt_ptr, Id, SimState};
use crate::{
    gboolean, gnc_commodity, gnc_numeric, time64, Account, GNCPrice, GNCPriceDB, GncGUID,
    NativeEngine, QofBackendError, QofBook, QofSession, Split, Transaction,
    ERR_BACKEND_LOCKED, ERR_BACKEND_MISC, ERR_BACKEND_NO_BACKEND, ERR_BACKEND_NO_ERR,
    ERR_BACKEND_READONLY, ERR_BACKEND_STORE_EXISTS, ERR_FILEIO_FILE_LOCKERR,
    ERR_FILEIO_FILE_NOT_FOUND,
};

/// Counters exposed for tests that assert on engine traffic.
#[derive(Debug, Default)]
struct Counters {
    calls: AtomicUsize,
    inits: AtomicUsize,
    shutdowns: AtomicUsize,
}

#[derive(Debug, Default)]
pub struct SimEngine {
    state: Mutex<SimState>,
    counters: Counters,
    out_of_memory: AtomicBool,
}

impl SimEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every entry point that allocates an entity, book or
    /// session hands back null and allocates nothing.
    pub fn set_out_of_memory(&self, failing: bool) {
        self.out_of_memory.store(failing, Ordering::SeqCst);
    }

    fn allocation_fails(&self) -> bool {
        let failing = self.out_of_memory.load(Ordering::SeqCst);
        if failing {
            self.counters.calls.fetch_add(1, Ordering::SeqCst);
            debug!("sim engine: allocation refused");
        }
        failing
    }

    /// Entry points invoked so far, of any kind.
    pub fn native_calls(&self) -> usize {
        self.counters.calls.load(Ordering::SeqCst)
    }

    pub fn init_count(&self) -> usize {
        self.counters.inits.load(Ordering::SeqCst)
    }

    pub fn shutdown_count(&self) -> usize {
        self.counters.shutdowns.load(Ordering::SeqCst)
    }

    pub fn live_sessions(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn live_books(&self) -> usize {
        self.lock().books.len()
    }

    /// Accounts, transactions, splits and prices not yet released.
    pub fn live_entities(&self) -> usize {
        let state = self.lock();
        state.accounts.len() + state.transactions.len() + state.splits.len() + state.prices.len()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
        self.lock()
    }
}

unsafe fn read_c(text: *const c_char) -> CString {
    if text.is_null() {
        CString::default()
    } else {
        CStr::from_ptr(text).to_owned()
    }
}

fn flag(value: bool) -> gboolean {
    gboolean::from(value)
}

fn source_names() -> &'static [CString] {
    static NAMES: OnceLock<Vec<CString>> = OnceLock::new();
    NAMES.get_or_init(|| {
        (0..=PriceSource::Invalid.code())
            .map(|code| CString::new(PriceSource::from_code(code).as_str()).unwrap_or_default())
            .collect()
    })
}

fn source_name(code: c_int) -> *const c_char {
    let code = PriceSource::from_code(code).code();
    source_names()
        .get(code as usize)
        .map_or(ptr::null(), |name| name.as_ptr())
}

fn source_code(text: &[u8]) -> Option<c_int> {
    source_names()
        .iter()
        .position(|name| name.as_bytes() == text)
        .filter(|idx| *idx as c_int != PriceSource::Invalid.code())
        .map(|idx| idx as c_int)
}

fn begin_store(
    state: &mut SimState,
    session: Id,
    uri: &str,
    mode: c_int,
) -> Result<(), (QofBackendError, String)> {
    if state.session(session).path.is_some() {
        return Err((ERR_BACKEND_MISC, "session already begun".to_string()));
    }
    let mode = SessionOpenMode::from_code(mode)
        .ok_or_else(|| (ERR_BACKEND_MISC, format!("unknown open mode {mode}")))?;
    let path = store::store_path(uri)?;
    let exists = path.exists();
    match mode {
        SessionOpenMode::NewStore if exists => {
            return Err((
                ERR_BACKEND_STORE_EXISTS,
                format!("{} already exists", path.display()),
            ))
        }
        SessionOpenMode::Normal | SessionOpenMode::ReadOnly | SessionOpenMode::BreakLock
            if !exists =>
        {
            return Err((
                ERR_FILEIO_FILE_NOT_FOUND,
                format!("{} not found", path.display()),
            ))
        }
        _ => {}
    }

    let book = state.session(session).book;
    if mode == SessionOpenMode::ReadOnly {
        state.book_mut(book).readonly = true;
    } else {
        let lock = store::lock_path(&path);
        let overrides = matches!(mode, SessionOpenMode::BreakLock | SessionOpenMode::NewOverwrite);
        if lock.exists() && !overrides {
            return Err((ERR_BACKEND_LOCKED, format!("{} is locked", path.display())));
        }
        fs::write(&lock, std::process::id().to_string())
            .map_err(|err| (ERR_FILEIO_FILE_LOCKERR, format!("{}: {err}", lock.display())))?;
        state.session(session).lock = Some(lock);
    }
    debug!(path = %path.display(), %mode, "sim store attached");
    state.session(session).path = Some(path);
    Ok(())
}

fn end_store(state: &mut SimState, session: Id) {
    let entry = state.session(session);
    entry.path = None;
    if let Some(lock) = entry.lock.take() {
        let _ = fs::remove_file(lock);
    }
}

impl NativeEngine for SimEngine {
    fn label(&self) -> &'static str {
        "sim"
    }

    fn engine_init(&self) {
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
        self.counters.inits.fetch_add(1, Ordering::SeqCst);
        trace!("sim engine initialized");
    }

    fn engine_shutdown(&self) {
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
        self.counters.shutdowns.fetch_add(1, Ordering::SeqCst);
        trace!("sim engine shut down");
    }

    unsafe fn free_string(&self, text: *mut c_char) {
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
        if !text.is_null() {
            drop(CString::from_raw(text));
        }
    }

    // ---- sessions ----

    unsafe fn session_new(&self, book: *mut QofBook) -> *mut QofSession {
        if self.allocation_fails() {
            return ptr::null_mut();
        }
        let mut state = self.state();
        let book = match opt_id(book) {
            Some(book) => {
                state.book(book);
                book
            }
            None => state.create_book(),
        };
        as_ptr(state.new_session(book))
    }

    unsafe fn session_begin(&self, session: *mut QofSession, uri: *const c_char, mode: c_int) {
        let mut state = self.state();
        let id = as_id(session);
        state.session(id);
        let uri = read_c(uri).to_string_lossy().into_owned();
        if let Err((code, message)) = begin_store(&mut state, id, &uri, mode) {
            state.session(id).fail(code, message);
        }
    }

    unsafe fn session_load(&self, session: *mut QofSession) {
        let mut state = self.state();
        let id = as_id(session);
        let Some(path) = state.session(id).path.clone() else {
            state.session(id).fail(ERR_BACKEND_NO_BACKEND, "session has no store");
            return;
        };
        let book = state.session(id).book;
        let loaded = store::read(&path).and_then(|stored| state.import_book(book, stored));
        if let Err((code, message)) = loaded {
            state.session(id).fail(code, message);
        }
    }

    unsafe fn session_save(&self, session: *mut QofSession) {
        let mut state = self.state();
        let id = as_id(session);
        let Some(path) = state.session(id).path.clone() else {
            state.session(id).fail(ERR_BACKEND_NO_BACKEND, "session has no store");
            return;
        };
        let book = state.session(id).book;
        if state.book(book).readonly {
            state.session(id).fail(ERR_BACKEND_READONLY, "book is read-only");
            return;
        }
        let saved = state
            .export_book(book)
            .and_then(|stored| store::write(&path, &stored));
        match saved {
            Ok(()) => state.book_mut(book).dirty = false,
            Err((code, message)) => state.session(id).fail(code, message),
        }
    }

    unsafe fn session_end(&self, session: *mut QofSession) {
        let mut state = self.state();
        end_store(&mut state, as_id(session));
    }

    unsafe fn session_destroy(&self, session: *mut QofSession) {
        let mut state = self.state();
        let id = as_id(session);
        end_store(&mut state, id);
        let book = state.session(id).book;
        state.sessions.remove(&id);
        state.destroy_book(book);
    }

    unsafe fn session_get_book(&self, session: *mut QofSession) -> *mut QofBook {
        as_ptr(self.state().session(as_id(session)).book)
    }

    unsafe fn session_pop_error(&self, session: *mut QofSession) -> QofBackendError {
        let mut state = self.state();
        let entry = state.session(as_id(session));
        entry.message = CString::default();
        std::mem::replace(&mut entry.error, ERR_BACKEND_NO_ERR)
    }

    unsafe fn session_get_error_message(&self, session: *mut QofSession) -> *const c_char {
        self.state().session(as_id(session)).message.as_ptr()
    }

    // ---- books ----

    fn book_new(&self) -> *mut QofBook {
        if self.allocation_fails() {
            return ptr::null_mut();
        }
        as_ptr(self.state().create_book())
    }

    unsafe fn book_destroy(&self, book: *mut QofBook) {
        self.state().destroy_book(as_id(book));
    }

    unsafe fn book_get_guid(&self, book: *mut QofBook) -> GncGUID {
        self.state().book(as_id(book)).guid.into()
    }

    unsafe fn book_is_readonly(&self, book: *mut QofBook) -> gboolean {
        flag(self.state().book(as_id(book)).readonly)
    }

    unsafe fn book_session_not_saved(&self, book: *mut QofBook) -> gboolean {
        flag(self.state().book(as_id(book)).dirty)
    }

    unsafe fn book_mark_session_dirty(&self, book: *mut QofBook) {
        self.state().book_mut(as_id(book)).dirty = true;
    }

    unsafe fn book_get_root_account(&self, book: *mut QofBook) -> *mut Account {
        as_ptr(self.state().book(as_id(book)).root)
    }

    unsafe fn book_count_transactions(&self, book: *mut QofBook) -> c_uint {
        let state = self.state();
        let book = as_id(book);
        state.book(book);
        state.transactions.values().filter(|t| t.book == book).count() as c_uint
    }

    // ---- accounts ----

    unsafe fn account_malloc(&self, book: *mut QofBook) -> *mut Account {
        if self.allocation_fails() {
            return ptr::null_mut();
        }
        let mut state = self.state();
        let book = as_id(book);
        state.book(book);
        let id = state.create_account(book);
        state.touch(book);
        as_ptr(id)
    }

    unsafe fn account_lookup(&self, guid: *const GncGUID, book: *mut QofBook) -> *mut Account {
        let state = self.state();
        let book = as_id(book);
        state.book(book);
        let guid = (*guid).into();
        opt_ptr(SimState::guid_lookup(&state.accounts, guid, |a| {
            (a.book == book).then_some(a.guid)
        }))
    }

    unsafe fn account_begin_edit(&self, account: *mut Account) {
        self.state().account_mut(as_id(account)).edit_level += 1;
    }

    unsafe fn account_commit_edit(&self, account: *mut Account) {
        let mut state = self.state();
        let entry = state.account_mut(as_id(account));
        entry.edit_level = entry.edit_level.saturating_sub(1);
        let book = entry.book;
        state.touch(book);
    }

    unsafe fn account_get_guid(&self, account: *mut Account) -> GncGUID {
        self.state().account(as_id(account)).guid.into()
    }

    unsafe fn account_get_name(&self, account: *mut Account) -> *const c_char {
        self.state().account(as_id(account)).name.as_ptr()
    }

    unsafe fn account_set_name(&self, account: *mut Account, name: *const c_char) {
        self.state().account_mut(as_id(account)).name = read_c(name);
    }

    unsafe fn account_get_description(&self, account: *mut Account) -> *const c_char {
        self.state().account(as_id(account)).description.as_ptr()
    }

    unsafe fn account_set_description(&self, account: *mut Account, text: *const c_char) {
        self.state().account_mut(as_id(account)).description = read_c(text);
    }

    unsafe fn account_get_code(&self, account: *mut Account) -> *const c_char {
        self.state().account(as_id(account)).code.as_ptr()
    }

    unsafe fn account_set_code(&self, account: *mut Account, code: *const c_char) {
        self.state().account_mut(as_id(account)).code = read_c(code);
    }

    unsafe fn account_get_type(&self, account: *mut Account) -> c_int {
        self.state().account(as_id(account)).kind
    }

    unsafe fn account_set_type(&self, account: *mut Account, kind: c_int) {
        self.state().account_mut(as_id(account)).kind = kind;
    }

    unsafe fn account_get_parent(&self, account: *mut Account) -> *mut Account {
        opt_ptr(self.state().account(as_id(account)).parent)
    }

    unsafe fn account_append_child(&self, parent: *mut Account, child: *mut Account) {
        self.state().append_child(as_id(parent), as_id(child));
    }

    unsafe fn account_n_children(&self, account: *mut Account) -> c_int {
        self.state().account(as_id(account)).children.len() as c_int
    }

    unsafe fn account_nth_child(&self, account: *mut Account, index: c_int) -> *mut Account {
        let state = self.state();
        let children = &state.account(as_id(account)).children;
        opt_ptr(usize::try_from(index).ok().and_then(|i| children.get(i).copied()))
    }

    unsafe fn account_lookup_by_name(
        &self,
        parent: *mut Account,
        name: *const c_char,
    ) -> *mut Account {
        let name = read_c(name);
        opt_ptr(self.state().lookup_by_name(as_id(parent), name.as_bytes()))
    }

    unsafe fn account_get_full_name(&self, account: *mut Account) -> *mut c_char {
        let full = self.state().full_name(as_id(account));
        CString::new(full).unwrap_or_default().into_raw()
    }

    unsafe fn account_get_balance(&self, account: *mut Account) -> gnc_numeric {
        self.state().balance(as_id(account), |_| true)
    }

    unsafe fn account_get_cleared_balance(&self, account: *mut Account) -> gnc_numeric {
        self.state()
            .balance(as_id(account), |flag| matches!(flag, 'c' | 'y' | 'f'))
    }

    unsafe fn account_get_reconciled_balance(&self, account: *mut Account) -> gnc_numeric {
        self.state()
            .balance(as_id(account), |flag| matches!(flag, 'y' | 'f'))
    }

    unsafe fn account_n_splits(&self, account: *mut Account) -> c_int {
        self.state().account(as_id(account)).splits.len() as c_int
    }

    unsafe fn account_nth_split(&self, account: *mut Account, index: c_int) -> *mut Split {
        let state = self.state();
        let splits = &state.account(as_id(account)).splits;
        opt_ptr(usize::try_from(index).ok().and_then(|i| splits.get(i).copied()))
    }

    // ---- transactions ----

    unsafe fn trans_malloc(&self, book: *mut QofBook) -> *mut Transaction {
        if self.allocation_fails() {
            return ptr::null_mut();
        }
        let mut state = self.state();
        let book = as_id(book);
        state.book(book);
        as_ptr(state.create_trans(book))
    }

    unsafe fn trans_lookup(&self, guid: *const GncGUID, book: *mut QofBook) -> *mut Transaction {
        let state = self.state();
        let book = as_id(book);
        state.book(book);
        let guid = (*guid).into();
        opt_ptr(SimState::guid_lookup(&state.transactions, guid, |t| {
            (t.book == book).then_some(t.guid)
        }))
    }

    unsafe fn trans_begin_edit(&self, trans: *mut Transaction) {
        self.state().begin_trans_edit(as_id(trans));
    }

    unsafe fn trans_commit_edit(&self, trans: *mut Transaction) {
        self.state().commit_trans_edit(as_id(trans));
    }

    unsafe fn trans_rollback_edit(&self, trans: *mut Transaction) {
        self.state().rollback_trans_edit(as_id(trans));
    }

    unsafe fn trans_is_open(&self, trans: *mut Transaction) -> gboolean {
        flag(self.state().trans(as_id(trans)).edit_level > 0)
    }

    unsafe fn trans_destroy(&self, trans: *mut Transaction) {
        let mut state = self.state();
        let id = as_id(trans);
        assert!(
            state.trans(id).edit_level > 0,
            "sim engine: transaction {id:#x} destroyed outside an edit"
        );
        let book = state.trans(id).book;
        if state.book(book).readonly {
            debug!("sim engine: transaction destroy refused in read-only book");
            state.commit_trans_edit(id);
            return;
        }
        state.destroy_trans(id);
    }

    unsafe fn trans_get_guid(&self, trans: *mut Transaction) -> GncGUID {
        self.state().trans(as_id(trans)).guid.into()
    }

    unsafe fn trans_get_description(&self, trans: *mut Transaction) -> *const c_char {
        self.state().trans(as_id(trans)).description.as_ptr()
    }

    unsafe fn trans_set_description(&self, trans: *mut Transaction, text: *const c_char) {
        self.state().trans_mut(as_id(trans)).description = read_c(text);
    }

    unsafe fn trans_get_num(&self, trans: *mut Transaction) -> *const c_char {
        self.state().trans(as_id(trans)).num.as_ptr()
    }

    unsafe fn trans_set_num(&self, trans: *mut Transaction, num: *const c_char) {
        self.state().trans_mut(as_id(trans)).num = read_c(num);
    }

    unsafe fn trans_get_notes(&self, trans: *mut Transaction) -> *const c_char {
        self.state().trans(as_id(trans)).notes.as_ptr()
    }

    unsafe fn trans_set_notes(&self, trans: *mut Transaction, notes: *const c_char) {
        self.state().trans_mut(as_id(trans)).notes = read_c(notes);
    }

    unsafe fn trans_get_date_posted(&self, trans: *mut Transaction) -> time64 {
        self.state().trans(as_id(trans)).posted
    }

    unsafe fn trans_set_date_posted(&self, trans: *mut Transaction, when: time64) {
        self.state().trans_mut(as_id(trans)).posted = when;
    }

    unsafe fn trans_get_date_entered(&self, trans: *mut Transaction) -> time64 {
        self.state().trans(as_id(trans)).entered
    }

    unsafe fn trans_count_splits(&self, trans: *mut Transaction) -> c_int {
        self.state().trans(as_id(trans)).splits.len() as c_int
    }

    unsafe fn trans_get_split(&self, trans: *mut Transaction, index: c_int) -> *mut Split {
        let state = self.state();
        let splits = &state.trans(as_id(trans)).splits;
        opt_ptr(usize::try_from(index).ok().and_then(|i| splits.get(i).copied()))
    }

    unsafe fn trans_is_balanced(&self, trans: *mut Transaction) -> gboolean {
        let imbalance = self.state().imbalance(as_id(trans));
        flag(imbalance.denom != 0 && imbalance.num == 0)
    }

    unsafe fn trans_get_imbalance_value(&self, trans: *mut Transaction) -> gnc_numeric {
        self.state().imbalance(as_id(trans))
    }

    // ---- splits ----

    unsafe fn split_malloc(&self, book: *mut QofBook) -> *mut Split {
        if self.allocation_fails() {
            return ptr::null_mut();
        }
        let mut state = self.state();
        let book = as_id(book);
        state.book(book);
        as_ptr(state.create_split(book))
    }

    unsafe fn split_lookup(&self, guid: *const GncGUID, book: *mut QofBook) -> *mut Split {
        let state = self.state();
        let book = as_id(book);
        state.book(book);
        let guid = (*guid).into();
        opt_ptr(SimState::guid_lookup(&state.splits, guid, |s| {
            (s.book == book).then_some(s.guid)
        }))
    }

    unsafe fn split_destroy(&self, split: *mut Split) -> gboolean {
        let mut state = self.state();
        let id = as_id(split);
        let book = state.split(id).book;
        if state.book(book).readonly {
            return flag(false);
        }
        state.destroy_split(id);
        flag(true)
    }

    unsafe fn split_get_guid(&self, split: *mut Split) -> GncGUID {
        self.state().split(as_id(split)).guid.into()
    }

    unsafe fn split_set_parent(&self, split: *mut Split, trans: *mut Transaction) {
        self.state().set_split_parent(as_id(split), opt_id(trans));
    }

    unsafe fn split_get_parent(&self, split: *mut Split) -> *mut Transaction {
        opt_ptr(self.state().split(as_id(split)).trans)
    }

    unsafe fn split_set_account(&self, split: *mut Split, account: *mut Account) {
        self.state().set_split_account(as_id(split), opt_id(account));
    }

    unsafe fn split_get_account(&self, split: *mut Split) -> *mut Account {
        opt_ptr(self.state().split(as_id(split)).account)
    }

    unsafe fn split_get_amount(&self, split: *mut Split) -> gnc_numeric {
        self.state().split(as_id(split)).amount
    }

    unsafe fn split_set_amount(&self, split: *mut Split, amount: gnc_numeric) {
        self.state().split_mut(as_id(split)).amount = amount;
    }

    unsafe fn split_get_value(&self, split: *mut Split) -> gnc_numeric {
        self.state().split(as_id(split)).value
    }

    unsafe fn split_set_value(&self, split: *mut Split, value: gnc_numeric) {
        self.state().split_mut(as_id(split)).value = value;
    }

    unsafe fn split_get_memo(&self, split: *mut Split) -> *const c_char {
        self.state().split(as_id(split)).memo.as_ptr()
    }

    unsafe fn split_set_memo(&self, split: *mut Split, memo: *const c_char) {
        self.state().split_mut(as_id(split)).memo = read_c(memo);
    }

    unsafe fn split_get_action(&self, split: *mut Split) -> *const c_char {
        self.state().split(as_id(split)).action.as_ptr()
    }

    unsafe fn split_set_action(&self, split: *mut Split, action: *const c_char) {
        self.state().split_mut(as_id(split)).action = read_c(action);
    }

    unsafe fn split_get_reconcile(&self, split: *mut Split) -> c_char {
        self.state().split(as_id(split)).reconcile
    }

    unsafe fn split_set_reconcile(&self, split: *mut Split, flag: c_char) {
        let mut state = self.state();
        let entry = state.split_mut(as_id(split));
        entry.reconcile = flag;
        let book = entry.book;
        state.touch(book);
    }

    // ---- commodities ----

    unsafe fn commodity_lookup(
        &self,
        book: *mut QofBook,
        namespace: *const c_char,
        mnemonic: *const c_char,
    ) -> *mut gnc_commodity {
        let state = self.state();
        let book = as_id(book);
        state.book(book);
        let (namespace, mnemonic) = (read_c(namespace), read_c(mnemonic));
        opt_ptr(state.find_commodity(book, namespace.as_bytes(), mnemonic.as_bytes()))
    }

    unsafe fn commodity_find_or_create(
        &self,
        book: *mut QofBook,
        namespace: *const c_char,
        mnemonic: *const c_char,
    ) -> *mut gnc_commodity {
        let mut state = self.state();
        let book = as_id(book);
        state.book(book);
        let (namespace, mnemonic) = (read_c(namespace), read_c(mnemonic));
        let id = match state.find_commodity(book, namespace.as_bytes(), mnemonic.as_bytes()) {
            Some(id) => id,
            None => state.create_commodity(book, namespace, mnemonic),
        };
        as_ptr(id)
    }

    unsafe fn commodity_get_namespace(&self, commodity: *mut gnc_commodity) -> *const c_char {
        self.state().commodity(as_id(commodity)).namespace.as_ptr()
    }

    unsafe fn commodity_get_mnemonic(&self, commodity: *mut gnc_commodity) -> *const c_char {
        self.state().commodity(as_id(commodity)).mnemonic.as_ptr()
    }

    // ---- prices ----

    unsafe fn price_create(&self, book: *mut QofBook) -> *mut GNCPrice {
        if self.allocation_fails() {
            return ptr::null_mut();
        }
        let mut state = self.state();
        let book = as_id(book);
        state.book(book);
        as_ptr(state.create_price(book))
    }

    unsafe fn price_lookup(&self, guid: *const GncGUID, book: *mut QofBook) -> *mut GNCPrice {
        let state = self.state();
        let book = as_id(book);
        state.book(book);
        let guid = (*guid).into();
        opt_ptr(SimState::guid_lookup(&state.prices, guid, |p| {
            (p.book == book && p.in_db).then_some(p.guid)
        }))
    }

    unsafe fn price_unref(&self, price: *mut GNCPrice) {
        self.state().unref_price(as_id(price));
    }

    unsafe fn price_begin_edit(&self, price: *mut GNCPrice) {
        self.state().price(as_id(price));
    }

    unsafe fn price_commit_edit(&self, price: *mut GNCPrice) {
        let mut state = self.state();
        let book = state.price(as_id(price)).book;
        state.touch(book);
    }

    unsafe fn price_get_guid(&self, price: *mut GNCPrice) -> GncGUID {
        self.state().price(as_id(price)).guid.into()
    }

    unsafe fn price_set_commodity(&self, price: *mut GNCPrice, commodity: *mut gnc_commodity) {
        self.state().price_mut(as_id(price)).commodity = opt_id(commodity);
    }

    unsafe fn price_get_commodity(&self, price: *mut GNCPrice) -> *mut gnc_commodity {
        opt_ptr(self.state().price(as_id(price)).commodity)
    }

    unsafe fn price_set_currency(&self, price: *mut GNCPrice, currency: *mut gnc_commodity) {
        self.state().price_mut(as_id(price)).currency = opt_id(currency);
    }

    unsafe fn price_get_currency(&self, price: *mut GNCPrice) -> *mut gnc_commodity {
        opt_ptr(self.state().price(as_id(price)).currency)
    }

    unsafe fn price_set_time(&self, price: *mut GNCPrice, when: time64) {
        self.state().price_mut(as_id(price)).time = when;
    }

    unsafe fn price_get_time(&self, price: *mut GNCPrice) -> time64 {
        self.state().price(as_id(price)).time
    }

    unsafe fn price_set_value(&self, price: *mut GNCPrice, value: gnc_numeric) {
        self.state().price_mut(as_id(price)).value = value;
    }

    unsafe fn price_get_value(&self, price: *mut GNCPrice) -> gnc_numeric {
        self.state().price(as_id(price)).value
    }

    unsafe fn price_set_source(&self, price: *mut GNCPrice, source: c_int) {
        self.state().price_mut(as_id(price)).source = source;
    }

    unsafe fn price_get_source(&self, price: *mut GNCPrice) -> c_int {
        self.state().price(as_id(price)).source
    }

    unsafe fn price_set_typestr(&self, price: *mut GNCPrice, kind: *const c_char) {
        self.state().price_mut(as_id(price)).typestr = read_c(kind);
    }

    unsafe fn price_get_typestr(&self, price: *mut GNCPrice) -> *const c_char {
        self.state().price(as_id(price)).typestr.as_ptr()
    }

    unsafe fn price_set_source_string(&self, price: *mut GNCPrice, source: *const c_char) {
        let mut state = self.state();
        let id = as_id(price);
        state.price(id);
        let text = read_c(source);
        // Unknown names leave the source as it was.
        if let Some(code) = source_code(text.as_bytes()) {
            state.price_mut(id).source = code;
        }
    }

    unsafe fn price_get_source_string(&self, price: *mut GNCPrice) -> *const c_char {
        source_name(self.state().price(as_id(price)).source)
    }

    unsafe fn price_invert(&self, price: *mut GNCPrice) -> *mut GNCPrice {
        if self.allocation_fails() {
            return ptr::null_mut();
        }
        let mut state = self.state();
        as_ptr(state.invert_price(as_id(price)))
    }

    unsafe fn pricedb_get_db(&self, book: *mut QofBook) -> *mut GNCPriceDB {
        as_ptr(self.state().book(as_id(book)).pricedb)
    }

    unsafe fn pricedb_add_price(&self, db: *mut GNCPriceDB, price: *mut GNCPrice) -> gboolean {
        let mut state = self.state();
        let book = state.pricedb_book(as_id(db));
        let id = as_id(price);
        let entry = state.price_mut(id);
        if entry.in_db || entry.book != book {
            return flag(false);
        }
        entry.in_db = true;
        entry.refs += 1;
        let owner = state.book_mut(book);
        owner.prices.push(id);
        owner.dirty = true;
        flag(true)
    }

    unsafe fn pricedb_remove_price(&self, db: *mut GNCPriceDB, price: *mut GNCPrice) -> gboolean {
        let mut state = self.state();
        let book = state.pricedb_book(as_id(db));
        let id = as_id(price);
        let entry = state.price_mut(id);
        if !entry.in_db || entry.book != book {
            return flag(false);
        }
        entry.in_db = false;
        let owner = state.book_mut(book);
        owner.prices.retain(|p| *p != id);
        owner.dirty = true;
        state.unref_price(id);
        flag(true)
    }

    unsafe fn pricedb_get_num_prices(&self, db: *mut GNCPriceDB) -> c_uint {
        let state = self.state();
        let book = state.pricedb_book(as_id(db));
        state.book(book).prices.len() as c_uint
    }

    unsafe fn pricedb_lookup_latest(
        &self,
        db: *mut GNCPriceDB,
        commodity: *mut gnc_commodity,
        currency: *mut gnc_commodity,
    ) -> *mut GNCPrice {
        let mut state = self.state();
        let candidates = state.matching_prices(as_id(db), as_id(commodity), as_id(currency));
        let best = candidates
            .into_iter()
            .max_by_key(|id| state.price(*id).time);
        if let Some(id) = best {
            state.price_mut(id).refs += 1;
        }
        opt_ptr(best)
    }

    unsafe fn pricedb_lookup_nearest(
        &self,
        db: *mut GNCPriceDB,
        commodity: *mut gnc_commodity,
        currency: *mut gnc_commodity,
        when: time64,
    ) -> *mut GNCPrice {
        let mut state = self.state();
        let candidates = state.matching_prices(as_id(db), as_id(commodity), as_id(currency));
        let best = candidates
            .into_iter()
            .min_by_key(|id| state.price(*id).time.abs_diff(when));
        if let Some(id) = best {
            state.price_mut(id).refs += 1;
        }
        opt_ptr(best)
    }
}

#[cfg(test)]
mod tests {
    use std::ptr;

    use super::*;
    use crate::{ERR_BACKEND_NO_HANDLER, ERR_FILEIO_FILE_NOT_FOUND};

    fn c(text: &str) -> CString {
        CString::new(text).unwrap()
    }

    unsafe fn pop(engine: &SimEngine, session: *mut QofSession) -> QofBackendError {
        engine.session_pop_error(session)
    }

    #[test]
    fn new_book_has_named_root_account() {
        let engine = SimEngine::new();
        unsafe {
            let book = engine.book_new();
            let root = engine.book_get_root_account(book);
            let name = CStr::from_ptr(engine.account_get_name(root));
            assert_eq!(name.to_str().unwrap(), "Root Account");
            assert_eq!(engine.account_get_type(root), 13);
            engine.book_destroy(book);
        }
        assert_eq!(engine.live_books(), 0);
        assert_eq!(engine.live_entities(), 0);
    }

    #[test]
    #[should_panic(expected = "is not live")]
    fn released_handles_abort() {
        let engine = SimEngine::new();
        unsafe {
            let book = engine.book_new();
            let root = engine.book_get_root_account(book);
            engine.book_destroy(book);
            engine.account_get_name(root);
        }
    }

    #[test]
    fn balances_follow_reconcile_flags() {
        let engine = SimEngine::new();
        unsafe {
            let book = engine.book_new();
            let account = engine.account_malloc(book);
            let trans = engine.trans_malloc(book);
            engine.trans_begin_edit(trans);
            for (amount, flag) in [(100, b'n'), (200, b'c'), (400, b'y')] {
                let split = engine.split_malloc(book);
                engine.split_set_parent(split, trans);
                engine.split_set_account(split, account);
                engine.split_set_amount(split, gnc_numeric { num: amount, denom: 100 });
                engine.split_set_reconcile(split, flag as c_char);
            }
            engine.trans_commit_edit(trans);
            assert_eq!(engine.account_get_balance(account), gnc_numeric { num: 700, denom: 100 });
            assert_eq!(
                engine.account_get_cleared_balance(account),
                gnc_numeric { num: 600, denom: 100 }
            );
            assert_eq!(
                engine.account_get_reconciled_balance(account),
                gnc_numeric { num: 400, denom: 100 }
            );
        }
    }

    #[test]
    fn rollback_restores_fields_and_drops_new_splits() {
        let engine = SimEngine::new();
        unsafe {
            let book = engine.book_new();
            let trans = engine.trans_malloc(book);
            engine.trans_begin_edit(trans);
            engine.trans_set_description(trans, c("before").as_ptr());
            let kept = engine.split_malloc(book);
            engine.split_set_parent(kept, trans);
            engine.trans_commit_edit(trans);

            engine.trans_begin_edit(trans);
            engine.trans_set_description(trans, c("after").as_ptr());
            let split = engine.split_malloc(book);
            engine.split_set_parent(split, trans);
            engine.trans_rollback_edit(trans);

            let text = CStr::from_ptr(engine.trans_get_description(trans));
            assert_eq!(text.to_str().unwrap(), "before");
            assert_eq!(engine.trans_count_splits(trans), 1);
            assert_eq!(engine.trans_get_split(trans, 0), kept);
            assert_eq!(engine.trans_is_open(trans), 0);
        }
    }

    #[test]
    fn committing_an_emptied_transaction_destroys_it() {
        let engine = SimEngine::new();
        unsafe {
            let book = engine.book_new();
            let fresh = engine.trans_malloc(book);
            engine.trans_begin_edit(fresh);
            engine.trans_commit_edit(fresh);
            assert_eq!(engine.book_count_transactions(book), 0);

            let trans = engine.trans_malloc(book);
            engine.trans_begin_edit(trans);
            let split = engine.split_malloc(book);
            engine.split_set_parent(split, trans);
            engine.trans_commit_edit(trans);
            assert_eq!(engine.book_count_transactions(book), 1);

            engine.trans_begin_edit(trans);
            assert_eq!(engine.split_destroy(split), 1);
            engine.trans_commit_edit(trans);
            assert_eq!(engine.book_count_transactions(book), 0);
        }
        assert_eq!(engine.live_entities(), 1);
    }

    #[test]
    fn nothing_is_allocated_while_out_of_memory() {
        let engine = SimEngine::new();
        engine.set_out_of_memory(true);
        assert!(engine.book_new().is_null());
        unsafe {
            assert!(engine.session_new(ptr::null_mut()).is_null());
        }
        assert_eq!(engine.live_books(), 0);
        assert_eq!(engine.live_sessions(), 0);

        engine.set_out_of_memory(false);
        unsafe {
            let book = engine.book_new();
            engine.set_out_of_memory(true);
            assert!(engine.trans_malloc(book).is_null());
            assert!(engine.split_malloc(book).is_null());
            assert!(engine.account_malloc(book).is_null());
            assert!(engine.price_create(book).is_null());
            assert_eq!(engine.live_entities(), 1);
            engine.book_destroy(book);
        }
    }

    #[test]
    fn read_only_books_refuse_destruction() {
        let engine = SimEngine::new();
        unsafe {
            let book = engine.book_new();
            let trans = engine.trans_malloc(book);
            engine.trans_begin_edit(trans);
            let split = engine.split_malloc(book);
            engine.split_set_parent(split, trans);
            engine.trans_commit_edit(trans);
            engine.state().book_mut(as_id(book)).readonly = true;

            engine.trans_begin_edit(trans);
            assert_eq!(engine.split_destroy(split), 0);
            engine.trans_destroy(trans);
            assert_eq!(engine.trans_is_open(trans), 0);
            assert_eq!(engine.trans_count_splits(trans), 1);
            assert_eq!(engine.book_count_transactions(book), 1);
        }
    }

    #[test]
    fn price_references_are_counted() {
        let engine = SimEngine::new();
        unsafe {
            let book = engine.book_new();
            let db = engine.pricedb_get_db(book);
            let usd = engine.commodity_find_or_create(book, c("CURRENCY").as_ptr(), c("USD").as_ptr());
            let eur = engine.commodity_find_or_create(book, c("CURRENCY").as_ptr(), c("EUR").as_ptr());
            let price = engine.price_create(book);
            engine.price_set_commodity(price, eur);
            engine.price_set_currency(price, usd);
            engine.price_set_time(price, 100);
            assert_eq!(engine.pricedb_add_price(db, price), 1);
            engine.price_unref(price);
            assert_eq!(engine.pricedb_get_num_prices(db), 1);

            let found = engine.pricedb_lookup_latest(db, eur, usd);
            assert_eq!(found, price);
            engine.price_unref(found);

            assert_eq!(engine.pricedb_remove_price(db, price), 1);
            assert_eq!(engine.pricedb_get_num_prices(db), 0);
        }
        assert_eq!(engine.live_entities(), 1);
    }

    #[test]
    fn inverted_prices_swap_the_pair() {
        let engine = SimEngine::new();
        unsafe {
            let book = engine.book_new();
            let usd = engine.commodity_find_or_create(book, c("CURRENCY").as_ptr(), c("USD").as_ptr());
            let eur = engine.commodity_find_or_create(book, c("CURRENCY").as_ptr(), c("EUR").as_ptr());
            let price = engine.price_create(book);
            engine.price_set_commodity(price, eur);
            engine.price_set_currency(price, usd);
            engine.price_set_value(price, gnc_numeric { num: -125, denom: 100 });
            engine.price_set_source_string(price, c("Finance::Quote").as_ptr());
            engine.price_set_source_string(price, c("no such source").as_ptr());
            let name = CStr::from_ptr(engine.price_get_source_string(price));
            assert_eq!(name.to_str().unwrap(), "Finance::Quote");

            let inverse = engine.price_invert(price);
            assert_eq!(engine.price_get_commodity(inverse), usd);
            assert_eq!(engine.price_get_currency(inverse), eur);
            assert_eq!(engine.price_get_value(inverse), gnc_numeric { num: -100, denom: 125 });
            assert_eq!(engine.price_get_source(inverse), PriceSource::Temporary.code());
            engine.price_unref(inverse);
            engine.price_unref(price);
        }
        assert_eq!(engine.live_entities(), 1);
    }

    #[test]
    fn session_errors_are_popped_once() {
        let engine = SimEngine::new();
        unsafe {
            let session = engine.session_new(ptr::null_mut());
            engine.session_begin(session, c("mysql://host/db").as_ptr(), 0);
            assert_eq!(pop(&engine, session), ERR_BACKEND_NO_HANDLER);
            assert_eq!(pop(&engine, session), ERR_BACKEND_NO_ERR);

            engine.session_begin(session, c("xml:///no/such/dir/book.gnucash").as_ptr(), 0);
            assert_eq!(pop(&engine, session), ERR_FILEIO_FILE_NOT_FOUND);
            engine.session_destroy(session);
        }
        assert_eq!(engine.live_sessions(), 0);
        assert_eq!(engine.live_books(), 0);
    }

    #[test]
    fn stores_are_locked_while_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books.gnucash");
        let uri = c(&format!("xml://{}", path.display()));
        let engine = SimEngine::new();
        unsafe {
            let first = engine.session_new(ptr::null_mut());
            engine.session_begin(first, uri.as_ptr(), SessionOpenMode::NewStore.code());
            assert_eq!(pop(&engine, first), ERR_BACKEND_NO_ERR);
            engine.session_save(first);
            assert_eq!(pop(&engine, first), ERR_BACKEND_NO_ERR);

            let second = engine.session_new(ptr::null_mut());
            engine.session_begin(second, uri.as_ptr(), SessionOpenMode::Normal.code());
            assert_eq!(pop(&engine, second), ERR_BACKEND_LOCKED);
            engine.session_destroy(second);

            engine.session_destroy(first);
            let third = engine.session_new(ptr::null_mut());
            engine.session_begin(third, uri.as_ptr(), SessionOpenMode::Normal.code());
            assert_eq!(pop(&engine, third), ERR_BACKEND_NO_ERR);
            engine.session_load(third);
            assert_eq!(pop(&engine, third), ERR_BACKEND_NO_ERR);
            engine.session_destroy(third);
        }
        assert!(!store::lock_path(&path).exists());
    }
}
