//! Entity tables behind the simulated engine.
//!
//! Handles are table keys dressed up as pointers. Keys are never reused, so
//! touching a released handle is always detected; it panics the way the real
//! engine would crash.

use std::collections::HashMap;
use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::path::PathBuf;

use gnc_domain::{AccountType, Guid, Numeric, PriceSource, ReconcileState, Time64};

use crate::{gnc_numeric, QofBackendError, ERR_BACKEND_NO_ERR, GNC_ERROR_OVERFLOW};

pub(crate) type Id = usize;

const FIRST_ID: Id = 0x1000;
const ID_STRIDE: Id = 0x10;
const ROOT_ACCOUNT_NAME: &str = "Root Account";
pub(crate) const NO_ACCOUNT_TYPE: c_int = -1;

pub(crate) fn as_ptr<T>(id: Id) -> *mut T {
    id as *mut T
}

pub(crate) fn as_id<T>(ptr: *const T) -> Id {
    ptr as Id
}

pub(crate) fn opt_id<T>(ptr: *const T) -> Option<Id> {
    if ptr.is_null() {
        None
    } else {
        Some(as_id(ptr))
    }
}

pub(crate) fn opt_ptr<T>(id: Option<Id>) -> *mut T {
    id.map(as_ptr).unwrap_or(std::ptr::null_mut())
}

/// Swaps numerator and denominator, keeping the denominator positive. Zero
/// stays zero.
pub(crate) fn invert_numeric(value: gnc_numeric) -> gnc_numeric {
    match value.num {
        0 => zero(),
        num if num > 0 => gnc_numeric { num: value.denom, denom: num },
        num => match (value.denom.checked_neg(), num.checked_neg()) {
            (Some(num), Some(denom)) => gnc_numeric { num, denom },
            _ => gnc_numeric::error(GNC_ERROR_OVERFLOW),
        },
    }
}

pub(crate) fn zero() -> gnc_numeric {
    gnc_numeric { num: 0, denom: 1 }
}

#[derive(Debug)]
pub(crate) struct SimBook {
    pub guid: Guid,
    pub root: Id,
    pub pricedb: Id,
    pub prices: Vec<Id>,
    pub dirty: bool,
    pub readonly: bool,
}

#[derive(Debug)]
pub(crate) struct SimAccount {
    pub guid: Guid,
    pub book: Id,
    pub name: CString,
    pub description: CString,
    pub code: CString,
    pub kind: c_int,
    pub parent: Option<Id>,
    pub children: Vec<Id>,
    pub splits: Vec<Id>,
    pub edit_level: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct SimSplit {
    pub guid: Guid,
    pub book: Id,
    pub trans: Option<Id>,
    pub account: Option<Id>,
    pub amount: gnc_numeric,
    pub value: gnc_numeric,
    pub memo: CString,
    pub action: CString,
    pub reconcile: c_char,
}

#[derive(Debug)]
pub(crate) struct TransSnapshot {
    pub description: CString,
    pub num: CString,
    pub notes: CString,
    pub posted: i64,
    pub splits: Vec<(Id, SimSplit)>,
}

#[derive(Debug)]
pub(crate) struct SimTransaction {
    pub guid: Guid,
    pub book: Id,
    pub description: CString,
    pub num: CString,
    pub notes: CString,
    pub posted: i64,
    pub entered: i64,
    pub splits: Vec<Id>,
    pub edit_level: u32,
    pub snapshot: Option<TransSnapshot>,
}

#[derive(Debug)]
pub(crate) struct SimCommodity {
    pub book: Id,
    pub namespace: CString,
    pub mnemonic: CString,
}

#[derive(Debug)]
pub(crate) struct SimPrice {
    pub guid: Guid,
    pub book: Id,
    pub commodity: Option<Id>,
    pub currency: Option<Id>,
    pub time: i64,
    pub value: gnc_numeric,
    pub source: c_int,
    pub typestr: CString,
    pub refs: u32,
    pub in_db: bool,
}

#[derive(Debug)]
pub(crate) struct SimSession {
    pub book: Id,
    pub path: Option<PathBuf>,
    pub lock: Option<PathBuf>,
    pub error: QofBackendError,
    pub message: CString,
}

impl SimSession {
    pub fn fail(&mut self, code: QofBackendError, message: impl Into<String>) {
        self.error = code;
        self.message = CString::new(message.into()).unwrap_or_default();
    }
}

#[derive(Debug, Default)]
pub(crate) struct SimState {
    next_id: Id,
    pub sessions: HashMap<Id, SimSession>,
    pub books: HashMap<Id, SimBook>,
    pub accounts: HashMap<Id, SimAccount>,
    pub transactions: HashMap<Id, SimTransaction>,
    pub splits: HashMap<Id, SimSplit>,
    pub prices: HashMap<Id, SimPrice>,
    pub pricedbs: HashMap<Id, Id>,
    pub commodities: HashMap<Id, SimCommodity>,
}

fn live<'a, T>(map: &'a HashMap<Id, T>, id: Id, kind: &str) -> &'a T {
    map.get(&id)
        .unwrap_or_else(|| panic!("sim engine: {kind} handle {id:#x} is not live"))
}

fn live_mut<'a, T>(map: &'a mut HashMap<Id, T>, id: Id, kind: &str) -> &'a mut T {
    map.get_mut(&id)
        .unwrap_or_else(|| panic!("sim engine: {kind} handle {id:#x} is not live"))
}

impl SimState {
    pub fn alloc(&mut self) -> Id {
        if self.next_id == 0 {
            self.next_id = FIRST_ID;
        }
        let id = self.next_id;
        self.next_id += ID_STRIDE;
        id
    }

    pub fn session(&mut self, id: Id) -> &mut SimSession {
        live_mut(&mut self.sessions, id, "session")
    }

    pub fn book(&self, id: Id) -> &SimBook {
        live(&self.books, id, "book")
    }

    pub fn book_mut(&mut self, id: Id) -> &mut SimBook {
        live_mut(&mut self.books, id, "book")
    }

    pub fn account(&self, id: Id) -> &SimAccount {
        live(&self.accounts, id, "account")
    }

    pub fn account_mut(&mut self, id: Id) -> &mut SimAccount {
        live_mut(&mut self.accounts, id, "account")
    }

    pub fn trans(&self, id: Id) -> &SimTransaction {
        live(&self.transactions, id, "transaction")
    }

    pub fn trans_mut(&mut self, id: Id) -> &mut SimTransaction {
        live_mut(&mut self.transactions, id, "transaction")
    }

    pub fn split(&self, id: Id) -> &SimSplit {
        live(&self.splits, id, "split")
    }

    pub fn split_mut(&mut self, id: Id) -> &mut SimSplit {
        live_mut(&mut self.splits, id, "split")
    }

    pub fn price(&self, id: Id) -> &SimPrice {
        live(&self.prices, id, "price")
    }

    pub fn price_mut(&mut self, id: Id) -> &mut SimPrice {
        live_mut(&mut self.prices, id, "price")
    }

    pub fn commodity(&self, id: Id) -> &SimCommodity {
        live(&self.commodities, id, "commodity")
    }

    pub fn pricedb_book(&self, db: Id) -> Id {
        *live(&self.pricedbs, db, "price database")
    }

    pub fn touch(&mut self, book: Id) {
        if let Some(book) = self.books.get_mut(&book) {
            book.dirty = true;
        }
    }

    pub fn create_book(&mut self) -> Id {
        let book = self.alloc();
        let pricedb = self.alloc();
        let root = self.create_account(book);
        {
            let account = self.account_mut(root);
            account.name = CString::new(ROOT_ACCOUNT_NAME).unwrap_or_default();
            account.kind = AccountType::Root.code();
        }
        self.pricedbs.insert(pricedb, book);
        self.books.insert(
            book,
            SimBook {
                guid: Guid::new_random(),
                root,
                pricedb,
                prices: Vec::new(),
                dirty: false,
                readonly: false,
            },
        );
        book
    }

    pub fn destroy_book(&mut self, book: Id) {
        let removed = self.books.remove(&book);
        if removed.is_none() {
            panic!("sim engine: book handle {book:#x} is not live");
        }
        self.accounts.retain(|_, a| a.book != book);
        self.transactions.retain(|_, t| t.book != book);
        self.splits.retain(|_, s| s.book != book);
        self.prices.retain(|_, p| p.book != book);
        self.commodities.retain(|_, c| c.book != book);
        self.pricedbs.retain(|_, owner| *owner != book);
    }

    pub fn create_account(&mut self, book: Id) -> Id {
        let id = self.alloc();
        self.accounts.insert(
            id,
            SimAccount {
                guid: Guid::new_random(),
                book,
                name: CString::default(),
                description: CString::default(),
                code: CString::default(),
                kind: NO_ACCOUNT_TYPE,
                parent: None,
                children: Vec::new(),
                splits: Vec::new(),
                edit_level: 0,
            },
        );
        id
    }

    pub fn append_child(&mut self, parent: Id, child: Id) {
        self.account(parent);
        if let Some(old) = self.account(child).parent {
            self.account_mut(old).children.retain(|c| *c != child);
        }
        self.account_mut(parent).children.push(child);
        self.account_mut(child).parent = Some(parent);
        let book = self.account(parent).book;
        self.touch(book);
    }

    pub fn lookup_by_name(&self, parent: Id, name: &[u8]) -> Option<Id> {
        let children = &self.account(parent).children;
        if let Some(hit) = children
            .iter()
            .find(|child| self.account(**child).name.as_bytes() == name)
        {
            return Some(*hit);
        }
        children
            .iter()
            .find_map(|child| self.lookup_by_name(*child, name))
    }

    pub fn full_name(&self, account: Id) -> String {
        let mut parts = Vec::new();
        let mut cursor = Some(account);
        while let Some(id) = cursor {
            let node = self.account(id);
            if node.parent.is_none() && node.kind == AccountType::Root.code() {
                break;
            }
            parts.push(node.name.to_string_lossy().into_owned());
            cursor = node.parent;
        }
        parts.reverse();
        parts.join(":")
    }

    /// Sums split amounts whose reconcile flag passes `include`.
    pub fn balance(&self, account: Id, include: impl Fn(char) -> bool) -> gnc_numeric {
        let mut total = Numeric::zero();
        for split in &self.account(account).splits {
            let split = self.split(*split);
            if !include(split.reconcile as u8 as char) {
                continue;
            }
            let amount = match Numeric::try_from(split.amount) {
                Ok(amount) => amount,
                Err(_) => return gnc_numeric::error(GNC_ERROR_OVERFLOW),
            };
            total = match total.checked_add(&amount) {
                Ok(sum) => sum,
                Err(_) => return gnc_numeric::error(GNC_ERROR_OVERFLOW),
            };
        }
        total.into()
    }

    pub fn imbalance(&self, trans: Id) -> gnc_numeric {
        let mut total = Numeric::zero();
        for split in &self.trans(trans).splits {
            let value = match Numeric::try_from(self.split(*split).value) {
                Ok(value) => value,
                Err(_) => return gnc_numeric::error(GNC_ERROR_OVERFLOW),
            };
            total = match total.checked_add(&value) {
                Ok(sum) => sum,
                Err(_) => return gnc_numeric::error(GNC_ERROR_OVERFLOW),
            };
        }
        total.into()
    }

    pub fn create_trans(&mut self, book: Id) -> Id {
        let id = self.alloc();
        self.transactions.insert(
            id,
            SimTransaction {
                guid: Guid::new_random(),
                book,
                description: CString::default(),
                num: CString::default(),
                notes: CString::default(),
                posted: 0,
                entered: Time64::now().secs(),
                splits: Vec::new(),
                edit_level: 0,
                snapshot: None,
            },
        );
        id
    }

    pub fn begin_trans_edit(&mut self, trans: Id) {
        if self.trans(trans).edit_level == 0 {
            let splits = self
                .trans(trans)
                .splits
                .iter()
                .map(|id| (*id, self.split(*id).clone()))
                .collect();
            let txn = self.trans(trans);
            let snapshot = TransSnapshot {
                description: txn.description.clone(),
                num: txn.num.clone(),
                notes: txn.notes.clone(),
                posted: txn.posted,
                splits,
            };
            self.trans_mut(trans).snapshot = Some(snapshot);
        }
        self.trans_mut(trans).edit_level += 1;
    }

    pub fn commit_trans_edit(&mut self, trans: Id) {
        let txn = self.trans_mut(trans);
        if txn.edit_level == 0 {
            return;
        }
        txn.edit_level -= 1;
        if txn.edit_level > 0 {
            return;
        }
        txn.snapshot = None;
        // An emptied transaction does not survive its commit.
        if txn.splits.is_empty() {
            self.destroy_trans(trans);
            return;
        }
        let book = txn.book;
        self.touch(book);
    }

    pub fn rollback_trans_edit(&mut self, trans: Id) {
        let txn = self.trans_mut(trans);
        if txn.edit_level == 0 {
            return;
        }
        txn.edit_level = 0;
        let Some(snapshot) = txn.snapshot.take() else {
            return;
        };
        txn.description = snapshot.description;
        txn.num = snapshot.num;
        txn.notes = snapshot.notes;
        txn.posted = snapshot.posted;

        let current: Vec<Id> = txn.splits.clone();
        for split in current {
            if !snapshot.splits.iter().any(|(id, _)| *id == split) {
                self.destroy_split(split);
            }
        }
        for (id, saved) in &snapshot.splits {
            if self.splits.contains_key(id) {
                self.detach_split_account(*id);
            }
            self.splits.insert(*id, saved.clone());
            if let Some(account) = saved.account {
                if self.accounts.contains_key(&account) {
                    self.account_mut(account).splits.push(*id);
                }
            }
        }
        self.trans_mut(trans).splits = snapshot.splits.iter().map(|(id, _)| *id).collect();
    }

    pub fn destroy_trans(&mut self, trans: Id) {
        let splits = self.trans(trans).splits.clone();
        for split in splits {
            self.destroy_split(split);
        }
        let book = self.trans(trans).book;
        self.transactions.remove(&trans);
        self.touch(book);
    }

    pub fn create_split(&mut self, book: Id) -> Id {
        let id = self.alloc();
        self.splits.insert(
            id,
            SimSplit {
                guid: Guid::new_random(),
                book,
                trans: None,
                account: None,
                amount: zero(),
                value: zero(),
                memo: CString::default(),
                action: CString::default(),
                reconcile: ReconcileState::NotReconciled.as_char() as c_char,
            },
        );
        id
    }

    pub fn set_split_parent(&mut self, split: Id, trans: Option<Id>) {
        if let Some(old) = self.split(split).trans {
            if let Some(txn) = self.transactions.get_mut(&old) {
                txn.splits.retain(|s| *s != split);
            }
        }
        if let Some(new) = trans {
            self.trans_mut(new).splits.push(split);
        }
        self.split_mut(split).trans = trans;
    }

    pub fn set_split_account(&mut self, split: Id, account: Option<Id>) {
        self.detach_split_account(split);
        if let Some(new) = account {
            self.account_mut(new).splits.push(split);
        }
        self.split_mut(split).account = account;
        let book = self.split(split).book;
        self.touch(book);
    }

    fn detach_split_account(&mut self, split: Id) {
        if let Some(old) = self.split(split).account {
            if let Some(account) = self.accounts.get_mut(&old) {
                account.splits.retain(|s| *s != split);
            }
        }
    }

    pub fn destroy_split(&mut self, split: Id) {
        self.detach_split_account(split);
        self.set_split_parent(split, None);
        let book = self.split(split).book;
        self.splits.remove(&split);
        self.touch(book);
    }

    pub fn find_commodity(&self, book: Id, namespace: &[u8], mnemonic: &[u8]) -> Option<Id> {
        self.commodities
            .iter()
            .find(|(_, c)| {
                c.book == book
                    && c.namespace.as_bytes() == namespace
                    && c.mnemonic.as_bytes() == mnemonic
            })
            .map(|(id, _)| *id)
    }

    pub fn create_commodity(&mut self, book: Id, namespace: CString, mnemonic: CString) -> Id {
        let id = self.alloc();
        self.commodities.insert(
            id,
            SimCommodity {
                book,
                namespace,
                mnemonic,
            },
        );
        id
    }

    pub fn create_price(&mut self, book: Id) -> Id {
        let id = self.alloc();
        self.prices.insert(
            id,
            SimPrice {
                guid: Guid::new_random(),
                book,
                commodity: None,
                currency: None,
                time: 0,
                value: zero(),
                source: 0,
                typestr: CString::default(),
                refs: 1,
                in_db: false,
            },
        );
        id
    }

    /// An unlisted copy with the pair reversed and the value inverted.
    pub fn invert_price(&mut self, price: Id) -> Id {
        let original = self.price(price);
        let book = original.book;
        let (commodity, currency) = (original.currency, original.commodity);
        let time = original.time;
        let value = invert_numeric(original.value);
        let typestr = original.typestr.clone();
        let id = self.create_price(book);
        let inverse = self.price_mut(id);
        inverse.commodity = commodity;
        inverse.currency = currency;
        inverse.time = time;
        inverse.value = value;
        inverse.source = PriceSource::Temporary.code();
        inverse.typestr = typestr;
        id
    }

    pub fn unref_price(&mut self, price: Id) {
        let entry = self.price_mut(price);
        entry.refs = entry
            .refs
            .checked_sub(1)
            .unwrap_or_else(|| panic!("sim engine: price {price:#x} unreferenced twice"));
        if entry.refs == 0 {
            let book = entry.book;
            self.prices.remove(&price);
            if let Some(book) = self.books.get_mut(&book) {
                book.prices.retain(|p| *p != price);
            }
        }
    }

    /// Prices for a commodity pair, in database order.
    pub fn matching_prices(&self, db: Id, commodity: Id, currency: Id) -> Vec<Id> {
        let book = self.pricedb_book(db);
        self.book(book)
            .prices
            .iter()
            .copied()
            .filter(|id| {
                let price = self.price(*id);
                price.commodity == Some(commodity) && price.currency == Some(currency)
            })
            .collect()
    }

    pub fn new_session(&mut self, book: Id) -> Id {
        let id = self.alloc();
        self.sessions.insert(
            id,
            SimSession {
                book,
                path: None,
                lock: None,
                error: ERR_BACKEND_NO_ERR,
                message: CString::default(),
            },
        );
        id
    }

    pub fn guid_lookup<T>(map: &HashMap<Id, T>, guid: Guid, matches: impl Fn(&T) -> Option<Guid>) -> Option<Id> {
        map.iter()
            .find(|(_, entry)| matches(entry) == Some(guid))
            .map(|(id, _)| *id)
    }
}
