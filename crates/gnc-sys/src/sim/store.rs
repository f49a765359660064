//! JSON file stores for the simulated engine.
//!
//! One file per book. The lock is a sibling file with a `.LCK` suffix.

use std::ffi::{CString, OsString};
use std::fs;
use std::io::Write;
use std::os::raw::{c_char, c_int};
use std::path::{Path, PathBuf};

use gnc_domain::{Commodity, Guid, Numeric};
use serde::{Deserialize, Serialize};

use super::state::{Id, SimState};
use crate::{
    QofBackendError, ERR_BACKEND_BAD_URL, ERR_BACKEND_NO_HANDLER, ERR_FILEIO_FILE_EMPTY,
    ERR_FILEIO_PARSE_ERROR, ERR_FILEIO_READ_ERROR, ERR_FILEIO_WRITE_ERROR,
};

const STORE_FORMAT: u32 = 1;
const LOCK_SUFFIX: &str = ".LCK";

pub(crate) type StoreError = (QofBackendError, String);

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StoredBook {
    pub format: u32,
    pub guid: Guid,
    pub root: StoredAccount,
    #[serde(default)]
    pub transactions: Vec<StoredTransaction>,
    #[serde(default)]
    pub prices: Vec<StoredPrice>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StoredAccount {
    pub guid: Guid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub code: String,
    pub kind: i32,
    #[serde(default)]
    pub children: Vec<StoredAccount>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StoredTransaction {
    pub guid: Guid,
    pub description: String,
    pub num: String,
    pub notes: String,
    pub posted: i64,
    pub entered: i64,
    pub splits: Vec<StoredSplit>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StoredSplit {
    pub guid: Guid,
    pub account: Option<Guid>,
    pub amount: Numeric,
    pub value: Numeric,
    pub memo: String,
    pub action: String,
    pub reconcile: char,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StoredPrice {
    pub guid: Guid,
    pub commodity: Option<Commodity>,
    pub currency: Option<Commodity>,
    pub time: i64,
    pub value: Numeric,
    pub source: i32,
    pub type_string: String,
}

/// Maps a session URI onto a file path. Only file-backed schemes are served.
pub(crate) fn store_path(uri: &str) -> Result<PathBuf, StoreError> {
    match uri.split_once("://") {
        Some(("file" | "xml" | "sqlite3", rest)) if !rest.is_empty() => Ok(PathBuf::from(rest)),
        Some(("file" | "xml" | "sqlite3", _)) => {
            Err((ERR_BACKEND_BAD_URL, format!("no path in `{uri}`")))
        }
        Some((scheme, _)) => Err((
            ERR_BACKEND_NO_HANDLER,
            format!("no backend registered for `{scheme}`"),
        )),
        None if uri.is_empty() => Err((ERR_BACKEND_BAD_URL, "empty uri".to_string())),
        None => Ok(PathBuf::from(uri)),
    }
}

pub(crate) fn lock_path(path: &Path) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(LOCK_SUFFIX);
    PathBuf::from(raw)
}

pub(crate) fn read(path: &Path) -> Result<StoredBook, StoreError> {
    let raw = fs::read_to_string(path)
        .map_err(|err| (ERR_FILEIO_READ_ERROR, format!("{}: {err}", path.display())))?;
    if raw.trim().is_empty() {
        return Err((ERR_FILEIO_FILE_EMPTY, format!("{} is empty", path.display())));
    }
    serde_json::from_str(&raw)
        .map_err(|err| (ERR_FILEIO_PARSE_ERROR, format!("{}: {err}", path.display())))
}

/// Temp file plus rename so a failed save never truncates the store.
pub(crate) fn write(path: &Path, stored: &StoredBook) -> Result<(), StoreError> {
    let write_err = |err: std::io::Error| (ERR_FILEIO_WRITE_ERROR, format!("{}: {err}", path.display()));
    let json = serde_json::to_vec_pretty(stored)
        .map_err(|err| (ERR_FILEIO_WRITE_ERROR, err.to_string()))?;
    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    {
        let mut file = fs::File::create(&tmp).map_err(write_err)?;
        file.write_all(&json).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
    }
    fs::rename(&tmp, path).map_err(write_err)
}

fn text(value: &CString) -> String {
    value.to_string_lossy().into_owned()
}

fn cstring(value: String) -> CString {
    CString::new(value).unwrap_or_default()
}

fn numeric(raw: crate::gnc_numeric, what: &str) -> Result<Numeric, StoreError> {
    Numeric::try_from(raw).map_err(|err| (ERR_FILEIO_WRITE_ERROR, format!("{what}: {err}")))
}

impl SimState {
    pub(crate) fn export_book(&self, book: Id) -> Result<StoredBook, StoreError> {
        let entry = self.book(book);
        let root = self.export_account(entry.root);

        let mut transactions: Vec<StoredTransaction> = Vec::new();
        let mut ids: Vec<&Id> = self
            .transactions
            .iter()
            .filter(|(_, t)| t.book == book)
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        for id in ids {
            let txn = self.trans(*id);
            let mut splits = Vec::with_capacity(txn.splits.len());
            for split in &txn.splits {
                let split = self.split(*split);
                splits.push(StoredSplit {
                    guid: split.guid,
                    account: split.account.map(|a| self.account(a).guid),
                    amount: numeric(split.amount, "split amount")?,
                    value: numeric(split.value, "split value")?,
                    memo: text(&split.memo),
                    action: text(&split.action),
                    reconcile: split.reconcile as u8 as char,
                });
            }
            transactions.push(StoredTransaction {
                guid: txn.guid,
                description: text(&txn.description),
                num: text(&txn.num),
                notes: text(&txn.notes),
                posted: txn.posted,
                entered: txn.entered,
                splits,
            });
        }

        let mut prices = Vec::with_capacity(entry.prices.len());
        for id in &entry.prices {
            let price = self.price(*id);
            let commodity = |c: Option<Id>| {
                c.map(|c| {
                    let c = self.commodity(c);
                    Commodity::new(text(&c.namespace), text(&c.mnemonic))
                })
            };
            prices.push(StoredPrice {
                guid: price.guid,
                commodity: commodity(price.commodity),
                currency: commodity(price.currency),
                time: price.time,
                value: numeric(price.value, "price value")?,
                source: price.source,
                type_string: text(&price.typestr),
            });
        }

        Ok(StoredBook {
            format: STORE_FORMAT,
            guid: entry.guid,
            root,
            transactions,
            prices,
        })
    }

    fn export_account(&self, id: Id) -> StoredAccount {
        let account = self.account(id);
        StoredAccount {
            guid: account.guid,
            name: text(&account.name),
            description: text(&account.description),
            code: text(&account.code),
            kind: account.kind,
            children: account
                .children
                .iter()
                .map(|child| self.export_account(*child))
                .collect(),
        }
    }

    /// Replaces the contents of a freshly created book with a stored one.
    pub(crate) fn import_book(&mut self, book: Id, stored: StoredBook) -> Result<(), StoreError> {
        if stored.format != STORE_FORMAT {
            return Err((
                ERR_FILEIO_PARSE_ERROR,
                format!("unsupported store format {}", stored.format),
            ));
        }
        self.book_mut(book).guid = stored.guid;
        let root = self.book(book).root;
        self.import_account_fields(root, &stored.root);
        for child in stored.root.children {
            self.import_account(book, root, child);
        }

        for txn in stored.transactions {
            let id = self.create_trans(book);
            {
                let entry = self.trans_mut(id);
                entry.guid = txn.guid;
                entry.description = cstring(txn.description);
                entry.num = cstring(txn.num);
                entry.notes = cstring(txn.notes);
                entry.posted = txn.posted;
                entry.entered = txn.entered;
            }
            for split in txn.splits {
                let sid = self.create_split(book);
                {
                    let entry = self.split_mut(sid);
                    entry.guid = split.guid;
                    entry.amount = split.amount.into();
                    entry.value = split.value.into();
                    entry.memo = cstring(split.memo);
                    entry.action = cstring(split.action);
                    entry.reconcile = split.reconcile as u8 as c_char;
                }
                self.set_split_parent(sid, Some(id));
                if let Some(guid) = split.account {
                    let account = Self::guid_lookup(&self.accounts, guid, |a| {
                        (a.book == book).then_some(a.guid)
                    })
                    .ok_or_else(|| {
                        (
                            ERR_FILEIO_PARSE_ERROR,
                            format!("split {} names unknown account {guid}", split.guid),
                        )
                    })?;
                    self.set_split_account(sid, Some(account));
                }
            }
        }

        for price in stored.prices {
            let id = self.create_price(book);
            let commodity = price.commodity.map(|c| self.intern_commodity(book, c));
            let currency = price.currency.map(|c| self.intern_commodity(book, c));
            let entry = self.price_mut(id);
            entry.guid = price.guid;
            entry.commodity = commodity;
            entry.currency = currency;
            entry.time = price.time;
            entry.value = price.value.into();
            entry.source = price.source as c_int;
            entry.typestr = cstring(price.type_string);
            entry.in_db = true;
            self.book_mut(book).prices.push(id);
        }

        self.book_mut(book).dirty = false;
        Ok(())
    }

    fn import_account(&mut self, book: Id, parent: Id, stored: StoredAccount) {
        let id = self.create_account(book);
        self.import_account_fields(id, &stored);
        self.append_child(parent, id);
        for child in stored.children {
            self.import_account(book, id, child);
        }
    }

    fn import_account_fields(&mut self, id: Id, stored: &StoredAccount) {
        let account = self.account_mut(id);
        account.guid = stored.guid;
        account.name = cstring(stored.name.clone());
        account.description = cstring(stored.description.clone());
        account.code = cstring(stored.code.clone());
        account.kind = stored.kind as c_int;
    }

    fn intern_commodity(&mut self, book: Id, commodity: Commodity) -> Id {
        match self.find_commodity(book, commodity.namespace.as_bytes(), commodity.mnemonic.as_bytes()) {
            Some(id) => id,
            None => self.create_commodity(
                book,
                cstring(commodity.namespace),
                cstring(commodity.mnemonic),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_schemes_map_to_paths() {
        assert_eq!(
            store_path("xml:///tmp/books/a.gnucash").unwrap(),
            PathBuf::from("/tmp/books/a.gnucash")
        );
        assert_eq!(store_path("plain.gnucash").unwrap(), PathBuf::from("plain.gnucash"));
        assert_eq!(store_path("postgres://db/x").unwrap_err().0, ERR_BACKEND_NO_HANDLER);
        assert_eq!(store_path("").unwrap_err().0, ERR_BACKEND_BAD_URL);
    }

    #[test]
    fn lock_sits_next_to_store() {
        assert_eq!(
            lock_path(Path::new("/tmp/a.gnucash")),
            PathBuf::from("/tmp/a.gnucash.LCK")
        );
    }

    #[test]
    fn empty_and_garbled_files_are_distinguished() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.gnucash");
        fs::write(&empty, "").unwrap();
        assert_eq!(read(&empty).unwrap_err().0, ERR_FILEIO_FILE_EMPTY);

        let garbled = dir.path().join("garbled.gnucash");
        fs::write(&garbled, "{ not json").unwrap();
        assert_eq!(read(&garbled).unwrap_err().0, ERR_FILEIO_PARSE_ERROR);
    }

    #[test]
    fn books_survive_export_and_import() {
        let mut state = SimState::default();
        let book = state.create_book();
        let root = state.book(book).root;
        let checking = state.create_account(book);
        state.account_mut(checking).name = cstring("Checking".into());
        state.append_child(root, checking);
        let txn = state.create_trans(book);
        let split = state.create_split(book);
        state.set_split_parent(split, Some(txn));
        state.set_split_account(split, Some(checking));
        state.split_mut(split).amount = crate::gnc_numeric { num: -5000, denom: 100 };

        let stored = state.export_book(book).unwrap();
        let copy = state.create_book();
        state.import_book(copy, stored).unwrap();

        let copy_root = state.book(copy).root;
        let found = state.lookup_by_name(copy_root, b"Checking").unwrap();
        assert_eq!(state.account(found).guid, state.account(checking).guid);
        let split = state.account(found).splits[0];
        assert_eq!(state.split(split).amount, crate::gnc_numeric { num: -5000, denom: 100 });
        assert!(!state.book(copy).dirty);
    }
}
