#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use gnucash_bind::{Account, AccountType, Book, Engine, Numeric, SimEngine, SplitSpec, Transaction};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so store folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// A simulated engine plus a handle for inspecting its counters.
pub fn sim_engine() -> (Arc<SimEngine>, Engine) {
    let sim = Arc::new(SimEngine::new());
    let engine = Engine::new(sim.clone());
    (sim, engine)
}

/// A path inside a fresh temporary directory. Nothing is created at the path.
pub fn store_path(name: &str) -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().join(name);
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    path
}

pub fn store_uri(name: &str) -> String {
    format!("xml://{}", store_path(name).display())
}

pub fn n(num: i64, denom: i64) -> Numeric {
    Numeric::new(num, denom).expect("valid numeric")
}

/// `Assets:Checking`, `Expenses:Groceries` and `Income:Salary` under the root.
pub struct Chart {
    pub assets: Account,
    pub checking: Account,
    pub expenses: Account,
    pub groceries: Account,
    pub income: Account,
    pub salary: Account,
}

pub fn sample_chart(book: &Book) -> Chart {
    let root = book.root_account().expect("root account");
    let assets = book
        .create_account(&root, "Assets", AccountType::Asset)
        .expect("create Assets");
    let checking = book
        .create_account(&assets, "Checking", AccountType::Bank)
        .expect("create Checking");
    let expenses = book
        .create_account(&root, "Expenses", AccountType::Expense)
        .expect("create Expenses");
    let groceries = book
        .create_account(&expenses, "Groceries", AccountType::Expense)
        .expect("create Groceries");
    let income = book
        .create_account(&root, "Income", AccountType::Income)
        .expect("create Income");
    let salary = book
        .create_account(&income, "Salary", AccountType::Income)
        .expect("create Salary");
    Chart {
        assets,
        checking,
        expenses,
        groceries,
        income,
        salary,
    }
}

/// Commits a balanced two-split transaction moving `amount` from `from` to `to`.
pub fn transfer(book: &Book, from: &Account, to: &Account, amount: Numeric, memo: &str) -> Transaction {
    let trans = book.create_transaction().expect("create transaction");
    let edit = trans.edit().expect("open edit");
    edit.set_description(memo).expect("set description");
    edit.set_posted_ymd(2024, 3, 15).expect("set posted date");
    edit.add_split(&SplitSpec::new(to, amount))
        .expect("add debit split");
    edit.add_split(&SplitSpec::new(from, -amount))
        .expect("add credit split");
    edit.commit().expect("commit transaction");
    trans
}
