#![doc(test(attr(deny(warnings))))]

//! Safe bindings to the GnuCash engine.
//!
//! Sessions, books, accounts, transactions, splits and prices are exposed as
//! views that check on every use that their book is still open and that the
//! entity they wrap has not been released. Plain values (identifiers, exact
//! rationals, timestamps) come from `gnc_domain` and never touch native code.
//!
//! ```
//! use gnucash_bind::{AccountType, Engine, Numeric, SplitSpec};
//!
//! let engine = Engine::simulated();
//! let book = engine.new_book()?;
//! let root = book.root_account()?;
//! let cash = book.create_account(&root, "Cash", AccountType::Bank)?;
//! let food = book.create_account(&root, "Food", AccountType::Expense)?;
//!
//! let trans = book.create_transaction()?;
//! let edit = trans.edit()?;
//! edit.set_description("Groceries")?;
//! edit.add_split(&SplitSpec::new(&food, Numeric::new(4250, 100)?))?;
//! edit.add_split(&SplitSpec::new(&cash, Numeric::new(-4250, 100)?))?;
//! edit.commit()?;
//!
//! assert!(trans.is_balanced()?);
//! assert_eq!(cash.balance()?, Numeric::new(-4250, 100)?);
//! # Ok::<(), gnucash_bind::BindingError>(())
//! ```

pub mod account;
pub mod book;
pub mod engine;
pub mod error;
pub mod iter;
mod lifeline;
mod marshal;
pub mod price;
pub mod session;
pub mod split;
pub mod transaction;
pub mod utils;

pub use account::{Account, AccountEdit};
pub use book::Book;
pub use engine::Engine;
pub use error::{BackendErrorKind, BindingError, Result};
pub use iter::{AccountSplits, Children, Descendants, TransactionSplits};
pub use price::{Price, PriceDb, PriceEdit, PriceQuote};
pub use session::Session;
pub use split::Split;
pub use transaction::{CommitOutcome, SplitEdit, SplitSpec, Transaction, TransactionEdit};

pub use gnc_config::{BindingConfig, ConfigManager};
pub use gnc_domain::{
    AccountType, Commodity, Guid, IntoNumeric, Numeric, PriceSource, ReconcileState,
    SessionOpenMode, Time64,
};

#[cfg(feature = "sim")]
pub use gnc_sys::sim::SimEngine;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing with the default filter.
pub fn init() {
    init_with(&BindingConfig::default());
}

/// Initializes global tracing with the filter from `config`. Only the first
/// call in a process has any effect.
pub fn init_with(config: &BindingConfig) {
    INIT_TRACING.call_once(|| {
        utils::init_tracing(&config.log_filter);
        tracing::info!(filter = %config.log_filter, "gnucash bindings tracing initialized");
    });
}
