//! Lazy sequences over child accounts and splits.
//!
//! A sequence reads the count on its first step and then fetches one item
//! per step. Asking the parent again gives a fresh sequence from the start;
//! cloning one mid-way gives an independent cursor. The first error is
//! yielded once and ends the sequence.

use crate::account::Account;
use crate::error::{BindingError, Result};
use crate::split::Split;
use crate::transaction::Transaction;

/// Index-driven walk over one parent's items.
pub struct Sequence<P, T> {
    parent: P,
    index: usize,
    len: Option<usize>,
    finished: bool,
    count: fn(&P) -> Result<usize>,
    nth: fn(&P, usize) -> Result<Option<T>>,
}

impl<P: Clone, T> Clone for Sequence<P, T> {
    fn clone(&self) -> Self {
        Self {
            parent: self.parent.clone(),
            index: self.index,
            len: self.len,
            finished: self.finished,
            count: self.count,
            nth: self.nth,
        }
    }
}

impl<P, T> Sequence<P, T> {
    fn with(parent: P, count: fn(&P) -> Result<usize>, nth: fn(&P, usize) -> Result<Option<T>>) -> Self {
        Self {
            parent,
            index: 0,
            len: None,
            finished: false,
            count,
            nth,
        }
    }

    fn fail(&mut self, err: BindingError) -> Option<Result<T>> {
        self.finished = true;
        Some(Err(err))
    }
}

impl<P, T> Iterator for Sequence<P, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let len = match self.len {
            Some(len) => len,
            None => match (self.count)(&self.parent) {
                Ok(len) => *self.len.insert(len),
                Err(err) => return self.fail(err),
            },
        };
        if self.index >= len {
            self.finished = true;
            return None;
        }
        let index = self.index;
        self.index += 1;
        match (self.nth)(&self.parent, index) {
            Ok(Some(item)) => Some(Ok(item)),
            // The list shrank underneath us.
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => self.fail(err),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match (self.finished, self.len) {
            (true, _) => (0, Some(0)),
            (false, Some(len)) => (0, Some(len.saturating_sub(self.index))),
            (false, None) => (0, None),
        }
    }
}

impl<P, T> std::iter::FusedIterator for Sequence<P, T> {}

pub type Children = Sequence<Account, Account>;
/// An account's splits, in the engine's order.
///
/// With the `linked` engine each step copies the account's split list, so a
/// full walk costs O(n²) in the number of splits.
pub type AccountSplits = Sequence<Account, Split>;
pub type TransactionSplits = Sequence<Transaction, Split>;

impl Children {
    pub(crate) fn new(parent: Account) -> Self {
        Sequence::with(parent, Account::n_children, Account::nth_child)
    }
}

impl AccountSplits {
    pub(crate) fn new(account: Account) -> Self {
        Sequence::with(account, Account::split_count, Account::nth_split)
    }
}

impl TransactionSplits {
    pub(crate) fn new(trans: Transaction) -> Self {
        Sequence::with(trans, Transaction::split_count, Transaction::nth_split)
    }
}

/// Depth-first walk of an account subtree, parents before children.
#[derive(Clone)]
pub struct Descendants {
    stack: Vec<Children>,
}

impl Descendants {
    pub(crate) fn new(root: Account) -> Self {
        Self {
            stack: vec![Children::new(root)],
        }
    }
}

impl Iterator for Descendants {
    type Item = Result<Account>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(Ok(account)) => {
                    self.stack.push(account.children());
                    return Some(Ok(account));
                }
                Some(Err(err)) => {
                    self.stack.clear();
                    return Some(Err(err));
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use crate::{AccountType, Engine};

    #[test]
    fn size_hint_shrinks_after_the_first_step() {
        let engine = Engine::simulated();
        let book = engine.new_book().unwrap();
        let root = book.root_account().unwrap();
        for name in ["A", "B", "C"] {
            book.create_account(&root, name, AccountType::Asset).unwrap();
        }

        let mut children = root.children();
        assert_eq!(children.size_hint(), (0, None));
        children.next().unwrap().unwrap();
        assert_eq!(children.size_hint(), (0, Some(2)));
        assert_eq!(children.by_ref().count(), 2);
        assert!(children.next().is_none());
        assert_eq!(children.size_hint(), (0, Some(0)));
    }

    #[test]
    fn a_child_removed_mid_walk_ends_the_sequence() {
        let engine = Engine::simulated();
        let book = engine.new_book().unwrap();
        let root = book.root_account().unwrap();
        let a = book.create_account(&root, "A", AccountType::Asset).unwrap();
        let b = book.create_account(&root, "B", AccountType::Asset).unwrap();

        let mut children = root.children();
        assert_eq!(children.next().unwrap().unwrap(), a);
        a.append_child(&b).unwrap();
        assert!(children.next().is_none());
    }
}
