//! Account classification and split reconciliation states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Account types with the engine's numeric codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    Bank,
    Cash,
    Asset,
    Credit,
    Liability,
    Stock,
    Mutual,
    Currency,
    Income,
    Expense,
    Equity,
    Receivable,
    Payable,
    Root,
    Trading,
}

impl AccountType {
    pub const ALL: [AccountType; 15] = [
        AccountType::Bank,
        AccountType::Cash,
        AccountType::Asset,
        AccountType::Credit,
        AccountType::Liability,
        AccountType::Stock,
        AccountType::Mutual,
        AccountType::Currency,
        AccountType::Income,
        AccountType::Expense,
        AccountType::Equity,
        AccountType::Receivable,
        AccountType::Payable,
        AccountType::Root,
        AccountType::Trading,
    ];

    pub const fn code(self) -> i32 {
        match self {
            AccountType::Bank => 0,
            AccountType::Cash => 1,
            AccountType::Asset => 2,
            AccountType::Credit => 3,
            AccountType::Liability => 4,
            AccountType::Stock => 5,
            AccountType::Mutual => 6,
            AccountType::Currency => 7,
            AccountType::Income => 8,
            AccountType::Expense => 9,
            AccountType::Equity => 10,
            AccountType::Receivable => 11,
            AccountType::Payable => 12,
            AccountType::Root => 13,
            AccountType::Trading => 14,
        }
    }

    /// `None` for the engine's "none"/"invalid" markers and unknown codes.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    pub fn label(self) -> &'static str {
        match self {
            AccountType::Bank => "Bank",
            AccountType::Cash => "Cash",
            AccountType::Asset => "Asset",
            AccountType::Credit => "Credit Card",
            AccountType::Liability => "Liability",
            AccountType::Stock => "Stock",
            AccountType::Mutual => "Mutual Fund",
            AccountType::Currency => "Currency",
            AccountType::Income => "Income",
            AccountType::Expense => "Expense",
            AccountType::Equity => "Equity",
            AccountType::Receivable => "A/Receivable",
            AccountType::Payable => "A/Payable",
            AccountType::Root => "Root",
            AccountType::Trading => "Trading",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reconciliation flag carried by each split.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReconcileState {
    #[default]
    NotReconciled,
    Cleared,
    Reconciled,
    Frozen,
    Voided,
}

impl ReconcileState {
    pub const fn as_char(self) -> char {
        match self {
            ReconcileState::NotReconciled => 'n',
            ReconcileState::Cleared => 'c',
            ReconcileState::Reconciled => 'y',
            ReconcileState::Frozen => 'f',
            ReconcileState::Voided => 'v',
        }
    }

    pub fn from_char(flag: char) -> Option<Self> {
        match flag {
            'n' => Some(ReconcileState::NotReconciled),
            'c' => Some(ReconcileState::Cleared),
            'y' => Some(ReconcileState::Reconciled),
            'f' => Some(ReconcileState::Frozen),
            'v' => Some(ReconcileState::Voided),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for kind in AccountType::ALL {
            assert_eq!(AccountType::from_code(kind.code()), Some(kind));
        }
        assert_eq!(AccountType::from_code(-1), None);
        assert_eq!(AccountType::from_code(99), None);
    }

    #[test]
    fn reconcile_flags_round_trip() {
        for flag in ['n', 'c', 'y', 'f', 'v'] {
            let state = ReconcileState::from_char(flag).unwrap();
            assert_eq!(state.as_char(), flag);
        }
        assert_eq!(ReconcileState::from_char('x'), None);
    }
}
