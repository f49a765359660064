//! Commodity references and price provenance.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Namespace the engine files ISO 4217 currencies under.
pub const CURRENCY_NAMESPACE: &str = "CURRENCY";

/// A commodity identified the way the engine's commodity table keys it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commodity {
    pub namespace: String,
    pub mnemonic: String,
}

impl Commodity {
    pub fn new(namespace: impl Into<String>, mnemonic: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            mnemonic: mnemonic.into(),
        }
    }

    pub fn currency(code: impl Into<String>) -> Self {
        Self::new(CURRENCY_NAMESPACE, code)
    }

    pub fn is_currency(&self) -> bool {
        self.namespace == CURRENCY_NAMESPACE
    }
}

impl fmt::Display for Commodity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.namespace, self.mnemonic)
    }
}

/// Where a price quote came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceSource {
    EditDialog,
    FinanceQuote,
    #[default]
    UserPrice,
    TransferDialog,
    SplitRegister,
    SplitImport,
    StockSplit,
    StockTransaction,
    Invoice,
    Temporary,
    Invalid,
}

impl PriceSource {
    const ORDERED: [PriceSource; 11] = [
        PriceSource::EditDialog,
        PriceSource::FinanceQuote,
        PriceSource::UserPrice,
        PriceSource::TransferDialog,
        PriceSource::SplitRegister,
        PriceSource::SplitImport,
        PriceSource::StockSplit,
        PriceSource::StockTransaction,
        PriceSource::Invoice,
        PriceSource::Temporary,
        PriceSource::Invalid,
    ];

    pub fn code(self) -> i32 {
        Self::ORDERED
            .iter()
            .position(|source| *source == self)
            .map(|idx| idx as i32)
            .unwrap_or(Self::ORDERED.len() as i32 - 1)
    }

    /// Unknown codes collapse to [`PriceSource::Invalid`].
    pub fn from_code(code: i32) -> Self {
        usize::try_from(code)
            .ok()
            .and_then(|idx| Self::ORDERED.get(idx).copied())
            .unwrap_or(PriceSource::Invalid)
    }

    /// The engine's persisted spelling of the source.
    pub fn as_str(self) -> &'static str {
        match self {
            PriceSource::EditDialog => "user:price-editor",
            PriceSource::FinanceQuote => "Finance::Quote",
            PriceSource::UserPrice => "user:price",
            PriceSource::TransferDialog => "user:xfer-dialog",
            PriceSource::SplitRegister => "user:split-register",
            PriceSource::SplitImport => "user:split-import",
            PriceSource::StockSplit => "user:stock-split",
            PriceSource::StockTransaction => "user:stock-transaction",
            PriceSource::Invoice => "user:invoice-post",
            PriceSource::Temporary => "temporary",
            PriceSource::Invalid => "invalid",
        }
    }

    pub fn from_str_lossy(text: &str) -> Self {
        Self::ORDERED
            .into_iter()
            .find(|source| source.as_str() == text)
            .unwrap_or(PriceSource::Invalid)
    }
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
