//! Ledger engine: accounts, transactions, and budgets over a relational
//! store.
//!
//! The [`Engine`] owns a [`sea_orm::DatabaseConnection`] and exposes the
//! three core services:
//!
//! - the account ledger (balances, deposit/withdraw/transfer);
//! - the transaction recorder (movement records, filtered lists, reports);
//! - the budget tracker (monthly envelopes, spent/remaining, alerts).
//!
//! All monetary amounts are i64 minor units (cents); the engine performs no
//! floating-point arithmetic on balances or invariants.

use serde::{Deserialize, Serialize};

pub use accounts::Account;
pub use budgets::Budget;
pub use error::EngineError;
pub use ops::{
    AccountPatch, BudgetPatch, BudgetSummary, Engine, EngineBuilder, MonthOverMonth,
    MonthlyBudgetOverview, MonthlySummaryEntry, MonthlyTotals, MonthlyTotalsChanges,
    TransactionFilter, TransactionPatch, TransactionSummary,
};
pub use transactions::{NewTransaction, Transaction, TransactionDirection, TransactionState};

pub mod account_types;
pub mod accounts;
pub mod budgets;
pub mod categories;
pub mod currencies;
pub mod transactions;
pub mod users;

mod error;
mod ops;

type ResultEngine<T> = Result<T, EngineError>;

/// One page of an offset-paginated listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub(crate) fn new(items: Vec<T>, total: u64, page: u64, page_size: u64) -> Self {
        Self {
            items,
            total,
            page,
            total_pages: total.div_ceil(page_size),
        }
    }
}
