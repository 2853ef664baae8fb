use chrono::{Datelike, NaiveDate};
use sea_orm::DatabaseConnection;

use crate::{EngineError, ResultEngine};

mod accounts;
mod budgets;
mod reports;
mod transactions;

pub use accounts::AccountPatch;
pub use budgets::BudgetPatch;
pub use reports::{
    BudgetSummary, MonthOverMonth, MonthlyBudgetOverview, MonthlySummaryEntry, MonthlyTotals,
    MonthlyTotalsChanges, TransactionSummary,
};
pub use transactions::{TransactionFilter, TransactionPatch};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// Validates a user-facing text field: non-empty after trimming, at most
/// 250 characters. The stored value keeps the caller's whitespace.
fn validate_text(value: &str, label: &str) -> ResultEngine<()> {
    if value.trim().is_empty() {
        return Err(EngineError::Validation(format!("{label} is required")));
    }
    if value.chars().count() > 250 {
        return Err(EngineError::Validation(format!(
            "{label} cannot exceed 250 characters"
        )));
    }
    Ok(())
}

/// Truncates a date to the first day of its calendar month.
fn truncate_to_month(date: NaiveDate) -> NaiveDate {
    // with_day(1) cannot fail for day 1 of an existing month.
    date.with_day(1).unwrap_or(date)
}

/// Clamps page and page size to at least 1.
fn clamp_page(page: u64, page_size: u64) -> (u64, u64) {
    (page.max(1), page_size.max(1))
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> Engine {
        Engine {
            database: self.database,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_validation_rejects_blank_and_oversized() {
        assert!(validate_text("Groceries", "Description").is_ok());
        assert!(validate_text("   ", "Description").is_err());
        assert!(validate_text(&"x".repeat(251), "Description").is_err());
        assert!(validate_text(&"x".repeat(250), "Description").is_ok());
    }

    #[test]
    fn month_truncation_keeps_year_and_month() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 17).unwrap();
        assert_eq!(
            truncate_to_month(date),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn page_clamping() {
        assert_eq!(clamp_page(0, 0), (1, 1));
        assert_eq!(clamp_page(3, 20), (3, 20));
    }
}
