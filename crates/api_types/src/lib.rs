//! Wire types shared between the HTTP server and its clients.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Uniform response envelope. `data` carries the payload on success; `code`
/// carries a machine-readable error code on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// One page of an offset-paginated listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct PageView<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub total_pages: u64,
}

/// Offset pagination parameters, defaulting to the first page.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Pagination {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

pub mod account {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountNew {
        pub name: String,
        pub account_type_id: Option<i64>,
        /// Opening balance in minor units; defaults to 0.
        pub balance_minor: Option<i64>,
        pub currency_id: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountUpdate {
        pub name: Option<String>,
        pub account_type_id: Option<i64>,
        pub balance_minor: Option<i64>,
        pub currency_id: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountView {
        pub id: i64,
        pub name: String,
        pub account_type_id: Option<i64>,
        pub balance_minor: i64,
        pub currency_id: Option<i64>,
        pub created_at: DateTime<Utc>,
    }

    /// Request body for deposits and withdrawals.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct Amount {
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferNew {
        pub from_account_id: i64,
        pub to_account_id: i64,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferView {
        pub from: AccountView,
        pub to: AccountView,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TotalBalance {
        pub total_minor: i64,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct LowBalanceQuery {
        /// Balance threshold in minor units; the server defaults it when
        /// absent.
        pub threshold: Option<i64>,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionDirection {
        Income,
        Expense,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionState {
        Pending,
        Completed,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub description: String,
        pub amount_minor: i64,
        /// When the economic event happened, not when it was recorded.
        pub date: DateTime<Utc>,
        pub direction: TransactionDirection,
        /// Defaults to `completed`.
        pub state: Option<TransactionState>,
        pub account_id: i64,
        pub category_id: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub description: Option<String>,
        pub amount_minor: Option<i64>,
        pub date: Option<DateTime<Utc>>,
        pub direction: Option<TransactionDirection>,
        pub state: Option<TransactionState>,
        pub account_id: Option<i64>,
        pub category_id: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: i64,
        pub description: String,
        pub amount_minor: i64,
        pub date: DateTime<Utc>,
        pub created_at: DateTime<Utc>,
        pub direction: TransactionDirection,
        pub state: TransactionState,
        pub account_id: i64,
        pub category_id: i64,
    }

    /// Query string for the filtered listing. All bounds are inclusive.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionListQuery {
        pub start_date: Option<DateTime<Utc>>,
        pub end_date: Option<DateTime<Utc>>,
        pub direction: Option<TransactionDirection>,
        pub state: Option<TransactionState>,
        pub account_id: Option<i64>,
        pub category_id: Option<i64>,
        /// Lower bound on the amount, in minor units.
        pub min_amount: Option<i64>,
        /// Upper bound on the amount, in minor units.
        pub max_amount: Option<i64>,
        pub page: Option<u64>,
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SearchQuery {
        pub term: String,
        pub page: Option<u64>,
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RecentQuery {
        pub limit: Option<u64>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct SummaryQuery {
        pub start_date: Option<DateTime<Utc>>,
        pub end_date: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionSummaryView {
        pub total_income_minor: i64,
        pub total_expenses_minor: i64,
        pub net_minor: i64,
        pub transaction_count: u64,
        pub average_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MonthlySummaryQuery {
        pub year: i32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MonthlySummaryEntryView {
        pub month_name: String,
        pub year: i32,
        pub total_income_minor: i64,
        pub total_expenses_minor: i64,
        pub net_minor: i64,
        pub transaction_count: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MonthlyTotalsView {
        pub total_amount_minor: i64,
        pub total_income_minor: i64,
        pub total_expenses_minor: i64,
        pub balance_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MonthlyTotalsChangesView {
        pub total_amount: String,
        pub total_amount_positive: bool,
        pub total_income: String,
        pub total_income_positive: bool,
        pub total_expenses: String,
        pub total_expenses_positive: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MonthOverMonthView {
        pub current: MonthlyTotalsView,
        pub previous: Option<MonthlyTotalsView>,
        pub changes: Option<MonthlyTotalsChangesView>,
    }
}

pub mod budget {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetNew {
        /// Any day of the target month; the server truncates to the first.
        pub month: NaiveDate,
        pub budgeted_minor: i64,
        pub category_id: i64,
        /// Already-spent amount to start from; defaults to 0.
        pub spent_minor: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetUpdate {
        pub month: Option<NaiveDate>,
        pub budgeted_minor: Option<i64>,
        pub spent_minor: Option<i64>,
        pub category_id: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetView {
        pub id: i64,
        pub month: NaiveDate,
        pub budgeted_minor: i64,
        pub spent_minor: i64,
        pub remaining_minor: i64,
        pub alert_triggered: bool,
        pub category_id: i64,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetListQuery {
        pub month: Option<NaiveDate>,
        pub page: Option<u64>,
        pub limit: Option<u64>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct SummaryQuery {
        pub month: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MonthQuery {
        pub month: NaiveDate,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetSummaryView {
        pub total_budgeted_minor: i64,
        pub total_spent_minor: i64,
        pub total_remaining_minor: i64,
        pub percentage_used: f64,
        pub categories_over_budget: u64,
        pub categories_with_alerts: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MonthlyOverviewView {
        pub month: NaiveDate,
        pub summary: BudgetSummaryView,
        pub budgets: Vec<BudgetView>,
    }

    /// Request body for the upsert endpoint.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetUpsert {
        pub category_id: i64,
        pub month: NaiveDate,
        pub budgeted_minor: i64,
    }
}
