//! Aggregated reporting over transactions.
//!
//! Sums and counts are computed in SQL; the engine never loads full row
//! sets just to add them up. Monetary aggregates stay in i64 minor units.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use sea_orm::{ConnectionTrait, Statement, TransactionTrait};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine, TransactionDirection};

use super::{Engine, with_tx};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Income/expense totals over a date range.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub total_income_minor: i64,
    pub total_expenses_minor: i64,
    pub net_minor: i64,
    pub transaction_count: u64,
    /// Mean absolute movement, `(income + expenses) / count`; 0 when empty.
    pub average_minor: i64,
}

/// One calendar month of a year summary. Months without transactions are
/// present with zeroed totals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySummaryEntry {
    pub month_name: String,
    pub year: i32,
    pub total_income_minor: i64,
    pub total_expenses_minor: i64,
    pub net_minor: i64,
    pub transaction_count: u64,
}

/// Totals for one calendar month.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTotals {
    /// Sum of all movements regardless of direction.
    pub total_amount_minor: i64,
    pub total_income_minor: i64,
    pub total_expenses_minor: i64,
    /// Income minus expenses.
    pub balance_minor: i64,
}

/// Formatted month-over-month change indicators.
///
/// Percentages are signed strings like `"+12.5%"`. The `*_positive` flags
/// give the direction a user would read as good: more income is positive,
/// more spending is not.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTotalsChanges {
    pub total_amount: String,
    pub total_amount_positive: bool,
    pub total_income: String,
    pub total_income_positive: bool,
    pub total_expenses: String,
    pub total_expenses_positive: bool,
}

/// Current month versus the previous one. `previous` and `changes` are
/// absent when the prior month recorded no transactions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthOverMonth {
    pub current: MonthlyTotals,
    pub previous: Option<MonthlyTotals>,
    pub changes: Option<MonthlyTotalsChanges>,
}

/// Aggregate view over a set of budgets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub total_budgeted_minor: i64,
    pub total_spent_minor: i64,
    pub total_remaining_minor: i64,
    /// `spent / budgeted * 100`; 0 when nothing is budgeted.
    pub percentage_used: f64,
    pub categories_over_budget: u64,
    pub categories_with_alerts: u64,
}

/// One month's budget summary together with the budgets behind it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBudgetOverview {
    pub month: NaiveDate,
    pub summary: BudgetSummary,
    pub budgets: Vec<crate::Budget>,
}

impl Engine {
    /// Income, expense, and count totals for a user, optionally bounded by
    /// an inclusive date range.
    pub async fn transaction_summary(
        &self,
        user_id: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> ResultEngine<TransactionSummary> {
        let (income, expenses, count) =
            movement_totals(&self.database, user_id, start, end, true).await?;

        let average = if count == 0 {
            0
        } else {
            (income + expenses) / count as i64
        };
        Ok(TransactionSummary {
            total_income_minor: income,
            total_expenses_minor: expenses,
            net_minor: income - expenses,
            transaction_count: count,
            average_minor: average,
        })
    }

    /// Twelve entries, January through December of `year`, each with the
    /// month's totals. Reads all months inside one transaction so the year
    /// is a consistent snapshot.
    pub async fn monthly_summary(
        &self,
        user_id: i64,
        year: i32,
    ) -> ResultEngine<Vec<MonthlySummaryEntry>> {
        with_tx!(self, |db_tx| {
            let mut entries = Vec::with_capacity(12);
            for (index, name) in MONTH_NAMES.iter().enumerate() {
                let month = first_of_month(year, index as u32 + 1)?;
                let (start, end) = month_range(month)?;
                let (income, expenses, count) =
                    movement_totals(&db_tx, user_id, Some(start), Some(end), false).await?;

                entries.push(MonthlySummaryEntry {
                    month_name: (*name).to_string(),
                    year,
                    total_income_minor: income,
                    total_expenses_minor: expenses,
                    net_minor: income - expenses,
                    transaction_count: count,
                });
            }
            Ok(entries)
        })
    }

    /// Compares the calendar month containing `now` with the month before
    /// it. `now` is a parameter so callers (and tests) control the clock.
    pub async fn month_over_month(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> ResultEngine<MonthOverMonth> {
        let current_month = first_of_month(now.year(), now.month())?;
        let previous_month = previous_month(current_month)?;

        with_tx!(self, |db_tx| {
            let current = month_totals(&db_tx, user_id, current_month).await?;
            let (previous, previous_count) = {
                let (start, end) = month_range(previous_month)?;
                let (income, expenses, count) =
                    movement_totals(&db_tx, user_id, Some(start), Some(end), false).await?;
                (totals_from(income, expenses), count)
            };

            if previous_count == 0 {
                Ok(MonthOverMonth {
                    current,
                    previous: None,
                    changes: None,
                })
            } else {
                let changes = MonthlyTotalsChanges {
                    total_amount: percentage_change(
                        previous.total_amount_minor,
                        current.total_amount_minor,
                    ),
                    total_amount_positive: current.total_amount_minor
                        >= previous.total_amount_minor,
                    total_income: percentage_change(
                        previous.total_income_minor,
                        current.total_income_minor,
                    ),
                    total_income_positive: current.total_income_minor
                        >= previous.total_income_minor,
                    total_expenses: percentage_change(
                        previous.total_expenses_minor,
                        current.total_expenses_minor,
                    ),
                    // Spending less than last month reads as positive.
                    total_expenses_positive: current.total_expenses_minor
                        <= previous.total_expenses_minor,
                };

                Ok(MonthOverMonth {
                    current,
                    previous: Some(previous),
                    changes: Some(changes),
                })
            }
        })
    }
}

async fn month_totals<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    month: NaiveDate,
) -> ResultEngine<MonthlyTotals> {
    let (start, end) = month_range(month)?;
    let (income, expenses, _) = movement_totals(conn, user_id, Some(start), Some(end), false).await?;
    Ok(totals_from(income, expenses))
}

fn totals_from(income: i64, expenses: i64) -> MonthlyTotals {
    MonthlyTotals {
        total_amount_minor: income + expenses,
        total_income_minor: income,
        total_expenses_minor: expenses,
        balance_minor: income - expenses,
    }
}

/// Runs the conditional-sum aggregate for one user and date window.
/// `end_inclusive` selects `<=` over `<` for the upper bound.
async fn movement_totals<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    end_inclusive: bool,
) -> ResultEngine<(i64, i64, u64)> {
    let backend = conn.get_database_backend();

    let mut sql = String::from(
        "SELECT \
           COALESCE(SUM(CASE WHEN direction = ? THEN amount_minor ELSE 0 END), 0) AS income, \
           COALESCE(SUM(CASE WHEN direction = ? THEN amount_minor ELSE 0 END), 0) AS expenses, \
           COUNT(*) AS tx_count \
         FROM transactions WHERE user_id = ?",
    );
    let mut values: Vec<sea_orm::Value> = vec![
        TransactionDirection::Income.as_str().into(),
        TransactionDirection::Expense.as_str().into(),
        user_id.into(),
    ];
    if let Some(start) = start {
        sql.push_str(" AND date >= ?");
        values.push(start.into());
    }
    if let Some(end) = end {
        sql.push_str(if end_inclusive {
            " AND date <= ?"
        } else {
            " AND date < ?"
        });
        values.push(end.into());
    }

    let row = conn
        .query_one(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    let income: i64 = row
        .as_ref()
        .and_then(|r| r.try_get("", "income").ok())
        .unwrap_or(0);
    let expenses: i64 = row
        .as_ref()
        .and_then(|r| r.try_get("", "expenses").ok())
        .unwrap_or(0);
    let count: i64 = row
        .as_ref()
        .and_then(|r| r.try_get("", "tx_count").ok())
        .unwrap_or(0);
    Ok((income, expenses, count.max(0) as u64))
}

fn first_of_month(year: i32, month: u32) -> ResultEngine<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| EngineError::Validation(format!("invalid month: {year}-{month:02}")))
}

fn previous_month(month: NaiveDate) -> ResultEngine<NaiveDate> {
    if month.month() == 1 {
        first_of_month(month.year() - 1, 12)
    } else {
        first_of_month(month.year(), month.month() - 1)
    }
}

/// Half-open UTC range `[first of month, first of next month)`.
fn month_range(month: NaiveDate) -> ResultEngine<(DateTime<Utc>, DateTime<Utc>)> {
    let next = if month.month() == 12 {
        first_of_month(month.year() + 1, 1)?
    } else {
        first_of_month(month.year(), month.month() + 1)?
    };
    Ok((
        month.and_time(NaiveTime::MIN).and_utc(),
        next.and_time(NaiveTime::MIN).and_utc(),
    ))
}

/// `(current - previous) / previous` as a signed percentage string.
/// A previous of zero reports `"+100%"` when anything was recorded now,
/// `"0%"` otherwise.
fn percentage_change(previous: i64, current: i64) -> String {
    if previous == 0 {
        return if current > 0 {
            "+100%".to_string()
        } else {
            "0%".to_string()
        };
    }
    let change = (current - previous) as f64 / previous as f64 * 100.0;
    let sign = if change >= 0.0 { "+" } else { "-" };
    format!("{sign}{:.1}%", change.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_change_formats_sign_and_precision() {
        assert_eq!(percentage_change(0, 0), "0%");
        assert_eq!(percentage_change(0, 5_000), "+100%");
        assert_eq!(percentage_change(10_000, 11_250), "+12.5%");
        assert_eq!(percentage_change(10_000, 9_700), "-3.0%");
        assert_eq!(percentage_change(10_000, 10_000), "+0.0%");
    }

    #[test]
    fn month_range_is_half_open() {
        let march = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let (start, end) = month_range(march).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2024-04-01T00:00:00+00:00");
    }

    #[test]
    fn december_rolls_into_january() {
        let december = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
        let (_, end) = month_range(december).unwrap();
        assert_eq!(end.to_rfc3339(), "2024-01-01T00:00:00+00:00");

        let january = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(
            previous_month(january).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 1).unwrap()
        );
    }
}
