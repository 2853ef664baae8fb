//! Budget tracker operations.
//!
//! A budget occupies one (user, category, month) slot; months are truncated
//! to their first day before every lookup or write, so slot matching is a
//! plain equality filter. The derived fields are recomputed by every
//! amount-affecting write from the merged amounts, never from stale ones.

use chrono::NaiveDate;
use sea_orm::{
    ActiveValue, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*,
};

use chrono::Utc;

use crate::{
    Budget, EngineError, Page, ResultEngine,
    budgets::{self, derive_remaining},
    categories,
};

use super::{
    Engine, clamp_page,
    reports::{BudgetSummary, MonthlyBudgetOverview},
    truncate_to_month, with_tx,
};

/// Partial update for a budget. Absent fields are left untouched; the
/// derived fields are recomputed from the merged result.
#[derive(Clone, Debug, Default)]
pub struct BudgetPatch {
    pub month: Option<NaiveDate>,
    pub budgeted_minor: Option<i64>,
    pub spent_minor: Option<i64>,
    pub category_id: Option<i64>,
}

impl Engine {
    /// Creates a budget for one category and month. Fails with Conflict when
    /// the slot is already occupied.
    pub async fn create_budget(
        &self,
        month: NaiveDate,
        budgeted_minor: i64,
        category_id: i64,
        user_id: i64,
        spent_minor: i64,
    ) -> ResultEngine<Budget> {
        validate_amounts(budgeted_minor, spent_minor)?;
        let month = truncate_to_month(month);

        with_tx!(self, |db_tx| {
            self.require_category(&db_tx, category_id).await?;
            if self
                .budget_slot(&db_tx, user_id, category_id, month)
                .await?
                .is_some()
            {
                return Err(EngineError::Conflict(
                    "Budget already exists for this category and month".to_string(),
                ));
            }

            let model = budgets::new_active_model(
                month,
                budgeted_minor,
                spent_minor,
                category_id,
                user_id,
                Utc::now(),
            )
            .insert(&db_tx)
            .await?;
            Ok(Budget::from(model))
        })
    }

    /// Returns one budget by id.
    pub async fn budget(&self, id: i64) -> ResultEngine<Budget> {
        let model = budgets::Entity::find_by_id(id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound("Budget".to_string()))?;
        Ok(Budget::from(model))
    }

    /// Lists a user's budgets, newest month first, optionally restricted to
    /// one month.
    pub async fn budgets_for_user(
        &self,
        user_id: i64,
        month: Option<NaiveDate>,
        page: u64,
        page_size: u64,
    ) -> ResultEngine<Page<Budget>> {
        let (page, page_size) = clamp_page(page, page_size);

        with_tx!(self, |db_tx| {
            let mut base = budgets::Entity::find().filter(budgets::Column::UserId.eq(user_id));
            if let Some(month) = month {
                base = base.filter(budgets::Column::Month.eq(truncate_to_month(month)));
            }

            let total = base.clone().count(&db_tx).await?;
            let models = base
                .order_by_desc(budgets::Column::Month)
                .order_by_asc(budgets::Column::CategoryId)
                .offset((page - 1) * page_size)
                .limit(page_size)
                .all(&db_tx)
                .await?;

            let items = models.into_iter().map(Budget::from).collect();
            Ok(Page::new(items, total, page, page_size))
        })
    }

    /// Applies a partial update, recomputing remaining and the alert flag
    /// from the merged amounts. Moving a budget to an occupied slot fails
    /// with Conflict.
    pub async fn update_budget(&self, id: i64, patch: BudgetPatch) -> ResultEngine<Budget> {
        if let Some(budgeted) = patch.budgeted_minor
            && budgeted <= 0
        {
            return Err(EngineError::Validation(
                "Budgeted amount must be greater than 0".to_string(),
            ));
        }
        if let Some(spent) = patch.spent_minor
            && spent < 0
        {
            return Err(EngineError::Validation(
                "Spent amount cannot be negative".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let existing = self.require_budget(&db_tx, id).await?;

            let month = patch.month.map(truncate_to_month).unwrap_or(existing.month);
            let category_id = patch.category_id.unwrap_or(existing.category_id);
            if let Some(category_id) = patch.category_id {
                self.require_category(&db_tx, category_id).await?;
            }
            if (month, category_id) != (existing.month, existing.category_id)
                && self
                    .budget_slot(&db_tx, existing.user_id, category_id, month)
                    .await?
                    .is_some()
            {
                return Err(EngineError::Conflict(
                    "Budget already exists for this category and month".to_string(),
                ));
            }

            let budgeted = patch.budgeted_minor.unwrap_or(existing.budgeted_minor);
            let spent = patch.spent_minor.unwrap_or(existing.spent_minor);
            let (remaining, alert) = derive_remaining(budgeted, spent);

            let active = budgets::ActiveModel {
                id: ActiveValue::Set(id),
                month: ActiveValue::Set(month),
                budgeted_minor: ActiveValue::Set(budgeted),
                spent_minor: ActiveValue::Set(spent),
                remaining_minor: ActiveValue::Set(remaining),
                alert_triggered: ActiveValue::Set(alert),
                category_id: ActiveValue::Set(category_id),
                ..Default::default()
            };
            let model = active.update(&db_tx).await?;
            Ok(Budget::from(model))
        })
    }

    /// Deletes a budget.
    pub async fn delete_budget(&self, id: i64) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_budget(&db_tx, id).await?;
            model.delete(&db_tx).await?;
            Ok(())
        })
    }

    /// Totals across the user's budgets, optionally restricted to one month.
    pub async fn budget_summary(
        &self,
        user_id: i64,
        month: Option<NaiveDate>,
    ) -> ResultEngine<BudgetSummary> {
        let mut query = budgets::Entity::find().filter(budgets::Column::UserId.eq(user_id));
        if let Some(month) = month {
            query = query.filter(budgets::Column::Month.eq(truncate_to_month(month)));
        }
        let models = query.all(&self.database).await?;
        Ok(summarize(&models))
    }

    /// One month's budgets plus their summary.
    pub async fn monthly_overview(
        &self,
        user_id: i64,
        month: NaiveDate,
    ) -> ResultEngine<MonthlyBudgetOverview> {
        let month = truncate_to_month(month);
        let models = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .filter(budgets::Column::Month.eq(month))
            .order_by_asc(budgets::Column::CategoryId)
            .all(&self.database)
            .await?;

        Ok(MonthlyBudgetOverview {
            month,
            summary: summarize(&models),
            budgets: models.into_iter().map(Budget::from).collect(),
        })
    }

    /// Budgets whose alert flag is raised, newest month first.
    pub async fn budgets_with_alerts(&self, user_id: i64) -> ResultEngine<Vec<Budget>> {
        let models = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .filter(budgets::Column::AlertTriggered.eq(true))
            .order_by_desc(budgets::Column::Month)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Budget::from).collect())
    }

    /// Budgets spent past their envelope, newest month first.
    pub async fn over_budget(&self, user_id: i64) -> ResultEngine<Vec<Budget>> {
        let models = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .filter(budgets::Column::RemainingMinor.lt(0))
            .order_by_desc(budgets::Column::Month)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Budget::from).collect())
    }

    /// Adds spending to the matching budget slot, if one exists. Returns
    /// `None` (and changes nothing) when the user has no budget for that
    /// category and month. Callers invoke this explicitly; recording a
    /// transaction never does.
    pub async fn record_spending(
        &self,
        user_id: i64,
        category_id: i64,
        month: NaiveDate,
        additional_minor: i64,
    ) -> ResultEngine<Option<Budget>> {
        let month = truncate_to_month(month);

        with_tx!(self, |db_tx| {
            match self
                .budget_slot(&db_tx, user_id, category_id, month)
                .await?
            {
                None => Ok(None),
                Some(existing) => {
                    let spent = existing.spent_minor + additional_minor;
                    if spent < 0 {
                        return Err(EngineError::Validation(
                            "Spent amount cannot be negative".to_string(),
                        ));
                    }
                    let (remaining, alert) = derive_remaining(existing.budgeted_minor, spent);

                    let active = budgets::ActiveModel {
                        id: ActiveValue::Set(existing.id),
                        spent_minor: ActiveValue::Set(spent),
                        remaining_minor: ActiveValue::Set(remaining),
                        alert_triggered: ActiveValue::Set(alert),
                        ..Default::default()
                    };
                    let model = active.update(&db_tx).await?;
                    Ok(Some(Budget::from(model)))
                }
            }
        })
    }

    /// Creates the budget slot or, when it already exists, replaces its
    /// budgeted amount while keeping the recorded spending.
    pub async fn create_or_update_budget(
        &self,
        user_id: i64,
        category_id: i64,
        month: NaiveDate,
        budgeted_minor: i64,
    ) -> ResultEngine<Budget> {
        if budgeted_minor <= 0 {
            return Err(EngineError::Validation(
                "Budgeted amount must be greater than 0".to_string(),
            ));
        }
        let month = truncate_to_month(month);

        with_tx!(self, |db_tx| {
            self.require_category(&db_tx, category_id).await?;

            match self
                .budget_slot(&db_tx, user_id, category_id, month)
                .await?
            {
                Some(existing) => {
                    let (remaining, alert) =
                        derive_remaining(budgeted_minor, existing.spent_minor);
                    let active = budgets::ActiveModel {
                        id: ActiveValue::Set(existing.id),
                        budgeted_minor: ActiveValue::Set(budgeted_minor),
                        remaining_minor: ActiveValue::Set(remaining),
                        alert_triggered: ActiveValue::Set(alert),
                        ..Default::default()
                    };
                    let model = active.update(&db_tx).await?;
                    Ok(Budget::from(model))
                }
                None => {
                    let model = budgets::new_active_model(
                        month,
                        budgeted_minor,
                        0,
                        category_id,
                        user_id,
                        Utc::now(),
                    )
                    .insert(&db_tx)
                    .await?;
                    Ok(Budget::from(model))
                }
            }
        })
    }

    async fn budget_slot(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: i64,
        category_id: i64,
        month: NaiveDate,
    ) -> ResultEngine<Option<budgets::Model>> {
        let model = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .filter(budgets::Column::CategoryId.eq(category_id))
            .filter(budgets::Column::Month.eq(month))
            .one(db_tx)
            .await?;
        Ok(model)
    }

    async fn require_budget(
        &self,
        db_tx: &DatabaseTransaction,
        id: i64,
    ) -> ResultEngine<budgets::Model> {
        budgets::Entity::find_by_id(id)
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound("Budget".to_string()))
    }

    async fn require_category(
        &self,
        db_tx: &DatabaseTransaction,
        id: i64,
    ) -> ResultEngine<categories::Model> {
        categories::Entity::find_by_id(id)
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound("Category".to_string()))
    }
}

fn validate_amounts(budgeted_minor: i64, spent_minor: i64) -> ResultEngine<()> {
    if budgeted_minor <= 0 {
        return Err(EngineError::Validation(
            "Budgeted amount must be greater than 0".to_string(),
        ));
    }
    if spent_minor < 0 {
        return Err(EngineError::Validation(
            "Spent amount cannot be negative".to_string(),
        ));
    }
    Ok(())
}

fn summarize(models: &[budgets::Model]) -> BudgetSummary {
    let total_budgeted: i64 = models.iter().map(|m| m.budgeted_minor).sum();
    let total_spent: i64 = models.iter().map(|m| m.spent_minor).sum();
    let percentage_used = if total_budgeted == 0 {
        0.0
    } else {
        total_spent as f64 / total_budgeted as f64 * 100.0
    };

    BudgetSummary {
        total_budgeted_minor: total_budgeted,
        total_spent_minor: total_spent,
        total_remaining_minor: total_budgeted - total_spent,
        percentage_used,
        categories_over_budget: models.iter().filter(|m| m.remaining_minor < 0).count() as u64,
        categories_with_alerts: models.iter().filter(|m| m.alert_triggered).count() as u64,
    }
}
