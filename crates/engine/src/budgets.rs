//! Budget primitives.
//!
//! A `Budget` is a planned spending envelope for one category in one
//! calendar month. `month` is always stored truncated to the first day of
//! the month, so the (user, category, month) slot lookup is a plain
//! equality filter.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

/// Domain view of one budget row.
///
/// Invariants maintained by every amount-affecting write:
/// `remaining_minor == budgeted_minor - spent_minor`, and
/// `alert_triggered == remaining < 0 || 10 * remaining < budgeted`
/// (the integer form of `remaining / budgeted < 0.10`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub month: NaiveDate,
    pub budgeted_minor: i64,
    pub spent_minor: i64,
    pub remaining_minor: i64,
    pub alert_triggered: bool,
    pub category_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub month: Date,
    pub budgeted_minor: i64,
    pub spent_minor: i64,
    pub remaining_minor: i64,
    pub alert_triggered: bool,
    pub category_id: i64,
    pub user_id: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id"
    )]
    Categories,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Budget {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            month: model.month,
            budgeted_minor: model.budgeted_minor,
            spent_minor: model.spent_minor,
            remaining_minor: model.remaining_minor,
            alert_triggered: model.alert_triggered,
            category_id: model.category_id,
            user_id: model.user_id,
            created_at: model.created_at,
        }
    }
}

/// Computes the derived fields for a budget.
///
/// Returns `(remaining_minor, alert_triggered)`. The ratio check uses the
/// current budgeted amount, never a stale one.
pub(crate) fn derive_remaining(budgeted_minor: i64, spent_minor: i64) -> (i64, bool) {
    let remaining = budgeted_minor - spent_minor;
    let alert = remaining < 0 || 10 * remaining < budgeted_minor;
    (remaining, alert)
}

pub(crate) fn new_active_model(
    month: NaiveDate,
    budgeted_minor: i64,
    spent_minor: i64,
    category_id: i64,
    user_id: i64,
    created_at: DateTime<Utc>,
) -> ActiveModel {
    let (remaining, alert) = derive_remaining(budgeted_minor, spent_minor);
    ActiveModel {
        id: ActiveValue::NotSet,
        month: ActiveValue::Set(month),
        budgeted_minor: ActiveValue::Set(budgeted_minor),
        spent_minor: ActiveValue::Set(spent_minor),
        remaining_minor: ActiveValue::Set(remaining),
        alert_triggered: ActiveValue::Set(alert),
        category_id: ActiveValue::Set(category_id),
        user_id: ActiveValue::Set(user_id),
        created_at: ActiveValue::Set(created_at),
    }
}

#[cfg(test)]
mod tests {
    use super::derive_remaining;

    #[test]
    fn remaining_is_budgeted_minus_spent() {
        assert_eq!(derive_remaining(100_000, 20_000), (80_000, false));
        assert_eq!(derive_remaining(100_000, 0), (100_000, false));
    }

    #[test]
    fn alert_triggers_below_ten_percent() {
        // 80.00 of 1000.00 left: 8% < 10%.
        let (remaining, alert) = derive_remaining(100_000, 92_000);
        assert_eq!(remaining, 8_000);
        assert!(alert);

        // Exactly 10% left does not trigger.
        let (remaining, alert) = derive_remaining(100_000, 90_000);
        assert_eq!(remaining, 10_000);
        assert!(!alert);
    }

    #[test]
    fn alert_triggers_when_overspent() {
        let (remaining, alert) = derive_remaining(50_000, 60_000);
        assert_eq!(remaining, -10_000);
        assert!(alert);
    }
}
