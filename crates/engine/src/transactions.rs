//! Transaction primitives.
//!
//! A `Transaction` records one monetary movement against exactly one
//! account. Recording a transaction does not mutate the account balance;
//! balances change only through the ledger operations in [`crate::ops`].

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Whether a transaction brings money in or out.
///
/// Stored as a string column, replacing the numeric type-id convention
/// (1 = income, 2 = expense) the schema descends from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionDirection {
    Income,
    Expense,
}

impl TransactionDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for TransactionDirection {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::Validation(format!(
                "invalid transaction direction: {other}"
            ))),
        }
    }
}

/// Lifecycle status of a transaction.
///
/// Stored as a string column, replacing the numeric state-id convention
/// (1 = pending).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    Pending,
    Completed,
}

impl TransactionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }
}

impl TryFrom<&str> for TransactionState {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            other => Err(EngineError::Validation(format!(
                "invalid transaction state: {other}"
            ))),
        }
    }
}

/// Domain view of one transaction row.
///
/// `date` is the calendar time of the economic event; `created_at` is the
/// system time of record insertion. The two are distinct on purpose.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub description: String,
    pub amount_minor: i64,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub direction: TransactionDirection,
    pub state: TransactionState,
    pub user_id: i64,
    pub account_id: i64,
    pub category_id: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub description: String,
    pub amount_minor: i64,
    pub date: DateTimeUtc,
    pub created_at: DateTimeUtc,
    pub direction: String,
    pub state: String,
    pub user_id: i64,
    pub account_id: i64,
    pub category_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
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

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            description: model.description,
            amount_minor: model.amount_minor,
            date: model.date,
            created_at: model.created_at,
            direction: TransactionDirection::try_from(model.direction.as_str())?,
            state: TransactionState::try_from(model.state.as_str())?,
            user_id: model.user_id,
            account_id: model.account_id,
            category_id: model.category_id,
        })
    }
}

/// Fields required to record a new transaction.
#[derive(Clone, Debug)]
pub struct NewTransaction {
    pub description: String,
    pub amount_minor: i64,
    pub date: DateTime<Utc>,
    pub direction: TransactionDirection,
    pub state: TransactionState,
    pub user_id: i64,
    pub account_id: i64,
    pub category_id: i64,
}

impl From<&NewTransaction> for ActiveModel {
    fn from(tx: &NewTransaction) -> Self {
        Self {
            id: ActiveValue::NotSet,
            description: ActiveValue::Set(tx.description.clone()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            date: ActiveValue::Set(tx.date),
            created_at: ActiveValue::Set(Utc::now()),
            direction: ActiveValue::Set(tx.direction.as_str().to_string()),
            state: ActiveValue::Set(tx.state.as_str().to_string()),
            user_id: ActiveValue::Set(tx.user_id),
            account_id: ActiveValue::Set(tx.account_id),
            category_id: ActiveValue::Set(tx.category_id),
        }
    }
}
