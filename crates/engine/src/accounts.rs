//! Account primitives.
//!
//! An `Account` is a named store of money owned by one user. Its balance is
//! held in minor units (cents) and must never go negative after a committed
//! operation; all mutation goes through the ledger operations in
//! [`crate::ops`].

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

/// Domain view of one account row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub account_type_id: Option<i64>,
    pub balance_minor: i64,
    pub currency_id: Option<i64>,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub account_type_id: Option<i64>,
    pub balance_minor: i64,
    pub currency_id: Option<i64>,
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
        belongs_to = "super::account_types::Entity",
        from = "Column::AccountTypeId",
        to = "super::account_types::Column::Id"
    )]
    AccountTypes,
    #[sea_orm(
        belongs_to = "super::currencies::Entity",
        from = "Column::CurrencyId",
        to = "super::currencies::Column::Id"
    )]
    Currencies,
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::account_types::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccountTypes.def()
    }
}

impl Related<super::currencies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Currencies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Account {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            account_type_id: model.account_type_id,
            balance_minor: model.balance_minor,
            currency_id: model.currency_id,
            user_id: model.user_id,
            created_at: model.created_at,
        }
    }
}

/// Insertable row for a new account. The id is database-assigned.
pub(crate) fn new_active_model(
    name: String,
    account_type_id: Option<i64>,
    balance_minor: i64,
    currency_id: Option<i64>,
    user_id: i64,
    created_at: DateTime<Utc>,
) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::NotSet,
        name: ActiveValue::Set(name),
        account_type_id: ActiveValue::Set(account_type_id),
        balance_minor: ActiveValue::Set(balance_minor),
        currency_id: ActiveValue::Set(currency_id),
        user_id: ActiveValue::Set(user_id),
        created_at: ActiveValue::Set(created_at),
    }
}
