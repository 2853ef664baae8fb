//! Seeds the lookup tables with their starting rows. Users can still add
//! their own categories later; these are the ones every install gets.

use sea_orm_migration::prelude::*;

use crate::m20260815_000000_init::{AccountTypes, Categories, Currencies};

const ACCOUNT_TYPES: [&str; 5] = ["checking", "savings", "credit_card", "cash", "investment"];
const CURRENCIES: [&str; 3] = ["EUR", "USD", "GBP"];
const CATEGORIES: [&str; 9] = [
    "groceries",
    "rent",
    "utilities",
    "transport",
    "dining",
    "entertainment",
    "health",
    "salary",
    "other",
];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert = Query::insert()
            .into_table(AccountTypes::Table)
            .columns([AccountTypes::Name])
            .to_owned();
        for name in ACCOUNT_TYPES {
            insert.values_panic([name.into()]);
        }
        manager.exec_stmt(insert).await?;

        let mut insert = Query::insert()
            .into_table(Currencies::Table)
            .columns([Currencies::Name])
            .to_owned();
        for name in CURRENCIES {
            insert.values_panic([name.into()]);
        }
        manager.exec_stmt(insert).await?;

        let mut insert = Query::insert()
            .into_table(Categories::Table)
            .columns([Categories::Name])
            .to_owned();
        for name in CATEGORIES {
            insert.values_panic([name.into()]);
        }
        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(
                Query::delete()
                    .from_table(Categories::Table)
                    .and_where(Expr::col(Categories::Name).is_in(CATEGORIES))
                    .to_owned(),
            )
            .await?;
        manager
            .exec_stmt(
                Query::delete()
                    .from_table(Currencies::Table)
                    .and_where(Expr::col(Currencies::Name).is_in(CURRENCIES))
                    .to_owned(),
            )
            .await?;
        manager
            .exec_stmt(
                Query::delete()
                    .from_table(AccountTypes::Table)
                    .and_where(Expr::col(AccountTypes::Name).is_in(ACCOUNT_TYPES))
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
