//! Transaction recorder operations.
//!
//! Listing combines every filter with AND semantics; a range with only one
//! bound stays open-ended on the other side. Default ordering is economic
//! date descending, then insertion time descending.

use chrono::{DateTime, Utc};

use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait, prelude::*,
    sea_query::{Expr, LikeExpr},
};

use crate::{
    EngineError, NewTransaction, Page, ResultEngine, Transaction, TransactionDirection,
    TransactionState, transactions,
};

use super::{Engine, clamp_page, validate_text, with_tx};

/// Filters for listing a user's transactions. All bounds are inclusive.
#[derive(Clone, Debug, Default)]
pub struct TransactionFilter {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub direction: Option<TransactionDirection>,
    pub state: Option<TransactionState>,
    pub account_id: Option<i64>,
    pub category_id: Option<i64>,
    pub min_amount_minor: Option<i64>,
    pub max_amount_minor: Option<i64>,
}

/// Partial update for a transaction. Absent fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct TransactionPatch {
    pub description: Option<String>,
    pub amount_minor: Option<i64>,
    pub date: Option<DateTime<Utc>>,
    pub direction: Option<TransactionDirection>,
    pub state: Option<TransactionState>,
    pub account_id: Option<i64>,
    pub category_id: Option<i64>,
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionFilter) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionFilter) -> Self {
        if let Some(start) = filter.start_date {
            self = self.filter(transactions::Column::Date.gte(start));
        }
        if let Some(end) = filter.end_date {
            self = self.filter(transactions::Column::Date.lte(end));
        }
        if let Some(direction) = filter.direction {
            self = self.filter(transactions::Column::Direction.eq(direction.as_str()));
        }
        if let Some(state) = filter.state {
            self = self.filter(transactions::Column::State.eq(state.as_str()));
        }
        if let Some(account_id) = filter.account_id {
            self = self.filter(transactions::Column::AccountId.eq(account_id));
        }
        if let Some(category_id) = filter.category_id {
            self = self.filter(transactions::Column::CategoryId.eq(category_id));
        }
        if let Some(min) = filter.min_amount_minor {
            self = self.filter(transactions::Column::AmountMinor.gte(min));
        }
        if let Some(max) = filter.max_amount_minor {
            self = self.filter(transactions::Column::AmountMinor.lte(max));
        }
        self
    }
}

impl Engine {
    /// Records a new transaction after validating the target account exists
    /// and belongs to the requesting user.
    pub async fn create_transaction(&self, new: NewTransaction) -> ResultEngine<Transaction> {
        validate_text(&new.description, "Description")?;
        if new.amount_minor <= 0 {
            return Err(EngineError::Validation(
                "Amount must be greater than 0".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let account = self.require_account(&db_tx, new.account_id).await?;
            if account.user_id != new.user_id {
                return Err(EngineError::Validation(
                    "Account does not belong to the user".to_string(),
                ));
            }

            let model = transactions::ActiveModel::from(&new).insert(&db_tx).await?;
            Transaction::try_from(model)
        })
    }

    /// Returns one transaction by id.
    pub async fn transaction(&self, id: i64) -> ResultEngine<Transaction> {
        let model = transactions::Entity::find_by_id(id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound("Transaction".to_string()))?;
        Transaction::try_from(model)
    }

    /// Lists a user's transactions with filters and offset pagination.
    pub async fn transactions_for_user(
        &self,
        user_id: i64,
        filter: &TransactionFilter,
        page: u64,
        page_size: u64,
    ) -> ResultEngine<Page<Transaction>> {
        with_tx!(self, |db_tx| {
            list_page(&db_tx, user_id, filter, page, page_size).await
        })
    }

    /// Applies a partial update, re-running creation-time validation on the
    /// changed fields. A change of account re-checks ownership against the
    /// transaction's owner.
    pub async fn update_transaction(
        &self,
        id: i64,
        patch: TransactionPatch,
    ) -> ResultEngine<Transaction> {
        if let Some(description) = &patch.description {
            validate_text(description, "Description")?;
        }
        if let Some(amount) = patch.amount_minor
            && amount <= 0
        {
            return Err(EngineError::Validation(
                "Amount must be greater than 0".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let existing = self.require_transaction(&db_tx, id).await?;

            if let Some(account_id) = patch.account_id {
                let account = self.require_account(&db_tx, account_id).await?;
                if account.user_id != existing.user_id {
                    return Err(EngineError::Validation(
                        "Account does not belong to the user".to_string(),
                    ));
                }
            }

            let mut active = transactions::ActiveModel {
                id: ActiveValue::Set(id),
                ..Default::default()
            };
            if let Some(description) = patch.description {
                active.description = ActiveValue::Set(description);
            }
            if let Some(amount) = patch.amount_minor {
                active.amount_minor = ActiveValue::Set(amount);
            }
            if let Some(date) = patch.date {
                active.date = ActiveValue::Set(date);
            }
            if let Some(direction) = patch.direction {
                active.direction = ActiveValue::Set(direction.as_str().to_string());
            }
            if let Some(state) = patch.state {
                active.state = ActiveValue::Set(state.as_str().to_string());
            }
            if let Some(account_id) = patch.account_id {
                active.account_id = ActiveValue::Set(account_id);
            }
            if let Some(category_id) = patch.category_id {
                active.category_id = ActiveValue::Set(category_id);
            }
            let model = active.update(&db_tx).await?;
            Transaction::try_from(model)
        })
    }

    /// Deletes a transaction.
    pub async fn delete_transaction(&self, id: i64) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_transaction(&db_tx, id).await?;
            model.delete(&db_tx).await?;
            Ok(())
        })
    }

    /// Lists the transactions of one account, after checking the account
    /// belongs to `user_id`. The check and the page read share a
    /// transaction.
    pub async fn transactions_for_account(
        &self,
        account_id: i64,
        user_id: i64,
        page: u64,
        page_size: u64,
    ) -> ResultEngine<Page<Transaction>> {
        let filter = TransactionFilter {
            account_id: Some(account_id),
            ..Default::default()
        };

        with_tx!(self, |db_tx| {
            let account = self.require_account(&db_tx, account_id).await?;
            if account.user_id != user_id {
                return Err(EngineError::Validation(
                    "Account does not belong to the user".to_string(),
                ));
            }
            list_page(&db_tx, user_id, &filter, page, page_size).await
        })
    }

    /// Lists the user's transactions in one category.
    pub async fn transactions_for_category(
        &self,
        category_id: i64,
        user_id: i64,
        page: u64,
        page_size: u64,
    ) -> ResultEngine<Page<Transaction>> {
        let filter = TransactionFilter {
            category_id: Some(category_id),
            ..Default::default()
        };
        self.transactions_for_user(user_id, &filter, page, page_size)
            .await
    }

    /// Case-insensitive literal substring search over descriptions. LIKE
    /// metacharacters in the term are escaped, so `100%` matches only the
    /// string `100%`.
    pub async fn search_transactions(
        &self,
        user_id: i64,
        term: &str,
        page: u64,
        page_size: u64,
    ) -> ResultEngine<Page<Transaction>> {
        validate_text(term, "Search term")?;
        let (page, page_size) = clamp_page(page, page_size);
        let pattern = format!("%{}%", escape_like(term));

        with_tx!(self, |db_tx| {
            let base = transactions::Entity::find()
                .filter(transactions::Column::UserId.eq(user_id))
                .filter(
                    Expr::col(transactions::Column::Description)
                        .like(LikeExpr::new(&pattern).escape('\\')),
                );

            let total = base.clone().count(&db_tx).await?;
            let models = base
                .order_by_desc(transactions::Column::Date)
                .order_by_desc(transactions::Column::CreatedAt)
                .order_by_desc(transactions::Column::Id)
                .offset((page - 1) * page_size)
                .limit(page_size)
                .all(&db_tx)
                .await?;

            let items = models
                .into_iter()
                .map(Transaction::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok(Page::new(items, total, page, page_size))
        })
    }

    /// The user's most recently recorded transactions.
    pub async fn recent_transactions(
        &self,
        user_id: i64,
        limit: u64,
    ) -> ResultEngine<Vec<Transaction>> {
        let models = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .limit(limit)
            .all(&self.database)
            .await?;
        models.into_iter().map(Transaction::try_from).collect()
    }

    /// The user's pending transactions, oldest economic date first.
    pub async fn pending_transactions(&self, user_id: i64) -> ResultEngine<Vec<Transaction>> {
        let models = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .filter(transactions::Column::State.eq(TransactionState::Pending.as_str()))
            .order_by_asc(transactions::Column::Date)
            .order_by_asc(transactions::Column::CreatedAt)
            .order_by_asc(transactions::Column::Id)
            .all(&self.database)
            .await?;
        models.into_iter().map(Transaction::try_from).collect()
    }

    pub(super) async fn require_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        id: i64,
    ) -> ResultEngine<transactions::Model> {
        transactions::Entity::find_by_id(id)
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound("Transaction".to_string()))
    }
}

/// Runs the filtered, ordered, offset-paginated listing for one user.
async fn list_page<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    filter: &TransactionFilter,
    page: u64,
    page_size: u64,
) -> ResultEngine<Page<Transaction>> {
    let (page, page_size) = clamp_page(page, page_size);

    let base = transactions::Entity::find()
        .filter(transactions::Column::UserId.eq(user_id))
        .apply_tx_filters(filter);

    let total = base.clone().count(conn).await?;
    let models = base
        .order_by_desc(transactions::Column::Date)
        .order_by_desc(transactions::Column::CreatedAt)
        .order_by_desc(transactions::Column::Id)
        .offset((page - 1) * page_size)
        .limit(page_size)
        .all(conn)
        .await?;

    let items = models
        .into_iter()
        .map(Transaction::try_from)
        .collect::<ResultEngine<Vec<_>>>()?;
    Ok(Page::new(items, total, page, page_size))
}

/// Escapes LIKE metacharacters so the term matches as a literal substring.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
