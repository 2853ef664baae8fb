//! Account ledger operations.
//!
//! Deposit, withdraw, and transfer all compose [`Engine::adjust_balance`],
//! a conditional atomic update checked by affected-row count. That keeps
//! the non-negativity invariant under concurrent requests: two overlapping
//! withdrawals cannot both validate against the same stale balance, because
//! the guard lives in the UPDATE itself.

use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, Statement,
    TransactionTrait, prelude::*,
};

use chrono::Utc;

use crate::{Account, EngineError, ResultEngine, accounts};

use super::{Engine, validate_text, with_tx};

/// Partial update for an account. Absent fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub account_type_id: Option<i64>,
    pub balance_minor: Option<i64>,
    pub currency_id: Option<i64>,
}

impl Engine {
    /// Creates a new account, with an optional opening balance.
    pub async fn create_account(
        &self,
        name: &str,
        account_type_id: Option<i64>,
        balance_minor: i64,
        currency_id: Option<i64>,
        user_id: i64,
    ) -> ResultEngine<Account> {
        validate_text(name, "Account name")?;
        if balance_minor < 0 {
            return Err(EngineError::Validation(
                "Account balance cannot be negative".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let model = accounts::new_active_model(
                name.to_string(),
                account_type_id,
                balance_minor,
                currency_id,
                user_id,
                Utc::now(),
            )
            .insert(&db_tx)
            .await?;
            Ok(Account::from(model))
        })
    }

    /// Returns one account by id.
    pub async fn account(&self, id: i64) -> ResultEngine<Account> {
        let model = accounts::Entity::find_by_id(id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound("Account".to_string()))?;
        Ok(Account::from(model))
    }

    /// Lists a user's accounts, newest first.
    pub async fn accounts_for_user(&self, user_id: i64) -> ResultEngine<Vec<Account>> {
        let models = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .order_by_desc(accounts::Column::CreatedAt)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Account::from).collect())
    }

    /// Applies a partial update. Direct balance writes are allowed but must
    /// keep the balance non-negative.
    pub async fn update_account(&self, id: i64, patch: AccountPatch) -> ResultEngine<Account> {
        if let Some(name) = &patch.name {
            validate_text(name, "Account name")?;
        }
        if let Some(balance) = patch.balance_minor
            && balance < 0
        {
            return Err(EngineError::Validation(
                "Account balance cannot be negative".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            self.require_account(&db_tx, id).await?;

            let mut active = accounts::ActiveModel {
                id: ActiveValue::Set(id),
                ..Default::default()
            };
            if let Some(name) = patch.name {
                active.name = ActiveValue::Set(name);
            }
            if let Some(account_type_id) = patch.account_type_id {
                active.account_type_id = ActiveValue::Set(Some(account_type_id));
            }
            if let Some(balance) = patch.balance_minor {
                active.balance_minor = ActiveValue::Set(balance);
            }
            if let Some(currency_id) = patch.currency_id {
                active.currency_id = ActiveValue::Set(Some(currency_id));
            }
            let model = active.update(&db_tx).await?;
            Ok(Account::from(model))
        })
    }

    /// Deletes an account. Transactions referencing it are left alone; any
    /// cleanup is the caller's concern.
    pub async fn delete_account(&self, id: i64) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, id).await?;
            model.delete(&db_tx).await?;
            Ok(())
        })
    }

    /// Adds `amount_minor` to the account balance.
    pub async fn deposit(&self, id: i64, amount_minor: i64) -> ResultEngine<Account> {
        if amount_minor <= 0 {
            return Err(EngineError::Validation(
                "Deposit amount must be greater than 0".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            self.require_account(&db_tx, id).await?;
            self.adjust_balance(&db_tx, id, amount_minor, false).await?;
            let model = self.require_account(&db_tx, id).await?;
            Ok(Account::from(model))
        })
    }

    /// Removes `amount_minor` from the account balance; fails when the
    /// balance would go negative.
    pub async fn withdraw(&self, id: i64, amount_minor: i64) -> ResultEngine<Account> {
        if amount_minor <= 0 {
            return Err(EngineError::Validation(
                "Withdrawal amount must be greater than 0".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            self.require_account(&db_tx, id).await?;
            self.adjust_balance(&db_tx, id, -amount_minor, true).await?;
            let model = self.require_account(&db_tx, id).await?;
            Ok(Account::from(model))
        })
    }

    /// Moves `amount_minor` between two accounts. Debit and credit commit
    /// together or not at all.
    pub async fn transfer(
        &self,
        from_id: i64,
        to_id: i64,
        amount_minor: i64,
    ) -> ResultEngine<(Account, Account)> {
        if amount_minor <= 0 {
            return Err(EngineError::Validation(
                "Transfer amount must be greater than 0".to_string(),
            ));
        }
        if from_id == to_id {
            return Err(EngineError::Validation(
                "Cannot transfer to the same account".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            self.require_account(&db_tx, from_id)
                .await
                .map_err(|_| EngineError::NotFound("Source account".to_string()))?;
            self.require_account(&db_tx, to_id)
                .await
                .map_err(|_| EngineError::NotFound("Destination account".to_string()))?;

            self.adjust_balance(&db_tx, from_id, -amount_minor, true)
                .await?;
            self.adjust_balance(&db_tx, to_id, amount_minor, false)
                .await?;

            let from = self.require_account(&db_tx, from_id).await?;
            let to = self.require_account(&db_tx, to_id).await?;
            Ok((Account::from(from), Account::from(to)))
        })
    }

    /// Sums the balances of all accounts owned by `user_id`.
    pub async fn total_balance(&self, user_id: i64) -> ResultEngine<i64> {
        let models = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .all(&self.database)
            .await?;
        Ok(models.iter().map(|m| m.balance_minor).sum())
    }

    /// Lists the user's accounts whose balance sits below `threshold_minor`,
    /// poorest first.
    pub async fn low_balance_accounts(
        &self,
        user_id: i64,
        threshold_minor: i64,
    ) -> ResultEngine<Vec<Account>> {
        if threshold_minor < 0 {
            return Err(EngineError::Validation(
                "Threshold cannot be negative".to_string(),
            ));
        }

        let models = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .filter(accounts::Column::BalanceMinor.lt(threshold_minor))
            .order_by_asc(accounts::Column::BalanceMinor)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Account::from).collect())
    }

    /// Lists all accounts of a given account type, newest first.
    pub async fn accounts_by_type(&self, account_type_id: i64) -> ResultEngine<Vec<Account>> {
        let models = accounts::Entity::find()
            .filter(accounts::Column::AccountTypeId.eq(account_type_id))
            .order_by_desc(accounts::Column::CreatedAt)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Account::from).collect())
    }

    /// Lists all accounts denominated in a given currency, newest first.
    pub async fn accounts_by_currency(&self, currency_id: i64) -> ResultEngine<Vec<Account>> {
        let models = accounts::Entity::find()
            .filter(accounts::Column::CurrencyId.eq(currency_id))
            .order_by_desc(accounts::Column::CreatedAt)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Account::from).collect())
    }

    /// Fetches an account inside an open transaction, or fails NotFound.
    pub(super) async fn require_account(
        &self,
        db_tx: &DatabaseTransaction,
        id: i64,
    ) -> ResultEngine<accounts::Model> {
        accounts::Entity::find_by_id(id)
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound("Account".to_string()))
    }

    /// Applies a signed delta to an account balance as one conditional
    /// UPDATE. With `require_non_negative`, the guard `balance + delta >= 0`
    /// is part of the statement; zero affected rows then means the funds are
    /// insufficient (existence must have been checked beforehand).
    async fn adjust_balance(
        &self,
        db_tx: &DatabaseTransaction,
        account_id: i64,
        delta_minor: i64,
        require_non_negative: bool,
    ) -> ResultEngine<()> {
        let backend = self.database.get_database_backend();
        let sql = if require_non_negative {
            "UPDATE accounts SET balance_minor = balance_minor + ? \
             WHERE id = ? AND balance_minor + ? >= 0"
        } else {
            "UPDATE accounts SET balance_minor = balance_minor + ? WHERE id = ?"
        };
        let values: Vec<Value> = if require_non_negative {
            vec![delta_minor.into(), account_id.into(), delta_minor.into()]
        } else {
            vec![delta_minor.into(), account_id.into()]
        };

        let result = db_tx
            .execute(Statement::from_sql_and_values(backend, sql, values))
            .await?;
        if result.rows_affected() == 0 {
            return Err(EngineError::InsufficientFunds(format!(
                "account {account_id} cannot cover {} minor units",
                delta_minor.abs()
            )));
        }
        Ok(())
    }
}
