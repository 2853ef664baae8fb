//! Account ledger API endpoints

use api_types::{
    ApiResponse,
    account::{
        AccountNew, AccountUpdate, AccountView, Amount, LowBalanceQuery, TotalBalance,
        TransferNew, TransferView,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{ServerError, server::ServerState, success, success_empty};
use engine::{Account, AccountPatch, EngineError, users};

type Envelope<T> = (StatusCode, Json<ApiResponse<T>>);

/// Threshold applied when `/accounts/low-balance` is called without one.
const DEFAULT_LOW_BALANCE_THRESHOLD_MINOR: i64 = 10_000;

fn view(account: Account) -> AccountView {
    AccountView {
        id: account.id,
        name: account.name,
        account_type_id: account.account_type_id,
        balance_minor: account.balance_minor,
        currency_id: account.currency_id,
        created_at: account.created_at,
    }
}

/// Fetches an account and hides it from everyone but its owner.
async fn require_owned(
    state: &ServerState,
    user_id: i64,
    account_id: i64,
) -> Result<Account, ServerError> {
    let account = state.engine.account(account_id).await?;
    if account.user_id != user_id {
        return Err(ServerError::Engine(EngineError::NotFound(
            "Account".to_string(),
        )));
    }
    Ok(account)
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<AccountNew>,
) -> Result<Envelope<AccountView>, ServerError> {
    let account = state
        .engine
        .create_account(
            &payload.name,
            payload.account_type_id,
            payload.balance_minor.unwrap_or(0),
            payload.currency_id,
            user.id,
        )
        .await?;
    Ok(success(
        StatusCode::CREATED,
        "Account created successfully",
        view(account),
    ))
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Envelope<Vec<AccountView>>, ServerError> {
    let accounts = state.engine.accounts_for_user(user.id).await?;
    Ok(success(
        StatusCode::OK,
        "Accounts retrieved successfully",
        accounts.into_iter().map(view).collect(),
    ))
}

pub async fn get(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Envelope<AccountView>, ServerError> {
    let account = require_owned(&state, user.id, id).await?;
    Ok(success(
        StatusCode::OK,
        "Account retrieved successfully",
        view(account),
    ))
}

pub async fn update(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<AccountUpdate>,
) -> Result<Envelope<AccountView>, ServerError> {
    require_owned(&state, user.id, id).await?;

    let patch = AccountPatch {
        name: payload.name,
        account_type_id: payload.account_type_id,
        balance_minor: payload.balance_minor,
        currency_id: payload.currency_id,
    };
    let account = state.engine.update_account(id, patch).await?;
    Ok(success(
        StatusCode::OK,
        "Account updated successfully",
        view(account),
    ))
}

pub async fn delete(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Envelope<()>, ServerError> {
    require_owned(&state, user.id, id).await?;
    state.engine.delete_account(id).await?;
    Ok(success_empty(
        StatusCode::OK,
        "Account deleted successfully",
    ))
}

pub async fn deposit(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<Amount>,
) -> Result<Envelope<AccountView>, ServerError> {
    require_owned(&state, user.id, id).await?;
    let account = state.engine.deposit(id, payload.amount_minor).await?;
    Ok(success(StatusCode::OK, "Deposit successful", view(account)))
}

pub async fn withdraw(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<Amount>,
) -> Result<Envelope<AccountView>, ServerError> {
    require_owned(&state, user.id, id).await?;
    let account = state.engine.withdraw(id, payload.amount_minor).await?;
    Ok(success(
        StatusCode::OK,
        "Withdrawal successful",
        view(account),
    ))
}

pub async fn transfer(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransferNew>,
) -> Result<Envelope<TransferView>, ServerError> {
    require_owned(&state, user.id, payload.from_account_id)
        .await
        .map_err(|_| ServerError::Engine(EngineError::NotFound("Source account".to_string())))?;
    require_owned(&state, user.id, payload.to_account_id)
        .await
        .map_err(|_| {
            ServerError::Engine(EngineError::NotFound("Destination account".to_string()))
        })?;

    let (from, to) = state
        .engine
        .transfer(
            payload.from_account_id,
            payload.to_account_id,
            payload.amount_minor,
        )
        .await?;
    Ok(success(
        StatusCode::OK,
        "Transfer completed successfully",
        TransferView {
            from: view(from),
            to: view(to),
        },
    ))
}

pub async fn total_balance(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Envelope<TotalBalance>, ServerError> {
    let total_minor = state.engine.total_balance(user.id).await?;
    Ok(success(
        StatusCode::OK,
        "Total balance retrieved successfully",
        TotalBalance { total_minor },
    ))
}

pub async fn low_balance(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(query): Query<LowBalanceQuery>,
) -> Result<Envelope<Vec<AccountView>>, ServerError> {
    let accounts = state
        .engine
        .low_balance_accounts(
            user.id,
            query.threshold.unwrap_or(DEFAULT_LOW_BALANCE_THRESHOLD_MINOR),
        )
        .await?;
    Ok(success(
        StatusCode::OK,
        "Accounts retrieved successfully",
        accounts.into_iter().map(view).collect(),
    ))
}
