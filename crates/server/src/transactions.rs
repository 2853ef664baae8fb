//! Transaction recorder API endpoints

use api_types::{
    ApiResponse, PageView, Pagination,
    transaction::{
        MonthOverMonthView, MonthlySummaryEntryView, MonthlySummaryQuery, MonthlyTotalsChangesView,
        MonthlyTotalsView, RecentQuery, SearchQuery, SummaryQuery, TransactionDirection as ApiDirection,
        TransactionListQuery, TransactionNew, TransactionState as ApiState, TransactionSummaryView,
        TransactionUpdate, TransactionView,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::{ServerError, server::ServerState, success, success_empty};
use engine::{
    EngineError, MonthOverMonth, MonthlySummaryEntry, NewTransaction, Page, Transaction,
    TransactionDirection, TransactionFilter, TransactionPatch, TransactionState,
    TransactionSummary, users,
};

type Envelope<T> = (StatusCode, Json<ApiResponse<T>>);

const DEFAULT_PAGE_SIZE: u64 = 20;
const DEFAULT_RECENT_LIMIT: u64 = 10;

fn map_direction(direction: ApiDirection) -> TransactionDirection {
    match direction {
        ApiDirection::Income => TransactionDirection::Income,
        ApiDirection::Expense => TransactionDirection::Expense,
    }
}

fn map_state(state: ApiState) -> TransactionState {
    match state {
        ApiState::Pending => TransactionState::Pending,
        ApiState::Completed => TransactionState::Completed,
    }
}

fn view(tx: Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        description: tx.description,
        amount_minor: tx.amount_minor,
        date: tx.date,
        created_at: tx.created_at,
        direction: match tx.direction {
            TransactionDirection::Income => ApiDirection::Income,
            TransactionDirection::Expense => ApiDirection::Expense,
        },
        state: match tx.state {
            TransactionState::Pending => ApiState::Pending,
            TransactionState::Completed => ApiState::Completed,
        },
        account_id: tx.account_id,
        category_id: tx.category_id,
    }
}

fn page_view(page: Page<Transaction>) -> PageView<TransactionView> {
    PageView {
        items: page.items.into_iter().map(view).collect(),
        total: page.total,
        page: page.page,
        total_pages: page.total_pages,
    }
}

fn summary_view(summary: TransactionSummary) -> TransactionSummaryView {
    TransactionSummaryView {
        total_income_minor: summary.total_income_minor,
        total_expenses_minor: summary.total_expenses_minor,
        net_minor: summary.net_minor,
        transaction_count: summary.transaction_count,
        average_minor: summary.average_minor,
    }
}

/// Fetches a transaction and hides it from everyone but its owner.
async fn require_owned(
    state: &ServerState,
    user_id: i64,
    id: i64,
) -> Result<Transaction, ServerError> {
    let tx = state.engine.transaction(id).await?;
    if tx.user_id != user_id {
        return Err(ServerError::Engine(EngineError::NotFound(
            "Transaction".to_string(),
        )));
    }
    Ok(tx)
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<Envelope<TransactionView>, ServerError> {
    let new = NewTransaction {
        description: payload.description,
        amount_minor: payload.amount_minor,
        date: payload.date,
        direction: map_direction(payload.direction),
        state: payload
            .state
            .map(map_state)
            .unwrap_or(TransactionState::Completed),
        user_id: user.id,
        account_id: payload.account_id,
        category_id: payload.category_id,
    };
    let tx = state.engine.create_transaction(new).await?;
    Ok(success(
        StatusCode::CREATED,
        "Transaction created successfully",
        view(tx),
    ))
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Envelope<PageView<TransactionView>>, ServerError> {
    let filter = TransactionFilter {
        start_date: query.start_date,
        end_date: query.end_date,
        direction: query.direction.map(map_direction),
        state: query.state.map(map_state),
        account_id: query.account_id,
        category_id: query.category_id,
        min_amount_minor: query.min_amount,
        max_amount_minor: query.max_amount,
    };
    let page = state
        .engine
        .transactions_for_user(
            user.id,
            &filter,
            query.page.unwrap_or(1),
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;
    Ok(success(
        StatusCode::OK,
        "Transactions retrieved successfully",
        page_view(page),
    ))
}

pub async fn get(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Envelope<TransactionView>, ServerError> {
    let tx = require_owned(&state, user.id, id).await?;
    Ok(success(
        StatusCode::OK,
        "Transaction retrieved successfully",
        view(tx),
    ))
}

pub async fn update(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Envelope<TransactionView>, ServerError> {
    require_owned(&state, user.id, id).await?;

    let patch = TransactionPatch {
        description: payload.description,
        amount_minor: payload.amount_minor,
        date: payload.date,
        direction: payload.direction.map(map_direction),
        state: payload.state.map(map_state),
        account_id: payload.account_id,
        category_id: payload.category_id,
    };
    let tx = state.engine.update_transaction(id, patch).await?;
    Ok(success(
        StatusCode::OK,
        "Transaction updated successfully",
        view(tx),
    ))
}

pub async fn delete(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Envelope<()>, ServerError> {
    require_owned(&state, user.id, id).await?;
    state.engine.delete_transaction(id).await?;
    Ok(success_empty(
        StatusCode::OK,
        "Transaction deleted successfully",
    ))
}

pub async fn for_account(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(account_id): Path<i64>,
    Query(pagination): Query<Pagination>,
) -> Result<Envelope<PageView<TransactionView>>, ServerError> {
    let page = state
        .engine
        .transactions_for_account(
            account_id,
            user.id,
            pagination.page.unwrap_or(1),
            pagination.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;
    Ok(success(
        StatusCode::OK,
        "Transactions retrieved successfully",
        page_view(page),
    ))
}

pub async fn for_category(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(category_id): Path<i64>,
    Query(pagination): Query<Pagination>,
) -> Result<Envelope<PageView<TransactionView>>, ServerError> {
    let page = state
        .engine
        .transactions_for_category(
            category_id,
            user.id,
            pagination.page.unwrap_or(1),
            pagination.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;
    Ok(success(
        StatusCode::OK,
        "Transactions retrieved successfully",
        page_view(page),
    ))
}

pub async fn search(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(query): Query<SearchQuery>,
) -> Result<Envelope<PageView<TransactionView>>, ServerError> {
    let page = state
        .engine
        .search_transactions(
            user.id,
            &query.term,
            query.page.unwrap_or(1),
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;
    Ok(success(
        StatusCode::OK,
        "Transactions retrieved successfully",
        page_view(page),
    ))
}

pub async fn recent(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(query): Query<RecentQuery>,
) -> Result<Envelope<Vec<TransactionView>>, ServerError> {
    let transactions = state
        .engine
        .recent_transactions(user.id, query.limit.unwrap_or(DEFAULT_RECENT_LIMIT))
        .await?;
    Ok(success(
        StatusCode::OK,
        "Transactions retrieved successfully",
        transactions.into_iter().map(view).collect(),
    ))
}

pub async fn pending(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Envelope<Vec<TransactionView>>, ServerError> {
    let transactions = state.engine.pending_transactions(user.id).await?;
    Ok(success(
        StatusCode::OK,
        "Pending transactions retrieved successfully",
        transactions.into_iter().map(view).collect(),
    ))
}

pub async fn summary(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Envelope<TransactionSummaryView>, ServerError> {
    let summary = state
        .engine
        .transaction_summary(user.id, query.start_date, query.end_date)
        .await?;
    Ok(success(
        StatusCode::OK,
        "Summary retrieved successfully",
        summary_view(summary),
    ))
}

pub async fn monthly_summary(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(query): Query<MonthlySummaryQuery>,
) -> Result<Envelope<Vec<MonthlySummaryEntryView>>, ServerError> {
    let entries = state.engine.monthly_summary(user.id, query.year).await?;
    let entries = entries
        .into_iter()
        .map(|entry: MonthlySummaryEntry| MonthlySummaryEntryView {
            month_name: entry.month_name,
            year: entry.year,
            total_income_minor: entry.total_income_minor,
            total_expenses_minor: entry.total_expenses_minor,
            net_minor: entry.net_minor,
            transaction_count: entry.transaction_count,
        })
        .collect();
    Ok(success(
        StatusCode::OK,
        "Monthly summary retrieved successfully",
        entries,
    ))
}

pub async fn monthly_comparison(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Envelope<MonthOverMonthView>, ServerError> {
    let report = state.engine.month_over_month(user.id, Utc::now()).await?;
    Ok(success(
        StatusCode::OK,
        "Monthly comparison retrieved successfully",
        comparison_view(report),
    ))
}

fn totals_view(totals: engine::MonthlyTotals) -> MonthlyTotalsView {
    MonthlyTotalsView {
        total_amount_minor: totals.total_amount_minor,
        total_income_minor: totals.total_income_minor,
        total_expenses_minor: totals.total_expenses_minor,
        balance_minor: totals.balance_minor,
    }
}

fn comparison_view(report: MonthOverMonth) -> MonthOverMonthView {
    MonthOverMonthView {
        current: totals_view(report.current),
        previous: report.previous.map(totals_view),
        changes: report.changes.map(|changes| MonthlyTotalsChangesView {
            total_amount: changes.total_amount,
            total_amount_positive: changes.total_amount_positive,
            total_income: changes.total_income,
            total_income_positive: changes.total_income_positive,
            total_expenses: changes.total_expenses,
            total_expenses_positive: changes.total_expenses_positive,
        }),
    }
}
