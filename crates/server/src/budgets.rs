//! Budget tracker API endpoints

use api_types::{
    ApiResponse, PageView,
    budget::{
        BudgetListQuery, BudgetNew, BudgetSummaryView, BudgetUpdate, BudgetUpsert, BudgetView,
        MonthQuery, MonthlyOverviewView, SummaryQuery,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{ServerError, server::ServerState, success, success_empty};
use engine::{Budget, BudgetPatch, BudgetSummary, EngineError, Page, users};

type Envelope<T> = (StatusCode, Json<ApiResponse<T>>);

const DEFAULT_PAGE_SIZE: u64 = 20;

fn view(budget: Budget) -> BudgetView {
    BudgetView {
        id: budget.id,
        month: budget.month,
        budgeted_minor: budget.budgeted_minor,
        spent_minor: budget.spent_minor,
        remaining_minor: budget.remaining_minor,
        alert_triggered: budget.alert_triggered,
        category_id: budget.category_id,
        created_at: budget.created_at,
    }
}

fn page_view(page: Page<Budget>) -> PageView<BudgetView> {
    PageView {
        items: page.items.into_iter().map(view).collect(),
        total: page.total,
        page: page.page,
        total_pages: page.total_pages,
    }
}

fn summary_view(summary: BudgetSummary) -> BudgetSummaryView {
    BudgetSummaryView {
        total_budgeted_minor: summary.total_budgeted_minor,
        total_spent_minor: summary.total_spent_minor,
        total_remaining_minor: summary.total_remaining_minor,
        percentage_used: summary.percentage_used,
        categories_over_budget: summary.categories_over_budget,
        categories_with_alerts: summary.categories_with_alerts,
    }
}

/// Fetches a budget and hides it from everyone but its owner.
async fn require_owned(
    state: &ServerState,
    user_id: i64,
    id: i64,
) -> Result<Budget, ServerError> {
    let budget = state.engine.budget(id).await?;
    if budget.user_id != user_id {
        return Err(ServerError::Engine(EngineError::NotFound(
            "Budget".to_string(),
        )));
    }
    Ok(budget)
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<BudgetNew>,
) -> Result<Envelope<BudgetView>, ServerError> {
    let budget = state
        .engine
        .create_budget(
            payload.month,
            payload.budgeted_minor,
            payload.category_id,
            user.id,
            payload.spent_minor.unwrap_or(0),
        )
        .await?;
    Ok(success(
        StatusCode::CREATED,
        "Budget created successfully",
        view(budget),
    ))
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(query): Query<BudgetListQuery>,
) -> Result<Envelope<PageView<BudgetView>>, ServerError> {
    let page = state
        .engine
        .budgets_for_user(
            user.id,
            query.month,
            query.page.unwrap_or(1),
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;
    Ok(success(
        StatusCode::OK,
        "Budgets retrieved successfully",
        page_view(page),
    ))
}

pub async fn get(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Envelope<BudgetView>, ServerError> {
    let budget = require_owned(&state, user.id, id).await?;
    Ok(success(
        StatusCode::OK,
        "Budget retrieved successfully",
        view(budget),
    ))
}

pub async fn update(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<BudgetUpdate>,
) -> Result<Envelope<BudgetView>, ServerError> {
    require_owned(&state, user.id, id).await?;

    let patch = BudgetPatch {
        month: payload.month,
        budgeted_minor: payload.budgeted_minor,
        spent_minor: payload.spent_minor,
        category_id: payload.category_id,
    };
    let budget = state.engine.update_budget(id, patch).await?;
    Ok(success(
        StatusCode::OK,
        "Budget updated successfully",
        view(budget),
    ))
}

pub async fn delete(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Envelope<()>, ServerError> {
    require_owned(&state, user.id, id).await?;
    state.engine.delete_budget(id).await?;
    Ok(success_empty(StatusCode::OK, "Budget deleted successfully"))
}

pub async fn summary(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Envelope<BudgetSummaryView>, ServerError> {
    let summary = state.engine.budget_summary(user.id, query.month).await?;
    Ok(success(
        StatusCode::OK,
        "Budget summary retrieved successfully",
        summary_view(summary),
    ))
}

pub async fn monthly_overview(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(query): Query<MonthQuery>,
) -> Result<Envelope<MonthlyOverviewView>, ServerError> {
    let overview = state.engine.monthly_overview(user.id, query.month).await?;
    Ok(success(
        StatusCode::OK,
        "Monthly overview retrieved successfully",
        MonthlyOverviewView {
            month: overview.month,
            summary: summary_view(overview.summary),
            budgets: overview.budgets.into_iter().map(view).collect(),
        },
    ))
}

pub async fn alerts(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Envelope<Vec<BudgetView>>, ServerError> {
    let budgets = state.engine.budgets_with_alerts(user.id).await?;
    Ok(success(
        StatusCode::OK,
        "Budgets retrieved successfully",
        budgets.into_iter().map(view).collect(),
    ))
}

pub async fn over_budget(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Envelope<Vec<BudgetView>>, ServerError> {
    let budgets = state.engine.over_budget(user.id).await?;
    Ok(success(
        StatusCode::OK,
        "Budgets retrieved successfully",
        budgets.into_iter().map(view).collect(),
    ))
}

pub async fn create_or_update(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<BudgetUpsert>,
) -> Result<Envelope<BudgetView>, ServerError> {
    let budget = state
        .engine
        .create_or_update_budget(
            user.id,
            payload.category_id,
            payload.month,
            payload.budgeted_minor,
        )
        .await?;
    Ok(success(
        StatusCode::OK,
        "Budget saved successfully",
        view(budget),
    ))
}
