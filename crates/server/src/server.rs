use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{ServerError, accounts, budgets, transactions};
use engine::{Engine, EngineError, users};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
}

fn unauthorized() -> ServerError {
    ServerError::Engine(EngineError::Unauthorized("Invalid API token".to_string()))
}

/// Resolves the bearer token against the users table and makes the matching
/// user available to handlers as an `Extension`.
async fn auth(
    auth_header: TypedHeader<Authorization<Bearer>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let token = auth_header.token();
    if token.is_empty() {
        return Err(unauthorized());
    }

    let user = users::Entity::find()
        .filter(users::Column::ApiToken.eq(token))
        .one(&state.db)
        .await
        .map_err(|_| unauthorized())?
        .ok_or_else(unauthorized)?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/accounts", post(accounts::create).get(accounts::list))
        .route("/accounts/total-balance", get(accounts::total_balance))
        .route("/accounts/low-balance", get(accounts::low_balance))
        .route("/accounts/transfer", post(accounts::transfer))
        .route(
            "/accounts/{id}",
            get(accounts::get)
                .put(accounts::update)
                .delete(accounts::delete),
        )
        .route("/accounts/{id}/deposit", post(accounts::deposit))
        .route("/accounts/{id}/withdraw", post(accounts::withdraw))
        .route(
            "/transactions",
            post(transactions::create).get(transactions::list),
        )
        .route("/transactions/recent", get(transactions::recent))
        .route("/transactions/pending", get(transactions::pending))
        .route("/transactions/summary", get(transactions::summary))
        .route(
            "/transactions/monthly-summary",
            get(transactions::monthly_summary),
        )
        .route(
            "/transactions/monthly-comparison",
            get(transactions::monthly_comparison),
        )
        .route("/transactions/search", get(transactions::search))
        .route(
            "/transactions/account/{account_id}",
            get(transactions::for_account),
        )
        .route(
            "/transactions/category/{category_id}",
            get(transactions::for_category),
        )
        .route(
            "/transactions/{id}",
            get(transactions::get)
                .put(transactions::update)
                .delete(transactions::delete),
        )
        .route("/budgets", post(budgets::create).get(budgets::list))
        .route("/budgets/create-or-update", put(budgets::create_or_update))
        .route("/budgets/summary", get(budgets::summary))
        .route("/budgets/monthly-overview", get(budgets::monthly_overview))
        .route("/budgets/alerts", get(budgets::alerts))
        .route("/budgets/over-budget", get(budgets::over_budget))
        .route(
            "/budgets/{id}",
            get(budgets::get).put(budgets::update).delete(budgets::delete),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(engine: Engine, db: DatabaseConnection, bind: &str, port: u16) {
    let listener = match tokio::net::TcpListener::bind((bind, port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        db,
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, db, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use http_body_util::BodyExt;
    use migration::MigratorTrait;
    use sea_orm::{ConnectionTrait, Database, Statement};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn test_router() -> Router {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let backend = db.get_database_backend();
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password, api_token) VALUES (?, ?, ?)",
            vec!["alice".into(), "password".into(), "token-alice".into()],
        ))
        .await
        .unwrap();
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password, api_token) VALUES (?, ?, ?)",
            vec!["bob".into(), "password".into(), "token-bob".into()],
        ))
        .await
        .unwrap();

        let engine = Engine::builder().database(db.clone()).build();
        router(ServerState {
            engine: Arc::new(engine),
            db,
        })
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn requests_without_a_valid_token_are_rejected() {
        let app = test_router().await;

        let response = app
            .clone()
            .oneshot(request("GET", "/accounts", None, None))
            .await
            .unwrap();
        assert_ne!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(request("GET", "/accounts", Some("wrong-token"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn account_creation_wraps_the_payload_in_the_envelope() {
        let app = test_router().await;

        let response = app
            .oneshot(request(
                "POST",
                "/accounts",
                Some("token-alice"),
                Some(json!({"name": "Checking", "balance_minor": 10_000})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["message"], "Account created successfully");
        assert_eq!(body["status"], 201);
        assert_eq!(body["data"]["name"], "Checking");
        assert_eq!(body["data"]["balance_minor"], 10_000);
        assert!(body.get("code").is_none());
    }

    #[tokio::test]
    async fn validation_errors_carry_the_validation_code() {
        let app = test_router().await;

        let response = app
            .oneshot(request(
                "POST",
                "/accounts",
                Some("token-alice"),
                Some(json!({"name": "  ", "balance_minor": 0})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn insufficient_funds_maps_to_400() {
        let app = test_router().await;

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/accounts",
                Some("token-alice"),
                Some(json!({"name": "Checking", "balance_minor": 5_000})),
            ))
            .await
            .unwrap();
        let id = body_json(response).await["data"]["id"].clone();

        let response = app
            .oneshot(request(
                "POST",
                &format!("/accounts/{id}/withdraw"),
                Some("token-alice"),
                Some(json!({"amount_minor": 10_000})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn other_peoples_accounts_are_invisible() {
        let app = test_router().await;

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/accounts",
                Some("token-alice"),
                Some(json!({"name": "Checking", "balance_minor": 0})),
            ))
            .await
            .unwrap();
        let id = body_json(response).await["data"]["id"].clone();

        let response = app
            .oneshot(request(
                "GET",
                &format!("/accounts/{id}"),
                Some("token-bob"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn deposit_and_listing_round_trip() {
        let app = test_router().await;

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/accounts",
                Some("token-alice"),
                Some(json!({"name": "Checking", "balance_minor": 1_000})),
            ))
            .await
            .unwrap();
        let id = body_json(response).await["data"]["id"].clone();

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/accounts/{id}/deposit"),
                Some("token-alice"),
                Some(json!({"amount_minor": 2_500})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["balance_minor"], 3_500);

        let response = app
            .oneshot(request(
                "GET",
                "/accounts/total-balance",
                Some("token-alice"),
                None,
            ))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["data"]["total_minor"], 3_500);
    }

    #[tokio::test]
    async fn low_balance_defaults_the_threshold() {
        let app = test_router().await;

        for (name, balance) in [("Pocket", 5_000), ("Savings", 200_000)] {
            let response = app
                .clone()
                .oneshot(request(
                    "POST",
                    "/accounts",
                    Some("token-alice"),
                    Some(json!({"name": name, "balance_minor": balance})),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        // No threshold parameter: the 10 000 minor-unit default applies.
        let response = app
            .clone()
            .oneshot(request(
                "GET",
                "/accounts/low-balance",
                Some("token-alice"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["name"], "Pocket");

        // An explicit threshold still wins.
        let response = app
            .oneshot(request(
                "GET",
                "/accounts/low-balance?threshold=1000000",
                Some("token-alice"),
                None,
            ))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn duplicate_budget_slot_is_a_conflict() {
        let app = test_router().await;

        let payload = json!({
            "month": "2024-03-01",
            "budgeted_minor": 100_000,
            "category_id": 1
        });
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/budgets",
                Some("token-alice"),
                Some(payload.clone()),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(request("POST", "/budgets", Some("token-alice"), Some(payload)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn transaction_listing_applies_query_filters() {
        let app = test_router().await;

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/accounts",
                Some("token-alice"),
                Some(json!({"name": "Checking", "balance_minor": 0})),
            ))
            .await
            .unwrap();
        let account_id = body_json(response).await["data"]["id"].clone();

        for (description, direction, amount) in [
            ("Salary", "income", 250_000),
            ("Rent", "expense", 95_000),
            ("Groceries", "expense", 4_250),
        ] {
            let response = app
                .clone()
                .oneshot(request(
                    "POST",
                    "/transactions",
                    Some("token-alice"),
                    Some(json!({
                        "description": description,
                        "amount_minor": amount,
                        "date": "2024-03-05T12:00:00Z",
                        "direction": direction,
                        "account_id": account_id,
                        "category_id": 1
                    })),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = app
            .oneshot(request(
                "GET",
                "/transactions?direction=expense&min_amount=10000",
                Some("token-alice"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["items"][0]["description"], "Rent");
    }
}
