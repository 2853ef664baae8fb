use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{BudgetPatch, Engine, EngineError};
use migration::MigratorTrait;

const ALICE: i64 = 1;
const BOB: i64 = 2;

const GROCERIES: i64 = 1;
const RENT: i64 = 2;
const UTILITIES: i64 = 3;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for user in ["alice", "bob"] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec![user.into(), "password".into()],
        ))
        .await
        .unwrap();
    }
    let engine = Engine::builder().database(db.clone()).build();
    (engine, db)
}

fn month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap()
}

#[tokio::test]
async fn create_derives_remaining_and_alert() {
    let (engine, _db) = engine_with_db().await;

    // 1000.00 budgeted, 920.00 spent: 80.00 left is 8%, inside the alert band.
    let budget = engine
        .create_budget(month(2024, 3), 100_000, GROCERIES, ALICE, 92_000)
        .await
        .unwrap();
    assert_eq!(budget.remaining_minor, 8_000);
    assert!(budget.alert_triggered);

    let relaxed = engine
        .create_budget(month(2024, 3), 100_000, RENT, ALICE, 50_000)
        .await
        .unwrap();
    assert_eq!(relaxed.remaining_minor, 50_000);
    assert!(!relaxed.alert_triggered);
}

#[tokio::test]
async fn create_normalizes_the_month_and_rejects_duplicates() {
    let (engine, _db) = engine_with_db().await;

    let budget = engine
        .create_budget(
            NaiveDate::from_ymd_opt(2024, 3, 17).unwrap(),
            100_000,
            GROCERIES,
            ALICE,
            0,
        )
        .await
        .unwrap();
    assert_eq!(budget.month, month(2024, 3));

    // Any day in the same month lands in the same slot.
    let err = engine
        .create_budget(
            NaiveDate::from_ymd_opt(2024, 3, 28).unwrap(),
            50_000,
            GROCERIES,
            ALICE,
            0,
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Conflict("Budget already exists for this category and month".to_string())
    );

    // A different user or month is fine.
    engine
        .create_budget(month(2024, 3), 50_000, GROCERIES, BOB, 0)
        .await
        .unwrap();
    engine
        .create_budget(month(2024, 4), 50_000, GROCERIES, ALICE, 0)
        .await
        .unwrap();
}

#[tokio::test]
async fn create_validates_amounts_and_category() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .create_budget(month(2024, 3), 0, GROCERIES, ALICE, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .create_budget(month(2024, 3), 100_000, GROCERIES, ALICE, -1)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .create_budget(month(2024, 3), 100_000, 999, ALICE, 0)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound("Category".to_string()));
}

#[tokio::test]
async fn listing_filters_by_month_and_paginates() {
    let (engine, _db) = engine_with_db().await;

    for category in [GROCERIES, RENT, UTILITIES] {
        engine
            .create_budget(month(2024, 3), 50_000, category, ALICE, 0)
            .await
            .unwrap();
    }
    engine
        .create_budget(month(2024, 4), 50_000, GROCERIES, ALICE, 0)
        .await
        .unwrap();

    let page = engine.budgets_for_user(ALICE, None, 1, 10).await.unwrap();
    assert_eq!(page.total, 4);
    // Newest month first.
    assert_eq!(page.items[0].month, month(2024, 4));

    let march = engine
        .budgets_for_user(ALICE, Some(month(2024, 3)), 1, 2)
        .await
        .unwrap();
    assert_eq!(march.total, 3);
    assert_eq!(march.total_pages, 2);
    assert_eq!(march.items.len(), 2);
    assert_eq!(march.items[0].category_id, GROCERIES);
}

#[tokio::test]
async fn update_recomputes_from_the_merged_amounts() {
    let (engine, _db) = engine_with_db().await;
    let budget = engine
        .create_budget(month(2024, 3), 100_000, GROCERIES, ALICE, 50_000)
        .await
        .unwrap();

    // Shrink the envelope; spent stays, derived fields follow.
    let updated = engine
        .update_budget(
            budget.id,
            BudgetPatch {
                budgeted_minor: Some(54_000),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.spent_minor, 50_000);
    assert_eq!(updated.remaining_minor, 4_000);
    assert!(updated.alert_triggered);

    let err = engine
        .update_budget(
            budget.id,
            BudgetPatch {
                budgeted_minor: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn update_cannot_move_into_an_occupied_slot() {
    let (engine, _db) = engine_with_db().await;
    let budget = engine
        .create_budget(month(2024, 3), 100_000, GROCERIES, ALICE, 0)
        .await
        .unwrap();
    engine
        .create_budget(month(2024, 3), 100_000, RENT, ALICE, 0)
        .await
        .unwrap();

    let err = engine
        .update_budget(
            budget.id,
            BudgetPatch {
                category_id: Some(RENT),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    // Moving to a free month is fine.
    let moved = engine
        .update_budget(
            budget.id,
            BudgetPatch {
                month: Some(month(2024, 5)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.month, month(2024, 5));
}

#[tokio::test]
async fn delete_then_fetch_is_not_found() {
    let (engine, _db) = engine_with_db().await;
    let budget = engine
        .create_budget(month(2024, 3), 100_000, GROCERIES, ALICE, 0)
        .await
        .unwrap();

    engine.delete_budget(budget.id).await.unwrap();
    let err = engine.budget(budget.id).await.unwrap_err();
    assert_eq!(err, EngineError::NotFound("Budget".to_string()));
}

#[tokio::test]
async fn summary_aggregates_the_users_budgets() {
    let (engine, _db) = engine_with_db().await;

    engine
        .create_budget(month(2024, 3), 100_000, GROCERIES, ALICE, 92_000)
        .await
        .unwrap();
    engine
        .create_budget(month(2024, 3), 50_000, RENT, ALICE, 60_000)
        .await
        .unwrap();
    engine
        .create_budget(month(2024, 3), 30_000, UTILITIES, ALICE, 0)
        .await
        .unwrap();
    // Bob's budgets never leak into Alice's summary.
    engine
        .create_budget(month(2024, 3), 500_000, GROCERIES, BOB, 0)
        .await
        .unwrap();

    let summary = engine.budget_summary(ALICE, None).await.unwrap();
    assert_eq!(summary.total_budgeted_minor, 180_000);
    assert_eq!(summary.total_spent_minor, 152_000);
    assert_eq!(summary.total_remaining_minor, 28_000);
    assert_eq!(summary.categories_over_budget, 1);
    assert_eq!(summary.categories_with_alerts, 2);
    assert!((summary.percentage_used - 84.444).abs() < 0.01);
}

#[tokio::test]
async fn monthly_overview_bundles_summary_and_budgets() {
    let (engine, _db) = engine_with_db().await;

    engine
        .create_budget(month(2024, 3), 100_000, GROCERIES, ALICE, 20_000)
        .await
        .unwrap();
    engine
        .create_budget(month(2024, 3), 50_000, RENT, ALICE, 0)
        .await
        .unwrap();
    engine
        .create_budget(month(2024, 4), 70_000, GROCERIES, ALICE, 0)
        .await
        .unwrap();

    let overview = engine
        .monthly_overview(ALICE, NaiveDate::from_ymd_opt(2024, 3, 22).unwrap())
        .await
        .unwrap();
    assert_eq!(overview.month, month(2024, 3));
    assert_eq!(overview.budgets.len(), 2);
    assert_eq!(overview.summary.total_budgeted_minor, 150_000);
}

#[tokio::test]
async fn alert_and_over_budget_listings() {
    let (engine, _db) = engine_with_db().await;

    engine
        .create_budget(month(2024, 2), 100_000, GROCERIES, ALICE, 92_000)
        .await
        .unwrap();
    engine
        .create_budget(month(2024, 3), 50_000, RENT, ALICE, 60_000)
        .await
        .unwrap();
    engine
        .create_budget(month(2024, 3), 30_000, UTILITIES, ALICE, 1_000)
        .await
        .unwrap();

    let alerts = engine.budgets_with_alerts(ALICE).await.unwrap();
    assert_eq!(alerts.len(), 2);
    // Newest month first.
    assert_eq!(alerts[0].month, month(2024, 3));
    assert_eq!(alerts[1].month, month(2024, 2));

    let over = engine.over_budget(ALICE).await.unwrap();
    assert_eq!(over.len(), 1);
    assert_eq!(over[0].category_id, RENT);
}

#[tokio::test]
async fn record_spending_updates_the_matching_slot() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_budget(month(2024, 3), 100_000, GROCERIES, ALICE, 85_000)
        .await
        .unwrap();

    // No budget for this category: nothing happens.
    let missed = engine
        .record_spending(ALICE, RENT, month(2024, 3), 5_000)
        .await
        .unwrap();
    assert!(missed.is_none());

    // Crosses into the alert band.
    let updated = engine
        .record_spending(ALICE, GROCERIES, month(2024, 3), 10_000)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.spent_minor, 95_000);
    assert_eq!(updated.remaining_minor, 5_000);
    assert!(updated.alert_triggered);

    // A refund can bring spending back down, but not below zero.
    let err = engine
        .record_spending(ALICE, GROCERIES, month(2024, 3), -100_000)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn create_or_update_keeps_recorded_spending() {
    let (engine, _db) = engine_with_db().await;

    let created = engine
        .create_or_update_budget(ALICE, GROCERIES, month(2024, 3), 100_000)
        .await
        .unwrap();
    assert_eq!(created.spent_minor, 0);

    engine
        .record_spending(ALICE, GROCERIES, month(2024, 3), 40_000)
        .await
        .unwrap();

    let resized = engine
        .create_or_update_budget(ALICE, GROCERIES, month(2024, 3), 44_000)
        .await
        .unwrap();
    assert_eq!(resized.id, created.id);
    assert_eq!(resized.spent_minor, 40_000);
    assert_eq!(resized.remaining_minor, 4_000);
    assert!(resized.alert_triggered);
}
