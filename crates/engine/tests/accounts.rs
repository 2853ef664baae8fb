use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, ModelTrait, Statement};

use engine::{AccountPatch, Engine, EngineError};
use migration::MigratorTrait;

const ALICE: i64 = 1;
const BOB: i64 = 2;

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

#[tokio::test]
async fn create_and_fetch_account() {
    let (engine, _db) = engine_with_db().await;

    let created = engine
        .create_account("Checking", Some(1), 10_000, Some(1), ALICE)
        .await
        .unwrap();
    assert_eq!(created.name, "Checking");
    assert_eq!(created.balance_minor, 10_000);

    let fetched = engine.account(created.id).await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn create_rejects_blank_name_and_negative_balance() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .create_account("   ", None, 0, None, ALICE)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .create_account("Checking", None, -1, None, ALICE)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn listing_is_scoped_to_the_user() {
    let (engine, _db) = engine_with_db().await;

    engine
        .create_account("Checking", None, 0, None, ALICE)
        .await
        .unwrap();
    engine
        .create_account("Savings", None, 0, None, ALICE)
        .await
        .unwrap();
    engine
        .create_account("Bob's", None, 0, None, BOB)
        .await
        .unwrap();

    let accounts = engine.accounts_for_user(ALICE).await.unwrap();
    assert_eq!(accounts.len(), 2);
    assert!(accounts.iter().all(|a| a.user_id == ALICE));
}

#[tokio::test]
async fn deposit_and_withdraw_move_the_balance() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account("Checking", None, 10_000, None, ALICE)
        .await
        .unwrap();

    let after = engine.deposit(account.id, 2_500).await.unwrap();
    assert_eq!(after.balance_minor, 12_500);

    let after = engine.withdraw(account.id, 12_500).await.unwrap();
    assert_eq!(after.balance_minor, 0);
}

#[tokio::test]
async fn insufficient_withdrawal_leaves_the_balance_untouched() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account("Checking", None, 10_000, None, ALICE)
        .await
        .unwrap();

    let err = engine.withdraw(account.id, 15_000).await.unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));

    let unchanged = engine.account(account.id).await.unwrap();
    assert_eq!(unchanged.balance_minor, 10_000);
}

#[tokio::test]
async fn withdraw_then_deposit_restores_the_exact_balance() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account("Checking", None, 73_421, None, ALICE)
        .await
        .unwrap();

    engine.withdraw(account.id, 9_999).await.unwrap();
    let restored = engine.deposit(account.id, 9_999).await.unwrap();
    assert_eq!(restored.balance_minor, 73_421);
}

#[tokio::test]
async fn transfer_debits_and_credits_together() {
    let (engine, _db) = engine_with_db().await;
    let from = engine
        .create_account("Checking", None, 50_000, None, ALICE)
        .await
        .unwrap();
    let to = engine
        .create_account("Savings", None, 0, None, ALICE)
        .await
        .unwrap();

    let (from, to) = engine.transfer(from.id, to.id, 20_000).await.unwrap();
    assert_eq!(from.balance_minor, 30_000);
    assert_eq!(to.balance_minor, 20_000);
}

#[tokio::test]
async fn failed_transfer_changes_neither_account() {
    let (engine, _db) = engine_with_db().await;
    let from = engine
        .create_account("Checking", None, 5_000, None, ALICE)
        .await
        .unwrap();
    let to = engine
        .create_account("Savings", None, 1_000, None, ALICE)
        .await
        .unwrap();

    let err = engine.transfer(from.id, to.id, 20_000).await.unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));

    assert_eq!(engine.account(from.id).await.unwrap().balance_minor, 5_000);
    assert_eq!(engine.account(to.id).await.unwrap().balance_minor, 1_000);
}

#[tokio::test]
async fn transfer_validates_endpoints() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account("Checking", None, 5_000, None, ALICE)
        .await
        .unwrap();

    let err = engine
        .transfer(account.id, account.id, 1_000)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine.transfer(account.id, 999, 1_000).await.unwrap_err();
    assert_eq!(err, EngineError::NotFound("Destination account".to_string()));

    let err = engine.transfer(999, account.id, 1_000).await.unwrap_err();
    assert_eq!(err, EngineError::NotFound("Source account".to_string()));
}

#[tokio::test]
async fn update_patches_only_the_given_fields() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account("Checking", Some(1), 5_000, Some(1), ALICE)
        .await
        .unwrap();

    let updated = engine
        .update_account(
            account.id,
            AccountPatch {
                name: Some("Everyday".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Everyday");
    assert_eq!(updated.balance_minor, 5_000);
    assert_eq!(updated.account_type_id, Some(1));

    let err = engine
        .update_account(
            account.id,
            AccountPatch {
                balance_minor: Some(-1),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn delete_then_fetch_is_not_found() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account("Checking", None, 0, None, ALICE)
        .await
        .unwrap();

    engine.delete_account(account.id).await.unwrap();
    let err = engine.account(account.id).await.unwrap_err();
    assert_eq!(err, EngineError::NotFound("Account".to_string()));
}

#[tokio::test]
async fn total_balance_sums_only_the_users_accounts() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_account("Checking", None, 10_000, None, ALICE)
        .await
        .unwrap();
    engine
        .create_account("Savings", None, 32_000, None, ALICE)
        .await
        .unwrap();
    engine
        .create_account("Bob's", None, 99_000, None, BOB)
        .await
        .unwrap();

    assert_eq!(engine.total_balance(ALICE).await.unwrap(), 42_000);
}

#[tokio::test]
async fn low_balance_lists_poorest_first() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_account("A", None, 8_000, None, ALICE)
        .await
        .unwrap();
    engine
        .create_account("B", None, 500, None, ALICE)
        .await
        .unwrap();
    engine
        .create_account("C", None, 20_000, None, ALICE)
        .await
        .unwrap();

    let low = engine.low_balance_accounts(ALICE, 10_000).await.unwrap();
    let names: Vec<&str> = low.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["B", "A"]);

    let err = engine.low_balance_accounts(ALICE, -1).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn account_rows_link_to_owner_type_and_currency() {
    let (engine, db) = engine_with_db().await;
    let account = engine
        .create_account("Checking", Some(1), 0, Some(2), ALICE)
        .await
        .unwrap();

    let model = engine::accounts::Entity::find_by_id(account.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();

    let owner = model
        .find_related(engine::users::Entity)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(owner.username, "alice");

    let account_type = model
        .find_related(engine::account_types::Entity)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account_type.id, 1);

    let currency = model
        .find_related(engine::currencies::Entity)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(currency.id, 2);
}

#[tokio::test]
async fn accounts_by_type_and_currency() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_account("Checking", Some(1), 0, Some(1), ALICE)
        .await
        .unwrap();
    engine
        .create_account("Savings", Some(2), 0, Some(2), ALICE)
        .await
        .unwrap();

    let by_type = engine.accounts_by_type(2).await.unwrap();
    assert_eq!(by_type.len(), 1);
    assert_eq!(by_type[0].name, "Savings");

    let by_currency = engine.accounts_by_currency(1).await.unwrap();
    assert_eq!(by_currency.len(), 1);
    assert_eq!(by_currency[0].name, "Checking");
}
