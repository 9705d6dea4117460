#![cfg(feature = "sqlite")]

mod contract;

use pos_repo::sqlite::SqliteRepo;
use pos_types::ports::audit_log::AuditLog;
use pos_types::ports::order_store::{OrderStore, RepoError};
use pos_types::ports::transition::TransitionWriter;
use sqlx::SqlitePool;
use std::path::PathBuf;
use uuid::Uuid;

fn temp_db_url() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut path = PathBuf::from(dir.path());
    path.push(format!("pos-{}.db", Uuid::new_v4()));
    let url = format!("sqlite://{}", path.display());
    (dir, url)
}

async fn fresh() -> (tempfile::TempDir, SqliteRepo) {
    let (dir, url) = temp_db_url();
    let repo = SqliteRepo::new(&url).await.unwrap();
    (dir, repo)
}

#[tokio::test]
async fn sqlite_orders_round_trip() {
    let (_dir, repo) = fresh().await;
    contract::orders_round_trip(&repo).await;
}

#[tokio::test]
async fn sqlite_keeps_legacy_statuses() {
    let (_dir, repo) = fresh().await;
    contract::legacy_status_loads_as_invalid(&repo).await;
}

#[tokio::test]
async fn sqlite_tracking_tokens() {
    let (_dir, repo) = fresh().await;
    contract::tracking_tokens_are_unique(&repo).await;
}

#[tokio::test]
async fn sqlite_status_fields() {
    let (_dir, repo) = fresh().await;
    contract::status_fields_keep_stamps(&repo).await;
}

#[tokio::test]
async fn sqlite_deliveries_and_riders() {
    let (_dir, repo) = fresh().await;
    contract::deliveries_and_riders(&repo).await;
}

#[tokio::test]
async fn sqlite_audit_trail() {
    let (_dir, repo) = fresh().await;
    contract::audit_is_append_only_and_ordered(&repo).await;
}

#[tokio::test]
async fn sqlite_transition_commit_rolls_back() {
    let (_dir, repo) = fresh().await;
    contract::transition_commits_everything(&repo).await;
    contract::failed_transition_writes_nothing(&repo).await;
}

#[tokio::test]
async fn sqlite_order_bundle() {
    let (_dir, repo) = fresh().await;
    contract::order_bundle_lands_together(&repo).await;
}

#[tokio::test]
async fn sqlite_failed_delivery_insert_rolls_back_the_order() {
    let (_dir, url) = temp_db_url();
    let repo = SqliteRepo::new(&url).await.unwrap();

    let side = SqlitePool::connect(&url).await.unwrap();
    sqlx::query(
        "CREATE TRIGGER reject_deliveries BEFORE INSERT ON deliveries
         BEGIN SELECT RAISE(ABORT, 'deliveries offline'); END",
    )
    .execute(&side)
    .await
    .unwrap();

    let res = repo.create_order_bundle(contract::intake("ORD-X")).await;
    assert!(matches!(res, Err(RepoError::DbError(_))));
    assert!(repo.list().await.unwrap().is_empty());
    assert!(repo.query_by_order(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_data_survives_reopen() {
    let (_dir, url) = temp_db_url();
    {
        let repo = SqliteRepo::new(&url).await.unwrap();
        contract::orders_round_trip(&repo).await;
    }
    // Migrations are idempotent on an existing file.
    let reopened = SqliteRepo::new(&url).await.unwrap();
    assert_eq!(reopened.list().await.unwrap().len(), 2);
}
