//! PostgreSQL store tests
//!
//! Require a reachable database configured through the `USECASE_DB_*`
//! variables. Run with `--features db-tests`.

#![cfg(feature = "db-tests")]

use usecase_api::{ApiResult, DbClient, DbConfig, PgGroupDirectory, PgUseCaseStore};
use usecase_core::{GroupDirectory, StoreError, UseCaseStore};
use usecase_test_utils::{
    assert_conflict, assert_not_found, private_form, public_form, unique_command, unique_user_id,
};

/// External tables the adapters read; normally owned by the account service.
const EXTERNAL_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS "user" (
    id                TEXT PRIMARY KEY,
    name              TEXT NOT NULL,
    email             TEXT NOT NULL,
    role              TEXT NOT NULL,
    profile_image_url TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS "group" (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    user_ids    JSONB,
    permissions JSONB
);
"#;

async fn test_db() -> ApiResult<DbClient> {
    let db = DbClient::from_config(&DbConfig::from_env())?;
    db.ensure_schema().await?;
    db.get_conn().await?.batch_execute(EXTERNAL_DDL).await?;
    Ok(db)
}

#[tokio::test]
async fn test_pg_crud_chain() -> Result<(), Box<dyn std::error::Error>> {
    let store = PgUseCaseStore::new(test_db().await?);
    let owner = unique_user_id();
    let command = unique_command();

    let created = store.create(&owner, &private_form(&command)).await?;
    assert_eq!(created.user_id, owner);
    assert_eq!(store.get_by_command(&command).await?, Some(created.clone()));

    assert_conflict(&store.create("someone-else", &public_form(&command)).await, &command);

    let updated = store.update(&command, &public_form(&command)).await?;
    assert!(updated.timestamp > created.timestamp);
    assert_eq!(updated.user_id, owner);
    assert_eq!(updated.access_control, None);

    let listed = store.list_all().await?;
    assert!(listed.iter().any(|r| r.use_case == updated));

    store.delete(&command).await?;
    assert_eq!(store.get_by_command(&command).await?, None);
    store.delete(&command).await?;

    assert_not_found(&store.update(&command, &public_form(&command)).await, &command);
    Ok(())
}

#[tokio::test]
async fn test_pg_list_joins_owner_profile() -> Result<(), Box<dyn std::error::Error>> {
    let db = test_db().await?;
    let owner = unique_user_id();
    db.get_conn()
        .await?
        .execute(
            r#"INSERT INTO "user" (id, name, email, role, profile_image_url)
               VALUES ($1, 'Owner', 'owner@example.com', 'user', '/user.png')"#,
            &[&owner],
        )
        .await?;

    let store = PgUseCaseStore::new(db);
    let command = unique_command();
    store.create(&owner, &public_form(&command)).await?;

    let listed = store.list_all().await?;
    let row = listed
        .iter()
        .find(|r| r.use_case.command == command)
        .ok_or("created record missing from list")?;
    assert_eq!(row.user.as_ref().map(|u| u.email.as_str()), Some("owner@example.com"));

    store.delete(&command).await?;
    Ok(())
}

#[tokio::test]
async fn test_pg_group_directory() -> Result<(), Box<dyn std::error::Error>> {
    let db = test_db().await?;
    let member = unique_user_id();
    let group_id = unique_user_id();
    db.get_conn()
        .await?
        .execute(
            r#"INSERT INTO "group" (id, name, user_ids, permissions)
               VALUES ($1, 'Editors', jsonb_build_array($2::text), '{"workspace":{"use_cases":true}}')"#,
            &[&group_id, &member],
        )
        .await?;

    let directory = PgGroupDirectory::new(db);
    let groups = directory.groups_for_member(&member).await?;
    assert_eq!(groups.len(), 1);
    assert!(groups[0].has_member(&member));
    assert!(directory.groups_for_member("nobody").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_pg_ping() -> Result<(), StoreError> {
    let db = DbClient::from_config(&DbConfig::from_env())
        .map_err(|e| StoreError::persistence("connect", e))?;
    PgUseCaseStore::new(db).ping().await
}
