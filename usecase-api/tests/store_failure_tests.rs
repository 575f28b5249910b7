//! Status mapping when the store fails underneath the routes

mod support;

use axum::http::StatusCode;
use serde_json::json;
use support::{Faults, TestApp};
use usecase_core::{Role, StoreError, UseCaseStore};
use usecase_test_utils::{creators_group, public_form};

const BASE: &str = "/api/v1/usecases";

fn greet_body() -> serde_json::Value {
    json!({ "command": "/greet", "title": "Greet", "content": "Say hello" })
}

fn creators() -> Vec<usecase_core::Group> {
    vec![creators_group("creators", &["u1"])]
}

#[tokio::test]
async fn test_create_conflict_from_store_is_command_taken() -> Result<(), String> {
    // The lookup sees nothing; the insert loses the race on the primary key.
    let faults = Faults {
        create: Some(StoreError::conflict("/greet")),
        ..Faults::default()
    };
    let app = TestApp::with_faults(creators(), faults)?;
    let u1 = app.token("u1", Role::User)?;

    let (status, body) = app.post(&format!("{BASE}/create"), &u1, greet_body()).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "COMMAND_TAKEN");
    Ok(())
}

#[tokio::test]
async fn test_create_persistence_failure_is_request_failed() -> Result<(), String> {
    let faults = Faults {
        create: Some(StoreError::persistence("insert", "connection reset")),
        ..Faults::default()
    };
    let app = TestApp::with_faults(creators(), faults)?;
    let u1 = app.token("u1", Role::User)?;

    let (status, body) = app.post(&format!("{BASE}/create"), &u1, greet_body()).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "REQUEST_FAILED");

    let stored = app
        .fixture
        .store
        .get_by_command("/greet")
        .await
        .map_err(|e| e.to_string())?;
    assert!(stored.is_none());
    Ok(())
}

#[tokio::test]
async fn test_lookup_failure_on_create_is_request_failed() -> Result<(), String> {
    let faults = Faults {
        get: true,
        ..Faults::default()
    };
    let app = TestApp::with_faults(creators(), faults)?;
    let u1 = app.token("u1", Role::User)?;

    let (status, body) = app.post(&format!("{BASE}/create"), &u1, greet_body()).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "REQUEST_FAILED");
    Ok(())
}

#[tokio::test]
async fn test_fetch_failure_is_database_error() -> Result<(), String> {
    let faults = Faults {
        get: true,
        ..Faults::default()
    };
    let app = TestApp::with_faults(creators(), faults)?;
    let u1 = app.token("u1", Role::User)?;

    let (status, body) = app.get(&format!("{BASE}/command/greet"), &u1).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "DATABASE_ERROR");
    Ok(())
}

#[tokio::test]
async fn test_update_failure_is_access_prohibited() -> Result<(), String> {
    let faults = Faults {
        update: true,
        ..Faults::default()
    };
    let app = TestApp::with_faults(creators(), faults)?;
    let original = app
        .fixture
        .store
        .create("u1", &public_form("/greet"))
        .await
        .map_err(|e| e.to_string())?;
    let u1 = app.token("u1", Role::User)?;

    let (status, body) = app
        .post(&format!("{BASE}/command/greet/update"), &u1, greet_body())
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "ACCESS_PROHIBITED");

    let stored = app
        .fixture
        .store
        .get_by_command("/greet")
        .await
        .map_err(|e| e.to_string())?;
    assert_eq!(stored, Some(original));
    Ok(())
}

#[tokio::test]
async fn test_delete_failure_answers_false() -> Result<(), String> {
    let faults = Faults {
        delete: true,
        ..Faults::default()
    };
    let app = TestApp::with_faults(creators(), faults)?;
    app.fixture
        .store
        .create("u1", &public_form("/greet"))
        .await
        .map_err(|e| e.to_string())?;
    let u1 = app.token("u1", Role::User)?;

    let (status, body) = app.delete(&format!("{BASE}/command/greet/delete"), &u1).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(false));

    let (status, _) = app.get(&format!("{BASE}/command/greet"), &u1).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_list_failure_is_database_error() -> Result<(), String> {
    let faults = Faults {
        list: true,
        ..Faults::default()
    };
    let app = TestApp::with_faults(creators(), faults)?;
    let u1 = app.token("u1", Role::User)?;

    for uri in [BASE.to_string(), format!("{BASE}/"), format!("{BASE}/list")] {
        let (status, body) = app.get(&uri, &u1).await?;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", uri);
        assert_eq!(body["code"], "DATABASE_ERROR", "{}", uri);
    }
    Ok(())
}
