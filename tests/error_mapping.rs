//! Provider failures as a dispatcher sees them: prefixed messages, preserved
//! kinds, status codes and bodies.

mod common;

use common::{ScriptedStore, JOHN};
use std::sync::Arc;
use user_facade::error_code::ErrorKind;
use user_facade::{FacadeConfig, RecordDraft, RecordPatch, UserFacade};

fn facade() -> UserFacade {
    UserFacade::new(Arc::new(ScriptedStore::seeded()), FacadeConfig::default()).unwrap()
}

#[tokio::test]
async fn test_missing_record_is_404_with_prefixed_message() {
    let facade = facade();
    let err = facade.get("no-such-id").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "Failed to fetch user: User not found");

    let resp = facade.error_response(&err);
    assert_eq!(resp.status, 404);
    assert_eq!(
        resp.to_json(),
        serde_json::json!({
            "success": false,
            "error": {"message": "Failed to fetch user: User not found"}
        })
    );
}

#[tokio::test]
async fn test_invalid_create_is_400() {
    let facade = facade();
    let err = facade
        .create(RecordDraft::new("Bob", "not-an-email"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().starts_with("Failed to create user: Validation error:"));
    assert_eq!(facade.error_response(&err).status, 400);
}

#[tokio::test]
async fn test_update_and_delete_use_their_own_prefixes() {
    let facade = facade();

    let err = facade
        .update("missing", RecordPatch::new().with_name("Nobody"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Failed to update user: User not found");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = facade.delete("missing").await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to delete user: User not found");
}

#[tokio::test]
async fn test_internal_failure_is_hidden_unless_details_exposed() {
    let store = Arc::new(ScriptedStore::seeded());
    store.set_fail_fetch_all(true);
    let quiet = UserFacade::new(store.clone(), FacadeConfig::default()).unwrap();
    let verbose = UserFacade::new(
        store.clone(),
        FacadeConfig::new().with_expose_error_details(true),
    )
    .unwrap();

    let err = quiet.provider().get_all().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);

    let hidden = quiet.error_response(&err);
    assert_eq!(hidden.status, 500);
    assert_eq!(hidden.error.message, "Internal Server Error");
    assert!(hidden.error.details.is_none());

    let shown = verbose.error_response(&err);
    assert_eq!(
        shown.error.details,
        Some(vec![
            "Failed to fetch users".to_string(),
            "connection refused".to_string()
        ])
    );
}

#[tokio::test]
async fn test_failed_write_leaves_cache_untouched() {
    let store = Arc::new(ScriptedStore::seeded());
    let facade = UserFacade::new(store.clone(), FacadeConfig::default()).unwrap();

    facade.get(JOHN).await.unwrap();
    assert!(facade
        .update(JOHN, RecordPatch::new().with_email("broken"))
        .await
        .is_err());

    let john = facade.get(JOHN).await.unwrap();
    assert_eq!(john.email, "john@example.com");
    assert_eq!(store.fetch_by_id_count(), 1);
    assert_eq!(facade.provider().cache_stats().invalidations, 0);
}
