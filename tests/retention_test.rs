//! Retention purge removes old records and keeps their audit history

mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::{john_doe, Harness};
use vigil::audit::{AuditAction, AuditQuery};
use vigil::domain::{Capability, PermissionError, Role, View, VigilError};

#[tokio::test]
async fn test_purge_removes_expired_records_only() {
    let harness = Harness::new().await;
    let engine = &harness.engine;
    let id = engine
        .create_record(&harness.admin, john_doe())
        .await
        .unwrap();

    let purged = engine.purge_expired(&harness.admin, Utc::now()).await.unwrap();
    assert_eq!(purged, 0);
    assert!(engine.read_record(&harness.admin, id, View::Raw).await.is_ok());

    let later = Utc::now() + ChronoDuration::days(1826);
    let purged = engine.purge_expired(&harness.admin, later).await.unwrap();
    assert_eq!(purged, 1);

    let gone = engine.read_record(&harness.admin, id, View::Raw).await;
    assert!(matches!(gone, Err(VigilError::NotFound { record_id }) if record_id == id));

    // History of the purged record survives
    let history = engine
        .view_audit(&harness.admin, AuditQuery::new().target(id))
        .await
        .unwrap();
    assert_eq!(history[0].action, AuditAction::CreateRecord);
    assert!(history.len() >= 3);

    let purges = engine
        .view_audit(
            &harness.admin,
            AuditQuery::new().action(AuditAction::PurgeExpired),
        )
        .await
        .unwrap();
    assert_eq!(purges.len(), 2);
}

#[tokio::test]
async fn test_purge_requires_admin() {
    let harness = Harness::new().await;
    let doctor = harness.user("dr.bob", Role::Doctor).await;

    let result = harness.engine.purge_expired(&doctor, Utc::now()).await;
    assert!(matches!(
        result,
        Err(VigilError::Permission(PermissionError::Denied(
            Capability::ManageUsers
        )))
    ));
}
