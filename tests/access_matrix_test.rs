//! Role x capability matrix exercised through the engine

mod common;

use common::{john_doe, Harness};
use test_case::test_case;
use vigil::access::{authorize, AnonymizeTarget, Operation};
use vigil::audit::AuditQuery;
use vigil::domain::{
    Capability, Decision, PermissionError, RawDelta, RecordId, Role, View, VigilError,
};

fn operation_for(capability: Capability, id: RecordId) -> Operation {
    match capability {
        Capability::ReadRaw => Operation::ReadRecord { id, view: View::Raw },
        Capability::ReadAnonymized => Operation::ReadRecord {
            id,
            view: View::Anonymized,
        },
        Capability::WriteRaw => Operation::UpdateRecord {
            id,
            delta: RawDelta::new().with_diagnosis("Acute bronchitis"),
        },
        Capability::Unmask => Operation::UnmaskContact { id },
        Capability::ViewAuditLog => Operation::ViewAudit {
            query: AuditQuery::new().limit(5),
        },
        Capability::ManageUsers => Operation::ListUsers,
        Capability::TriggerAnonymize => Operation::TriggerAnonymize {
            target: AnonymizeTarget::Record(id),
        },
    }
}

#[test_case(Role::Admin, Capability::ReadRaw, Decision::Granted)]
#[test_case(Role::Admin, Capability::ReadAnonymized, Decision::Granted)]
#[test_case(Role::Admin, Capability::WriteRaw, Decision::Granted)]
#[test_case(Role::Admin, Capability::Unmask, Decision::Granted)]
#[test_case(Role::Admin, Capability::ViewAuditLog, Decision::Granted)]
#[test_case(Role::Admin, Capability::ManageUsers, Decision::Granted)]
#[test_case(Role::Admin, Capability::TriggerAnonymize, Decision::Granted)]
#[test_case(Role::Doctor, Capability::ReadRaw, Decision::Denied)]
#[test_case(Role::Doctor, Capability::ReadAnonymized, Decision::Granted)]
#[test_case(Role::Doctor, Capability::WriteRaw, Decision::Denied)]
#[test_case(Role::Doctor, Capability::Unmask, Decision::Denied)]
#[test_case(Role::Doctor, Capability::ViewAuditLog, Decision::Denied)]
#[test_case(Role::Doctor, Capability::ManageUsers, Decision::Denied)]
#[test_case(Role::Doctor, Capability::TriggerAnonymize, Decision::Denied)]
#[test_case(Role::Receptionist, Capability::ReadRaw, Decision::Denied)]
#[test_case(Role::Receptionist, Capability::ReadAnonymized, Decision::Denied)]
#[test_case(Role::Receptionist, Capability::WriteRaw, Decision::Granted)]
#[test_case(Role::Receptionist, Capability::Unmask, Decision::Denied)]
#[test_case(Role::Receptionist, Capability::ViewAuditLog, Decision::Denied)]
#[test_case(Role::Receptionist, Capability::ManageUsers, Decision::Denied)]
#[test_case(Role::Receptionist, Capability::TriggerAnonymize, Decision::Denied)]
#[tokio::test]
async fn test_engine_enforces_table(role: Role, capability: Capability, expected: Decision) {
    assert_eq!(authorize(role, capability), expected);

    let harness = Harness::new().await;
    let id = harness
        .engine
        .create_record(&harness.admin, john_doe())
        .await
        .unwrap();
    let session = match role {
        Role::Admin => harness.admin.clone(),
        other => harness.user("subject", other).await,
    };

    let operation = operation_for(capability, id);
    assert_eq!(operation.required_capability(), capability);
    let action = operation.action();
    let result = harness.engine.perform(&session, operation).await;

    match expected {
        Decision::Granted => assert!(result.is_ok(), "{role} {capability}: {result:?}"),
        Decision::Denied => assert!(matches!(
            result,
            Err(VigilError::Permission(PermissionError::Denied(denied))) if denied == capability
        )),
    }

    let entries = harness
        .engine
        .view_audit(&harness.admin, AuditQuery::new().actor(session.user_id()))
        .await
        .unwrap();
    let last = entries.last().unwrap();
    assert_eq!(last.action, action);
    assert_eq!(last.outcome, expected);
    assert_eq!(last.actor_role, Some(role));
}
