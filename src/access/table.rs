//! Role to capability table
//!
//! | Role         | Capabilities    |
//! |--------------|-----------------|
//! | Admin        | all seven       |
//! | Doctor       | ReadAnonymized  |
//! | Receptionist | WriteRaw        |

use crate::domain::{Capability, Decision, Role};

/// Decides whether `role` holds `capability`
///
/// ```
/// use vigil::access::authorize;
/// use vigil::domain::{Capability, Decision, Role};
///
/// assert_eq!(authorize(Role::Doctor, Capability::ReadAnonymized), Decision::Granted);
/// assert_eq!(authorize(Role::Doctor, Capability::ReadRaw), Decision::Denied);
/// ```
pub const fn authorize(role: Role, capability: Capability) -> Decision {
    let granted = match role {
        Role::Admin => true,
        Role::Doctor => matches!(capability, Capability::ReadAnonymized),
        Role::Receptionist => matches!(capability, Capability::WriteRaw),
    };
    if granted {
        Decision::Granted
    } else {
        Decision::Denied
    }
}

/// Every capability `role` holds, in table order
pub fn capabilities_for(role: Role) -> Vec<Capability> {
    Capability::ALL
        .iter()
        .copied()
        .filter(|capability| authorize(role, *capability).is_granted())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

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
    fn test_authorize_table(role: Role, capability: Capability, expected: Decision) {
        assert_eq!(authorize(role, capability), expected);
    }

    #[test]
    fn test_capabilities_for() {
        assert_eq!(capabilities_for(Role::Admin).len(), Capability::ALL.len());
        assert_eq!(
            capabilities_for(Role::Doctor),
            vec![Capability::ReadAnonymized]
        );
        assert_eq!(
            capabilities_for(Role::Receptionist),
            vec![Capability::WriteRaw]
        );
    }

    #[test]
    fn test_authorize_is_const() {
        const ADMIN_CAN_UNMASK: Decision = authorize(Role::Admin, Capability::Unmask);
        assert!(ADMIN_CAN_UNMASK.is_granted());
    }
}
