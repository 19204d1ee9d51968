//! Proof of a granted unmask decision

use super::table::authorize;
use crate::domain::{Capability, Role, UserId};

/// Capability token required by [`Anonymizer::unmask`](crate::anonymization::Anonymizer::unmask)
///
/// Only the access control engine can mint one, and only after the role table
/// granted [`Capability::Unmask`]. The token is neither `Clone` nor
/// constructible outside this crate.
#[derive(Debug)]
pub struct UnmaskGrant {
    holder: UserId,
    role: Role,
}

impl UnmaskGrant {
    pub(crate) fn issue(role: Role, holder: UserId) -> Option<Self> {
        authorize(role, Capability::Unmask)
            .is_granted()
            .then_some(Self { holder, role })
    }

    /// User the grant was issued to
    pub fn holder(&self) -> UserId {
        self.holder
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_admin_receives_grant() {
        let user = UserId::new();
        let grant = UnmaskGrant::issue(Role::Admin, user).unwrap();
        assert_eq!(grant.holder(), user);
        assert_eq!(grant.role(), Role::Admin);

        assert!(UnmaskGrant::issue(Role::Doctor, user).is_none());
        assert!(UnmaskGrant::issue(Role::Receptionist, user).is_none());
    }
}
