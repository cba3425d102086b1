//! Permission evaluation
//!
//! Decides, per request, whether an actor may perform an action on a
//! resource. The actor is resolved from the bearer token before any policy
//! runs; a missing or invalid token degrades to `Anonymous` rather than
//! erroring, so public read paths keep working without credentials.

use crate::models::{Event, User};

/// What a request wants to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// The resolved identity behind a request
#[derive(Debug, Clone)]
pub enum Actor {
    /// No credential, or a credential that failed verification
    Anonymous,
    /// A verified account
    Authenticated(User),
}

impl Actor {
    /// Whether the actor is a verified account
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Actor::Authenticated(_))
    }

    /// Whether the actor is an authenticated superuser
    pub fn is_superuser(&self) -> bool {
        matches!(self, Actor::Authenticated(user) if user.is_superuser)
    }

    /// The account behind the actor, if any
    pub fn user(&self) -> Option<&User> {
        match self {
            Actor::Authenticated(user) => Some(user),
            Actor::Anonymous => None,
        }
    }
}

/// Ownership capability.
///
/// Types that can be owned by an account expose their owner explicitly;
/// there is no runtime probing of attribute names. A type without an owner
/// returns `None` and is simply denied by owner-based policies.
pub trait HasOwner {
    fn owner_id(&self) -> Option<i64>;
}

impl HasOwner for User {
    fn owner_id(&self) -> Option<i64> {
        Some(self.id)
    }
}

impl HasOwner for Event {
    // Events belong to the community, not to a single account
    fn owner_id(&self) -> Option<i64> {
        None
    }
}

/// Access policies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Read for anyone, including anonymous; write for superusers only
    AnyoneReadSuperuserWrite,
    /// Any access requires an authenticated superuser
    SuperuserOnly,
    /// Object-level: the owner of the object, or a superuser
    OwnerOrSuperuser,
}

impl Policy {
    /// Request-level check
    pub fn allows(&self, actor: &Actor, access: Access) -> bool {
        match self {
            Policy::AnyoneReadSuperuserWrite => {
                access == Access::Read || actor.is_superuser()
            }
            Policy::SuperuserOnly => actor.is_superuser(),
            // Owner policies decide per object; the request-level gate
            // lets the object check run.
            Policy::OwnerOrSuperuser => true,
        }
    }

    /// Object-level check. Never errors: an object without an owner is
    /// denied under owner-based policies.
    pub fn allows_object(&self, actor: &Actor, object: &dyn HasOwner) -> bool {
        match self {
            Policy::AnyoneReadSuperuserWrite => true,
            Policy::SuperuserOnly => actor.is_superuser(),
            Policy::OwnerOrSuperuser => {
                if actor.is_superuser() {
                    return true;
                }
                match (actor.user(), object.owner_id()) {
                    (Some(user), Some(owner_id)) => user.id == owner_id,
                    _ => false,
                }
            }
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn user_strategy() -> impl Strategy<Value = User> {
        (1i64..1000, prop::bool::ANY).prop_map(|(id, is_superuser)| {
            let mut user = User::new(
                format!("user{}", id),
                format!("user{}@example.com", id),
                "hash".to_string(),
                String::new(),
                String::new(),
            );
            user.id = id;
            user.is_superuser = is_superuser;
            user
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Read access on the public policy never depends on the actor
        #[test]
        fn property_anyone_read(user in user_strategy()) {
            let policy = Policy::AnyoneReadSuperuserWrite;
            prop_assert!(policy.allows(&Actor::Authenticated(user), Access::Read));
            prop_assert!(policy.allows(&Actor::Anonymous, Access::Read));
        }

        /// Write access tracks the superuser flag exactly
        #[test]
        fn property_write_requires_superuser(user in user_strategy()) {
            let policy = Policy::AnyoneReadSuperuserWrite;
            let expected = user.is_superuser;
            prop_assert_eq!(
                policy.allows(&Actor::Authenticated(user), Access::Write),
                expected
            );
        }

        /// Owner check is an exact id comparison for non-superusers
        #[test]
        fn property_owner_check(actor in user_strategy(), owner in user_strategy()) {
            let policy = Policy::OwnerOrSuperuser;
            let expected = actor.is_superuser || actor.id == owner.id;
            prop_assert_eq!(
                policy.allows_object(&Actor::Authenticated(actor), &owner),
                expected
            );
        }
    }
}
