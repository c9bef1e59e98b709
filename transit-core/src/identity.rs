use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Operator,
    Commuter,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Admin => "admin",
            Role::Operator => "operator",
            Role::Commuter => "commuter",
        })
    }
}

/// Every guarded operation in the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    BookSeat,
    ViewOwnBookings,
    ConfirmPayment,
    CancelBooking,
    ReadNotifications,
    UpdateTripStatus,
    ViewAssignedTrips,
    ManageFleet,
    ManageOperators,
}

impl Capability {
    fn holder(&self) -> &'static str {
        match self {
            Capability::BookSeat
            | Capability::ViewOwnBookings
            | Capability::ConfirmPayment
            | Capability::CancelBooking
            | Capability::ReadNotifications => "Commuter",
            Capability::UpdateTripStatus | Capability::ViewAssignedTrips => "Operator",
            Capability::ManageFleet | Capability::ManageOperators => "Admin",
        }
    }
}

impl Role {
    /// The single policy table for the whole service.
    pub fn permits(&self, capability: Capability) -> bool {
        use Capability::*;
        match self {
            Role::Commuter => matches!(
                capability,
                BookSeat | ViewOwnBookings | ConfirmPayment | CancelBooking | ReadNotifications
            ),
            Role::Operator => matches!(capability, UpdateTripStatus | ViewAssignedTrips),
            // Admins cancel trips through the same status transition operators use.
            Role::Admin => matches!(capability, ManageFleet | ManageOperators | UpdateTripStatus),
        }
    }
}

/// An authenticated caller, as resolved by the identity gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
    pub role: Role,
}

impl Principal {
    pub fn new(subject: impl Into<String>, role: Role) -> Self {
        Self {
            subject: subject.into(),
            role,
        }
    }

    pub fn authorize(&self, capability: Capability) -> CoreResult<()> {
        if self.role.permits(capability) {
            Ok(())
        } else {
            tracing::debug!(subject = %self.subject, role = %self.role, ?capability, "capability denied");
            Err(CoreError::Forbidden(format!(
                "Access denied. {} privileges required.",
                capability.holder()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_table() {
        let rider = Principal::new("rider-1", Role::Commuter);
        assert!(rider.authorize(Capability::BookSeat).is_ok());
        assert!(rider.authorize(Capability::UpdateTripStatus).is_err());

        let operator = Principal::new("op-1", Role::Operator);
        assert!(operator.authorize(Capability::UpdateTripStatus).is_ok());
        assert!(operator.authorize(Capability::BookSeat).is_err());
        assert!(operator.authorize(Capability::ManageFleet).is_err());

        let admin = Principal::new("admin-1", Role::Admin);
        assert!(admin.authorize(Capability::ManageFleet).is_ok());
        assert!(admin.authorize(Capability::UpdateTripStatus).is_ok());
        match admin.authorize(Capability::ConfirmPayment) {
            Err(CoreError::Forbidden(msg)) => {
                assert_eq!(msg, "Access denied. Commuter privileges required.")
            }
            other => panic!("expected forbidden, got {:?}", other),
        }
    }
}
