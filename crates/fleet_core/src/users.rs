//! Users as one entity with a role tag plus capability checks.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Driver,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
        }
    }

    pub fn can_create_shipments(&self) -> bool {
        matches!(self.role, Role::Customer | Role::Admin)
    }

    /// The dedicated provisioning flow (the only way a Ship enters the fleet)
    /// is admin-only.
    pub fn can_provision_vehicles(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn can_operate_vehicles(&self) -> bool {
        matches!(self.role, Role::Driver | Role::Admin)
    }
}
