//! The fixed approver hierarchy, the oversight set and the injected
//! role directory.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::WorkflowError;
use crate::event::EventCategory;

/// Every role known to the workflow.
///
/// The first seven variants form the approval hierarchy in chain order;
/// discriminant = hierarchy index. `Arsw` holds no chain position and only
/// participates in closing and post-approval queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, minicbor::Encode, minicbor::Decode)]
pub enum Role {
    #[n(0)]
    ClubSecretary,
    #[n(1)]
    GeneralSecretary,
    #[n(2)]
    Treasurer,
    #[n(3)]
    President,
    #[n(4)]
    FacultyInCharge,
    #[n(5)]
    AssociateDean,
    #[n(6)]
    Dean,
    #[n(7)]
    Arsw,
}

/// Approval chain order. One `ApprovalStep` per entry, always in this order.
pub const HIERARCHY: [Role; 7] = [
    Role::ClubSecretary,
    Role::GeneralSecretary,
    Role::Treasurer,
    Role::President,
    Role::FacultyInCharge,
    Role::AssociateDean,
    Role::Dean,
];

/// Roles that may close a fully-approved event or query it afterwards.
pub const OVERSIGHT: [Role; 3] = [Role::AssociateDean, Role::Dean, Role::Arsw];

impl Role {
    pub fn hierarchy() -> &'static [Role] {
        &HIERARCHY
    }

    /// Position in the approval chain. `None` for oversight-only roles.
    pub fn hierarchy_index(self) -> Option<usize> {
        match self {
            Role::Arsw => None,
            r => Some(r as usize),
        }
    }

    pub fn is_oversight(self) -> bool {
        OVERSIGHT.contains(&self)
    }

    /// The role that reviews after this one, if any.
    pub fn next_in_chain(self) -> Option<Role> {
        let idx = self.hierarchy_index()?;
        HIERARCHY.get(idx + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::ClubSecretary => "club-secretary",
            Role::GeneralSecretary => "general-secretary",
            Role::Treasurer => "treasurer",
            Role::President => "president",
            Role::FacultyInCharge => "faculty-in-charge",
            Role::AssociateDean => "associate-dean",
            Role::Dean => "dean",
            Role::Arsw => "ARSW",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "club-secretary" => Ok(Role::ClubSecretary),
            "general-secretary" => Ok(Role::GeneralSecretary),
            "treasurer" => Ok(Role::Treasurer),
            "president" => Ok(Role::President),
            "faculty-in-charge" => Ok(Role::FacultyInCharge),
            "associate-dean" => Ok(Role::AssociateDean),
            "dean" => Ok(Role::Dean),
            "ARSW" => Ok(Role::Arsw),
            other => Err(WorkflowError::InvalidRole(other.to_string())),
        }
    }
}

/// Role-to-mailbox lookup, supplied by the embedder at service
/// construction instead of living in a global table.
#[derive(Debug, Clone, Default)]
pub struct RoleDirectory {
    mailboxes: HashMap<Role, String>,
}

impl RoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mailbox(mut self, role: Role, address: impl Into<String>) -> Self {
        self.mailboxes.insert(role, address.into());
        self
    }

    pub fn mailbox(&self, role: Role) -> Option<&str> {
        self.mailboxes.get(&role).map(String::as_str)
    }
}

/// The acting caller as resolved by the identity provider.
///
/// `category` is only meaningful for general-secretary callers, who are
/// split across the three event categories.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: String,
    pub name: String,
    pub role: Role,
    pub category: Option<EventCategory>,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            role,
            category: None,
        }
    }

    pub fn with_category(mut self, category: EventCategory) -> Self {
        self.category = Some(category);
        self
    }
}
