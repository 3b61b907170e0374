use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::Document;

pub const TEAM_MEMBER: &str = "teamMember";

/// Selection value the UI uses for "no individual owner".
pub const LAB_STOCK: &str = "lab-stock";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl TeamMember {
    pub fn from_document(doc: &Document) -> Result<Self, StoreError> {
        let mut member: TeamMember = doc.decode()?;
        member.id = doc.id.clone();
        Ok(member)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRef {
    #[serde(rename = "_ref")]
    pub member_id: String,
}

impl MemberRef {
    pub fn new(member_id: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
        }
    }
}

/// Owner picked in the UI: a specific member, or shared lab stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerSelection {
    LabStock,
    Member(String),
}

impl OwnerSelection {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some(LAB_STOCK) => OwnerSelection::LabStock,
            Some(id) => OwnerSelection::Member(id.to_string()),
        }
    }

    pub fn into_ref(self) -> Option<MemberRef> {
        match self {
            OwnerSelection::LabStock => None,
            OwnerSelection::Member(id) => Some(MemberRef::new(id)),
        }
    }
}

/// Who is performing an action, as far as the audit trail is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    User(String),
    Anonymous,
    System,
}

impl Actor {
    pub fn user(display_name: impl Into<String>) -> Self {
        let name = display_name.into();
        if name.trim().is_empty() {
            Actor::Anonymous
        } else {
            Actor::User(name.trim().to_string())
        }
    }

    /// Name recorded in the activity log.
    pub fn activity_name(&self) -> &str {
        match self {
            Actor::User(name) => name,
            Actor::Anonymous => "Unknown",
            Actor::System => "System",
        }
    }

    /// Name stamped on notes.
    pub fn author_name(&self) -> &str {
        match self {
            Actor::User(name) => name,
            Actor::Anonymous => "Guest",
            Actor::System => "System",
        }
    }
}
