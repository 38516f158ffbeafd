use serde::{Deserialize, Serialize};
use std::fmt;

/// A single permission that can be granted on a media record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
    Delete,
}

impl Permission {
    pub const ALL: [Permission; 3] = [Permission::Read, Permission::Write, Permission::Delete];

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Delete => "delete",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an access entry targets a user or a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    User,
    Role,
}

/// Access entry attached to a media record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessEntry {
    pub subject_id: String,
    pub subject_kind: SubjectKind,
    pub permissions: Vec<Permission>,
}

impl AccessEntry {
    /// Full-permission entry for the record owner.
    pub fn owner(user_id: impl Into<String>) -> Self {
        Self {
            subject_id: user_id.into(),
            subject_kind: SubjectKind::User,
            permissions: Permission::ALL.to_vec(),
        }
    }

    pub fn grants(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Whether this entry applies to the given caller.
    pub fn applies_to(&self, user_id: &str, user_roles: &[String]) -> bool {
        match self.subject_kind {
            SubjectKind::User => self.subject_id == user_id,
            SubjectKind::Role => user_roles.iter().any(|r| r == &self.subject_id),
        }
    }

    pub fn is_full_owner_entry(&self, owner: &str) -> bool {
        self.subject_kind == SubjectKind::User
            && self.subject_id == owner
            && Permission::ALL.iter().all(|p| self.grants(*p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_entry_grants_everything() {
        let entry = AccessEntry::owner("u1");
        assert!(entry.grants(Permission::Read));
        assert!(entry.grants(Permission::Write));
        assert!(entry.grants(Permission::Delete));
        assert!(entry.is_full_owner_entry("u1"));
        assert!(!entry.is_full_owner_entry("u2"));
    }

    #[test]
    fn test_role_entry_applies_to_role_members() {
        let entry = AccessEntry {
            subject_id: "editor".to_string(),
            subject_kind: SubjectKind::Role,
            permissions: vec![Permission::Read],
        };
        assert!(entry.applies_to("anyone", &["editor".to_string()]));
        assert!(!entry.applies_to("anyone", &["viewer".to_string()]));
        assert!(!entry.applies_to("editor", &[]));
    }

    #[test]
    fn test_access_entry_serialization_shape() {
        let json = serde_json::to_value(AccessEntry::owner("u1")).unwrap();
        assert_eq!(json["subjectId"], "u1");
        assert_eq!(json["subjectKind"], "user");
        assert_eq!(json["permissions"][2], "delete");
    }
}
