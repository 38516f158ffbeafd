use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

/// Role-based permission check consumed by access control.
#[async_trait]
pub trait PermissionEvaluator: Send + Sync {
    /// Whether any of `user_roles` grants `required_permission`
    /// (for example `media:read`).
    async fn has_access(&self, user_roles: &[String], required_permission: &str) -> bool;
}

/// Static role table.
///
/// A grant of `*` matches everything; `media:*` matches every permission in
/// the `media` namespace.
#[derive(Debug, Clone, Default)]
pub struct RolePermissionEvaluator {
    grants: HashMap<String, HashSet<String>>,
}

impl RolePermissionEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, role: &str, permission: &str) -> Self {
        self.grants
            .entry(role.to_string())
            .or_default()
            .insert(permission.to_string());
        self
    }

    fn role_allows(&self, role: &str, required: &str) -> bool {
        let Some(grants) = self.grants.get(role) else {
            return false;
        };
        grants.iter().any(|grant| {
            grant == "*"
                || grant == required
                || grant
                    .strip_suffix(":*")
                    .zip(required.split_once(':'))
                    .is_some_and(|(namespace, (req_ns, _))| namespace == req_ns)
        })
    }
}

#[async_trait]
impl PermissionEvaluator for RolePermissionEvaluator {
    async fn has_access(&self, user_roles: &[String], required_permission: &str) -> bool {
        user_roles
            .iter()
            .any(|role| self.role_allows(role, required_permission))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_exact_and_wildcard_grants() {
        let evaluator = RolePermissionEvaluator::new()
            .grant("viewer", "media:read")
            .grant("editor", "media:*")
            .grant("admin", "*");

        assert!(evaluator.has_access(&roles(&["viewer"]), "media:read").await);
        assert!(!evaluator.has_access(&roles(&["viewer"]), "media:delete").await);
        assert!(evaluator.has_access(&roles(&["editor"]), "media:delete").await);
        assert!(!evaluator.has_access(&roles(&["editor"]), "users:read").await);
        assert!(evaluator.has_access(&roles(&["admin"]), "users:read").await);
        assert!(!evaluator.has_access(&[], "media:read").await);
    }
}
