use mediastore_core::{MediaRecord, Permission};
use mediastore_db::PermissionEvaluator;
use std::sync::Arc;

/// Decides whether a caller may act on a record.
///
/// The owner always may. Otherwise a matching user or role entry that lists
/// the permission allows it, and failing that the role evaluator is asked for
/// `media:<permission>`.
#[derive(Clone)]
pub struct AccessControl {
    evaluator: Arc<dyn PermissionEvaluator>,
}

impl AccessControl {
    pub fn new(evaluator: Arc<dyn PermissionEvaluator>) -> Self {
        Self { evaluator }
    }

    pub async fn allows(
        &self,
        record: &MediaRecord,
        user_id: &str,
        user_roles: &[String],
        permission: Permission,
    ) -> bool {
        if record.grants(user_id, user_roles, permission) {
            return true;
        }
        self.role_allows(user_roles, permission).await
    }

    /// Whether the roles alone grant `media:<permission>` on every record.
    pub async fn role_allows(&self, user_roles: &[String], permission: Permission) -> bool {
        self.evaluator
            .has_access(user_roles, &format!("media:{}", permission))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mediastore_core::{AccessEntry, IngestedFile, MediaType, SubjectKind};
    use mediastore_db::RolePermissionEvaluator;
    use std::collections::BTreeMap;

    fn record() -> MediaRecord {
        let mut record = MediaRecord::from(IngestedFile {
            hash: "h".into(),
            media_type: MediaType::Document,
            filename: "a.pdf".into(),
            path: "docs/a.pdf".into(),
            url: "/files/docs/original/a-h.pdf".into(),
            mime_type: "application/pdf".into(),
            size: 3,
            dimensions: None,
            variants: BTreeMap::new(),
            owner: "alice".into(),
            ingested_at: Utc::now(),
        });
        record.set_access(vec![AccessEntry {
            subject_id: "reviewers".into(),
            subject_kind: SubjectKind::Role,
            permissions: vec![Permission::Read],
        }]);
        record
    }

    fn roles(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_owner_entries_then_evaluator() {
        let access = AccessControl::new(Arc::new(
            RolePermissionEvaluator::new().grant("admin", "media:*"),
        ));
        let record = record();

        assert!(access.allows(&record, "alice", &[], Permission::Delete).await);
        assert!(
            access
                .allows(&record, "bob", &roles(&["reviewers"]), Permission::Read)
                .await
        );
        assert!(
            !access
                .allows(&record, "bob", &roles(&["reviewers"]), Permission::Write)
                .await
        );
        assert!(
            access
                .allows(&record, "carol", &roles(&["admin"]), Permission::Delete)
                .await
        );
        assert!(!access.allows(&record, "dave", &[], Permission::Read).await);
    }
}
