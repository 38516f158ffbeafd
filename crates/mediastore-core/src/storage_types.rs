use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage backend kinds
///
/// Selected once when configuration is loaded. The storage crate maps each kind
/// to a concrete backend value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    S3,
    Cdn,
}

impl StorageKind {
    /// Whether this backend lives behind a remote object/CDN service.
    pub fn is_cloud(self) -> bool {
        !matches!(self, StorageKind::Local)
    }
}

impl FromStr for StorageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageKind::Local),
            "s3" | "s3-compatible" => Ok(StorageKind::S3),
            "cdn" | "cdn-media-service" => Ok(StorageKind::Cdn),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageKind::Local => write!(f, "local"),
            StorageKind::S3 => write!(f, "s3"),
            StorageKind::Cdn => write!(f, "cdn"),
        }
    }
}

/// How the trash manager treats a failed removal of the original key.
///
/// `ByBackend` keeps the historical behaviour: the local backend swallows the
/// failure, cloud backends propagate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrashFailurePolicy {
    #[default]
    ByBackend,
    FailFast,
    BestEffort,
}

impl TrashFailurePolicy {
    /// Whether a failure on the given backend kind should be returned to the caller.
    pub fn propagates(self, kind: StorageKind) -> bool {
        match self {
            TrashFailurePolicy::ByBackend => kind.is_cloud(),
            TrashFailurePolicy::FailFast => true,
            TrashFailurePolicy::BestEffort => false,
        }
    }
}

impl FromStr for TrashFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "backend" | "by-backend" => Ok(TrashFailurePolicy::ByBackend),
            "fail-fast" | "failfast" => Ok(TrashFailurePolicy::FailFast),
            "best-effort" | "besteffort" => Ok(TrashFailurePolicy::BestEffort),
            _ => Err(anyhow::anyhow!("Invalid trash failure policy: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trash_policy_by_backend_is_asymmetric() {
        let policy = TrashFailurePolicy::default();
        assert!(!policy.propagates(StorageKind::Local));
        assert!(policy.propagates(StorageKind::S3));
        assert!(policy.propagates(StorageKind::Cdn));
        assert!(TrashFailurePolicy::FailFast.propagates(StorageKind::Local));
        assert!(!TrashFailurePolicy::BestEffort.propagates(StorageKind::Cdn));
        assert_eq!(
            "fail-fast".parse::<TrashFailurePolicy>().unwrap(),
            TrashFailurePolicy::FailFast
        );
    }

    #[test]
    fn test_storage_kind_from_str() {
        assert_eq!("local".parse::<StorageKind>().unwrap(), StorageKind::Local);
        assert_eq!("S3".parse::<StorageKind>().unwrap(), StorageKind::S3);
        assert_eq!(
            "s3-compatible".parse::<StorageKind>().unwrap(),
            StorageKind::S3
        );
        assert_eq!(
            "cdn-media-service".parse::<StorageKind>().unwrap(),
            StorageKind::Cdn
        );
        assert!("nfs".parse::<StorageKind>().is_err());
    }

    #[test]
    fn test_storage_kind_is_cloud() {
        assert!(!StorageKind::Local.is_cloud());
        assert!(StorageKind::S3.is_cloud());
        assert!(StorageKind::Cdn.is_cloud());
    }
}
