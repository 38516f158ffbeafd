use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::access::{AccessEntry, Permission};

/// Media type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaType {
    Image,
    Document,
    Audio,
    Video,
    RemoteVideo,
}

impl MediaType {
    /// Derive the media type of an uploaded file from its MIME type.
    ///
    /// Returns `None` for anything that is not an image, video, audio or PDF.
    /// Remote videos are never derived from a MIME type.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let normalized = mime_type
            .split(';')
            .next()
            .unwrap_or(mime_type)
            .trim()
            .to_lowercase();

        if normalized == "application/pdf" {
            return Some(MediaType::Document);
        }
        match normalized.split_once('/') {
            Some(("image", sub)) if !sub.is_empty() => Some(MediaType::Image),
            Some(("video", sub)) if !sub.is_empty() => Some(MediaType::Video),
            Some(("audio", sub)) if !sub.is_empty() => Some(MediaType::Audio),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Document => "document",
            MediaType::Audio => "audio",
            MediaType::Video => "video",
            MediaType::RemoteVideo => "remoteVideo",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaStatus {
    #[default]
    Active,
    Trashed,
}

/// A resized or re-encoded derivative of an original image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub size: u64,
    pub mime_type: String,
}

/// Append-only history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub version: u32,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

/// The persisted unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    /// Assigned by the metadata store on insert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub hash: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub filename: String,
    /// Logical location: `<folder>/<filename>`.
    pub path: String,
    pub url: String,
    pub mime_type: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<BTreeMap<String, Variant>>,
    pub owner: String,
    pub access: Vec<AccessEntry>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: MediaStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default)]
    pub versions: Vec<VersionEntry>,
}

impl MediaRecord {
    pub fn is_trashed(&self) -> bool {
        self.status == MediaStatus::Trashed
    }

    /// Folder of the record: `path` minus its last segment.
    pub fn folder(&self) -> &str {
        let trimmed = self.path.trim_end_matches('/');
        match trimmed.rsplit_once('/') {
            Some((parent, _)) => parent,
            None => "",
        }
    }

    /// Whether `user_id` (with `user_roles`) is granted `permission` by the
    /// record itself: owner, or an explicit user/role entry.
    pub fn grants(&self, user_id: &str, user_roles: &[String], permission: Permission) -> bool {
        if self.owner == user_id {
            return true;
        }
        self.access
            .iter()
            .any(|entry| entry.applies_to(user_id, user_roles) && entry.grants(permission))
    }

    /// Replace the access list, keeping a full entry for the owner.
    pub fn set_access(&mut self, entries: Vec<AccessEntry>) {
        let owner = self.owner.clone();
        let mut access = vec![AccessEntry::owner(owner.clone())];
        access.extend(
            entries
                .into_iter()
                .filter(|e| !(e.subject_kind == super::SubjectKind::User && e.subject_id == owner)),
        );
        self.access = access;
    }

    /// Next version number for the append-only history.
    pub fn next_version(&self) -> u32 {
        self.versions.iter().map(|v| v.version).max().unwrap_or(0) + 1
    }

    /// Every storage URL owned by this record: the current original, its
    /// variants and the originals of earlier versions. No duplicates.
    pub fn owned_urls(&self) -> Vec<&str> {
        let mut urls = vec![self.url.as_str()];
        let variants = self
            .variants
            .iter()
            .flat_map(|variants| variants.values().map(|v| v.url.as_str()));
        for url in variants.chain(self.versions.iter().map(|v| v.url.as_str())) {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        urls
    }
}

/// Everything known about an upload once its bytes are durably stored.
///
/// Converted into the persisted [`MediaRecord`] through `From`, so every
/// field's provenance is explicit.
#[derive(Debug, Clone)]
pub struct IngestedFile {
    pub hash: String,
    pub media_type: MediaType,
    pub filename: String,
    pub path: String,
    pub url: String,
    pub mime_type: String,
    pub size: u64,
    pub dimensions: Option<(u32, u32)>,
    pub variants: BTreeMap<String, Variant>,
    pub owner: String,
    pub ingested_at: DateTime<Utc>,
}

impl From<IngestedFile> for MediaRecord {
    fn from(file: IngestedFile) -> Self {
        let variants = if file.media_type == MediaType::Image {
            Some(file.variants)
        } else {
            None
        };

        MediaRecord {
            id: None,
            hash: file.hash,
            media_type: file.media_type,
            filename: file.filename,
            path: file.path,
            url: file.url.clone(),
            mime_type: file.mime_type,
            size: file.size,
            width: file.dimensions.map(|(w, _)| w),
            height: file.dimensions.map(|(_, h)| h),
            variants,
            owner: file.owner.clone(),
            access: vec![AccessEntry::owner(file.owner.clone())],
            created_at: file.ingested_at,
            updated_at: None,
            deleted_at: None,
            status: MediaStatus::Active,
            provider: None,
            external_id: None,
            versions: vec![VersionEntry {
                version: 1,
                url: file.url,
                created_at: file.ingested_at,
                created_by: file.owner,
            }],
        }
    }
}

/// A fetched external asset, persisted by reference.
#[derive(Debug, Clone)]
pub struct RemoteAsset {
    pub hash: String,
    pub filename: String,
    pub source_url: String,
    pub provider: String,
    pub mime_type: String,
    pub size: u64,
    pub owner: String,
    pub fetched_at: DateTime<Utc>,
}

impl From<RemoteAsset> for MediaRecord {
    fn from(asset: RemoteAsset) -> Self {
        MediaRecord {
            id: None,
            hash: asset.hash,
            media_type: MediaType::RemoteVideo,
            path: asset.filename.clone(),
            filename: asset.filename,
            url: asset.source_url.clone(),
            mime_type: asset.mime_type,
            size: asset.size,
            width: None,
            height: None,
            variants: None,
            owner: asset.owner.clone(),
            access: vec![AccessEntry::owner(asset.owner.clone())],
            created_at: asset.fetched_at,
            updated_at: None,
            deleted_at: None,
            status: MediaStatus::Active,
            provider: Some(asset.provider),
            external_id: Some(asset.source_url.clone()),
            versions: vec![VersionEntry {
                version: 1,
                url: asset.source_url,
                created_at: asset.fetched_at,
                created_by: asset.owner,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubjectKind;

    fn ingested(media_type: MediaType) -> IngestedFile {
        let mut variants = BTreeMap::new();
        variants.insert(
            "thumbnail".to_string(),
            Variant {
                url: "/files/uploads/thumbnail/cat-abc.jpg".to_string(),
                width: 200,
                height: 200,
                size: 1234,
                mime_type: "image/jpeg".to_string(),
            },
        );
        IngestedFile {
            hash: "abc".to_string(),
            media_type,
            filename: "cat-abc.jpg".to_string(),
            path: "uploads/cat-abc.jpg".to_string(),
            url: "/files/uploads/original/cat-abc.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            size: 4096,
            dimensions: Some((800, 600)),
            variants,
            owner: "user-1".to_string(),
            ingested_at: Utc::now(),
        }
    }

    #[test]
    fn test_media_type_from_mime() {
        assert_eq!(MediaType::from_mime("image/png"), Some(MediaType::Image));
        assert_eq!(
            MediaType::from_mime("video/mp4; codecs=avc1"),
            Some(MediaType::Video)
        );
        assert_eq!(MediaType::from_mime("audio/mpeg"), Some(MediaType::Audio));
        assert_eq!(
            MediaType::from_mime("application/pdf"),
            Some(MediaType::Document)
        );
        assert_eq!(MediaType::from_mime("application/zip"), None);
        assert_eq!(MediaType::from_mime("image/"), None);
    }

    #[test]
    fn test_media_type_serializes_camel_case() {
        let json = serde_json::to_value(MediaType::RemoteVideo).unwrap();
        assert_eq!(json, "remoteVideo");
    }

    #[test]
    fn test_ingested_image_maps_to_record() {
        let record = MediaRecord::from(ingested(MediaType::Image));
        assert_eq!(record.id, None);
        assert_eq!(record.width, Some(800));
        assert_eq!(record.height, Some(600));
        assert_eq!(record.status, MediaStatus::Active);
        assert!(record.variants.as_ref().unwrap().contains_key("thumbnail"));
        assert!(!record.variants.as_ref().unwrap().contains_key("original"));
        assert!(record.access[0].is_full_owner_entry("user-1"));
        assert_eq!(record.versions.len(), 1);
        assert_eq!(record.versions[0].version, 1);
    }

    #[test]
    fn test_non_image_has_no_variants() {
        let record = MediaRecord::from(ingested(MediaType::Document));
        assert!(record.variants.is_none());
    }

    #[test]
    fn test_record_json_uses_type_key() {
        let record = MediaRecord::from(ingested(MediaType::Image));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["mimeType"], "image/jpeg");
        assert!(json.get("id").is_none());
        assert!(json.get("deletedAt").is_none());
    }

    #[test]
    fn test_folder_strips_last_segment() {
        let record = MediaRecord::from(ingested(MediaType::Image));
        assert_eq!(record.folder(), "uploads");
    }

    #[test]
    fn test_set_access_keeps_owner() {
        let mut record = MediaRecord::from(ingested(MediaType::Image));
        record.set_access(vec![
            AccessEntry {
                subject_id: "user-1".to_string(),
                subject_kind: SubjectKind::User,
                permissions: vec![Permission::Read],
            },
            AccessEntry {
                subject_id: "editor".to_string(),
                subject_kind: SubjectKind::Role,
                permissions: vec![Permission::Read, Permission::Write],
            },
        ]);
        assert_eq!(record.access.len(), 2);
        assert!(record.access[0].is_full_owner_entry("user-1"));
        assert!(record.grants("someone", &["editor".to_string()], Permission::Write));
        assert!(!record.grants("someone", &["editor".to_string()], Permission::Delete));
    }

    #[test]
    fn test_owned_urls_include_earlier_versions_once() {
        let mut record = MediaRecord::from(ingested(MediaType::Image));
        record.versions.push(VersionEntry {
            version: 2,
            url: "/files/uploads/original/cat-def.jpg".to_string(),
            created_at: Utc::now(),
            created_by: "user-1".to_string(),
        });
        record.url = "/files/uploads/original/cat-def.jpg".to_string();

        assert_eq!(
            record.owned_urls(),
            vec![
                "/files/uploads/original/cat-def.jpg",
                "/files/uploads/thumbnail/cat-abc.jpg",
                "/files/uploads/original/cat-abc.jpg",
            ]
        );
    }

    #[test]
    fn test_remote_asset_maps_to_remote_video() {
        let record = MediaRecord::from(RemoteAsset {
            hash: "h".to_string(),
            filename: "clip.mp4".to_string(),
            source_url: "https://videos.example.com/clip.mp4".to_string(),
            provider: "videos.example.com".to_string(),
            mime_type: "video/mp4".to_string(),
            size: 10,
            owner: "u".to_string(),
            fetched_at: Utc::now(),
        });
        assert_eq!(record.media_type, MediaType::RemoteVideo);
        assert_eq!(record.provider.as_deref(), Some("videos.example.com"));
        assert_eq!(
            record.external_id.as_deref(),
            Some("https://videos.example.com/clip.mp4")
        );
    }
}
