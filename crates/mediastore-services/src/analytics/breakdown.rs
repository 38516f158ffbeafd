use mediastore_core::MediaRecord;
use serde::Serialize;
use std::collections::BTreeMap;

/// Folder label used for records stored at the root.
pub const ROOT_FOLDER: &str = "/";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BucketStats {
    pub count: u64,
    pub size: u64,
    /// Share of the total size, 0 to 100.
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageBreakdown {
    pub total_files: u64,
    pub total_size: u64,
    pub average_file_size: f64,
    pub by_type: BTreeMap<String, BucketStats>,
    pub by_folder: BTreeMap<String, BucketStats>,
    pub by_owner: BTreeMap<String, BucketStats>,
    /// Keyed `YYYY-MM` of `createdAt`.
    pub by_month: BTreeMap<String, BucketStats>,
}

pub(crate) fn month_key(record: &MediaRecord) -> String {
    record.created_at.format("%Y-%m").to_string()
}

fn add(buckets: &mut BTreeMap<String, BucketStats>, key: String, size: u64) {
    let bucket = buckets.entry(key).or_default();
    bucket.count += 1;
    bucket.size += size;
}

fn fill_percentages(buckets: &mut BTreeMap<String, BucketStats>, total_size: u64) {
    for bucket in buckets.values_mut() {
        bucket.percentage = if total_size == 0 {
            0.0
        } else {
            bucket.size as f64 * 100.0 / total_size as f64
        };
    }
}

/// Partition records by type, folder, owner and creation month.
pub fn analyze_storage(records: &[MediaRecord]) -> StorageBreakdown {
    let mut breakdown = StorageBreakdown::default();

    for record in records {
        breakdown.total_files += 1;
        breakdown.total_size += record.size;

        let folder = match record.folder() {
            "" => ROOT_FOLDER.to_string(),
            folder => folder.to_string(),
        };
        add(&mut breakdown.by_type, record.media_type.to_string(), record.size);
        add(&mut breakdown.by_folder, folder, record.size);
        add(&mut breakdown.by_owner, record.owner.clone(), record.size);
        add(&mut breakdown.by_month, month_key(record), record.size);
    }

    let total = breakdown.total_size;
    for buckets in [
        &mut breakdown.by_type,
        &mut breakdown.by_folder,
        &mut breakdown.by_owner,
        &mut breakdown.by_month,
    ] {
        fill_percentages(buckets, total);
    }
    if breakdown.total_files > 0 {
        breakdown.average_file_size = total as f64 / breakdown.total_files as f64;
    }

    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::testing::record;
    use mediastore_core::MediaType;

    #[test]
    fn test_breakdown_buckets() {
        let records = vec![
            record("1", MediaType::Image, "pets/cat.jpg", "alice", 300, "2024-01-05"),
            record("2", MediaType::Image, "pets/dog.jpg", "bob", 100, "2024-02-10"),
            record("3", MediaType::Document, "report.pdf", "alice", 600, "2024-02-11"),
        ];
        let breakdown = analyze_storage(&records);

        assert_eq!(breakdown.total_files, 3);
        assert_eq!(breakdown.total_size, 1000);
        assert!((breakdown.average_file_size - 333.333).abs() < 0.01);

        assert_eq!(breakdown.by_type["image"].count, 2);
        assert_eq!(breakdown.by_type["image"].size, 400);
        assert!((breakdown.by_type["image"].percentage - 40.0).abs() < 1e-9);
        assert_eq!(breakdown.by_folder["pets"].count, 2);
        assert_eq!(breakdown.by_folder[ROOT_FOLDER].size, 600);
        assert_eq!(breakdown.by_owner["alice"].size, 900);
        assert_eq!(breakdown.by_month["2024-02"].count, 2);
    }

    #[test]
    fn test_empty_input() {
        let breakdown = analyze_storage(&[]);
        assert_eq!(breakdown.total_files, 0);
        assert_eq!(breakdown.average_file_size, 0.0);
        assert!(breakdown.by_type.is_empty());
    }
}
