use chrono::{DateTime, Datelike, Duration, Utc};
use mediastore_core::MediaRecord;
use serde::Serialize;

use super::breakdown::StorageBreakdown;

const MB: u64 = 1024 * 1024;
const LARGE_FILE_BYTES: u64 = 10 * MB;
const ARCHIVE_AGE_DAYS: i64 = 365;
const UNUSED_AGE_DAYS: i64 = 90;
const UNUSED_MIN_COUNT: usize = 10;
const DOMINANT_TYPE_PERCENT: f64 = 70.0;
const GROWTH_RATIO: f64 = 1.5;
const RECENT_MONTHS: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InsightKind {
    LargeFiles,
    ArchiveCandidates,
    TypeDominance,
    GrowthAccelerating,
    PotentiallyUnused,
    GoodEfficiency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Info,
    Success,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub kind: InsightKind,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub affected_ids: Vec<String>,
}

fn mb(bytes: u64) -> f64 {
    bytes as f64 / MB as f64
}

fn ids<'a>(records: impl Iterator<Item = &'a MediaRecord>) -> Vec<String> {
    records.filter_map(|r| r.id.clone()).collect()
}

/// `YYYY-MM` of the first month counted as recent: the month of `now` and the
/// two before it.
fn recent_cutoff(now: DateTime<Utc>) -> String {
    let mut year = now.year();
    let mut month = now.month() as i32 - (RECENT_MONTHS - 1);
    if month < 1 {
        month += 12;
        year -= 1;
    }
    format!("{:04}-{:02}", year, month)
}

fn large_files(records: &[MediaRecord]) -> Option<Insight> {
    let large: Vec<&MediaRecord> = records.iter().filter(|r| r.size > LARGE_FILE_BYTES).collect();
    if large.is_empty() {
        return None;
    }
    let total: u64 = large.iter().map(|r| r.size).sum();
    Some(Insight {
        kind: InsightKind::LargeFiles,
        severity: Severity::Warning,
        title: "Large files detected".to_string(),
        description: format!(
            "{} files are larger than 10 MB and use {:.1} MB in total",
            large.len(),
            mb(total)
        ),
        affected_ids: ids(large.into_iter()),
    })
}

fn archive_candidates(records: &[MediaRecord], now: DateTime<Utc>) -> Option<Insight> {
    let cutoff = now - Duration::days(ARCHIVE_AGE_DAYS);
    let old: Vec<&MediaRecord> = records.iter().filter(|r| r.created_at < cutoff).collect();
    if old.is_empty() {
        return None;
    }
    let total: u64 = old.iter().map(|r| r.size).sum();
    Some(Insight {
        kind: InsightKind::ArchiveCandidates,
        severity: Severity::Info,
        title: "Archive candidates".to_string(),
        description: format!(
            "{} files older than one year use {:.1} MB and could be archived",
            old.len(),
            mb(total)
        ),
        affected_ids: ids(old.into_iter()),
    })
}

fn type_dominance(breakdown: &StorageBreakdown) -> Option<Insight> {
    let (media_type, bucket) = breakdown
        .by_type
        .iter()
        .find(|(_, b)| b.percentage > DOMINANT_TYPE_PERCENT)?;
    Some(Insight {
        kind: InsightKind::TypeDominance,
        severity: Severity::Info,
        title: "Storage dominated by one type".to_string(),
        description: format!(
            "{} files account for {:.1}% of storage ({} files, {:.1} MB)",
            media_type,
            bucket.percentage,
            bucket.count,
            mb(bucket.size)
        ),
        affected_ids: Vec::new(),
    })
}

fn growth(breakdown: &StorageBreakdown, now: DateTime<Utc>) -> Option<Insight> {
    let cutoff = recent_cutoff(now);
    let (recent, earlier): (Vec<u64>, Vec<u64>) = {
        let mut recent = Vec::new();
        let mut earlier = Vec::new();
        for (month, bucket) in &breakdown.by_month {
            if month.as_str() >= cutoff.as_str() {
                recent.push(bucket.size);
            } else {
                earlier.push(bucket.size);
            }
        }
        (recent, earlier)
    };
    if recent.is_empty() || earlier.is_empty() {
        return None;
    }

    let recent_avg = recent.iter().sum::<u64>() as f64 / recent.len() as f64;
    let earlier_avg = earlier.iter().sum::<u64>() as f64 / earlier.len() as f64;
    if earlier_avg <= 0.0 || recent_avg <= earlier_avg * GROWTH_RATIO {
        return None;
    }

    Some(Insight {
        kind: InsightKind::GrowthAccelerating,
        severity: Severity::Warning,
        title: "Storage growth accelerating".to_string(),
        description: format!(
            "The last 3 months averaged {:.1} MB per month, {:.1}x the earlier average of {:.1} MB",
            mb(recent_avg as u64),
            recent_avg / earlier_avg,
            mb(earlier_avg as u64)
        ),
        affected_ids: Vec::new(),
    })
}

fn potentially_unused(records: &[MediaRecord], now: DateTime<Utc>) -> Option<Insight> {
    let cutoff = now - Duration::days(UNUSED_AGE_DAYS);
    let unused: Vec<&MediaRecord> = records
        .iter()
        .filter(|r| r.created_at < cutoff && r.updated_at.is_none())
        .collect();
    if unused.len() <= UNUSED_MIN_COUNT {
        return None;
    }
    Some(Insight {
        kind: InsightKind::PotentiallyUnused,
        severity: Severity::Info,
        title: "Potentially unused files".to_string(),
        description: format!(
            "{} files older than 3 months have never been updated",
            unused.len()
        ),
        affected_ids: ids(unused.into_iter()),
    })
}

fn efficiency(breakdown: &StorageBreakdown, threshold_bytes: u64) -> Option<Insight> {
    if breakdown.total_files == 0 || breakdown.average_file_size >= threshold_bytes as f64 {
        return None;
    }
    Some(Insight {
        kind: InsightKind::GoodEfficiency,
        severity: Severity::Success,
        title: "Good storage efficiency".to_string(),
        description: format!(
            "Average file size is {:.2} MB, below the {:.2} MB target",
            breakdown.average_file_size / MB as f64,
            mb(threshold_bytes)
        ),
        affected_ids: Vec::new(),
    })
}

/// Apply the fixed rule set. Output order is stable: large files, archive
/// candidates, type dominance, growth, unused, efficiency.
pub fn generate_insights(
    records: &[MediaRecord],
    breakdown: &StorageBreakdown,
    now: DateTime<Utc>,
    efficiency_threshold_bytes: u64,
) -> Vec<Insight> {
    [
        large_files(records),
        archive_candidates(records, now),
        type_dominance(breakdown),
        growth(breakdown, now),
        potentially_unused(records, now),
        efficiency(breakdown, efficiency_threshold_bytes),
    ]
    .into_iter()
    .flatten()
    .collect()
}
