//! Storage analytics over metadata records.
//!
//! Everything except [`StorageAnalytics::report`] is a pure function of the
//! records and an explicit `now`, so results are reproducible.

mod breakdown;
mod insights;
mod quota;
mod trends;

pub use breakdown::{analyze_storage, BucketStats, StorageBreakdown};
pub use insights::{generate_insights, Insight, InsightKind, Severity};
pub use quota::{calculate_quota_usage, QuotaStatus, QuotaUsage};
pub use trends::{calculate_trends, predict_storage, Confidence, MonthlyTrend, StoragePrediction};

use chrono::{DateTime, Utc};
use mediastore_core::{AppResult, Config, MediaRecord};
use mediastore_db::MediaRepository;
use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub struct AnalyticsSettings {
    pub efficiency_threshold_bytes: u64,
    pub quota_bytes: u64,
}

impl AnalyticsSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            efficiency_threshold_bytes: config.efficiency_threshold_bytes(),
            quota_bytes: config.storage_quota_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageReport {
    pub generated_at: DateTime<Utc>,
    pub breakdown: StorageBreakdown,
    pub insights: Vec<Insight>,
    pub trends: Vec<MonthlyTrend>,
    pub prediction: StoragePrediction,
    pub quota: QuotaUsage,
}

pub fn build_report(
    records: &[MediaRecord],
    settings: AnalyticsSettings,
    now: DateTime<Utc>,
    months_ahead: u32,
) -> StorageReport {
    let breakdown = analyze_storage(records);
    let insights = generate_insights(records, &breakdown, now, settings.efficiency_threshold_bytes);
    let trends = calculate_trends(records);
    let prediction = predict_storage(&trends, months_ahead);
    let quota = calculate_quota_usage(breakdown.total_size, settings.quota_bytes);

    StorageReport {
        generated_at: now,
        breakdown,
        insights,
        trends,
        prediction,
        quota,
    }
}

/// Loads every record of a collection and reports on it.
#[derive(Clone)]
pub struct StorageAnalytics {
    repository: MediaRepository,
    settings: AnalyticsSettings,
}

impl StorageAnalytics {
    pub fn new(repository: MediaRepository, settings: AnalyticsSettings) -> Self {
        Self {
            repository,
            settings,
        }
    }

    /// Trashed records still occupy storage and are counted.
    #[tracing::instrument(skip(self), fields(collection = %self.repository.collection()))]
    pub async fn report(&self, months_ahead: u32) -> AppResult<StorageReport> {
        let records = self.repository.all().await?;
        tracing::debug!(records = records.len(), "Building storage report");
        Ok(build_report(&records, self.settings, Utc::now(), months_ahead))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::{DateTime, NaiveDate, Utc};
    use mediastore_core::{IngestedFile, MediaRecord, MediaType};
    use std::collections::BTreeMap;

    /// Midnight UTC of a `YYYY-MM-DD` date.
    pub fn at(date: &str) -> DateTime<Utc> {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
    }

    pub fn record(
        id: &str,
        media_type: MediaType,
        path: &str,
        owner: &str,
        size: u64,
        created: &str,
    ) -> MediaRecord {
        let mut record = MediaRecord::from(IngestedFile {
            hash: format!("hash-{}", id),
            media_type,
            filename: path.rsplit('/').next().unwrap_or(path).to_string(),
            path: path.to_string(),
            url: format!("/files/{}", path),
            mime_type: "application/octet-stream".to_string(),
            size,
            dimensions: None,
            variants: BTreeMap::new(),
            owner: owner.to_string(),
            ingested_at: at(created),
        });
        record.id = Some(id.to_string());
        record
    }
}
