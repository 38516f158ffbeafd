use mediastore_core::MediaRecord;
use serde::Serialize;
use std::collections::BTreeMap;

use super::breakdown::month_key;

/// Trailing months considered by the forecast.
const FORECAST_WINDOW: usize = 6;

/// Fewer points than this give a low-confidence, zero forecast.
const MIN_FORECAST_POINTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrend {
    /// `YYYY-MM`
    pub month: String,
    pub uploads: u64,
    pub size: u64,
    pub cumulative_size: u64,
    /// Percent change of `size` against the previous month.
    pub growth_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoragePrediction {
    pub months_ahead: u32,
    pub predicted_size: u64,
    pub predicted_files: u64,
    pub confidence: Confidence,
}

/// One entry per month present in `records`, oldest first.
pub fn calculate_trends(records: &[MediaRecord]) -> Vec<MonthlyTrend> {
    let mut months: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    for record in records {
        let entry = months.entry(month_key(record)).or_default();
        entry.0 += 1;
        entry.1 += record.size;
    }

    let mut trends: Vec<MonthlyTrend> = Vec::with_capacity(months.len());
    let mut cumulative = 0;
    for (month, (uploads, size)) in months {
        cumulative += size;
        let growth_rate = match trends.last() {
            Some(prev) if prev.size > 0 => (size as f64 - prev.size as f64) / prev.size as f64 * 100.0,
            _ => 0.0,
        };
        trends.push(MonthlyTrend {
            month,
            uploads,
            size,
            cumulative_size: cumulative,
            growth_rate,
        });
    }
    trends
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

fn std_dev(values: &[f64]) -> f64 {
    let avg = mean(values.iter().copied());
    mean(values.iter().map(|v| (v - avg).powi(2))).sqrt()
}

/// Linear extrapolation over the trailing six months.
pub fn predict_storage(trends: &[MonthlyTrend], months_ahead: u32) -> StoragePrediction {
    if trends.len() < MIN_FORECAST_POINTS {
        return StoragePrediction {
            months_ahead,
            predicted_size: 0,
            predicted_files: 0,
            confidence: Confidence::Low,
        };
    }

    let window = &trends[trends.len().saturating_sub(FORECAST_WINDOW)..];
    let avg_delta = mean(
        window
            .windows(2)
            .map(|pair| pair[1].cumulative_size as f64 - pair[0].cumulative_size as f64),
    );
    let avg_uploads = mean(window.iter().map(|t| t.uploads as f64));

    let growth_rates: Vec<f64> = window.iter().map(|t| t.growth_rate).collect();
    let deviation = std_dev(&growth_rates);
    let confidence = if deviation < 10.0 {
        Confidence::High
    } else if deviation < 30.0 {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    let last = &trends[trends.len() - 1];
    let total_uploads: u64 = trends.iter().map(|t| t.uploads).sum();
    let months = f64::from(months_ahead);

    StoragePrediction {
        months_ahead,
        predicted_size: (last.cumulative_size as f64 + avg_delta * months).max(0.0).round() as u64,
        predicted_files: (total_uploads as f64 + avg_uploads * months).round() as u64,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::testing::record;
    use mediastore_core::MediaType;

    fn trend(month: &str, uploads: u64, size: u64, cumulative: u64, growth: f64) -> MonthlyTrend {
        MonthlyTrend {
            month: month.to_string(),
            uploads,
            size,
            cumulative_size: cumulative,
            growth_rate: growth,
        }
    }

    #[test]
    fn test_trends_accumulate_per_month() {
        let records = vec![
            record("1", MediaType::Image, "a.jpg", "u", 100, "2024-01-03"),
            record("2", MediaType::Image, "b.jpg", "u", 100, "2024-01-20"),
            record("3", MediaType::Image, "c.jpg", "u", 300, "2024-02-01"),
            record("4", MediaType::Image, "d.jpg", "u", 150, "2024-04-01"),
        ];
        let trends = calculate_trends(&records);

        assert_eq!(trends.len(), 3);
        assert_eq!(trends[0], trend("2024-01", 2, 200, 200, 0.0));
        assert_eq!(trends[1].cumulative_size, 500);
        assert!((trends[1].growth_rate - 50.0).abs() < 1e-9);
        assert_eq!(trends[2].month, "2024-04");
        assert!((trends[2].growth_rate + 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_prediction_needs_three_points() {
        let trends = vec![
            trend("2024-01", 1, 100, 100, 0.0),
            trend("2024-02", 1, 100, 200, 0.0),
        ];
        let prediction = predict_storage(&trends, 3);
        assert_eq!(prediction.confidence, Confidence::Low);
        assert_eq!(prediction.predicted_size, 0);
        assert_eq!(prediction.predicted_files, 0);
    }

    #[test]
    fn test_steady_growth_is_high_confidence() {
        let trends = vec![
            trend("2024-01", 2, 100, 100, 0.0),
            trend("2024-02", 2, 100, 200, 0.0),
            trend("2024-03", 2, 100, 300, 0.0),
            trend("2024-04", 2, 100, 400, 0.0),
        ];
        let prediction = predict_storage(&trends, 2);
        assert_eq!(prediction.confidence, Confidence::High);
        assert_eq!(prediction.predicted_size, 600);
        assert_eq!(prediction.predicted_files, 12);
    }

    #[test]
    fn test_erratic_growth_lowers_confidence() {
        let medium = vec![
            trend("2024-01", 1, 100, 100, 0.0),
            trend("2024-02", 1, 120, 220, 20.0),
            trend("2024-03", 1, 180, 400, 50.0),
        ];
        assert_eq!(predict_storage(&medium, 1).confidence, Confidence::Medium);

        let low = vec![
            trend("2024-01", 1, 100, 100, 0.0),
            trend("2024-02", 1, 300, 400, 200.0),
            trend("2024-03", 1, 150, 550, -50.0),
        ];
        assert_eq!(predict_storage(&low, 1).confidence, Confidence::Low);
    }

    #[test]
    fn test_window_uses_last_six_months() {
        let mut trends = vec![trend("2023-01", 100, 10_000, 10_000, 0.0)];
        let mut cumulative = 10_000;
        for month in 2..=7 {
            cumulative += 10;
            trends.push(trend(&format!("2023-{:02}", month), 1, 10, cumulative, 0.0));
        }
        let prediction = predict_storage(&trends, 1);
        assert_eq!(prediction.predicted_size, cumulative + 10);
        assert_eq!(prediction.predicted_files, 106 + 1);
    }
}
