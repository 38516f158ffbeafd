use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaStatus {
    Healthy,
    Warning,
    Critical,
}

impl QuotaStatus {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage < 70.0 {
            QuotaStatus::Healthy
        } else if percentage < 90.0 {
            QuotaStatus::Warning
        } else {
            QuotaStatus::Critical
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaUsage {
    pub used: u64,
    pub available: u64,
    pub quota: u64,
    pub percentage: f64,
    pub status: QuotaStatus,
}

/// Usage of `quota_size` bytes. A zero quota counts as fully used.
pub fn calculate_quota_usage(current_size: u64, quota_size: u64) -> QuotaUsage {
    let percentage = if quota_size == 0 {
        100.0
    } else {
        current_size as f64 * 100.0 / quota_size as f64
    };

    QuotaUsage {
        used: current_size,
        available: quota_size.saturating_sub(current_size),
        quota: quota_size,
        percentage,
        status: QuotaStatus::from_percentage(percentage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_boundaries() {
        assert_eq!(QuotaStatus::from_percentage(0.0), QuotaStatus::Healthy);
        assert_eq!(QuotaStatus::from_percentage(69.9), QuotaStatus::Healthy);
        assert_eq!(QuotaStatus::from_percentage(70.0), QuotaStatus::Warning);
        assert_eq!(QuotaStatus::from_percentage(89.9), QuotaStatus::Warning);
        assert_eq!(QuotaStatus::from_percentage(90.0), QuotaStatus::Critical);
        assert_eq!(QuotaStatus::from_percentage(140.0), QuotaStatus::Critical);
    }

    #[test]
    fn test_usage() {
        let usage = calculate_quota_usage(700, 1000);
        assert_eq!(usage.percentage, 70.0);
        assert_eq!(usage.available, 300);
        assert_eq!(usage.status, QuotaStatus::Warning);

        let over = calculate_quota_usage(1500, 1000);
        assert_eq!(over.available, 0);
        assert_eq!(over.status, QuotaStatus::Critical);

        assert_eq!(calculate_quota_usage(0, 0).status, QuotaStatus::Critical);
    }
}
