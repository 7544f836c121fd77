use crate::constants::{
    BYTES_PER_GB, BYTES_PER_MB, MAX_GB_LIMIT, MIN_GB_LIMIT, STORAGE_WARNING_PERCENT,
};
use crate::error::QuotaError;
use crate::types::User;

/// Storage gauge figures for one account.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageUsage {
    /// Share of the quota in use, capped at 100.
    pub percent: f64,
    /// Used space in GB, two decimals.
    pub used_gb: String,
    /// Quota in GB, two decimals.
    pub max_gb: String,
}

impl StorageUsage {
    pub fn of(user: &User) -> Self {
        let usage = user.storage_usage as f64;
        // a zero quota is treated as one byte so the gauge never divides by zero
        let max = user.max_storage.max(1) as f64;

        Self {
            percent: (usage / max * 100.0).min(100.0),
            used_gb: format!("{:.2}", usage / BYTES_PER_GB),
            max_gb: format!("{:.2}", max / BYTES_PER_GB),
        }
    }

    /// Zero usage for a signed-out session.
    pub fn empty() -> Self {
        Self {
            percent: 0.0,
            used_gb: "0".to_string(),
            max_gb: "1".to_string(),
        }
    }

    pub fn is_nearly_full(&self) -> bool {
        self.percent >= STORAGE_WARNING_PERCENT
    }
}

impl std::fmt::Display for StorageUsage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} GB of {} GB ({:.1}%)",
            self.used_gb, self.max_gb, self.percent
        )
    }
}

/// Parse a quota typed in GB and convert it to bytes.
pub fn parse_quota_gb(input: &str) -> Result<u64, QuotaError> {
    let gb: f64 = input.trim().parse().map_err(|_| QuotaError::NotANumber)?;
    if !gb.is_finite() {
        return Err(QuotaError::NotANumber);
    }
    if gb < MIN_GB_LIMIT {
        return Err(QuotaError::BelowMinimum(MIN_GB_LIMIT));
    }
    if gb > MAX_GB_LIMIT {
        return Err(QuotaError::AboveMaximum(MAX_GB_LIMIT));
    }
    Ok((gb * BYTES_PER_GB).round() as u64)
}

/// Quota in GB with two decimals, as prefilled in the quota editor.
pub fn bytes_to_gb_string(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / BYTES_PER_GB)
}

pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / BYTES_PER_MB)
}
