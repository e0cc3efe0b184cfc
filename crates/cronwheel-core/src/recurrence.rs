//! Frequency-to-cron resolution with per-tenant maintenance offsets.

use sha2::{Digest, Sha256};

use crate::error::CoreError;
use crate::frequency::Frequency;

/// Deterministic per-tenant minute offset in `0..60`.
///
/// Maintenance jobs run at a tenant-specific minute so that many tenants
/// sharing infrastructure do not all fire maintenance work in the same
/// instant. SHA-256 keeps the offset stable across runs, processes and
/// platforms, unlike `DefaultHasher`.
pub fn hourly_offset_minute(tenant_id: &str) -> u32 {
    let digest = Sha256::digest(tenant_id.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % 60) as u32
}

/// Resolve a frequency to a concrete 5-field cron expression.
///
/// `interval_secs` is the continuous (`All`) cadence, rounded down to whole
/// minutes with a floor of one minute. Resolution is pure and idempotent:
/// the same tenant and frequency always yield the same expression, which is
/// what keeps last-execution-based due computation stable.
///
/// `Frequency::Cron` is not resolvable here; the stored override expression
/// is authoritative and the caller must supply it.
pub fn resolve(
    frequency: Frequency,
    tenant_id: &str,
    interval_secs: u64,
) -> Result<String, CoreError> {
    let expr = match frequency {
        Frequency::Yearly | Frequency::Annual => "0 0 1 1 *".to_string(),
        Frequency::Monthly | Frequency::MonthlyLong => "0 0 1 * *".to_string(),
        Frequency::Weekly | Frequency::WeeklyLong => "0 0 * * 0".to_string(),
        Frequency::Daily | Frequency::DailyLong => "0 0 * * *".to_string(),
        Frequency::Hourly | Frequency::HourlyLong => "0 * * * *".to_string(),
        Frequency::HourlyMaintenance => {
            format!("{} * * * *", hourly_offset_minute(tenant_id))
        }
        Frequency::DailyMaintenance => {
            format!("{} 0 * * *", (hourly_offset_minute(tenant_id) + 30) % 60)
        }
        Frequency::All => {
            let minutes = (interval_secs / 60).max(1);
            format!("*/{} * * * *", minutes)
        }
        Frequency::Cron => return Err(CoreError::MissingCronExpression),
    };

    Ok(expr)
}

#[cfg(test)]
#[path = "recurrence_tests.rs"]
mod tests;
