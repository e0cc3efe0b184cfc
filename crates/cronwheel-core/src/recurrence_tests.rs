//! Tests for recurrence resolution.

use super::*;
use crate::cron::validate;

#[test]
fn test_fixed_frequency_expressions() {
    let cases = [
        (Frequency::Yearly, "0 0 1 1 *"),
        (Frequency::Annual, "0 0 1 1 *"),
        (Frequency::Monthly, "0 0 1 * *"),
        (Frequency::MonthlyLong, "0 0 1 * *"),
        (Frequency::Weekly, "0 0 * * 0"),
        (Frequency::WeeklyLong, "0 0 * * 0"),
        (Frequency::Daily, "0 0 * * *"),
        (Frequency::DailyLong, "0 0 * * *"),
        (Frequency::Hourly, "0 * * * *"),
        (Frequency::HourlyLong, "0 * * * *"),
    ];
    for (freq, expected) in cases {
        assert_eq!(resolve(freq, "tenant-a", 240).unwrap(), expected);
    }
}

#[test]
fn test_all_frequency_uses_configured_interval() {
    assert_eq!(resolve(Frequency::All, "t", 240).unwrap(), "*/4 * * * *");
    assert_eq!(resolve(Frequency::All, "t", 60).unwrap(), "*/1 * * * *");
    // Sub-minute intervals clamp to one minute instead of producing */0.
    assert_eq!(resolve(Frequency::All, "t", 30).unwrap(), "*/1 * * * *");
    assert_eq!(resolve(Frequency::All, "t", 0).unwrap(), "*/1 * * * *");
}

#[test]
fn test_resolution_is_idempotent() {
    for freq in [
        Frequency::Hourly,
        Frequency::HourlyMaintenance,
        Frequency::DailyMaintenance,
        Frequency::All,
    ] {
        let a = resolve(freq, "tenant-a", 240).unwrap();
        let b = resolve(freq, "tenant-a", 240).unwrap();
        assert_eq!(a, b);
    }
}

#[test]
fn test_maintenance_offset_is_deterministic_and_bounded() {
    let first = hourly_offset_minute("tenant-a");
    let second = hourly_offset_minute("tenant-a");
    assert_eq!(first, second);
    assert!(first < 60);

    // Different tenants generally land on different minutes.
    let offsets: std::collections::HashSet<u32> = (0..50)
        .map(|i| hourly_offset_minute(&format!("tenant-{}", i)))
        .collect();
    assert!(offsets.len() > 1);
}

#[test]
fn test_daily_offset_is_hourly_offset_plus_thirty() {
    for tenant in ["tenant-a", "tenant-b", "some.site.example"] {
        let hourly = hourly_offset_minute(tenant);
        let daily_expr = resolve(Frequency::DailyMaintenance, tenant, 240).unwrap();
        assert_eq!(daily_expr, format!("{} 0 * * *", (hourly + 30) % 60));

        let hourly_expr = resolve(Frequency::HourlyMaintenance, tenant, 240).unwrap();
        assert_eq!(hourly_expr, format!("{} * * * *", hourly));
    }
}

#[test]
fn test_resolved_expressions_are_valid_cron() {
    for freq in [
        Frequency::All,
        Frequency::Hourly,
        Frequency::HourlyMaintenance,
        Frequency::Daily,
        Frequency::DailyMaintenance,
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Yearly,
    ] {
        let expr = resolve(freq, "tenant-a", 240).unwrap();
        assert!(validate(&expr).is_ok(), "'{}' should be valid", expr);
    }
}

#[test]
fn test_cron_frequency_requires_stored_override() {
    assert!(matches!(
        resolve(Frequency::Cron, "tenant-a", 240),
        Err(CoreError::MissingCronExpression)
    ));
}
