//! Job frequency taxonomy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// How often a job recurs.
///
/// `Long` variants share the period of their base frequency but are routed to
/// the long-running queue lane; `Maintenance` variants additionally get a
/// deterministic per-tenant minute offset. `All` runs continuously at the
/// configured scheduler interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Frequency {
    All,
    Hourly,
    #[serde(rename = "Hourly Long")]
    HourlyLong,
    #[serde(rename = "Hourly Maintenance")]
    HourlyMaintenance,
    Daily,
    #[serde(rename = "Daily Long")]
    DailyLong,
    #[serde(rename = "Daily Maintenance")]
    DailyMaintenance,
    Weekly,
    #[serde(rename = "Weekly Long")]
    WeeklyLong,
    Monthly,
    #[serde(rename = "Monthly Long")]
    MonthlyLong,
    Cron,
    Yearly,
    Annual,
}

impl Frequency {
    /// Whether jobs of this frequency belong on the long-running queue lane.
    pub fn is_long_running(&self) -> bool {
        matches!(
            self,
            Frequency::HourlyLong
                | Frequency::HourlyMaintenance
                | Frequency::DailyLong
                | Frequency::DailyMaintenance
                | Frequency::WeeklyLong
                | Frequency::MonthlyLong
        )
    }

    /// Whether execution logging is mandatory for this frequency.
    ///
    /// Continuous (`All`) jobs would produce unbounded log volume, so they are
    /// the only frequency allowed to opt out.
    pub fn forces_logging(&self) -> bool {
        !matches!(self, Frequency::All)
    }

    /// Map a declarative event-class key (`hourly`, `daily_long`, `cron`, ...)
    /// to a frequency.
    pub fn from_event_class(class: &str) -> Result<Self, CoreError> {
        let label: String = class
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        label.parse()
    }

    fn label(&self) -> &'static str {
        match self {
            Frequency::All => "All",
            Frequency::Hourly => "Hourly",
            Frequency::HourlyLong => "Hourly Long",
            Frequency::HourlyMaintenance => "Hourly Maintenance",
            Frequency::Daily => "Daily",
            Frequency::DailyLong => "Daily Long",
            Frequency::DailyMaintenance => "Daily Maintenance",
            Frequency::Weekly => "Weekly",
            Frequency::WeeklyLong => "Weekly Long",
            Frequency::Monthly => "Monthly",
            Frequency::MonthlyLong => "Monthly Long",
            Frequency::Cron => "Cron",
            Frequency::Yearly => "Yearly",
            Frequency::Annual => "Annual",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Frequency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "All" => Ok(Frequency::All),
            "Hourly" => Ok(Frequency::Hourly),
            "Hourly Long" => Ok(Frequency::HourlyLong),
            "Hourly Maintenance" => Ok(Frequency::HourlyMaintenance),
            "Daily" => Ok(Frequency::Daily),
            "Daily Long" => Ok(Frequency::DailyLong),
            "Daily Maintenance" => Ok(Frequency::DailyMaintenance),
            "Weekly" => Ok(Frequency::Weekly),
            "Weekly Long" => Ok(Frequency::WeeklyLong),
            "Monthly" => Ok(Frequency::Monthly),
            "Monthly Long" => Ok(Frequency::MonthlyLong),
            "Cron" => Ok(Frequency::Cron),
            "Yearly" => Ok(Frequency::Yearly),
            "Annual" => Ok(Frequency::Annual),
            other => Err(CoreError::UnknownFrequency(other.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "frequency_tests.rs"]
mod tests;
