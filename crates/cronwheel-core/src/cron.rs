//! 5-field cron expression parsing and next-occurrence evaluation.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::error::CoreError;

/// Number of fields in the accepted cron grammar
/// (minute, hour, day-of-month, month, day-of-week).
const CRON_FIELDS: usize = 5;

/// A parsed 5-field cron expression.
///
/// The backing `cron` crate expects a leading seconds field and counts days
/// of week 1-7 from Sunday, so expressions are normalized before parsing: a
/// literal `0` seconds field is prefixed and numeric day-of-week values are
/// shifted from the standard 0-7 convention (0 and 7 both Sunday). Only the
/// standard 5-field grammar is accepted at the boundary; seconds-bearing
/// input is rejected so stored expressions stay in one canonical shape.
#[derive(Debug, Clone)]
pub struct CronExpr {
    expr: String,
    schedule: Schedule,
}

impl CronExpr {
    /// Parse a 5-field cron expression.
    pub fn parse(expr: &str) -> Result<Self, CoreError> {
        let expr = expr.trim();
        let fields: Vec<&str> = expr.split_whitespace().collect();

        if fields.len() != CRON_FIELDS {
            return Err(CoreError::InvalidExpression {
                expr: expr.to_string(),
                reason: format!("expected {} fields, found {}", CRON_FIELDS, fields.len()),
            });
        }

        let invalid = |reason: String| CoreError::InvalidExpression {
            expr: expr.to_string(),
            reason,
        };

        let dow = normalize_day_of_week(fields[4]).map_err(invalid)?;
        let normalized = format!(
            "0 {} {} {} {} {}",
            fields[0], fields[1], fields[2], fields[3], dow
        );

        let schedule = Schedule::from_str(&normalized).map_err(|e| CoreError::InvalidExpression {
            expr: expr.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            expr: expr.to_string(),
            schedule,
        })
    }

    /// The original 5-field expression.
    pub fn as_str(&self) -> &str {
        &self.expr
    }

    /// Next occurrence strictly after `anchor`, if the schedule has one.
    pub fn next_after(&self, anchor: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&anchor).next()
    }
}

/// Validate an expression against the 5-field cron grammar.
///
/// Used at job definition write time so malformed input is rejected before
/// persistence, never at scheduling time.
pub fn validate(expr: &str) -> Result<(), CoreError> {
    CronExpr::parse(expr).map(|_| ())
}

/// Rewrite a standard day-of-week field (0-7, Sunday twice) into the backing
/// crate's 1-7 convention. Numeric values and ranges are enumerated into
/// explicit day lists so a range ending on 7 (Sunday) stays valid instead of
/// wrapping into a reversed range; names and wildcards pass through untouched.
fn normalize_day_of_week(field: &str) -> Result<String, String> {
    let mut parts = Vec::new();
    for part in field.split(',') {
        let (body, step) = match part.split_once('/') {
            Some((body, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| format!("invalid day-of-week step '{}'", step))?;
                if step == 0 {
                    return Err("day-of-week step must be positive".to_string());
                }
                (body, step)
            }
            None => (part, 1),
        };

        let bounds = match body.split_once('-') {
            Some((lo, hi)) => match (parse_dow(lo)?, parse_dow(hi)?) {
                (Some(lo), Some(hi)) if lo <= hi => Some((lo, hi)),
                (Some(lo), Some(hi)) => {
                    return Err(format!("day-of-week range {}-{} is reversed", lo, hi));
                }
                // Named ranges keep the crate's own numbering.
                _ => None,
            },
            None => match parse_dow(body)? {
                // A bare value with a step runs to the end of the week.
                Some(n) if part.contains('/') => Some((n, 7)),
                Some(n) => Some((n, n)),
                None => None,
            },
        };

        match bounds {
            Some((lo, hi)) => {
                // 0 and 7 both mean Sunday, so 0-7 folds to seven days.
                let mut days: Vec<u32> = (lo..=hi)
                    .step_by(step as usize)
                    .map(|d| (d % 7) + 1)
                    .collect();
                days.sort_unstable();
                days.dedup();
                parts.push(
                    days.iter()
                        .map(|d| d.to_string())
                        .collect::<Vec<_>>()
                        .join(","),
                );
            }
            None => parts.push(part.to_string()),
        }
    }
    Ok(parts.join(","))
}

fn parse_dow(token: &str) -> Result<Option<u32>, String> {
    match token.parse::<u32>() {
        Ok(n) if n <= 7 => Ok(Some(n)),
        Ok(n) => Err(format!("day-of-week value {} out of range", n)),
        Err(_) => Ok(None),
    }
}

/// One-shot evaluation: the next occurrence of `expr` strictly after `anchor`.
pub fn next_after(expr: &str, anchor: DateTime<Utc>) -> Result<DateTime<Utc>, CoreError> {
    let parsed = CronExpr::parse(expr)?;
    parsed
        .next_after(anchor)
        .ok_or_else(|| CoreError::PastEndOfSchedule {
            expr: expr.to_string(),
        })
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
