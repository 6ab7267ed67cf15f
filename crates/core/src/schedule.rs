// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule expressions and recurring triggers
//!
//! EventBridge schedules come as `rate(<n> <unit>)` or as a six-field
//! `cron(...)` expression with a year field and `?` wildcards. Both are
//! translated into a standard five-field [`CronSpec`]
//! (minute hour day-of-month month day-of-week).

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// How far ahead `next_after` searches before giving up
const SEARCH_DAYS: u32 = 5 * 366;

/// Unit of a `rate(...)` expression
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateUnit {
    Minutes,
    Hours,
    Days,
}

/// A parsed, not yet validated, schedule expression
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScheduleExpression {
    Rate { value: u32, unit: RateUnit },
    Cron(String),
}

impl ScheduleExpression {
    pub fn parse(expression: &str) -> Option<Self> {
        let expression = expression.trim();

        if let Some(caps) = rate_regex()?.captures(expression) {
            let value: u32 = caps.get(1)?.as_str().parse().ok()?;
            let unit = caps.get(2)?.as_str().to_ascii_lowercase();
            let unit = if unit.starts_with("minute") {
                RateUnit::Minutes
            } else if unit.starts_with("hour") {
                RateUnit::Hours
            } else if unit.starts_with("day") {
                RateUnit::Days
            } else {
                return None;
            };
            return (value > 0).then_some(ScheduleExpression::Rate { value, unit });
        }

        let inner = expression.strip_prefix("cron(")?.strip_suffix(')')?;
        Some(ScheduleExpression::Cron(inner.trim().to_string()))
    }

    /// The five-field cron form of this expression
    pub fn to_cron(&self) -> Option<CronSpec> {
        match self {
            ScheduleExpression::Rate { value, unit } => {
                let expression = match unit {
                    RateUnit::Minutes => format!("*/{} * * * *", value),
                    RateUnit::Hours => format!("0 */{} * * *", value),
                    RateUnit::Days => format!("0 0 */{} * *", value),
                };
                expression.parse().ok()
            }
            ScheduleExpression::Cron(aws) => {
                let fields: Vec<&str> = aws.split_whitespace().collect();
                // minute hour day-of-month month day-of-week year
                if fields.len() != 6 {
                    return None;
                }
                let standard: Vec<String> = fields[..5].iter().map(|f| f.replace('?', "*")).collect();
                standard.join(" ").parse().ok()
            }
        }
    }
}

fn rate_regex() -> Option<&'static Regex> {
    static RATE: OnceLock<Option<Regex>> = OnceLock::new();
    RATE.get_or_init(|| Regex::new(r"^rate\(\s*(\d+)\s+([A-Za-z]+)\s*\)$").ok())
        .as_ref()
}

/// Translate an EventBridge schedule expression into a recurring trigger.
///
/// Returns `None` for unknown rate units and malformed expressions.
pub fn translate(expression: &str) -> Option<CronSpec> {
    ScheduleExpression::parse(expression)?.to_cron()
}

/// Error from parsing a five-field cron expression
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid cron expression `{expression}`: {reason}")]
pub struct CronParseError {
    pub expression: String,
    pub reason: String,
}

/// A standard five-field cron specification
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CronSpec {
    expression: String,
    minutes: u64,
    hours: u64,
    days_of_month: u64,
    months: u64,
    days_of_week: u64,
    dom_restricted: bool,
    dow_restricted: bool,
}

impl CronSpec {
    pub fn as_str(&self) -> &str {
        &self.expression
    }

    /// The first minute boundary strictly after `after` that matches
    pub fn next_after(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        let start = after.with_second(0)?.with_nanosecond(0)? + Duration::minutes(1);
        let mut date = start.date();

        for day in 0..SEARCH_DAYS {
            if self.matches_date(date) {
                let earliest = if day == 0 {
                    (start.hour(), start.minute())
                } else {
                    (0, 0)
                };
                if let Some((h, m)) = self.first_time_from(earliest) {
                    return date.and_hms_opt(h, m, 0);
                }
            }
            date = date.succ_opt()?;
        }
        None
    }

    fn matches_date(&self, date: NaiveDate) -> bool {
        if !bit(self.months, date.month()) {
            return false;
        }
        let dom = bit(self.days_of_month, date.day());
        let dow = bit(self.days_of_week, date.weekday().num_days_from_sunday());
        // Either day field restricts alone; both restricted means either may match
        if self.dom_restricted && self.dow_restricted {
            dom || dow
        } else {
            dom && dow
        }
    }

    fn first_time_from(&self, (hour, minute): (u32, u32)) -> Option<(u32, u32)> {
        (hour..24)
            .filter(|h| bit(self.hours, *h))
            .flat_map(|h| {
                let from = if h == hour { minute } else { 0 };
                (from..60).map(move |m| (h, m))
            })
            .find(|(_, m)| bit(self.minutes, *m))
    }
}

impl FromStr for CronSpec {
    type Err = CronParseError;

    fn from_str(expression: &str) -> Result<Self, Self::Err> {
        let error = |reason: String| CronParseError {
            expression: expression.to_string(),
            reason,
        };

        let fields: Vec<&str> = expression.split_whitespace().collect();
        let &[minute, hour, dom, month, dow] = fields.as_slice() else {
            return Err(error(format!("expected 5 fields, got {}", fields.len())));
        };

        let minutes = parse_field(minute, 0, 59, &[]).map_err(&error)?;
        let hours = parse_field(hour, 0, 23, &[]).map_err(&error)?;
        let days_of_month = parse_field(dom, 1, 31, &[]).map_err(&error)?;
        let months = parse_field(month, 1, 12, &MONTH_NAMES).map_err(&error)?;
        let mut days_of_week = parse_field(dow, 0, 7, &DAY_NAMES).map_err(&error)?;
        // 7 is an alias for Sunday
        if bit(days_of_week, 7) {
            days_of_week |= 1;
        }

        Ok(Self {
            expression: fields.join(" "),
            minutes,
            hours,
            days_of_month,
            months,
            days_of_week,
            dom_restricted: !dom.starts_with('*'),
            dow_restricted: !dow.starts_with('*'),
        })
    }
}

impl fmt::Display for CronSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)
    }
}

const MONTH_NAMES: [(&str, u32); 12] = [
    ("JAN", 1),
    ("FEB", 2),
    ("MAR", 3),
    ("APR", 4),
    ("MAY", 5),
    ("JUN", 6),
    ("JUL", 7),
    ("AUG", 8),
    ("SEP", 9),
    ("OCT", 10),
    ("NOV", 11),
    ("DEC", 12),
];

const DAY_NAMES: [(&str, u32); 7] = [
    ("SUN", 0),
    ("MON", 1),
    ("TUE", 2),
    ("WED", 3),
    ("THU", 4),
    ("FRI", 5),
    ("SAT", 6),
];

fn bit(mask: u64, n: u32) -> bool {
    mask & (1 << n) != 0
}

/// Parse one field into a bitmask of allowed values
fn parse_field(field: &str, min: u32, max: u32, names: &[(&str, u32)]) -> Result<u64, String> {
    let mut mask = 0u64;
    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| format!("invalid step `{}`", step))?;
                if step == 0 {
                    return Err("step must be positive".to_string());
                }
                (range, step)
            }
            None => (part, 1),
        };

        let (low, high) = if range == "*" {
            (min, max)
        } else if let Some((low, high)) = range.split_once('-') {
            (value(low, min, max, names)?, value(high, min, max, names)?)
        } else {
            let low = value(range, min, max, names)?;
            // `5/15` runs from 5 to the end of the range
            (low, if part.contains('/') { max } else { low })
        };

        if low > high {
            return Err(format!("range `{}` is reversed", range));
        }
        for n in (low..=high).step_by(step as usize) {
            mask |= 1 << n;
        }
    }
    Ok(mask)
}

fn value(token: &str, min: u32, max: u32, names: &[(&str, u32)]) -> Result<u32, String> {
    let upper = token.to_ascii_uppercase();
    let n = match names.iter().find(|(name, _)| *name == upper) {
        Some((_, n)) => *n,
        None => token
            .parse()
            .map_err(|_| format!("invalid value `{}`", token))?,
    };
    if n < min || n > max {
        return Err(format!("value {} outside {}-{}", n, min, max));
    }
    Ok(n)
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
