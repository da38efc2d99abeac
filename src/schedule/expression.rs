//! Cron expression parsing and evaluation.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::ScheduleError;

/// Day names in standard cron order (0 = Sunday).
const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// A validated cron schedule bound to a timezone.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: cron::Schedule,
    timezone: Tz,
}

impl CronSchedule {
    /// Parse a cron expression, evaluating its instants in `timezone`.
    pub fn parse(expression: &str, timezone: Tz) -> Result<Self, ScheduleError> {
        let normalized = normalize(expression)?;
        let schedule = cron::Schedule::from_str(&normalized)
            .map_err(|e| invalid(expression, e.to_string()))?;

        Ok(Self {
            expression: expression.trim().to_string(),
            schedule,
            timezone,
        })
    }

    /// Check an expression against the grammar without keeping the result.
    pub fn validate(expression: &str) -> bool {
        Self::parse(expression, Tz::UTC).is_ok()
    }

    /// The expression as written by the job author.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// First matching instant strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule
            .after(&after.with_timezone(&self.timezone))
            .next()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Next matching instant from now.
    pub fn upcoming(&self) -> Option<DateTime<Utc>> {
        self.next_after(Utc::now())
    }
}

/// Resolve an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz, ScheduleError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ScheduleError::UnknownTimezone(name.to_string()))
}

fn invalid(expression: &str, reason: impl Into<String>) -> ScheduleError {
    ScheduleError::InvalidExpression {
        expression: expression.to_string(),
        reason: reason.into(),
    }
}

/// Rewrite a standard cron expression into the seconds-first form the
/// `cron` crate parses. Numeric day-of-week values are replaced by names
/// because the crate numbers days from 1 = Sunday.
fn normalize(expression: &str) -> Result<String, ScheduleError> {
    let trimmed = expression.trim();
    if trimmed.starts_with('@') {
        return Ok(trimmed.to_string());
    }

    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    let (seconds, rest) = match fields.len() {
        5 => ("0", &fields[..]),
        6 => (fields[0], &fields[1..]),
        n => {
            return Err(invalid(
                expression,
                format!("expected 5 or 6 fields, found {n}"),
            ));
        }
    };

    let day_of_week = translate_day_of_week(rest[4]).map_err(|reason| invalid(expression, reason))?;

    Ok(format!(
        "{seconds} {} {} {} {} {day_of_week}",
        rest[0], rest[1], rest[2], rest[3]
    ))
}

/// Expand a day-of-week field into an explicit list of day names.
///
/// Ranges, steps and lists are resolved over 0-7 and folded onto the week,
/// so `1-7/2` yields Mon, Wed, Fri and Sun.
fn translate_day_of_week(field: &str) -> Result<String, String> {
    if field == "*" || field == "?" {
        return Ok(field.to_string());
    }

    let mut days = [false; 7];
    for item in field.split(',') {
        let (base, step) = match item.split_once('/') {
            Some((base, step)) => {
                let step: u8 = step
                    .parse()
                    .map_err(|_| format!("invalid day-of-week step '{step}'"))?;
                if step == 0 {
                    return Err("day-of-week step must be positive".to_string());
                }
                (base, Some(step))
            }
            None => (item, None),
        };

        let (first, last) = match base.split_once('-') {
            _ if base == "*" => (0, 7),
            Some((start, end)) => (day_number(start)?, day_number(end)?),
            None => {
                let day = day_number(base)?;
                // `N/step` runs to the end of the week.
                (day, if step.is_some() { 7 } else { day })
            }
        };
        if first > last {
            return Err(format!("day-of-week range '{base}' runs backwards"));
        }

        for day in (first..=last).step_by(usize::from(step.unwrap_or(1))) {
            days[usize::from(day % 7)] = true;
        }
    }

    if days.iter().all(|d| *d) {
        return Ok("*".to_string());
    }
    let names: Vec<&str> = DAY_NAMES
        .iter()
        .zip(days)
        .filter_map(|(name, set)| set.then_some(*name))
        .collect();
    Ok(names.join(","))
}

/// Parse a day-of-week token, numeric (0-7) or a three-letter name.
fn day_number(token: &str) -> Result<u8, String> {
    if let Ok(n) = token.parse::<u8>() {
        return if n <= 7 {
            Ok(n)
        } else {
            Err(format!("day-of-week value {n} is out of range 0-7"))
        };
    }
    DAY_NAMES
        .iter()
        .position(|name| name.eq_ignore_ascii_case(token))
        .map(|i| i as u8)
        .ok_or_else(|| format!("unknown day-of-week '{token}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn five_field_expression_fires_on_the_minute() {
        let schedule = CronSchedule::parse("0 2 * * *", Tz::UTC).unwrap();
        let next = schedule.next_after(utc(2024, 1, 1, 0, 0, 0)).unwrap();
        assert_eq!(next, utc(2024, 1, 1, 2, 0, 0));
        assert_eq!(schedule.expression(), "0 2 * * *");
    }

    #[test]
    fn weekday_range_uses_standard_numbering() {
        // 2024-01-06 is a Saturday.
        let schedule = CronSchedule::parse("0 9 * * 1-5", Tz::UTC).unwrap();
        let next = schedule.next_after(utc(2024, 1, 6, 0, 0, 0)).unwrap();
        assert_eq!(next, utc(2024, 1, 8, 9, 0, 0));
    }

    #[test]
    fn sunday_is_zero_or_seven() {
        // 2024-01-01 is a Monday.
        for expr in ["0 0 * * 0", "0 0 * * 7"] {
            let schedule = CronSchedule::parse(expr, Tz::UTC).unwrap();
            let next = schedule.next_after(utc(2024, 1, 1, 0, 0, 30)).unwrap();
            assert_eq!(next, utc(2024, 1, 7, 0, 0, 0), "{expr}");
        }
    }

    #[test]
    fn range_ending_at_seven_includes_sunday() {
        let schedule = CronSchedule::parse("0 0 * * 5-7", Tz::UTC).unwrap();
        assert_eq!(
            schedule.next_after(utc(2024, 1, 1, 0, 0, 0)).unwrap(),
            utc(2024, 1, 5, 0, 0, 0)
        );
        assert_eq!(
            schedule.next_after(utc(2024, 1, 6, 0, 0, 30)).unwrap(),
            utc(2024, 1, 7, 0, 0, 0)
        );
    }

    #[test]
    fn translate_day_of_week_keeps_steps_and_names() {
        assert_eq!(translate_day_of_week("*").unwrap(), "*");
        assert_eq!(translate_day_of_week("1,3").unwrap(), "Mon,Wed");
        assert_eq!(translate_day_of_week("1-5/2").unwrap(), "Mon,Wed,Fri");
        assert_eq!(translate_day_of_week("mon-FRI").unwrap(), "Mon,Tue,Wed,Thu,Fri");
        assert_eq!(translate_day_of_week("0-7").unwrap(), "*");
        assert_eq!(translate_day_of_week("*/3").unwrap(), "Sun,Wed,Sat");
        assert!(translate_day_of_week("8").is_err());
        assert!(translate_day_of_week("5-1").is_err());
        assert!(translate_day_of_week("1/0").is_err());
        assert!(translate_day_of_week("Funday").is_err());
    }

    #[test]
    fn stepped_days_reaching_seven_include_sunday() {
        assert_eq!(translate_day_of_week("1-7/2").unwrap(), "Sun,Mon,Wed,Fri");
        assert_eq!(translate_day_of_week("5/2").unwrap(), "Sun,Fri");

        // 2024-01-06 is a Saturday; the next match is Sunday the 7th.
        let schedule = CronSchedule::parse("0 0 * * 1-7/2", Tz::UTC).unwrap();
        assert_eq!(
            schedule.next_after(utc(2024, 1, 6, 0, 0, 30)).unwrap(),
            utc(2024, 1, 7, 0, 0, 0)
        );
        let schedule = CronSchedule::parse("0 0 * * 5/2", Tz::UTC).unwrap();
        assert_eq!(
            schedule.next_after(utc(2024, 1, 6, 0, 0, 30)).unwrap(),
            utc(2024, 1, 7, 0, 0, 0)
        );
    }

    #[test]
    fn timezone_shifts_fire_instant() {
        // Mexico City is UTC-6 with no daylight saving time since 2022.
        let tz = parse_timezone("America/Mexico_City").unwrap();
        let schedule = CronSchedule::parse("0 2 * * *", tz).unwrap();
        let next = schedule.next_after(utc(2024, 1, 1, 0, 0, 0)).unwrap();
        assert_eq!(next, utc(2024, 1, 1, 8, 0, 0));
    }

    #[test]
    fn six_field_expression_with_seconds() {
        assert!(CronSchedule::validate("*/5 * * * * *"));
        let schedule = CronSchedule::parse("30 0 12 * * *", Tz::UTC).unwrap();
        assert_eq!(
            schedule.next_after(utc(2024, 1, 1, 0, 0, 0)).unwrap(),
            utc(2024, 1, 1, 12, 0, 30)
        );
    }

    #[test]
    fn invalid_expressions_rejected() {
        assert!(!CronSchedule::validate("not-a-cron"));
        assert!(!CronSchedule::validate("* * * *"));
        assert!(!CronSchedule::validate("61 * * * *"));
        assert!(!CronSchedule::validate("0 0 * * 8"));
        assert!(!CronSchedule::validate(""));
    }

    #[test]
    fn unknown_timezone_rejected() {
        assert!(parse_timezone("Europe/Madrid").is_ok());
        assert!(matches!(
            parse_timezone("Mars/Olympus"),
            Err(ScheduleError::UnknownTimezone(tz)) if tz == "Mars/Olympus"
        ));
    }
}
