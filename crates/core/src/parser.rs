//! Human date specifications for due dates.

use anyhow::{anyhow, Context, Result};
use chrono::{prelude::*, Duration, Months};

const DEFAULT_HOUR: u32 = 9;

/// Parses `now`, `today`, `tomorrow`, `+3d`/`+2w`/`+1m`, weekday names, RFC 3339,
/// `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM` or `HH:MM` (today) into a UTC instant.
/// Day-only forms resolve to 09:00 local time.
pub fn parse_date_spec(spec: &str) -> Result<DateTime<Utc>> {
    let trimmed = spec.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Date specification cannot be empty"));
    }

    let lower = trimmed.to_ascii_lowercase();
    let now_local = Local::now();

    match lower.as_str() {
        "now" => return Ok(now_local.with_timezone(&Utc)),
        "today" => return at_default_hour(now_local.date_naive()),
        "tomorrow" => return at_default_hour(now_local.date_naive() + Duration::days(1)),
        _ => {}
    }

    if lower.starts_with('+') {
        return parse_relative_spec(&lower, now_local);
    }

    if let Some(weekday) = parse_weekday(&lower) {
        let mut days_ahead = (weekday.num_days_from_monday() as i32
            - now_local.weekday().num_days_from_monday() as i32)
            .rem_euclid(7);
        if days_ahead == 0 {
            days_ahead = 7;
        }
        let target = now_local + Duration::days(days_ahead.into());
        return at_default_hour(target.date_naive());
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M") {
        return resolve_local(naive, trimmed);
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return at_default_hour(date);
    }

    if let Ok(time) = NaiveTime::parse_from_str(trimmed, "%H:%M") {
        return resolve_local(now_local.date_naive().and_time(time), trimmed);
    }

    Err(anyhow!(
        "Unrecognized date specification '{}'. Try YYYY-MM-DD, today, tomorrow, +3d, mon",
        spec
    ))
}

fn at_default_hour(date: NaiveDate) -> Result<DateTime<Utc>> {
    let naive = date
        .and_hms_opt(DEFAULT_HOUR, 0, 0)
        .ok_or_else(|| anyhow!("Invalid time of day for {}", date))?;
    resolve_local(naive, &date.to_string())
}

fn resolve_local(naive: NaiveDateTime, spec: &str) -> Result<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("Could not resolve local time for '{}'", spec))
}

fn parse_relative_spec(spec: &str, now_local: DateTime<Local>) -> Result<DateTime<Utc>> {
    let body = spec.strip_prefix('+').unwrap_or(spec);
    let Some((unit_at, unit)) = body.char_indices().last() else {
        return Err(anyhow!("Relative date '{}' is too short", spec));
    };
    let number_part = &body[..unit_at];
    if number_part.is_empty() {
        return Err(anyhow!("Relative date '{}' is too short", spec));
    }
    let value: i64 = number_part.parse().context("Invalid relative offset")?;
    let shifted = match unit {
        'd' => Duration::try_days(value).and_then(|offset| now_local.checked_add_signed(offset)),
        'w' => Duration::try_weeks(value).and_then(|offset| now_local.checked_add_signed(offset)),
        'm' => {
            let months = Months::new(value.try_into()?);
            now_local.checked_add_months(months)
        }
        other => {
            return Err(anyhow!(
                "Unsupported relative unit '{}'. Use d, w, or m.",
                other
            ))
        }
    };
    shifted
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("Relative date '{}' is out of range", spec))
}

fn parse_weekday(label: &str) -> Option<Weekday> {
    match label {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}
