use time::format_description::{self, OwnedFormatItem};
use time::{Date, OffsetDateTime, Time};

const WIRE_DATE: &str = "[month]-[day]-[year]";
const ACCEPTED_DATES: &[&str] = &[WIRE_DATE, "[year]-[month]-[day]", "[month]/[day]/[year]"];

fn describe(pattern: &str) -> Result<OwnedFormatItem, String> {
    format_description::parse_owned::<2>(pattern)
        .map_err(|err| format!("invalid date pattern '{}': {}", pattern, err))
}

/// Local time, or UTC when the local offset cannot be determined.
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

pub fn today() -> Date {
    now().date()
}

/// Parses `MM-DD-YYYY`, `YYYY-MM-DD`, or `MM/DD/YYYY`.
pub fn parse_date(raw: &str) -> Result<Date, String> {
    let raw = raw.trim();
    for pattern in ACCEPTED_DATES {
        if let Ok(date) = Date::parse(raw, &describe(pattern)?) {
            return Ok(date);
        }
    }
    Err(format!(
        "invalid date '{}' (expected MM-DD-YYYY or YYYY-MM-DD)",
        raw
    ))
}

/// The `MM-DD-YYYY` form the write APIs expect for daily-note locations.
pub fn wire_date(date: Date) -> Result<String, String> {
    date.format(&describe(WIRE_DATE)?)
        .map_err(|err| format!("failed to format date: {}", err))
}

/// Daily-note page title, e.g. "January 2nd, 2026".
pub fn daily_note_title(date: Date) -> String {
    let day = date.day();
    format!(
        "{} {}{}, {}",
        date.month(),
        day,
        ordinal_suffix(day),
        date.year()
    )
}

/// Title for a `MM-DD-YYYY` daily-note date.
pub fn title_for_wire_date(raw: &str) -> Result<String, String> {
    let date = Date::parse(raw.trim(), &describe(WIRE_DATE)?).map_err(|err| {
        format!(
            "invalid daily note date format (expected MM-DD-YYYY): {}",
            err
        )
    })?;
    Ok(daily_note_title(date))
}

fn ordinal_suffix(day: u8) -> &'static str {
    if (11..=13).contains(&day) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

pub fn start_of_day_millis(at: OffsetDateTime) -> i64 {
    at.replace_time(Time::MIDNIGHT).unix_timestamp() * 1000
}

pub fn start_of_today_millis() -> i64 {
    start_of_day_millis(now())
}
