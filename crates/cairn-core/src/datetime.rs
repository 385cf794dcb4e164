//! Date/time literal parser
//!
//! Accepts month-name dates (`Jan 5, 2024`, `5 January 2024`), ISO dates
//! (`2024-01-05`), US dates (`01/05/24`, `01/05/2024`), bare times
//! (`14:30`, `2pm`), RFC 3339 / RFC 2822 timestamps and `now`. Each
//! human form may carry a time and a trailing zone id (`UTC`, `EST`,
//! `+05:30`, `UTC-8`, `Europe/Paris`). Without a zone the parser's default
//! zone applies, which is the system-local zone unless pinned.

use crate::errors::{RepoError, RepoErrorKind, Result};
use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::LazyLock;

const WEEKDAY: &str = r"(?:(?:mon|tue|wed|thu|fri|sat|sun)[a-z]*\.?,?\s+)?";

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:(?:[Tt]|\s+)(.+))?$").expect("Invalid ISO date regex")
});

static US_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})(?:\s+(.+))?$").expect("Invalid US date regex")
});

static MONTH_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^{}([a-z]{{3,9}})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})(?:,?\s+(.+))?$",
        WEEKDAY
    ))
    .expect("Invalid month-first regex")
});

static DAY_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^{}(\d{{1,2}})(?:st|nd|rd|th)?\s+([a-z]{{3,9}})\.?,?\s+(\d{{4}})(?:,?\s+(.+))?$",
        WEEKDAY
    ))
    .expect("Invalid day-first regex")
});

static TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,2})(?::(\d{2}))?(?::(\d{2})(?:\.(\d{1,9}))?)?\s*(?:([ap])\.?m\.?)?$")
        .expect("Invalid time regex")
});

static NUMERIC_ZONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:UTC|GMT)?([+-])(\d{1,2})(?::?(\d{2}))?$").expect("Invalid zone regex")
});

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Zone applied when the literal names none
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zone {
    #[default]
    Local,
    Fixed(FixedOffset),
    /// IANA zone; the offset follows its daylight-saving rules
    Named(Tz),
}

/// Configurable date/time parser
///
/// ```
/// use cairn_core::datetime::DateParser;
/// use chrono::{TimeZone, Utc};
///
/// let parser = DateParser::new().with_utc();
/// let t = parser.parse("2024-01-05 10:30").unwrap();
/// assert_eq!(t, Utc.with_ymd_and_hms(2024, 1, 5, 10, 30, 0).unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DateParser {
    now: Option<DateTime<Utc>>,
    zone: Zone,
}

impl DateParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the instant `now` resolves to (and the date bare times use)
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn with_zone(mut self, offset: FixedOffset) -> Self {
        self.zone = Zone::Fixed(offset);
        self
    }

    pub fn with_named_zone(mut self, tz: Tz) -> Self {
        self.zone = Zone::Named(tz);
        self
    }

    pub fn with_utc(self) -> Self {
        self.with_zone(Utc.fix())
    }

    /// Parse a literal whose context requires a valid instant
    ///
    /// # Errors
    ///
    /// Returns a Parser error when no recognized format matches.
    pub fn parse(&self, text: &str) -> Result<DateTime<Utc>> {
        self.probe(text).ok_or_else(|| {
            RepoError::new(RepoErrorKind::Parser)
                .with_op("parse_instant")
                .with_message(format!("'{}' is not a recognizable date/time", text.trim()))
        })
    }

    /// Parse if possible; used where a failed parse is an answer, not an error
    pub fn probe(&self, text: &str) -> Option<DateTime<Utc>> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if text.eq_ignore_ascii_case("now") {
            return Some(self.now());
        }
        if let Ok(t) = DateTime::parse_from_rfc3339(text) {
            return Some(t.with_timezone(&Utc));
        }
        if let Ok(t) = DateTime::parse_from_rfc2822(text) {
            return Some(t.with_timezone(&Utc));
        }

        let (body, zone) = match text.rsplit_once(char::is_whitespace) {
            Some((head, last)) => match zone_from_id(last) {
                Some(zone) => (head.trim_end(), zone),
                None => (text, self.zone),
            },
            None => (text, self.zone),
        };

        let naive = self.naive(body, zone)?;
        localize(naive, zone)
    }

    fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    fn today(&self, zone: Zone) -> NaiveDate {
        let now = self.now();
        match zone {
            Zone::Local => now.with_timezone(&Local).date_naive(),
            Zone::Fixed(offset) => now.with_timezone(&offset).date_naive(),
            Zone::Named(tz) => now.with_timezone(&tz).date_naive(),
        }
    }

    fn naive(&self, body: &str, zone: Zone) -> Option<NaiveDateTime> {
        if let Some(c) = ISO_DATE.captures(body) {
            let date = NaiveDate::from_ymd_opt(
                c[1].parse().ok()?,
                c[2].parse().ok()?,
                c[3].parse().ok()?,
            )?;
            return with_time(date, c.get(4).map(|m| m.as_str()));
        }
        if let Some(c) = US_DATE.captures(body) {
            let date = NaiveDate::from_ymd_opt(
                expand_year(&c[3])?,
                c[1].parse().ok()?,
                c[2].parse().ok()?,
            )?;
            return with_time(date, c.get(4).map(|m| m.as_str()));
        }
        if let Some(c) = MONTH_FIRST.captures(body) {
            let date = NaiveDate::from_ymd_opt(
                c[3].parse().ok()?,
                month_number(&c[1])?,
                c[2].parse().ok()?,
            )?;
            return with_time(date, c.get(4).map(|m| m.as_str()));
        }
        if let Some(c) = DAY_FIRST.captures(body) {
            let date = NaiveDate::from_ymd_opt(
                c[3].parse().ok()?,
                month_number(&c[2])?,
                c[1].parse().ok()?,
            )?;
            return with_time(date, c.get(4).map(|m| m.as_str()));
        }
        let time = parse_time(body)?;
        Some(self.today(zone).and_time(time))
    }
}

fn localize(naive: NaiveDateTime, zone: Zone) -> Option<DateTime<Utc>> {
    match zone {
        Zone::Local => Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|t| t.with_timezone(&Utc)),
        Zone::Fixed(offset) => offset
            .from_local_datetime(&naive)
            .single()
            .map(|t| t.with_timezone(&Utc)),
        Zone::Named(tz) => tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|t| t.with_timezone(&Utc)),
    }
}

fn with_time(date: NaiveDate, time: Option<&str>) -> Option<NaiveDateTime> {
    match time {
        Some(text) => Some(date.and_time(parse_time(text.trim())?)),
        None => date.and_hms_opt(0, 0, 0),
    }
}

/// `14:30`, `14:30:05.250`, `2:30 pm`, `2pm`
fn parse_time(text: &str) -> Option<NaiveTime> {
    let c = TIME.captures(text)?;
    let minutes = c.get(2);
    let meridiem = c.get(5).map(|m| m.as_str().to_ascii_lowercase());
    if minutes.is_none() && meridiem.is_none() {
        return None;
    }

    let mut hour: u32 = c[1].parse().ok()?;
    let minute: u32 = minutes.map_or(Ok(0), |m| m.as_str().parse()).ok()?;
    let second: u32 = c.get(3).map_or(Ok(0), |m| m.as_str().parse()).ok()?;
    let nanos: u32 = match c.get(4) {
        Some(m) => format!("{:0<9}", m.as_str()).parse().ok()?,
        None => 0,
    };

    if let Some(m) = meridiem {
        if hour == 0 || hour > 12 {
            return None;
        }
        hour = match (m.as_str(), hour) {
            ("a", 12) => 0,
            ("p", 12) => 12,
            ("p", h) => h + 12,
            (_, h) => h,
        };
    }

    NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
}

/// Two-digit years pivot at 70
fn expand_year(text: &str) -> Option<i32> {
    let year: i32 = text.parse().ok()?;
    Some(match (text.len(), year) {
        (2, y) if y < 70 => 2000 + y,
        (2, y) => 1900 + y,
        (_, y) => y,
    })
}

fn month_number(name: &str) -> Option<u32> {
    let name = name.to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|m| name.len() >= 3 && m.starts_with(name.as_str()))
        .map(|i| i as u32 + 1)
}

/// Resolve a zone id to a fixed offset
///
/// Understands `UTC`/`GMT`/`UT`/`Z`, numeric offsets with an optional
/// `UTC`/`GMT` prefix and a table of common abbreviations.
pub fn zone_offset(id: &str) -> Option<FixedOffset> {
    let hours = |h: i32, m: i32| FixedOffset::east_opt(h * 3600 + h.signum() * m * 60);
    match id.to_ascii_uppercase().as_str() {
        "UTC" | "GMT" | "UT" | "Z" => return hours(0, 0),
        "EST" => return hours(-5, 0),
        "EDT" | "AST" => return hours(-4, 0),
        "CST" => return hours(-6, 0),
        "CDT" => return hours(-5, 0),
        "MST" => return hours(-7, 0),
        "MDT" => return hours(-6, 0),
        "PST" => return hours(-8, 0),
        "PDT" => return hours(-7, 0),
        "CET" | "BST" => return hours(1, 0),
        "CEST" => return hours(2, 0),
        "IST" => return hours(5, 30),
        "JST" => return hours(9, 0),
        "AEST" => return hours(10, 0),
        _ => {}
    }
    let c = NUMERIC_ZONE.captures(id)?;
    let h: i32 = c[2].parse().ok()?;
    let m: i32 = c.get(3).map_or(Ok(0), |m| m.as_str().parse()).ok()?;
    if h > 14 || m > 59 {
        return None;
    }
    let seconds = h * 3600 + m * 60;
    FixedOffset::east_opt(if &c[1] == "-" { -seconds } else { seconds })
}

/// Resolve a zone id: fixed offsets first, then the IANA database
pub fn zone_from_id(id: &str) -> Option<Zone> {
    if let Some(offset) = zone_offset(id) {
        return Some(Zone::Fixed(offset));
    }
    if !id.contains('/') {
        return None;
    }
    id.parse::<Tz>().ok().map(Zone::Named)
}

/// Parse with the system-local default zone
///
/// # Errors
///
/// Returns a Parser error when no recognized format matches.
pub fn parse_instant(text: &str) -> Result<DateTime<Utc>> {
    DateParser::new().parse(text)
}

/// Non-failing counterpart of [`parse_instant`]
pub fn probe_instant(text: &str) -> Option<DateTime<Utc>> {
    DateParser::new().probe(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn parser() -> DateParser {
        DateParser::new()
            .with_utc()
            .with_now(utc(2024, 6, 15, 9, 0, 0))
    }

    #[test]
    fn test_iso_dates() {
        let p = parser();
        assert_eq!(p.parse("2024-01-05").unwrap(), utc(2024, 1, 5, 0, 0, 0));
        assert_eq!(p.parse("2024-01-05 13:45").unwrap(), utc(2024, 1, 5, 13, 45, 0));
        assert_eq!(
            p.parse("2024-01-05 13:45:10.5").unwrap(),
            utc(2024, 1, 5, 13, 45, 10) + chrono::TimeDelta::milliseconds(500)
        );
    }

    #[test]
    fn test_us_dates_and_year_pivot() {
        let p = parser();
        assert_eq!(p.parse("01/05/24").unwrap(), utc(2024, 1, 5, 0, 0, 0));
        assert_eq!(p.parse("01/05/69").unwrap(), utc(2069, 1, 5, 0, 0, 0));
        assert_eq!(p.parse("01/05/70").unwrap(), utc(1970, 1, 5, 0, 0, 0));
        assert_eq!(p.parse("12/31/1999 11:59 pm").unwrap(), utc(1999, 12, 31, 23, 59, 0));
    }

    #[test]
    fn test_month_names() {
        let p = parser();
        assert_eq!(p.parse("Jan 5, 2024").unwrap(), utc(2024, 1, 5, 0, 0, 0));
        assert_eq!(p.parse("Friday, January 5th 2024").unwrap(), utc(2024, 1, 5, 0, 0, 0));
        assert_eq!(p.parse("5 Sept 2024 10am").unwrap(), utc(2024, 9, 5, 10, 0, 0));
        assert!(p.probe("Smarch 5, 2024").is_none());
    }

    #[test]
    fn test_bare_time_uses_today() {
        let p = parser();
        assert_eq!(p.parse("14:30").unwrap(), utc(2024, 6, 15, 14, 30, 0));
        assert_eq!(p.parse("12am").unwrap(), utc(2024, 6, 15, 0, 0, 0));
    }

    #[test]
    fn test_zone_ids() {
        let p = parser();
        assert_eq!(p.parse("2024-01-05 10:00 EST").unwrap(), utc(2024, 1, 5, 15, 0, 0));
        assert_eq!(p.parse("2024-01-05 10:00 +05:30").unwrap(), utc(2024, 1, 5, 4, 30, 0));
        assert_eq!(p.parse("2024-01-05 10:00 UTC-8").unwrap(), utc(2024, 1, 5, 18, 0, 0));
        assert!(zone_offset("+15").is_none());
        assert!(zone_offset("Mars/Olympus").is_none());
    }

    #[test]
    fn test_iana_zone_ids_follow_daylight_saving() {
        let p = parser();
        assert_eq!(
            p.parse("2024-01-05 10:00 America/New_York").unwrap(),
            utc(2024, 1, 5, 15, 0, 0)
        );
        assert_eq!(
            p.parse("2024-07-05 10:00 America/New_York").unwrap(),
            utc(2024, 7, 5, 14, 0, 0)
        );
        assert_eq!(
            p.parse("Jan 5, 2024 9am Asia/Kolkata").unwrap(),
            utc(2024, 1, 5, 3, 30, 0)
        );
        assert_eq!(
            zone_from_id("Europe/Paris"),
            Some(Zone::Named(chrono_tz::Europe::Paris))
        );
    }

    #[test]
    fn test_unknown_zone_id_is_rejected() {
        let p = parser();
        assert_eq!(zone_from_id("Mars/Olympus"), None);
        assert_eq!(zone_from_id("Tomorrow"), None);
        assert!(p.probe("2024-01-05 10:00 Mars/Olympus").is_none());
        let err = p.parse("2024-01-05 10:00 Mars/Olympus").unwrap_err();
        assert_eq!(err.kind(), RepoErrorKind::Parser);
    }

    #[test]
    fn test_default_named_zone() {
        let p = DateParser::new()
            .with_named_zone(chrono_tz::Europe::Paris)
            .with_now(utc(2024, 6, 15, 9, 0, 0));
        assert_eq!(p.parse("2024-07-01 12:00").unwrap(), utc(2024, 7, 1, 10, 0, 0));
        assert_eq!(p.parse("2024-01-01 12:00").unwrap(), utc(2024, 1, 1, 11, 0, 0));
    }

    #[test]
    fn test_machine_formats_and_now() {
        let p = parser();
        assert_eq!(p.parse("2024-01-05T10:00:00+01:00").unwrap(), utc(2024, 1, 5, 9, 0, 0));
        assert_eq!(
            p.parse("Fri, 05 Jan 2024 10:00:00 GMT").unwrap(),
            utc(2024, 1, 5, 10, 0, 0)
        );
        assert_eq!(p.parse("NOW").unwrap(), utc(2024, 6, 15, 9, 0, 0));
    }

    #[test]
    fn test_rejects_garbage() {
        let p = parser();
        assert!(p.probe("Comedy").is_none());
        assert!(p.probe("").is_none());
        assert!(p.probe("42").is_none());
        assert!(p.probe("2024-02-30").is_none());
        assert!(p.probe("13pm").is_none());
        let err = p.parse("tomorrowish").unwrap_err();
        assert_eq!(err.kind(), RepoErrorKind::Parser);
    }
}
