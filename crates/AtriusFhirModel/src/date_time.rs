use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

/// Rejected lexical form of a FHIR `date` or `dateTime`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid FHIR {kind} `{text}`: {reason}")]
pub struct DateTimeParseError {
    pub kind: &'static str,
    pub text: String,
    pub reason: &'static str,
}

impl DateTimeParseError {
    fn new(kind: &'static str, text: &str, reason: &'static str) -> Self {
        Self {
            kind,
            text: text.to_string(),
            reason,
        }
    }
}

/// Precision levels for FHIR Date values.
///
/// FHIR dates support partial precision, allowing year-only, year-month,
/// or full date specifications. This enum tracks which components are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatePrecision {
    /// Year only (YYYY)
    Year,
    /// Year and month (YYYY-MM)
    YearMonth,
    /// Full date (YYYY-MM-DD)
    Full,
}

/// Precision levels for FHIR DateTime values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DateTimePrecision {
    Year,
    YearMonth,
    Date,
    /// Time to seconds; FHIR requires a timezone from here on.
    Second,
    /// Time with a fractional second.
    Fraction,
}

/// Precision-aware FHIR Date type.
///
/// The original string is kept so that `2023-03` stays `2023-03` on the way out; the
/// components are validated against the calendar with `chrono`.
///
/// ```rust
/// use atrius_fhir_model::date_time::{DatePrecision, PrecisionDate};
///
/// let date: PrecisionDate = "2023-02".parse().unwrap();
/// assert_eq!(date.precision(), DatePrecision::YearMonth);
/// assert_eq!(date.original_string(), "2023-02");
/// assert!("2023-02-30".parse::<PrecisionDate>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrecisionDate {
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
    precision: DatePrecision,
    original_string: Arc<str>,
}

fn parse_number<T: FromStr>(part: &str, width: usize) -> Option<T> {
    if part.len() != width || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map_or(28, |d| chrono::Datelike::day(&d))
}

impl PrecisionDate {
    pub fn from_year(year: i32) -> Self {
        Self {
            year,
            month: None,
            day: None,
            precision: DatePrecision::Year,
            original_string: Arc::from(format!("{:04}", year)),
        }
    }

    pub fn from_year_month(year: i32, month: u32) -> Self {
        Self {
            year,
            month: Some(month),
            day: None,
            precision: DatePrecision::YearMonth,
            original_string: Arc::from(format!("{:04}-{:02}", year, month)),
        }
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Self {
        Self {
            year,
            month: Some(month),
            day: Some(day),
            precision: DatePrecision::Full,
            original_string: Arc::from(format!("{:04}-{:02}-{:02}", year, month, day)),
        }
    }

    /// Parses a FHIR date string, preserving precision.
    pub fn parse(s: &str) -> Result<Self, DateTimeParseError> {
        let err = |reason| DateTimeParseError::new("date", s, reason);
        let parts: Vec<&str> = s.split('-').collect();
        let year: i32 = parse_number(parts[0], 4).ok_or_else(|| err("expected a four digit year"))?;
        let month: Option<u32> = match parts.get(1) {
            Some(p) => Some(parse_number(p, 2).ok_or_else(|| err("expected a two digit month"))?),
            None => None,
        };
        let day: Option<u32> = match parts.get(2) {
            Some(p) => Some(parse_number(p, 2).ok_or_else(|| err("expected a two digit day"))?),
            None => None,
        };
        if parts.len() > 3 {
            return Err(err("unexpected trailing components"));
        }
        if let Some(m) = month
            && !(1..=12).contains(&m)
        {
            return Err(err("month out of range"));
        }
        if let (Some(m), Some(d)) = (month, day)
            && NaiveDate::from_ymd_opt(year, m, d).is_none()
        {
            return Err(err("day does not exist in that month"));
        }
        let precision = match (month, day) {
            (None, _) => DatePrecision::Year,
            (Some(_), None) => DatePrecision::YearMonth,
            (Some(_), Some(_)) => DatePrecision::Full,
        };
        Ok(Self {
            year,
            month,
            day,
            precision,
            original_string: Arc::from(s),
        })
    }

    pub fn precision(&self) -> DatePrecision {
        self.precision
    }

    pub fn original_string(&self) -> &str {
        &self.original_string
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> Option<u32> {
        self.month
    }

    pub fn day(&self) -> Option<u32> {
        self.day
    }

    /// Earliest instant the value may denote.
    pub fn low_boundary(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month.unwrap_or(1), self.day.unwrap_or(1))
            .map(|d| d.and_time(NaiveTime::MIN))
    }

    /// Latest instant the value may denote.
    pub fn high_boundary(&self) -> Option<NaiveDateTime> {
        let month = self.month.unwrap_or(12);
        let day = self.day.unwrap_or_else(|| days_in_month(self.year, month));
        let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999)?;
        NaiveDate::from_ymd_opt(self.year, month, day).map(|d| d.and_time(end_of_day))
    }
}

impl FromStr for PrecisionDate {
    type Err = DateTimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PrecisionDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original_string)
    }
}

/// Precision-aware FHIR DateTime type.
///
/// Accepts `YYYY`, `YYYY-MM`, `YYYY-MM-DD` and `YYYY-MM-DDThh:mm:ss[.f+](Z|(+|-)hh:mm)`;
/// a time part always carries a timezone.
///
/// ```rust
/// use atrius_fhir_model::date_time::{DateTimePrecision, PrecisionDateTime};
///
/// let dt: PrecisionDateTime = "2024-05-01T10:30:00.250+02:00".parse().unwrap();
/// assert_eq!(dt.precision(), DateTimePrecision::Fraction);
/// assert_eq!(dt.offset_minutes(), Some(120));
/// assert!("2024-05-01T10:30:00".parse::<PrecisionDateTime>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrecisionDateTime {
    date: PrecisionDate,
    time: Option<NaiveTime>,
    offset_minutes: Option<i32>,
    precision: DateTimePrecision,
    original_string: Arc<str>,
}

impl PrecisionDateTime {
    pub fn parse(s: &str) -> Result<Self, DateTimeParseError> {
        let err = |reason| DateTimeParseError::new("dateTime", s, reason);
        let Some((date_part, time_part)) = s.split_once('T') else {
            let date = PrecisionDate::parse(s).map_err(|e| err(e.reason))?;
            let precision = match date.precision() {
                DatePrecision::Year => DateTimePrecision::Year,
                DatePrecision::YearMonth => DateTimePrecision::YearMonth,
                DatePrecision::Full => DateTimePrecision::Date,
            };
            return Ok(Self {
                date,
                time: None,
                offset_minutes: None,
                precision,
                original_string: Arc::from(s),
            });
        };

        let date = PrecisionDate::parse(date_part).map_err(|e| err(e.reason))?;
        if date.precision() != DatePrecision::Full {
            return Err(err("a time requires a full date"));
        }

        let (clock, offset_minutes) = if let Some(clock) = time_part.strip_suffix('Z') {
            (clock, 0)
        } else {
            let split = time_part
                .rfind(['+', '-'])
                .ok_or_else(|| err("a time requires a timezone"))?;
            let (clock, zone) = time_part.split_at(split);
            let sign = if zone.starts_with('-') { -1 } else { 1 };
            let (hh, mm) = zone[1..]
                .split_once(':')
                .ok_or_else(|| err("timezone must be (+|-)hh:mm"))?;
            let hh: i32 = parse_number(hh, 2).ok_or_else(|| err("timezone must be (+|-)hh:mm"))?;
            let mm: i32 = parse_number(mm, 2).ok_or_else(|| err("timezone must be (+|-)hh:mm"))?;
            if hh > 14 || mm > 59 {
                return Err(err("timezone out of range"));
            }
            (clock, sign * (hh * 60 + mm))
        };

        let (hms, fraction) = match clock.split_once('.') {
            Some((hms, fraction)) => (hms, Some(fraction)),
            None => (clock, None),
        };
        let fields: Vec<&str> = hms.split(':').collect();
        if fields.len() != 3 {
            return Err(err("time must be hh:mm:ss"));
        }
        let hour: u32 = parse_number(fields[0], 2).ok_or_else(|| err("invalid hour"))?;
        let minute: u32 = parse_number(fields[1], 2).ok_or_else(|| err("invalid minute"))?;
        let second: u32 = parse_number(fields[2], 2).ok_or_else(|| err("invalid second"))?;
        let nanos = match fraction {
            Some(f) if !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()) => {
                let digits: String = f.chars().chain(std::iter::repeat('0')).take(9).collect();
                digits.parse::<u32>().map_err(|_| err("invalid fraction"))?
            }
            Some(_) => return Err(err("invalid fraction")),
            None => 0,
        };
        let time = NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
            .ok_or_else(|| err("time out of range"))?;

        Ok(Self {
            date,
            time: Some(time),
            offset_minutes: Some(offset_minutes),
            precision: if fraction.is_some() {
                DateTimePrecision::Fraction
            } else {
                DateTimePrecision::Second
            },
            original_string: Arc::from(s),
        })
    }

    pub fn precision(&self) -> DateTimePrecision {
        self.precision
    }

    pub fn original_string(&self) -> &str {
        &self.original_string
    }

    pub fn date(&self) -> &PrecisionDate {
        &self.date
    }

    pub fn time(&self) -> Option<NaiveTime> {
        self.time
    }

    /// Offset from UTC in minutes; `None` when no time is present.
    pub fn offset_minutes(&self) -> Option<i32> {
        self.offset_minutes
    }

    fn to_utc(&self, local: NaiveDateTime) -> NaiveDateTime {
        local - Duration::minutes(i64::from(self.offset_minutes.unwrap_or(0)))
    }

    /// Earliest UTC instant the value may denote. Values without a time are taken as UTC.
    pub fn low_boundary(&self) -> Option<NaiveDateTime> {
        match self.time {
            Some(time) => self.date.low_boundary().map(|d| self.to_utc(d.date().and_time(time))),
            None => self.date.low_boundary(),
        }
    }

    /// Latest UTC instant the value may denote.
    pub fn high_boundary(&self) -> Option<NaiveDateTime> {
        match self.time {
            Some(time) => self.date.low_boundary().map(|d| self.to_utc(d.date().and_time(time))),
            None => self.date.high_boundary(),
        }
    }

    /// Orders two values when their boundaries do not overlap; `None` when indeterminate.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        let (a_low, a_high) = (self.low_boundary()?, self.high_boundary()?);
        let (b_low, b_high) = (other.low_boundary()?, other.high_boundary()?);
        if a_high < b_low {
            Some(Ordering::Less)
        } else if b_high < a_low {
            Some(Ordering::Greater)
        } else if a_low == b_low && a_high == b_high {
            Some(Ordering::Equal)
        } else {
            None
        }
    }
}

impl FromStr for PrecisionDateTime {
    type Err = DateTimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PrecisionDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original_string)
    }
}
