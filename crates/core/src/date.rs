use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared textual date layout of an upload batch.
///
/// `Unknown` never normalizes; transactions stay hidden until the user picks
/// a concrete format for the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFormat {
    Unknown,
    #[serde(rename = "MM-DD-YY")]
    MmDdYy,
    #[serde(rename = "DD-MM-YY")]
    DdMmYy,
    #[serde(rename = "MM/DD/YYYY")]
    MmDdYyyy,
    #[serde(rename = "DD/MM/YYYY")]
    DdMmYyyy,
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateFormat::Unknown => write!(f, "Unknown"),
            DateFormat::MmDdYy => write!(f, "MM-DD-YY"),
            DateFormat::DdMmYy => write!(f, "DD-MM-YY"),
            DateFormat::MmDdYyyy => write!(f, "MM/DD/YYYY"),
            DateFormat::DdMmYyyy => write!(f, "DD/MM/YYYY"),
        }
    }
}

impl DateFormat {
    /// All formats in presentation order, for host pickers.
    pub const ALL: [DateFormat; 5] = [
        DateFormat::Unknown,
        DateFormat::MmDdYy,
        DateFormat::DdMmYy,
        DateFormat::MmDdYyyy,
        DateFormat::DdMmYyyy,
    ];

    fn separator(self) -> Option<char> {
        match self {
            DateFormat::Unknown => None,
            DateFormat::MmDdYy | DateFormat::DdMmYy => Some('-'),
            DateFormat::MmDdYyyy | DateFormat::DdMmYyyy => Some('/'),
        }
    }

    /// Parses a raw textual date under this format.
    ///
    /// Two-digit years land in the 2000s. Month must be 1..=12 and day
    /// 1..=31, with no per-month bound: a day past the end of its month
    /// rolls over into the next one (31 Apr becomes 1 May), the same
    /// overflow ordinary date arithmetic produces. Anything else (wrong
    /// component count, non-numeric text, out-of-range values) is `None`.
    pub fn normalize(self, raw: &str) -> Option<NaiveDate> {
        let separator = self.separator()?;
        let parts: Vec<&str> = raw.split(separator).collect();
        if parts.len() != 3 {
            return None;
        }
        let a: i32 = parts[0].parse().ok()?;
        let b: i32 = parts[1].parse().ok()?;
        let c: i32 = parts[2].parse().ok()?;

        let (month, day, year) = match self {
            DateFormat::MmDdYy => (a, b, c + 2000),
            DateFormat::DdMmYy => (b, a, c + 2000),
            DateFormat::MmDdYyyy => (a, b, c),
            DateFormat::DdMmYyyy => (b, a, c),
            DateFormat::Unknown => unreachable!(),
        };

        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return None;
        }

        NaiveDate::from_ymd_opt(year, month as u32, 1)?.checked_add_days(Days::new(day as u64 - 1))
    }

    /// Zero-padded inverse of [`normalize`](Self::normalize), used to render
    /// a calendar date back into the raw identity string of its batch.
    /// `Unknown` falls back to ISO, which can never collide with a raw date
    /// because `Unknown` batches never produce transactions.
    pub fn format_date(self, date: NaiveDate) -> String {
        use chrono::Datelike;

        let month = date.month();
        let day = date.day();
        let year = date.year();
        match self {
            DateFormat::MmDdYy => format!("{month:02}-{day:02}-{:02}", year.rem_euclid(100)),
            DateFormat::DdMmYy => format!("{day:02}-{month:02}-{:02}", year.rem_euclid(100)),
            DateFormat::MmDdYyyy => format!("{month:02}/{day:02}/{year:04}"),
            DateFormat::DdMmYyyy => format!("{day:02}/{month:02}/{year:04}"),
            DateFormat::Unknown => date.format("%Y-%m-%d").to_string(),
        }
    }
}
