use std::fmt;

use chrono::{Datelike, NaiveDate};

use crate::error::TypeError;

const FULL_DATE: &str = "%Y-%m-%d";

/// Parse a full `YYYY-MM-DD` calendar date.
pub fn parse_calendar_date(input: &str) -> Result<NaiveDate, TypeError> {
    let trimmed = input.trim();
    // chrono accepts unpadded fields; the ledger format is strictly padded.
    if trimmed.len() != 10 {
        return Err(invalid(input, "YYYY-MM-DD"));
    }
    NaiveDate::parse_from_str(trimmed, FULL_DATE).map_err(|_| invalid(input, "YYYY-MM-DD"))
}

/// A date at year, month, or day granularity used to filter expirations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateQuery {
    Year(i32),
    Month { year: i32, month: u32 },
    Day(NaiveDate),
}

impl DateQuery {
    /// Parse `YYYY`, `YYYY-MM`, or `YYYY-MM-DD`; the form is chosen by length.
    pub fn parse(input: &str) -> Result<Self, TypeError> {
        const EXPECTED: &str = "YYYY, YYYY-MM, or YYYY-MM-DD";
        let s = input.trim();
        match s.len() {
            4 => {
                let year = parse_digits(s).ok_or_else(|| invalid(input, EXPECTED))?;
                Ok(Self::Year(year as i32))
            }
            7 => {
                let (y, m) = s.split_once('-').ok_or_else(|| invalid(input, EXPECTED))?;
                let year = parse_digits(y).filter(|_| y.len() == 4);
                let month = parse_digits(m).filter(|m| (1..=12).contains(m));
                match (year, month) {
                    (Some(year), Some(month)) => Ok(Self::Month {
                        year: year as i32,
                        month,
                    }),
                    _ => Err(invalid(input, EXPECTED)),
                }
            }
            10 => parse_calendar_date(s)
                .map(Self::Day)
                .map_err(|_| invalid(input, EXPECTED)),
            _ => Err(invalid(input, EXPECTED)),
        }
    }

    /// Whether `date` falls inside this query's window.
    pub fn matches(&self, date: NaiveDate) -> bool {
        match *self {
            Self::Year(year) => date.year() == year,
            Self::Month { year, month } => date.year() == year && date.month() == month,
            Self::Day(day) => date == day,
        }
    }
}

impl fmt::Display for DateQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Year(year) => write!(f, "{year:04}"),
            Self::Month { year, month } => write!(f, "{year:04}-{month:02}"),
            Self::Day(day) => write!(f, "{}", day.format(FULL_DATE)),
        }
    }
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn invalid(input: &str, expected: &'static str) -> TypeError {
    TypeError::InvalidDate {
        input: input.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        parse_calendar_date(s).unwrap()
    }

    #[test]
    fn calendar_date_requires_padding() {
        assert_eq!(d("2025-10-01"), NaiveDate::from_ymd_opt(2025, 10, 1).unwrap());
        assert!(parse_calendar_date("2025-1-01").is_err());
        assert!(parse_calendar_date("2025-02-30").is_err());
        assert!(parse_calendar_date("01/10/2025").is_err());
    }

    #[test]
    fn query_forms_by_length() {
        assert_eq!(DateQuery::parse("2025").unwrap(), DateQuery::Year(2025));
        assert_eq!(
            DateQuery::parse("2026-09").unwrap(),
            DateQuery::Month {
                year: 2026,
                month: 9
            }
        );
        assert_eq!(
            DateQuery::parse("2026-09-23").unwrap(),
            DateQuery::Day(d("2026-09-23"))
        );
    }

    #[test]
    fn query_rejects_garbage() {
        for bad in ["", "25", "20x5", "2026-13", "2026/09", "2026-9-1", "2026-09-31", "+202"] {
            assert!(DateQuery::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn year_matches_whole_year_inclusive() {
        let q = DateQuery::Year(2025);
        assert!(q.matches(d("2025-01-01")));
        assert!(q.matches(d("2025-12-31")));
        assert!(!q.matches(d("2024-12-31")));
        assert!(!q.matches(d("2026-01-01")));
    }

    #[test]
    fn month_and_day_granularity() {
        let month = DateQuery::parse("2025-10").unwrap();
        assert!(month.matches(d("2025-10-31")));
        assert!(!month.matches(d("2024-10-15")));

        let day = DateQuery::parse("2025-10-01").unwrap();
        assert!(day.matches(d("2025-10-01")));
        assert!(!day.matches(d("2025-10-02")));
    }

    #[test]
    fn display_round_trips() {
        for s in ["2025", "2025-03", "2025-03-09"] {
            assert_eq!(DateQuery::parse(s).unwrap().to_string(), s);
        }
    }
}
