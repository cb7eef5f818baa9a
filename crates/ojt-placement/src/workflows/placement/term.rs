//! Internship term arithmetic.
//!
//! A job publishes its duration as free text (`"2 months"`, `"6 weeks"`). The text is
//! parsed into a [`DurationSpec`] at the boundary so an unrecognized value is a typed
//! error instead of a silently missing end date.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::domain::InternshipTerm;

/// Weekly day that never counts toward required hours.
pub const REST_DAY: Weekday = Weekday::Sun;

pub const HOURS_PER_DAY: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    Month,
    Week,
    Day,
}

impl DurationUnit {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "month" | "months" => Some(Self::Month),
            "week" | "weeks" => Some(Self::Week),
            "day" | "days" => Some(Self::Day),
            _ => None,
        }
    }

    const fn label(self, plural: bool) -> &'static str {
        match (self, plural) {
            (Self::Month, false) => "month",
            (Self::Month, true) => "months",
            (Self::Week, false) => "week",
            (Self::Week, true) => "weeks",
            (Self::Day, false) => "day",
            (Self::Day, true) => "days",
        }
    }
}

/// Parsed `<integer> (month|months|week|weeks|day|days)` duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DurationSpec {
    pub amount: u32,
    pub unit: DurationUnit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationSpecError {
    #[error("duration '{0}' is not of the form '<number> months|weeks|days'")]
    Unrecognized(String),
    #[error("duration '{0}' runs past the supported calendar range")]
    OutOfRange(String),
}

impl DurationSpec {
    pub const fn new(amount: u32, unit: DurationUnit) -> Self {
        Self { amount, unit }
    }
}

impl FromStr for DurationSpec {
    type Err = DurationSpecError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let unrecognized = || DurationSpecError::Unrecognized(raw.to_string());
        let trimmed = raw.trim();
        let digits_end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(unrecognized)?;
        if digits_end == 0 {
            return Err(unrecognized());
        }

        let amount = trimmed[..digits_end]
            .parse::<u32>()
            .map_err(|_| unrecognized())?;
        let unit = DurationUnit::parse(trimmed[digits_end..].trim()).ok_or_else(unrecognized)?;

        Ok(Self { amount, unit })
    }
}

impl fmt::Display for DurationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.unit.label(self.amount != 1))
    }
}

/// Advance `start` by the duration. Months use calendar arithmetic, clamping to the
/// last day of shorter months. `None` only when the result leaves chrono's range.
pub fn compute_end_date(start: NaiveDate, spec: DurationSpec) -> Option<NaiveDate> {
    match spec.unit {
        DurationUnit::Month => start.checked_add_months(Months::new(spec.amount)),
        DurationUnit::Week => start.checked_add_days(Days::new(u64::from(spec.amount) * 7)),
        DurationUnit::Day => start.checked_add_days(Days::new(u64::from(spec.amount))),
    }
}

/// Number of days in `[start, end]` that are not the rest day.
pub fn working_days(start: NaiveDate, end: NaiveDate) -> u32 {
    if end < start {
        return 0;
    }

    let span = (end - start).num_days() + 1;
    let mut count = span / 7 * 6;

    // Partial week counted backwards from `end` so no date past it is ever formed.
    let mut day = end;
    for _ in 0..span % 7 {
        if day.weekday() != REST_DAY {
            count += 1;
        }
        day = match day.pred_opt() {
            Some(previous) => previous,
            None => break,
        };
    }

    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Required hours for an internship spanning `[start, end]` inclusive.
pub fn compute_total_hours(start: NaiveDate, end: NaiveDate) -> u32 {
    working_days(start, end).saturating_mul(HOURS_PER_DAY)
}

/// Derive the full term from a start date and a published duration string.
pub fn derive_term(start: NaiveDate, duration: &str) -> Result<InternshipTerm, DurationSpecError> {
    let spec: DurationSpec = duration.parse()?;
    let end_date = compute_end_date(start, spec)
        .ok_or_else(|| DurationSpecError::OutOfRange(duration.to_string()))?;

    Ok(InternshipTerm {
        start_date: start,
        end_date,
        total_hours: compute_total_hours(start, end_date),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn parses_singular_plural_and_compact_forms() {
        assert_eq!(
            "2 months".parse::<DurationSpec>(),
            Ok(DurationSpec::new(2, DurationUnit::Month))
        );
        assert_eq!(
            "1 week".parse::<DurationSpec>(),
            Ok(DurationSpec::new(1, DurationUnit::Week))
        );
        assert_eq!(
            " 30Days ".parse::<DurationSpec>(),
            Ok(DurationSpec::new(30, DurationUnit::Day))
        );
    }

    #[test]
    fn rejects_unrecognized_formats() {
        for raw in ["", "months", "two months", "3 years", "3", "-2 weeks", "2 months extra"] {
            assert!(
                matches!(
                    raw.parse::<DurationSpec>(),
                    Err(DurationSpecError::Unrecognized(_))
                ),
                "expected '{raw}' to be rejected"
            );
        }
    }

    #[test]
    fn display_round_trips_through_parse() {
        let spec = DurationSpec::new(1, DurationUnit::Month);
        assert_eq!(spec.to_string(), "1 month");
        assert_eq!(spec.to_string().parse::<DurationSpec>(), Ok(spec));
    }

    #[test]
    fn months_use_calendar_arithmetic() {
        let end = compute_end_date(date(2025, 4, 1), DurationSpec::new(2, DurationUnit::Month));
        assert_eq!(end, Some(date(2025, 6, 1)));

        let clamped =
            compute_end_date(date(2025, 1, 31), DurationSpec::new(1, DurationUnit::Month));
        assert_eq!(clamped, Some(date(2025, 2, 28)));
    }

    #[test]
    fn weeks_match_equivalent_days() {
        let start = date(2025, 7, 14);
        assert_eq!(
            compute_end_date(start, DurationSpec::new(4, DurationUnit::Week)),
            compute_end_date(start, DurationSpec::new(28, DurationUnit::Day))
        );
    }

    #[test]
    fn end_date_is_monotonic_in_amount() {
        let start = date(2025, 1, 30);
        for unit in [DurationUnit::Month, DurationUnit::Week, DurationUnit::Day] {
            let mut previous = start;
            for amount in 0..40 {
                let end = compute_end_date(start, DurationSpec::new(amount, unit))
                    .expect("in range");
                assert!(end >= previous, "{amount} {unit:?} went backwards");
                previous = end;
            }
        }
    }

    #[test]
    fn total_hours_skip_rest_days() {
        // 2025-04-01 is a Tuesday; nine Sundays fall inside April 1 .. June 1.
        assert_eq!(compute_total_hours(date(2025, 4, 1), date(2025, 6, 1)), 53 * 8);
        // A single Sunday contributes nothing.
        assert_eq!(compute_total_hours(date(2025, 4, 6), date(2025, 4, 6)), 0);
        assert_eq!(compute_total_hours(date(2025, 4, 7), date(2025, 4, 7)), 8);
        assert_eq!(compute_total_hours(date(2025, 4, 7), date(2025, 4, 6)), 0);
    }

    #[test]
    fn never_more_than_six_working_days_per_week() {
        let base = date(2025, 1, 1);
        for offset in 0..14 {
            let start = base + chrono::Duration::days(offset);
            let end = start + chrono::Duration::days(6);
            assert_eq!(working_days(start, end), 6);
            assert!(compute_total_hours(start, end) <= 6 * HOURS_PER_DAY);
        }
    }

    #[test]
    fn terms_ending_on_the_last_calendar_day_are_counted() {
        let start = NaiveDate::MAX
            .checked_sub_days(Days::new(6))
            .expect("in range");
        let term = derive_term(start, "6 days").expect("term derives");
        assert_eq!(term.end_date, NaiveDate::MAX);
        assert_eq!(term.total_hours, 6 * HOURS_PER_DAY);

        let start = NaiveDate::MAX
            .checked_sub_days(Days::new(9))
            .expect("in range");
        let expected = start
            .iter_days()
            .take(10)
            .filter(|day| day.weekday() != REST_DAY)
            .count();
        assert_eq!(working_days(start, NaiveDate::MAX) as usize, expected);
        assert!(matches!(
            derive_term(start, "10 days"),
            Err(DurationSpecError::OutOfRange(_))
        ));
    }

    #[test]
    fn derive_term_combines_end_date_and_hours() {
        let term = derive_term(date(2025, 4, 1), "2 months").expect("term derives");
        assert_eq!(term.end_date, date(2025, 6, 1));
        assert_eq!(term.total_hours, 424);

        assert!(matches!(
            derive_term(date(2025, 4, 1), "a semester"),
            Err(DurationSpecError::Unrecognized(_))
        ));
    }
}
