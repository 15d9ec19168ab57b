//! ISO-8601 calendar week arithmetic.
//!
//! The single authority for week/date conversion in the workspace:
//! Monday-start weeks, week 1 is the week containing the year's first
//! Thursday (equivalently, the week containing January 4th).

use chrono::{Datelike, NaiveDate, Weekday};

use wartung_core::EngineError;

/// Monday of the given ISO week.
///
/// Week numbers outside 1..=53, and week 53 in a year that only has 52 ISO
/// weeks, fail with `InvalidArgument`.
pub fn week_to_monday(year: i32, week: u32) -> Result<NaiveDate, EngineError> {
    if !(1..=53).contains(&week) {
        return Err(EngineError::invalid_argument(format!(
            "ISO week must be within 1..=53, got {week}"
        )));
    }
    NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).ok_or_else(|| {
        EngineError::invalid_argument(format!("ISO year {year} has no week {week}"))
    })
}

/// ISO (year, week) containing the given date.
///
/// Total over the calendar: a date in early January can belong to week 52/53
/// of the previous year, and a date in late December to week 1 of the next.
pub fn date_to_week(date: NaiveDate) -> (i32, u32) {
    let iso = date.iso_week();
    (iso.year(), iso.week())
}

/// Number of ISO weeks in a year (52 or 53).
pub fn weeks_in_year(year: i32) -> u32 {
    // December 28th always falls in the year's last ISO week.
    match NaiveDate::from_ymd_opt(year, 12, 28) {
        Some(d) => d.iso_week().week(),
        None => 52,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- round-trip --------------------------------------------------------

    #[test]
    fn round_trip_every_valid_week() {
        for year in 2015..=2030 {
            for week in 1..=weeks_in_year(year) {
                let monday = week_to_monday(year, week).unwrap();
                assert_eq!(
                    date_to_week(monday),
                    (year, week),
                    "round-trip failed for {year}-W{week:02}"
                );
                assert_eq!(monday.weekday(), Weekday::Mon);
            }
        }
    }

    // -- year boundaries ---------------------------------------------------

    #[test]
    fn january_first_can_belong_to_previous_iso_year() {
        // 2021-01-01 is a Friday, so it still sits in 2020's week 53.
        let date = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        assert_eq!(date_to_week(date), (2020, 53));

        // 2016-01-01 is a Friday as well: week 53 of 2015.
        let date = NaiveDate::from_ymd_opt(2016, 1, 1).unwrap();
        assert_eq!(date_to_week(date), (2015, 53));
    }

    #[test]
    fn late_december_can_belong_to_next_iso_year() {
        // 2024-12-30 is a Monday and opens week 1 of 2025.
        let date = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        assert_eq!(date_to_week(date), (2025, 1));

        // 2025-12-29 likewise opens week 1 of 2026.
        let date = NaiveDate::from_ymd_opt(2025, 12, 29).unwrap();
        assert_eq!(date_to_week(date), (2026, 1));
    }

    #[test]
    fn week_one_monday_may_lie_in_previous_calendar_year() {
        assert_eq!(
            week_to_monday(2025, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 30).unwrap()
        );
    }

    // -- weeks_in_year -----------------------------------------------------

    #[test]
    fn long_and_short_years() {
        // Years starting on a Thursday, or leap years starting on a
        // Wednesday, have 53 weeks.
        assert_eq!(weeks_in_year(2015), 53);
        assert_eq!(weeks_in_year(2020), 53);
        assert_eq!(weeks_in_year(2026), 53);

        assert_eq!(weeks_in_year(2024), 52);
        assert_eq!(weeks_in_year(2025), 52);
    }

    // -- invalid input -----------------------------------------------------

    #[test]
    fn week_zero_and_fifty_four_are_rejected() {
        assert!(matches!(
            week_to_monday(2025, 0),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            week_to_monday(2025, 54),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn week_53_rejected_in_short_year() {
        assert!(week_to_monday(2020, 53).is_ok());
        assert!(matches!(
            week_to_monday(2025, 53),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    // -- known values ------------------------------------------------------

    #[test]
    fn known_mondays() {
        assert_eq!(
            week_to_monday(2025, 10).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
        );
        assert_eq!(
            week_to_monday(2025, 20).unwrap(),
            NaiveDate::from_ymd_opt(2025, 5, 12).unwrap()
        );
    }
}
