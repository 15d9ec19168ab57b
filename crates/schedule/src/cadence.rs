//! Maintenance cadence descriptor.

use std::fmt;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use wartung_core::EngineError;

use crate::calendar::weeks_in_year;

/// How often, and on which weekday, an asset is expected to be serviced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cadence {
    /// Preferred service day within the week.
    pub preferred_day: Weekday,
    /// Step between serviced ISO weeks (1 = every week).
    pub interval_weeks: u32,
}

impl Cadence {
    pub fn weekly(preferred_day: Weekday) -> Self {
        Self {
            preferred_day,
            interval_weeks: 1,
        }
    }

    /// Parse a compact descriptor: `<day>[/<interval>]`.
    ///
    /// The day is an English weekday name or its three-letter prefix
    /// ("mon", "tuesday"); the optional interval is a positive week count.
    /// Examples: "mon", "tue/2", "friday/4".
    pub fn parse(s: &str) -> Result<Self, EngineError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EngineError::invalid_argument("empty cadence descriptor"));
        }

        let (day_part, interval_part) = match s.split_once('/') {
            Some((d, i)) => (d.trim(), Some(i.trim())),
            None => (s, None),
        };

        let preferred_day = parse_weekday(day_part).ok_or_else(|| {
            EngineError::invalid_argument(format!(
                "unknown weekday '{day_part}' in cadence descriptor"
            ))
        })?;

        let interval_weeks = match interval_part {
            Some(i) => match i.parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(EngineError::invalid_argument(format!(
                        "cadence interval must be a positive week count, got '{i}'"
                    )))
                }
            },
            None => 1,
        };

        Ok(Self {
            preferred_day,
            interval_weeks,
        })
    }

    /// ISO weeks this cadence materializes for `year`, stepping by the
    /// interval from `from_week` up to the year's last ISO week.
    pub fn weeks_for_year(&self, year: i32, from_week: u32) -> Vec<u32> {
        let first = from_week.max(1);
        let last = weeks_in_year(year);
        let step = self.interval_weeks.max(1) as usize;
        (first..=last).step_by(step).collect()
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let day = weekday_str(self.preferred_day);
        if self.interval_weeks == 1 {
            write!(f, "{day}")
        } else {
            write!(f, "{day}/{}", self.interval_weeks)
        }
    }
}

fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.to_ascii_lowercase().as_str() {
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

fn weekday_str(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- parse -------------------------------------------------------------

    #[test]
    fn parse_day_only_defaults_to_weekly() {
        let cadence = Cadence::parse("mon").unwrap();
        assert_eq!(cadence.preferred_day, Weekday::Mon);
        assert_eq!(cadence.interval_weeks, 1);
    }

    #[test]
    fn parse_day_with_interval() {
        let cadence = Cadence::parse("tue/2").unwrap();
        assert_eq!(cadence.preferred_day, Weekday::Tue);
        assert_eq!(cadence.interval_weeks, 2);
    }

    #[test]
    fn parse_full_day_names_and_whitespace() {
        assert_eq!(
            Cadence::parse(" friday / 4 ").unwrap(),
            Cadence {
                preferred_day: Weekday::Fri,
                interval_weeks: 4
            }
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Cadence::parse("").is_err());
        assert!(Cadence::parse("xyz").is_err());
        assert!(Cadence::parse("mon/0").is_err());
        assert!(Cadence::parse("mon/abc").is_err());
        assert!(Cadence::parse("mon/-2").is_err());
    }

    // -- display round-trip -------------------------------------------------

    #[test]
    fn display_parses_back() {
        for descriptor in ["mon", "wed/2", "sun/13"] {
            let cadence = Cadence::parse(descriptor).unwrap();
            assert_eq!(cadence.to_string(), descriptor);
            assert_eq!(Cadence::parse(&cadence.to_string()).unwrap(), cadence);
        }
    }

    // -- weeks_for_year ----------------------------------------------------

    #[test]
    fn weekly_cadence_covers_whole_year() {
        let cadence = Cadence::weekly(Weekday::Mon);
        let weeks = cadence.weeks_for_year(2025, 1);
        assert_eq!(weeks.len(), 52);
        assert_eq!(weeks.first(), Some(&1));
        assert_eq!(weeks.last(), Some(&52));

        let weeks = cadence.weeks_for_year(2020, 1);
        assert_eq!(weeks.len(), 53);
    }

    #[test]
    fn interval_steps_from_anchor_week() {
        let cadence = Cadence::parse("mon/2").unwrap();
        let weeks = cadence.weeks_for_year(2025, 10);
        assert_eq!(weeks[..4], [10, 12, 14, 16]);
        assert_eq!(weeks.last(), Some(&52));
    }

    #[test]
    fn anchor_past_year_end_yields_nothing() {
        let cadence = Cadence::weekly(Weekday::Mon);
        assert!(cadence.weeks_for_year(2025, 53).is_empty());
    }
}
