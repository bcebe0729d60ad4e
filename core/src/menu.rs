//! Calendar helpers for the menu fetch.
//!
//! Menus are keyed by local calendar day in `yyyy-MM-dd` form. When today's
//! menu is empty the adapter probes the following day once.

use chrono::NaiveDate;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// The day after `date`, saturating at the end of the calendar.
pub fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_pads_month_and_day() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(format_date(date), "2024-03-07");
    }

    #[test]
    fn next_day_crosses_month_and_year() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(next_day(date), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        let date = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        assert_eq!(next_day(date), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }
}
