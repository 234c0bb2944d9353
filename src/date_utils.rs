// date_utils.rs
//! Reporting-calendar arithmetic. Reporting periods are anchored on Sundays: the
//! reporting week for "today" is the week of the most recent Sunday, while the
//! reporting week for an explicit reference date is the week of the next Sunday.

use chrono::{Datelike, Duration, Local, NaiveDate};
use std::error::Error;

fn parse_ref_date(ref_date: Option<&str>) -> Result<NaiveDate, Box<dyn Error>> {
    match ref_date {
        Some(d) => Ok(NaiveDate::parse_from_str(d, "%Y-%m-%d")?),
        None => Ok(Local::now().date_naive()),
    }
}

/// Numbering used to backtrack from a Sunday anchor to a requested weekday.
fn dow_offset_key(dow: &str) -> Option<i64> {
    match dow.to_lowercase().as_str() {
        "monday" => Some(7),
        "tuesday" => Some(1),
        "wednesday" => Some(2),
        "thursday" => Some(3),
        "friday" => Some(4),
        "saturday" => Some(5),
        "sunday" => Some(6),
        _ => None,
    }
}

/// Gets the last date for a given day of the week (ex: "sunday", "monday") at or
/// before the reference date's most recent Sunday.
pub fn last_dow(dow: &str, ref_date: Option<&str>) -> Result<String, Box<dyn Error>> {
    let d = parse_ref_date(ref_date)?;
    let key = dow_offset_key(dow).ok_or("Unrecognized day of week")?;

    // backtrack to last sunday
    let weekday = d.weekday().num_days_from_monday() as i64;
    let offset = (weekday - 6).rem_euclid(7);
    let last_sunday = d - Duration::days(offset);

    let sunday_weekday = last_sunday.weekday().num_days_from_monday() as i64;
    let offset = (sunday_weekday - key).rem_euclid(7);
    let date = last_sunday - Duration::days(offset);

    Ok(date.format("%Y-%m-%d").to_string())
}

/// Gets the reporting year/quarter combination (YYYYQQ) for a given date. The first
/// quarter reports against the prior year's fourth quarter.
pub fn rptg_qtr(ref_date: Option<&str>) -> Result<String, Box<dyn Error>> {
    let d = parse_ref_date(ref_date)?;
    let mut year = d.year();
    let mut qtr = (d.month() + 2) / 3;

    if qtr == 1 {
        qtr = 4;
        year -= 1;
    }

    Ok(format!("{}{:02}", year, qtr))
}

/// Gets the reporting year/month combination (YYYYMM) for a given date: the month
/// prior to the reference month.
pub fn rptg_mon(ref_date: Option<&str>) -> Result<String, Box<dyn Error>> {
    let d = parse_ref_date(ref_date)?;
    let (year, month) = if d.month() == 1 {
        (d.year() - 1, 12)
    } else {
        (d.year(), d.month() - 1)
    };

    Ok(format!("{}{:02}", year, month))
}

/// Gets the reporting year for a given date: the year component of the reporting week.
pub fn rptg_yr(ref_date: Option<&str>) -> Result<String, Box<dyn Error>> {
    let yw = rptg_week(ref_date)?;
    Ok(yw[..4].to_string())
}

/// Gets the reporting year/week combination (YYYYWW) for a given date. Weeks are ISO
/// weeks keyed off the Sunday anchor; a December Sunday landing in ISO week 01 reports
/// into the next year.
pub fn rptg_week(ref_date: Option<&str>) -> Result<String, Box<dyn Error>> {
    let (d, explicit_ref) = match ref_date {
        Some(r) => (NaiveDate::parse_from_str(r, "%Y-%m-%d")?, true),
        None => (Local::now().date_naive(), false),
    };

    let weekday = d.weekday().num_days_from_monday() as i64;
    let rel_sunday = if explicit_ref {
        // next sunday
        d + Duration::days((6 - weekday).rem_euclid(7))
    } else {
        // last sunday
        d - Duration::days((weekday - 6).rem_euclid(7))
    };

    let mut rpt_year = rel_sunday.year();
    let rpt_week = rel_sunday.format("%V").to_string();

    if rel_sunday.month() == 12 && rpt_week == "01" {
        rpt_year += 1;
    }

    Ok(format!("{}{}", rpt_year, rpt_week))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_dow_backtracks_from_last_sunday() {
        // Wednesday 2023-06-14; last Sunday is 2023-06-11
        assert_eq!(last_dow("sunday", Some("2023-06-14")).unwrap(), "2023-06-11");
        assert_eq!(last_dow("friday", Some("2023-06-14")).unwrap(), "2023-06-09");
        assert_eq!(last_dow("monday", Some("2023-06-14")).unwrap(), "2023-06-05");
    }

    #[test]
    fn rptg_qtr_rolls_first_quarter_back() {
        assert_eq!(rptg_qtr(Some("2024-02-15")).unwrap(), "202304");
        assert_eq!(rptg_qtr(Some("2024-08-15")).unwrap(), "202403");
        assert_eq!(rptg_qtr(Some("2024-12-31")).unwrap(), "202404");
    }

    #[test]
    fn rptg_mon_rolls_one_month_back() {
        assert_eq!(rptg_mon(Some("2024-01-15")).unwrap(), "202312");
        assert_eq!(rptg_mon(Some("2024-03-10")).unwrap(), "202402");
    }

    #[test]
    fn rptg_week_uses_next_sunday_for_explicit_dates() {
        // Next Sunday after 2023-06-14 is 2023-06-18, ISO week 24
        assert_eq!(rptg_week(Some("2023-06-14")).unwrap(), "202324");
        // A Sunday reference is its own anchor
        assert_eq!(rptg_week(Some("2023-06-18")).unwrap(), "202324");
    }

    #[test]
    fn rptg_yr_is_week_year() {
        assert_eq!(rptg_yr(Some("2023-06-14")).unwrap(), "2023");
    }

    #[test]
    fn unknown_dow_is_an_error() {
        assert!(last_dow("someday", Some("2023-06-14")).is_err());
    }
}
