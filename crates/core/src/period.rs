//! Reporting-period resolver.
//!
//! Derives a best-effort `[start, end]` window from the dates declared on
//! employee records. Never fails: when no usable date exists the result is
//! a documented calendar-year fallback.

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime};

use crate::model::Employee;

/// Year used when the file carries no parseable date at all.
pub const DEFAULT_REPORTING_YEAR: i32 = 2024;
/// Dates older than `today.year() - LOOKBACK_YEARS` are treated as noise.
pub const LOOKBACK_YEARS: i32 = 5;
/// Dates later than `today.year() + LOOKAHEAD_YEARS` are treated as noise.
pub const LOOKAHEAD_YEARS: i32 = 1;

/// Where a [`ReportingPeriod`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodSource {
    /// Min/max of the in-range employee dates.
    EmployeeDates,
    /// Dates existed but all fell outside the accepted window.
    CurrentYearFallback,
    /// No parseable date anywhere in the file.
    DefaultFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingPeriod {
    pub start: Date,
    pub end: Date,
    pub source: PeriodSource,
}

impl ReportingPeriod {
    /// January 1st to December 31st of `year`.
    pub fn calendar_year(year: i32, source: PeriodSource) -> Option<Self> {
        Some(ReportingPeriod {
            start: Date::from_calendar_date(year, Month::January, 1).ok()?,
            end: Date::from_calendar_date(year, Month::December, 31).ok()?,
            source,
        })
    }

    /// The fixed window used when no dates are available.
    pub fn default_window() -> Self {
        ReportingPeriod {
            start: time::macros::date!(2024 - 01 - 01),
            end: time::macros::date!(2024 - 12 - 31),
            source: PeriodSource::DefaultFallback,
        }
    }
}

/// Tunables for [`resolve_reporting_period`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverOptions {
    pub default_year: i32,
    pub lookback_years: i32,
    pub lookahead_years: i32,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        ResolverOptions {
            default_year: DEFAULT_REPORTING_YEAR,
            lookback_years: LOOKBACK_YEARS,
            lookahead_years: LOOKAHEAD_YEARS,
        }
    }
}

/// Parse an 8-digit `YYYYMMDD` string. Anything else, including impossible
/// calendar dates, yields `None`.
pub fn parse_dsn_date(raw: &str) -> Option<Date> {
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = raw[0..4].parse().ok()?;
    let month: u8 = raw[4..6].parse().ok()?;
    let day: u8 = raw[6..8].parse().ok()?;
    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}

/// `DD/MM/YYYY`, the form used in narrative answers.
pub fn format_day(date: Date) -> String {
    date.format(format_description!("[day]/[month]/[year]"))
        .unwrap_or_else(|_| date.to_string())
}

/// Every parseable period/salary date declared on `employees`.
pub fn collect_dates(employees: &[&Employee]) -> Vec<Date> {
    employees
        .iter()
        .flat_map(|e| {
            [
                e.period.start_date.as_deref(),
                e.period.end_date.as_deref(),
                e.salary.payment_date.as_deref(),
            ]
        })
        .flatten()
        .filter_map(parse_dsn_date)
        .collect()
}

/// Resolve the reporting window relative to `today`.
pub fn resolve_reporting_period(
    employees: &[&Employee],
    today: Date,
    options: &ResolverOptions,
) -> ReportingPeriod {
    let dates = collect_dates(employees);
    if dates.is_empty() {
        log::warn!(
            "no usable period dates, falling back to calendar year {}",
            options.default_year
        );
        return ReportingPeriod::calendar_year(options.default_year, PeriodSource::DefaultFallback)
            .unwrap_or_else(ReportingPeriod::default_window);
    }

    let min_year = today.year().saturating_sub(options.lookback_years.max(0));
    let max_year = today.year().saturating_add(options.lookahead_years.max(0));
    let mut in_range: Vec<Date> = dates
        .into_iter()
        .filter(|d| (min_year..=max_year).contains(&d.year()))
        .collect();

    if in_range.is_empty() {
        log::warn!(
            "all period dates fall outside {}..={}, using current year {}",
            min_year,
            max_year,
            today.year()
        );
        return ReportingPeriod::calendar_year(today.year(), PeriodSource::CurrentYearFallback)
            .unwrap_or_else(ReportingPeriod::default_window);
    }

    in_range.sort();
    ReportingPeriod {
        start: in_range[0],
        end: in_range[in_range.len() - 1],
        source: PeriodSource::EmployeeDates,
    }
}

/// [`resolve_reporting_period`] against today's UTC date.
pub fn resolve_reporting_period_now(
    employees: &[&Employee],
    options: &ResolverOptions,
) -> ReportingPeriod {
    resolve_reporting_period(employees, OffsetDateTime::now_utc().date(), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldMapper;
    use time::macros::date;

    fn employee_with(period: &[(&str, &str)], payment: Option<&str>) -> Employee {
        let mut e = Employee::new(1, false);
        for (code, value) in period {
            e.period.apply(code, value);
        }
        if let Some(p) = payment {
            e.salary.apply("S21.G00.50.001", p);
        }
        e
    }

    #[test]
    fn parses_only_well_formed_dates() {
        assert_eq!(parse_dsn_date("20240229"), Some(date!(2024 - 02 - 29)));
        assert_eq!(parse_dsn_date("20230229"), None);
        assert_eq!(parse_dsn_date("2024011"), None);
        assert_eq!(parse_dsn_date("2024-1-01"), None);
        assert_eq!(parse_dsn_date("20241301"), None);
        assert_eq!(parse_dsn_date(""), None);
        assert_eq!(parse_dsn_date("２０２４０１０１"), None);
    }

    #[test]
    fn no_dates_gives_default_window() {
        let e = Employee::new(1, true);
        let today = date!(2026 - 10 - 18);
        let p = resolve_reporting_period(&[&e], today, &ResolverOptions::default());
        assert_eq!(p, ReportingPeriod::default_window());
        assert_eq!(p.start, date!(2024 - 01 - 01));
        assert_eq!(p.end, date!(2024 - 12 - 31));
    }

    #[test]
    fn empty_employee_list_gives_default_window() {
        let p = resolve_reporting_period(&[], date!(2030 - 01 - 01), &ResolverOptions::default());
        assert_eq!(p.source, PeriodSource::DefaultFallback);
        assert_eq!(p.start.year(), DEFAULT_REPORTING_YEAR);
    }

    #[test]
    fn min_and_max_of_in_range_dates() {
        let a = employee_with(
            &[("S21.G00.51.001", "20250101"), ("S21.G00.51.002", "20250131")],
            Some("20250205"),
        );
        let b = employee_with(&[("S21.G00.51.001", "20250301")], None);
        let today = date!(2025 - 06 - 01);
        let p = resolve_reporting_period(&[&a, &b], today, &ResolverOptions::default());
        assert_eq!(p.source, PeriodSource::EmployeeDates);
        assert_eq!(p.start, date!(2025 - 01 - 01));
        assert_eq!(p.end, date!(2025 - 03 - 01));
    }

    #[test]
    fn outliers_are_discarded() {
        let a = employee_with(
            &[("S21.G00.51.001", "19990101"), ("S21.G00.51.002", "20250630")],
            Some("20990101"),
        );
        let p = resolve_reporting_period(&[&a], date!(2025 - 06 - 01), &ResolverOptions::default());
        assert_eq!(p.start, date!(2025 - 06 - 30));
        assert_eq!(p.end, date!(2025 - 06 - 30));
    }

    #[test]
    fn all_outliers_fall_back_to_current_year() {
        let a = employee_with(&[("S21.G00.51.001", "19900101")], None);
        let p = resolve_reporting_period(&[&a], date!(2026 - 10 - 18), &ResolverOptions::default());
        assert_eq!(p.source, PeriodSource::CurrentYearFallback);
        assert_eq!(p.start, date!(2026 - 01 - 01));
        assert_eq!(p.end, date!(2026 - 12 - 31));
    }

    #[test]
    fn malformed_dates_are_ignored() {
        let a = employee_with(&[("S21.G00.51.001", "01/02/2025")], Some("2025"));
        let p = resolve_reporting_period(&[&a], date!(2025 - 06 - 01), &ResolverOptions::default());
        assert_eq!(p.source, PeriodSource::DefaultFallback);
    }

    #[test]
    fn options_change_fallback_year() {
        let opts = ResolverOptions {
            default_year: 2023,
            ..ResolverOptions::default()
        };
        let p = resolve_reporting_period(&[], date!(2025 - 06 - 01), &opts);
        assert_eq!(p.start, date!(2023 - 01 - 01));
    }

    #[test]
    fn extreme_window_years_do_not_overflow() {
        let a = employee_with(&[("S21.G00.51.001", "20250301")], None);
        let today = date!(2026 - 10 - 18);
        for (lookback, lookahead) in [(0, i32::MAX), (i32::MAX, 0), (i32::MIN, i32::MIN)] {
            let opts = ResolverOptions {
                lookback_years: lookback,
                lookahead_years: lookahead,
                ..ResolverOptions::default()
            };
            let p = resolve_reporting_period(&[&a], today, &opts);
            if lookback == i32::MAX {
                assert_eq!(p.source, PeriodSource::EmployeeDates);
                assert_eq!(p.start, date!(2025 - 03 - 01));
            } else {
                // 2025 is outside a window that starts at the current year.
                assert_eq!(p.source, PeriodSource::CurrentYearFallback);
            }
        }
    }

    #[test]
    fn day_format() {
        assert_eq!(format_day(date!(2025 - 03 - 07)), "07/03/2025");
    }
}
