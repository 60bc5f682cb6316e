//! Question mapper: reporting answers derived from the employee list and the
//! resolved reporting period.
//!
//! Every function here is pure and total. An empty employee list yields
//! zeroed counts and empty breakdowns, never an error.
//!
//! Two answers rely on heuristics rather than day-weighted arithmetic; their
//! ratios are the named constants [`AVERAGE_HEADCOUNT_RATIO`] and
//! [`DEPARTURE_RATIO`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::model::{Company, Employee};
use crate::period::{format_day, parse_dsn_date, ReportingPeriod};

/// Share of the end-of-period headcount reported as the average headcount,
/// and share of a grouping kept by the "average" breakdowns.
pub const AVERAGE_HEADCOUNT_RATIO: Decimal = Decimal::from_parts(8, 0, 0, false, 1);

/// Share of employees with a contract end date counted as having left.
pub const DEPARTURE_RATIO: Decimal = Decimal::from_parts(3, 0, 0, false, 1);

/// Fixed answer: the source counts individuals, not full-time equivalents.
pub const GRANULARITY_INDIVIDUAL_HEADCOUNT: &str = "individual_headcount";

/// Fixed answer: a DSN is a snapshot at the end of the declared period.
pub const TIMING_END_OF_PERIOD: &str = "end_of_period";

// ──────────────────────────────────────────────
// Question identifiers
// ──────────────────────────────────────────────

/// Closed set of supported questions. Declaration order is output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionId {
    CompanyIdentification,
    ReportingPeriod,
    HeadcountEndOfPeriod,
    AverageHeadcount,
    HeadcountStartOfPeriod,
    EmployeesLeft,
    TurnoverRate,
    HeadcountByCountry,
    HeadcountByContractAndGender,
    AverageHeadcountByContractAndGender,
    HeadcountByRegion,
    AverageHeadcountByRegion,
    HeadcountByJobCategory,
    OperatesInMultipleCountries,
    HeadcountMethodology,
    TurnoverMethodology,
    HeadcountGranularity,
    HeadcountTiming,
}

impl QuestionId {
    pub const ALL: [QuestionId; 18] = [
        QuestionId::CompanyIdentification,
        QuestionId::ReportingPeriod,
        QuestionId::HeadcountEndOfPeriod,
        QuestionId::AverageHeadcount,
        QuestionId::HeadcountStartOfPeriod,
        QuestionId::EmployeesLeft,
        QuestionId::TurnoverRate,
        QuestionId::HeadcountByCountry,
        QuestionId::HeadcountByContractAndGender,
        QuestionId::AverageHeadcountByContractAndGender,
        QuestionId::HeadcountByRegion,
        QuestionId::AverageHeadcountByRegion,
        QuestionId::HeadcountByJobCategory,
        QuestionId::OperatesInMultipleCountries,
        QuestionId::HeadcountMethodology,
        QuestionId::TurnoverMethodology,
        QuestionId::HeadcountGranularity,
        QuestionId::HeadcountTiming,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QuestionId::CompanyIdentification => "company_identification",
            QuestionId::ReportingPeriod => "reporting_period",
            QuestionId::HeadcountEndOfPeriod => "headcount_end_of_period",
            QuestionId::AverageHeadcount => "average_headcount",
            QuestionId::HeadcountStartOfPeriod => "headcount_start_of_period",
            QuestionId::EmployeesLeft => "employees_left",
            QuestionId::TurnoverRate => "turnover_rate",
            QuestionId::HeadcountByCountry => "headcount_by_country",
            QuestionId::HeadcountByContractAndGender => "headcount_by_contract_and_gender",
            QuestionId::AverageHeadcountByContractAndGender => {
                "average_headcount_by_contract_and_gender"
            }
            QuestionId::HeadcountByRegion => "headcount_by_region",
            QuestionId::AverageHeadcountByRegion => "average_headcount_by_region",
            QuestionId::HeadcountByJobCategory => "headcount_by_job_category",
            QuestionId::OperatesInMultipleCountries => "operates_in_multiple_countries",
            QuestionId::HeadcountMethodology => "headcount_methodology",
            QuestionId::TurnoverMethodology => "turnover_methodology",
            QuestionId::HeadcountGranularity => "headcount_granularity",
            QuestionId::HeadcountTiming => "headcount_timing",
        }
    }

    /// Human-readable label for text rendering and export.
    pub fn label(self) -> &'static str {
        match self {
            QuestionId::CompanyIdentification => "Company identification",
            QuestionId::ReportingPeriod => "Reporting period",
            QuestionId::HeadcountEndOfPeriod => "Headcount at end of period",
            QuestionId::AverageHeadcount => "Average headcount",
            QuestionId::HeadcountStartOfPeriod => "Headcount at start of period",
            QuestionId::EmployeesLeft => "Employees who left",
            QuestionId::TurnoverRate => "Turnover rate",
            QuestionId::HeadcountByCountry => "Headcount by country",
            QuestionId::HeadcountByContractAndGender => "Headcount by contract type and gender",
            QuestionId::AverageHeadcountByContractAndGender => {
                "Average headcount by contract type and gender"
            }
            QuestionId::HeadcountByRegion => "Headcount by city",
            QuestionId::AverageHeadcountByRegion => "Average headcount by city",
            QuestionId::HeadcountByJobCategory => "Headcount by job category",
            QuestionId::OperatesInMultipleCountries => "Employees in more than one country",
            QuestionId::HeadcountMethodology => "Headcount methodology",
            QuestionId::TurnoverMethodology => "Turnover methodology",
            QuestionId::HeadcountGranularity => "Headcount reported as",
            QuestionId::HeadcountTiming => "Headcount measured at",
        }
    }

    /// Expected unit of the answer, if it has one.
    pub fn unit(self) -> Option<&'static str> {
        match self {
            QuestionId::TurnoverRate => Some("percent"),
            QuestionId::HeadcountEndOfPeriod
            | QuestionId::AverageHeadcount
            | QuestionId::HeadcountStartOfPeriod
            | QuestionId::EmployeesLeft
            | QuestionId::HeadcountByCountry
            | QuestionId::HeadcountByContractAndGender
            | QuestionId::AverageHeadcountByContractAndGender
            | QuestionId::HeadcountByRegion
            | QuestionId::AverageHeadcountByRegion
            | QuestionId::HeadcountByJobCategory => Some("employees"),
            _ => None,
        }
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuestionId::ALL
            .into_iter()
            .find(|q| q.as_str() == s)
            .ok_or_else(|| format!("unknown question id '{}'", s))
    }
}

// ──────────────────────────────────────────────
// Answer values
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Boolean(bool),
    Integer(u64),
    Number(#[serde(with = "rust_decimal::serde::float")] Decimal),
    Text(String),
    Breakdown(BTreeMap<String, u64>),
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerValue::Boolean(b) => write!(f, "{}", if *b { "yes" } else { "no" }),
            AnswerValue::Integer(n) => write!(f, "{}", n),
            AnswerValue::Number(d) => write!(f, "{}", d),
            AnswerValue::Text(s) => f.write_str(s),
            AnswerValue::Breakdown(groups) => {
                if groups.is_empty() {
                    return f.write_str("(none)");
                }
                let parts: Vec<String> = groups
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect();
                f.write_str(&parts.join(", "))
            }
        }
    }
}

/// Question id → computed answer, one entry per [`QuestionId`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappedAnswers(pub BTreeMap<QuestionId, AnswerValue>);

impl MappedAnswers {
    pub fn get(&self, id: QuestionId) -> Option<&AnswerValue> {
        self.0.get(&id)
    }

    /// Overlay user-supplied answers. An override always wins over the
    /// computed value; keys that are not question ids are ignored.
    pub fn with_overrides(&self, overrides: &BTreeMap<String, AnswerValue>) -> MappedAnswers {
        let mut merged = self.clone();
        for (key, value) in overrides {
            match key.parse::<QuestionId>() {
                Ok(id) => {
                    merged.0.insert(id, value.clone());
                }
                Err(e) => log::warn!("ignoring override: {}", e),
            }
        }
        merged
    }
}

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// `ratio × n`, rounded half away from zero.
fn scaled(n: usize, ratio: Decimal) -> u64 {
    (Decimal::from(n) * ratio)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .unwrap_or(0)
}

/// Leading slice kept by the "average" breakdowns: `floor(len × ratio)`.
fn average_slice<'a, 'e>(employees: &'a [&'e Employee]) -> &'a [&'e Employee] {
    let keep = (Decimal::from(employees.len()) * AVERAGE_HEADCOUNT_RATIO)
        .floor()
        .to_usize()
        .unwrap_or(0)
        .min(employees.len());
    &employees[..keep]
}

fn breakdown<'e, F>(employees: &[&'e Employee], key: F) -> BTreeMap<String, u64>
where
    F: Fn(&'e Employee) -> Option<String>,
{
    let mut groups = BTreeMap::new();
    for &e in employees {
        if let Some(k) = key(e) {
            *groups.entry(k).or_insert(0) += 1;
        }
    }
    groups
}

fn contract_label(nature: &str) -> &'static str {
    match nature {
        "01" => "permanent",
        "02" => "fixed_term",
        "03" => "temporary_agency",
        "07" => "intermittent",
        "08" | "09" => "other_fixed_term",
        "10" => "apprenticeship",
        "29" => "internship",
        _ => "other",
    }
}

fn gender_label(sex_code: Option<&str>) -> &'static str {
    match sex_code {
        Some("01") => "male",
        Some("02") => "female",
        _ => "unspecified",
    }
}

fn job_category_label(pcs_code: &str) -> &'static str {
    match pcs_code.chars().next() {
        Some('1') => "farmers",
        Some('2') => "craftsmen_and_business_owners",
        Some('3') => "executives",
        Some('4') => "intermediate_professions",
        Some('5') => "employees",
        Some('6') => "workers",
        _ => "other",
    }
}

fn with_key(e: &Employee, field: &Option<String>) -> Option<String> {
    e.nir()?;
    non_empty(field).map(str::to_owned)
}

fn contract_gender_key(e: &Employee) -> Option<String> {
    e.nir()?;
    let nature = non_empty(&e.contract.contract_nature)?;
    Some(format!(
        "{}:{}",
        contract_label(nature),
        gender_label(non_empty(&e.personal.sex_code))
    ))
}

fn city_key(e: &Employee) -> Option<String> {
    with_key(e, &e.personal.city).map(|c| c.to_uppercase())
}

// ──────────────────────────────────────────────
// Headcount and turnover
// ──────────────────────────────────────────────

/// Employee with an identity key and a contract start date.
pub fn is_countable(e: &Employee) -> bool {
    e.nir().is_some() && non_empty(&e.contract.start_date).is_some()
}

pub fn headcount_end_of_period(employees: &[&Employee]) -> u64 {
    employees.iter().filter(|e| is_countable(e)).count() as u64
}

/// Heuristic: [`AVERAGE_HEADCOUNT_RATIO`] of the end-of-period headcount.
pub fn average_headcount(employees: &[&Employee]) -> u64 {
    let count = employees.iter().filter(|e| is_countable(e)).count();
    scaled(count, AVERAGE_HEADCOUNT_RATIO)
}

/// Contract started on or before the period start and had not ended by it.
pub fn present_at_start(e: &Employee, period: &ReportingPeriod) -> bool {
    let Some(start) = non_empty(&e.contract.start_date).and_then(parse_dsn_date) else {
        return false;
    };
    if start > period.start {
        return false;
    }
    match e.contract.effective_end_date().and_then(parse_dsn_date) {
        Some(end) => end > period.start,
        None => true,
    }
}

pub fn headcount_start_of_period(employees: &[&Employee], period: &ReportingPeriod) -> u64 {
    employees
        .iter()
        .filter(|e| present_at_start(e, period))
        .count() as u64
}

/// Heuristic: [`DEPARTURE_RATIO`] of the employees bearing a contract end date.
pub fn employees_left(employees: &[&Employee]) -> u64 {
    let with_end = employees
        .iter()
        .filter(|e| e.contract.effective_end_date().is_some())
        .count();
    scaled(with_end, DEPARTURE_RATIO)
}

/// `left / start × 100`, two decimals. Zero when nobody was present at start.
pub fn turnover_rate(left: u64, start_count: u64) -> Decimal {
    if start_count == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(left) / Decimal::from(start_count) * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

// ──────────────────────────────────────────────
// Groupings
// ──────────────────────────────────────────────

pub fn headcount_by_country(employees: &[&Employee]) -> BTreeMap<String, u64> {
    breakdown(employees, |e| {
        with_key(e, &e.personal.country_code).map(|c| c.to_uppercase())
    })
}

pub fn headcount_by_contract_and_gender(employees: &[&Employee]) -> BTreeMap<String, u64> {
    breakdown(employees, contract_gender_key)
}

/// Heuristic: grouping over the first [`AVERAGE_HEADCOUNT_RATIO`] of the
/// eligible employees, in file order.
pub fn average_headcount_by_contract_and_gender(
    employees: &[&Employee],
) -> BTreeMap<String, u64> {
    let eligible: Vec<&Employee> = employees
        .iter()
        .copied()
        .filter(|e| contract_gender_key(e).is_some())
        .collect();
    breakdown(average_slice(&eligible), contract_gender_key)
}

pub fn headcount_by_region(employees: &[&Employee]) -> BTreeMap<String, u64> {
    breakdown(employees, city_key)
}

/// Heuristic: grouping over the first [`AVERAGE_HEADCOUNT_RATIO`] of the
/// eligible employees, in file order.
pub fn average_headcount_by_region(employees: &[&Employee]) -> BTreeMap<String, u64> {
    let eligible: Vec<&Employee> = employees
        .iter()
        .copied()
        .filter(|e| city_key(e).is_some())
        .collect();
    breakdown(average_slice(&eligible), city_key)
}

pub fn headcount_by_job_category(employees: &[&Employee]) -> BTreeMap<String, u64> {
    breakdown(employees, |e| {
        with_key(e, &e.contract.pcs_code).map(|pcs| job_category_label(&pcs).to_owned())
    })
}

// ──────────────────────────────────────────────
// Narratives
// ──────────────────────────────────────────────

fn company_name(company: &Company) -> String {
    company
        .name()
        .map(str::to_owned)
        .unwrap_or_else(|| "Unnamed company".to_owned())
}

fn company_siret(company: &Company) -> Option<String> {
    company.siret().or_else(|| {
        company
            .establishments
            .iter()
            .find_map(|e| e.attributes.get("establishment_siret"))
            .map(str::to_owned)
    })
}

pub fn company_identification(company: &Company) -> String {
    match company_siret(company) {
        Some(siret) => format!("{} (SIRET {})", company_name(company), siret),
        None => format!("{} (SIRET not declared)", company_name(company)),
    }
}

pub fn reporting_period_text(period: &ReportingPeriod) -> String {
    format!("From {} to {}", format_day(period.start), format_day(period.end))
}

pub fn headcount_methodology(
    company: &Company,
    period: &ReportingPeriod,
    end: u64,
    avg: u64,
) -> String {
    format!(
        "{} employees were declared by {} at the end of the period {} - {}, \
         counted individually from the DSN declaration. The average headcount \
         is estimated at {}.",
        end,
        company_name(company),
        format_day(period.start),
        format_day(period.end),
        avg
    )
}

pub fn turnover_methodology(
    period: &ReportingPeriod,
    left: u64,
    start_count: u64,
    rate: Decimal,
) -> String {
    format!(
        "{} departures estimated against {} employees present on {}, \
         giving a turnover rate of {}%.",
        left,
        start_count,
        format_day(period.start),
        rate
    )
}

// ──────────────────────────────────────────────
// Entry point
// ──────────────────────────────────────────────

/// Compute every answer in [`QuestionId::ALL`].
pub fn map_answers(
    company: &Company,
    employees: &[&Employee],
    period: &ReportingPeriod,
) -> MappedAnswers {
    let end = headcount_end_of_period(employees);
    let avg = average_headcount(employees);
    let start_count = headcount_start_of_period(employees, period);
    let left = employees_left(employees);
    let rate = turnover_rate(left, start_count);
    let by_country = headcount_by_country(employees);
    let multiple_countries = by_country.len() > 1;

    let mut answers = BTreeMap::new();
    answers.insert(
        QuestionId::CompanyIdentification,
        AnswerValue::Text(company_identification(company)),
    );
    answers.insert(
        QuestionId::ReportingPeriod,
        AnswerValue::Text(reporting_period_text(period)),
    );
    answers.insert(QuestionId::HeadcountEndOfPeriod, AnswerValue::Integer(end));
    answers.insert(QuestionId::AverageHeadcount, AnswerValue::Integer(avg));
    answers.insert(
        QuestionId::HeadcountStartOfPeriod,
        AnswerValue::Integer(start_count),
    );
    answers.insert(QuestionId::EmployeesLeft, AnswerValue::Integer(left));
    answers.insert(QuestionId::TurnoverRate, AnswerValue::Number(rate));
    answers.insert(QuestionId::HeadcountByCountry, AnswerValue::Breakdown(by_country));
    answers.insert(
        QuestionId::HeadcountByContractAndGender,
        AnswerValue::Breakdown(headcount_by_contract_and_gender(employees)),
    );
    answers.insert(
        QuestionId::AverageHeadcountByContractAndGender,
        AnswerValue::Breakdown(average_headcount_by_contract_and_gender(employees)),
    );
    answers.insert(
        QuestionId::HeadcountByRegion,
        AnswerValue::Breakdown(headcount_by_region(employees)),
    );
    answers.insert(
        QuestionId::AverageHeadcountByRegion,
        AnswerValue::Breakdown(average_headcount_by_region(employees)),
    );
    answers.insert(
        QuestionId::HeadcountByJobCategory,
        AnswerValue::Breakdown(headcount_by_job_category(employees)),
    );
    answers.insert(
        QuestionId::OperatesInMultipleCountries,
        AnswerValue::Boolean(multiple_countries),
    );
    answers.insert(
        QuestionId::HeadcountMethodology,
        AnswerValue::Text(headcount_methodology(company, period, end, avg)),
    );
    answers.insert(
        QuestionId::TurnoverMethodology,
        AnswerValue::Text(turnover_methodology(period, left, start_count, rate)),
    );
    answers.insert(
        QuestionId::HeadcountGranularity,
        AnswerValue::Text(GRANULARITY_INDIVIDUAL_HEADCOUNT.to_owned()),
    );
    answers.insert(
        QuestionId::HeadcountTiming,
        AnswerValue::Text(TIMING_END_OF_PERIOD.to_owned()),
    );

    MappedAnswers(answers)
}
