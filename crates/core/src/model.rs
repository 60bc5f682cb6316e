//! Entity tree produced by the builder and consumed by the period resolver
//! and the question mapper. Read-only once a parse completes.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::LineIssue;
use crate::fields::{
    AddressBlock, Attributes, ContractBlock, IdentityBlock, PeriodBlock, PersonalBlock,
    SalaryBlock,
};

/// Tag recorded in [`Metadata::parsing_method`].
pub const PARSING_METHOD: &str = "line-state-machine";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub attributes: Attributes,
    pub establishments: Vec<Establishment>,
}

impl Company {
    pub fn name(&self) -> Option<&str> {
        self.attributes.get("company_name")
    }

    /// SIREN followed by NIC, when both are declared.
    pub fn siret(&self) -> Option<String> {
        match (self.attributes.get("siren"), self.attributes.get("nic")) {
            (Some(siren), Some(nic)) => Some(format!("{}{}", siren, nic)),
            _ => None,
        }
    }

    pub fn employees(&self) -> impl Iterator<Item = &Employee> {
        self.establishments.iter().flat_map(|e| e.employees.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Establishment {
    pub attributes: Attributes,
    pub employees: Vec<Employee>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    /// 1-based position within the owning establishment.
    pub id: u32,
    /// First employee created in the parse. Only this record may hold
    /// identity and address data.
    pub is_primary_record: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<AddressBlock>,
    pub personal: PersonalBlock,
    pub contract: ContractBlock,
    pub salary: SalaryBlock,
    pub period: PeriodBlock,
}

impl Employee {
    pub fn new(id: u32, is_primary_record: bool) -> Self {
        Employee {
            id,
            is_primary_record,
            identity: is_primary_record.then(IdentityBlock::default),
            address: is_primary_record.then(AddressBlock::default),
            ..Default::default()
        }
    }

    /// Non-empty NIR, the key every grouping filters on.
    pub fn nir(&self) -> Option<&str> {
        self.personal.nir.as_deref().filter(|s| !s.is_empty())
    }
}

/// Counters and per-line issues collected while parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseReport {
    pub total_lines: usize,
    pub tokens: usize,
    pub skipped_lines: usize,
    pub backfilled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<LineIssue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub total_employees: usize,
    pub total_establishments: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub parsed_at: OffsetDateTime,
    pub filename: String,
    pub parsing_method: String,
    pub report: ParseReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDsnData {
    pub company: Company,
    pub metadata: Metadata,
}

impl ParsedDsnData {
    pub fn employees(&self) -> impl Iterator<Item = &Employee> {
        self.company.employees()
    }
}
