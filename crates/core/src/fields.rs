//! Field mappers: static DSN code → field name tables.
//!
//! Every block record keeps its known codes as named optional fields and
//! everything else in `extra`, keyed by the raw code, so nothing in the
//! source file is dropped. Values are stored as-is; interpretation (dates,
//! amounts) is left to consumers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Something a data line can be written into.
pub trait FieldMapper {
    /// Write `value` under the field mapped from `code`, or under `code`
    /// itself when the code is unknown.
    fn apply(&mut self, code: &str, value: &str);
}

macro_rules! dsn_block {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $code:literal => $field:ident ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<String>,
            )*
            /// Unrecognised codes, keyed by raw code.
            #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
            pub extra: BTreeMap<String, String>,
        }

        impl $name {
            /// `(code, field name)` pairs recognised by this block.
            pub const FIELDS: &'static [(&'static str, &'static str)] = &[
                $( ($code, stringify!($field)), )*
            ];

            /// True when no field, named or extra, has been written.
            pub fn is_empty(&self) -> bool {
                $( self.$field.is_none() && )* self.extra.is_empty()
            }
        }

        impl FieldMapper for $name {
            fn apply(&mut self, code: &str, value: &str) {
                match code {
                    $( $code => self.$field = Some(value.to_owned()), )*
                    _ => {
                        self.extra.insert(code.to_owned(), value.to_owned());
                    }
                }
            }
        }
    };
}

dsn_block! {
    /// Company identity (`S21.G00.06`), kept on the primary record only.
    IdentityBlock {
        "S21.G00.06.001" => siren,
        "S21.G00.06.002" => nic,
        "S21.G00.06.003" => ape_code,
        "S21.G00.06.004" => street,
        "S21.G00.06.005" => postal_code,
        "S21.G00.06.006" => city,
        "S21.G00.06.009" => average_headcount,
    }
}

dsn_block! {
    /// Establishment address (`S21.G00.11`), kept on the primary record only.
    AddressBlock {
        "S21.G00.11.001" => nic,
        "S21.G00.11.002" => ape_code,
        "S21.G00.11.003" => street,
        "S21.G00.11.004" => postal_code,
        "S21.G00.11.005" => city,
        "S21.G00.11.008" => headcount_end_of_period,
    }
}

dsn_block! {
    /// Individual (`S21.G00.30`).
    PersonalBlock {
        "S21.G00.30.001" => nir,
        "S21.G00.30.002" => last_name,
        "S21.G00.30.003" => usual_name,
        "S21.G00.30.004" => first_names,
        "S21.G00.30.005" => sex_code,
        "S21.G00.30.006" => birth_date,
        "S21.G00.30.007" => birth_place,
        "S21.G00.30.008" => street,
        "S21.G00.30.009" => postal_code,
        "S21.G00.30.010" => city,
        "S21.G00.30.011" => country_code,
        "S21.G00.30.014" => birth_department,
        "S21.G00.30.015" => birth_country,
    }
}

dsn_block! {
    /// Contract (`S21.G00.40`) and end of contract (`S21.G00.62`).
    ContractBlock {
        "S21.G00.40.001" => start_date,
        "S21.G00.40.002" => employment_status,
        "S21.G00.40.004" => pcs_code,
        "S21.G00.40.006" => job_title,
        "S21.G00.40.007" => contract_nature,
        "S21.G00.40.009" => contract_number,
        "S21.G00.40.010" => end_date,
        "S21.G00.40.013" => working_time_ratio,
        "S21.G00.40.017" => collective_agreement,
        "S21.G00.40.019" => workplace_siret,
        "S21.G00.62.001" => termination_date,
        "S21.G00.62.002" => termination_reason,
    }
}

dsn_block! {
    /// Payment (`S21.G00.50`).
    SalaryBlock {
        "S21.G00.50.001" => payment_date,
        "S21.G00.50.002" => net_taxable_pay,
        "S21.G00.50.004" => payment_number,
        "S21.G00.50.009" => net_paid,
    }
}

dsn_block! {
    /// Remuneration period (`S21.G00.51`).
    PeriodBlock {
        "S21.G00.51.001" => start_date,
        "S21.G00.51.002" => end_date,
        "S21.G00.51.003" => contract_number,
        "S21.G00.51.010" => pay_type,
        "S21.G00.51.011" => hours,
        "S21.G00.51.013" => amount,
    }
}

impl ContractBlock {
    /// Actual termination date when declared, else the planned end date.
    pub fn effective_end_date(&self) -> Option<&str> {
        self.termination_date
            .as_deref()
            .or(self.end_date.as_deref())
            .filter(|s| !s.is_empty())
    }
}

/// Named company attributes (`S10`).
pub const COMPANY_FIELDS: &[(&str, &str)] = &[
    ("S10.G00.00.001", "software_name"),
    ("S10.G00.00.002", "software_vendor"),
    ("S10.G00.00.003", "software_version"),
    ("S10.G00.00.005", "test_flag"),
    ("S10.G00.00.006", "norm_version"),
    ("S10.G00.01.001", "siren"),
    ("S10.G00.01.002", "nic"),
    ("S10.G00.01.003", "company_name"),
    ("S10.G00.01.004", "street"),
    ("S10.G00.01.005", "postal_code"),
    ("S10.G00.01.006", "city"),
    ("S10.G00.02.002", "contact_name"),
    ("S10.G00.02.004", "contact_email"),
    ("S10.G00.02.005", "contact_phone"),
];

/// Named establishment attributes (`S20`).
pub const ESTABLISHMENT_FIELDS: &[(&str, &str)] = &[
    ("S20.G00.05.001", "declaration_nature"),
    ("S20.G00.05.002", "declaration_type"),
    ("S20.G00.05.003", "fraction"),
    ("S20.G00.05.004", "order_number"),
    ("S20.G00.05.005", "period_start"),
    ("S20.G00.05.007", "file_date"),
    ("S20.G00.05.010", "establishment_siret"),
];

/// Look up the field name for `code` in `table`.
pub fn field_name(table: &[(&'static str, &'static str)], code: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Free-form attribute map backed by a code table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(pub BTreeMap<String, String>);

impl Attributes {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Write `value` under the name `table` gives `code`, else under `code`.
    pub fn apply_with(&mut self, table: &[(&'static str, &'static str)], code: &str, value: &str) {
        let key = field_name(table, code).unwrap_or(code);
        self.0.insert(key.to_owned(), value.to_owned());
    }
}
