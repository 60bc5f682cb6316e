//! Entity builder: walks the token stream and assembles
//! Company → Establishment → Employee.
//!
//! The walk is a single forward pass. DSN files declare the company identity
//! (`S21.G00.06`) and establishment address (`S21.G00.11`) once, ahead of the
//! first `S21.G00.30` employee marker, so those lines reach the builder before
//! any employee exists to receive them. [`backfill_leading_blocks`] runs a
//! second, bounded pass to recover them for the primary record.

use crate::error::LineIssue;
use crate::fields::{FieldMapper, IdentityBlock, COMPANY_FIELDS, ESTABLISHMENT_FIELDS};
use crate::lexer::Token;
use crate::model::{Company, Employee, Establishment};

/// Employee sub-block that receives the next data line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveBlock {
    #[default]
    None,
    Identity,
    Address,
    Personal,
    Contract,
    Salary,
    Period,
}

/// Header group → sub-block. Several groups may feed the same block.
const BLOCK_GROUPS: &[(&str, ActiveBlock)] = &[
    ("S21.G00.06", ActiveBlock::Identity),
    ("S21.G00.11", ActiveBlock::Address),
    ("S21.G00.30", ActiveBlock::Personal),
    ("S21.G00.40", ActiveBlock::Contract),
    ("S21.G00.62", ActiveBlock::Contract),
    ("S21.G00.50", ActiveBlock::Salary),
    ("S21.G00.51", ActiveBlock::Period),
];

impl ActiveBlock {
    /// Unknown groups map to `None`: data lines in that span are ignored.
    pub fn from_group(group: &str) -> Self {
        BLOCK_GROUPS
            .iter()
            .find(|(g, _)| *g == group)
            .map(|(_, b)| *b)
            .unwrap_or(ActiveBlock::None)
    }

    fn label(self) -> &'static str {
        match self {
            ActiveBlock::None => "unrouted",
            ActiveBlock::Identity => "identity",
            ActiveBlock::Address => "address",
            ActiveBlock::Personal => "personal",
            ActiveBlock::Contract => "contract",
            ActiveBlock::Salary => "salary",
            ActiveBlock::Period => "period",
        }
    }
}

/// Output of the builder passes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityTree {
    pub company: Company,
    pub issues: Vec<LineIssue>,
    /// Set when the backfill pass ran.
    pub backfilled: bool,
}

impl EntityTree {
    pub fn employee_count(&self) -> usize {
        self.company
            .establishments
            .iter()
            .map(|e| e.employees.len())
            .sum()
    }

    fn primary_mut(&mut self) -> Option<&mut Employee> {
        self.company
            .establishments
            .iter_mut()
            .flat_map(|e| e.employees.iter_mut())
            .next()
            .filter(|e| e.is_primary_record)
    }
}

// ──────────────────────────────────────────────
// Forward pass
// ──────────────────────────────────────────────

struct Builder {
    company: Company,
    /// Index of the open employee in the last establishment.
    current_employee: Option<usize>,
    active: ActiveBlock,
    /// Set once the primary record has been handed out.
    primary_allocated: bool,
    issues: Vec<LineIssue>,
}

impl Builder {
    fn new() -> Self {
        Builder {
            company: Company::default(),
            current_employee: None,
            active: ActiveBlock::None,
            primary_allocated: false,
            issues: Vec::new(),
        }
    }

    fn process(&mut self, token: &Token) -> Result<(), LineIssue> {
        if token.is_header {
            self.on_header(token);
            return Ok(());
        }

        match token.block.as_str() {
            "S10" => {
                self.company
                    .attributes
                    .apply_with(COMPANY_FIELDS, &token.code, &token.value);
            }
            "S20" => {
                self.current_establishment(token)
                    .attributes
                    .apply_with(ESTABLISHMENT_FIELDS, &token.code, &token.value);
            }
            "S21" => self.on_employee_data(token)?,
            other => {
                log::debug!(
                    "line {}: ignoring {} data outside known blocks",
                    token.line,
                    other
                );
            }
        }
        Ok(())
    }

    fn on_header(&mut self, token: &Token) {
        self.active = ActiveBlock::from_group(&token.group);

        match token.block.as_str() {
            "S20" if token.code == token.group => {
                self.company.establishments.push(Establishment::default());
                self.current_employee = None;
            }
            "S21" if token.is_employee_marker() => self.start_employee(token),
            _ => {}
        }
    }

    /// Last establishment, created on demand when none is open yet.
    fn current_establishment(&mut self, token: &Token) -> &mut Establishment {
        if self.company.establishments.is_empty() {
            log::warn!(
                "line {}: {} with no open establishment, creating one",
                token.line,
                token.code
            );
            self.company.establishments.push(Establishment::default());
        }
        let last = self.company.establishments.len() - 1;
        &mut self.company.establishments[last]
    }

    fn start_employee(&mut self, token: &Token) {
        let is_primary = !self.primary_allocated;
        self.primary_allocated = true;

        let establishment = self.current_establishment(token);
        let id = u32::try_from(establishment.employees.len() + 1).unwrap_or(u32::MAX);

        establishment.employees.push(Employee::new(id, is_primary));
        let idx = establishment.employees.len() - 1;
        self.current_employee = Some(idx);
    }

    fn on_employee_data(&mut self, token: &Token) -> Result<(), LineIssue> {
        let active = self.active;
        let employee = match self.current_employee {
            Some(idx) => self
                .company
                .establishments
                .last_mut()
                .and_then(|e| e.employees.get_mut(idx)),
            None => None,
        };

        let Some(employee) = employee else {
            return match active {
                ActiveBlock::None => Ok(()),
                ActiveBlock::Identity | ActiveBlock::Address => {
                    log::debug!(
                        "line {}: {} ahead of first employee, left for backfill",
                        token.line,
                        token.code
                    );
                    Ok(())
                }
                _ => Err(LineIssue::no_open_employee(
                    token.line,
                    &format!("{},'{}'", token.code, token.value),
                    active.label(),
                )),
            };
        };

        match active {
            ActiveBlock::None => {
                log::debug!("line {}: {} not routed to any block", token.line, token.code);
            }
            ActiveBlock::Identity => {
                if let Some(identity) = employee.identity.as_mut() {
                    identity.apply(&token.code, &token.value);
                }
            }
            ActiveBlock::Address => {
                if let Some(address) = employee.address.as_mut() {
                    address.apply(&token.code, &token.value);
                }
            }
            ActiveBlock::Personal => employee.personal.apply(&token.code, &token.value),
            ActiveBlock::Contract => employee.contract.apply(&token.code, &token.value),
            ActiveBlock::Salary => employee.salary.apply(&token.code, &token.value),
            ActiveBlock::Period => employee.period.apply(&token.code, &token.value),
        }
        Ok(())
    }
}

/// Forward pass over the token stream.
///
/// Never fails: a line that cannot be placed is logged with its line number
/// and content, recorded in [`EntityTree::issues`] and skipped.
pub fn build_entity_tree(tokens: &[Token]) -> EntityTree {
    let mut builder = Builder::new();

    for token in tokens {
        if let Err(issue) = builder.process(token) {
            log::warn!("skipping {}", issue);
            builder.issues.push(issue);
        }
    }

    EntityTree {
        company: builder.company,
        issues: builder.issues,
        backfilled: false,
    }
}

// ──────────────────────────────────────────────
// Backfill pass
// ──────────────────────────────────────────────

/// Recover identity/address lines that precede the first employee marker.
///
/// Runs only when the primary record exists and its identity block is still
/// empty after the forward pass. Stops at the first `S21.G00.30` marker, so
/// the cost is bounded by the length of the file prefix.
pub fn backfill_leading_blocks(tokens: &[Token], mut tree: EntityTree) -> EntityTree {
    let ran = match tree.primary_mut() {
        Some(primary) if primary.identity.as_ref().is_some_and(IdentityBlock::is_empty) => {
            fill_leading_blocks(tokens, primary);
            true
        }
        _ => false,
    };
    tree.backfilled = ran;
    tree
}

fn fill_leading_blocks(tokens: &[Token], primary: &mut Employee) {
    let mut active = ActiveBlock::None;
    for token in tokens {
        if token.is_employee_marker() {
            break;
        }
        if token.is_header {
            active = ActiveBlock::from_group(&token.group);
            continue;
        }
        if token.block != "S21" {
            continue;
        }
        match active {
            ActiveBlock::Identity => {
                if let Some(identity) = primary.identity.as_mut() {
                    identity.apply(&token.code, &token.value);
                }
            }
            ActiveBlock::Address => {
                if let Some(address) = primary.address.as_mut() {
                    address.apply(&token.code, &token.value);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn build(src: &str) -> EntityTree {
        let tokens = lex(src).tokens;
        let tree = build_entity_tree(&tokens);
        backfill_leading_blocks(&tokens, tree)
    }

    #[test]
    fn active_block_from_group() {
        assert_eq!(ActiveBlock::from_group("S21.G00.30"), ActiveBlock::Personal);
        assert_eq!(ActiveBlock::from_group("S21.G00.62"), ActiveBlock::Contract);
        assert_eq!(ActiveBlock::from_group("S21.G00.78"), ActiveBlock::None);
    }

    #[test]
    fn two_employees_without_establishment_header() {
        let tree = build(
            "S21.G00.30,''\n\
             S21.G00.30.001,'123456789'\n\
             S21.G00.30,''\n\
             S21.G00.30.001,'987654321'\n",
        );
        assert_eq!(tree.company.establishments.len(), 1);
        let employees = &tree.company.establishments[0].employees;
        assert_eq!(employees.len(), 2);
        assert_eq!(employees[0].id, 1);
        assert_eq!(employees[1].id, 2);
        assert_eq!(employees[0].personal.nir.as_deref(), Some("123456789"));
        assert_eq!(employees[1].personal.nir.as_deref(), Some("987654321"));
        assert!(employees[0].identity.as_ref().is_some_and(|i| i.is_empty()));
        assert!(employees[0].address.as_ref().is_some_and(|a| a.is_empty()));
        assert!(employees[1].identity.is_none());
        assert!(tree.issues.is_empty());
    }

    #[test]
    fn backfill_recovers_leading_identity_and_address() {
        let src = "S20.G00.05,''\n\
                   S20.G00.05.001,'01'\n\
                   S21.G00.06,''\n\
                   S21.G00.06.001,'123456789'\n\
                   S21.G00.06.003,'6201Z'\n\
                   S21.G00.11,''\n\
                   S21.G00.11.001,'00012'\n\
                   S21.G00.11.005,'LYON'\n\
                   S21.G00.30,''\n\
                   S21.G00.30.001,'1111'\n";
        let tokens = lex(src).tokens;

        let forward = build_entity_tree(&tokens);
        let primary = &forward.company.establishments[0].employees[0];
        assert!(primary.identity.as_ref().is_some_and(|i| i.is_empty()));

        let tree = backfill_leading_blocks(&tokens, forward);
        assert!(tree.backfilled);
        let primary = &tree.company.establishments[0].employees[0];
        let identity = primary.identity.as_ref().unwrap();
        assert_eq!(identity.siren.as_deref(), Some("123456789"));
        assert_eq!(identity.ape_code.as_deref(), Some("6201Z"));
        let address = primary.address.as_ref().unwrap();
        assert_eq!(address.nic.as_deref(), Some("00012"));
        assert_eq!(address.city.as_deref(), Some("LYON"));
    }

    #[test]
    fn backfill_stops_at_first_marker() {
        let tree = build(
            "S21.G00.30,''\n\
             S21.G00.30.001,'1'\n\
             S21.G00.06,''\n\
             S21.G00.06.001,'999'\n",
        );
        // Identity lines after the marker are written during the forward pass.
        let primary = &tree.company.establishments[0].employees[0];
        assert_eq!(
            primary.identity.as_ref().unwrap().siren.as_deref(),
            Some("999")
        );
        assert!(!tree.backfilled);
    }

    #[test]
    fn identity_lines_never_leak_to_later_employees() {
        let tree = build(
            "S21.G00.30,''\n\
             S21.G00.30.001,'1'\n\
             S21.G00.30,''\n\
             S21.G00.30.001,'2'\n\
             S21.G00.06,''\n\
             S21.G00.06.001,'LEAK'\n\
             S21.G00.11,''\n\
             S21.G00.11.001,'LEAK'\n",
        );
        let employees = &tree.company.establishments[0].employees;
        assert!(employees[1].identity.is_none());
        assert!(employees[1].address.is_none());
        assert!(employees[0].identity.as_ref().unwrap().is_empty());
    }

    #[test]
    fn each_establishment_header_opens_a_new_one_and_ids_restart() {
        let tree = build(
            "S20.G00.05,''\n\
             S20.G00.05.010,'11111111100011'\n\
             S21.G00.30,''\n\
             S21.G00.30,''\n\
             S20.G00.05,''\n\
             S20.G00.05.010,'22222222200022'\n\
             S21.G00.30,''\n",
        );
        let est = &tree.company.establishments;
        assert_eq!(est.len(), 2);
        assert_eq!(est[0].attributes.get("establishment_siret"), Some("11111111100011"));
        assert_eq!(est[1].attributes.get("establishment_siret"), Some("22222222200022"));
        assert_eq!(est[0].employees.iter().map(|e| e.id).collect::<Vec<_>>(), [1, 2]);
        assert_eq!(est[1].employees.iter().map(|e| e.id).collect::<Vec<_>>(), [1]);
        assert!(est[0].employees[0].is_primary_record);
        assert!(!est[1].employees[0].is_primary_record);
        assert!(est[1].employees[0].identity.is_none());
        assert_eq!(tree.employee_count(), 3);
    }

    #[test]
    fn primary_record_survives_empty_leading_establishments() {
        let tree = build(
            "S20.G00.05,''\n\
             S20.G00.07,''\n\
             S21.G00.06,''\n\
             S21.G00.06.001,'123456789'\n\
             S21.G00.30,''\n\
             S21.G00.30,''\n",
        );
        let est = &tree.company.establishments;
        assert_eq!(est.len(), 2);
        assert!(est[0].employees.is_empty());
        let primary = &est[1].employees[0];
        assert!(primary.is_primary_record);
        assert_eq!(
            primary.identity.as_ref().unwrap().siren.as_deref(),
            Some("123456789")
        );
        assert!(!est[1].employees[1].is_primary_record);
    }

    #[test]
    fn company_lines_fill_company_attributes() {
        let tree = build(
            "S10.G00.00,''\n\
             S10.G00.00.001,'PAYROLL'\n\
             S10.G00.01,''\n\
             S10.G00.01.003,'ACME'\n\
             S10.G00.01.042,'x'\n",
        );
        assert_eq!(tree.company.attributes.get("software_name"), Some("PAYROLL"));
        assert_eq!(tree.company.name(), Some("ACME"));
        assert_eq!(tree.company.attributes.get("S10.G00.01.042"), Some("x"));
        assert!(tree.company.establishments.is_empty());
    }

    #[test]
    fn sub_blocks_route_by_last_header() {
        let tree = build(
            "S21.G00.30,''\n\
             S21.G00.30.001,'1'\n\
             S21.G00.40,''\n\
             S21.G00.40.001,'20240101'\n\
             S21.G00.40.007,'01'\n\
             S21.G00.50,''\n\
             S21.G00.50.001,'20240131'\n\
             S21.G00.51,''\n\
             S21.G00.51.001,'20240101'\n\
             S21.G00.51.002,'20240131'\n\
             S21.G00.62,''\n\
             S21.G00.62.001,'20240630'\n",
        );
        let e = &tree.company.establishments[0].employees[0];
        assert_eq!(e.contract.start_date.as_deref(), Some("20240101"));
        assert_eq!(e.contract.contract_nature.as_deref(), Some("01"));
        assert_eq!(e.contract.termination_date.as_deref(), Some("20240630"));
        assert_eq!(e.salary.payment_date.as_deref(), Some("20240131"));
        assert_eq!(e.period.start_date.as_deref(), Some("20240101"));
        assert_eq!(e.period.end_date.as_deref(), Some("20240131"));
        assert!(e.personal.extra.is_empty());
    }

    #[test]
    fn unknown_group_span_is_ignored() {
        let tree = build(
            "S21.G00.30,''\n\
             S21.G00.30.001,'1'\n\
             S21.G00.78,''\n\
             S21.G00.78.001,'ignored'\n",
        );
        let e = &tree.company.establishments[0].employees[0];
        assert!(e.personal.extra.is_empty());
        assert!(e.contract.is_empty());
        assert!(tree.issues.is_empty());
    }

    #[test]
    fn employee_data_before_any_marker_is_an_issue() {
        let tree = build("S21.G00.40,''\nS21.G00.40.001,'20240101'\n");
        assert_eq!(tree.issues.len(), 1);
        assert_eq!(tree.issues[0].line, 2);
        assert_eq!(tree.issues[0].content, "S21.G00.40.001,'20240101'");
        assert_eq!(tree.employee_count(), 0);
    }

    #[test]
    fn establishment_data_without_header_creates_one() {
        let tree = build("S20.G00.05.001,'01'\n");
        assert_eq!(tree.company.establishments.len(), 1);
        assert_eq!(
            tree.company.establishments[0].attributes.get("declaration_nature"),
            Some("01")
        );
    }

    #[test]
    fn empty_establishment_field_does_not_open_establishment() {
        let tree = build("S20.G00.05,''\nS20.G00.05.003,''\nS21.G00.30,''\n");
        assert_eq!(tree.company.establishments.len(), 1);
        assert_eq!(tree.employee_count(), 1);
    }
}
