//! dsn-core: DSN social-declaration parser and reporting-answer mapper.
//!
//! Turns the `CODE,'VALUE'` lines of a DSN file into a
//! Company → Establishment → Employee tree, resolves the reporting period
//! the file covers, and derives a fixed set of reporting answers.
//!
//! # Public API
//!
//! - [`parse()`] / [`parse_bytes()`] -- text or raw bytes to [`ParsedDsnData`]
//! - [`map_to_answers()`] -- [`ParsedDsnData`] to [`MappedAnswers`]
//! - [`resolve_reporting_period()`] -- reporting window from employee dates
//!
//! The individual stages ([`lexer::lex`], [`build_entity_tree`],
//! [`backfill_leading_blocks`]) are exported for callers that want to run
//! them selectively.

pub mod answers;
pub mod builder;
pub mod error;
pub mod fields;
pub mod lexer;
pub mod model;
pub mod period;
pub mod pipeline;

// ── Convenience re-exports: key types ────────────────────────────────

pub use answers::{AnswerValue, MappedAnswers, QuestionId};
pub use builder::{ActiveBlock, EntityTree};
pub use error::{IssueKind, LineIssue, ParseError};
pub use lexer::Token;
pub use model::{Company, Employee, Establishment, Metadata, ParseReport, ParsedDsnData};
pub use period::{PeriodSource, ReportingPeriod, ResolverOptions};

// ── Convenience re-exports: pipeline entry points ────────────────────

pub use builder::{backfill_leading_blocks, build_entity_tree};
pub use period::resolve_reporting_period;
pub use pipeline::{
    map_to_answers, map_to_answers_for, parse, parse_bytes, reporting_period, reporting_period_at,
};
