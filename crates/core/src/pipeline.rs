//! Entry points composing lexer → builder → backfill, and the answer mapping.

use time::{Date, OffsetDateTime};

use crate::answers::{map_answers, MappedAnswers};
use crate::builder::{backfill_leading_blocks, build_entity_tree};
use crate::error::ParseError;
use crate::lexer;
use crate::model::{Employee, Metadata, ParseReport, ParsedDsnData, PARSING_METHOD};
use crate::period::{resolve_reporting_period, ReportingPeriod, ResolverOptions};

/// Parse DSN text into the entity tree.
///
/// Malformed or misplaced lines never fail the parse; they are skipped and
/// listed in [`ParseReport::issues`]. Only input with no content at all is
/// rejected.
pub fn parse(content: &str, filename: &str) -> Result<ParsedDsnData, ParseError> {
    if content.trim().is_empty() {
        return Err(ParseError::Empty {
            filename: filename.to_owned(),
        });
    }

    let lexed = lexer::lex(content);
    let tree = build_entity_tree(&lexed.tokens);
    let tree = backfill_leading_blocks(&lexed.tokens, tree);

    let total_employees = tree.employee_count();
    let total_establishments = tree.company.establishments.len();

    let mut issues = lexed.issues;
    issues.extend(tree.issues);
    issues.sort_by_key(|i| i.line);

    let report = ParseReport {
        total_lines: lexed.total_lines,
        tokens: lexed.tokens.len(),
        skipped_lines: issues.len(),
        backfilled: tree.backfilled,
        issues,
    };

    log::info!(
        "parsed '{}': {} establishment(s), {} employee(s), {} line(s) skipped",
        filename,
        total_establishments,
        total_employees,
        report.skipped_lines
    );

    Ok(ParsedDsnData {
        company: tree.company,
        metadata: Metadata {
            total_employees,
            total_establishments,
            parsed_at: OffsetDateTime::now_utc(),
            filename: filename.to_owned(),
            parsing_method: PARSING_METHOD.to_owned(),
            report,
        },
    })
}

/// Decode `bytes` as UTF-8, then [`parse`]. Binary data (any NUL byte) and
/// invalid UTF-8 are terminal.
pub fn parse_bytes(bytes: &[u8], filename: &str) -> Result<ParsedDsnData, ParseError> {
    if let Some(offset) = bytes.iter().position(|&b| b == 0) {
        return Err(ParseError::Binary {
            filename: filename.to_owned(),
            offset,
        });
    }
    let content = std::str::from_utf8(bytes).map_err(|source| ParseError::Decode {
        filename: filename.to_owned(),
        source,
    })?;
    parse(content.strip_prefix('\u{feff}').unwrap_or(content), filename)
}

/// Reporting window for a parsed file, resolved against `today`.
pub fn reporting_period_at(
    data: &ParsedDsnData,
    today: Date,
    options: &ResolverOptions,
) -> ReportingPeriod {
    let employees: Vec<&Employee> = data.employees().collect();
    resolve_reporting_period(&employees, today, options)
}

/// Reporting window for a parsed file, resolved against today's UTC date.
pub fn reporting_period(data: &ParsedDsnData, options: &ResolverOptions) -> ReportingPeriod {
    reporting_period_at(data, OffsetDateTime::now_utc().date(), options)
}

/// Answers for an explicit reporting window.
pub fn map_to_answers_for(data: &ParsedDsnData, period: &ReportingPeriod) -> MappedAnswers {
    let employees: Vec<&Employee> = data.employees().collect();
    map_answers(&data.company, &employees, period)
}

/// Compute every reporting answer with default resolver options.
pub fn map_to_answers(data: &ParsedDsnData) -> MappedAnswers {
    let period = reporting_period(data, &ResolverOptions::default());
    map_to_answers_for(data, &period)
}
