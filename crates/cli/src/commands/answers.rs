use std::collections::BTreeMap;
use std::path::Path;
use std::process;

use dsn_core::{map_to_answers_for, reporting_period, AnswerValue};

use crate::commands::{load_declaration, print_json};
use crate::config::Config;
use crate::{report_error, OutputFormat};

fn read_overrides(path: &Path) -> Result<BTreeMap<String, AnswerValue>, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("error reading file '{}': {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("error parsing overrides in '{}': {}", path.display(), e))
}

pub(crate) fn cmd_answers(
    file: &Path,
    overrides: Option<&Path>,
    config: &Config,
    output: OutputFormat,
    quiet: bool,
) {
    let overrides = match overrides.map(read_overrides).transpose() {
        Ok(o) => o,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let data = load_declaration(file, config, output, quiet);
    let period = reporting_period(&data, &config.reporting);
    let mut answers = map_to_answers_for(&data, &period);
    if let Some(overrides) = &overrides {
        answers = answers.with_overrides(overrides);
    }

    match output {
        OutputFormat::Json => print_json(&answers),
        OutputFormat::Text => {
            for (id, value) in &answers.0 {
                match id.unit() {
                    Some(unit) if !matches!(value, AnswerValue::Breakdown(_)) => {
                        println!("{}: {} {}", id.label(), value, unit)
                    }
                    _ => println!("{}: {}", id.label(), value),
                }
            }
        }
    }
}
