use std::path::Path;

use dsn_core::period::format_day;
use dsn_core::reporting_period;

use crate::commands::{load_declaration, print_json};
use crate::config::Config;
use crate::OutputFormat;

pub(crate) fn cmd_period(file: &Path, config: &Config, output: OutputFormat, quiet: bool) {
    let data = load_declaration(file, config, output, quiet);
    let period = reporting_period(&data, &config.reporting);

    match output {
        OutputFormat::Json => print_json(&period),
        OutputFormat::Text => {
            let source = serde_json::to_value(period.source)
                .ok()
                .and_then(|v| v.as_str().map(str::to_owned))
                .unwrap_or_default();
            println!(
                "Reporting period: {} - {} ({})",
                format_day(period.start),
                format_day(period.end),
                source
            );
        }
    }
}
