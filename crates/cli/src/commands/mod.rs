pub(crate) mod answers;
pub(crate) mod parse;
pub(crate) mod period;

use std::path::Path;
use std::process;

use dsn_core::ParsedDsnData;

use crate::config::Config;
use crate::input::read_input;
use crate::{report_error, OutputFormat};

/// Run the upload checks and the parser, exiting with status 1 on failure.
pub(crate) fn load_declaration(
    file: &Path,
    config: &Config,
    output: OutputFormat,
    quiet: bool,
) -> ParsedDsnData {
    let bytes = match read_input(file, &config.input) {
        Ok(b) => b,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };

    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    match dsn_core::parse_bytes(&bytes, &filename) {
        Ok(data) => data,
        Err(e) => {
            match output {
                OutputFormat::Json => {
                    let err_json = serde_json::to_string_pretty(&e.to_json_value())
                        .unwrap_or_else(|_| format!("{{\"error\": \"{:?}\"}}", e));
                    eprintln!("{}", err_json);
                }
                OutputFormat::Text => {
                    if !quiet {
                        eprintln!("parse error: {}", e);
                    }
                }
            }
            process::exit(1);
        }
    }
}

/// Pretty-print `value` as JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) {
    let pretty = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("serialization error: {}", e));
    println!("{}", pretty);
}
