use std::path::Path;

use crate::commands::{load_declaration, print_json};
use crate::config::Config;
use crate::OutputFormat;

pub(crate) fn cmd_parse(file: &Path, config: &Config, output: OutputFormat, quiet: bool) {
    let data = load_declaration(file, config, output, quiet);

    match output {
        OutputFormat::Json => print_json(&data),
        OutputFormat::Text => {
            let company = &data.company;
            let report = &data.metadata.report;
            println!("File:           {}", data.metadata.filename);
            println!("Company:        {}", company.name().unwrap_or("(unnamed)"));
            println!(
                "SIRET:          {}",
                company.siret().unwrap_or_else(|| "(not declared)".to_owned())
            );
            println!("Establishments: {}", data.metadata.total_establishments);
            println!("Employees:      {}", data.metadata.total_employees);
            println!(
                "Lines:          {} read, {} accepted, {} skipped",
                report.total_lines, report.tokens, report.skipped_lines
            );

            if !quiet {
                for (idx, establishment) in company.establishments.iter().enumerate() {
                    println!();
                    println!(
                        "Establishment {} ({})",
                        idx + 1,
                        establishment
                            .attributes
                            .get("establishment_siret")
                            .unwrap_or("no SIRET")
                    );
                    for e in &establishment.employees {
                        let name = [
                            e.personal.first_names.as_deref(),
                            e.personal.last_name.as_deref(),
                        ]
                        .into_iter()
                        .flatten()
                        .collect::<Vec<_>>()
                        .join(" ");
                        println!(
                            "  #{} {}{}",
                            e.id,
                            if name.is_empty() { "(no name)" } else { &name },
                            if e.is_primary_record { " [primary]" } else { "" }
                        );
                    }
                }
                if !report.issues.is_empty() {
                    println!();
                    println!("Skipped lines:");
                    for issue in &report.issues {
                        println!("  {}", issue);
                    }
                }
            }
        }
    }
}
