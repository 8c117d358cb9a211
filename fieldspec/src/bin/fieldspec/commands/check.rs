use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Table};
use serde::Serialize;

use fieldspec::{DeclarationError, ModelDeclaration};

use crate::examples::ExampleGroup;
use crate::output::{GlobalOptions, OutputFormat, OutputManager, TableDisplay, add_table_header, create_table};
use crate::report::{ModelReport, WarningRow};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Validate Declarations",
    commands: &[
        "fieldspec check models/user.toml         # Exit status 1 on the first configuration error",
        "fieldspec -q check models/*.toml         # Only print errors",
    ],
}];

#[derive(Args)]
pub struct CheckArgs {
    /// Declaration files (TOML)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
struct CheckOutcome {
    file: String,
    model: Option<String>,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    warnings: Vec<WarningRow>,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    outcomes: Vec<CheckOutcome>,
}

impl TableDisplay for CheckReport {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = create_table(options);
        add_table_header(options, &mut table, &["File", "Model", "Status", "Warnings"]);
        for outcome in &self.outcomes {
            let status = match (&outcome.code, &outcome.error) {
                (Some(code), Some(error)) => format!("error[{code}]: {error}"),
                (None, Some(error)) => format!("error: {error}"),
                _ => "ok".to_string(),
            };
            table.add_row(vec![
                Cell::new(&outcome.file),
                Cell::new(outcome.model.as_deref().unwrap_or("-")),
                Cell::new(status),
                Cell::new(outcome.warnings.len().to_string()),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.outcomes
            .iter()
            .map(|outcome| {
                let status = if outcome.ok { "ok" } else { "error" };
                format!("{}: {status} ({} warnings)", outcome.file, outcome.warnings.len())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn handle_check(args: CheckArgs, output: &OutputManager) -> Result<()> {
    let mut outcomes = Vec::with_capacity(args.files.len());

    for path in &args.files {
        output.verbose(&format!("Checking {}", path.display()));
        let file = path.display().to_string();
        let outcome = match ModelDeclaration::from_path(path).and_then(ModelDeclaration::resolve) {
            Ok(model) => {
                let report = ModelReport::new(&model);
                CheckOutcome {
                    file,
                    model: Some(report.model),
                    ok: true,
                    code: None,
                    error: None,
                    warnings: report.warnings,
                }
            }
            Err(err) => CheckOutcome {
                file,
                model: None,
                ok: false,
                code: err.configuration_error().map(|source| source.code()),
                error: Some(describe(&err)),
                warnings: Vec::new(),
            },
        };
        outcomes.push(outcome);
    }

    let failed = outcomes.iter().filter(|outcome| !outcome.ok).count();
    let report = CheckReport { outcomes };

    if output.options.output_format == OutputFormat::Table {
        summarize(&report, output);
    } else {
        output.display(&report)?;
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} declaration files failed", report.outcomes.len());
    }
    Ok(())
}

fn summarize(report: &CheckReport, output: &OutputManager) {
    for outcome in &report.outcomes {
        match (&outcome.model, &outcome.error) {
            (Some(model), None) if outcome.warnings.is_empty() => {
                output.success(&format!("{}: `{model}` is valid", outcome.file));
            }
            (Some(model), None) => {
                output.warning(&format!(
                    "{}: `{model}` is valid with {} warnings",
                    outcome.file,
                    outcome.warnings.len()
                ));
                for warning in &outcome.warnings {
                    output.bullet(&format!("{}: {}", warning.field, warning.message));
                }
            }
            (_, Some(error)) => {
                let code = outcome.code.map(|code| format!("[{code}] ")).unwrap_or_default();
                output.error(&format!("{}: {code}{error}", outcome.file));
            }
            (None, None) => {}
        }
    }
}

/// The error followed by its chain of causes.
fn describe(err: &DeclarationError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_includes_the_configuration_error() {
        let text = "name = \"X\"\n[fields.a]\nannotation = \"int\"\nfield = { regex = \"^a\" }\n";
        let err = ModelDeclaration::from_toml_str(text).unwrap().resolve().unwrap_err();
        assert_eq!(
            describe(&err),
            "field `a` is misconfigured: `regex` is removed, use `pattern` instead"
        );
    }
}
