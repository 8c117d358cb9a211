use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::commands::load_model;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;
use crate::report::ModelReport;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Inspect Declarations",
        commands: &[
            "fieldspec inspect models/user.toml                 # Table of every member",
            "fieldspec --output json inspect models/user.toml   # Machine-readable descriptors",
        ],
    },
    ExampleGroup {
        title: "Diagnostics",
        commands: &["RUST_LOG=fieldspec=debug fieldspec inspect models/user.toml   # Trace resolution"],
    },
];

#[derive(Args)]
pub struct InspectArgs {
    /// Declaration file (TOML)
    pub file: PathBuf,
}

pub fn handle_inspect(args: InspectArgs, output: &OutputManager) -> Result<()> {
    let model = load_model(&args.file, output)?;
    let report = ModelReport::new(&model);

    if !output.is_json() {
        output.heading(&format!("Model {}", report.model));
    }
    output.display(&report)?;

    if !output.is_json() {
        for warning in &report.warnings {
            output.warning(&format!("{}: {}", warning.field, warning.message));
        }
    }

    Ok(())
}
