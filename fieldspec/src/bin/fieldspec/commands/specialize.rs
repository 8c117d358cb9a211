use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Table};
use serde::Serialize;

use fieldspec::{FieldInfo, TypeExpr, TypevarsMap};

use crate::commands::load_model;
use crate::examples::ExampleGroup;
use crate::output::{GlobalOptions, OutputManager, TableDisplay, add_table_header, create_table};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Generic Specialisation",
    commands: &[
        "fieldspec specialize models/page.toml --param T=int",
        "fieldspec specialize models/pair.toml --param K=str --param V='List[int]'",
    ],
}];

#[derive(Args)]
pub struct SpecializeArgs {
    /// Declaration file (TOML)
    pub file: PathBuf,

    /// Type parameter assignment, e.g. `T=int` (repeatable)
    #[arg(long = "param", value_name = "NAME=TYPE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (name, annotation) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=TYPE, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing parameter name in `{raw}`"));
    }
    Ok((name.to_string(), annotation.trim().to_string()))
}

#[derive(Debug, Serialize)]
struct SpecializedField {
    name: String,
    generic: String,
    specialized: String,
}

#[derive(Debug, Serialize)]
struct SpecializationReport {
    model: String,
    params: Vec<(String, String)>,
    fields: Vec<SpecializedField>,
}

impl TableDisplay for SpecializationReport {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = create_table(options);
        add_table_header(options, &mut table, &["Field", "Generic", "Specialized"]);
        for field in &self.fields {
            table.add_row(vec![
                Cell::new(&field.name),
                Cell::new(&field.generic),
                Cell::new(&field.specialized),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.fields
            .iter()
            .map(|field| format!("{}.{}: {}", self.model, field.name, field.specialized))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn render(info: &FieldInfo) -> String {
    info.rebuild_annotation()
        .map_or_else(|| "-".to_string(), |annotation| annotation.to_string())
}

pub fn handle_specialize(args: SpecializeArgs, output: &OutputManager) -> Result<()> {
    let model = load_model(&args.file, output)?;

    let mut typevars_map = TypevarsMap::new();
    for (name, text) in &args.params {
        let annotation = TypeExpr::parse(text).with_context(|| format!("invalid type for parameter `{name}`"))?;
        typevars_map.insert(name.clone(), annotation.resolve_names(&model.namespace));
    }

    let specialized = model.specialize(&typevars_map);
    let fields = model
        .fields
        .iter()
        .zip(&specialized.fields)
        .map(|((name, generic), (_, concrete))| SpecializedField {
            name: name.clone(),
            generic: render(generic),
            specialized: render(concrete),
        })
        .collect();

    let report = SpecializationReport {
        model: model.name.clone(),
        params: args.params,
        fields,
    };

    if !output.is_json() {
        let params: Vec<String> = report.params.iter().map(|(name, text)| format!("{name}={text}")).collect();
        output.heading(&format!("{}[{}]", report.model, params.join(", ")));
    }
    output.display(&report)?;

    let unresolved: Vec<&str> = specialized
        .fields
        .iter()
        .filter(|(_, info)| info.annotation.as_ref().is_some_and(TypeExpr::has_type_vars))
        .map(|(name, _)| name.as_str())
        .collect();
    if !unresolved.is_empty() && !output.is_json() {
        output.warning(&format!("type variables remain in: {}", unresolved.join(", ")));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_param_assignments() {
        assert_eq!(
            parse_param("T = List[int]").unwrap(),
            ("T".to_string(), "List[int]".to_string())
        );
        assert!(parse_param("T").is_err());
        assert!(parse_param("=int").is_err());
    }
}
