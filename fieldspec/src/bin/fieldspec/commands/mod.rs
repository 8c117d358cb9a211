pub mod check;
pub mod inspect;
pub mod specialize;

use std::path::Path;

use anyhow::{Context, Result};
use fieldspec::{ModelDeclaration, ResolvedModel};

use crate::output::OutputManager;

/// Reads and resolves one declaration file.
pub fn load_model(path: &Path, output: &OutputManager) -> Result<ResolvedModel> {
    output.verbose(&format!("Reading declarations from {}", path.display()));
    let declaration = ModelDeclaration::from_path(path)?;
    let model = declaration
        .resolve()
        .with_context(|| format!("failed to resolve {}", path.display()))?;
    output.verbose(&format!(
        "Resolved `{}`: {} fields, {} private attributes, {} computed fields",
        model.name,
        model.fields.len(),
        model.private_attributes.len(),
        model.computed_fields.len()
    ));
    Ok(model)
}
