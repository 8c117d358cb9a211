//! Serializable views of a resolved model, shared by the commands.

use comfy_table::{Cell, Table};
use serde::Serialize;
use serde_json::Value;

use fieldspec::computed::PropertyKind;
use fieldspec::declaration::FieldWarning;
use fieldspec::{ComputedFieldInfo, FieldInfo, ModelPrivateAttr, ResolvedModel};

use crate::output::{GlobalOptions, TableDisplay, add_table_header, create_table};

#[derive(Debug, Serialize)]
pub struct MemberRow {
    pub name: String,
    pub kind: &'static str,
    pub annotation: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_priority: Option<i32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
}

impl MemberRow {
    pub fn field(name: &str, info: &FieldInfo) -> Self {
        let mut aliases = Vec::new();
        if let Some(alias) = &info.alias {
            aliases.push(format!("alias={alias}"));
        }
        if let Some(alias) = &info.validation_alias {
            aliases.push(format!("validation={alias}"));
        }
        if let Some(alias) = &info.serialization_alias {
            aliases.push(format!("serialization={alias}"));
        }

        let mut flags = Vec::new();
        let mut flag = |name: &str, value: Option<bool>| {
            if let Some(value) = value {
                flags.push(format!("{name}={value}"));
            }
        };
        flag("final", info.is_final.filter(|is_final| *is_final));
        flag("frozen", info.frozen);
        flag("exclude", info.exclude);
        flag("include", info.include);
        flag("validate_default", info.validate_default);
        flag("repr", (!info.repr).then_some(false));
        flag("init_var", info.init_var.filter(|init_var| *init_var));
        flag("kw_only", info.kw_only);

        Self {
            name: name.to_string(),
            kind: "field",
            annotation: info
                .annotation
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string),
            required: info.is_required(),
            default: describe_default(info.default.as_ref(), info.default_factory.as_ref().map(|f| f.name())),
            aliases,
            alias_priority: info.alias_priority,
            metadata: info.metadata.iter().map(ToString::to_string).collect(),
            flags,
        }
    }

    pub fn private(name: &str, attr: &ModelPrivateAttr) -> Self {
        let default = attr.default.as_ref().map(|default| default.to_value());
        Self {
            name: name.to_string(),
            kind: "private",
            annotation: "-".to_string(),
            required: false,
            default: describe_default(default.as_ref(), attr.default_factory.as_ref().map(|f| f.name())),
            aliases: Vec::new(),
            alias_priority: None,
            metadata: Vec::new(),
            flags: Vec::new(),
        }
    }

    pub fn computed(info: &ComputedFieldInfo) -> Self {
        let mut flags = Vec::new();
        if info.wrapped_property.kind == PropertyKind::CachedProperty {
            flags.push("cached".to_string());
        }
        if !info.repr {
            flags.push("repr=false".to_string());
        }

        Self {
            name: info.name().to_string(),
            kind: "computed",
            annotation: info.return_type.to_string(),
            required: false,
            default: None,
            aliases: info.alias.iter().map(|alias| format!("alias={alias}")).collect(),
            alias_priority: info.alias_priority,
            metadata: info.description.iter().map(|text| format!("description={text:?}")).collect(),
            flags,
        }
    }
}

fn describe_default(default: Option<&Value>, factory: Option<&str>) -> Option<String> {
    match (default, factory) {
        (_, Some(factory)) => Some(format!("{factory}()")),
        (Some(value), None) => Some(value.to_string()),
        (None, None) => None,
    }
}

#[derive(Debug, Serialize)]
pub struct WarningRow {
    pub field: String,
    pub option: String,
    pub message: String,
}

impl From<&FieldWarning> for WarningRow {
    fn from(value: &FieldWarning) -> Self {
        Self {
            field: value.field.clone(),
            option: value.warning.option.to_string(),
            message: value.warning.message.to_string(),
        }
    }
}

/// Every member of one resolved model.
#[derive(Debug, Serialize)]
pub struct ModelReport {
    pub model: String,
    pub members: Vec<MemberRow>,
    pub warnings: Vec<WarningRow>,
}

impl ModelReport {
    pub fn new(model: &ResolvedModel) -> Self {
        let mut members: Vec<MemberRow> = model
            .fields
            .iter()
            .map(|(name, info)| MemberRow::field(name, info))
            .collect();
        members.extend(
            model
                .private_attributes
                .iter()
                .map(|(name, attr)| MemberRow::private(name, attr)),
        );
        members.extend(model.computed_fields.iter().map(MemberRow::computed));

        Self {
            model: model.name.clone(),
            members,
            warnings: model.warnings.iter().map(WarningRow::from).collect(),
        }
    }
}

impl TableDisplay for ModelReport {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = create_table(options);
        add_table_header(
            options,
            &mut table,
            &["Member", "Kind", "Annotation", "Required", "Default", "Aliases", "Priority", "Metadata", "Flags"],
        );

        for member in &self.members {
            table.add_row(vec![
                Cell::new(&member.name),
                Cell::new(member.kind),
                Cell::new(&member.annotation),
                Cell::new(if member.required { "yes" } else { "no" }),
                Cell::new(member.default.as_deref().unwrap_or("")),
                Cell::new(member.aliases.join("\n")),
                Cell::new(member.alias_priority.map(|p| p.to_string()).unwrap_or_default()),
                Cell::new(member.metadata.join("\n")),
                Cell::new(member.flags.join(", ")),
            ]);
        }

        table
    }

    fn to_compact(&self) -> String {
        self.members
            .iter()
            .map(|member| {
                let required = if member.required { " (required)" } else { "" };
                format!("{}.{} [{}]: {}{required}", self.model, member.name, member.kind, member.annotation)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldspec::ModelDeclaration;

    const DECLARATION: &str = r#"
name = "User"

[fields.id]
annotation = "int"

[fields.name]
annotation = "str"
field = { alias = "userName", min_items = 1 }

[private.cache]
default_factory = "dict"

[computed.display]
return_type = "str"
cached = true
"#;

    fn report() -> ModelReport {
        let model = ModelDeclaration::from_toml_str(DECLARATION).unwrap().resolve().unwrap();
        ModelReport::new(&model)
    }

    #[test]
    fn members_follow_kind_order() {
        let report = report();
        let kinds: Vec<&str> = report.members.iter().map(|member| member.kind).collect();
        assert_eq!(kinds, vec!["field", "field", "private", "computed"]);
        assert_eq!(report.members[2].default.as_deref(), Some("dict()"));
        assert_eq!(report.members[3].flags, vec!["cached".to_string()]);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn compact_lists_one_member_per_line() {
        let compact = report().to_compact();
        assert_eq!(compact.lines().count(), 4);
        assert!(compact.contains("User.id [field]: int (required)"));
    }
}
