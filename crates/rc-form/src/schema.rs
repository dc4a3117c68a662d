//! Form schema definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::condition::Condition;

/// Flat `field name -> value` map shared by every tab of a form.
pub type FormValues = BTreeMap<String, Value>;

pub const DEFAULT_FILE_ACCEPT: &str = ".csv,.xlsx,.xls,.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FormSchema {
    #[serde(default)]
    pub tabs: Vec<TabDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TabDef {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub sections: Vec<SectionDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        rename = "columns",
        alias = "columnCount",
        default = "default_column_count"
    )]
    pub column_count: u32,
    #[serde(default)]
    pub fields: Vec<FormField>,
}

fn default_column_count() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Select,
    Checkbox,
    Date,
    File,
    Toggle,
}

impl FieldType {
    pub fn has_options(self) -> bool {
        matches!(self, Self::Select | Self::Toggle)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub default_value: Value,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_if: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Normalized at load time: plain string options become unconditioned specs.
    #[serde(
        default,
        deserialize_with = "deserialize_options",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub options: Vec<OptionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_if: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

impl FormField {
    pub fn new(name: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            field_type,
            default_value: Value::Null,
            required: false,
            optional: false,
            required_if: None,
            scope: None,
            options: Vec::new(),
            show_if: None,
            accept: None,
            step: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = value.into();
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_options(mut self, options: Vec<OptionSpec>) -> Self {
        self.options = options;
        self
    }

    pub fn with_show_if(mut self, condition: Condition) -> Self {
        self.show_if = Some(condition);
        self
    }

    pub fn accept_or_default(&self) -> &str {
        self.accept.as_deref().unwrap_or(DEFAULT_FILE_ACCEPT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptionSpec {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_if: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_if: Option<Condition>,
}

impl OptionSpec {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: None,
            show_if: None,
            hide_if: None,
        }
    }

    pub fn with_hide_if(mut self, condition: Condition) -> Self {
        self.hide_if = Some(condition);
        self
    }

    pub fn with_show_if(mut self, condition: Condition) -> Self {
        self.show_if = Some(condition);
        self
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.value)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOption {
    Plain(String),
    Spec(OptionSpec),
}

fn deserialize_options<'de, D>(deserializer: D) -> Result<Vec<OptionSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<RawOption>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|option| match option {
            RawOption::Plain(value) => OptionSpec::plain(value),
            RawOption::Spec(spec) => spec,
        })
        .collect())
}

impl FormSchema {
    pub fn first_tab_id(&self) -> Option<&str> {
        self.tabs.first().map(|t| t.id.as_str())
    }

    pub fn tab(&self, id: &str) -> Option<&TabDef> {
        self.tabs.iter().find(|t| t.id == id)
    }

    /// Every field with the id of the tab that declares it, in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&TabDef, &FormField)> {
        self.tabs.iter().flat_map(|tab| {
            tab.sections
                .iter()
                .flat_map(move |section| section.fields.iter().map(move |f| (tab, f)))
        })
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields().map(|(_, f)| f).find(|f| f.name == name)
    }

    /// Initial values: every field's default, regardless of tab or visibility.
    pub fn default_values(&self) -> FormValues {
        self.fields()
            .map(|(_, f)| (f.name.clone(), f.default_value.clone()))
            .collect()
    }
}

/// All `file` fields across every tab, in schema order.
pub fn file_fields(schema: &FormSchema) -> Vec<&FormField> {
    schema
        .fields()
        .map(|(_, f)| f)
        .filter(|f| f.field_type == FieldType::File)
        .collect()
}
