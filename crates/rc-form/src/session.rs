//! Form session state: active tab, values, attached files and submission.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::condition::{evaluate, evaluate_hide};
use crate::schema::{FieldType, FormField, FormSchema, FormValues, OptionSpec};
use crate::scope::{ScopeMap, build_nested_document};

/// Key under which the nested document is added to the uploaded files.
pub const INPUT_JSON_KEY: &str = "input_json";
pub const INPUT_JSON_FILE: &str = "input.json";
pub const NO_OPTIONS_PLACEHOLDER: &str = "No options available";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlob {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileBlob {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

pub type UploadedFiles = BTreeMap<String, FileBlob>;

/// Receiver of the session's terminal events.
pub trait FormHandler {
    fn on_submit(&mut self, values: &FormValues, files: &UploadedFiles);
    fn on_cancel(&mut self) {}
}

/// What a submit hands to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub values: FormValues,
    /// Attached files plus the serialized document under [`INPUT_JSON_KEY`].
    pub files: UploadedFiles,
}

#[derive(Debug, Clone)]
pub struct FormSession {
    schema: FormSchema,
    scopes: ScopeMap,
    active_tab: String,
    values: FormValues,
    files: UploadedFiles,
    error: Option<String>,
}

impl FormSession {
    pub fn new(schema: FormSchema) -> Self {
        let scopes = ScopeMap::from_schema(&schema);
        let values = schema.default_values();
        let active_tab = schema.first_tab_id().unwrap_or_default().to_string();
        tracing::debug!(
            tabs = schema.tabs.len(),
            fields = values.len(),
            "form session opened"
        );
        Self {
            schema,
            scopes,
            active_tab,
            values,
            files: UploadedFiles::new(),
            error: None,
        }
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn scopes(&self) -> &ScopeMap {
        &self.scopes
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn files(&self) -> &UploadedFiles {
        &self.files
    }

    pub fn active_tab(&self) -> &str {
        &self.active_tab
    }

    /// Switch tabs. Unknown ids leave the session unchanged.
    pub fn set_active_tab(&mut self, tab_id: &str) -> bool {
        if self.schema.tab(tab_id).is_none() {
            tracing::warn!(tab = tab_id, "unknown tab id");
            return false;
        }
        self.active_tab = tab_id.to_string();
        true
    }

    /// Replace one value. Number fields coerce the raw input first.
    pub fn on_change(&mut self, name: &str, raw: Value) {
        let value = match self.schema.field(name) {
            Some(field) if field.field_type == FieldType::Number => coerce_number(&raw),
            Some(_) => raw,
            None => {
                tracing::warn!(field = name, "value set for a field not in the schema");
                raw
            }
        };
        self.values.insert(name.to_string(), value);
    }

    pub fn attach_file(&mut self, name: &str, blob: FileBlob) {
        tracing::debug!(field = name, file = %blob.file_name, bytes = blob.bytes.len(), "file attached");
        self.files.insert(name.to_string(), blob);
    }

    pub fn detach_file(&mut self, name: &str) -> Option<FileBlob> {
        self.files.remove(name)
    }

    pub fn is_field_visible(&self, field: &FormField) -> bool {
        evaluate(field.show_if.as_ref(), &self.values)
    }

    pub fn is_option_visible(&self, option: &OptionSpec) -> bool {
        !evaluate_hide(option.hide_if.as_ref(), &self.values)
            && evaluate(option.show_if.as_ref(), &self.values)
    }

    pub fn visible_options<'a>(&self, field: &'a FormField) -> Vec<&'a OptionSpec> {
        field
            .options
            .iter()
            .filter(|o| self.is_option_visible(o))
            .collect()
    }

    /// Advisory only; submission is never blocked on it.
    pub fn is_file_required(&self, field: &FormField) -> bool {
        match &field.required_if {
            Some(cond) => evaluate(Some(cond), &self.values),
            None => !field.optional,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    /// Nested document built from every current value, hidden fields included.
    pub fn nested_document(&self) -> Value {
        build_nested_document(&self.values, &self.scopes)
    }

    pub fn build_submission(&self) -> Submission {
        let document = self.nested_document();
        // Serializing a `Value` cannot fail: keys are always strings.
        let text = serde_json::to_string_pretty(&document).unwrap_or_default();
        let mut files = self.files.clone();
        files.insert(
            INPUT_JSON_KEY.to_string(),
            FileBlob::new(INPUT_JSON_FILE, "application/json", text.into_bytes()),
        );
        Submission {
            values: self.values.clone(),
            files,
        }
    }

    pub fn submit(&self, handler: &mut impl FormHandler) -> Submission {
        let submission = self.build_submission();
        tracing::info!(
            values = submission.values.len(),
            files = submission.files.len(),
            "form submitted"
        );
        handler.on_submit(&submission.values, &submission.files);
        submission
    }

    /// Ends the session without submitting.
    pub fn cancel(self, handler: &mut impl FormHandler) {
        tracing::debug!("form cancelled");
        handler.on_cancel();
    }

    pub fn view(&self) -> FormView {
        let tabs = self
            .schema
            .tabs
            .iter()
            .map(|t| TabHeader {
                id: t.id.clone(),
                label: t.label.clone(),
                active: t.id == self.active_tab,
            })
            .collect();

        let sections = self
            .schema
            .tab(&self.active_tab)
            .map(|tab| {
                tab.sections
                    .iter()
                    .map(|section| SectionView {
                        title: section.title.clone(),
                        column_count: section.column_count,
                        fields: section
                            .fields
                            .iter()
                            .filter(|f| self.is_field_visible(f))
                            .map(|f| self.field_view(f))
                            .collect(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        FormView {
            tabs,
            sections,
            error: self.error.clone(),
        }
    }

    fn field_view(&self, field: &FormField) -> FieldView {
        let value = self.values.get(&field.name).cloned().unwrap_or(Value::Null);
        let control = match field.field_type {
            FieldType::Text | FieldType::Number | FieldType::Date => Control::Input {
                input_type: match field.field_type {
                    FieldType::Number => "number",
                    FieldType::Date => "date",
                    _ => "text",
                }
                .to_string(),
                required: field.required,
                step: field.step,
            },
            FieldType::Checkbox => Control::Checkbox {
                checked: value.as_bool().unwrap_or(false),
            },
            FieldType::Select | FieldType::Toggle => {
                let options: Vec<OptionView> = self
                    .visible_options(field)
                    .into_iter()
                    .map(|o| OptionView {
                        value: o.value.clone(),
                        label: o.display_label().to_string(),
                    })
                    .collect();
                let disabled = options.is_empty();
                let placeholder = disabled.then(|| NO_OPTIONS_PLACEHOLDER.to_string());
                if field.field_type == FieldType::Select {
                    Control::Select {
                        options,
                        disabled,
                        placeholder,
                    }
                } else {
                    Control::Toggle {
                        options,
                        disabled,
                        placeholder,
                    }
                }
            }
            FieldType::File => Control::File {
                required: self.is_file_required(field),
                accept: field.accept_or_default().to_string(),
                attached: self.files.get(&field.name).map(|b| b.file_name.clone()),
            },
        };
        FieldView {
            name: field.name.clone(),
            label: field.label.clone(),
            field_type: field.field_type,
            scope: self.scopes.get(&field.name).unwrap_or_default().to_string(),
            value,
            control,
        }
    }
}

/// Loose numeric coercion for raw input: blank is zero, booleans are 0/1,
/// anything unparsable becomes `null`.
fn coerce_number(raw: &Value) -> Value {
    let number = match raw {
        Value::Number(_) => return raw.clone(),
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                match trimmed.parse::<f64>() {
                    Ok(n) => n,
                    Err(_) => return Value::Null,
                }
            }
        }
        Value::Array(_) | Value::Object(_) => return Value::Null,
    };
    number_value(number)
}

fn number_value(n: f64) -> Value {
    let Ok(n) = rc_core::ensure_finite(n, "number input") else {
        return Value::Null;
    };
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormView {
    pub tabs: Vec<TabHeader>,
    pub sections: Vec<SectionView>,
    pub error: Option<String>,
}

impl FormView {
    pub fn field(&self, name: &str) -> Option<&FieldView> {
        self.sections
            .iter()
            .flat_map(|s| s.fields.iter())
            .find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabHeader {
    pub id: String,
    pub label: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionView {
    pub title: Option<String>,
    pub column_count: u32,
    pub fields: Vec<FieldView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldView {
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    pub scope: String,
    pub value: Value,
    pub control: Control,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionView {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Control {
    Input {
        input_type: String,
        required: bool,
        step: Option<f64>,
    },
    Checkbox {
        checked: bool,
    },
    Select {
        options: Vec<OptionView>,
        disabled: bool,
        placeholder: Option<String>,
    },
    Toggle {
        options: Vec<OptionView>,
        disabled: bool,
        placeholder: Option<String>,
    },
    File {
        required: bool,
        accept: String,
        attached: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use crate::schema::{SectionDef, TabDef};
    use serde_json::json;

    fn section(fields: Vec<FormField>) -> SectionDef {
        SectionDef {
            title: None,
            column_count: 2,
            fields,
        }
    }

    fn schema() -> FormSchema {
        FormSchema {
            tabs: vec![
                TabDef {
                    id: "wells".into(),
                    label: "Wells".into(),
                    sections: vec![section(vec![
                        FormField::new("wellModel", "Well model", FieldType::Select)
                            .with_default("vertical")
                            .with_options(vec![
                                OptionSpec::plain("vertical"),
                                OptionSpec::plain("horizontal"),
                            ]),
                        FormField::new("lateralLength", "Lateral length", FieldType::Number)
                            .with_default(1500)
                            .with_show_if(Condition::leaf("wellModel", "horizontal")),
                        FormField::new("fluid", "Fluid", FieldType::Toggle)
                            .with_default("oil")
                            .with_options(vec![
                                OptionSpec::plain("oil"),
                                OptionSpec::plain("gas")
                                    .with_hide_if(Condition::leaf("wellModel", "vertical")),
                            ]),
                    ])],
                },
                TabDef {
                    id: "data".into(),
                    label: "Data".into(),
                    sections: vec![section(vec![{
                        let mut f = FormField::new("history", "History", FieldType::File);
                        f.required_if = Some(Condition::leaf("wellModel", "horizontal"));
                        f
                    }])],
                },
            ],
        }
    }

    #[derive(Default)]
    struct Recorder {
        submitted: Option<(FormValues, UploadedFiles)>,
        cancelled: bool,
    }

    impl FormHandler for Recorder {
        fn on_submit(&mut self, values: &FormValues, files: &UploadedFiles) {
            self.submitted = Some((values.clone(), files.clone()));
        }

        fn on_cancel(&mut self) {
            self.cancelled = true;
        }
    }

    #[test]
    fn starts_on_first_tab_with_defaults() {
        let session = FormSession::new(schema());
        assert_eq!(session.active_tab(), "wells");
        assert_eq!(session.value("lateralLength"), Some(&json!(1500)));
        assert_eq!(session.value("history"), Some(&Value::Null));
        assert!(session.files().is_empty());
    }

    #[test]
    fn hidden_field_keeps_default_in_submission() {
        let session = FormSession::new(schema());
        let view = session.view();
        assert!(view.field("lateralLength").is_none());

        let submission = session.build_submission();
        let blob = &submission.files[INPUT_JSON_KEY];
        assert_eq!(blob.file_name, INPUT_JSON_FILE);
        let doc: Value = serde_json::from_slice(&blob.bytes).unwrap();
        assert_eq!(doc["wells"]["lateralLength"], json!(1500));
    }

    #[test]
    fn change_reveals_dependent_field() {
        let mut session = FormSession::new(schema());
        session.on_change("wellModel", json!("horizontal"));
        assert!(session.view().field("lateralLength").is_some());
    }

    #[test]
    fn number_fields_coerce_input() {
        let mut session = FormSession::new(schema());
        session.on_change("lateralLength", json!("2500"));
        assert_eq!(session.value("lateralLength"), Some(&json!(2500)));
        session.on_change("lateralLength", json!("12.5"));
        assert_eq!(session.value("lateralLength"), Some(&json!(12.5)));
        session.on_change("lateralLength", json!(""));
        assert_eq!(session.value("lateralLength"), Some(&json!(0)));
        session.on_change("lateralLength", json!("abc"));
        assert_eq!(session.value("lateralLength"), Some(&Value::Null));
        session.on_change("lateralLength", json!("inf"));
        assert_eq!(session.value("lateralLength"), Some(&Value::Null));
        session.on_change("lateralLength", json!(true));
        assert_eq!(session.value("lateralLength"), Some(&json!(1)));
        session.on_change("wellModel", json!("42"));
        assert_eq!(session.value("wellModel"), Some(&json!("42")));
    }

    #[test]
    fn option_visibility_follows_values() {
        let mut session = FormSession::new(schema());
        let view = session.view();
        let Control::Toggle { options, disabled, .. } = &view.field("fluid").unwrap().control
        else {
            panic!("expected toggle");
        };
        assert_eq!(options.len(), 1);
        assert!(!disabled);

        session.on_change("wellModel", json!("horizontal"));
        let view = session.view();
        let Control::Toggle { options, .. } = &view.field("fluid").unwrap().control else {
            panic!("expected toggle");
        };
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn empty_option_list_renders_placeholder() {
        let mut schema = schema();
        schema.tabs[0].sections[0].fields[0].options[0] =
            OptionSpec::plain("vertical").with_hide_if(Condition::leaf("wellModel", "vertical"));
        schema.tabs[0].sections[0].fields[0].options[1] =
            OptionSpec::plain("horizontal").with_show_if(Condition::leaf("wellModel", "none"));
        let session = FormSession::new(schema);
        let view = session.view();
        let Control::Select {
            options,
            disabled,
            placeholder,
        } = &view.field("wellModel").unwrap().control
        else {
            panic!("expected select");
        };
        assert!(options.is_empty());
        assert!(*disabled);
        assert_eq!(placeholder.as_deref(), Some(NO_OPTIONS_PLACEHOLDER));
    }

    #[test]
    fn file_requirement_and_attachment() {
        let mut session = FormSession::new(schema());
        assert!(session.set_active_tab("data"));
        assert!(!session.set_active_tab("nope"));
        assert_eq!(session.active_tab(), "data");

        let view = session.view();
        assert!(view.tabs[1].active);
        let Control::File { required, accept, attached } = &view.field("history").unwrap().control
        else {
            panic!("expected file");
        };
        assert!(!required);
        assert_eq!(accept, ".csv,.xlsx,.xls,.json");
        assert!(attached.is_none());

        session.on_change("wellModel", json!("horizontal"));
        session.attach_file("history", FileBlob::new("prod.csv", "text/csv", b"d,v".to_vec()));
        let view = session.view();
        let Control::File { required, attached, .. } = &view.field("history").unwrap().control
        else {
            panic!("expected file");
        };
        assert!(required);
        assert_eq!(attached.as_deref(), Some("prod.csv"));

        assert!(session.detach_file("history").is_some());
        assert!(session.files().is_empty());
    }

    #[test]
    fn submit_and_cancel_reach_handler() {
        let mut session = FormSession::new(schema());
        session.attach_file("history", FileBlob::new("h.csv", "text/csv", vec![1, 2]));
        let mut handler = Recorder::default();
        session.submit(&mut handler);
        let (values, files) = handler.submitted.take().unwrap();
        assert_eq!(values.get("wellModel"), Some(&json!("vertical")));
        assert!(files.contains_key("history"));
        assert!(files.contains_key(INPUT_JSON_KEY));

        session.cancel(&mut handler);
        assert!(handler.cancelled);
    }

    #[test]
    fn caller_error_is_shown_verbatim() {
        let mut session = FormSession::new(schema());
        session.set_error(Some("Backend rejected the case".into()));
        assert_eq!(session.view().error.as_deref(), Some("Backend rejected the case"));
        session.set_error(None);
        assert!(session.view().error.is_none());
    }
}
