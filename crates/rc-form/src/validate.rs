//! Schema validation logic.

use std::collections::HashSet;

use crate::condition::{Condition, Operator};
use crate::schema::FormSchema;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Schema has no tabs")]
    NoTabs,

    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Empty condition list for {operator:?} in {context}")]
    EmptyCondition { operator: Operator, context: String },

    #[error("NOT takes exactly one condition, got {count} in {context}")]
    NotArity { count: usize, context: String },

    #[error("Field '{field}' of type {field_type} declares no options")]
    MissingOptions { field: String, field_type: String },
}

pub fn validate_schema(schema: &FormSchema) -> Result<(), ValidationError> {
    if schema.tabs.is_empty() {
        return Err(ValidationError::NoTabs);
    }

    let mut tab_ids = HashSet::new();
    for tab in &schema.tabs {
        if !tab_ids.insert(tab.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: tab.id.clone(),
                context: "tabs".to_string(),
            });
        }
    }

    // Field names share one namespace across every tab.
    let mut field_names = HashSet::new();
    for (tab, field) in schema.fields() {
        if !field_names.insert(field.name.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: field.name.clone(),
                context: format!("fields (tab '{}')", tab.id),
            });
        }
    }

    for (_, field) in schema.fields() {
        if field.field_type.has_options() && field.options.is_empty() {
            return Err(ValidationError::MissingOptions {
                field: field.name.clone(),
                field_type: format!("{:?}", field.field_type).to_lowercase(),
            });
        }

        let context = format!("field '{}'", field.name);
        if let Some(cond) = &field.show_if {
            validate_condition(cond, &field_names, &format!("{context} showIf"))?;
        }
        if let Some(cond) = &field.required_if {
            validate_condition(cond, &field_names, &format!("{context} requiredIf"))?;
        }
        for option in &field.options {
            let option_context = format!("{context} option '{}'", option.value);
            if let Some(cond) = &option.show_if {
                validate_condition(cond, &field_names, &format!("{option_context} showIf"))?;
            }
            if let Some(cond) = &option.hide_if {
                validate_condition(cond, &field_names, &format!("{option_context} hideIf"))?;
            }
        }
    }

    Ok(())
}

fn validate_condition(
    condition: &Condition,
    field_names: &HashSet<&str>,
    context: &str,
) -> Result<(), ValidationError> {
    match condition {
        Condition::Leaf { field, .. } => {
            if !field_names.contains(field.as_str()) {
                return Err(ValidationError::MissingReference {
                    id: field.clone(),
                    context: context.to_string(),
                });
            }
        }
        Condition::Combinator {
            operator,
            conditions,
        } => {
            if conditions.is_empty() {
                return Err(ValidationError::EmptyCondition {
                    operator: *operator,
                    context: context.to_string(),
                });
            }
            if *operator == Operator::Not && conditions.len() != 1 {
                return Err(ValidationError::NotArity {
                    count: conditions.len(),
                    context: context.to_string(),
                });
            }
            for child in conditions {
                validate_condition(child, field_names, context)?;
            }
        }
        Condition::Malformed(raw) => {
            // Kept loadable: malformed nodes evaluate as true.
            tracing::warn!(%context, %raw, "unrecognized condition shape");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, FormField, OptionSpec, SectionDef, TabDef};

    fn one_tab(fields: Vec<FormField>) -> FormSchema {
        FormSchema {
            tabs: vec![TabDef {
                id: "general".into(),
                label: "General".into(),
                sections: vec![SectionDef {
                    title: Some("Basics".into()),
                    column_count: 2,
                    fields,
                }],
            }],
        }
    }

    #[test]
    fn accepts_well_formed_schema() {
        let schema = one_tab(vec![
            FormField::new("mode", "Mode", FieldType::Select)
                .with_options(vec![OptionSpec::plain("a"), OptionSpec::plain("b")]),
            FormField::new("extra", "Extra", FieldType::Text)
                .with_show_if(Condition::leaf("mode", "b")),
        ]);
        validate_schema(&schema).unwrap();
    }

    #[test]
    fn rejects_empty_schema() {
        assert!(matches!(
            validate_schema(&FormSchema::default()),
            Err(ValidationError::NoTabs)
        ));
    }

    #[test]
    fn rejects_duplicate_field_across_tabs() {
        let mut schema = one_tab(vec![FormField::new("x", "X", FieldType::Text)]);
        let mut second = schema.tabs[0].clone();
        second.id = "other".into();
        schema.tabs.push(second);
        let err = validate_schema(&schema).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateId { ref id, .. } if id == "x"));
    }

    #[test]
    fn rejects_unknown_condition_field() {
        let schema = one_tab(vec![
            FormField::new("x", "X", FieldType::Text).with_show_if(Condition::leaf("nope", 1)),
        ]);
        assert!(matches!(
            validate_schema(&schema),
            Err(ValidationError::MissingReference { .. })
        ));
    }

    #[test]
    fn rejects_empty_combinator() {
        let schema = one_tab(vec![
            FormField::new("x", "X", FieldType::Text).with_show_if(Condition::and(vec![])),
        ]);
        assert!(matches!(
            validate_schema(&schema),
            Err(ValidationError::EmptyCondition { .. })
        ));
    }

    #[test]
    fn rejects_not_with_two_children() {
        let cond = Condition::Combinator {
            operator: Operator::Not,
            conditions: vec![Condition::leaf("x", 1), Condition::leaf("x", 2)],
        };
        let schema = one_tab(vec![FormField::new("x", "X", FieldType::Text).with_show_if(cond)]);
        assert!(matches!(
            validate_schema(&schema),
            Err(ValidationError::NotArity { count: 2, .. })
        ));
    }

    #[test]
    fn rejects_select_without_options() {
        let schema = one_tab(vec![FormField::new("s", "S", FieldType::Select)]);
        assert!(matches!(
            validate_schema(&schema),
            Err(ValidationError::MissingOptions { .. })
        ));
    }
}
