//! rc-form: case-input form schema, condition evaluation and the form engine.

pub mod condition;
pub mod schema;
pub mod scope;
pub mod session;
pub mod validate;

pub use condition::{Condition, Operator, evaluate, evaluate_hide, values_equal};
pub use schema::*;
pub use scope::{ScopeMap, build_nested_document, flatten_document};
pub use session::{
    Control, FieldView, FileBlob, FormHandler, FormSession, FormView, INPUT_JSON_FILE,
    INPUT_JSON_KEY, NO_OPTIONS_PLACEHOLDER, OptionView, SectionView, Submission, TabHeader,
    UploadedFiles,
};
pub use validate::{ValidationError, validate_schema};

pub type FormResult<T> = Result<T, FormError>;

#[derive(thiserror::Error, Debug)]
pub enum FormError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn schema_from_json_str(content: &str) -> FormResult<FormSchema> {
    let schema: FormSchema = serde_json::from_str(content)?;
    validate_schema(&schema)?;
    Ok(schema)
}

pub fn schema_from_yaml_str(content: &str) -> FormResult<FormSchema> {
    let schema: FormSchema = serde_yaml::from_str(content)?;
    validate_schema(&schema)?;
    Ok(schema)
}

pub fn load_schema_json(path: &std::path::Path) -> FormResult<FormSchema> {
    let content = std::fs::read_to_string(path)?;
    schema_from_json_str(&content)
}

pub fn load_schema_yaml(path: &std::path::Path) -> FormResult<FormSchema> {
    let content = std::fs::read_to_string(path)?;
    schema_from_yaml_str(&content)
}

/// Load a schema, picking the format from the file extension.
pub fn load_schema(path: &std::path::Path) -> FormResult<FormSchema> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => load_schema_yaml(path),
        _ => load_schema_json(path),
    }
}
