use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Unknown unit system: {name}")]
    UnknownUnitSystem { name: String },

    #[error("Unknown quantity: {name}")]
    UnknownQuantity { name: String },
}
