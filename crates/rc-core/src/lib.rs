//! rc-core: numerics and units shared by the form and series crates.
//!
//! - `units`: field and SI unit systems, conversion factors, `UnitConverter`
//! - `numeric`: `Real`, tolerances, finiteness and sample checks
//! - `error`: `CoreError`

pub mod error;
pub mod numeric;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use units::*;
