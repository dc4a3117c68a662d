//! Field (US oilfield) and SI unit systems.
//!
//! Simulation results are stored in field units. Display code converts to
//! SI on request with the fixed factors below; temperature is the only
//! affine conversion and goes through `uom`.

use std::fmt;
use std::str::FromStr;

use uom::si::f64::ThermodynamicTemperature;
use uom::si::thermodynamic_temperature::{degree_celsius, degree_fahrenheit};

use crate::{CoreError, Real};

/// psia -> kPa
pub const PRESSURE_FACTOR: Real = 6.89476;
/// bbl -> m³
pub const VOLUME_FACTOR: Real = 0.158987;
/// bbl/day -> m³/day
pub const RATE_FACTOR: Real = 0.158987;
/// Mscf -> m³
pub const GAS_VOLUME_FACTOR: Real = 28.3168;
/// Mscf/day -> m³/day
pub const GAS_RATE_FACTOR: Real = 28.3168;
/// scf/bbl -> m³/m³
pub const GOR_FACTOR: Real = 0.178108;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum UnitSystem {
    #[default]
    Field,
    Si,
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field => write!(f, "field"),
            Self::Si => write!(f, "si"),
        }
    }
}

impl FromStr for UnitSystem {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "field" => Ok(Self::Field),
            "si" | "metric" => Ok(Self::Si),
            _ => Err(CoreError::UnknownUnitSystem {
                name: s.to_string(),
            }),
        }
    }
}

/// Physical quantity family of a reported value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Quantity {
    Pressure,
    Volume,
    Rate,
    GasVolume,
    GasRate,
    Gor,
    Wor,
    Saturation,
    Temperature,
}

impl Quantity {
    /// Linear field -> SI factor. `None` for temperature (affine) and for
    /// the dimensionless ratios.
    pub fn factor(self) -> Option<Real> {
        match self {
            Self::Pressure => Some(PRESSURE_FACTOR),
            Self::Volume => Some(VOLUME_FACTOR),
            Self::Rate => Some(RATE_FACTOR),
            Self::GasVolume => Some(GAS_VOLUME_FACTOR),
            Self::GasRate => Some(GAS_RATE_FACTOR),
            Self::Gor => Some(GOR_FACTOR),
            Self::Wor | Self::Saturation | Self::Temperature => None,
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pressure => "pressure",
            Self::Volume => "volume",
            Self::Rate => "rate",
            Self::GasVolume => "gas_volume",
            Self::GasRate => "gas_rate",
            Self::Gor => "gor",
            Self::Wor => "wor",
            Self::Saturation => "saturation",
            Self::Temperature => "temperature",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Quantity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "pressure" => Ok(Self::Pressure),
            "volume" => Ok(Self::Volume),
            "rate" => Ok(Self::Rate),
            "gas_volume" | "gasvolume" => Ok(Self::GasVolume),
            "gas_rate" | "gasrate" => Ok(Self::GasRate),
            "gor" => Ok(Self::Gor),
            "wor" => Ok(Self::Wor),
            "saturation" => Ok(Self::Saturation),
            "temperature" => Ok(Self::Temperature),
            _ => Err(CoreError::UnknownQuantity {
                name: s.to_string(),
            }),
        }
    }
}

/// Convert `value` of `quantity` between unit systems.
pub fn convert(quantity: Quantity, value: Real, from: UnitSystem, to: UnitSystem) -> Real {
    if from == to {
        return value;
    }
    match quantity {
        Quantity::Temperature => match to {
            UnitSystem::Si => ThermodynamicTemperature::new::<degree_fahrenheit>(value)
                .get::<degree_celsius>(),
            UnitSystem::Field => ThermodynamicTemperature::new::<degree_celsius>(value)
                .get::<degree_fahrenheit>(),
        },
        _ => match (quantity.factor(), to) {
            (Some(factor), UnitSystem::Si) => value * factor,
            (Some(factor), UnitSystem::Field) => value / factor,
            (None, _) => value,
        },
    }
}

pub fn convert_pressure(value: Real, from: UnitSystem, to: UnitSystem) -> Real {
    convert(Quantity::Pressure, value, from, to)
}

pub fn convert_volume(value: Real, from: UnitSystem, to: UnitSystem) -> Real {
    convert(Quantity::Volume, value, from, to)
}

pub fn convert_rate(value: Real, from: UnitSystem, to: UnitSystem) -> Real {
    convert(Quantity::Rate, value, from, to)
}

pub fn convert_gas_volume(value: Real, from: UnitSystem, to: UnitSystem) -> Real {
    convert(Quantity::GasVolume, value, from, to)
}

pub fn convert_gas_rate(value: Real, from: UnitSystem, to: UnitSystem) -> Real {
    convert(Quantity::GasRate, value, from, to)
}

pub fn convert_gor(value: Real, from: UnitSystem, to: UnitSystem) -> Real {
    convert(Quantity::Gor, value, from, to)
}

pub fn convert_temperature(value: Real, from: UnitSystem, to: UnitSystem) -> Real {
    convert(Quantity::Temperature, value, from, to)
}

/// Axis/legend label for a quantity in a unit system.
pub fn unit_label(quantity: Quantity, system: UnitSystem) -> &'static str {
    match (quantity, system) {
        (Quantity::Pressure, UnitSystem::Field) => "psia",
        (Quantity::Pressure, UnitSystem::Si) => "kPa",
        (Quantity::Volume, UnitSystem::Field) => "bbl",
        (Quantity::Volume, UnitSystem::Si) => "m³",
        (Quantity::Rate, UnitSystem::Field) => "bbl/day",
        (Quantity::Rate, UnitSystem::Si) => "m³/day",
        (Quantity::GasVolume, UnitSystem::Field) => "Mscf",
        (Quantity::GasVolume, UnitSystem::Si) => "m³",
        (Quantity::GasRate, UnitSystem::Field) => "Mscf/day",
        (Quantity::GasRate, UnitSystem::Si) => "m³/day",
        (Quantity::Gor, UnitSystem::Field) => "scf/bbl",
        (Quantity::Gor, UnitSystem::Si) => "m³/m³",
        (Quantity::Wor | Quantity::Saturation, _) => "-",
        (Quantity::Temperature, UnitSystem::Field) => "°F",
        (Quantity::Temperature, UnitSystem::Si) => "°C",
    }
}

/// Bound conversion applied to every value of a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConverter {
    pub quantity: Quantity,
    pub from: UnitSystem,
    pub to: UnitSystem,
}

impl UnitConverter {
    pub fn new(quantity: Quantity, from: UnitSystem, to: UnitSystem) -> Self {
        Self { quantity, from, to }
    }

    /// Database values are in field units; this targets the display system.
    pub fn from_field(quantity: Quantity, to: UnitSystem) -> Self {
        Self::new(quantity, UnitSystem::Field, to)
    }

    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }

    #[inline]
    pub fn apply(&self, value: Real) -> Real {
        convert(self.quantity, value, self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Tolerances, nearly_equal};

    #[test]
    fn rate_field_to_si_uses_barrel_factor() {
        assert_eq!(
            convert_rate(100.0, UnitSystem::Field, UnitSystem::Si),
            100.0 * 0.158987
        );
    }

    #[test]
    fn rate_round_trip() {
        let si = convert_rate(100.0, UnitSystem::Field, UnitSystem::Si);
        let back = convert_rate(si, UnitSystem::Si, UnitSystem::Field);
        assert!(nearly_equal(back, 100.0, Tolerances::round_trip()));
    }

    #[test]
    fn converter_identity() {
        assert!(UnitConverter::from_field(Quantity::Rate, UnitSystem::Field).is_identity());
        let to_si = UnitConverter::from_field(Quantity::Rate, UnitSystem::Si);
        assert!(!to_si.is_identity());
        assert_eq!(to_si.apply(100.0), 100.0 * RATE_FACTOR);
    }

    #[test]
    fn same_system_is_identity() {
        for q in [Quantity::Pressure, Quantity::GasRate, Quantity::Temperature] {
            assert_eq!(convert(q, 42.5, UnitSystem::Si, UnitSystem::Si), 42.5);
        }
    }

    #[test]
    fn temperature_is_affine() {
        let tol = Tolerances {
            abs: 1e-9,
            rel: 1e-9,
        };
        assert!(nearly_equal(
            convert_temperature(212.0, UnitSystem::Field, UnitSystem::Si),
            100.0,
            tol
        ));
        assert!(nearly_equal(
            convert_temperature(0.0, UnitSystem::Si, UnitSystem::Field),
            32.0,
            tol
        ));
    }

    #[test]
    fn dimensionless_ratios_pass_through() {
        assert_eq!(convert(Quantity::Wor, 3.5, UnitSystem::Field, UnitSystem::Si), 3.5);
        assert_eq!(
            convert(Quantity::Saturation, 0.2, UnitSystem::Si, UnitSystem::Field),
            0.2
        );
    }

    #[test]
    fn labels() {
        assert_eq!(unit_label(Quantity::Pressure, UnitSystem::Si), "kPa");
        assert_eq!(unit_label(Quantity::GasRate, UnitSystem::Field), "Mscf/day");
        assert_eq!(unit_label(Quantity::Wor, UnitSystem::Si), "-");
    }

    #[test]
    fn parse_names() {
        assert_eq!("SI".parse::<UnitSystem>().unwrap(), UnitSystem::Si);
        assert_eq!("gas-rate".parse::<Quantity>().unwrap(), Quantity::GasRate);
        assert!("furlongs".parse::<Quantity>().is_err());
    }
}
