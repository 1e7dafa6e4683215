//! Unit conversion for recipe quantities.
//!
//! Units belong to one of three categories. Mass and volume convert through
//! a fixed factor to a base unit (grams, millilitres); temperature uses the
//! affine Celsius/Fahrenheit/Kelvin transforms. Nothing converts across
//! categories, with one exception kept behind [`assume_water_density`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Measurement category of a [`Unit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitCategory {
    Mass,
    Volume,
    Temperature,
}

impl fmt::Display for UnitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitCategory::Mass => write!(f, "mass"),
            UnitCategory::Volume => write!(f, "volume"),
            UnitCategory::Temperature => write!(f, "temperature"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "kg")]
    Kilogram,
    #[serde(rename = "mg")]
    Milligram,
    #[serde(rename = "oz")]
    Ounce,
    #[serde(rename = "lb")]
    Pound,
    #[serde(rename = "ml")]
    Milliliter,
    #[serde(rename = "l")]
    Liter,
    #[serde(rename = "cup")]
    Cup,
    #[serde(rename = "tbsp")]
    Tablespoon,
    #[serde(rename = "tsp")]
    Teaspoon,
    #[serde(rename = "C")]
    Celsius,
    #[serde(rename = "F")]
    Fahrenheit,
    #[serde(rename = "K")]
    Kelvin,
}

impl Unit {
    pub const ALL: [Unit; 13] = [
        Unit::Gram,
        Unit::Kilogram,
        Unit::Milligram,
        Unit::Ounce,
        Unit::Pound,
        Unit::Milliliter,
        Unit::Liter,
        Unit::Cup,
        Unit::Tablespoon,
        Unit::Teaspoon,
        Unit::Celsius,
        Unit::Fahrenheit,
        Unit::Kelvin,
    ];

    pub fn category(&self) -> UnitCategory {
        match self {
            Unit::Gram | Unit::Kilogram | Unit::Milligram | Unit::Ounce | Unit::Pound => {
                UnitCategory::Mass
            }
            Unit::Milliliter | Unit::Liter | Unit::Cup | Unit::Tablespoon | Unit::Teaspoon => {
                UnitCategory::Volume
            }
            Unit::Celsius | Unit::Fahrenheit | Unit::Kelvin => UnitCategory::Temperature,
        }
    }

    /// Short symbol, also used as the serialized form.
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Gram => "g",
            Unit::Kilogram => "kg",
            Unit::Milligram => "mg",
            Unit::Ounce => "oz",
            Unit::Pound => "lb",
            Unit::Milliliter => "ml",
            Unit::Liter => "l",
            Unit::Cup => "cup",
            Unit::Tablespoon => "tbsp",
            Unit::Teaspoon => "tsp",
            Unit::Celsius => "C",
            Unit::Fahrenheit => "F",
            Unit::Kelvin => "K",
        }
    }

    /// Factor to the category's base unit (grams or millilitres).
    ///
    /// Temperature has no multiplicative factor.
    fn base_factor(&self) -> Option<f64> {
        match self {
            Unit::Gram => Some(1.0),
            Unit::Kilogram => Some(1000.0),
            Unit::Milligram => Some(0.001),
            Unit::Ounce => Some(28.349_523_125),
            Unit::Pound => Some(453.592_37),
            Unit::Milliliter => Some(1.0),
            Unit::Liter => Some(1000.0),
            Unit::Cup => Some(240.0),
            Unit::Tablespoon => Some(15.0),
            Unit::Teaspoon => Some(5.0),
            Unit::Celsius | Unit::Fahrenheit | Unit::Kelvin => None,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Unit {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        // Temperature symbols are case-sensitive ("C" vs "c" for cup).
        match trimmed {
            "C" | "°C" => return Ok(Unit::Celsius),
            "F" | "°F" => return Ok(Unit::Fahrenheit),
            "K" => return Ok(Unit::Kelvin),
            _ => {}
        }

        match trimmed.to_lowercase().as_str() {
            "g" | "gram" | "grams" | "gr" => Ok(Unit::Gram),
            "kg" | "kilogram" | "kilograms" | "kilo" | "kilos" => Ok(Unit::Kilogram),
            "mg" | "milligram" | "milligrams" => Ok(Unit::Milligram),
            "oz" | "ounce" | "ounces" => Ok(Unit::Ounce),
            "lb" | "lbs" | "pound" | "pounds" => Ok(Unit::Pound),
            "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => {
                Ok(Unit::Milliliter)
            }
            "l" | "liter" | "liters" | "litre" | "litres" => Ok(Unit::Liter),
            "c" | "cup" | "cups" => Ok(Unit::Cup),
            "tbsp" | "tablespoon" | "tablespoons" => Ok(Unit::Tablespoon),
            "tsp" | "teaspoon" | "teaspoons" => Ok(Unit::Teaspoon),
            "celsius" => Ok(Unit::Celsius),
            "fahrenheit" => Ok(Unit::Fahrenheit),
            "kelvin" => Ok(Unit::Kelvin),
            _ => Err(ConversionError::UnknownUnit(s.to_string())),
        }
    }
}

/// Errors raised by unit conversion.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum ConversionError {
    #[error("Unknown unit '{0}'")]
    UnknownUnit(String),

    #[error("Cannot convert {from} to {to}: units measure different quantities")]
    IncompatibleCategories { from: Unit, to: Unit },
}

/// Converts `amount` from one unit to another within a category.
pub fn convert(amount: f64, from: Unit, to: Unit) -> Result<f64, ConversionError> {
    if from == to {
        return Ok(amount);
    }
    if from.category() != to.category() {
        return Err(ConversionError::IncompatibleCategories { from, to });
    }

    match (from.base_factor(), to.base_factor()) {
        (Some(from_factor), Some(to_factor)) => Ok(amount * from_factor / to_factor),
        _ => Ok(from_celsius(to_celsius(amount, from), to)),
    }
}

/// Parses both unit strings and converts. Unknown units are surfaced, never guessed.
pub fn convert_str(amount: f64, from: &str, to: &str) -> Result<f64, ConversionError> {
    let from: Unit = from.parse()?;
    let to: Unit = to.parse()?;
    convert(amount, from, to)
}

/// Converts a mass quantity to grams.
pub fn to_grams(amount: f64, unit: Unit) -> Result<f64, ConversionError> {
    convert(amount, unit, Unit::Gram)
}

/// Converts a mass or volume quantity to grams, taking 1 ml as 1 g.
///
/// This treats every volume-measured ingredient as water (1 cup = 240 g).
/// It is a known simplification that mis-weighs dense or light ingredients
/// and is the single place a per-ingredient density would plug in.
pub fn assume_water_density(amount: f64, unit: Unit) -> Result<f64, ConversionError> {
    match unit.category() {
        UnitCategory::Mass => to_grams(amount, unit),
        UnitCategory::Volume => convert(amount, unit, Unit::Milliliter),
        UnitCategory::Temperature => Err(ConversionError::IncompatibleCategories {
            from: unit,
            to: Unit::Gram,
        }),
    }
}

fn to_celsius(value: f64, unit: Unit) -> f64 {
    match unit {
        Unit::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
        Unit::Kelvin => value - 273.15,
        _ => value,
    }
}

fn from_celsius(celsius: f64, unit: Unit) -> f64 {
    match unit {
        Unit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        Unit::Kelvin => celsius + 273.15,
        _ => celsius,
    }
}
