//! Scaling a recipe version to a target serving count or total weight.
//!
//! Scaling multiplies every line by one factor and recomputes nutrition
//! from the scaled lines. Because nutrition is linear in grams the result
//! also equals [`scale_totals`] applied to the unscaled totals, which is the
//! cheap path for callers that already hold those totals.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::aggregate::{aggregate_items, AggregationError, AggregationOptions, NutritionTotals};
use crate::lookup::{FoodLookup, RecipeLookup};
use crate::models::{RecipeItem, RecipeVersion};
use crate::units::{self, ConversionError, Unit};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScaleMode {
    ByServings { servings: f64 },
    ByTotalWeight { weight: f64, unit: Unit },
}

impl ScaleMode {
    fn target(&self) -> f64 {
        match self {
            ScaleMode::ByServings { servings } => *servings,
            ScaleMode::ByTotalWeight { weight, .. } => *weight,
        }
    }
}

impl fmt::Display for ScaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleMode::ByServings { servings } => write!(f, "{} servings", servings),
            ScaleMode::ByTotalWeight { weight, unit } => write!(f, "{} {} total", weight, unit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScalingError {
    #[error("Recipe has no measurable weight to scale from")]
    EmptyOrZeroWeightRecipe,

    #[error("Scaling target must be a positive number, got {0}")]
    InvalidTargetValue(f64),

    #[error("Cannot convert scaling target: {0}")]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}

/// A line whose weight was taken at face value while summing the recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalingWarning {
    RawAmountAsGrams { line: usize, unit: Unit },
}

impl fmt::Display for ScalingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalingWarning::RawAmountAsGrams { line, unit } => write!(
                f,
                "line {}: '{}' has no weight, amount counted as grams",
                line + 1,
                unit
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledRecipe {
    pub scale_factor: f64,
    pub servings: f64,
    pub items: Vec<RecipeItem>,
    /// Recomputed from the scaled items.
    pub nutrition: NutritionTotals,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ScalingWarning>,
}

/// Scales with default aggregation options.
pub fn scale(
    version: &RecipeVersion,
    mode: ScaleMode,
    foods: &dyn FoodLookup,
    recipes: &dyn RecipeLookup,
) -> Result<ScaledRecipe, ScalingError> {
    scale_with(version, mode, foods, recipes, &AggregationOptions::default())
}

pub fn scale_with(
    version: &RecipeVersion,
    mode: ScaleMode,
    foods: &dyn FoodLookup,
    recipes: &dyn RecipeLookup,
    options: &AggregationOptions,
) -> Result<ScaledRecipe, ScalingError> {
    let mut warnings = Vec::new();
    let scale_factor = scale_factor(version, mode, &mut warnings)?;

    let items: Vec<RecipeItem> = version
        .items()
        .iter()
        .map(|item| item.scaled(scale_factor))
        .collect();
    let servings = version.servings() as f64 * scale_factor;
    if !servings.is_finite() || items.iter().any(|item| item.validate().is_err()) {
        return Err(ScalingError::InvalidTargetValue(mode.target()));
    }

    tracing::debug!(
        recipe = %version.recipe_id(),
        version = version.version_number(),
        %mode,
        scale_factor,
        "Scaling recipe"
    );

    let nutrition = aggregate_items(
        version.recipe_id(),
        &items,
        servings,
        foods,
        recipes,
        options,
    )?;

    Ok(ScaledRecipe {
        scale_factor,
        servings,
        items,
        nutrition,
        warnings,
    })
}

/// Computes the factor that takes `version` to the target in `mode`.
pub fn scale_factor(
    version: &RecipeVersion,
    mode: ScaleMode,
    warnings: &mut Vec<ScalingWarning>,
) -> Result<f64, ScalingError> {
    match mode {
        ScaleMode::ByServings { servings } => {
            validate_target(servings)?;
            if version.servings() == 0 {
                return Err(ScalingError::InvalidTargetValue(servings));
            }
            finite_factor(servings / version.servings() as f64, servings)
        }
        ScaleMode::ByTotalWeight { weight, unit } => {
            validate_target(weight)?;
            let target_grams = units::assume_water_density(weight, unit)?;
            let original_grams = total_weight_grams(version.items(), warnings);
            if original_grams <= 0.0 {
                return Err(ScalingError::EmptyOrZeroWeightRecipe);
            }
            finite_factor(target_grams / original_grams, weight)
        }
    }
}

/// Finite inputs can still overflow the division.
fn finite_factor(factor: f64, target: f64) -> Result<f64, ScalingError> {
    if factor.is_finite() && factor > 0.0 {
        Ok(factor)
    } else {
        Err(ScalingError::InvalidTargetValue(target))
    }
}

/// Sum of all line weights in grams, converting volume as water.
///
/// A line that cannot be weighed counts its raw amount as grams and is
/// reported in `warnings`.
pub fn total_weight_grams(items: &[RecipeItem], warnings: &mut Vec<ScalingWarning>) -> f64 {
    items
        .iter()
        .enumerate()
        .map(
            |(line, item)| match units::assume_water_density(item.amount(), item.unit()) {
                Ok(grams) => grams,
                Err(e) => {
                    tracing::warn!(line, error = %e, "Counting raw amount as grams");
                    warnings.push(ScalingWarning::RawAmountAsGrams {
                        line,
                        unit: item.unit(),
                    });
                    item.amount()
                }
            },
        )
        .sum()
}

/// Linear shortcut: multiplies existing totals by a scale factor.
pub fn scale_totals(totals: &NutritionTotals, factor: f64) -> NutritionTotals {
    NutritionTotals {
        total: totals.total * factor,
        per_serving: totals.per_serving,
        servings: totals.servings * factor,
        warnings: totals.warnings.clone(),
    }
}

fn validate_target(value: f64) -> Result<(), ScalingError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ScalingError::InvalidTargetValue(value));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::testing::{egg, omelette, recipe_with_items};

    #[test]
    fn test_scale_by_total_weight() {
        let (catalog, omelette) = omelette();
        let version = omelette.current_version().unwrap();

        let scaled = scale(
            version,
            ScaleMode::ByTotalWeight {
                weight: 400.0,
                unit: Unit::Gram,
            },
            &catalog,
            &catalog,
        )
        .unwrap();

        assert_eq!(scaled.scale_factor, 2.0);
        assert!((scaled.nutrition.total.calories - 507.0).abs() < 1e-9);
        assert_eq!(scaled.items[0].amount(), 300.0);
        assert_eq!(scaled.items[1].amount(), 100.0);
        assert_eq!(scaled.items[1].unit(), Unit::Milliliter);
        assert_eq!(scaled.servings, 4.0);
        assert!(scaled.warnings.is_empty());
    }

    #[test]
    fn test_scale_by_weight_in_other_units() {
        let (catalog, omelette) = omelette();
        let version = omelette.current_version().unwrap();

        let scaled = scale(
            version,
            ScaleMode::ByTotalWeight {
                weight: 0.1,
                unit: Unit::Kilogram,
            },
            &catalog,
            &catalog,
        )
        .unwrap();
        assert!((scaled.scale_factor - 0.5).abs() < 1e-12);

        // Volume targets go through the water-density path too.
        let scaled = scale(
            version,
            ScaleMode::ByTotalWeight {
                weight: 1.0,
                unit: Unit::Liter,
            },
            &catalog,
            &catalog,
        )
        .unwrap();
        assert!((scaled.scale_factor - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_servings_scaling_idempotence() {
        let (catalog, omelette) = omelette();
        let version = omelette.current_version().unwrap();
        let original = aggregate(version, &catalog, &catalog).unwrap();

        let scaled = scale(
            version,
            ScaleMode::ByServings {
                servings: version.servings() as f64,
            },
            &catalog,
            &catalog,
        )
        .unwrap();

        assert_eq!(scaled.scale_factor, 1.0);
        assert!(scaled.nutrition.total.approx_eq(&original.total, 1e-12));
        assert!(scaled
            .nutrition
            .per_serving
            .approx_eq(&original.per_serving, 1e-12));
        assert_eq!(scaled.items, version.items().to_vec());
    }

    #[test]
    fn test_scale_by_servings_keeps_per_serving() {
        let (catalog, omelette) = omelette();
        let version = omelette.current_version().unwrap();
        let original = aggregate(version, &catalog, &catalog).unwrap();

        let scaled = scale(
            version,
            ScaleMode::ByServings { servings: 5.0 },
            &catalog,
            &catalog,
        )
        .unwrap();

        assert_eq!(scaled.scale_factor, 2.5);
        assert_eq!(scaled.servings, 5.0);
        assert!(scaled
            .nutrition
            .per_serving
            .approx_eq(&original.per_serving, 1e-9));
        assert!((scaled.nutrition.total.calories - 253.5 * 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_recompute_agrees_with_shortcut() {
        let (catalog, omelette) = omelette();
        let version = omelette.current_version().unwrap();
        let original = aggregate(version, &catalog, &catalog).unwrap();

        for mode in [
            ScaleMode::ByServings { servings: 7.0 },
            ScaleMode::ByServings { servings: 0.3 },
            ScaleMode::ByTotalWeight {
                weight: 12.0,
                unit: Unit::Ounce,
            },
            ScaleMode::ByTotalWeight {
                weight: 3.0,
                unit: Unit::Cup,
            },
        ] {
            let scaled = scale(version, mode, &catalog, &catalog).unwrap();
            let shortcut = scale_totals(&original, scaled.scale_factor);
            assert!(scaled.nutrition.total.approx_eq(&shortcut.total, 1e-9));
            assert!(scaled
                .nutrition
                .per_serving
                .approx_eq(&shortcut.per_serving, 1e-9));
            assert!((scaled.servings - shortcut.servings).abs() < 1e-9);
        }
    }

    #[test]
    fn test_invalid_targets() {
        let (catalog, omelette) = omelette();
        let version = omelette.current_version().unwrap();

        for mode in [
            ScaleMode::ByServings { servings: 0.0 },
            ScaleMode::ByServings { servings: -2.0 },
            ScaleMode::ByServings {
                servings: f64::NAN,
            },
            ScaleMode::ByTotalWeight {
                weight: 0.0,
                unit: Unit::Gram,
            },
            ScaleMode::ByTotalWeight {
                weight: f64::INFINITY,
                unit: Unit::Gram,
            },
        ] {
            assert!(matches!(
                scale(version, mode, &catalog, &catalog),
                Err(ScalingError::InvalidTargetValue(_))
            ));
        }
    }

    #[test]
    fn test_overflowing_factor_is_rejected() {
        let egg = egg();
        let speck = recipe_with_items(
            "Speck",
            1,
            vec![RecipeItem::food(egg.id, 1.0, Unit::Milligram).unwrap()],
        );
        let catalog = crate::lookup::Catalog::from_parts(vec![egg], vec![]);
        let version = speck.current_version().unwrap();

        let err = scale(
            version,
            ScaleMode::ByTotalWeight {
                weight: 1e308,
                unit: Unit::Gram,
            },
            &catalog,
            &catalog,
        )
        .unwrap_err();
        assert_eq!(err, ScalingError::InvalidTargetValue(1e308));

        let mut warnings = Vec::new();
        assert!(scale_factor(
            version,
            ScaleMode::ByTotalWeight {
                weight: 1e308,
                unit: Unit::Kilogram,
            },
            &mut warnings,
        )
        .is_err());
    }

    #[test]
    fn test_target_conversion_failure_is_fatal() {
        let (catalog, omelette) = omelette();
        let version = omelette.current_version().unwrap();

        let err = scale(
            version,
            ScaleMode::ByTotalWeight {
                weight: 180.0,
                unit: Unit::Celsius,
            },
            &catalog,
            &catalog,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ScalingError::Conversion(ConversionError::IncompatibleCategories { .. })
        ));
    }

    #[test]
    fn test_empty_recipe_cannot_scale_by_weight() {
        let empty = recipe_with_items("Empty", 1, vec![]);
        let catalog = crate::lookup::Catalog::new();

        let err = scale(
            empty.current_version().unwrap(),
            ScaleMode::ByTotalWeight {
                weight: 100.0,
                unit: Unit::Gram,
            },
            &catalog,
            &catalog,
        )
        .unwrap_err();
        assert_eq!(err, ScalingError::EmptyOrZeroWeightRecipe);

        // Servings scaling still works on an empty recipe.
        let scaled = scale(
            empty.current_version().unwrap(),
            ScaleMode::ByServings { servings: 3.0 },
            &catalog,
            &catalog,
        )
        .unwrap();
        assert_eq!(scaled.scale_factor, 3.0);
    }

    #[test]
    fn test_unweighable_line_counts_raw_amount() {
        let egg = egg();
        let recipe = recipe_with_items(
            "Odd",
            1,
            vec![
                RecipeItem::food(egg.id, 100.0, Unit::Gram).unwrap(),
                RecipeItem::food(egg.id, 100.0, Unit::Celsius).unwrap(),
            ],
        );
        let catalog = crate::lookup::Catalog::from_parts(vec![egg], vec![]);

        let scaled = scale(
            recipe.current_version().unwrap(),
            ScaleMode::ByTotalWeight {
                weight: 400.0,
                unit: Unit::Gram,
            },
            &catalog,
            &catalog,
        )
        .unwrap();

        assert_eq!(scaled.scale_factor, 2.0);
        assert_eq!(
            scaled.warnings,
            vec![ScalingWarning::RawAmountAsGrams {
                line: 1,
                unit: Unit::Celsius
            }]
        );
        // The temperature line still contributes nothing to nutrition.
        assert!((scaled.nutrition.total.calories - 310.0).abs() < 1e-9);
        assert!(scaled.nutrition.is_partial());
    }

    #[test]
    fn test_scale_mode_json() {
        let mode = ScaleMode::ByTotalWeight {
            weight: 400.0,
            unit: Unit::Gram,
        };
        let json = serde_json::to_value(mode).unwrap();
        assert_eq!(json["mode"], "by_total_weight");
        assert_eq!(json["unit"], "g");
    }
}
