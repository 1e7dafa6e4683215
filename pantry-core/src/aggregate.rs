//! Recursive nutrition aggregation over recipes that nest other recipes.
//!
//! Aggregation is best effort: a line whose food or recipe is missing, or
//! whose unit cannot be turned into grams, contributes nothing and leaves a
//! [`AggregationWarning`] behind. Only structural problems abort the whole
//! computation: a reference cycle, a chain deeper than the configured
//! limit, or missing data when [`MissingPolicy::Error`] is selected.
//!
//! Recipe references resolve to the referenced recipe's current version at
//! the time of the call. Each descent checks the active path (a set of
//! recipe ids passed down by value) before recursing. Within one call a
//! sub-recipe is aggregated once, however many lines reference it.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::lookup::{FoodLookup, RecipeLookup};
use crate::models::{FoodId, ItemRef, NutritionProfile, RecipeId, RecipeItem, RecipeVersion};
use crate::units::{self, Unit, UnitCategory};

pub const DEFAULT_MAX_DEPTH: usize = 32;

/// What to do when a line references a food or recipe that cannot be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPolicy {
    /// Contribute zero and record a warning.
    #[default]
    Zero,
    /// Fail the aggregation.
    Error,
}

/// How a volume-measured line is turned into grams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityPolicy {
    /// 1 ml = 1 g, reported as a warning on every line it applies to.
    #[default]
    AssumeWater,
    /// Volume lines are unconvertible and contribute zero.
    Reject,
}

/// How grams of a nested recipe map onto its nutrition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NestedBasis {
    /// 100 g of a nested recipe counts as one of its servings.
    #[default]
    PerServing,
    /// Whole-batch nutrition spread over the batch's summed item mass.
    /// Falls back to `PerServing` when the batch mass is zero.
    BatchMass,
}

macro_rules! policy_from_str {
    ($ty:ident { $($text:literal => $variant:ident),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($text => Ok($ty::$variant),)+
                    _ => Err(format!(
                        "Invalid value '{}'. Valid options: {}",
                        s,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $($ty::$variant => write!(f, "{}", $text),)+
                }
            }
        }
    };
}

policy_from_str!(MissingPolicy { "zero" => Zero, "error" => Error });
policy_from_str!(DensityPolicy { "assume_water" => AssumeWater, "reject" => Reject });
policy_from_str!(NestedBasis { "per_serving" => PerServing, "batch_mass" => BatchMass });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationOptions {
    pub on_missing: MissingPolicy,
    pub density: DensityPolicy,
    pub nested_basis: NestedBasis,
    pub max_depth: usize,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            on_missing: MissingPolicy::default(),
            density: DensityPolicy::default(),
            nested_basis: NestedBasis::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl AggregationOptions {
    pub fn strict() -> Self {
        Self {
            on_missing: MissingPolicy::Error,
            ..Self::default()
        }
    }

    pub fn with_density(mut self, density: DensityPolicy) -> Self {
        self.density = density;
        self
    }

    pub fn with_nested_basis(mut self, nested_basis: NestedBasis) -> Self {
        self.nested_basis = nested_basis;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregationError {
    #[error("Recipe {0} references itself through its ingredients")]
    CyclicReference(RecipeId),

    #[error("Recipe nesting exceeds the maximum depth of {0}")]
    MaxDepthExceeded(usize),

    #[error("Food not found: {0}")]
    MissingFood(FoodId),

    #[error("Recipe not found or has no versions: {0}")]
    MissingRecipe(RecipeId),
}

/// Something that made a total partial without failing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregationWarning {
    MissingFood {
        recipe_id: RecipeId,
        line: usize,
        food_id: FoodId,
    },
    MissingRecipe {
        recipe_id: RecipeId,
        line: usize,
        missing_id: RecipeId,
    },
    Unconvertible {
        recipe_id: RecipeId,
        line: usize,
        unit: Unit,
        reason: String,
    },
    AssumedWaterDensity {
        recipe_id: RecipeId,
        line: usize,
        unit: Unit,
    },
}

impl fmt::Display for AggregationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationWarning::MissingFood { line, food_id, .. } => {
                write!(f, "line {}: food {} not found, counted as zero", line + 1, food_id)
            }
            AggregationWarning::MissingRecipe {
                line, missing_id, ..
            } => write!(
                f,
                "line {}: recipe {} not found, counted as zero",
                line + 1,
                missing_id
            ),
            AggregationWarning::Unconvertible {
                line, unit, reason, ..
            } => write!(
                f,
                "line {}: cannot weigh '{}' ({}), counted as zero",
                line + 1,
                unit,
                reason
            ),
            AggregationWarning::AssumedWaterDensity { line, unit, .. } => write!(
                f,
                "line {}: '{}' converted to grams assuming water density",
                line + 1,
                unit
            ),
        }
    }
}

/// Absolute and per-serving nutrition for a recipe batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionTotals {
    pub total: NutritionProfile,
    pub per_serving: NutritionProfile,
    pub servings: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<AggregationWarning>,
}

impl NutritionTotals {
    fn new(total: NutritionProfile, servings: f64, warnings: Vec<AggregationWarning>) -> Self {
        Self {
            total,
            per_serving: total / servings,
            servings,
            warnings,
        }
    }

    /// True when some line was zero-filled rather than computed.
    pub fn is_partial(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| !matches!(w, AggregationWarning::AssumedWaterDensity { .. }))
    }
}

/// Aggregates a version's nutrition with default options.
pub fn aggregate(
    version: &RecipeVersion,
    foods: &dyn FoodLookup,
    recipes: &dyn RecipeLookup,
) -> Result<NutritionTotals, AggregationError> {
    aggregate_with(version, foods, recipes, &AggregationOptions::default())
}

pub fn aggregate_with(
    version: &RecipeVersion,
    foods: &dyn FoodLookup,
    recipes: &dyn RecipeLookup,
    options: &AggregationOptions,
) -> Result<NutritionTotals, AggregationError> {
    aggregate_items(
        version.recipe_id(),
        version.items(),
        version.servings() as f64,
        foods,
        recipes,
        options,
    )
}

/// Aggregates an item list that belongs to `recipe_id`.
///
/// Used for versions that do not exist yet (drafts being saved) and for
/// scaled item lists with fractional servings.
pub(crate) fn aggregate_items(
    recipe_id: RecipeId,
    items: &[RecipeItem],
    servings: f64,
    foods: &dyn FoodLookup,
    recipes: &dyn RecipeLookup,
    options: &AggregationOptions,
) -> Result<NutritionTotals, AggregationError> {
    let aggregator = Aggregator {
        foods,
        recipes,
        options,
        finished: RefCell::new(HashMap::new()),
    };
    let mut warnings = Vec::new();
    let mut path = HashSet::new();
    path.insert(recipe_id);

    let batch = aggregator.batch(recipe_id, items, path, 0, &mut warnings)?;
    Ok(NutritionTotals::new(batch.total, servings, warnings))
}

/// Nutrition of one batch and how many recipe levels it nests below itself.
#[derive(Debug, Clone, Copy)]
struct Batch {
    total: NutritionProfile,
    height: usize,
}

struct Aggregator<'a> {
    foods: &'a dyn FoodLookup,
    recipes: &'a dyn RecipeLookup,
    options: &'a AggregationOptions,
    /// Sub-recipes already aggregated during this call. A sub-recipe shared
    /// by several lines is computed once and its warnings reported once.
    finished: RefCell<HashMap<RecipeId, Batch>>,
}

impl Aggregator<'_> {
    /// Whole-batch nutrition of `items`. `path` holds every recipe on the
    /// current descent, including `recipe_id`.
    fn batch(
        &self,
        recipe_id: RecipeId,
        items: &[RecipeItem],
        path: HashSet<RecipeId>,
        depth: usize,
        warnings: &mut Vec<AggregationWarning>,
    ) -> Result<Batch, AggregationError> {
        let mut total = NutritionProfile::zero();
        let mut height = 0;

        for (line, item) in items.iter().enumerate() {
            match item.reference() {
                ItemRef::Food(food_id) => {
                    let Some(food) = self.foods.get(&food_id) else {
                        self.missing_food(recipe_id, line, food_id, warnings)?;
                        continue;
                    };
                    if let Some(grams) = self.line_grams(recipe_id, line, item, warnings) {
                        total += food.profile * (grams / 100.0);
                    }
                }
                ItemRef::Recipe(sub_id) => {
                    if path.contains(&sub_id) {
                        return Err(AggregationError::CyclicReference(sub_id));
                    }
                    self.check_depth(depth + 1)?;
                    height = height.max(1);
                    let Some(sub) = self.recipes.get_current_version(&sub_id) else {
                        self.missing_recipe(recipe_id, line, sub_id, warnings)?;
                        continue;
                    };

                    let sub_batch =
                        self.sub_batch(sub_id, &sub, path.clone(), depth + 1, warnings)?;
                    height = height.max(sub_batch.height + 1);

                    if let Some(grams) = self.line_grams(recipe_id, line, item, warnings) {
                        total += self.nested_contribution(&sub, sub_batch.total, grams);
                    }
                }
            }
        }

        Ok(Batch { total, height })
    }

    /// Aggregates a nested recipe at `depth`, reusing an earlier result.
    ///
    /// A finished sub-recipe cannot reach anything on `path`: that would
    /// have been a cycle when it was first computed. Only its depth needs
    /// re-checking from the new position.
    fn sub_batch(
        &self,
        sub_id: RecipeId,
        sub: &RecipeVersion,
        mut path: HashSet<RecipeId>,
        depth: usize,
        warnings: &mut Vec<AggregationWarning>,
    ) -> Result<Batch, AggregationError> {
        let cached = self.finished.borrow().get(&sub_id).copied();
        if let Some(batch) = cached {
            self.check_depth(depth + batch.height)?;
            return Ok(batch);
        }

        tracing::debug!(
            recipe = %sub_id,
            version = sub.version_number(),
            depth,
            "Aggregating nested recipe"
        );

        path.insert(sub_id);
        let batch = self.batch(sub_id, sub.items(), path, depth, warnings)?;
        self.finished.borrow_mut().insert(sub_id, batch);
        Ok(batch)
    }

    fn check_depth(&self, depth: usize) -> Result<(), AggregationError> {
        if depth > self.options.max_depth {
            return Err(AggregationError::MaxDepthExceeded(self.options.max_depth));
        }
        Ok(())
    }

    fn nested_contribution(
        &self,
        sub: &RecipeVersion,
        sub_total: NutritionProfile,
        grams: f64,
    ) -> NutritionProfile {
        let per_serving = sub_total / sub.servings() as f64;
        match self.options.nested_basis {
            NestedBasis::PerServing => per_serving * (grams / 100.0),
            NestedBasis::BatchMass => {
                let batch_grams = self.batch_grams(sub.items());
                if batch_grams > 0.0 {
                    sub_total * (grams / batch_grams)
                } else {
                    per_serving * (grams / 100.0)
                }
            }
        }
    }

    /// Sum of the item masses of a batch, skipping lines that do not convert.
    fn batch_grams(&self, items: &[RecipeItem]) -> f64 {
        items
            .iter()
            .filter_map(|item| self.grams(item).ok())
            .sum()
    }

    fn grams(&self, item: &RecipeItem) -> Result<f64, units::ConversionError> {
        match (item.unit().category(), self.options.density) {
            (UnitCategory::Volume, DensityPolicy::AssumeWater) => {
                units::assume_water_density(item.amount(), item.unit())
            }
            _ => units::to_grams(item.amount(), item.unit()),
        }
    }

    /// Grams for one line, or `None` (with a warning) if it cannot be weighed.
    fn line_grams(
        &self,
        recipe_id: RecipeId,
        line: usize,
        item: &RecipeItem,
        warnings: &mut Vec<AggregationWarning>,
    ) -> Option<f64> {
        match self.grams(item) {
            Ok(grams) => {
                if item.unit().category() == UnitCategory::Volume {
                    warnings.push(AggregationWarning::AssumedWaterDensity {
                        recipe_id,
                        line,
                        unit: item.unit(),
                    });
                }
                Some(grams)
            }
            Err(e) => {
                tracing::warn!(recipe = %recipe_id, line, error = %e, "Line contributes zero");
                warnings.push(AggregationWarning::Unconvertible {
                    recipe_id,
                    line,
                    unit: item.unit(),
                    reason: e.to_string(),
                });
                None
            }
        }
    }

    fn missing_food(
        &self,
        recipe_id: RecipeId,
        line: usize,
        food_id: FoodId,
        warnings: &mut Vec<AggregationWarning>,
    ) -> Result<(), AggregationError> {
        match self.options.on_missing {
            MissingPolicy::Error => Err(AggregationError::MissingFood(food_id)),
            MissingPolicy::Zero => {
                tracing::warn!(recipe = %recipe_id, food = %food_id, "Food not found, counted as zero");
                warnings.push(AggregationWarning::MissingFood {
                    recipe_id,
                    line,
                    food_id,
                });
                Ok(())
            }
        }
    }

    fn missing_recipe(
        &self,
        recipe_id: RecipeId,
        line: usize,
        missing_id: RecipeId,
        warnings: &mut Vec<AggregationWarning>,
    ) -> Result<(), AggregationError> {
        match self.options.on_missing {
            MissingPolicy::Error => Err(AggregationError::MissingRecipe(missing_id)),
            MissingPolicy::Zero => {
                tracing::warn!(recipe = %recipe_id, missing = %missing_id, "Recipe not found, counted as zero");
                warnings.push(AggregationWarning::MissingRecipe {
                    recipe_id,
                    line,
                    missing_id,
                });
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::Catalog;
    use crate::models::{Food, Recipe};
    use crate::testing::{egg, milk, omelette, recipe_with_id, recipe_with_items};

    #[test]
    fn test_omelette_totals() {
        let (catalog, omelette) = omelette();
        let version = omelette.current_version().unwrap();

        let totals = aggregate(version, &catalog, &catalog).unwrap();
        assert!((totals.total.calories - 253.5).abs() < 1e-9);
        assert!((totals.per_serving.calories - 126.75).abs() < 1e-9);
        assert!((totals.total.protein - (13.0 * 1.5 + 3.4 * 0.5)).abs() < 1e-9);
        assert_eq!(totals.servings, 2.0);
        // Milk was measured in ml.
        assert_eq!(totals.warnings.len(), 1);
        assert!(!totals.is_partial());
    }

    #[test]
    fn test_rejecting_density_zero_fills_volume_lines() {
        let (catalog, omelette) = omelette();
        let version = omelette.current_version().unwrap();
        let options = AggregationOptions::default().with_density(DensityPolicy::Reject);

        let totals = aggregate_with(version, &catalog, &catalog, &options).unwrap();
        assert!((totals.total.calories - 232.5).abs() < 1e-9);
        assert!(totals.is_partial());
        assert!(matches!(
            totals.warnings[0],
            AggregationWarning::Unconvertible { line: 1, unit: Unit::Milliliter, .. }
        ));
    }

    #[test]
    fn test_linearity_of_food_only_recipes() {
        let egg = egg();
        let milk = milk();
        let items = |factor: f64| {
            vec![
                RecipeItem::food(egg.id, 150.0 * factor, Unit::Gram).unwrap(),
                RecipeItem::food(milk.id, 0.5 * factor, Unit::Kilogram).unwrap(),
            ]
        };
        let single = recipe_with_items("Single", 3, items(1.0));
        let double = recipe_with_items("Double", 3, items(2.0));
        let catalog = Catalog::from_parts(vec![egg, milk], vec![]);

        let a = aggregate(single.current_version().unwrap(), &catalog, &catalog).unwrap();
        let b = aggregate(double.current_version().unwrap(), &catalog, &catalog).unwrap();

        assert!(b.total.approx_eq(&(a.total * 2.0), 1e-9));
        assert!(b.per_serving.approx_eq(&(a.per_serving * 2.0), 1e-9));
        for ((_, x), (_, y)) in a.total.fields().iter().zip(b.total.fields().iter()) {
            assert!((y - 2.0 * x).abs() <= 1e-9 * x.abs().max(1.0));
        }
    }

    #[test]
    fn test_linearity_keeps_per_serving_when_servings_double() {
        let egg = egg();
        let single = recipe_with_items(
            "Single",
            1,
            vec![RecipeItem::food(egg.id, 100.0, Unit::Gram).unwrap()],
        );
        let double = recipe_with_items(
            "Double",
            2,
            vec![RecipeItem::food(egg.id, 200.0, Unit::Gram).unwrap()],
        );
        let catalog = Catalog::from_parts(vec![egg], vec![]);

        let a = aggregate(single.current_version().unwrap(), &catalog, &catalog).unwrap();
        let b = aggregate(double.current_version().unwrap(), &catalog, &catalog).unwrap();
        assert!(a.per_serving.approx_eq(&b.per_serving, 1e-12));
    }

    #[test]
    fn test_missing_food_is_zero_by_default() {
        let egg = egg();
        let ghost = FoodId::new();
        let recipe = recipe_with_items(
            "Ghostly",
            1,
            vec![
                RecipeItem::food(egg.id, 100.0, Unit::Gram).unwrap(),
                RecipeItem::food(ghost, 100.0, Unit::Gram).unwrap(),
            ],
        );
        let catalog = Catalog::from_parts(vec![egg], vec![]);

        let totals = aggregate(recipe.current_version().unwrap(), &catalog, &catalog).unwrap();
        assert_eq!(totals.total.calories, 155.0);
        assert_eq!(
            totals.warnings,
            vec![AggregationWarning::MissingFood {
                recipe_id: recipe.id(),
                line: 1,
                food_id: ghost
            }]
        );
    }

    #[test]
    fn test_missing_data_errors_when_strict() {
        let ghost_food = FoodId::new();
        let ghost_recipe = crate::models::RecipeId::new();
        let food_recipe = recipe_with_items(
            "A",
            1,
            vec![RecipeItem::food(ghost_food, 1.0, Unit::Gram).unwrap()],
        );
        let recipe_recipe = recipe_with_items(
            "B",
            1,
            vec![RecipeItem::recipe(ghost_recipe, 1.0, Unit::Gram).unwrap()],
        );
        let catalog = Catalog::new();
        let strict = AggregationOptions::strict();

        assert_eq!(
            aggregate_with(food_recipe.current_version().unwrap(), &catalog, &catalog, &strict)
                .unwrap_err(),
            AggregationError::MissingFood(ghost_food)
        );
        assert_eq!(
            aggregate_with(recipe_recipe.current_version().unwrap(), &catalog, &catalog, &strict)
                .unwrap_err(),
            AggregationError::MissingRecipe(ghost_recipe)
        );

        let lenient = aggregate(recipe_recipe.current_version().unwrap(), &catalog, &catalog)
            .unwrap();
        assert!(lenient.total.is_zero());
        assert!(lenient.is_partial());
    }

    #[test]
    fn test_draft_sub_recipe_counts_as_missing() {
        let draft = Recipe::new("Unsaved");
        let parent = recipe_with_items(
            "Parent",
            1,
            vec![RecipeItem::recipe(draft.id(), 50.0, Unit::Gram).unwrap()],
        );
        let catalog = Catalog::from_parts(vec![], vec![draft]);

        let totals = aggregate(parent.current_version().unwrap(), &catalog, &catalog).unwrap();
        assert!(totals.total.is_zero());
        assert!(matches!(
            totals.warnings[0],
            AggregationWarning::MissingRecipe { .. }
        ));
    }

    #[test]
    fn test_nested_recipe_per_serving_basis() {
        let (mut catalog, omelette) = omelette();
        // 100 g of the omelette counts as one serving: 126.75 kcal.
        let brunch = recipe_with_items(
            "Brunch",
            1,
            vec![RecipeItem::recipe(omelette.id(), 200.0, Unit::Gram).unwrap()],
        );
        catalog.insert_recipe(omelette);

        let totals = aggregate(brunch.current_version().unwrap(), &catalog, &catalog).unwrap();
        assert!((totals.total.calories - 253.5).abs() < 1e-9);
    }

    #[test]
    fn test_nested_recipe_batch_mass_basis() {
        let (mut catalog, omelette) = omelette();
        // The omelette batch weighs 200 g; 50 g of it is a quarter of 253.5 kcal.
        let brunch = recipe_with_items(
            "Brunch",
            1,
            vec![RecipeItem::recipe(omelette.id(), 50.0, Unit::Gram).unwrap()],
        );
        catalog.insert_recipe(omelette);
        let options = AggregationOptions::default().with_nested_basis(NestedBasis::BatchMass);

        let totals =
            aggregate_with(brunch.current_version().unwrap(), &catalog, &catalog, &options)
                .unwrap();
        assert!((totals.total.calories - 63.375).abs() < 1e-9);
    }

    #[test]
    fn test_nested_warnings_propagate() {
        let ghost = FoodId::new();
        let inner = recipe_with_items(
            "Inner",
            1,
            vec![RecipeItem::food(ghost, 10.0, Unit::Gram).unwrap()],
        );
        let outer = recipe_with_items(
            "Outer",
            1,
            vec![RecipeItem::recipe(inner.id(), 10.0, Unit::Gram).unwrap()],
        );
        let inner_id = inner.id();
        let catalog = Catalog::from_parts(vec![], vec![inner]);

        let totals = aggregate(outer.current_version().unwrap(), &catalog, &catalog).unwrap();
        assert_eq!(
            totals.warnings,
            vec![AggregationWarning::MissingFood {
                recipe_id: inner_id,
                line: 0,
                food_id: ghost
            }]
        );
    }

    #[test]
    fn test_direct_cycle_is_rejected() {
        let a_id = crate::models::RecipeId::new();
        let b_id = crate::models::RecipeId::new();
        let a = recipe_with_id(
            a_id,
            "A",
            1,
            vec![RecipeItem::recipe(b_id, 100.0, Unit::Gram).unwrap()],
        );
        let b = recipe_with_id(
            b_id,
            "B",
            1,
            vec![RecipeItem::recipe(a_id, 100.0, Unit::Gram).unwrap()],
        );
        let a_version = a.current_version().unwrap().clone();
        let catalog = Catalog::from_parts(vec![], vec![a, b]);

        assert_eq!(
            aggregate(&a_version, &catalog, &catalog).unwrap_err(),
            AggregationError::CyclicReference(a_id)
        );
    }

    #[test]
    fn test_self_reference_is_rejected() {
        let id = crate::models::RecipeId::new();
        let selfish = recipe_with_id(
            id,
            "Selfish",
            1,
            vec![RecipeItem::recipe(id, 1.0, Unit::Gram).unwrap()],
        );
        let version = selfish.current_version().unwrap().clone();
        let catalog = Catalog::from_parts(vec![], vec![selfish]);

        assert_eq!(
            aggregate(&version, &catalog, &catalog).unwrap_err(),
            AggregationError::CyclicReference(id)
        );
    }

    #[test]
    fn test_transitive_cycle_is_rejected_even_when_lenient() {
        let ids: Vec<_> = (0..3).map(|_| crate::models::RecipeId::new()).collect();
        let recipes: Vec<Recipe> = (0..3)
            .map(|i| {
                recipe_with_id(
                    ids[i],
                    &format!("R{}", i),
                    1,
                    vec![RecipeItem::recipe(ids[(i + 1) % 3], 10.0, Unit::Gram).unwrap()],
                )
            })
            .collect();
        let start = recipes[0].current_version().unwrap().clone();
        let catalog = Catalog::from_parts(vec![], recipes);

        let err = aggregate(&start, &catalog, &catalog).unwrap_err();
        assert_eq!(err, AggregationError::CyclicReference(ids[0]));
    }

    #[test]
    fn test_cycle_behind_unconvertible_line_is_still_detected() {
        let id = crate::models::RecipeId::new();
        let selfish = recipe_with_id(
            id,
            "Selfish",
            1,
            vec![RecipeItem::recipe(id, 180.0, Unit::Celsius).unwrap()],
        );
        let version = selfish.current_version().unwrap().clone();
        let catalog = Catalog::from_parts(vec![], vec![selfish]);

        assert!(matches!(
            aggregate(&version, &catalog, &catalog),
            Err(AggregationError::CyclicReference(_))
        ));
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let egg = egg();
        let base = recipe_with_items(
            "Base",
            1,
            vec![RecipeItem::food(egg.id, 100.0, Unit::Gram).unwrap()],
        );
        let left = recipe_with_items(
            "Left",
            1,
            vec![RecipeItem::recipe(base.id(), 100.0, Unit::Gram).unwrap()],
        );
        let right = recipe_with_items(
            "Right",
            1,
            vec![RecipeItem::recipe(base.id(), 100.0, Unit::Gram).unwrap()],
        );
        let top = recipe_with_items(
            "Top",
            1,
            vec![
                RecipeItem::recipe(left.id(), 100.0, Unit::Gram).unwrap(),
                RecipeItem::recipe(right.id(), 100.0, Unit::Gram).unwrap(),
            ],
        );
        let catalog = Catalog::from_parts(vec![egg], vec![base, left, right]);

        let totals = aggregate(top.current_version().unwrap(), &catalog, &catalog).unwrap();
        assert!((totals.total.calories - 310.0).abs() < 1e-9);
    }

    fn chain(length: usize) -> (Catalog, Recipe) {
        let egg = egg();
        let mut recipes = vec![recipe_with_items(
            "Leaf",
            1,
            vec![RecipeItem::food(egg.id, 100.0, Unit::Gram).unwrap()],
        )];
        for i in 0..length {
            let child = recipes[i].id();
            recipes.push(recipe_with_items(
                &format!("Level {}", i + 1),
                1,
                vec![RecipeItem::recipe(child, 100.0, Unit::Gram).unwrap()],
            ));
        }
        let top = recipes.pop().unwrap();
        (Catalog::from_parts(vec![egg], recipes), top)
    }

    #[test]
    fn test_depth_limit() {
        let (catalog, top) = chain(DEFAULT_MAX_DEPTH);
        let totals = aggregate(top.current_version().unwrap(), &catalog, &catalog).unwrap();
        assert!((totals.total.calories - 155.0).abs() < 1e-9);

        let (catalog, top) = chain(DEFAULT_MAX_DEPTH + 1);
        assert_eq!(
            aggregate(top.current_version().unwrap(), &catalog, &catalog).unwrap_err(),
            AggregationError::MaxDepthExceeded(DEFAULT_MAX_DEPTH)
        );

        let (catalog, top) = chain(3);
        let shallow = AggregationOptions::default().with_max_depth(2);
        assert_eq!(
            aggregate_with(top.current_version().unwrap(), &catalog, &catalog, &shallow)
                .unwrap_err(),
            AggregationError::MaxDepthExceeded(2)
        );
    }

    /// Each level holds two lines referencing the level below.
    fn doubling_ladder(levels: usize) -> (Catalog, Recipe) {
        let egg = egg();
        let mut recipes = vec![recipe_with_items(
            "Leaf",
            1,
            vec![RecipeItem::food(egg.id, 100.0, Unit::Gram).unwrap()],
        )];
        for i in 0..levels {
            let child = recipes[i].id();
            recipes.push(recipe_with_items(
                &format!("Level {}", i + 1),
                1,
                vec![
                    RecipeItem::recipe(child, 50.0, Unit::Gram).unwrap(),
                    RecipeItem::recipe(child, 50.0, Unit::Gram).unwrap(),
                ],
            ));
        }
        let top = recipes.pop().unwrap();
        (Catalog::from_parts(vec![egg], recipes), top)
    }

    #[test]
    fn test_shared_sub_recipes_are_aggregated_once() {
        let (catalog, top) = doubling_ladder(DEFAULT_MAX_DEPTH);

        let started = std::time::Instant::now();
        let totals = aggregate(top.current_version().unwrap(), &catalog, &catalog).unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
        assert!((totals.total.calories - 155.0).abs() < 1e-6);
    }

    #[test]
    fn test_shared_sub_recipe_warnings_are_reported_once() {
        let ghost = FoodId::new();
        let inner = recipe_with_items(
            "Inner",
            1,
            vec![RecipeItem::food(ghost, 10.0, Unit::Gram).unwrap()],
        );
        let outer = recipe_with_items(
            "Outer",
            1,
            vec![
                RecipeItem::recipe(inner.id(), 10.0, Unit::Gram).unwrap(),
                RecipeItem::recipe(inner.id(), 20.0, Unit::Gram).unwrap(),
            ],
        );
        let catalog = Catalog::from_parts(vec![], vec![inner]);

        let totals = aggregate(outer.current_version().unwrap(), &catalog, &catalog).unwrap();
        assert_eq!(totals.warnings.len(), 1);
    }

    #[test]
    fn test_depth_limit_applies_to_reused_sub_recipes() {
        let egg = egg();
        let leaf = recipe_with_items(
            "Leaf",
            1,
            vec![RecipeItem::food(egg.id, 100.0, Unit::Gram).unwrap()],
        );
        let shared = recipe_with_items(
            "Shared",
            1,
            vec![RecipeItem::recipe(leaf.id(), 100.0, Unit::Gram).unwrap()],
        );
        let middle = recipe_with_items(
            "Middle",
            1,
            vec![RecipeItem::recipe(shared.id(), 100.0, Unit::Gram).unwrap()],
        );
        let outer = recipe_with_items(
            "Outer",
            1,
            vec![RecipeItem::recipe(middle.id(), 100.0, Unit::Gram).unwrap()],
        );
        // Shared is first reached at depth 1, then again at depth 3 where
        // its leaf sits at depth 4.
        let top = recipe_with_items(
            "Top",
            1,
            vec![
                RecipeItem::recipe(shared.id(), 100.0, Unit::Gram).unwrap(),
                RecipeItem::recipe(outer.id(), 100.0, Unit::Gram).unwrap(),
            ],
        );
        let catalog = Catalog::from_parts(vec![egg], vec![leaf, shared, middle, outer]);
        let version = top.current_version().unwrap();

        let three = AggregationOptions::default().with_max_depth(3);
        assert_eq!(
            aggregate_with(version, &catalog, &catalog, &three).unwrap_err(),
            AggregationError::MaxDepthExceeded(3)
        );

        let four = AggregationOptions::default().with_max_depth(4);
        let totals = aggregate_with(version, &catalog, &catalog, &four).unwrap();
        assert!((totals.total.calories - 310.0).abs() < 1e-9);
    }

    #[test]
    fn test_nested_reference_follows_current_version() {
        let egg = egg();
        let mut sub = recipe_with_items(
            "Sub",
            1,
            vec![RecipeItem::food(egg.id, 100.0, Unit::Gram).unwrap()],
        );
        let parent = recipe_with_items(
            "Parent",
            1,
            vec![RecipeItem::recipe(sub.id(), 100.0, Unit::Gram).unwrap()],
        );
        let mut catalog = Catalog::from_parts(vec![egg.clone()], vec![sub.clone()]);
        let before = aggregate(parent.current_version().unwrap(), &catalog, &catalog).unwrap();

        crate::testing::push_version(
            &mut sub,
            1,
            vec![RecipeItem::food(egg.id, 200.0, Unit::Gram).unwrap()],
        );
        catalog.insert_recipe(sub);
        let after = aggregate(parent.current_version().unwrap(), &catalog, &catalog).unwrap();

        assert!((before.total.calories - 155.0).abs() < 1e-9);
        assert!((after.total.calories - 310.0).abs() < 1e-9);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("error".parse::<MissingPolicy>().unwrap(), MissingPolicy::Error);
        assert_eq!(
            "REJECT".parse::<DensityPolicy>().unwrap(),
            DensityPolicy::Reject
        );
        assert_eq!(
            "batch_mass".parse::<NestedBasis>().unwrap(),
            NestedBasis::BatchMass
        );
        assert!("sometimes".parse::<MissingPolicy>().is_err());
        assert_eq!(DensityPolicy::AssumeWater.to_string(), "assume_water");
    }

    #[test]
    fn test_unused_food_lookup_is_fine() {
        let foods: std::collections::HashMap<FoodId, Food> = Default::default();
        let recipes: std::collections::HashMap<crate::models::RecipeId, Recipe> =
            Default::default();
        let empty = recipe_with_items("Empty", 4, vec![]);
        let totals = aggregate(empty.current_version().unwrap(), &foods, &recipes).unwrap();
        assert!(totals.total.is_zero());
        assert!(totals.per_serving.is_zero());
    }
}
