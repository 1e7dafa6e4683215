//! Pantry Core Library
//!
//! Nutrition aggregation over nested recipes, recipe scaling, and
//! append-only recipe versioning, with Automerge persistence.

pub mod aggregate;
pub mod automerge;
pub mod lookup;
pub mod models;
pub mod scaling;
pub mod units;
pub mod versioning;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate::{
    aggregate, aggregate_with, AggregationError, AggregationOptions, AggregationWarning,
    DensityPolicy, MissingPolicy, NestedBasis, NutritionTotals, DEFAULT_MAX_DEPTH,
};
pub use self::automerge::{DocType, DocumentStorage, ReaderError, StorageError};
pub use lookup::{names_match, Catalog, FoodLookup, RecipeLookup};
pub use models::{
    DayEntry, EntryId, Food, FoodId, ItemRef, ModelError, NutritionProfile, Recipe, RecipeDraft,
    RecipeId, RecipeItem, RecipeVersion, VersionId,
};
pub use scaling::{scale, scale_totals, scale_with, ScaleMode, ScaledRecipe, ScalingError};
pub use units::{ConversionError, Unit, UnitCategory};
pub use versioning::{day_summary, entry_nutrition, DaySummary, SaveOutcome, VersioningError};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
