//! Recipe edits, version history, and day entries pinned to a version.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::aggregate::{aggregate_items, AggregationError, AggregationOptions, DensityPolicy};
use crate::lookup::{FoodLookup, RecipeLookup};
use crate::models::{
    DayEntry, ModelError, NutritionProfile, Recipe, RecipeDraft, RecipeVersion, VersionId,
};
use crate::units::{self, ConversionError, Unit, UnitCategory};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VersioningError {
    #[error("Recipe has no saved versions")]
    NoVersions,

    #[error("Version {0} not found")]
    UnknownVersion(VersionId),

    #[error("Corrupt recipe history: {0}")]
    CorruptHistory(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

/// What a save did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "version_id", rename_all = "snake_case")]
pub enum SaveOutcome {
    Created(VersionId),
    /// The draft matched the current version; nothing was appended.
    Unchanged(VersionId),
}

impl SaveOutcome {
    pub fn version_id(&self) -> VersionId {
        match self {
            SaveOutcome::Created(id) | SaveOutcome::Unchanged(id) => *id,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, SaveOutcome::Created(_))
    }
}

impl Recipe {
    /// Editable copy of the current version, or an empty one-serving draft.
    pub fn draft(&self) -> RecipeDraft {
        match self.current_version() {
            Some(v) => RecipeDraft::new(v.servings()).with_items(v.items().to_vec()),
            None => RecipeDraft::new(1),
        }
    }

    /// Turns a draft into the next version.
    ///
    /// The per-serving snapshot is computed here and frozen into the new
    /// version. Aggregation runs with this recipe on the descent path, so a
    /// draft that would make the recipe reach itself is rejected before
    /// anything is appended.
    pub fn save(
        &mut self,
        draft: RecipeDraft,
        foods: &dyn FoodLookup,
        recipes: &dyn RecipeLookup,
        options: &AggregationOptions,
    ) -> Result<SaveOutcome, VersioningError> {
        draft.validate()?;

        if let Some(current) = self.current_version() {
            if current.servings() == draft.servings && current.items() == draft.items.as_slice() {
                return Ok(SaveOutcome::Unchanged(current.id()));
            }
        }

        let totals = aggregate_items(
            self.id,
            &draft.items,
            draft.servings as f64,
            foods,
            recipes,
            options,
        )?;
        for warning in &totals.warnings {
            tracing::debug!(recipe = %self.id, %warning, "Snapshot computed with warning");
        }

        let number = self.versions.len() as u32 + 1;
        let version = RecipeVersion::new(
            self.id,
            number,
            draft.servings,
            draft.items,
            totals.per_serving,
        );
        let id = version.id();

        tracing::info!(recipe = %self.id, version = number, "Saved recipe version");

        self.versions.push(version);
        self.current_version_id = Some(id);
        self.updated_at = Utc::now();
        Ok(SaveOutcome::Created(id))
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.updated_at = Utc::now();
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
        self.updated_at = Utc::now();
    }

    /// Checks the history invariants of a recipe read back from storage.
    pub fn check_invariants(&self) -> Result<(), VersioningError> {
        let corrupt = |msg: String| Err(VersioningError::CorruptHistory(msg));

        let mut seen = HashSet::new();
        for (index, version) in self.versions.iter().enumerate() {
            let expected = index as u32 + 1;
            if version.version_number() != expected {
                return corrupt(format!(
                    "version at position {} is numbered {}",
                    expected,
                    version.version_number()
                ));
            }
            if version.recipe_id() != self.id {
                return corrupt(format!(
                    "version {} belongs to recipe {}",
                    expected,
                    version.recipe_id()
                ));
            }
            if version.servings() == 0 {
                return corrupt(format!("version {} has zero servings", expected));
            }
            for item in version.items() {
                item.validate()?;
            }
            if !seen.insert(version.id()) {
                return corrupt(format!("duplicate version id {}", version.id()));
            }
        }

        match self.current_version_id {
            None if !self.versions.is_empty() => {
                corrupt("saved recipe has no current version".to_string())
            }
            Some(id) if !seen.contains(&id) => {
                corrupt(format!("current version {} is not in the history", id))
            }
            _ => Ok(()),
        }
    }
}

impl DayEntry {
    /// Logs a portion of the recipe's current version.
    pub fn pin(
        recipe: &Recipe,
        date: NaiveDate,
        amount: f64,
        unit: Unit,
    ) -> Result<Self, VersioningError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ModelError::InvalidAmount(amount).into());
        }
        let version = recipe.current_version().ok_or(VersioningError::NoVersions)?;
        Ok(Self::new(date, recipe.id(), version.id(), amount, unit))
    }
}

/// Nutrition of one logged portion, from the pinned version's snapshot.
pub fn entry_nutrition(
    entry: &DayEntry,
    recipes: &dyn RecipeLookup,
    options: &AggregationOptions,
) -> Result<NutritionProfile, VersioningError> {
    let version = recipes
        .get_version(&entry.recipe_id, &entry.version_id)
        .ok_or(VersioningError::UnknownVersion(entry.version_id))?;

    let grams = match (entry.unit.category(), options.density) {
        (UnitCategory::Volume, DensityPolicy::AssumeWater) => {
            units::assume_water_density(entry.amount, entry.unit)?
        }
        _ => units::to_grams(entry.amount, entry.unit)?,
    };

    Ok(*version.per_serving() * (grams / 100.0))
}

/// One date's entries with their nutrition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub total: NutritionProfile,
    pub entries: Vec<(DayEntry, NutritionProfile)>,
}

/// Sums the entries logged on `date`; entries for other dates are ignored.
pub fn day_summary(
    date: NaiveDate,
    entries: &[DayEntry],
    recipes: &dyn RecipeLookup,
    options: &AggregationOptions,
) -> Result<DaySummary, VersioningError> {
    let mut total = NutritionProfile::zero();
    let mut rows = Vec::new();

    for entry in entries.iter().filter(|e| e.date == date) {
        let nutrition = entry_nutrition(entry, recipes, options)?;
        total += nutrition;
        rows.push((entry.clone(), nutrition));
    }

    Ok(DaySummary {
        date,
        total,
        entries: rows,
    })
}
