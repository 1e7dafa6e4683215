use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::{FoodId, RecipeId, VersionId};
use super::nutrition::NutritionProfile;
use crate::units::Unit;
use crate::versioning::VersioningError;

/// Validation errors for recipe values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Item amount must be a positive number, got {0}")]
    InvalidAmount(f64),

    #[error("Servings must be at least 1")]
    InvalidServings,
}

/// What a recipe line points at.
///
/// A recipe reference names the recipe, not a version: it resolves to
/// whatever version is current when nutrition is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ItemRef {
    Food(FoodId),
    Recipe(RecipeId),
}

/// One ingredient line of a recipe version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RecipeItemRecord")]
pub struct RecipeItem {
    reference: ItemRef,
    amount: f64,
    unit: Unit,
}

#[derive(Deserialize)]
struct RecipeItemRecord {
    reference: ItemRef,
    amount: f64,
    unit: Unit,
}

impl TryFrom<RecipeItemRecord> for RecipeItem {
    type Error = ModelError;

    fn try_from(record: RecipeItemRecord) -> Result<Self, Self::Error> {
        RecipeItem::new(record.reference, record.amount, record.unit)
    }
}

impl RecipeItem {
    pub fn new(reference: ItemRef, amount: f64, unit: Unit) -> Result<Self, ModelError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ModelError::InvalidAmount(amount));
        }
        Ok(Self {
            reference,
            amount,
            unit,
        })
    }

    pub fn food(food_id: FoodId, amount: f64, unit: Unit) -> Result<Self, ModelError> {
        Self::new(ItemRef::Food(food_id), amount, unit)
    }

    pub fn recipe(recipe_id: RecipeId, amount: f64, unit: Unit) -> Result<Self, ModelError> {
        Self::new(ItemRef::Recipe(recipe_id), amount, unit)
    }

    pub fn reference(&self) -> ItemRef {
        self.reference
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Re-checks the amount, for items that arrived through deserialization.
    pub fn validate(&self) -> Result<(), ModelError> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(ModelError::InvalidAmount(self.amount));
        }
        Ok(())
    }

    /// Same line with the amount multiplied by a positive factor.
    pub(crate) fn scaled(&self, factor: f64) -> Self {
        Self {
            reference: self.reference,
            amount: self.amount * factor,
            unit: self.unit,
        }
    }
}

/// An immutable snapshot of a recipe's servings and items.
///
/// There are no setters: an edit is a new version. `per_serving` is the
/// nutrition computed when the version was created and is never refreshed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RecipeVersionRecord")]
pub struct RecipeVersion {
    id: VersionId,
    recipe_id: RecipeId,
    version_number: u32,
    servings: u32,
    items: Vec<RecipeItem>,
    per_serving: NutritionProfile,
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RecipeVersionRecord {
    id: VersionId,
    recipe_id: RecipeId,
    version_number: u32,
    servings: u32,
    items: Vec<RecipeItem>,
    per_serving: NutritionProfile,
    created_at: DateTime<Utc>,
}

impl TryFrom<RecipeVersionRecord> for RecipeVersion {
    type Error = ModelError;

    fn try_from(record: RecipeVersionRecord) -> Result<Self, Self::Error> {
        if record.servings == 0 {
            return Err(ModelError::InvalidServings);
        }
        Ok(RecipeVersion::restore(
            record.id,
            record.recipe_id,
            record.version_number,
            record.servings,
            record.items,
            record.per_serving,
            record.created_at,
        ))
    }
}

impl RecipeVersion {
    pub(crate) fn new(
        recipe_id: RecipeId,
        version_number: u32,
        servings: u32,
        items: Vec<RecipeItem>,
        per_serving: NutritionProfile,
    ) -> Self {
        Self {
            id: VersionId::new(),
            recipe_id,
            version_number,
            servings,
            items,
            per_serving,
            created_at: Utc::now(),
        }
    }

    /// Rebuilds a version read back from storage.
    pub(crate) fn restore(
        id: VersionId,
        recipe_id: RecipeId,
        version_number: u32,
        servings: u32,
        items: Vec<RecipeItem>,
        per_serving: NutritionProfile,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            recipe_id,
            version_number,
            servings,
            items,
            per_serving,
            created_at,
        }
    }

    pub fn id(&self) -> VersionId {
        self.id
    }

    pub fn recipe_id(&self) -> RecipeId {
        self.recipe_id
    }

    pub fn version_number(&self) -> u32 {
        self.version_number
    }

    pub fn servings(&self) -> u32 {
        self.servings
    }

    pub fn items(&self) -> &[RecipeItem] {
        &self.items
    }

    /// Per-serving nutrition cached at creation time.
    pub fn per_serving(&self) -> &NutritionProfile {
        &self.per_serving
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// The editable part of a recipe: what a save turns into a new version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDraft {
    pub servings: u32,
    pub items: Vec<RecipeItem>,
}

impl RecipeDraft {
    pub fn new(servings: u32) -> Self {
        Self {
            servings,
            items: Vec::new(),
        }
    }

    pub fn with_items(mut self, items: Vec<RecipeItem>) -> Self {
        self.items = items;
        self
    }

    pub fn push(&mut self, item: RecipeItem) {
        self.items.push(item);
    }

    /// Removes the line at `index`, returning it if it existed.
    pub fn remove(&mut self, index: usize) -> Option<RecipeItem> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.servings == 0 {
            return Err(ModelError::InvalidServings);
        }
        self.items.iter().try_for_each(RecipeItem::validate)
    }
}

/// A named recipe and its append-only version history.
///
/// `current_version_id` is the only pointer that moves; versions are only
/// ever appended. Name and description are envelope metadata and are
/// patched in place without creating a version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RecipeRecord")]
pub struct Recipe {
    pub(crate) id: RecipeId,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) current_version_id: Option<VersionId>,
    pub(crate) versions: Vec<RecipeVersion>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RecipeRecord {
    id: RecipeId,
    name: String,
    description: Option<String>,
    current_version_id: Option<VersionId>,
    versions: Vec<RecipeVersion>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RecipeRecord> for Recipe {
    type Error = VersioningError;

    fn try_from(record: RecipeRecord) -> Result<Self, Self::Error> {
        let recipe = Recipe {
            id: record.id,
            name: record.name,
            description: record.description,
            current_version_id: record.current_version_id,
            versions: record.versions,
            created_at: record.created_at,
            updated_at: record.updated_at,
        };
        recipe.check_invariants()?;
        Ok(recipe)
    }
}

impl Recipe {
    /// Creates a draft recipe with no versions.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RecipeId::new(),
            name: name.into(),
            description: None,
            current_version_id: None,
            versions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn id(&self) -> RecipeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn current_version_id(&self) -> Option<VersionId> {
        self.current_version_id
    }

    /// All versions, oldest first.
    pub fn versions(&self) -> &[RecipeVersion] {
        &self.versions
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_draft(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn current_version(&self) -> Option<&RecipeVersion> {
        self.current_version_id.and_then(|id| self.version(id))
    }

    pub fn version(&self, id: VersionId) -> Option<&RecipeVersion> {
        self.versions.iter().find(|v| v.id == id)
    }

    pub fn version_number(&self, number: u32) -> Option<&RecipeVersion> {
        self.versions.iter().find(|v| v.version_number == number)
    }
}
