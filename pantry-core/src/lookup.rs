//! Read interfaces the engine resolves references through.
//!
//! The engine never mutates through these. Each call to the aggregator is a
//! snapshot read; a caller that needs consistency across several reads
//! supplies a lookup backed by one consistent copy, such as a [`Catalog`].

use std::collections::HashMap;

use crate::models::{Food, FoodId, Recipe, RecipeId, RecipeVersion, VersionId};

pub trait FoodLookup {
    fn get(&self, food_id: &FoodId) -> Option<Food>;
}

pub trait RecipeLookup {
    /// The version a recipe reference resolves to right now.
    fn get_current_version(&self, recipe_id: &RecipeId) -> Option<RecipeVersion>;

    /// A specific, pinned version.
    fn get_version(&self, recipe_id: &RecipeId, version_id: &VersionId) -> Option<RecipeVersion>;
}

impl FoodLookup for HashMap<FoodId, Food> {
    fn get(&self, food_id: &FoodId) -> Option<Food> {
        HashMap::get(self, food_id).cloned()
    }
}

impl RecipeLookup for HashMap<RecipeId, Recipe> {
    fn get_current_version(&self, recipe_id: &RecipeId) -> Option<RecipeVersion> {
        HashMap::get(self, recipe_id)
            .and_then(Recipe::current_version)
            .cloned()
    }

    fn get_version(&self, recipe_id: &RecipeId, version_id: &VersionId) -> Option<RecipeVersion> {
        HashMap::get(self, recipe_id)
            .and_then(|r| r.version(*version_id))
            .cloned()
    }
}

/// Case-insensitive name equality, shared by lookups and duplicate checks.
pub fn names_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// In-memory arena of foods and recipes keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    foods: HashMap<FoodId, Food>,
    recipes: HashMap<RecipeId, Recipe>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(foods: Vec<Food>, recipes: Vec<Recipe>) -> Self {
        Self {
            foods: foods.into_iter().map(|f| (f.id, f)).collect(),
            recipes: recipes.into_iter().map(|r| (r.id(), r)).collect(),
        }
    }

    pub fn insert_food(&mut self, food: Food) {
        self.foods.insert(food.id, food);
    }

    pub fn insert_recipe(&mut self, recipe: Recipe) {
        self.recipes.insert(recipe.id(), recipe);
    }

    pub fn food(&self, id: &FoodId) -> Option<&Food> {
        self.foods.get(id)
    }

    pub fn recipe(&self, id: &RecipeId) -> Option<&Recipe> {
        self.recipes.get(id)
    }

    pub fn recipe_mut(&mut self, id: &RecipeId) -> Option<&mut Recipe> {
        self.recipes.get_mut(id)
    }

    /// Removes a recipe so it can be edited against the rest of the catalog.
    pub fn take_recipe(&mut self, id: &RecipeId) -> Option<Recipe> {
        self.recipes.remove(id)
    }

    /// Finds a food by exact name (case-insensitive).
    pub fn find_food_by_name(&self, name: &str) -> Option<&Food> {
        self.foods.values().find(|f| names_match(&f.name, name))
    }

    /// Finds a recipe by exact name (case-insensitive).
    pub fn find_recipe_by_name(&self, name: &str) -> Option<&Recipe> {
        self.recipes.values().find(|r| names_match(r.name(), name))
    }

    /// Foods sorted by name.
    pub fn foods(&self) -> Vec<&Food> {
        let mut foods: Vec<&Food> = self.foods.values().collect();
        foods.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        foods
    }

    /// Recipes sorted by name.
    pub fn recipes(&self) -> Vec<&Recipe> {
        let mut recipes: Vec<&Recipe> = self.recipes.values().collect();
        recipes.sort_by(|a, b| a.name().to_lowercase().cmp(&b.name().to_lowercase()));
        recipes
    }
}

impl FoodLookup for Catalog {
    fn get(&self, food_id: &FoodId) -> Option<Food> {
        self.foods.get(food_id).cloned()
    }
}

impl RecipeLookup for Catalog {
    fn get_current_version(&self, recipe_id: &RecipeId) -> Option<RecipeVersion> {
        self.recipes.get_current_version(recipe_id)
    }

    fn get_version(&self, recipe_id: &RecipeId, version_id: &VersionId) -> Option<RecipeVersion> {
        self.recipes.get_version(recipe_id, version_id)
    }
}
