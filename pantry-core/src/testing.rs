//! Fixtures shared by unit tests.

use crate::lookup::Catalog;
use crate::models::{Food, NutritionProfile, Recipe, RecipeId, RecipeItem, RecipeVersion};
use crate::units::Unit;

pub fn egg() -> Food {
    Food::new(
        "Egg",
        NutritionProfile::new(155.0, 13.0, 1.1, 11.0)
            .with_sugar(1.1)
            .with_sodium(124.0),
    )
}

pub fn milk() -> Food {
    Food::new(
        "Milk",
        NutritionProfile::new(42.0, 3.4, 5.0, 1.0)
            .with_sugar(5.0)
            .with_sodium(44.0),
    )
}

/// Omelette (2 servings: 150 g egg, 50 ml milk) and a catalog holding its foods.
pub fn omelette() -> (Catalog, Recipe) {
    let egg = egg();
    let milk = milk();
    let recipe = recipe_with_items(
        "Omelette",
        2,
        vec![
            RecipeItem::food(egg.id, 150.0, Unit::Gram).unwrap(),
            RecipeItem::food(milk.id, 50.0, Unit::Milliliter).unwrap(),
        ],
    );
    (Catalog::from_parts(vec![egg, milk], vec![]), recipe)
}

/// A recipe with one version built directly, bypassing the save path.
///
/// The cached per-serving snapshot is left at zero.
pub fn recipe_with_items(name: &str, servings: u32, items: Vec<RecipeItem>) -> Recipe {
    recipe_with_id(RecipeId::new(), name, servings, items)
}

pub fn recipe_with_id(
    id: RecipeId,
    name: &str,
    servings: u32,
    items: Vec<RecipeItem>,
) -> Recipe {
    let mut recipe = Recipe::new(name);
    recipe.id = id;
    push_version(&mut recipe, servings, items);
    recipe
}

/// Appends a raw version and makes it current.
pub fn push_version(recipe: &mut Recipe, servings: u32, items: Vec<RecipeItem>) {
    let number = recipe.versions.len() as u32 + 1;
    let version = RecipeVersion::new(
        recipe.id,
        number,
        servings,
        items,
        NutritionProfile::zero(),
    );
    recipe.current_version_id = Some(version.id());
    recipe.versions.push(version);
}
