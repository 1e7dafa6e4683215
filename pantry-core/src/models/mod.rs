mod day_entry;
mod food;
mod ids;
mod nutrition;
mod recipe;

pub use day_entry::DayEntry;
pub use food::Food;
pub use ids::{EntryId, FoodId, RecipeId, VersionId};
pub use nutrition::NutritionProfile;
pub use recipe::{ItemRef, ModelError, Recipe, RecipeDraft, RecipeItem, RecipeVersion};
