//! Automerge persistence for foods, recipes and day entries.
//!
//! Each [`DocType`] is one Automerge document in the data directory, a map
//! from entity id (UUID string) to the entity object:
//! - `foods.automerge`: food_id -> Food
//! - `recipes.automerge`: recipe_id -> Recipe envelope with its `versions` list
//! - `entries.automerge`: entry_id -> DayEntry
//!
//! Recipe versions are append-only in the document as well as in memory:
//! [`write_recipe`] never rewrites a version object that is already stored.

mod doc_type;
mod reader;
mod storage;
mod writer;

pub use doc_type::DocType;
pub use reader::{
    read_all_day_entries, read_all_foods, read_all_recipes, read_day_entries_for_date,
    read_food_by_id, read_recipe_by_id, ReaderError,
};
pub use storage::{DocumentStorage, StorageError};
pub use writer::{delete_day_entry, write_day_entry, write_food, write_recipe};
