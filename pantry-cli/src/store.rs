//! Repository that reads and writes the Automerge documents in the data dir.
//!
//! Every operation is load, modify, save on the relevant document. Reads
//! that need to resolve nested recipes load foods and recipes into one
//! [`Catalog`] snapshot.

use automerge::{AutoCommit, AutomergeError};
use chrono::NaiveDate;
use pantry_core::automerge::{
    delete_day_entry, read_all_day_entries, read_all_foods, read_all_recipes,
    read_day_entries_for_date, write_day_entry, write_food, write_recipe,
};
use pantry_core::{
    names_match, Catalog, DayEntry, DocType, DocumentStorage, EntryId, Food, FoodId, ReaderError,
    Recipe, RecipeId, StorageError,
};
use std::path::PathBuf;

#[derive(Debug)]
pub enum StoreError {
    /// Loading or saving a document failed.
    Storage(StorageError),
    /// A document held data that could not be read back.
    Reader(ReaderError),
    /// Writing into a document failed.
    Write(AutomergeError),
    /// No food or recipe matched the given name or id.
    NotFound(String),
    /// A new entity would reuse a name already taken.
    Duplicate(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Storage(e) => write!(f, "Storage error: {}", e),
            StoreError::Reader(e) => write!(f, "Reader error: {}", e),
            StoreError::Write(e) => write!(f, "Write error: {}", e),
            StoreError::NotFound(what) => write!(f, "Not found: {}", what),
            StoreError::Duplicate(name) => write!(f, "'{}' already exists", name),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Storage(e) => Some(e),
            StoreError::Reader(e) => Some(e),
            StoreError::Write(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for StoreError {
    fn from(e: StorageError) -> Self {
        StoreError::Storage(e)
    }
}

impl From<ReaderError> for StoreError {
    fn from(e: ReaderError) -> Self {
        StoreError::Reader(e)
    }
}

impl From<AutomergeError> for StoreError {
    fn from(e: AutomergeError) -> Self {
        StoreError::Write(e)
    }
}

pub struct PantryStore {
    storage: DocumentStorage,
}

impl PantryStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            storage: DocumentStorage::new(data_dir),
        }
    }

    fn load(&self, doc_type: DocType) -> Result<AutoCommit, StoreError> {
        Ok(self.storage.load_or_create(doc_type)?)
    }

    /// Foods and recipes as one consistent snapshot.
    pub fn catalog(&self) -> Result<Catalog, StoreError> {
        let foods = read_all_foods(&self.load(DocType::Foods)?)?;
        let recipes = read_all_recipes(&self.load(DocType::Recipes)?)?;
        Ok(Catalog::from_parts(foods, recipes))
    }

    pub fn add_food(&self, food: &Food) -> Result<(), StoreError> {
        let mut doc = self.load(DocType::Foods)?;
        if read_all_foods(&doc)?
            .iter()
            .any(|f| names_match(&f.name, &food.name))
        {
            return Err(StoreError::Duplicate(food.name.clone()));
        }
        write_food(&mut doc, food)?;
        self.storage.save(DocType::Foods, &mut doc)?;
        tracing::info!(food = %food.id, name = %food.name, "Added food");
        Ok(())
    }

    /// Persists a recipe envelope and any versions not yet stored.
    pub fn save_recipe(&self, recipe: &Recipe) -> Result<(), StoreError> {
        let mut doc = self.load(DocType::Recipes)?;
        write_recipe(&mut doc, recipe)?;
        self.storage.save(DocType::Recipes, &mut doc)?;
        Ok(())
    }

    pub fn add_entry(&self, entry: &DayEntry) -> Result<(), StoreError> {
        let mut doc = self.load(DocType::DayEntries)?;
        write_day_entry(&mut doc, entry)?;
        self.storage.save(DocType::DayEntries, &mut doc)?;
        tracing::info!(entry = %entry.id, date = %entry.date, "Logged entry");
        Ok(())
    }

    pub fn remove_entry(&self, id: EntryId) -> Result<(), StoreError> {
        let mut doc = self.load(DocType::DayEntries)?;
        if !delete_day_entry(&mut doc, id)? {
            return Err(StoreError::NotFound(format!("entry {}", id)));
        }
        self.storage.save(DocType::DayEntries, &mut doc)?;
        Ok(())
    }

    pub fn entries_for_date(&self, date: NaiveDate) -> Result<Vec<DayEntry>, StoreError> {
        Ok(read_day_entries_for_date(
            &self.load(DocType::DayEntries)?,
            date,
        )?)
    }

    pub fn entries(&self) -> Result<Vec<DayEntry>, StoreError> {
        Ok(read_all_day_entries(&self.load(DocType::DayEntries)?)?)
    }
}

/// Finds a food by UUID or by case-insensitive name.
pub fn resolve_food<'a>(catalog: &'a Catalog, identifier: &str) -> Result<&'a Food, StoreError> {
    let by_id = identifier
        .parse::<FoodId>()
        .ok()
        .and_then(|id| catalog.food(&id));
    by_id
        .or_else(|| catalog.find_food_by_name(identifier))
        .ok_or_else(|| StoreError::NotFound(format!("food '{}'", identifier)))
}

/// Finds a recipe by UUID or by case-insensitive name.
pub fn resolve_recipe<'a>(
    catalog: &'a Catalog,
    identifier: &str,
) -> Result<&'a Recipe, StoreError> {
    let by_id = identifier
        .parse::<RecipeId>()
        .ok()
        .and_then(|id| catalog.recipe(&id));
    by_id
        .or_else(|| catalog.find_recipe_by_name(identifier))
        .ok_or_else(|| StoreError::NotFound(format!("recipe '{}'", identifier)))
}
