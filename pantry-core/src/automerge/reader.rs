//! Readers that rebuild entities from Automerge documents.
//!
//! Entries whose key is not a UUID, or that lack a required field, are
//! skipped. Recipes that parse but break their history invariants are an
//! error rather than being skipped, since dropping one would silently
//! change every recipe that references it.

use automerge::{AutoCommit, ObjId, ReadDoc, ROOT};
use chrono::{DateTime, NaiveDate, Utc};
use std::str::FromStr;

use crate::models::{
    DayEntry, EntryId, Food, FoodId, ItemRef, NutritionProfile, Recipe, RecipeId, RecipeItem,
    RecipeVersion, VersionId,
};
use crate::units::Unit;
use crate::versioning::VersioningError;

/// Error type for reader operations.
#[derive(Debug)]
pub enum ReaderError {
    /// Automerge operation failed.
    AutomergeError(String),
    /// A stored value could not be parsed.
    ParseError(String),
    /// A recipe's stored history violates its invariants.
    CorruptHistory(RecipeId, VersioningError),
}

impl std::fmt::Display for ReaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReaderError::AutomergeError(e) => write!(f, "Automerge error: {}", e),
            ReaderError::ParseError(e) => write!(f, "Parse error: {}", e),
            ReaderError::CorruptHistory(id, e) => write!(f, "Recipe {}: {}", id, e),
        }
    }
}

impl std::error::Error for ReaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReaderError::CorruptHistory(_, e) => Some(e),
            _ => None,
        }
    }
}

impl From<automerge::AutomergeError> for ReaderError {
    fn from(e: automerge::AutomergeError) -> Self {
        ReaderError::AutomergeError(e.to_string())
    }
}

// =============================================================================
// Food Reader
// =============================================================================

pub fn read_all_foods(doc: &AutoCommit) -> Result<Vec<Food>, ReaderError> {
    let mut foods = Vec::new();
    for key in doc.keys(ROOT) {
        if let Some((_, obj_id)) = doc.get(ROOT, &key)? {
            if let Some(food) = read_food(doc, &obj_id, &key)? {
                foods.push(food);
            }
        }
    }
    Ok(foods)
}

pub fn read_food_by_id(doc: &AutoCommit, id: FoodId) -> Result<Option<Food>, ReaderError> {
    let key = id.to_string();
    match doc.get(ROOT, &key)? {
        Some((_, obj_id)) => read_food(doc, &obj_id, &key),
        None => Ok(None),
    }
}

fn read_food(doc: &AutoCommit, obj_id: &ObjId, id_str: &str) -> Result<Option<Food>, ReaderError> {
    let Ok(id) = FoodId::from_str(id_str) else {
        return Ok(None);
    };
    let Some(name) = get_string(doc, obj_id, "name")? else {
        return Ok(None);
    };
    let profile = read_profile(doc, obj_id, "profile")?;
    let created_at = get_timestamp(doc, obj_id, "created_at")?;

    Ok(Some(Food {
        id,
        name,
        profile,
        created_at,
    }))
}

// =============================================================================
// Recipe Reader
// =============================================================================

/// Reads every recipe, checking each one's history.
pub fn read_all_recipes(doc: &AutoCommit) -> Result<Vec<Recipe>, ReaderError> {
    let mut recipes = Vec::new();
    for key in doc.keys(ROOT) {
        if let Some((_, obj_id)) = doc.get(ROOT, &key)? {
            if let Some(recipe) = read_recipe(doc, &obj_id, &key)? {
                recipes.push(recipe);
            }
        }
    }
    Ok(recipes)
}

pub fn read_recipe_by_id(doc: &AutoCommit, id: RecipeId) -> Result<Option<Recipe>, ReaderError> {
    let key = id.to_string();
    match doc.get(ROOT, &key)? {
        Some((_, obj_id)) => read_recipe(doc, &obj_id, &key),
        None => Ok(None),
    }
}

fn read_recipe(
    doc: &AutoCommit,
    obj_id: &ObjId,
    id_str: &str,
) -> Result<Option<Recipe>, ReaderError> {
    let Ok(id) = RecipeId::from_str(id_str) else {
        return Ok(None);
    };
    let Some(name) = get_string(doc, obj_id, "name")? else {
        return Ok(None);
    };

    let description = get_string(doc, obj_id, "description")?;
    let current_version_id = get_string(doc, obj_id, "current_version_id")?
        .map(|s| parse_id::<VersionId>(&s, "current_version_id"))
        .transpose()?;
    let created_at = get_timestamp(doc, obj_id, "created_at")?;
    let updated_at = get_timestamp(doc, obj_id, "updated_at")?;

    let mut versions = Vec::new();
    if let Some((_, list_id)) = doc.get(obj_id, "versions")? {
        for i in 0..doc.length(&list_id) {
            if let Some((_, version_obj)) = doc.get(&list_id, i)? {
                versions.push(read_version(doc, &version_obj, id)?);
            }
        }
    }

    let recipe = Recipe {
        id,
        name,
        description,
        current_version_id,
        versions,
        created_at,
        updated_at,
    };
    recipe
        .check_invariants()
        .map_err(|e| ReaderError::CorruptHistory(id, e))?;
    Ok(Some(recipe))
}

fn read_version(
    doc: &AutoCommit,
    obj_id: &ObjId,
    recipe_id: RecipeId,
) -> Result<RecipeVersion, ReaderError> {
    let id = get_string(doc, obj_id, "id")?
        .ok_or_else(|| missing("version id"))
        .and_then(|s| parse_id::<VersionId>(&s, "version id"))?;
    let version_number = get_i64(doc, obj_id, "version_number")?
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| missing("version_number"))?;
    let servings = get_i64(doc, obj_id, "servings")?
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| missing("servings"))?;
    let per_serving = read_profile(doc, obj_id, "per_serving")?;
    let created_at = get_timestamp(doc, obj_id, "created_at")?;

    let mut items = Vec::new();
    if let Some((_, list_id)) = doc.get(obj_id, "items")? {
        for i in 0..doc.length(&list_id) {
            if let Some((_, item_obj)) = doc.get(&list_id, i)? {
                items.push(read_item(doc, &item_obj)?);
            }
        }
    }

    Ok(RecipeVersion::restore(
        id,
        recipe_id,
        version_number,
        servings,
        items,
        per_serving,
        created_at,
    ))
}

fn read_item(doc: &AutoCommit, obj_id: &ObjId) -> Result<RecipeItem, ReaderError> {
    let ref_id = get_string(doc, obj_id, "ref_id")?.ok_or_else(|| missing("item ref_id"))?;
    let reference = match get_string(doc, obj_id, "kind")?.as_deref() {
        Some("food") => ItemRef::Food(parse_id(&ref_id, "food id")?),
        Some("recipe") => ItemRef::Recipe(parse_id(&ref_id, "recipe id")?),
        other => {
            return Err(ReaderError::ParseError(format!(
                "unknown item kind {:?}",
                other
            )))
        }
    };
    let amount = get_f64(doc, obj_id, "amount")?.ok_or_else(|| missing("item amount"))?;
    let unit = read_unit(doc, obj_id)?;

    RecipeItem::new(reference, amount, unit).map_err(|e| ReaderError::ParseError(e.to_string()))
}

// =============================================================================
// Day Entry Reader
// =============================================================================

/// Reads all day entries, ordered by date then creation time.
pub fn read_all_day_entries(doc: &AutoCommit) -> Result<Vec<DayEntry>, ReaderError> {
    let mut entries = Vec::new();
    for key in doc.keys(ROOT) {
        if let Some((_, obj_id)) = doc.get(ROOT, &key)? {
            if let Some(entry) = read_day_entry(doc, &obj_id, &key)? {
                entries.push(entry);
            }
        }
    }
    entries.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));
    Ok(entries)
}

pub fn read_day_entries_for_date(
    doc: &AutoCommit,
    date: NaiveDate,
) -> Result<Vec<DayEntry>, ReaderError> {
    Ok(read_all_day_entries(doc)?
        .into_iter()
        .filter(|e| e.date == date)
        .collect())
}

fn read_day_entry(
    doc: &AutoCommit,
    obj_id: &ObjId,
    id_str: &str,
) -> Result<Option<DayEntry>, ReaderError> {
    let Ok(id) = EntryId::from_str(id_str) else {
        return Ok(None);
    };
    let Some(date) = get_string(doc, obj_id, "date")? else {
        return Ok(None);
    };
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|e| ReaderError::ParseError(format!("invalid date {}: {}", date, e)))?;

    let recipe_id = get_string(doc, obj_id, "recipe_id")?
        .ok_or_else(|| missing("entry recipe_id"))
        .and_then(|s| parse_id::<RecipeId>(&s, "recipe_id"))?;
    let version_id = get_string(doc, obj_id, "version_id")?
        .ok_or_else(|| missing("entry version_id"))
        .and_then(|s| parse_id::<VersionId>(&s, "version_id"))?;
    let amount = get_f64(doc, obj_id, "amount")?.ok_or_else(|| missing("entry amount"))?;
    let unit = read_unit(doc, obj_id)?;
    let notes = get_string(doc, obj_id, "notes")?;
    let created_at = get_timestamp(doc, obj_id, "created_at")?;

    Ok(Some(DayEntry {
        id,
        date,
        recipe_id,
        version_id,
        amount,
        unit,
        notes,
        created_at,
    }))
}

// =============================================================================
// Helpers
// =============================================================================

fn missing(field: &str) -> ReaderError {
    ReaderError::ParseError(format!("missing {}", field))
}

fn parse_id<T: FromStr>(s: &str, field: &str) -> Result<T, ReaderError> {
    s.parse()
        .map_err(|_| ReaderError::ParseError(format!("invalid {}: {}", field, s)))
}

fn read_unit(doc: &AutoCommit, obj_id: &ObjId) -> Result<Unit, ReaderError> {
    get_string(doc, obj_id, "unit")?
        .ok_or_else(|| missing("unit"))?
        .parse()
        .map_err(|e: crate::units::ConversionError| ReaderError::ParseError(e.to_string()))
}

fn read_profile(
    doc: &AutoCommit,
    obj_id: &ObjId,
    key: &str,
) -> Result<NutritionProfile, ReaderError> {
    let Some((_, profile_id)) = doc.get(obj_id, key)? else {
        return Err(missing(key));
    };
    let field = |name: &str| -> Result<f64, ReaderError> {
        Ok(get_f64(doc, &profile_id, name)?.unwrap_or(0.0))
    };

    Ok(NutritionProfile {
        calories: field("calories")?,
        protein: field("protein")?,
        carbs: field("carbs")?,
        fat: field("fat")?,
        fiber: field("fiber")?,
        sugar: field("sugar")?,
        sodium: field("sodium")?,
    })
}

fn get_timestamp(
    doc: &AutoCommit,
    obj_id: &ObjId,
    key: &str,
) -> Result<DateTime<Utc>, ReaderError> {
    Ok(get_string(doc, obj_id, key)?
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now))
}

fn get_string(doc: &AutoCommit, obj_id: &ObjId, key: &str) -> Result<Option<String>, ReaderError> {
    Ok(doc
        .get(obj_id, key)?
        .and_then(|(value, _)| value.into_string().ok()))
}

fn get_i64(doc: &AutoCommit, obj_id: &ObjId, key: &str) -> Result<Option<i64>, ReaderError> {
    Ok(doc.get(obj_id, key)?.and_then(|(value, _)| value.to_i64()))
}

fn get_f64(doc: &AutoCommit, obj_id: &ObjId, key: &str) -> Result<Option<f64>, ReaderError> {
    Ok(doc.get(obj_id, key)?.and_then(|(value, _)| value.to_f64()))
}
