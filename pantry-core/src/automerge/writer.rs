//! Writers for serializing entities into Automerge documents.

use automerge::{
    transaction::Transactable, AutoCommit, AutomergeError, ObjId, ObjType, ReadDoc, Value, ROOT,
};
use std::collections::HashSet;

use crate::models::{
    DayEntry, EntryId, Food, ItemRef, NutritionProfile, Recipe, RecipeItem, RecipeVersion,
};

/// Writes a food to an Automerge document.
///
/// The food is stored at root[food.id.to_string()].
pub fn write_food(doc: &mut AutoCommit, food: &Food) -> Result<(), AutomergeError> {
    let food_obj = doc.put_object(ROOT, food.id.to_string(), ObjType::Map)?;

    doc.put(&food_obj, "name", food.name.as_str())?;
    doc.put(&food_obj, "created_at", food.created_at.to_rfc3339().as_str())?;
    write_profile(doc, &food_obj, "profile", &food.profile)
}

/// Writes a recipe envelope and any versions the document does not hold yet.
///
/// Envelope fields are overwritten. Versions already present (matched by
/// id) are left exactly as stored; new ones are appended in order.
pub fn write_recipe(doc: &mut AutoCommit, recipe: &Recipe) -> Result<(), AutomergeError> {
    let key = recipe.id().to_string();

    let existing = match doc.get(ROOT, &key)? {
        Some((Value::Object(ObjType::Map), obj)) => Some(obj),
        _ => None,
    };
    let recipe_obj = match existing {
        Some(obj) => obj,
        None => doc.put_object(ROOT, &key, ObjType::Map)?,
    };

    doc.put(&recipe_obj, "name", recipe.name())?;
    put_optional(doc, &recipe_obj, "description", recipe.description())?;
    let current = recipe.current_version_id().map(|id| id.to_string());
    put_optional(doc, &recipe_obj, "current_version_id", current.as_deref())?;
    doc.put(
        &recipe_obj,
        "created_at",
        recipe.created_at().to_rfc3339().as_str(),
    )?;
    doc.put(
        &recipe_obj,
        "updated_at",
        recipe.updated_at().to_rfc3339().as_str(),
    )?;

    let existing = match doc.get(&recipe_obj, "versions")? {
        Some((Value::Object(ObjType::List), obj)) => Some(obj),
        _ => None,
    };
    let versions_obj = match existing {
        Some(obj) => obj,
        None => doc.put_object(&recipe_obj, "versions", ObjType::List)?,
    };

    let stored = stored_version_ids(doc, &versions_obj)?;
    let mut appended = 0;
    for version in recipe.versions() {
        if stored.contains(&version.id().to_string()) {
            continue;
        }
        let index = doc.length(&versions_obj);
        let version_obj = doc.insert_object(&versions_obj, index, ObjType::Map)?;
        write_version(doc, &version_obj, version)?;
        appended += 1;
    }

    tracing::debug!(recipe = %recipe.id(), appended, "Wrote recipe");
    Ok(())
}

/// Writes a day entry to an Automerge document.
///
/// The entry is stored at root[entry.id.to_string()].
pub fn write_day_entry(doc: &mut AutoCommit, entry: &DayEntry) -> Result<(), AutomergeError> {
    let entry_obj = doc.put_object(ROOT, entry.id.to_string(), ObjType::Map)?;

    doc.put(&entry_obj, "date", entry.date.to_string().as_str())?;
    doc.put(&entry_obj, "recipe_id", entry.recipe_id.to_string().as_str())?;
    doc.put(&entry_obj, "version_id", entry.version_id.to_string().as_str())?;
    doc.put(&entry_obj, "amount", entry.amount)?;
    doc.put(&entry_obj, "unit", entry.unit.symbol())?;
    doc.put(
        &entry_obj,
        "created_at",
        entry.created_at.to_rfc3339().as_str(),
    )?;
    if let Some(ref notes) = entry.notes {
        doc.put(&entry_obj, "notes", notes.as_str())?;
    }
    Ok(())
}

/// Deletes a day entry. Returns whether it was present.
pub fn delete_day_entry(doc: &mut AutoCommit, id: EntryId) -> Result<bool, AutomergeError> {
    let key = id.to_string();
    if doc.get(ROOT, &key)?.is_none() {
        return Ok(false);
    }
    doc.delete(ROOT, &key)?;
    Ok(true)
}

fn write_version(
    doc: &mut AutoCommit,
    obj: &ObjId,
    version: &RecipeVersion,
) -> Result<(), AutomergeError> {
    doc.put(obj, "id", version.id().to_string().as_str())?;
    doc.put(obj, "version_number", version.version_number() as i64)?;
    doc.put(obj, "servings", version.servings() as i64)?;
    doc.put(obj, "created_at", version.created_at().to_rfc3339().as_str())?;
    write_profile(doc, obj, "per_serving", version.per_serving())?;

    let items_obj = doc.put_object(obj, "items", ObjType::List)?;
    for (i, item) in version.items().iter().enumerate() {
        let item_obj = doc.insert_object(&items_obj, i, ObjType::Map)?;
        write_item(doc, &item_obj, item)?;
    }
    Ok(())
}

fn write_item(doc: &mut AutoCommit, obj: &ObjId, item: &RecipeItem) -> Result<(), AutomergeError> {
    let (kind, ref_id) = match item.reference() {
        ItemRef::Food(id) => ("food", id.to_string()),
        ItemRef::Recipe(id) => ("recipe", id.to_string()),
    };
    doc.put(obj, "kind", kind)?;
    doc.put(obj, "ref_id", ref_id.as_str())?;
    doc.put(obj, "amount", item.amount())?;
    doc.put(obj, "unit", item.unit().symbol())?;
    Ok(())
}

fn write_profile(
    doc: &mut AutoCommit,
    parent: &ObjId,
    key: &str,
    profile: &NutritionProfile,
) -> Result<(), AutomergeError> {
    let profile_obj = doc.put_object(parent, key, ObjType::Map)?;
    for (name, value) in profile.fields() {
        doc.put(&profile_obj, name, value)?;
    }
    Ok(())
}

fn put_optional(
    doc: &mut AutoCommit,
    obj: &ObjId,
    key: &str,
    value: Option<&str>,
) -> Result<(), AutomergeError> {
    if let Some(v) = value {
        return doc.put(obj, key, v);
    }
    let present = doc.get(obj, key)?.is_some();
    if present {
        doc.delete(obj, key)?;
    }
    Ok(())
}

fn stored_version_ids(doc: &AutoCommit, list: &ObjId) -> Result<HashSet<String>, AutomergeError> {
    let mut ids = HashSet::new();
    for i in 0..doc.length(list) {
        let Some((_, version_obj)) = doc.get(list, i)? else {
            continue;
        };
        if let Some((value, _)) = doc.get(&version_obj, "id")? {
            if let Ok(id) = value.into_string() {
                ids.insert(id);
            }
        }
    }
    Ok(ids)
}
