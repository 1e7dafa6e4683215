use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{EntryId, RecipeId, VersionId};
use crate::units::Unit;

/// A logged portion of a recipe on a given day.
///
/// The entry pins the exact version that was current when it was logged,
/// so the day's nutrition never changes when the recipe is edited later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayEntry {
    pub id: EntryId,
    pub date: NaiveDate,
    pub recipe_id: RecipeId,
    pub version_id: VersionId,
    pub amount: f64,
    pub unit: Unit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DayEntry {
    pub fn new(
        date: NaiveDate,
        recipe_id: RecipeId,
        version_id: VersionId,
        amount: f64,
        unit: Unit,
    ) -> Self {
        Self {
            id: EntryId::new(),
            date,
            recipe_id,
            version_id,
            amount,
            unit,
            notes: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

impl fmt::Display for DayEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} of recipe {} (version {})",
            self.date, self.amount, self.unit, self.recipe_id, self.version_id
        )
    }
}
