use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::FoodId;
use super::nutrition::NutritionProfile;

/// A leaf ingredient with a fixed per-100g nutrition profile.
///
/// Foods are never edited in place; a correction is a new food.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Food {
    pub id: FoodId,
    pub name: String,
    /// Nutrition per 100 g.
    pub profile: NutritionProfile,
    pub created_at: DateTime<Utc>,
}

impl Food {
    pub fn new(name: impl Into<String>, profile: NutritionProfile) -> Self {
        Self {
            id: FoodId::new(),
            name: name.into(),
            profile,
            created_at: Utc::now(),
        }
    }
}

impl fmt::Display for Food {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.chars().count()))?;
        writeln!(f, "Per 100g: {}", self.profile)
    }
}
