//! Document type enumeration for Automerge storage.

/// Document types that can be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocType {
    Foods,
    Recipes,
    DayEntries,
}

impl DocType {
    pub const ALL: [DocType; 3] = [DocType::Foods, DocType::Recipes, DocType::DayEntries];

    /// Returns the filename for this document type.
    pub fn filename(&self) -> &'static str {
        match self {
            DocType::Foods => "foods.automerge",
            DocType::Recipes => "recipes.automerge",
            DocType::DayEntries => "entries.automerge",
        }
    }
}
