use clap::{Args, Subcommand};
use pantry_core::scaling::ScalingWarning;
use pantry_core::{
    aggregate_with, scale_with, Catalog, ItemRef, NutritionProfile, NutritionTotals, Recipe,
    RecipeDraft, RecipeItem, RecipeVersion, SaveOutcome, ScaleMode, Unit,
};
use serde::Serialize;

use super::{format_amount, print_totals, OutputFormat};
use crate::config::Config;
use crate::store::{resolve_food, resolve_recipe, PantryStore, StoreError};

#[derive(Args)]
pub struct RecipeCommand {
    #[command(subcommand)]
    pub command: RecipeSubcommand,
}

#[derive(Subcommand)]
pub enum RecipeSubcommand {
    /// Create a recipe (saved as version 1 with no items)
    Create {
        /// Name of the recipe
        name: String,

        /// Number of servings the recipe makes
        #[arg(long, default_value_t = 1)]
        servings: u32,

        /// Free-form description
        #[arg(long)]
        description: Option<String>,
    },

    /// Add a food line (creates a new version)
    AddFood {
        /// Recipe ID (UUID) or name
        recipe: String,

        /// Food ID (UUID) or name
        food: String,

        /// Amount of the food
        #[arg(long)]
        amount: f64,

        /// Unit (g, kg, oz, lb, ml, l, cup, tbsp, tsp, ...)
        #[arg(long)]
        unit: Unit,
    },

    /// Add another recipe as an ingredient (creates a new version)
    AddRecipe {
        /// Recipe ID (UUID) or name
        recipe: String,

        /// Sub-recipe ID (UUID) or name
        sub_recipe: String,

        /// Amount of the sub-recipe
        #[arg(long)]
        amount: f64,

        /// Unit of the amount
        #[arg(long)]
        unit: Unit,
    },

    /// Remove a line by its number in 'recipe show' (creates a new version)
    RemoveItem {
        /// Recipe ID (UUID) or name
        recipe: String,

        /// Line number, starting at 1
        line: usize,
    },

    /// Change the number of servings (creates a new version)
    SetServings {
        /// Recipe ID (UUID) or name
        recipe: String,

        /// New number of servings
        servings: u32,
    },

    /// Rename a recipe (no new version)
    Rename {
        /// Recipe ID (UUID) or name
        recipe: String,

        /// New name
        name: String,
    },

    /// Set or clear the description (no new version)
    Describe {
        /// Recipe ID (UUID) or name
        recipe: String,

        /// New description; omit to clear
        description: Option<String>,
    },

    /// List all recipes
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a recipe's items and nutrition
    Show {
        /// Recipe ID (UUID) or name
        recipe: String,

        /// Version number (defaults to the current version)
        #[arg(long)]
        version: Option<u32>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show every saved version of a recipe
    History {
        /// Recipe ID (UUID) or name
        recipe: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Scale a recipe to a number of servings or a total weight
    Scale {
        /// Recipe ID (UUID) or name
        recipe: String,

        /// Target number of servings
        #[arg(long, conflicts_with = "weight", required_unless_present = "weight")]
        servings: Option<f64>,

        /// Target total weight
        #[arg(long, requires = "unit")]
        weight: Option<f64>,

        /// Unit of the target weight
        #[arg(long)]
        unit: Option<Unit>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// A version rendered with names and freshly computed nutrition.
#[derive(Serialize)]
struct VersionReport<'a> {
    recipe_id: String,
    name: &'a str,
    description: Option<&'a str>,
    version_number: u32,
    current: bool,
    servings: f64,
    items: Vec<ItemReport>,
    nutrition: NutritionTotals,
    snapshot_per_serving: NutritionProfile,
}

#[derive(Serialize)]
struct ItemReport {
    line: usize,
    kind: &'static str,
    id: String,
    name: String,
    amount: f64,
    unit: Unit,
}

#[derive(Serialize)]
struct ScaleReport {
    recipe_id: String,
    name: String,
    mode: ScaleMode,
    scale_factor: f64,
    servings: f64,
    items: Vec<ItemReport>,
    nutrition: NutritionTotals,
    scaling_warnings: Vec<ScalingWarning>,
}

impl RecipeCommand {
    pub fn run(
        &self,
        store: &PantryStore,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            RecipeSubcommand::Create {
                name,
                servings,
                description,
            } => {
                let name = name.trim();
                if name.is_empty() {
                    return Err("Recipe name cannot be empty".into());
                }
                let catalog = store.catalog()?;
                if catalog.find_recipe_by_name(name).is_some() {
                    return Err(StoreError::Duplicate(name.to_string()).into());
                }

                let mut recipe = Recipe::new(name);
                if let Some(description) = description {
                    recipe = recipe.with_description(description.as_str());
                }
                recipe.save(
                    RecipeDraft::new(*servings),
                    &catalog,
                    &catalog,
                    &config.aggregation_options(),
                )?;
                store.save_recipe(&recipe)?;
                println!("Created recipe {} ({})", recipe.name(), recipe.id());
                Ok(())
            }

            RecipeSubcommand::AddFood {
                recipe,
                food,
                amount,
                unit,
            } => edit_recipe(store, config, recipe, |catalog, draft| {
                let food = resolve_food(catalog, food)?;
                draft.push(RecipeItem::food(food.id, *amount, *unit)?);
                Ok(())
            }),

            RecipeSubcommand::AddRecipe {
                recipe,
                sub_recipe,
                amount,
                unit,
            } => edit_recipe(store, config, recipe, |catalog, draft| {
                let sub = resolve_recipe(catalog, sub_recipe)?;
                draft.push(RecipeItem::recipe(sub.id(), *amount, *unit)?);
                Ok(())
            }),

            RecipeSubcommand::RemoveItem { recipe, line } => {
                edit_recipe(store, config, recipe, |_, draft| {
                    let removed = line
                        .checked_sub(1)
                        .and_then(|index| draft.remove(index));
                    match removed {
                        Some(_) => Ok(()),
                        None => Err(format!("Recipe has no line {}", line).into()),
                    }
                })
            }

            RecipeSubcommand::SetServings { recipe, servings } => {
                edit_recipe(store, config, recipe, |_, draft| {
                    draft.servings = *servings;
                    Ok(())
                })
            }

            RecipeSubcommand::Rename { recipe, name } => {
                let name = name.trim();
                if name.is_empty() {
                    return Err("Recipe name cannot be empty".into());
                }
                let catalog = store.catalog()?;
                let mut target = resolve_recipe(&catalog, recipe)?.clone();
                if let Some(other) = catalog.find_recipe_by_name(name) {
                    if other.id() != target.id() {
                        return Err(StoreError::Duplicate(name.to_string()).into());
                    }
                }
                let old = target.name().to_string();
                target.rename(name);
                store.save_recipe(&target)?;
                println!("Renamed '{}' to '{}'", old, target.name());
                Ok(())
            }

            RecipeSubcommand::Describe {
                recipe,
                description,
            } => {
                let catalog = store.catalog()?;
                let mut target = resolve_recipe(&catalog, recipe)?.clone();
                target.set_description(description.clone());
                store.save_recipe(&target)?;
                println!("Updated description of '{}'", target.name());
                Ok(())
            }

            RecipeSubcommand::List { format } => {
                let catalog = store.catalog()?;
                let recipes = catalog.recipes();
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&recipes)?);
                    }
                    OutputFormat::Text => {
                        if recipes.is_empty() {
                            println!("No recipes yet. Create one with 'pantry recipe create'.");
                        }
                        for recipe in recipes {
                            let (version, servings) = match recipe.current_version() {
                                Some(v) => (format!("v{}", v.version_number()), v.servings()),
                                None => ("draft".to_string(), 0),
                            };
                            println!(
                                "{:<24} {:<6} {:>3} servings  {}",
                                recipe.name(),
                                version,
                                servings,
                                recipe.id()
                            );
                        }
                    }
                }
                Ok(())
            }

            RecipeSubcommand::Show {
                recipe,
                version,
                format,
            } => {
                let catalog = store.catalog()?;
                let recipe = resolve_recipe(&catalog, recipe)?;
                let selected = match version {
                    Some(n) => recipe.version_number(*n).ok_or_else(|| {
                        format!("'{}' has no version {}", recipe.name(), n)
                    })?,
                    None => recipe
                        .current_version()
                        .ok_or_else(|| format!("'{}' has no saved versions", recipe.name()))?,
                };

                let nutrition =
                    aggregate_with(selected, &catalog, &catalog, &config.aggregation_options())?;
                let report = VersionReport {
                    recipe_id: recipe.id().to_string(),
                    name: recipe.name(),
                    description: recipe.description(),
                    version_number: selected.version_number(),
                    current: recipe.current_version_id() == Some(selected.id()),
                    servings: selected.servings() as f64,
                    items: item_reports(&catalog, selected.items()),
                    nutrition,
                    snapshot_per_serving: *selected.per_serving(),
                };

                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                    OutputFormat::Text => print_version_report(&report),
                }
                Ok(())
            }

            RecipeSubcommand::History { recipe, format } => {
                let catalog = store.catalog()?;
                let recipe = resolve_recipe(&catalog, recipe)?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(recipe.versions())?);
                    }
                    OutputFormat::Text => {
                        println!("{} ({} versions)", recipe.name(), recipe.versions().len());
                        for v in recipe.versions().iter().rev() {
                            print_history_line(recipe, v);
                        }
                    }
                }
                Ok(())
            }

            RecipeSubcommand::Scale {
                recipe,
                servings,
                weight,
                unit,
                format,
            } => {
                let mode = match (servings, weight, unit) {
                    (Some(servings), _, _) => ScaleMode::ByServings {
                        servings: *servings,
                    },
                    (None, Some(weight), Some(unit)) => ScaleMode::ByTotalWeight {
                        weight: *weight,
                        unit: *unit,
                    },
                    _ => return Err("Give either --servings or --weight with --unit".into()),
                };

                let catalog = store.catalog()?;
                let recipe = resolve_recipe(&catalog, recipe)?;
                let version = recipe
                    .current_version()
                    .ok_or_else(|| format!("'{}' has no saved versions", recipe.name()))?;
                let scaled = scale_with(
                    version,
                    mode,
                    &catalog,
                    &catalog,
                    &config.aggregation_options(),
                )?;

                let report = ScaleReport {
                    recipe_id: recipe.id().to_string(),
                    name: recipe.name().to_string(),
                    mode,
                    scale_factor: scaled.scale_factor,
                    servings: scaled.servings,
                    items: item_reports(&catalog, &scaled.items),
                    nutrition: scaled.nutrition,
                    scaling_warnings: scaled.warnings,
                };

                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                    OutputFormat::Text => {
                        println!("{} scaled to {}", report.name, report.mode);
                        println!("Scale factor: {:.4}\n", report.scale_factor);
                        print_items(&report.items);
                        println!();
                        print_totals(&report.nutrition);
                        if !report.scaling_warnings.is_empty() {
                            println!("\nScaling warnings:");
                        }
                        for warning in &report.scaling_warnings {
                            println!("  - {}", warning);
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

/// Loads a recipe, lets `edit` change its draft, and saves the result as a
/// new version.
fn edit_recipe<F>(
    store: &PantryStore,
    config: &Config,
    identifier: &str,
    edit: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(&Catalog, &mut RecipeDraft) -> Result<(), Box<dyn std::error::Error>>,
{
    let mut catalog = store.catalog()?;
    let id = resolve_recipe(&catalog, identifier)?.id();

    let mut draft = match catalog.recipe(&id) {
        Some(recipe) => recipe.draft(),
        None => return Err(StoreError::NotFound(identifier.to_string()).into()),
    };
    edit(&catalog, &mut draft)?;

    let mut recipe = catalog
        .take_recipe(&id)
        .ok_or_else(|| StoreError::NotFound(identifier.to_string()))?;
    let outcome = recipe.save(draft, &catalog, &catalog, &config.aggregation_options())?;

    match outcome {
        SaveOutcome::Created(_) => {
            store.save_recipe(&recipe)?;
            let version = recipe
                .current_version()
                .map(|v| v.version_number())
                .unwrap_or_default();
            println!("Saved '{}' as version {}", recipe.name(), version);
        }
        SaveOutcome::Unchanged(_) => {
            println!("No changes to '{}'", recipe.name());
        }
    }
    Ok(())
}

fn item_reports(catalog: &Catalog, items: &[RecipeItem]) -> Vec<ItemReport> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let (kind, id, name) = match item.reference() {
                ItemRef::Food(id) => (
                    "food",
                    id.to_string(),
                    catalog.food(&id).map(|f| f.name.clone()),
                ),
                ItemRef::Recipe(id) => (
                    "recipe",
                    id.to_string(),
                    catalog.recipe(&id).map(|r| r.name().to_string()),
                ),
            };
            ItemReport {
                line: i + 1,
                kind,
                name: name.unwrap_or_else(|| format!("<missing {}>", kind)),
                id,
                amount: item.amount(),
                unit: item.unit(),
            }
        })
        .collect()
}

fn print_items(items: &[ItemReport]) {
    if items.is_empty() {
        println!("  (no items)");
    }
    for item in items {
        let marker = if item.kind == "recipe" { " (recipe)" } else { "" };
        println!(
            "  {:>2}. {} {} {}{}",
            item.line,
            format_amount(item.amount),
            item.unit,
            item.name,
            marker
        );
    }
}

fn print_version_report(report: &VersionReport) {
    println!("{}", report.name);
    println!("{}", "=".repeat(report.name.chars().count()));
    if let Some(description) = report.description {
        println!("{}", description);
    }
    let current = if report.current { " (current)" } else { "" };
    println!("Version {}{}", report.version_number, current);
    println!("Servings: {}\n", format_amount(report.servings));

    println!("Items:");
    print_items(&report.items);
    println!();
    print_totals(&report.nutrition);

    if !report
        .snapshot_per_serving
        .approx_eq(&report.nutrition.per_serving, 1e-9)
    {
        println!("\nPer serving when this version was saved:");
        println!("  {}", report.snapshot_per_serving);
    }
}

fn print_history_line(recipe: &Recipe, version: &RecipeVersion) {
    let marker = if recipe.current_version_id() == Some(version.id()) {
        "*"
    } else {
        " "
    };
    println!(
        "{} v{:<3} {}  {} servings, {} items, {:.0} kcal/serving",
        marker,
        version.version_number(),
        version.created_at().format("%Y-%m-%d %H:%M"),
        version.servings(),
        version.items().len(),
        version.per_serving().calories
    );
}
