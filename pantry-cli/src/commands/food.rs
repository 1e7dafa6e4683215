use clap::{Args, Subcommand};
use pantry_core::{Food, NutritionProfile};

use super::{print_profile_table, OutputFormat};
use crate::store::{resolve_food, PantryStore};

#[derive(Args)]
pub struct FoodCommand {
    #[command(subcommand)]
    pub command: FoodSubcommand,
}

#[derive(Subcommand)]
pub enum FoodSubcommand {
    /// Add a food with its nutrition per 100 g
    Add {
        /// Name of the food
        name: String,

        /// Energy in kcal per 100 g
        #[arg(long)]
        calories: f64,

        /// Protein in grams per 100 g
        #[arg(long)]
        protein: f64,

        /// Carbohydrates in grams per 100 g
        #[arg(long)]
        carbs: f64,

        /// Fat in grams per 100 g
        #[arg(long)]
        fat: f64,

        /// Fiber in grams per 100 g
        #[arg(long, default_value_t = 0.0)]
        fiber: f64,

        /// Sugar in grams per 100 g
        #[arg(long, default_value_t = 0.0)]
        sugar: f64,

        /// Sodium in milligrams per 100 g
        #[arg(long, default_value_t = 0.0)]
        sodium: f64,
    },

    /// List all foods
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a food's nutrition
    Show {
        /// Food ID (UUID) or name
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl FoodCommand {
    pub fn run(&self, store: &PantryStore) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            FoodSubcommand::Add {
                name,
                calories,
                protein,
                carbs,
                fat,
                fiber,
                sugar,
                sodium,
            } => {
                let name = name.trim();
                if name.is_empty() {
                    return Err("Food name cannot be empty".into());
                }
                let profile = NutritionProfile::new(*calories, *protein, *carbs, *fat)
                    .with_fiber(*fiber)
                    .with_sugar(*sugar)
                    .with_sodium(*sodium);
                validate_profile(&profile)?;

                let food = Food::new(name, profile);
                store.add_food(&food)?;
                println!("Added food {} ({})", food.name, food.id);
                Ok(())
            }

            FoodSubcommand::List { format } => {
                let catalog = store.catalog()?;
                let foods = catalog.foods();
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&foods)?),
                    OutputFormat::Text => {
                        if foods.is_empty() {
                            println!("No foods yet. Add one with 'pantry food add'.");
                        }
                        for food in foods {
                            println!(
                                "{:<24} {:>6.0} kcal/100g  {}",
                                food.name, food.profile.calories, food.id
                            );
                        }
                    }
                }
                Ok(())
            }

            FoodSubcommand::Show { identifier, format } => {
                let catalog = store.catalog()?;
                let food = resolve_food(&catalog, identifier)?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(food)?),
                    OutputFormat::Text => {
                        println!("{}", food.name);
                        println!("{}", "=".repeat(food.name.chars().count()));
                        println!("ID: {}", food.id);
                        println!("Per 100g:");
                        print_profile_table(&food.profile);
                    }
                }
                Ok(())
            }
        }
    }
}

fn validate_profile(profile: &NutritionProfile) -> Result<(), String> {
    match profile
        .fields()
        .into_iter()
        .find(|(_, v)| !v.is_finite() || *v < 0.0)
    {
        Some((name, value)) => Err(format!(
            "{} must be a non-negative number, got {}",
            name, value
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_profile() {
        assert!(validate_profile(&NutritionProfile::new(155.0, 13.0, 1.1, 11.0)).is_ok());
        let err = validate_profile(&NutritionProfile::new(155.0, -1.0, 1.1, 11.0)).unwrap_err();
        assert!(err.contains("protein"));
        assert!(validate_profile(&NutritionProfile::zero().with_sodium(f64::NAN)).is_err());
    }
}
