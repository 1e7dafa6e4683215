mod config_cmd;
mod day;
mod food;
mod recipe;

pub use config_cmd::ConfigCommand;
pub use day::DayCommand;
pub use food::FoodCommand;
pub use recipe::RecipeCommand;

use chrono::{Local, NaiveDate};
use clap::ValueEnum;
use pantry_core::{AggregationWarning, NutritionProfile, NutritionTotals};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Parses a YYYY-MM-DD date, defaulting to today.
fn parse_date(date: Option<&str>) -> Result<NaiveDate, String> {
    match date {
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .map_err(|_| format!("Invalid date format '{}'. Use YYYY-MM-DD.", d)),
        None => Ok(Local::now().date_naive()),
    }
}

fn print_totals(totals: &NutritionTotals) {
    println!("Total ({} servings):", format_amount(totals.servings));
    println!("  {}", totals.total);
    println!("Per serving:");
    println!("  {}", totals.per_serving);
    print_warnings(&totals.warnings);
}

fn print_warnings(warnings: &[AggregationWarning]) {
    if warnings.is_empty() {
        return;
    }
    println!("\nWarnings:");
    for warning in warnings {
        println!("  - {}", warning);
    }
}

fn print_profile_table(profile: &NutritionProfile) {
    for (name, value) in profile.fields() {
        let unit = match name {
            "calories" => "kcal",
            "sodium" => "mg",
            _ => "g",
        };
        println!("  {:<10} {:>8.1} {}", name, value, unit);
    }
}

/// Drops a trailing ".0" so whole amounts print as integers.
fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}
