use clap::{Args, Subcommand};
use pantry_core::{day_summary, DayEntry, EntryId, Unit};

use super::{format_amount, parse_date, print_profile_table, OutputFormat};
use crate::config::Config;
use crate::store::{resolve_recipe, PantryStore};

#[derive(Args)]
pub struct DayCommand {
    #[command(subcommand)]
    pub command: DaySubcommand,
}

#[derive(Subcommand)]
pub enum DaySubcommand {
    /// Log a portion of a recipe's current version
    Log {
        /// Recipe ID (UUID) or name
        recipe: String,

        /// Amount eaten
        #[arg(long)]
        amount: f64,

        /// Unit of the amount
        #[arg(long, default_value = "g")]
        unit: Unit,

        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long, short)]
        date: Option<String>,

        /// Add notes to the entry
        #[arg(long)]
        notes: Option<String>,
    },

    /// Show what was logged on a day
    Show {
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long, short)]
        date: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Remove a logged entry
    Remove {
        /// Entry ID (UUID)
        id: EntryId,
    },
}

impl DayCommand {
    pub fn run(
        &self,
        store: &PantryStore,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            DaySubcommand::Log {
                recipe,
                amount,
                unit,
                date,
                notes,
            } => {
                let date = parse_date(date.as_deref())?;
                let catalog = store.catalog()?;
                let recipe = resolve_recipe(&catalog, recipe)?;

                let mut entry = DayEntry::pin(recipe, date, *amount, *unit)?;
                if let Some(notes) = notes {
                    entry = entry.with_notes(notes.as_str());
                }
                // Fail before writing if the entry cannot be computed.
                pantry_core::entry_nutrition(&entry, &catalog, &config.aggregation_options())?;
                store.add_entry(&entry)?;

                let version = recipe
                    .version(entry.version_id)
                    .map(|v| v.version_number())
                    .unwrap_or_default();
                println!(
                    "Logged {} {} of {} (version {}) on {}",
                    format_amount(entry.amount),
                    entry.unit,
                    recipe.name(),
                    version,
                    entry.date
                );
                Ok(())
            }

            DaySubcommand::Show { date, format } => {
                let date = parse_date(date.as_deref())?;
                let catalog = store.catalog()?;
                let entries = store.entries_for_date(date)?;
                let summary =
                    day_summary(date, &entries, &catalog, &config.aggregation_options())?;

                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
                    OutputFormat::Text => {
                        println!("{}", summary.date.format("%A, %B %d, %Y"));
                        println!("{}", "=".repeat(40));
                        if summary.entries.is_empty() {
                            println!("Nothing logged.");
                            return Ok(());
                        }
                        for (entry, nutrition) in &summary.entries {
                            let (name, version) = catalog
                                .recipe(&entry.recipe_id)
                                .map(|r| {
                                    let number = r
                                        .version(entry.version_id)
                                        .map(|v| v.version_number())
                                        .unwrap_or_default();
                                    (r.name().to_string(), number)
                                })
                                .unwrap_or_else(|| ("<missing recipe>".to_string(), 0));
                            println!(
                                "  {} {} {} (v{})  {:.0} kcal",
                                format_amount(entry.amount),
                                entry.unit,
                                name,
                                version,
                                nutrition.calories
                            );
                            if let Some(notes) = &entry.notes {
                                println!("      {}", notes);
                            }
                            println!("      id: {}", entry.id);
                        }
                        println!("  {}", "-".repeat(38));
                        println!("Daily total:");
                        print_profile_table(&summary.total);
                    }
                }
                Ok(())
            }

            DaySubcommand::Remove { id } => {
                store.remove_entry(*id)?;
                println!("Removed entry {}", id);
                Ok(())
            }
        }
    }
}
