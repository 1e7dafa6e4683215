use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod store;

use commands::{ConfigCommand, DayCommand, FoodCommand, RecipeCommand};
use config::Config;
use store::PantryStore;

#[derive(Parser)]
#[command(name = "pantry")]
#[command(version)]
#[command(about = "Recipe nutrition, scaling and version history", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage foods and their nutrition per 100 g
    Food(FoodCommand),

    /// Create, edit, inspect and scale recipes
    Recipe(RecipeCommand),

    /// Log and review what was eaten
    Day(DayCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "pantry=warn".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.clone())?;
    tracing::debug!(data_dir = %config.data_dir.value.display(), "Loaded configuration");

    let store = PantryStore::new(config.data_dir.value.clone());

    match &cli.command {
        Some(Commands::Food(cmd)) => cmd.run(&store)?,
        Some(Commands::Recipe(cmd)) => cmd.run(&store, &config)?,
        Some(Commands::Day(cmd)) => cmd.run(&store, &config)?,
        Some(Commands::Config(cmd)) => cmd.run(&config, cli.config.clone())?,
        None => println!("Use --help to see available commands"),
    }

    Ok(())
}
