//! Lumen CLI
//!
//! Builds per-room-type occupancy feature tables from hotel reservations.

use clap::{Parser, Subcommand};
use lumen::{Config, Result};

#[derive(Parser)]
#[command(name = "lumen")]
#[command(about = "Hotel occupancy feature tables for demand forecasting", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reservation store commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Build and write the per-room-type feature tables
    Build {
        /// Reservation CSV to read instead of the database
        #[arg(long)]
        input: Option<String>,
        /// Output directory override
        #[arg(long)]
        output: Option<String>,
    },
    /// Print the ordered model input columns
    Features,
    /// Print one room type's model inputs for a date from the written tables
    Vector {
        /// Room category id
        room_type: u32,
        /// Stay date (YYYY-MM-DD)
        date: String,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Load a reservation CSV into the database
    Import {
        /// Path to the CSV file
        path: String,
        /// Discard previously imported reservations first
        #[arg(long)]
        replace: bool,
    },
    /// Show database status
    Status,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Import { path, replace } => commands::data_import(&config, &path, replace),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Build { input, output } => commands::build(&config, input, output),
        Commands::Features => commands::features(&config),
        Commands::Vector { room_type, date } => commands::vector(&config, room_type, &date),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use lumen::data::dataset::FeatureLayout;
    use lumen::data::reservations::parse_date;
    use lumen::data::tables::{read_dataset, table_file_name};
    use lumen::data::{Database, DatasetWriter, EventCalendar, ReservationReader};
    use lumen::pipeline::FeaturePipeline;
    use lumen::{LumenError, RoomTypeId};
    use std::path::Path;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        for path in [&config.data.database_path, &config.data.events_path] {
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::create_dir_all(&config.data.output_dir)?;
        println!("Created data, events and {} directories", config.data.output_dir);

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Place events.json and separated_events.json under events/");
        println!("  3. Run 'lumen data import <reservations.csv>' to load bookings");
        println!("  4. Run 'lumen build' to write the feature tables");

        Ok(())
    }

    pub fn data_import(config: &Config, path: &str, replace: bool) -> Result<()> {
        let records = ReservationReader::read_path(path)?;
        let mut db = Database::open(&config.data.database_path)?;

        let count = if replace {
            db.replace_reservations(&records)?
        } else {
            db.insert_reservations(&records)?
        };
        println!("Stored {} reservations in database", count);

        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:          {}", config.data.database_path);
        println!("  Reservations:  {}", stats.reservation_count);
        println!("  Cancelled:     {}", stats.cancelled_count);
        if let (Some(earliest), Some(latest)) = (stats.earliest_stay, stats.latest_stay) {
            println!("  Stay dates:    {} to {}", earliest, latest);
        }

        Ok(())
    }

    pub fn build(config: &Config, input: Option<String>, output: Option<String>) -> Result<()> {
        let records = match input {
            Some(path) => ReservationReader::read_path(&path)?,
            None => {
                let db = Database::open(&config.data.database_path)?;
                let records = db.get_all_reservations()?;
                log::info!("Loaded {} reservations from database", records.len());
                records
            }
        };

        let calendar =
            EventCalendar::load(&config.data.events_path, &config.data.event_assignments_path)?;
        let pipeline =
            FeaturePipeline::new(config.pipeline.clone(), calendar)?.with_scaling(&config.scaling);

        let output_dir = output.unwrap_or_else(|| config.data.output_dir.clone());
        let writer = DatasetWriter::new(&output_dir, pipeline.layout());
        let paths = pipeline.run(&records, &writer)?;

        println!("Wrote {} feature tables to {}", paths.len(), output_dir);
        for path in paths {
            println!("  {}", path.display());
        }

        Ok(())
    }

    pub fn features(config: &Config) -> Result<()> {
        let layout = FeatureLayout::from_config(&config.pipeline);
        for (i, column) in layout.inference_columns().into_iter().enumerate() {
            println!("{:>3}  {}", i, layout.column_name(column));
        }
        Ok(())
    }

    pub fn vector(config: &Config, room_type: u32, date: &str) -> Result<()> {
        let room_type = RoomTypeId(room_type);
        if !config.pipeline.room_types().contains(&room_type) {
            return Err(LumenError::UnknownRoomType(room_type));
        }
        let date = parse_date(date)
            .ok_or_else(|| LumenError::Config(format!("Invalid date: {}", date)))?;

        let layout = FeatureLayout::from_config(&config.pipeline);
        let path = Path::new(&config.data.output_dir).join(table_file_name(room_type));
        let dataset = read_dataset(&path, room_type, &layout)?;
        let values = dataset.feature_vector(date, &layout)?;

        for (column, value) in layout.inference_columns().into_iter().zip(values) {
            println!("{:<24} {}", layout.column_name(column), value);
        }
        Ok(())
    }
}
