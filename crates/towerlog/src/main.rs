use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use towerlog::commands::{self, MilestoneInput};
use towerlog::config::{self, Config};
use towerlog::{FileStore, RecordStore, ReportParser};

#[derive(Parser)]
#[command(name = "towerlog")]
#[command(about = "Towerlog - battle report tracker\nParse, store and compare your Tower runs")]
#[command(version)]
struct Cli {
  /// Log debug output to stderr
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Parse a battle report and preview it without saving
  Parse {
    /// Report file; reads stdin when omitted
    file: Option<PathBuf>,
  },
  /// Parse a battle report and save it
  Add {
    /// Report file; reads stdin when omitted
    file: Option<PathBuf>,
  },
  /// List saved runs
  List,
  /// Show every recorded stat of one run
  Show {
    /// Battle date of the run
    battle_date: String,
  },
  /// Replace a run with a JSON body
  Edit {
    /// Battle date of the run to replace
    battle_date: String,
    /// JSON file holding the new run
    file: PathBuf,
  },
  /// Delete one run
  Delete {
    /// Battle date of the run
    battle_date: String,
  },
  /// Delete every run
  Clear {
    /// Also delete every milestone
    #[arg(long)]
    all: bool,
    /// Skip confirmation prompt
    #[arg(short, long)]
    force: bool,
  },
  /// Show one metric across runs, oldest first
  Trend {
    /// Field name, e.g. coinsEarned
    field: String,
  },
  /// Manage lab research milestones
  #[command(subcommand)]
  Milestone(MilestoneCommands),
  /// Write all runs and milestones as JSON
  Export {
    /// Output file; prints to stdout when omitted
    file: Option<PathBuf>,
  },
  /// Merge an export file into the store
  Import {
    /// Export file, or a legacy array of runs
    file: PathBuf,
  },
}

#[derive(Subcommand)]
enum MilestoneCommands {
  /// Start tracking a lab research
  Add {
    /// Research category, e.g. Attack
    #[arg(short, long, default_value = "")]
    category: String,
    /// Research name
    name: String,
    #[arg(short, long, default_value_t = 0)]
    days: u32,
    #[arg(long, default_value_t = 0)]
    hours: u32,
    #[arg(short, long, default_value_t = 0)]
    minutes: u32,
    /// Lab speed multiplier
    #[arg(short, long, default_value_t = 1.0)]
    speed: f64,
  },
  /// List milestones with their countdowns
  List,
  /// Delete one milestone
  Delete {
    /// Milestone id
    id: String,
  },
  /// Delete every milestone
  Clear {
    /// Skip confirmation prompt
    #[arg(short, long)]
    force: bool,
  },
}

fn init_logging(verbose: bool, config: &Config) {
  let filter = if verbose {
    EnvFilter::new("towerlog=debug,warn")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
  };

  tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let root = config::get_data_root()?;
  let config = Config::load(&root).with_context(|| format!("failed to load config from {}", root.display()))?;
  init_logging(cli.verbose, &config);

  let parser = ReportParser::new(config.min_matched_fields);
  let mut store = RecordStore::new(FileStore::new(&root));

  match cli.command {
    Commands::Parse { file } => {
      let text = commands::read_input(file.as_deref())?;
      commands::preview_report(&parser, &text)?;
    }
    Commands::Add { file } => {
      let text = commands::read_input(file.as_deref())?;
      commands::add_run(&mut store, &parser, &text)?;
    }
    Commands::List => {
      commands::list_runs(&store)?;
    }
    Commands::Show { battle_date } => {
      commands::show_run(&store, &battle_date)?;
    }
    Commands::Edit { battle_date, file } => {
      let body = commands::read_input(Some(file.as_path()))?;
      commands::edit_run(&mut store, &battle_date, &body)?;
    }
    Commands::Delete { battle_date } => {
      commands::delete_run(&mut store, &battle_date)?;
    }
    Commands::Clear { all, force } => {
      commands::clear_runs(&mut store, all, force)?;
    }
    Commands::Trend { field } => {
      commands::show_trend(&store, &field)?;
    }
    Commands::Milestone(command) => match command {
      MilestoneCommands::Add { category, name, days, hours, minutes, speed } => {
        let input = MilestoneInput { category: &category, name: &name, days, hours, minutes, speed };
        commands::add_milestone(&mut store, input)?;
      }
      MilestoneCommands::List => commands::list_milestones(&store)?,
      MilestoneCommands::Delete { id } => commands::delete_milestone(&mut store, &id)?,
      MilestoneCommands::Clear { force } => commands::clear_milestones(&mut store, force)?,
    },
    Commands::Export { file } => {
      commands::export(&store, file.as_deref())?;
    }
    Commands::Import { file } => {
      let text = commands::read_input(Some(file.as_path()))?;
      commands::import(&mut store, &text)?;
    }
  }

  Ok(())
}
