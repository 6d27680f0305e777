// src/cli.rs
use athletik_lib::ExerciseDetail;
use chrono::{Duration, Local, NaiveDate};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Manage athletes and training plans", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    /// Print `plan list`, `plan show`, `today` and `athlete list` as CSV instead of tables
    #[arg(long, global = true)]
    pub export_csv: bool,
}

// Custom parser for date strings and shorthands
pub fn parse_date_shorthand(s: &str) -> Result<NaiveDate, String> {
    match s.trim().to_lowercase().as_str() {
        "today" => Ok(Local::now().date_naive()),
        "yesterday" => Ok((Local::now() - Duration::days(1)).date_naive()),
        "tomorrow" => Ok((Local::now() + Duration::days(1)).date_naive()),
        _ => athletik_lib::parse_unit_date(s).map_err(|e| e.to_string()),
    }
}

fn parse_exercise(s: &str) -> Result<ExerciseDetail, String> {
    s.parse::<ExerciseDetail>().map_err(|e| e.to_string())
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the overview: counts and today's units
    Dashboard {
        /// Day to show (today, yesterday, DD.MM.YYYY or YYYY-MM-DD)
        #[arg(long, value_parser = parse_date_shorthand, default_value = "today")]
        date: NaiveDate,
    },
    /// Manage training plans
    #[command(subcommand)]
    Plan(PlanCommands),
    /// Manage units within a plan
    #[command(subcommand)]
    Unit(UnitCommands),
    /// List the units scheduled for a day across all plans
    Today {
        #[arg(long, value_parser = parse_date_shorthand, default_value = "today")]
        date: NaiveDate,
    },
    /// Manage the athlete roster
    #[command(subcommand)]
    Athlete(AthleteCommands),
    /// Change stored settings
    #[command(subcommand)]
    Settings(SettingsCommands),
    /// Show or change the application config
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Show the paths of the config and data files
    Paths,
    /// Generate shell completion scripts
    GenerateCompletion {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum PlanCommands {
    /// Create a new, active plan
    Create { name: String },
    /// List all plans with their status
    List,
    /// Show the units of a plan, newest first
    Show { name: String },
    /// Mark a plan as active
    Activate { name: String },
    /// Mark a plan as inactive
    Deactivate { name: String },
}

#[derive(Subcommand, Debug)]
pub enum UnitCommands {
    /// Add a unit with structured exercises
    Add {
        plan: String,
        /// Date as DD.MM.YYYY or YYYY-MM-DD
        #[arg(short, long)]
        date: String,
        /// Focus of the session (e.g. "Strength")
        #[arg(short, long, default_value = "")]
        focus: String,
        /// Exercise as "name;sets;reps;intensity", e.g. "Squat;3;8-12;80%". Repeatable.
        #[arg(short, long = "exercise", value_parser = parse_exercise, required = true)]
        exercises: Vec<ExerciseDetail>,
    },
    /// Add a unit from a comma-separated list of exercise names
    AddList {
        plan: String,
        #[arg(short, long)]
        date: String,
        #[arg(short, long, default_value = "")]
        focus: String,
        /// e.g. "Squats, Pushups, Plank"
        #[arg(short, long, default_value = "")]
        exercises: String,
    },
    /// Delete a unit by its index (as shown by `plan show`)
    Delete { plan: String, index: usize },
}

#[derive(Subcommand, Debug)]
pub enum AthleteCommands {
    /// Add an athlete
    Add {
        #[arg(short, long)]
        name: String,
        #[arg(short, long, default_value_t = 20)]
        age: u32,
        /// Height in cm
        #[arg(long, default_value_t = 180)]
        height: u32,
        /// Weight in kg
        #[arg(short, long, default_value_t = 80)]
        weight: u32,
        #[arg(short, long, default_value = "")]
        team: String,
        #[arg(short, long, default_value = "")]
        sport: String,
    },
    /// List all athletes
    List,
    /// Delete athletes by index
    Delete {
        #[arg(required = true)]
        indices: Vec<usize>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Set the trainer name shown on the dashboard
    SetTrainer { name: String },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the current config
    Show,
    /// Store the data files in another directory
    SetDataDir { dir: PathBuf },
    /// Set the table header colour (e.g. Green, DarkCyan)
    SetHeaderColor { color: String },
}

// Function to parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
