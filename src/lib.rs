use anyhow::Context;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

// --- Declare modules ---
pub mod athlete;
mod config;
pub mod logging;
pub mod plan;
pub mod settings;
pub mod storage;

// --- Expose public types ---
pub use athlete::{Athlete, AthleteError, NewAthlete, Roster};
pub use config::{
    get_config_path as get_config_path_util, load as load_config_util, parse_color,
    save as save_config_util, Config, Error as ConfigError, StandardColor, Theme,
};
pub use plan::{
    format_display_date, parse_unit_date, units_for_today, Exercise, ExerciseDetail, PlanBook,
    PlanError, TodayUnit, Unit,
};
pub use settings::{Settings, SettingsError};
pub use storage::{
    AppData, DataPaths, DegradedResource, LoadReport, Resource, StorageError,
};

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Athlete(#[from] AthleteError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Failed to save data: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// What a successful mutation changed. Callers decide how to refresh from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    PlanCreated { name: String },
    PlanStatusChanged { name: String, active: bool },
    UnitAdded { plan: String, index: usize, date: String },
    UnitDeleted { plan: String, index: usize },
    AthleteAdded { name: String, index: usize },
    AthletesRemoved { count: usize },
    TrainerRenamed { name: String },
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlanCreated { name } => write!(f, "Created plan '{name}'."),
            Self::PlanStatusChanged { name, active } => write!(
                f,
                "Plan '{name}' is now {}.",
                if *active { "active" } else { "inactive" }
            ),
            Self::UnitAdded { plan, index, date } => write!(
                f,
                "Added unit #{index} on {} to plan '{plan}'.",
                format_display_date(date)
            ),
            Self::UnitDeleted { plan, index } => {
                write!(f, "Deleted unit #{index} from plan '{plan}'.")
            }
            Self::AthleteAdded { name, index } => {
                write!(f, "Saved athlete '{name}' (#{index}).")
            }
            Self::AthletesRemoved { count } => write!(f, "Removed {count} athlete(s)."),
            Self::TrainerRenamed { name } => write!(f, "Trainer name set to '{name}'."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    pub trainer_name: String,
    pub athlete_count: usize,
    pub plan_count: usize,
    pub active_plan_count: usize,
    pub today: Vec<TodayUnit>,
}

/// Application state for one session: loaded once, mutated through the methods
/// below, persisted after every change.
pub struct AppService {
    pub config: Config,
    pub config_path: PathBuf,
    pub paths: DataPaths,
    pub load_report: LoadReport,
    data: AppData,
}

impl AppService {
    /// Initializes the application service.
    /// # Errors
    /// Returns `anyhow::Error` if the config or data location cannot be determined or
    /// the config file cannot be read.
    pub fn initialize() -> anyhow::Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load(&config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"))?;

        let data_dir = match &config.data_dir {
            Some(dir) => dir.clone(),
            None => storage::default_data_dir().context("Failed to determine data directory")?,
        };

        Ok(Self::open(config, config_path, data_dir))
    }

    /// Loads the data files in `data_dir`. Unreadable files are replaced by their
    /// defaults and recorded in `load_report`.
    pub fn open(config: Config, config_path: PathBuf, data_dir: impl Into<PathBuf>) -> Self {
        let paths = DataPaths::new(data_dir);
        let (data, load_report) = storage::load(&paths);
        Self {
            config,
            config_path,
            paths,
            load_report,
            data,
        }
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn data_dir(&self) -> &Path {
        self.paths.dir()
    }

    /// Saves the current configuration state.
    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        config::save(&self.config_path, &self.config)
    }

    /// Sets the data directory used from the next start on.
    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn set_data_dir(&mut self, dir: PathBuf) -> Result<(), ConfigError> {
        self.config.data_dir = Some(dir);
        self.save_config()
    }

    /// Sets the table header colour.
    /// # Errors
    /// - `ConfigError::InvalidColor` for unknown colour names.
    /// - `ConfigError` variants if saving fails.
    pub fn set_header_color(&mut self, color: &str) -> Result<StandardColor, ConfigError> {
        let parsed = parse_color(color)?;
        self.config.theme.header_color = format!("{parsed:?}");
        self.save_config()?;
        Ok(parsed)
    }

    /// Writes the whole state to disk.
    /// # Errors
    /// Returns `StorageError` if any file cannot be written.
    pub fn save(&self) -> Result<(), StorageError> {
        storage::save(&self.paths, &self.data)
    }

    // Applies a mutation and persists it. If either step fails the in-memory state is
    // restored. A failed save replaces no file unless a rename broke off halfway, in
    // which case the restored state is written back.
    fn commit<T, E>(&mut self, apply: impl FnOnce(&mut AppData) -> Result<T, E>) -> Result<T, Error>
    where
        Error: From<E>,
    {
        let snapshot = self.data.clone();
        let value = match apply(&mut self.data) {
            Ok(value) => value,
            Err(e) => {
                self.data = snapshot;
                return Err(e.into());
            }
        };
        if let Err(e) = storage::save(&self.paths, &self.data) {
            self.data = snapshot;
            if e.is_partial() {
                warn!(error = %e, "save stopped after replacing some files, restoring previous state");
                if let Err(restore) = storage::save(&self.paths, &self.data) {
                    error!(error = %restore, "failed to restore previous state on disk");
                }
            }
            return Err(e.into());
        }
        Ok(value)
    }

    // --- Reads ---

    pub const fn data(&self) -> &AppData {
        &self.data
    }

    pub const fn settings(&self) -> &Settings {
        &self.data.settings
    }

    pub fn trainer_name(&self) -> &str {
        &self.data.settings.trainer_name
    }

    pub const fn athletes(&self) -> &Roster {
        &self.data.athletes
    }

    pub const fn plans(&self) -> &PlanBook {
        &self.data.plans
    }

    pub const fn performance(&self) -> &Map<String, Value> {
        &self.data.performance
    }

    pub fn units_for_today(&self, today: NaiveDate) -> Vec<TodayUnit> {
        units_for_today(&self.data.plans, today)
    }

    pub fn dashboard(&self, today: NaiveDate) -> Dashboard {
        let mut today_units = self.units_for_today(today);
        today_units.truncate(self.config.today_preview_limit);
        Dashboard {
            trainer_name: self.data.settings.trainer_name.clone(),
            athlete_count: self.data.athletes.len(),
            plan_count: self.data.plans.len(),
            active_plan_count: self.data.plans.active_count(),
            today: today_units,
        }
    }

    // --- Plans ---

    /// Creates an empty, active plan.
    /// # Errors
    /// - `PlanError::InvalidInput` for an empty name.
    /// - `PlanError::DuplicateName` if the plan exists.
    /// - `StorageError` if saving fails.
    pub fn create_plan(&mut self, name: &str) -> Result<Change, Error> {
        self.commit(|data| data.plans.create_plan(name))?;
        info!(plan = %name, "plan created");
        Ok(Change::PlanCreated {
            name: name.to_string(),
        })
    }

    /// Sets a plan's status. Unknown names simply gain a status entry.
    /// # Errors
    /// Returns `StorageError` if saving fails.
    pub fn set_plan_status(&mut self, name: &str, active: bool) -> Result<Change, Error> {
        self.commit(|data| {
            data.plans.set_status(name, active);
            Ok::<_, PlanError>(())
        })?;
        if !self.data.plans.contains(name) {
            debug!(plan = %name, "status recorded for a plan that does not exist");
        }
        info!(plan = %name, active, "plan status changed");
        Ok(Change::PlanStatusChanged {
            name: name.to_string(),
            active,
        })
    }

    /// Adds a unit with structured or label exercises. At least one exercise is required.
    /// # Errors
    /// - `PlanError::PlanNotFound`, `PlanError::InvalidDate`, `PlanError::InvalidInput`.
    /// - `StorageError` if saving fails.
    pub fn add_unit(
        &mut self,
        plan: &str,
        date_text: &str,
        focus: &str,
        exercises: Vec<Exercise>,
    ) -> Result<Change, Error> {
        let index = self.commit(|data| data.plans.add_unit(plan, date_text, focus, exercises))?;
        Ok(self.unit_added(plan, index))
    }

    /// Adds a unit from a comma-separated exercise list, which may be empty.
    /// # Errors
    /// - `PlanError::PlanNotFound`, `PlanError::InvalidDate`.
    /// - `StorageError` if saving fails.
    pub fn add_unit_from_list(
        &mut self,
        plan: &str,
        date_text: &str,
        focus: &str,
        exercise_list: &str,
    ) -> Result<Change, Error> {
        let index = self.commit(|data| {
            data.plans
                .add_unit_from_list(plan, date_text, focus, exercise_list)
        })?;
        Ok(self.unit_added(plan, index))
    }

    fn unit_added(&self, plan: &str, index: usize) -> Change {
        let date = self
            .data
            .plans
            .units(plan)
            .and_then(|units| units.get(index))
            .map(|unit| unit.date.clone())
            .unwrap_or_default();
        info!(plan = %plan, index, date = %date, "unit added");
        Change::UnitAdded {
            plan: plan.to_string(),
            index,
            date,
        }
    }

    /// Deletes the unit at `index`. Positions of later units shift down by one.
    /// # Errors
    /// - `PlanError::PlanNotFound`, `PlanError::IndexOutOfRange`.
    /// - `StorageError` if saving fails.
    pub fn delete_unit(&mut self, plan: &str, index: usize) -> Result<Change, Error> {
        self.commit(|data| data.plans.delete_unit(plan, index))?;
        info!(plan = %plan, index, "unit deleted");
        Ok(Change::UnitDeleted {
            plan: plan.to_string(),
            index,
        })
    }

    // --- Athletes ---

    /// Validates and appends an athlete.
    /// # Errors
    /// - `AthleteError` for an empty name or values outside the allowed ranges.
    /// - `StorageError` if saving fails.
    pub fn add_athlete(&mut self, new: NewAthlete) -> Result<Change, Error> {
        let index = self.commit(|data| data.athletes.add(new))?;
        let name = self
            .data
            .athletes
            .iter()
            .nth(index)
            .map(|a| a.name.clone())
            .unwrap_or_default();
        info!(athlete = %name, index, "athlete added");
        Ok(Change::AthleteAdded { name, index })
    }

    /// Selects or deselects a row for deletion. The marker is not persisted.
    /// # Errors
    /// Returns `AthleteError::IndexOutOfRange` for an unknown row.
    pub fn mark_athlete(&mut self, index: usize, marked: bool) -> Result<(), Error> {
        self.data.athletes.mark(index, marked)?;
        Ok(())
    }

    /// Deletes every marked athlete.
    /// # Errors
    /// Returns `StorageError` if saving fails.
    pub fn remove_marked_athletes(&mut self) -> Result<Change, Error> {
        let count = self.commit(|data| Ok::<_, AthleteError>(data.athletes.remove_marked()))?;
        info!(count, "athletes removed");
        Ok(Change::AthletesRemoved { count })
    }

    /// Deletes the athletes at the given positions. Nothing is removed if any
    /// position is invalid.
    /// # Errors
    /// - `AthleteError::IndexOutOfRange` for an unknown row.
    /// - `StorageError` if saving fails.
    pub fn remove_athletes(&mut self, indices: &[usize]) -> Result<Change, Error> {
        let count = self.commit(|data| {
            for &index in indices {
                data.athletes.mark(index, true)?;
            }
            Ok::<_, AthleteError>(data.athletes.remove_marked())
        })?;
        info!(count, "athletes removed");
        Ok(Change::AthletesRemoved { count })
    }

    // --- Settings ---

    /// Sets the trainer name shown on the dashboard.
    /// # Errors
    /// - `SettingsError::EmptyTrainerName` for a blank name.
    /// - `StorageError` if saving fails.
    pub fn set_trainer_name(&mut self, name: &str) -> Result<Change, Error> {
        self.commit(|data| data.settings.set_trainer_name(name))?;
        let name = self.data.settings.trainer_name.clone();
        info!(trainer = %name, "trainer renamed");
        Ok(Change::TrainerRenamed { name })
    }
}
