//src/storage.rs
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use strum_macros::{Display, EnumIter};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::athlete::{self, Athlete, Roster};
use crate::plan::PlanBook;
use crate::settings::Settings;

pub const SETTINGS_FILE: &str = "settings.json";
pub const ATHLETES_FILE: &str = "athletes.csv";
pub const PLANS_FILE: &str = "training_plans.json";
pub const PERFORMANCE_FILE: &str = "performance_data.json";

const APP_DATA_DIR: &str = "athletik-plus";
const DATA_ENV_VAR: &str = "ATHLETIK_DATA_DIR";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to get application data directory")]
    DataDir,
    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to serialize {resource}: {source}")]
    Json {
        resource: Resource,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize athletes: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to replace {path:?} after {replaced} other file(s) were replaced: {source}")]
    Replace {
        path: PathBuf,
        replaced: usize,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// True if the failed save had already replaced some files, so the data
    /// directory now mixes old and new state.
    pub const fn is_partial(&self) -> bool {
        matches!(self, Self::Replace { replaced, .. } if *replaced > 0)
    }
}

/// The four files kept in the data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Resource {
    Settings,
    Athletes,
    Plans,
    Performance,
}

impl Resource {
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Settings => SETTINGS_FILE,
            Self::Athletes => ATHLETES_FILE,
            Self::Plans => PLANS_FILE,
            Self::Performance => PERFORMANCE_FILE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    dir: PathBuf,
}

impl DataPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file(&self, resource: Resource) -> PathBuf {
        self.dir.join(resource.file_name())
    }
}

/// Default location of the data directory: `$ATHLETIK_DATA_DIR`, else the
/// platform data dir.
pub fn default_data_dir() -> Result<PathBuf, StorageError> {
    if let Some(dir) = std::env::var_os(DATA_ENV_VAR) {
        return Ok(PathBuf::from(dir));
    }
    let data_dir = dirs::data_dir().ok_or(StorageError::DataDir)?;
    Ok(data_dir.join(APP_DATA_DIR))
}

/// Everything the dashboard keeps on disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppData {
    pub settings: Settings,
    pub athletes: Roster,
    pub plans: PlanBook,
    /// Reserved for measurements; read and written whole.
    pub performance: Map<String, Value>,
}

/// A resource that was present but unreadable and was replaced by its empty default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegradedResource {
    pub resource: Resource,
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub degraded: Vec<DegradedResource>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.degraded.is_empty()
    }

    fn settle<T: Default>(
        &mut self,
        resource: Resource,
        path: &Path,
        outcome: Result<Option<T>, String>,
    ) -> T {
        match outcome {
            Ok(Some(value)) => {
                debug!(%resource, path = %path.display(), "loaded resource");
                value
            }
            Ok(None) => {
                debug!(%resource, path = %path.display(), "resource missing, using default");
                T::default()
            }
            Err(reason) => {
                warn!(%resource, path = %path.display(), %reason, "resource unreadable, using default");
                self.degraded.push(DegradedResource {
                    resource,
                    path: path.to_path_buf(),
                    reason,
                });
                T::default()
            }
        }
    }
}

/// Reads all four resources. Never fails: a missing or corrupt file yields that
/// resource's empty default, and corrupt ones are listed in the report.
pub fn load(paths: &DataPaths) -> (AppData, LoadReport) {
    let mut report = LoadReport::default();

    let settings_path = paths.file(Resource::Settings);
    let settings = report.settle(
        Resource::Settings,
        &settings_path,
        read_json::<Settings>(&settings_path),
    );

    let athletes_path = paths.file(Resource::Athletes);
    let athletes = report.settle(
        Resource::Athletes,
        &athletes_path,
        read_athletes(&athletes_path),
    );

    let plans_path = paths.file(Resource::Plans);
    let plans = report.settle(
        Resource::Plans,
        &plans_path,
        read_json::<PlanBook>(&plans_path),
    );

    let performance_path = paths.file(Resource::Performance);
    let performance = report.settle(
        Resource::Performance,
        &performance_path,
        read_json::<Map<String, Value>>(&performance_path),
    );

    info!(
        dir = %paths.dir().display(),
        athletes = athletes.len(),
        plans = plans.len(),
        degraded = report.degraded.len(),
        "data loaded"
    );

    (
        AppData {
            settings,
            athletes,
            plans,
            performance,
        },
        report,
    )
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| e.to_string())
}

fn read_athletes(path: &Path) -> Result<Option<Roster>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let mut reader = csv::Reader::from_path(path).map_err(|e| e.to_string())?;
    let rows = reader
        .deserialize::<Athlete>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;
    Ok(Some(Roster::from(rows)))
}

/// Writes all four resources, each as a whole-file replacement.
///
/// Every file is serialized and written to a `.tmp` sibling first; the originals
/// are only replaced once all four are staged, so a serialization or write error
/// leaves the data directory untouched.
pub fn save(paths: &DataPaths, data: &AppData) -> Result<(), StorageError> {
    fs::create_dir_all(paths.dir()).map_err(|source| StorageError::Write {
        path: paths.dir().to_path_buf(),
        source,
    })?;

    let contents = [
        (Resource::Athletes, athletes_bytes(&data.athletes)?),
        (Resource::Plans, json_bytes(Resource::Plans, &data.plans)?),
        (
            Resource::Performance,
            json_bytes(Resource::Performance, &data.performance)?,
        ),
        (Resource::Settings, json_bytes(Resource::Settings, &data.settings)?),
    ];

    let mut staged = Vec::with_capacity(contents.len());
    for (resource, bytes) in contents {
        let path = paths.file(resource);
        match stage(&path, &bytes) {
            Ok(tmp_path) => staged.push((tmp_path, path)),
            Err(e) => {
                discard(&staged);
                return Err(e);
            }
        }
    }

    for (replaced, (tmp_path, path)) in staged.iter().enumerate() {
        if let Err(source) = fs::rename(tmp_path, path) {
            discard(&staged[replaced..]);
            return Err(StorageError::Replace {
                path: path.clone(),
                replaced,
                source,
            });
        }
    }

    debug!(dir = %paths.dir().display(), "data saved");
    Ok(())
}

fn json_bytes<T: Serialize>(resource: Resource, value: &T) -> Result<Vec<u8>, StorageError> {
    let mut buf = serde_json::to_vec_pretty(value)
        .map_err(|source| StorageError::Json { resource, source })?;
    buf.push(b'\n');
    Ok(buf)
}

fn athletes_bytes(roster: &Roster) -> Result<Vec<u8>, StorageError> {
    // Headers are written by hand so an empty roster still gets them.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(athlete::COLUMNS)?;
    for athlete in roster {
        writer.serialize(athlete)?;
    }
    writer
        .into_inner()
        .map_err(|e| StorageError::Csv(csv::Error::from(e.into_error())))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    PathBuf::from(tmp_name)
}

fn stage(path: &Path, contents: &[u8]) -> Result<PathBuf, StorageError> {
    let tmp_path = tmp_path(path);
    fs::write(&tmp_path, contents).map_err(|source| StorageError::Write {
        path: tmp_path.clone(),
        source,
    })?;
    Ok(tmp_path)
}

fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (tmp_path, _) in staged {
        if let Err(e) = fs::remove_file(tmp_path) {
            debug!(path = %tmp_path.display(), error = %e, "could not remove staged file");
        }
    }
}
