//src/plan.rs
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

pub const MIN_SETS: u32 = 1;
pub const MAX_SETS: u32 = 20;
pub const DEFAULT_SETS: u32 = 3;

const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
const DOT_DATE_FORMAT: &str = "%d.%m.%Y";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid date '{0}'. Use DD.MM.YYYY (e.g. 01.02.2026) or YYYY-MM-DD.")]
    InvalidDate(String),
    #[error("Plan already exists: '{0}'")]
    DuplicateName(String),
    #[error("Plan not found: '{0}'")]
    PlanNotFound(String),
    #[error("Unit index {index} is out of range for plan '{plan}' ({len} unit(s))")]
    IndexOutOfRange {
        plan: String,
        index: usize,
        len: usize,
    },
}

/// Parses a unit date entered as `DD.MM.YYYY` or `YYYY-MM-DD`.
///
/// Text containing a `.` is read as the dotted form, anything else as ISO-8601.
pub fn parse_unit_date(text: &str) -> Result<NaiveDate, PlanError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(PlanError::InvalidInput("A date is required.".to_string()));
    }
    let parsed = if trimmed.contains('.') {
        NaiveDate::parse_from_str(trimmed, DOT_DATE_FORMAT)
    } else {
        NaiveDate::parse_from_str(trimmed, ISO_DATE_FORMAT)
    };
    parsed.map_err(|_| PlanError::InvalidDate(trimmed.to_string()))
}

/// Renders a stored ISO date as `DD.MM.YYYY`, or `?` if it cannot be read.
pub fn format_display_date(stored: &str) -> String {
    NaiveDate::parse_from_str(stored.trim(), ISO_DATE_FORMAT)
        .map_or_else(|_| "?".to_string(), |date| date.format(DOT_DATE_FORMAT).to_string())
}

/// One prescribed movement inside a unit.
///
/// Files written by older versions stored exercises either as a bare label or as a
/// record with German keys; both decode into `Label` or `Detailed`. Any other entry
/// is carried as `Unrecognized` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Exercise {
    Label(String),
    Detailed(ExerciseDetail),
    Unrecognized(Value),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExerciseDetail {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sets: Option<u32>,
    pub reps: String,
    pub intensity: String,
}

impl ExerciseDetail {
    /// Builds a structured exercise, checking the name and the set count.
    pub fn new(name: &str, sets: u32, reps: &str, intensity: &str) -> Result<Self, PlanError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlanError::InvalidInput(
                "Exercise name cannot be empty.".to_string(),
            ));
        }
        if !(MIN_SETS..=MAX_SETS).contains(&sets) {
            return Err(PlanError::InvalidInput(format!(
                "Sets must be between {MIN_SETS} and {MAX_SETS}, got {sets}."
            )));
        }
        Ok(Self {
            name: name.to_string(),
            sets: Some(sets),
            reps: reps.trim().to_string(),
            intensity: intensity.trim().to_string(),
        })
    }
}

// Accepts "name;sets;reps;intensity". Everything after the name is optional.
impl FromStr for ExerciseDetail {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(';').map(str::trim);
        let name = parts.next().unwrap_or_default();
        let sets = match parts.next() {
            None | Some("") => DEFAULT_SETS,
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                PlanError::InvalidInput(format!("Sets must be a whole number, got '{raw}'."))
            })?,
        };
        let reps = parts.next().unwrap_or_default();
        let intensity = parts.next().unwrap_or_default();
        if parts.next().is_some() {
            return Err(PlanError::InvalidInput(format!(
                "Too many fields in exercise '{s}'. Expected name;sets;reps;intensity."
            )));
        }
        Self::new(name, sets, reps, intensity)
    }
}

impl Exercise {
    pub fn name(&self) -> &str {
        match self {
            Self::Label(label) => label,
            Self::Detailed(detail) => &detail.name,
            Self::Unrecognized(_) => "",
        }
    }

    /// False for entries kept only so they survive a save. Listings skip them.
    pub const fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => write!(f, "{label}"),
            Self::Detailed(detail) => {
                let name = if detail.name.is_empty() {
                    "(unnamed)"
                } else {
                    &detail.name
                };
                let sets = detail
                    .sets
                    .map_or_else(|| "-".to_string(), |s| s.to_string());
                write!(
                    f,
                    "{name} (sets: {sets}, reps: {}, intensity: {})",
                    or_dash(&detail.reps),
                    or_dash(&detail.intensity)
                )
            }
            Self::Unrecognized(value) => write!(f, "(unrecognized entry: {value})"),
        }
    }
}

fn or_dash(text: &str) -> &str {
    if text.is_empty() {
        "-"
    } else {
        text
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawExercise {
    Label(String),
    Record(RawExerciseRecord),
    Other(Value),
}

#[derive(Deserialize)]
struct RawExerciseRecord {
    #[serde(default, alias = "übung", alias = "uebung", deserialize_with = "lenient_text")]
    name: String,
    #[serde(default, alias = "saetze", alias = "sätze", deserialize_with = "lenient_count")]
    sets: Option<u32>,
    #[serde(default, alias = "wiederholungen", deserialize_with = "lenient_text")]
    reps: String,
    #[serde(
        default,
        alias = "intensitaet",
        alias = "intensität",
        deserialize_with = "lenient_text"
    )]
    intensity: String,
}

impl From<RawExercise> for Exercise {
    fn from(raw: RawExercise) -> Self {
        match raw {
            RawExercise::Label(label) => Self::Label(label),
            RawExercise::Record(record) => Self::Detailed(ExerciseDetail {
                name: record.name,
                sets: record.sets,
                reps: record.reps,
                intensity: record.intensity,
            }),
            RawExercise::Other(value) => {
                warn!(entry = %value, "keeping unrecognized exercise entry");
                Self::Unrecognized(value)
            }
        }
    }
}

impl<'de> Deserialize<'de> for Exercise {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawExercise::deserialize(deserializer).map(Self::from)
    }
}

// Old files hold reps and intensity as either text or numbers.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

// A single bad entry must not cost the whole unit, so each one decodes on its own.
fn lenient_exercises<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<Exercise>, D::Error> {
    let entries = match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        other => vec![other],
    };
    entries
        .into_iter()
        .map(|entry| Exercise::deserialize(entry).map_err(serde::de::Error::custom))
        .collect()
}

/// A dated training session within a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// ISO-8601 date. Units created through [`PlanBook::add_unit`] always hold a valid
    /// date; units read from older files may not.
    #[serde(default, alias = "datum", deserialize_with = "lenient_text")]
    pub date: String,
    #[serde(default, alias = "schwerpunkt", deserialize_with = "lenient_text")]
    pub focus: String,
    #[serde(
        default,
        alias = "uebungen",
        alias = "übungen",
        deserialize_with = "lenient_exercises"
    )]
    pub exercises: Vec<Exercise>,
}

impl Unit {
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), ISO_DATE_FORMAT).ok()
    }

    pub fn display_date(&self) -> String {
        format_display_date(&self.date)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UnitSlot {
    Unit(Unit),
    Unreadable(Value),
}

/// Both on-disk shapes of the plan file. The wrapped form is the only one written.
#[derive(Deserialize)]
#[serde(untagged)]
enum PlanFile {
    Wrapped {
        plans: BTreeMap<String, Vec<UnitSlot>>,
        #[serde(default)]
        statuses: BTreeMap<String, bool>,
    },
    Legacy(BTreeMap<String, Vec<UnitSlot>>),
}

/// All training plans plus their active/inactive flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PlanFile")]
pub struct PlanBook {
    plans: BTreeMap<String, Vec<Unit>>,
    statuses: BTreeMap<String, bool>,
}

impl From<PlanFile> for PlanBook {
    fn from(file: PlanFile) -> Self {
        let (raw_plans, statuses) = match file {
            PlanFile::Wrapped { plans, statuses } => (plans, statuses),
            PlanFile::Legacy(plans) => (plans, BTreeMap::new()),
        };

        let mut book = Self {
            plans: BTreeMap::new(),
            statuses,
        };
        for (name, slots) in raw_plans {
            let mut units = Vec::with_capacity(slots.len());
            for slot in slots {
                match slot {
                    UnitSlot::Unit(unit) => units.push(unit),
                    UnitSlot::Unreadable(value) => {
                        warn!(plan = %name, entry = %value, "dropping unreadable unit entry");
                    }
                }
            }
            book.statuses.entry(name.clone()).or_insert(true);
            book.plans.insert(name, units);
        }
        book
    }
}

/// One of today's units, as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodayUnit {
    pub plan: String,
    pub focus: String,
    pub index: usize,
}

impl PlanBook {
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plans.contains_key(name)
    }

    pub fn plan_names(&self) -> impl Iterator<Item = &str> {
        self.plans.keys().map(String::as_str)
    }

    pub fn plans(&self) -> impl Iterator<Item = (&str, &[Unit])> {
        self.plans
            .iter()
            .map(|(name, units)| (name.as_str(), units.as_slice()))
    }

    pub fn units(&self, plan: &str) -> Option<&[Unit]> {
        self.plans.get(plan).map(Vec::as_slice)
    }

    /// Status of a plan. Plans without an entry count as active.
    pub fn status(&self, plan: &str) -> bool {
        self.statuses.get(plan).copied().unwrap_or(true)
    }

    pub fn statuses(&self) -> &BTreeMap<String, bool> {
        &self.statuses
    }

    pub fn active_count(&self) -> usize {
        self.plan_names().filter(|name| self.status(name)).count()
    }

    /// Creates an empty, active plan. Names are matched exactly, as in every other
    /// plan operation; only blank names are rejected.
    pub fn create_plan(&mut self, name: &str) -> Result<(), PlanError> {
        if name.trim().is_empty() {
            return Err(PlanError::InvalidInput(
                "Plan name cannot be empty.".to_string(),
            ));
        }
        if self.plans.contains_key(name) {
            return Err(PlanError::DuplicateName(name.to_string()));
        }
        self.plans.insert(name.to_string(), Vec::new());
        self.statuses.insert(name.to_string(), true);
        Ok(())
    }

    /// Overwrites a plan's status. The name is not checked against existing plans,
    /// so a status can be recorded before its plan exists.
    pub fn set_status(&mut self, plan: &str, active: bool) {
        self.statuses.insert(plan.to_string(), active);
    }

    /// Appends a unit built in the detailed flow. At least one exercise is required.
    ///
    /// Returns the position of the new unit, which shifts once earlier units are deleted.
    pub fn add_unit(
        &mut self,
        plan: &str,
        date_text: &str,
        focus: &str,
        exercises: Vec<Exercise>,
    ) -> Result<usize, PlanError> {
        if exercises.is_empty() {
            return Err(PlanError::InvalidInput(
                "Add at least one exercise to the unit.".to_string(),
            ));
        }
        self.push_unit(plan, date_text, focus, exercises)
    }

    /// Appends a unit from a comma-separated list of exercise labels. The list may be empty.
    pub fn add_unit_from_list(
        &mut self,
        plan: &str,
        date_text: &str,
        focus: &str,
        exercise_list: &str,
    ) -> Result<usize, PlanError> {
        let exercises = exercise_list
            .split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(|label| Exercise::Label(label.to_string()))
            .collect();
        self.push_unit(plan, date_text, focus, exercises)
    }

    fn push_unit(
        &mut self,
        plan: &str,
        date_text: &str,
        focus: &str,
        exercises: Vec<Exercise>,
    ) -> Result<usize, PlanError> {
        let date = parse_unit_date(date_text)?;
        let units = self
            .plans
            .get_mut(plan)
            .ok_or_else(|| PlanError::PlanNotFound(plan.to_string()))?;
        units.push(Unit {
            date: date.format(ISO_DATE_FORMAT).to_string(),
            focus: focus.trim().to_string(),
            exercises,
        });
        Ok(units.len() - 1)
    }

    /// Removes the unit at `index` and returns it.
    pub fn delete_unit(&mut self, plan: &str, index: usize) -> Result<Unit, PlanError> {
        let units = self
            .plans
            .get_mut(plan)
            .ok_or_else(|| PlanError::PlanNotFound(plan.to_string()))?;
        if index >= units.len() {
            return Err(PlanError::IndexOutOfRange {
                plan: plan.to_string(),
                index,
                len: units.len(),
            });
        }
        Ok(units.remove(index))
    }

    /// Units of a plan paired with their stored position, newest first.
    /// Units whose date cannot be read sort last.
    pub fn units_by_date_desc(&self, plan: &str) -> Result<Vec<(usize, &Unit)>, PlanError> {
        let units = self
            .plans
            .get(plan)
            .ok_or_else(|| PlanError::PlanNotFound(plan.to_string()))?;
        let mut ordered: Vec<(usize, &Unit)> = units.iter().enumerate().collect();
        ordered.sort_by(|a, b| b.1.parsed_date().cmp(&a.1.parsed_date()));
        Ok(ordered)
    }
}

/// Every unit dated `today`, across all plans, in plan order.
pub fn units_for_today(book: &PlanBook, today: NaiveDate) -> Vec<TodayUnit> {
    book.plans()
        .flat_map(|(plan, units)| {
            units
                .iter()
                .enumerate()
                .filter(move |(_, unit)| unit.parsed_date() == Some(today))
                .map(move |(index, unit)| TodayUnit {
                    plan: plan.to_string(),
                    focus: unit.focus.clone(),
                    index,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_date_forms() {
        let expected = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        assert_eq!(parse_unit_date("01.02.2026").unwrap(), expected);
        assert_eq!(parse_unit_date(" 2026-02-01 ").unwrap(), expected);
    }

    #[test]
    fn rejects_malformed_dates() {
        assert_eq!(
            parse_unit_date("2026/02/01"),
            Err(PlanError::InvalidDate("2026/02/01".to_string()))
        );
        assert!(matches!(
            parse_unit_date("31.02.2026"),
            Err(PlanError::InvalidDate(_))
        ));
        // ISO text with a dot goes through the dotted parser and fails there.
        assert!(matches!(
            parse_unit_date("2026.02.01"),
            Err(PlanError::InvalidDate(_))
        ));
        assert!(matches!(
            parse_unit_date("   "),
            Err(PlanError::InvalidInput(_))
        ));
    }

    #[test]
    fn display_date_falls_back_to_question_mark() {
        assert_eq!(format_display_date("2026-02-01"), "01.02.2026");
        assert_eq!(format_display_date("soon"), "?");
        assert_eq!(format_display_date(""), "?");
    }

    #[test]
    fn decodes_all_exercise_shapes() {
        let json = r#"[
            "Pushups",
            {"übung": "Squat", "wiederholungen": 10, "intensität": "schwer"},
            {"uebung": "Row", "wiederholungen": "8-12", "intensitaet": "70%"},
            {"name": "Bench", "saetze": 4, "wiederholungen": "6", "intensitaet": "80%"},
            {"name": "Deadlift", "sets": "5", "reps": "5", "intensity": "100kg"}
        ]"#;
        let exercises: Vec<Exercise> = serde_json::from_str(json).unwrap();

        assert_eq!(exercises[0], Exercise::Label("Pushups".to_string()));
        assert_eq!(
            exercises[1],
            Exercise::Detailed(ExerciseDetail {
                name: "Squat".to_string(),
                sets: None,
                reps: "10".to_string(),
                intensity: "schwer".to_string(),
            })
        );
        assert_eq!(exercises[2].name(), "Row");
        assert_eq!(
            exercises[3],
            Exercise::Detailed(ExerciseDetail {
                name: "Bench".to_string(),
                sets: Some(4),
                reps: "6".to_string(),
                intensity: "80%".to_string(),
            })
        );
        match &exercises[4] {
            Exercise::Detailed(detail) => assert_eq!(detail.sets, Some(5)),
            other => panic!("expected detailed exercise, got {other:?}"),
        }
    }

    #[test]
    fn exercise_detail_from_str() {
        let detail: ExerciseDetail = "Squat; 4; 8-12; 80%".parse().unwrap();
        assert_eq!(detail.name, "Squat");
        assert_eq!(detail.sets, Some(4));
        assert_eq!(detail.reps, "8-12");
        assert_eq!(detail.intensity, "80%");

        let defaults: ExerciseDetail = "Plank".parse().unwrap();
        assert_eq!(defaults.sets, Some(DEFAULT_SETS));
        assert_eq!(defaults.reps, "");

        assert!("Squat;0".parse::<ExerciseDetail>().is_err());
        assert!("Squat;21".parse::<ExerciseDetail>().is_err());
        assert!("Squat;three".parse::<ExerciseDetail>().is_err());
        assert!(";3;10".parse::<ExerciseDetail>().is_err());
        assert!("a;1;2;3;4".parse::<ExerciseDetail>().is_err());
    }

    #[test]
    fn display_marks_missing_parts() {
        let detail = Exercise::Detailed(ExerciseDetail {
            name: "Squat".to_string(),
            sets: None,
            reps: "10".to_string(),
            intensity: String::new(),
        });
        assert_eq!(detail.to_string(), "Squat (sets: -, reps: 10, intensity: -)");
        assert_eq!(Exercise::Label("Pushups".to_string()).to_string(), "Pushups");
    }

    #[test]
    fn unreadable_units_are_dropped() {
        let book: PlanBook =
            serde_json::from_str(r#"{"A": ["just text", {"datum": "2026-01-05"}]}"#).unwrap();
        let units = book.units("A").unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].date, "2026-01-05");
        assert_eq!(units[0].focus, "");
        assert!(units[0].exercises.is_empty());
    }

    #[test]
    fn bad_exercise_entries_keep_their_unit() {
        let json = r#"{"A": [
            {"datum": "2026-01-05", "schwerpunkt": "Kraft", "uebungen": ["Squat", 5, null]},
            {"datum": "2026-01-06", "uebungen": "Row"}
        ]}"#;
        let book: PlanBook = serde_json::from_str(json).unwrap();
        let units = book.units("A").unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].focus, "Kraft");
        assert_eq!(
            units[0].exercises,
            vec![
                Exercise::Label("Squat".to_string()),
                Exercise::Unrecognized(Value::from(5)),
                Exercise::Unrecognized(Value::Null),
            ]
        );
        assert_eq!(
            units[0].exercises.iter().filter(|e| e.is_recognized()).count(),
            1
        );
        assert_eq!(units[1].exercises, vec![Exercise::Label("Row".to_string())]);

        let written = serde_json::to_value(&book).unwrap();
        assert_eq!(
            written["plans"]["A"][0]["exercises"],
            serde_json::json!(["Squat", 5, null])
        );
    }

    #[test]
    fn wrapped_file_fills_missing_statuses_only() {
        let book: PlanBook = serde_json::from_str(
            r#"{"plans": {"A": [], "B": []}, "statuses": {"A": false, "Ghost": false}}"#,
        )
        .unwrap();
        assert!(!book.status("A"));
        assert!(book.status("B"));
        assert_eq!(book.statuses().get("Ghost"), Some(&false));
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn units_sort_newest_first_with_bad_dates_last() {
        let mut book = PlanBook::default();
        book.create_plan("A").unwrap();
        book.add_unit_from_list("A", "01.01.2026", "", "").unwrap();
        book.add_unit_from_list("A", "2026-03-01", "", "").unwrap();
        book.plans.get_mut("A").unwrap().push(Unit {
            date: "garbage".to_string(),
            focus: String::new(),
            exercises: Vec::new(),
        });
        book.add_unit_from_list("A", "15.02.2026", "", "").unwrap();

        let order: Vec<usize> = book
            .units_by_date_desc("A")
            .unwrap()
            .into_iter()
            .map(|(index, _)| index)
            .collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }
}
