//src/athlete.rs
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use thiserror::Error;

pub const AGE_RANGE: RangeInclusive<u32> = 1..=100;
pub const HEIGHT_CM_RANGE: RangeInclusive<u32> = 50..=250;
pub const WEIGHT_KG_RANGE: RangeInclusive<u32> = 10..=250;

/// Column order of the athlete CSV file.
pub const COLUMNS: [&str; 6] = ["name", "age", "height_cm", "weight_kg", "team", "sport"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AthleteError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
    #[error("Athlete index {index} is out of range ({len} athlete(s))")]
    IndexOutOfRange { index: usize, len: usize },
}

/// A roster row. The German aliases match the headers of files written by the
/// first version of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Athlete {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Alter")]
    pub age: u32,
    #[serde(alias = "Größe (cm)")]
    pub height_cm: u32,
    #[serde(alias = "Gewicht (kg)")]
    pub weight_kg: u32,
    #[serde(default, alias = "Mannschaft")]
    pub team: String,
    #[serde(default, alias = "Sportart")]
    pub sport: String,
    /// Row selection for deletion. Never written to disk.
    #[serde(skip)]
    pub marked_for_deletion: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NewAthlete {
    pub name: String,
    pub age: u32,
    pub height_cm: u32,
    pub weight_kg: u32,
    pub team: String,
    pub sport: String,
}

fn check_range(
    field: &'static str,
    value: u32,
    range: &RangeInclusive<u32>,
) -> Result<(), AthleteError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(AthleteError::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

impl TryFrom<NewAthlete> for Athlete {
    type Error = AthleteError;

    fn try_from(new: NewAthlete) -> Result<Self, Self::Error> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(AthleteError::InvalidInput(
                "Athlete name cannot be empty.".to_string(),
            ));
        }
        check_range("age", new.age, &AGE_RANGE)?;
        check_range("height_cm", new.height_cm, &HEIGHT_CM_RANGE)?;
        check_range("weight_kg", new.weight_kg, &WEIGHT_KG_RANGE)?;
        Ok(Self {
            name: name.to_string(),
            age: new.age,
            height_cm: new.height_cm,
            weight_kg: new.weight_kg,
            team: new.team.trim().to_string(),
            sport: new.sport.trim().to_string(),
            marked_for_deletion: false,
        })
    }
}

/// Athletes in insertion order. Names need not be unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    rows: Vec<Athlete>,
}

impl From<Vec<Athlete>> for Roster {
    fn from(rows: Vec<Athlete>) -> Self {
        Self { rows }
    }
}

impl Roster {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Athlete> {
        self.rows.iter()
    }

    /// Validates and appends an athlete, returning its position.
    pub fn add(&mut self, new: NewAthlete) -> Result<usize, AthleteError> {
        let athlete = Athlete::try_from(new)?;
        self.rows.push(athlete);
        Ok(self.rows.len() - 1)
    }

    pub fn mark(&mut self, index: usize, marked: bool) -> Result<(), AthleteError> {
        let len = self.rows.len();
        let row = self
            .rows
            .get_mut(index)
            .ok_or(AthleteError::IndexOutOfRange { index, len })?;
        row.marked_for_deletion = marked;
        Ok(())
    }

    /// Drops every marked row and returns how many were removed.
    pub fn remove_marked(&mut self) -> usize {
        let before = self.rows.len();
        self.rows.retain(|athlete| !athlete.marked_for_deletion);
        before - self.rows.len()
    }
}

impl<'a> IntoIterator for &'a Roster {
    type Item = &'a Athlete;
    type IntoIter = std::slice::Iter<'a, Athlete>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str) -> NewAthlete {
        NewAthlete {
            name: name.to_string(),
            age: 20,
            height_cm: 180,
            weight_kg: 80,
            team: "U20".to_string(),
            sport: "Handball".to_string(),
        }
    }

    #[test]
    fn rejects_values_outside_form_ranges() {
        let mut roster = Roster::default();
        let err = roster
            .add(NewAthlete {
                age: 0,
                ..sample("Mia")
            })
            .unwrap_err();
        assert_eq!(
            err,
            AthleteError::OutOfRange {
                field: "age",
                value: 0,
                min: 1,
                max: 100
            }
        );
        assert!(roster
            .add(NewAthlete {
                height_cm: 251,
                ..sample("Mia")
            })
            .is_err());
        assert!(roster
            .add(NewAthlete {
                weight_kg: 9,
                ..sample("Mia")
            })
            .is_err());
        assert!(matches!(
            roster.add(sample("  ")),
            Err(AthleteError::InvalidInput(_))
        ));
        assert!(roster.is_empty());
    }

    #[test]
    fn duplicate_names_and_marked_removal() {
        let mut roster = Roster::default();
        roster.add(sample("Mia")).unwrap();
        roster.add(sample("Mia")).unwrap();
        roster.add(sample("Ben")).unwrap();

        roster.mark(0, true).unwrap();
        roster.mark(2, true).unwrap();
        roster.mark(2, false).unwrap();
        assert!(roster.mark(3, true).is_err());

        assert_eq!(roster.remove_marked(), 1);
        let names: Vec<&str> = roster.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Mia", "Ben"]);
    }
}
