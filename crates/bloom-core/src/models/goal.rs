use std::fmt;

use jiff::Timestamp;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::doc_keys;
use crate::error::{CoreError, ValidationError};
use crate::ids::{DocId, OwnerId};
use crate::models::Document;
use crate::validation::{self, Macros};

/// Stored marker for a goal that has no end date yet.
pub const OPEN_END: &str = "None";

/// A time-bounded daily nutrition target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    #[serde(skip)]
    pub id: DocId,
    #[serde(rename = "uid")]
    pub owner_id: OwnerId,
    pub calories: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carbs: f64,
    pub from: Date,
    pub to: GoalEnd,
    #[serde(skip)]
    pub created_at: Option<Timestamp>,
}

impl Goal {
    /// A new open-ended goal starting on `from`, not yet persisted.
    pub fn new_active(owner_id: OwnerId, macros: Macros, from: Date) -> Self {
        Self {
            id: DocId::local(),
            owner_id,
            calories: macros.calories,
            proteins: macros.proteins,
            fats: macros.fats,
            carbs: macros.carbs,
            from,
            to: GoalEnd::Open,
            created_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.to == GoalEnd::Open
    }
}

impl Document for Goal {
    const COLLECTION: &'static str = doc_keys::GOALS;

    fn id(&self) -> &DocId {
        &self.id
    }

    fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    fn created_at(&self) -> Option<Timestamp> {
        self.created_at
    }

    fn assign_identity(&mut self, id: DocId, created_at: Option<Timestamp>) {
        self.id = id;
        self.created_at = created_at;
    }
}

/// The last day of a goal, or `Open` while it is the current goal.
///
/// Stored as an ISO date or the string `"None"`; displayed as the date or
/// `Current`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GoalEnd {
    Open,
    On(Date),
}

impl TryFrom<String> for GoalEnd {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == OPEN_END {
            return Ok(GoalEnd::Open);
        }
        value
            .parse::<Date>()
            .map(GoalEnd::On)
            .map_err(|e| CoreError::InvalidDate(format!("{value}: {e}")))
    }
}

impl From<GoalEnd> for String {
    fn from(end: GoalEnd) -> Self {
        match end {
            GoalEnd::Open => OPEN_END.to_string(),
            GoalEnd::On(date) => date.to_string(),
        }
    }
}

impl fmt::Display for GoalEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoalEnd::Open => f.write_str("Current"),
            GoalEnd::On(date) => write!(f, "{date}"),
        }
    }
}

/// Goal form contents as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalInput {
    pub calories: String,
    pub proteins: String,
    pub fats: String,
    pub carbs: String,
}

impl GoalInput {
    /// Parse all four fields and check that they agree with each other.
    pub fn validate(&self) -> Result<Macros, ValidationError> {
        let macros = Macros {
            calories: validation::parse_number("calories", &self.calories)?,
            proteins: validation::parse_number("proteins", &self.proteins)?,
            fats: validation::parse_number("fats", &self.fats)?,
            carbs: validation::parse_number("carbs", &self.carbs)?,
        };
        macros.check()?;
        Ok(macros)
    }
}
