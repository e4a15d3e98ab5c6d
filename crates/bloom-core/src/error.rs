use std::fmt;

use thiserror::Error;

use crate::validation::MacroGap;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("unknown collection filter: {0}")]
    UnknownCollectionFilter(String),
}

/// Rejections raised before anything is written to the store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("All fields must be numbers.")]
    NonNumeric { field: &'static str },

    #[error("{0}")]
    MacroMismatch(MacroGap),

    #[error("{0}")]
    EmptyRequiredField(RequiredField),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    RecipeName,
    RecipeSteps,
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequiredField::RecipeName => f.write_str("Recipe name is required."),
            RequiredField::RecipeSteps => f.write_str("Add at least one step."),
        }
    }
}
