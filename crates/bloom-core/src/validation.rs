//! Macro-to-calorie consistency rules.
//!
//! Pure arithmetic: proteins and carbs contribute 4 kcal per gram, fats 9.
//! A goal is consistent when its stated calories are within
//! [`CALORIE_TOLERANCE`] of what its macros add up to.

use std::fmt;

use crate::error::ValidationError;

/// Allowed difference, in kcal, between stated and macro-derived calories.
pub const CALORIE_TOLERANCE: i64 = 5;

const KCAL_PER_GRAM_PROTEIN: f64 = 4.0;
const KCAL_PER_GRAM_CARBS: f64 = 4.0;
const KCAL_PER_GRAM_FAT: f64 = 9.0;

/// The four numbers a goal is made of.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Macros {
    pub calories: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carbs: f64,
}

impl Macros {
    pub fn check(&self) -> Result<(), ValidationError> {
        check_macro_consistency(self.calories, self.proteins, self.fats, self.carbs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustDirection {
    Add,
    Remove,
}

impl fmt::Display for AdjustDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdjustDirection::Add => f.write_str("Add"),
            AdjustDirection::Remove => f.write_str("Remove"),
        }
    }
}

/// How far a goal's calories are from its macros, with hints to close the gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacroGap {
    /// Stated calories minus macro calories, both rounded.
    pub gap: i64,
    pub direction: AdjustDirection,
    /// Grams of carbs or proteins that would cover the gap.
    pub carbs_or_protein_grams: u64,
    /// Grams of fat that would cover the gap.
    pub fat_grams: u64,
}

impl MacroGap {
    fn new(gap: i64) -> Self {
        let magnitude = gap.unsigned_abs();
        Self {
            gap,
            direction: if gap > 0 {
                AdjustDirection::Add
            } else {
                AdjustDirection::Remove
            },
            carbs_or_protein_grams: magnitude.div_ceil(4),
            fat_grams: magnitude.div_ceil(9),
        }
    }
}

impl fmt::Display for MacroGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.gap > 0 { "+" } else { "" };
        write!(
            f,
            "Calories mismatch by {sign}{} kcal. {} about {}g carbs/proteins or {}g fats (±{CALORIE_TOLERANCE} kcal allowed).",
            self.gap, self.direction, self.carbs_or_protein_grams, self.fat_grams,
        )
    }
}

/// Round half up, matching how the stored goals have always been rounded.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Calories implied by the given macros, rounded.
pub fn macro_calories(proteins: f64, fats: f64, carbs: f64) -> i64 {
    round_half_up(
        proteins * KCAL_PER_GRAM_PROTEIN + carbs * KCAL_PER_GRAM_CARBS + fats * KCAL_PER_GRAM_FAT,
    )
}

/// Check that `calories` agrees with the macros within [`CALORIE_TOLERANCE`].
///
/// Non-finite inputs are rejected as [`ValidationError::NonNumeric`] before
/// any arithmetic happens.
pub fn check_macro_consistency(
    calories: f64,
    proteins: f64,
    fats: f64,
    carbs: f64,
) -> Result<(), ValidationError> {
    for (field, value) in [
        ("calories", calories),
        ("proteins", proteins),
        ("fats", fats),
        ("carbs", carbs),
    ] {
        if !value.is_finite() {
            return Err(ValidationError::NonNumeric { field });
        }
    }

    let gap = round_half_up(calories) - macro_calories(proteins, fats, carbs);
    if gap.abs() <= CALORIE_TOLERANCE {
        Ok(())
    } else {
        Err(ValidationError::MacroMismatch(MacroGap::new(gap)))
    }
}

/// Parse one numeric form field. Blank or non-finite text is `NonNumeric`.
pub fn parse_number(field: &'static str, text: &str) -> Result<f64, ValidationError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or(ValidationError::NonNumeric { field })
}
