use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use jiff::civil::{Date, date};
use serde::{Deserialize, Deserializer, Serialize};

use crate::doc_keys;
use crate::error::{CoreError, RequiredField, ValidationError};
use crate::ids::{DocId, OwnerId};
use crate::models::Document;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[default]
    Breakfast,
    Dinner,
    Lunch,
    Dessert,
}

impl Category {
    /// Every category, in the order the recipe form offers them.
    pub const ALL: [Category; 4] = [
        Category::Breakfast,
        Category::Dinner,
        Category::Lunch,
        Category::Dessert,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Breakfast => "Breakfast",
            Category::Dinner => "Dinner",
            Category::Lunch => "Lunch",
            Category::Dessert => "Dessert",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.label() == s)
            .ok_or_else(|| CoreError::UnknownCategory(s.to_string()))
    }
}

/// A user-authored recipe.
///
/// The stat fields (`time`, `calories`, ...) are free text such as `"30 min"`
/// or `"25g"`; they are shown, never computed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(skip)]
    pub id: DocId,
    #[serde(rename = "uid", default)]
    pub owner_id: OwnerId,
    #[serde(alias = "title", default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub calories: String,
    #[serde(default)]
    pub proteins: String,
    #[serde(default)]
    pub fats: String,
    #[serde(default)]
    pub carbs: String,
    #[serde(default)]
    pub is_favorite: bool,
    /// Blank or unreadable stored values mean "never made".
    #[serde(default, deserialize_with = "lenient_date")]
    pub last_made_at: Option<Date>,
    #[serde(skip)]
    pub created_at: Option<Timestamp>,
}

impl Document for Recipe {
    const COLLECTION: &'static str = doc_keys::RECIPES;

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

fn lenient_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Date>, D::Error> {
    let text = Option::<String>::deserialize(deserializer)?;
    Ok(text.and_then(|text| text.trim().parse().ok()))
}

/// Recipe form contents as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDraft {
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub category: Category,
    /// One ingredient per line.
    pub ingredients: String,
    pub steps: Vec<String>,
    pub time: String,
    pub calories: String,
    pub proteins: String,
    pub fats: String,
    pub carbs: String,
}

impl Default for RecipeDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            image_url: String::new(),
            category: Category::default(),
            ingredients: String::new(),
            steps: vec![String::new()],
            time: String::new(),
            calories: String::new(),
            proteins: String::new(),
            fats: String::new(),
            carbs: String::new(),
        }
    }
}

impl RecipeDraft {
    /// Normalise the draft into a recipe owned by `owner_id`.
    ///
    /// Text fields are trimmed, blank ingredient lines and blank steps are
    /// dropped. The name is checked before the steps.
    pub fn into_recipe(self, owner_id: OwnerId) -> Result<Recipe, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyRequiredField(RequiredField::RecipeName));
        }

        let steps = non_blank(self.steps.iter().map(String::as_str));
        if steps.is_empty() {
            return Err(ValidationError::EmptyRequiredField(RequiredField::RecipeSteps));
        }

        Ok(Recipe {
            id: DocId::local(),
            owner_id,
            name,
            description: self.description.trim().to_string(),
            image_url: self.image_url.trim().to_string(),
            category: Some(self.category),
            ingredients: non_blank(self.ingredients.split('\n')),
            steps,
            time: self.time.trim().to_string(),
            calories: self.calories.trim().to_string(),
            proteins: self.proteins.trim().to_string(),
            fats: self.fats.trim().to_string(),
            carbs: self.carbs.trim().to_string(),
            is_favorite: false,
            last_made_at: None,
            created_at: None,
        })
    }
}

fn non_blank<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<String> {
    lines
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Stand-in recipes shown while the real collection is empty.
pub fn placeholder_recipes() -> Vec<Recipe> {
    vec![
        placeholder("placeholder-1", "Lorem ipsum pasta", Category::Dinner, true, Some(date(2024, 6, 5))),
        placeholder("placeholder-2", "Dolor sit pancakes", Category::Breakfast, false, Some(date(2024, 5, 10))),
        placeholder("placeholder-3", "Consectetur salad", Category::Lunch, false, None),
    ]
}

fn placeholder(
    id: &str,
    name: &str,
    category: Category,
    is_favorite: bool,
    last_made_at: Option<Date>,
) -> Recipe {
    Recipe {
        id: DocId::new(id),
        owner_id: OwnerId::default(),
        name: name.to_string(),
        description: String::new(),
        image_url: String::new(),
        category: Some(category),
        ingredients: Vec::new(),
        steps: Vec::new(),
        time: String::new(),
        calories: String::new(),
        proteins: String::new(),
        fats: String::new(),
        carbs: String::new(),
        is_favorite,
        last_made_at,
        created_at: None,
    }
}
