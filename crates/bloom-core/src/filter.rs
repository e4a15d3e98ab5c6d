//! Derive the visible subset of a recipe list from the search box, the
//! category chips and the collection chips.
//!
//! Every call filters from scratch; nothing is cached between calls.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::models::recipe::{Category, Recipe};

const ALL: &str = "All";

/// What the filter needs to know about an item.
pub trait Filterable {
    fn display_name(&self) -> &str;

    fn category(&self) -> Option<Category>;

    /// Whether the item has ever been made.
    fn recently_made(&self) -> bool;

    fn is_favorite(&self) -> bool;
}

impl Filterable for Recipe {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> Option<Category> {
        self.category
    }

    fn recently_made(&self) -> bool {
        self.last_made_at.is_some()
    }

    fn is_favorite(&self) -> bool {
        self.is_favorite
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str(ALL),
            CategoryFilter::Only(category) => write!(f, "{category}"),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ALL {
            Ok(CategoryFilter::All)
        } else {
            s.parse().map(CategoryFilter::Only)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollectionFilter {
    #[default]
    All,
    RecentlyMade,
    Favourites,
}

impl CollectionFilter {
    pub const ALL: [CollectionFilter; 3] = [
        CollectionFilter::All,
        CollectionFilter::RecentlyMade,
        CollectionFilter::Favourites,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CollectionFilter::All => ALL,
            CollectionFilter::RecentlyMade => "Recently made",
            CollectionFilter::Favourites => "Favourites",
        }
    }
}

impl fmt::Display for CollectionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CollectionFilter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CollectionFilter::ALL
            .into_iter()
            .find(|filter| filter.label() == s)
            .ok_or_else(|| CoreError::UnknownCollectionFilter(s.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub query: String,
    pub category: CategoryFilter,
    pub collection: CollectionFilter,
}

impl FilterCriteria {
    /// Whether `item` passes every predicate.
    pub fn matches<T: Filterable>(&self, item: &T) -> bool {
        let query = self.query.trim().to_lowercase();
        let matches_search = item.display_name().to_lowercase().contains(&query);

        let matches_category = match self.category {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => item.category() == Some(wanted),
        };

        let matches_collection = match self.collection {
            CollectionFilter::All => true,
            CollectionFilter::RecentlyMade => item.recently_made(),
            CollectionFilter::Favourites => item.is_favorite(),
        };

        matches_search && matches_category && matches_collection
    }
}

/// Items passing every predicate of `criteria`, in input order.
pub fn filter<T: Filterable + Clone>(items: &[T], criteria: &FilterCriteria) -> Vec<T> {
    items
        .iter()
        .filter(|item| criteria.matches(*item))
        .cloned()
        .collect()
}
