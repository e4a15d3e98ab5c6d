use std::sync::Arc;

use bloom_core::filter::{self, FilterCriteria};
use bloom_core::ids::OwnerId;
use bloom_core::models::Document;
use bloom_core::models::recipe::{Recipe, RecipeDraft};
use bloom_storage::documents::encode;
use bloom_storage::store::DocumentStore;
use bloom_sync::synchronizer::CollectionSynchronizer;
use jiff::Timestamp;
use tracing::{info, warn};

use crate::error::SubmitError;

pub struct RecipeLifecycleManager {
    store: Arc<dyn DocumentStore>,
    sync: Arc<CollectionSynchronizer<Recipe>>,
}

impl RecipeLifecycleManager {
    pub fn new(store: Arc<dyn DocumentStore>, sync: Arc<CollectionSynchronizer<Recipe>>) -> Self {
        Self { store, sync }
    }

    /// Validate and store a new recipe for `owner`.
    pub async fn submit_recipe(
        &self,
        draft: RecipeDraft,
        owner: Option<&OwnerId>,
    ) -> Result<Recipe, SubmitError> {
        let owner = owner.ok_or(SubmitError::Unauthenticated("recipe"))?;
        let mut recipe = draft.into_recipe(owner.clone())?;

        let id = self
            .store
            .insert(Recipe::COLLECTION, encode(&recipe)?)
            .await
            .inspect_err(|e| warn!(owner = %owner, error = %e, "failed to save recipe"))?;

        recipe.assign_identity(id, Some(Timestamp::now()));
        info!(owner = %owner, recipe_id = %recipe.id, name = %recipe.name, "recipe saved");

        self.sync.add_optimistic(recipe.clone());
        Ok(recipe)
    }

    /// The recipes currently shown under `criteria`.
    pub fn visible(&self, criteria: &FilterCriteria) -> Vec<Recipe> {
        filter::filter(self.sync.current().items(), criteria)
    }
}
